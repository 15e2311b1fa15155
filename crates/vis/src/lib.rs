//! logcube's report library.
//!
//! Renders the current selection of a [`logcube_analytics::Session`] as a
//! static HTML page of Plotly charts.
//!
//! **WARNING**: This library is logcube's internal report library and there
//! are no plans to stabilize it. The API may break at any time without notice.

pub(crate) mod chart;
pub(crate) mod id;
pub(crate) mod template;

pub mod error;
pub mod layout;

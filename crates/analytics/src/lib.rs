//! Reading, annotating and cross-filtering consultation logs.
//!
//! A log file is decoded into [`record::Record`]s, annotated in chunks by a
//! [`pipeline::Pipeline`] (time bucket and nearest region) and indexed by a
//! [`cube::Cube`] that counts records per key of every dimension under the
//! filters of the others.

mod compression;

pub mod cube;
pub mod error;
pub mod granularity;
pub mod normalize;
pub mod options;
pub mod pipeline;
pub mod read;
pub mod record;
pub mod session;
pub mod spatial;

pub use crate::options::ImportOptions;
pub use crate::read::LogFile;
pub use crate::session::Session;
pub use crate::session::Workbench;

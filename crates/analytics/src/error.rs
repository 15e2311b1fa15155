use std::convert::From;
use std::error::Error;
use std::fmt;
use std::fmt::Display;
use std::fmt::Formatter;
use std::io;
use std::sync::Arc;

/// The error type for reading delimited log files.
///
/// Errors originate from opening or decompressing the file and from the
/// delimited-text decoder.
#[derive(Debug, Clone)]
pub enum ReadError {
    /// A [`std::io::Error`] encountered while opening or reading the log file.
    Io(Arc<io::Error>),

    /// A [`csv::Error`] encountered while decoding a row.
    Csv(Arc<csv::Error>),
}

impl Display for ReadError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let read_error = "log read error:";

        match self {
            ReadError::Io(error) => write!(f, "{read_error} I/O error: {error}"),
            ReadError::Csv(error) => write!(f, "{read_error} malformed row: {error}"),
        }
    }
}

impl Error for ReadError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            ReadError::Io(error) => Some(error),
            ReadError::Csv(error) => Some(error),
        }
    }
}

impl From<io::Error> for ReadError {
    fn from(error: io::Error) -> Self {
        ReadError::Io(Arc::new(error))
    }
}

impl From<csv::Error> for ReadError {
    fn from(error: csv::Error) -> Self {
        ReadError::Csv(Arc::new(error))
    }
}

/// The error type for loading reference regions.
#[derive(Debug)]
pub enum ReferenceDataError {
    /// A [`std::io::Error`] encountered while reading the reference file.
    Io(io::Error),

    /// A [`serde_json::Error`] encountered while deserializing GeoJSON.
    Json(serde_json::Error),

    /// A feature that cannot be turned into a reference point.
    InvalidFeature { index: usize, reason: String },
}

impl Display for ReferenceDataError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let reference_error = "reference data error:";

        match self {
            ReferenceDataError::Io(error) => write!(f, "{reference_error} I/O error: {error}"),
            ReferenceDataError::Json(error) => {
                write!(f, "{reference_error} GeoJSON deserialization error: {error}")
            }
            ReferenceDataError::InvalidFeature { index, reason } => {
                write!(f, "{reference_error} feature #{index} is invalid: {reason}")
            }
        }
    }
}

impl Error for ReferenceDataError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            ReferenceDataError::Io(error) => Some(error),
            ReferenceDataError::Json(error) => Some(error),
            ReferenceDataError::InvalidFeature { .. } => None,
        }
    }
}

impl From<io::Error> for ReferenceDataError {
    fn from(error: io::Error) -> Self {
        ReferenceDataError::Io(error)
    }
}

impl From<serde_json::Error> for ReferenceDataError {
    fn from(error: serde_json::Error) -> Self {
        ReferenceDataError::Json(error)
    }
}

/// The error type for driving an import pipeline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PipelineError {
    /// The dataset was requested before every chunk was processed.
    Incomplete { processed: usize, total: usize },
}

impl Display for PipelineError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            PipelineError::Incomplete { processed, total } => write!(
                f,
                "pipeline error: the import is still running ({processed} of {total} records processed)"
            ),
        }
    }
}

impl Error for PipelineError {}

use std::error::Error;
use std::fmt::Display;
use std::io;

use logcube_analytics::error::ReadError;
use logcube_analytics::error::ReferenceDataError;
use logcube_vis::error::VisError;

#[derive(Debug)]
pub(crate) enum CliError {
    Read(ReadError),
    Reference(ReferenceDataError),
    Vis(VisError),
    Json(serde_json::Error),
    Io(io::Error),
    Path(String),
    Filter(String),
}

impl From<ReadError> for CliError {
    fn from(error: ReadError) -> Self {
        CliError::Read(error)
    }
}

impl From<ReferenceDataError> for CliError {
    fn from(error: ReferenceDataError) -> Self {
        CliError::Reference(error)
    }
}

impl From<VisError> for CliError {
    fn from(error: VisError) -> Self {
        CliError::Vis(error)
    }
}

impl From<serde_json::Error> for CliError {
    fn from(error: serde_json::Error) -> Self {
        CliError::Json(error)
    }
}

impl From<io::Error> for CliError {
    fn from(error: io::Error) -> Self {
        CliError::Io(error)
    }
}

impl Display for CliError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let cli_error = "CLI error:";

        match self {
            CliError::Read(error) => write!(f, "{cli_error} {error}"),
            CliError::Reference(error) => write!(f, "{cli_error} {error}"),
            CliError::Vis(error) => write!(f, "{cli_error} {error}"),
            CliError::Json(error) => write!(f, "{cli_error} summary serialization error: {error}"),
            CliError::Io(error) => write!(f, "{cli_error} I/O error: {error}"),
            CliError::Path(error) => write!(f, "{cli_error} {error}"),
            CliError::Filter(error) => write!(f, "{cli_error} invalid filter: {error}"),
        }
    }
}

impl Error for CliError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            CliError::Read(error) => Some(error),
            CliError::Reference(error) => Some(error),
            CliError::Vis(error) => Some(error),
            CliError::Json(error) => Some(error),
            CliError::Io(error) => Some(error),
            CliError::Path(_) | CliError::Filter(_) => None,
        }
    }
}

use crate::records::error::RecordError;
use crate::stations::error::DirectoryError;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum GhcnError {
    #[error(transparent)]
    Directory(#[from] DirectoryError),

    #[error(transparent)]
    Records(#[from] RecordError),

    #[error("Invalid parameter '{parameter}' ({value:?}): {reason}")]
    InvalidParameter {
        parameter: &'static str,
        value: String,
        reason: String,
    },

    #[error("Station '{0}' not found in the station directory")]
    StationNotFound(String),

    #[error("No temperature data for station '{station}' between {start_year} and {end_year}")]
    NoDataForRange {
        station: String,
        start_year: i32,
        end_year: i32,
    },

    #[error("Failed to create cache directory '{0}'")]
    CacheDirCreation(PathBuf, #[source] std::io::Error),

    #[error("Failed to determine cache directory")]
    CacheDirResolution,

    #[error("Failed to build HTTP client")]
    HttpClient(#[source] reqwest::Error),
}

impl GhcnError {
    pub(crate) fn invalid_parameter(
        parameter: &'static str,
        value: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        Self::InvalidParameter {
            parameter,
            value: value.into(),
            reason: reason.into(),
        }
    }
}

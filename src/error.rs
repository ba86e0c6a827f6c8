//! Errors raised while loading match and character data
//!
//! The simulation itself never fails; only the data loading surface does.

use std::path::PathBuf;

use thiserror::Error;

/// Failure while reading or validating configuration data.
#[derive(Debug, Error)]
pub enum DataError {
    /// The file could not be read.
    #[error("failed to read {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    /// The JSON document did not match the expected layout.
    #[error("invalid JSON: {0}")]
    Json(#[from] serde_json::Error),
    /// A move id does not fit the move table.
    #[error("move id {0} is out of range")]
    MoveIdOutOfRange(u8),
    /// Two moves share the same id.
    #[error("duplicate move id {0}")]
    DuplicateMove(u8),
    /// A numeric stat is outside its accepted range.
    #[error("{name} = {value} is out of range")]
    StatOutOfRange { name: &'static str, value: f32 },
}

impl DataError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    pub(crate) fn stat(name: &'static str, value: impl Into<f32>) -> Self {
        Self::StatOutOfRange {
            name,
            value: value.into(),
        }
    }
}

// Song catalog error types and constants

use crate::error::ErrorCode;
use log::error;
use std::fmt;

/// Catalog error code constants
///
/// Error code range: 2001-2003
pub struct CatalogErrorCodes {}

impl CatalogErrorCodes {
    /// Catalog file could not be read
    pub const IO: i32 = 2001;

    /// Catalog file is not a valid JSON song list
    pub const PARSE: i32 = 2002;

    /// A song entry violates min <= max or has no title
    pub const INVALID_SONG: i32 = 2003;
}

/// Log a catalog error with structured context
pub fn log_catalog_error(err: &CatalogError, context: &str) {
    error!(
        "Catalog error in {}: code={}, component=SongCatalog, message={}",
        context,
        err.code(),
        err.message()
    );
}

/// Errors raised while loading a song catalog from disk
#[derive(Debug, Clone, PartialEq)]
pub enum CatalogError {
    Io { path: String, reason: String },
    Parse { reason: String },
    InvalidSong { index: usize, reason: String },
}

impl ErrorCode for CatalogError {
    fn code(&self) -> i32 {
        match self {
            CatalogError::Io { .. } => CatalogErrorCodes::IO,
            CatalogError::Parse { .. } => CatalogErrorCodes::PARSE,
            CatalogError::InvalidSong { .. } => CatalogErrorCodes::INVALID_SONG,
        }
    }

    fn message(&self) -> String {
        match self {
            CatalogError::Io { path, reason } => {
                format!("Failed to read catalog {}: {}", path, reason)
            }
            CatalogError::Parse { reason } => format!("Invalid catalog JSON: {}", reason),
            CatalogError::InvalidSong { index, reason } => {
                format!("Invalid song at index {}: {}", index, reason)
            }
        }
    }
}

impl fmt::Display for CatalogError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "CatalogError (code {}): {}", self.code(), self.message())
    }
}

impl std::error::Error for CatalogError {}

impl From<serde_json::Error> for CatalogError {
    fn from(err: serde_json::Error) -> Self {
        CatalogError::Parse {
            reason: err.to_string(),
        }
    }
}

// Error types for the vocal range tester
//
// This module defines custom error types for audio capture and song catalog
// operations, providing structured error handling with numeric error codes
// that the CLI and HTTP layers can report.

mod audio;
mod catalog;

pub use audio::{log_audio_error, AudioError, AudioErrorCodes};
pub use catalog::{log_catalog_error, CatalogError, CatalogErrorCodes};

/// Error codes for structured error reporting
///
/// This trait provides a standard way to get error codes and messages
/// from custom error types, enabling consistent error handling across
/// the CLI and HTTP boundaries.
pub trait ErrorCode {
    /// Get the numeric error code
    fn code(&self) -> i32;

    /// Get the human-readable error message
    fn message(&self) -> String;
}

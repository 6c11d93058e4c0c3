// Audio error types and constants

use crate::error::ErrorCode;
use log::error;
use std::fmt;

/// Audio error code constants
///
/// Error code range: 1001-1008 (1002 is unassigned; stopping an idle
/// session is not an error)
pub struct AudioErrorCodes {}

impl AudioErrorCodes {
    /// A recording session is already active
    pub const ALREADY_RECORDING: i32 = 1001;

    /// Microphone permission denied
    pub const PERMISSION_DENIED: i32 = 1003;

    /// No input device is available
    pub const DEVICE_UNAVAILABLE: i32 = 1004;

    /// Failed to open audio stream
    pub const STREAM_OPEN_FAILED: i32 = 1005;

    /// Input device only offers sample formats we cannot decode
    pub const UNSUPPORTED_FORMAT: i32 = 1006;

    /// Mutex/RwLock was poisoned
    pub const LOCK_POISONED: i32 = 1007;

    /// Audio stream disconnected or capture thread died
    pub const STREAM_FAILURE: i32 = 1008;
}

/// Log an audio error with structured context
///
/// Emits error_code, component and message fields so failed starts are
/// visible in the log even when the caller only shows a short notice.
pub fn log_audio_error(err: &AudioError, context: &str) {
    error!(
        "Audio error in {}: code={}, component=Capture, message={}",
        context,
        err.code(),
        err.message()
    );
}

/// Audio-related errors
///
/// These errors cover microphone access, stream management and the
/// recording session lifecycle. All of them are recoverable: a failed
/// start leaves the session untouched.
///
/// Error code range: 1001-1008
#[derive(Debug, Clone, PartialEq)]
pub enum AudioError {
    /// A recording session is already active
    AlreadyRecording,

    /// Microphone permission denied
    PermissionDenied,

    /// No input device is available
    DeviceUnavailable,

    /// Failed to open audio stream
    StreamOpenFailed { reason: String },

    /// Input sample format cannot be decoded
    UnsupportedFormat { format: String },

    /// Mutex/RwLock was poisoned
    LockPoisoned { component: String },

    /// Stream channel disconnected unexpectedly
    StreamFailure { reason: String },
}

impl AudioError {
    /// Whether this error means the user never granted a usable microphone.
    ///
    /// These are the failures shown as a blocking notice rather than a
    /// generic error.
    pub fn is_access_failure(&self) -> bool {
        matches!(
            self,
            AudioError::PermissionDenied | AudioError::DeviceUnavailable
        )
    }
}

impl ErrorCode for AudioError {
    fn code(&self) -> i32 {
        match self {
            AudioError::AlreadyRecording => AudioErrorCodes::ALREADY_RECORDING,
            AudioError::PermissionDenied => AudioErrorCodes::PERMISSION_DENIED,
            AudioError::DeviceUnavailable => AudioErrorCodes::DEVICE_UNAVAILABLE,
            AudioError::StreamOpenFailed { .. } => AudioErrorCodes::STREAM_OPEN_FAILED,
            AudioError::UnsupportedFormat { .. } => AudioErrorCodes::UNSUPPORTED_FORMAT,
            AudioError::LockPoisoned { .. } => AudioErrorCodes::LOCK_POISONED,
            AudioError::StreamFailure { .. } => AudioErrorCodes::STREAM_FAILURE,
        }
    }

    fn message(&self) -> String {
        match self {
            AudioError::AlreadyRecording => {
                "Recording already in progress. Call stop() first.".to_string()
            }
            AudioError::PermissionDenied => {
                "Microphone permission denied. Please grant microphone access.".to_string()
            }
            AudioError::DeviceUnavailable => "No microphone is available".to_string(),
            AudioError::StreamOpenFailed { reason } => {
                format!("Failed to open audio stream: {}", reason)
            }
            AudioError::UnsupportedFormat { format } => {
                format!("Unsupported input sample format: {}", format)
            }
            AudioError::LockPoisoned { component } => {
                format!("Lock poisoned on {}", component)
            }
            AudioError::StreamFailure { reason } => {
                format!("Audio stream failed: {}", reason)
            }
        }
    }
}

impl fmt::Display for AudioError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "AudioError::{:?} (code {}): {}",
            self,
            self.code(),
            self.message()
        )
    }
}

impl std::error::Error for AudioError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_audio_error_codes() {
        assert_eq!(
            AudioError::AlreadyRecording.code(),
            AudioErrorCodes::ALREADY_RECORDING
        );
        assert_eq!(
            AudioError::PermissionDenied.code(),
            AudioErrorCodes::PERMISSION_DENIED
        );
        assert_eq!(
            AudioError::DeviceUnavailable.code(),
            AudioErrorCodes::DEVICE_UNAVAILABLE
        );
        assert_eq!(
            AudioError::StreamOpenFailed {
                reason: "test".to_string()
            }
            .code(),
            AudioErrorCodes::STREAM_OPEN_FAILED
        );
        assert_eq!(
            AudioError::UnsupportedFormat {
                format: "u8".to_string()
            }
            .code(),
            AudioErrorCodes::UNSUPPORTED_FORMAT
        );
        assert_eq!(
            AudioError::LockPoisoned {
                component: "test".to_string()
            }
            .code(),
            AudioErrorCodes::LOCK_POISONED
        );
        assert_eq!(
            AudioError::StreamFailure {
                reason: "test".to_string()
            }
            .code(),
            AudioErrorCodes::STREAM_FAILURE
        );
    }

    #[test]
    fn test_audio_error_messages() {
        let err = AudioError::AlreadyRecording;
        assert!(err.message().contains("already in progress"));

        let err = AudioError::PermissionDenied;
        assert!(err.message().contains("permission denied"));

        let err = AudioError::UnsupportedFormat {
            format: "U8".to_string(),
        };
        assert_eq!(err.message(), "Unsupported input sample format: U8");
    }

    #[test]
    fn test_audio_error_display() {
        let err = AudioError::DeviceUnavailable;
        let display = format!("{}", err);
        assert!(display.contains("AudioError"));
        assert!(display.contains(&err.code().to_string()));
    }

    #[test]
    fn test_audio_error_codes_are_distinct() {
        let codes = [
            AudioError::AlreadyRecording.code(),
            AudioError::PermissionDenied.code(),
            AudioError::DeviceUnavailable.code(),
            AudioError::StreamOpenFailed { reason: String::new() }.code(),
            AudioError::UnsupportedFormat { format: String::new() }.code(),
            AudioError::LockPoisoned { component: String::new() }.code(),
            AudioError::StreamFailure { reason: String::new() }.code(),
        ];
        assert_eq!(codes, [1001, 1003, 1004, 1005, 1006, 1007, 1008]);
    }

    #[test]
    fn test_access_failures() {
        assert!(AudioError::PermissionDenied.is_access_failure());
        assert!(AudioError::DeviceUnavailable.is_access_failure());
        assert!(!AudioError::AlreadyRecording.is_access_failure());
        assert!(!AudioError::StreamOpenFailed {
            reason: "busy".to_string()
        }
        .is_access_failure());
    }
}

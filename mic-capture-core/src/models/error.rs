use thiserror::Error;

/// Errors that can occur during microphone capture.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CaptureError {
    #[error("permission denied")]
    PermissionDenied,

    #[error("device not available")]
    DeviceUnavailable,

    #[error("underflow: expected {expected} bytes, got {actual}")]
    Underflow { expected: usize, actual: usize },

    #[error("capture already running")]
    AlreadyRunning,

    #[error("capture not running")]
    NotRunning,

    #[error("capture thread did not stop in time")]
    ShutdownTimeout,

    #[error("configuration failed: {0}")]
    ConfigurationFailed(String),

    #[error("storage error: {0}")]
    StorageError(String),

    #[error("sink '{sink}' failed: {message}")]
    SinkFailed { sink: String, message: String },

    #[error("recognition failed: {0}")]
    RecognitionFailed(String),

    #[error("unknown error: {0}")]
    Unknown(String),
}

impl CaptureError {
    /// Per-frame errors the capture loop skips over instead of ending the session.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Underflow { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_underflow_is_transient() {
        assert!(CaptureError::Underflow { expected: 1764, actual: 12 }.is_transient());
        assert!(!CaptureError::DeviceUnavailable.is_transient());
        assert!(!CaptureError::PermissionDenied.is_transient());
        assert!(!CaptureError::ShutdownTimeout.is_transient());
    }

    #[test]
    fn display_names_the_sink() {
        let err = CaptureError::SinkFailed {
            sink: "wave".into(),
            message: "disk full".into(),
        };
        assert_eq!(err.to_string(), "sink 'wave' failed: disk full");
    }
}

//! Settings error types.

use thiserror::Error;

/// Errors that can occur when loading or validating handler options.
#[derive(Debug, Error)]
pub enum SettingsError {
    /// Failed to read the options file from disk.
    #[error("failed to read options file: {0}")]
    Io(#[from] std::io::Error),
    /// Failed to parse JSON in the options file.
    #[error("failed to parse options JSON: {0}")]
    Json(#[from] serde_json::Error),
    /// An option value was invalid (e.g., zero slots).
    #[error("invalid option value: {0}")]
    InvalidValue(String),
}

/// Result type for settings operations.
pub type Result<T> = std::result::Result<T, SettingsError>;

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    #[test]
    fn json_error_display() {
        let json_err = serde_json::from_str::<serde_json::Value>("invalid").unwrap_err();
        let err = SettingsError::Json(json_err);
        assert!(err.to_string().contains("parse options JSON"));
    }

    #[test]
    fn invalid_value_display() {
        let err = SettingsError::InvalidValue("num_slots must be at least 1".to_string());
        assert_eq!(
            err.to_string(),
            "invalid option value: num_slots must be at least 1"
        );
    }

    #[test]
    fn io_error_from_conversion() {
        let io_err = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied");
        let err: SettingsError = io_err.into();
        assert_matches!(err, SettingsError::Io(_));
    }
}

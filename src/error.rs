//! Error handling for the PidVis-RS application
//!
//! This module defines the crate-wide error type and a Result alias.
//! Frame-level decoding faults are deliberately not part of this type:
//! they never leave the decoder (see [`crate::protocol::FrameError`]).

use thiserror::Error;

/// Main error type for PidVis-RS operations
#[derive(Error, Debug)]
pub enum PidVisError {
    /// Opening or reading the telemetry link failed
    #[error("Connection error on {port}: {message}")]
    Connection { port: String, message: String },

    /// Errors reported by the serialport crate outside of a connection attempt
    #[error("Serial port error: {0}")]
    Serial(#[from] serialport::Error),

    /// Errors related to configuration loading/saving
    #[error("Configuration error: {0}")]
    Config(String),

    /// Window span must be a positive, finite number of seconds
    #[error("Invalid window span: {0} s (must be > 0)")]
    InvalidSpan(f64),

    /// Errors related to channel registration or communication
    #[error("Channel error: {0}")]
    Channel(String),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization errors
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Generic errors with context
    #[error("{context}: {source}")]
    WithContext {
        context: String,
        #[source]
        source: Box<PidVisError>,
    },
}

impl PidVisError {
    /// Add context to an error
    pub fn with_context(self, context: impl Into<String>) -> Self {
        PidVisError::WithContext {
            context: context.into(),
            source: Box::new(self),
        }
    }

    /// Build a connection error for the given port
    pub fn connection(port: impl Into<String>, message: impl ToString) -> Self {
        PidVisError::Connection {
            port: port.into(),
            message: message.to_string(),
        }
    }

    /// Whether this error (or the error it wraps) is a connection failure
    pub fn is_connection(&self) -> bool {
        match self {
            PidVisError::Connection { .. } => true,
            PidVisError::WithContext { source, .. } => source.is_connection(),
            _ => false,
        }
    }
}

/// Result type alias for PidVis-RS operations
pub type Result<T> = std::result::Result<T, PidVisError>;

/// Extension trait for adding context to Results
pub trait ResultExt<T> {
    /// Add context to an error result
    fn context(self, context: impl Into<String>) -> Result<T>;

    /// Add context lazily to an error result
    fn with_context<F>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> String;
}

impl<T> ResultExt<T> for Result<T> {
    fn context(self, context: impl Into<String>) -> Result<T> {
        self.map_err(|e| e.with_context(context))
    }

    fn with_context<F>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> String,
    {
        self.map_err(|e| e.with_context(f()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = PidVisError::Config("missing field".to_string());
        assert_eq!(err.to_string(), "Configuration error: missing field");
    }

    #[test]
    fn test_connection_error() {
        let err = PidVisError::connection("/dev/ttyUSB0", "Device or resource busy");
        assert!(err.to_string().contains("/dev/ttyUSB0"));
        assert!(err.to_string().contains("busy"));
        assert!(err.is_connection());
    }

    #[test]
    fn test_error_with_context() {
        let err = PidVisError::connection("COM3", "not found").with_context("Failed to connect");
        assert!(err.to_string().starts_with("Failed to connect"));
        assert!(err.is_connection());
    }

    #[test]
    fn test_result_ext_context() {
        let result: Result<()> = Err(PidVisError::InvalidSpan(-1.0));
        let err = result.context("Applying plot config").unwrap_err();
        assert!(err.to_string().contains("Applying plot config"));
        assert!(!err.is_connection());
    }
}

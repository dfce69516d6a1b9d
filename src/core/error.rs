use std::io;
use thiserror::Error;

/// Unified error type for the Eloy assistant
#[derive(Error, Debug)]
pub enum EloyError {
    /// Completion endpoint errors (bad status, empty answer)
    #[error("API error: {0}")]
    Api(String),

    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// User input errors
    #[error("Input error: {0}")]
    Input(String),

    /// IO-related errors
    #[error("IO error: {source}")]
    Io {
        #[from]
        source: io::Error,
    },

    /// Serialization/deserialization errors
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Network-related errors
    #[error("Network error: {0}")]
    Network(String),

    /// Record store errors (JSON document or remote tables)
    #[error("Store error: {0}")]
    Store(String),
}

impl From<reqwest::Error> for EloyError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            EloyError::Network(format!("Request timed out: {}", err))
        } else if err.is_connect() {
            EloyError::Network(format!("Connection failed: {}", err))
        } else if err.is_status() {
            EloyError::Api(format!("API returned error status: {}", err))
        } else {
            EloyError::Network(format!("Request failed: {}", err))
        }
    }
}

impl From<serde_json::Error> for EloyError {
    fn from(err: serde_json::Error) -> Self {
        EloyError::Serialization(format!("JSON error: {}", err))
    }
}

impl From<serde_yml::Error> for EloyError {
    fn from(err: serde_yml::Error) -> Self {
        EloyError::Serialization(format!("YAML error: {}", err))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn json_errors_become_serialization_errors() {
        let err = serde_json::from_str::<serde_json::Value>("{nope").unwrap_err();
        let err: EloyError = err.into();
        assert!(matches!(err, EloyError::Serialization(_)));
        assert!(err.to_string().starts_with("Serialization error: JSON error"));
    }

    #[test]
    fn io_errors_keep_their_source() {
        let err: EloyError = io::Error::new(io::ErrorKind::NotFound, "banco.json").into();
        assert_eq!(err.to_string(), "IO error: banco.json");
    }
}

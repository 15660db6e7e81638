//! Error types for the regimen_core library.

use std::io;

/// Result type alias using our Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for regimen_core operations
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// IO error occurred
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// CSV error
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// TOML parsing error
    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),

    /// A referenced entity id does not exist
    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },

    /// Structurally impossible input to a derivation or an ordering violation
    #[error("Invalid state: {0}")]
    InvalidState(String),

    /// Write-time field validation failure
    #[error("Validation error: {0}")]
    Validation(String),

    /// Configuration validation error
    #[error("Configuration error: {0}")]
    Config(String),
}

impl Error {
    pub fn not_found(entity: &'static str, id: impl ToString) -> Self {
        Error::NotFound {
            entity,
            id: id.to_string(),
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Error::NotFound { .. })
    }

    pub fn is_validation(&self) -> bool {
        matches!(self, Error::Validation(_))
    }

    pub fn is_invalid_state(&self) -> bool {
        matches!(self, Error::InvalidState(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_found_message_names_entity() {
        let err = Error::not_found("program", "abc");
        assert!(err.is_not_found());
        assert_eq!(err.to_string(), "program not found: abc");
    }

    #[test]
    fn test_kinds_are_distinct() {
        let validation = Error::Validation("bad rpe".into());
        let invalid = Error::InvalidState("zero target".into());
        assert!(validation.is_validation());
        assert!(!validation.is_invalid_state());
        assert!(invalid.is_invalid_state());
        assert!(!invalid.is_not_found());
    }
}

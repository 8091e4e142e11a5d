//! Error types for the platformer-q crate

use thiserror::Error;

/// Main error type for the platformer-q crate
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum Error {
    #[error("insufficient data for {operation}: need {required}, got {available}")]
    InsufficientData {
        operation: String,
        required: usize,
        available: usize,
    },

    #[error("{component} used before training")]
    NotTrained { component: String },

    #[error("cluster {index} has no members")]
    EmptyCluster { index: usize },

    #[error("failed to load {what}: {message}")]
    Load { what: String, message: String },

    #[error("{component} is frozen: {message}")]
    Capacity { component: String, message: String },

    #[error("{component} has already been trained")]
    AlreadyTrained { component: String },

    #[error("dimension mismatch: expected {expected}, got {got}")]
    DimensionMismatch { expected: usize, got: usize },

    #[error("invalid configuration: {message}")]
    InvalidConfiguration { message: String },

    #[error("unknown action id {id} (expected 0-11)")]
    UnknownAction { id: usize },

    #[error("environment error: {message}")]
    Environment { message: String },

    #[error("cannot {operation} while the episode is {phase}")]
    Phase { operation: String, phase: String },

    #[error("failed to {operation}: {source}")]
    Io {
        operation: String,
        #[source]
        source: std::io::Error,
    },

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("failed to {operation}: {message}")]
    SerializationContext { operation: String, message: String },

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("progress bar template error: {message}")]
    ProgressBarTemplate { message: String },
}

/// Convenience type alias for Results using the crate's Error type
pub type Result<T> = std::result::Result<T, Error>;

impl From<std::io::Error> for Error {
    fn from(source: std::io::Error) -> Self {
        Error::Io {
            operation: "IO operation".to_string(),
            source,
        }
    }
}

impl Error {
    pub(crate) fn not_trained(component: &str) -> Self {
        Error::NotTrained {
            component: component.to_string(),
        }
    }

    pub(crate) fn load(what: &str, message: impl Into<String>) -> Self {
        Error::Load {
            what: what.to_string(),
            message: message.into(),
        }
    }

    pub(crate) fn invalid_config(message: impl Into<String>) -> Self {
        Error::InvalidConfiguration {
            message: message.into(),
        }
    }
}

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("File not found or could not be read: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Failed to parse planner JSON input: {0}")]
    DeserializationError(#[from] serde_json::Error),

    #[error("Invalid planner configuration: {0}")]
    ConfigurationError(String),

    #[error("Internal planner error: {0}")]
    InvariantViolation(String),

    #[error("Operation '{operation}' is not supported by the {refiner} refiner")]
    UnsupportedOperation {
        refiner: &'static str,
        operation: &'static str,
    },

    #[error("Unknown transfer refiner '{0}'")]
    UnknownRefiner(String),

    #[error("Malformed URL, expected a file url: {0}")]
    MalformedUrl(String),
}

pub type Result<T> = std::result::Result<T, Error>;

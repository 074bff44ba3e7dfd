use thiserror::Error;

#[derive(Error, Debug)]
pub enum MonitorError {
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
    #[error("Invalid fault injection: {0}")]
    InvalidInjection(String),
    #[error("Validation error: {0}")]
    ValidationError(String),
    #[error("Control loop is no longer running")]
    LoopStopped,
}

/// Failure of an external collaborator (diagnosis or chat backend).
///
/// These never escape the control loop: diagnosis failures are replaced by the
/// fallback diagnosis and chat failures become a user-visible message.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum CollaboratorError {
    #[error("collaborator unavailable: {0}")]
    Unavailable(String),
    #[error("collaborator timed out after {0} ms")]
    Timeout(u64),
    #[error("invalid collaborator response: {0}")]
    InvalidResponse(String),
}

pub type Result<T> = std::result::Result<T, MonitorError>;

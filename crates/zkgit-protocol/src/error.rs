use thiserror::Error;

#[derive(Debug, Error)]
pub enum ProtocolError {
    #[error("unsupported operation: {0}")]
    UnsupportedOperation(String),

    #[error("malformed {command} line: {line}")]
    Malformed { command: &'static str, line: String },

    #[error("companion not running or wrong port configured ({0})")]
    CompanionNotRunning(String),

    #[error("companion not connected: {0}")]
    CompanionNotConnected(String),

    #[error("no companion port in remote URL")]
    MissingPort,

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type ProtocolResult<T> = Result<T, ProtocolError>;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum BusError {
    #[error("unknown command: {0}")]
    UnknownCommand(String),
    #[error("command handler failed: {0}")]
    HandlerFailed(String),
    #[error("command bus closed")]
    Closed,
}

pub type Result<T> = std::result::Result<T, BusError>;

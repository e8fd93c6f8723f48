use thiserror::Error;

#[derive(Debug, Error)]
pub enum ChatError {
    #[error("server is already listening")]
    AlreadyStarted,
    #[error("client has not connected yet")]
    NotStarted,
    #[error("address already in use")]
    PortBusy,
    #[error("no address could be resolved")]
    NoAddr,
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
    #[error("poll timed out")]
    Timeout,
    #[error("system error: {0}")]
    Sys(#[from] std::io::Error),
}

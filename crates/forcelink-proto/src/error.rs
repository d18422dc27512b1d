use thiserror::Error;

#[derive(Debug, Error)]
pub enum ExchangeError {
    #[error("substrate error: {0}")]
    Substrate(String),
    #[error("substrate aborted with code {0}")]
    Aborted(i32),
    #[error("registration timed out: ensure the controller is running")]
    RegistrationTimeout,
    #[error("timed out after {ms} ms awaiting controller response")]
    ResponseTimeout { ms: f64 },
    #[error("protocol error: {0}")]
    Protocol(String),
    #[error("codec error: {0}")]
    Codec(#[from] serde_json::Error),
}

pub type ExchangeResult<T> = Result<T, ExchangeError>;

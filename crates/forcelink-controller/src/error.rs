use forcelink_proto::ExchangeError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ControllerError {
    #[error(transparent)]
    Exchange(#[from] ExchangeError),
    #[error("idle for more than {ms} ms")]
    IdleTimeout { ms: u64 },
    #[error("bookkeeping error: {0}")]
    Bookkeeping(String),
}

pub type ControllerResult<T> = Result<T, ControllerError>;

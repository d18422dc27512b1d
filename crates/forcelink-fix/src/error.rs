use forcelink_proto::ExchangeError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum FixError {
    #[error("malformed fix arguments: {0}")]
    Malformed(String),
    #[error("force grid error: {0}")]
    Grid(String),
    #[error("fix is not registered with a controller")]
    Unregistered,
    #[error(transparent)]
    Exchange(#[from] ExchangeError),
}

pub type FixResult<T> = Result<T, FixError>;

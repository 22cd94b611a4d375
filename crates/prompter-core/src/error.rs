use std::time::Duration;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error(transparent)]
    Spawn(#[from] ractor::SpawnErr),

    #[error("session actor unreachable: {0}")]
    Unreachable(String),

    #[error("bridge generation timed out after {0:?}")]
    GenerationTimeout(Duration),
}

pub type Result<T> = std::result::Result<T, Error>;

use thiserror::Error;

/// Simple result type used across database interfaces.
pub type DbResult<T> = Result<T, DbError>;

#[derive(Debug, Error)]
pub enum DbError {
    #[error("tried to insert {0} at out-of-order height {1} (expected {2})")]
    OooInsert(&'static str, u64, u64),

    #[error("missing block at height {0}")]
    MissingBlock(u64),

    #[error("{0}")]
    Other(String),
}

impl From<anyhow::Error> for DbError {
    fn from(value: anyhow::Error) -> Self {
        Self::Other(value.to_string())
    }
}

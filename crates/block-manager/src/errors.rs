use thiserror::Error;

use velum_db::DbError;

#[derive(Debug, Error)]
pub enum Error {
    /// Genesis parameters that can never produce a live chain.
    #[error("invalid genesis: initial height must be nonzero")]
    InvalidGenesis,

    /// Startup state resolution hit a store failure that was not just "no
    /// state stored yet".
    #[error("resolving initial state: {0}")]
    StateResolution(#[source] DbError),

    #[error("db: {0}")]
    Db(#[from] DbError),

    /// The store claims a chain tip but the block at that height is missing.
    #[error("missing stored block at height {0}")]
    MissingBlock(u64),
}

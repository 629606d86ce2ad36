use thiserror::Error;

/// Errors surfaced to callers of the pool.
///
/// Runtime and infrastructure failures (timeouts, dead units, a terminated
/// pool) are never reported here; they degrade to an approximate
/// [`TokenCount`](crate::TokenCount) instead. Only input validation fails.
#[derive(Error, Debug)]
pub enum PoolError {
    #[error("input too large: {size} bytes exceeds limit of {limit} bytes")]
    InputTooLarge { size: usize, limit: usize },

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

pub type Result<T> = std::result::Result<T, PoolError>;

use std::time::Duration;

use thiserror::Error;

/// Failure talking to or decoding from the listing cache.
///
/// Never fatal to a catalog call: the coordinator logs and counts it, then carries on.
#[derive(Debug, Error)]
pub enum CacheError {
    #[error("cache unavailable: {0}")]
    Unavailable(String),
    #[error("cache payload could not be encoded or decoded: {0}")]
    Codec(String),
    #[error("cache backend error: {0}")]
    Backend(String),
    #[error("cache did not answer within {0:?}")]
    Timeout(Duration),
}

impl From<serde_json::Error> for CacheError {
    fn from(err: serde_json::Error) -> Self {
        Self::Codec(err.to_string())
    }
}

impl From<redis::RedisError> for CacheError {
    fn from(err: redis::RedisError) -> Self {
        if err.is_io_error()
            || err.is_connection_refusal()
            || err.is_connection_dropped()
            || err.is_timeout()
        {
            Self::Unavailable(err.to_string())
        } else {
            Self::Backend(err.to_string())
        }
    }
}

use thiserror::Error;

/// A boxed error, used at API boundaries where the concrete error type
/// doesn't matter to the caller.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Errors produced by the store facade and the caches built on top of it.
#[derive(Error, Debug)]
pub enum StateError {
    #[error("sled error: {0}")]
    Sled(#[from] sled::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] utxoidx_chain::SerializationError),
}

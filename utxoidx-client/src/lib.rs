//! Abstract source of chain data for the ingestion driver, plus the two
//! concrete upstream transports it can be pointed at.

mod full_node;
mod jsonrpc;
mod raw_block_service;

pub use full_node::FullNodeClient;
pub use raw_block_service::RawBlockServiceClient;

use async_trait::async_trait;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ClientError {
    #[error("upstream request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("upstream returned a JSON-RPC error {code}: {message}")]
    Rpc { code: i64, message: String },

    #[error("upstream response could not be parsed: {0}")]
    Parse(String),
}

/// The three operations the ingestion driver needs from an upstream source.
/// Every call is independent and may be cancelled without leaving the
/// client in an inconsistent state.
#[async_trait]
pub trait UpstreamClient: Send + Sync {
    async fn block_count(&self) -> Result<u32, ClientError>;
    async fn block_hash(&self, height: u32) -> Result<String, ClientError>;
    async fn raw_block(&self, hash: &str) -> Result<String, ClientError>;
}

/// Which upstream transport `upstream_mode` selects.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum UpstreamMode {
    /// A full node's standard JSON-RPC surface (`getblockcount`, etc).
    FullNode,
    /// A secondary raw-block service (`Service.GetBlockCount`, etc).
    RawBlockService,
}

/// Build the configured client variant. Exactly one is ever active.
pub fn build_client(mode: UpstreamMode, url: &str) -> Box<dyn UpstreamClient> {
    match mode {
        UpstreamMode::FullNode => Box::new(FullNodeClient::new(url)),
        UpstreamMode::RawBlockService => Box::new(RawBlockServiceClient::new(url)),
    }
}

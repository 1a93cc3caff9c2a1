//! Client for a full node's standard JSON-RPC surface.

use async_trait::async_trait;
use serde_json::json;

use crate::jsonrpc::JsonRpcTransport;
use crate::{ClientError, UpstreamClient};

pub struct FullNodeClient {
    transport: JsonRpcTransport,
}

impl FullNodeClient {
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            transport: JsonRpcTransport::new(endpoint),
        }
    }
}

#[async_trait]
impl UpstreamClient for FullNodeClient {
    async fn block_count(&self) -> Result<u32, ClientError> {
        let result = self.transport.call("getblockcount", json!([])).await?;
        result
            .as_u64()
            .map(|n| n as u32)
            .ok_or_else(|| ClientError::Parse("getblockcount did not return a number".to_string()))
    }

    async fn block_hash(&self, height: u32) -> Result<String, ClientError> {
        let result = self
            .transport
            .call("getblockhash", json!([height]))
            .await?;
        result
            .as_str()
            .map(str::to_string)
            .ok_or_else(|| ClientError::Parse("getblockhash did not return a string".to_string()))
    }

    async fn raw_block(&self, hash: &str) -> Result<String, ClientError> {
        let result = self.transport.call("getblock", json!([hash, 0])).await?;
        result
            .as_str()
            .map(str::to_string)
            .ok_or_else(|| ClientError::Parse("getblock did not return hex".to_string()))
    }
}

//! Client for a secondary raw-block service, used when `upstream_mode`
//! selects it instead of a full node.

use async_trait::async_trait;
use serde_json::json;

use crate::jsonrpc::JsonRpcTransport;
use crate::{ClientError, UpstreamClient};

pub struct RawBlockServiceClient {
    transport: JsonRpcTransport,
}

impl RawBlockServiceClient {
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            transport: JsonRpcTransport::new(endpoint),
        }
    }
}

#[async_trait]
impl UpstreamClient for RawBlockServiceClient {
    async fn block_count(&self) -> Result<u32, ClientError> {
        let result = self
            .transport
            .call("Service.GetBlockCount", json!([]))
            .await?;
        result
            .as_u64()
            .map(|n| n as u32)
            .ok_or_else(|| {
                ClientError::Parse("Service.GetBlockCount did not return a number".to_string())
            })
    }

    async fn block_hash(&self, height: u32) -> Result<String, ClientError> {
        let result = self
            .transport
            .call("Service.GetBlockHash", json!([height]))
            .await?;
        result.as_str().map(str::to_string).ok_or_else(|| {
            ClientError::Parse("Service.GetBlockHash did not return a string".to_string())
        })
    }

    async fn raw_block(&self, hash: &str) -> Result<String, ClientError> {
        let result = self
            .transport
            .call("Service.GetRawBlock", json!([hash]))
            .await?;
        result.as_str().map(str::to_string).ok_or_else(|| {
            ClientError::Parse("Service.GetRawBlock did not return hex".to_string())
        })
    }
}

//! JSON-RPC 2.0 request/response envelope.

use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, Deserialize)]
pub struct JsonRpcRequest {
    #[serde(default)]
    pub jsonrpc: String,
    pub method: String,
    #[serde(default)]
    pub params: Value,
    #[serde(default)]
    pub id: Value,
}

#[derive(Debug, Clone, Serialize)]
pub struct JsonRpcResponse {
    pub jsonrpc: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<JsonRpcErrorBody>,
    pub id: Value,
}

#[derive(Debug, Clone, Serialize)]
pub struct JsonRpcErrorBody {
    pub code: i32,
    pub message: String,
}

impl JsonRpcResponse {
    pub fn result(id: Value, result: Value) -> Self {
        Self {
            jsonrpc: "2.0",
            result: Some(result),
            error: None,
            id,
        }
    }

    pub fn error(id: Value, code: i32, message: String) -> Self {
        Self {
            jsonrpc: "2.0",
            result: None,
            error: Some(JsonRpcErrorBody { code, message }),
            id,
        }
    }
}

/// Printable (JSON-friendly) form of a `UtxoDetail`: hex/decimal fields
/// instead of binary, plus the source it describes.
#[derive(Debug, Clone, Serialize)]
pub struct UtxoDetailPrintable {
    pub trx_id: String,
    pub vout: u32,
    pub amount: i64,
    pub block_height: u32,
    pub address: String,
    pub script_pub_key: String,
    pub status: u8,
}

/// Printable form of a decoded transaction.
#[derive(Debug, Clone, Serialize)]
pub struct TransactionPrintable {
    pub trx_id: String,
    pub version: i32,
    pub locktime: u32,
    pub vin: Vec<TxInputPrintable>,
    pub vout: Vec<TxOutputPrintable>,
}

#[derive(Debug, Clone, Serialize)]
pub struct TxInputPrintable {
    pub prev_trx_id: String,
    pub prev_vout: u32,
    pub script_sig: String,
    pub sequence: u32,
}

#[derive(Debug, Clone, Serialize)]
pub struct TxOutputPrintable {
    pub amount: i64,
    pub script_pub_key: String,
}

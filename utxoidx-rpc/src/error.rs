use thiserror::Error;

/// Errors surfaced to RPC clients. Each variant's `Display` is the exact
/// error string a client should see.
#[derive(Error, Debug)]
pub enum RpcError {
    #[error("address not found")]
    AddressNotFound,

    #[error("transaction id not found")]
    TrxIdNotFound,

    #[error("utxo source not found")]
    UtxoSourceNotFound,

    #[error("unpack raw transaction fail")]
    UnpackFailed,

    #[error(transparent)]
    State(#[from] utxoidx_state::StateError),

    #[error("unknown method: {0}")]
    UnknownMethod(String),
}

impl RpcError {
    /// A stable JSON-RPC error code, grouped the way the query server's
    /// few failure modes naturally fall.
    pub fn code(&self) -> i32 {
        match self {
            RpcError::AddressNotFound => -32001,
            RpcError::TrxIdNotFound => -32002,
            RpcError::UtxoSourceNotFound => -32003,
            RpcError::UnpackFailed => -32004,
            RpcError::State(_) => -32000,
            RpcError::UnknownMethod(_) => -32601,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn each_variant_has_a_stable_code_and_message() {
        assert_eq!(RpcError::AddressNotFound.code(), -32001);
        assert_eq!(RpcError::AddressNotFound.to_string(), "address not found");

        assert_eq!(RpcError::TrxIdNotFound.code(), -32002);
        assert_eq!(RpcError::TrxIdNotFound.to_string(), "transaction id not found");

        assert_eq!(RpcError::UtxoSourceNotFound.code(), -32003);
        assert_eq!(RpcError::UtxoSourceNotFound.to_string(), "utxo source not found");

        assert_eq!(RpcError::UnpackFailed.code(), -32004);
        assert_eq!(RpcError::UnpackFailed.to_string(), "unpack raw transaction fail");

        let state_err: utxoidx_state::StateError =
            utxoidx_chain::SerializationError::Parse("bad varint").into();
        let expected = state_err.to_string();
        let wrapped = RpcError::State(state_err);
        assert_eq!(wrapped.code(), -32000);
        assert_eq!(wrapped.to_string(), expected);

        let unknown = RpcError::UnknownMethod("GetNonsense".to_string());
        assert_eq!(unknown.code(), -32601);
        assert_eq!(unknown.to_string(), "unknown method: GetNonsense");
    }
}

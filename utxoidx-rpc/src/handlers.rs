//! Dispatch for the six read-side query methods (spec: `GetBlockCount`,
//! `GetAddressTrxs`, `GetRawTrx`, `GetTrx`, `GetUtxo`, `ListUnSpent`).
//!
//! Every handler reads only from the stores (or the watermark); none of
//! them touch the slot/pending caches, which are confined to the
//! ingestion task.

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

use serde_json::{json, Value};
use utxoidx_chain::transaction::Transaction;
use utxoidx_chain::transparent::UtxoSource;
use utxoidx_chain::{BitcoinDeserialize, Uint256};
use utxoidx_state::{Store, UtxoDetail};

use crate::error::RpcError;
use crate::types::{TransactionPrintable, TxInputPrintable, TxOutputPrintable, UtxoDetailPrintable};

pub struct AppState {
    pub store: Store,
    /// Shared with the ingestion task, which is the only writer.
    pub block_height: Arc<AtomicU32>,
}

impl AppState {
    pub fn new(store: Store, block_height: Arc<AtomicU32>) -> Self {
        Self { store, block_height }
    }
}

fn utxo_detail_printable(src: &UtxoSource, detail: UtxoDetail) -> UtxoDetailPrintable {
    UtxoDetailPrintable {
        trx_id: src.trx_id.hex(),
        vout: src.vout,
        amount: detail.amount,
        block_height: detail.block_height,
        address: detail.address,
        script_pub_key: hex::encode(&detail.script_pub_key),
        status: detail.status,
    }
}

fn transaction_printable(trx_id: Uint256, trx: &Transaction) -> TransactionPrintable {
    TransactionPrintable {
        trx_id: trx_id.hex(),
        version: trx.version,
        locktime: trx.locktime,
        vin: trx
            .inputs
            .iter()
            .map(|input| TxInputPrintable {
                prev_trx_id: input.prevout.trx_id.hex(),
                prev_vout: input.prevout.vout,
                script_sig: hex::encode(&input.script_sig.0),
                sequence: input.sequence,
            })
            .collect(),
        vout: trx
            .outputs
            .iter()
            .map(|output| TxOutputPrintable {
                amount: output.amount,
                script_pub_key: hex::encode(&output.script_pub_key.0),
            })
            .collect(),
    }
}

fn parse_trx_id(params: &Value, field: &str) -> Result<Uint256, RpcError> {
    let raw = params
        .get(field)
        .and_then(Value::as_str)
        .ok_or(RpcError::TrxIdNotFound)?;
    raw.parse().map_err(|_| RpcError::TrxIdNotFound)
}

/// Parses a `"trx_id:vout"` string, the convention used throughout the
/// system for naming a single output.
fn parse_utxo_source(raw: &str) -> Result<UtxoSource, RpcError> {
    let (trx_id_hex, vout_str) = raw.split_once(':').ok_or(RpcError::UtxoSourceNotFound)?;
    let trx_id: Uint256 = trx_id_hex.parse().map_err(|_| RpcError::UtxoSourceNotFound)?;
    let vout: u32 = vout_str.parse().map_err(|_| RpcError::UtxoSourceNotFound)?;
    Ok(UtxoSource { trx_id, vout })
}

pub fn get_block_count(state: &AppState, _params: &Value) -> Result<Value, RpcError> {
    let height = state.block_height.load(Ordering::SeqCst);
    Ok(json!({ "block_count": height }))
}

pub fn get_address_trxs(state: &AppState, params: &Value) -> Result<Value, RpcError> {
    let address = params
        .get("address")
        .and_then(Value::as_str)
        .ok_or(RpcError::AddressNotFound)?;

    let trx_ids = state
        .store
        .address_trxs(address)?
        .ok_or(RpcError::AddressNotFound)?;

    let trx_ids: Vec<String> = trx_ids.iter().map(Uint256::hex).collect();
    Ok(json!({ "trx_ids": trx_ids }))
}

pub fn get_raw_trx(state: &AppState, params: &Value) -> Result<Value, RpcError> {
    let trx_id = parse_trx_id(params, "trx_id")?;
    let raw = state
        .store
        .raw_trx(&trx_id)?
        .ok_or(RpcError::TrxIdNotFound)?;
    Ok(json!({ "raw_trx": hex::encode(raw) }))
}

pub fn get_trx(state: &AppState, params: &Value) -> Result<Value, RpcError> {
    let trx_id = parse_trx_id(params, "trx_id")?;
    let raw = state
        .store
        .raw_trx(&trx_id)?
        .ok_or(RpcError::TrxIdNotFound)?;
    let trx = Transaction::bitcoin_deserialize(&raw[..]).map_err(|_| RpcError::UnpackFailed)?;
    Ok(serde_json::to_value(transaction_printable(trx_id, &trx))
        .expect("printable transaction always serializes"))
}

pub fn get_utxo(state: &AppState, params: &Value) -> Result<Value, RpcError> {
    let raw = params
        .get("utxo_source")
        .and_then(Value::as_str)
        .ok_or(RpcError::UtxoSourceNotFound)?;
    let src = parse_utxo_source(raw)?;

    let detail = state
        .store
        .utxo(&src)?
        .ok_or(RpcError::UtxoSourceNotFound)?;

    Ok(
        serde_json::to_value(utxo_detail_printable(&src, detail))
            .expect("printable utxo always serializes"),
    )
}

/// For every transaction id touching the address, decode the raw
/// transaction and look at *every* output index (not only ones the
/// address owns), keeping the ones still unspent. This mirrors the
/// original indexer's behavior exactly.
pub fn list_unspent(state: &AppState, params: &Value) -> Result<Value, RpcError> {
    let address = params
        .get("address")
        .and_then(Value::as_str)
        .ok_or(RpcError::AddressNotFound)?;

    let trx_ids = state
        .store
        .address_trxs(address)?
        .ok_or(RpcError::AddressNotFound)?;

    let mut unspent = Vec::new();
    for trx_id in trx_ids {
        let raw = match state.store.raw_trx(&trx_id)? {
            Some(raw) => raw,
            None => continue,
        };
        let trx = match Transaction::bitcoin_deserialize(&raw[..]) {
            Ok(trx) => trx,
            Err(_) => continue,
        };

        for vout in 0..trx.outputs.len() as u32 {
            let src = UtxoSource { trx_id, vout };
            if let Some(detail) = state.store.utxo(&src)? {
                if detail.is_unspent() {
                    unspent.push(utxo_detail_printable(&src, detail));
                }
            }
        }
    }

    Ok(json!({ "unspent": unspent }))
}

pub fn dispatch(state: &AppState, method: &str, params: &Value) -> Result<Value, RpcError> {
    match method {
        "GetBlockCount" => get_block_count(state, params),
        "GetAddressTrxs" => get_address_trxs(state, params),
        "GetRawTrx" => get_raw_trx(state, params),
        "GetTrx" => get_trx(state, params),
        "GetUtxo" => get_utxo(state, params),
        "ListUnSpent" => list_unspent(state, params),
        other => Err(RpcError::UnknownMethod(other.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use utxoidx_chain::transparent::{Input, Output, Script};
    use utxoidx_chain::BitcoinSerialize;
    use utxoidx_state::{Config, SlotCache};

    fn test_state() -> (tempdir::TempDir, AppState) {
        let dir = tempdir::TempDir::new("utxoidx-rpc-test").unwrap();
        let config = Config {
            data_dir: dir.path().to_path_buf(),
            store_raw_trx: true,
            object_cache_weight_max: 1024 * 1024,
        };
        let store = Store::open(&config).unwrap();
        (dir, AppState::new(store, Arc::new(AtomicU32::new(0))))
    }

    fn sample_trx() -> Transaction {
        Transaction::new(
            1,
            vec![Input {
                prevout: UtxoSource {
                    trx_id: Uint256::zero(),
                    vout: 0xffff_ffff,
                },
                script_sig: Script(vec![1, 2, 3]),
                sequence: 0xffff_ffff,
            }],
            vec![Output {
                amount: 5_000_000_000,
                script_pub_key: Script(vec![0x76, 0xa9]),
            }],
            0,
        )
    }

    #[test]
    fn get_block_count_reads_the_watermark() {
        let (_dir, state) = test_state();
        state.block_height.store(42, Ordering::SeqCst);
        let result = get_block_count(&state, &Value::Null).unwrap();
        assert_eq!(result["block_count"], 42);
    }

    #[test]
    fn address_not_found_is_reported() {
        let (_dir, state) = test_state();
        let err = get_address_trxs(&state, &json!({ "address": "nobody" })).unwrap_err();
        assert!(matches!(err, RpcError::AddressNotFound));
    }

    #[test]
    fn get_utxo_round_trips_through_the_store() {
        let (_dir, state) = test_state();
        let src = UtxoSource {
            trx_id: Uint256::from_bytes([1u8; 32]),
            vout: 0,
        };
        let mut slot = SlotCache::new();
        slot.add_utxo(
            src,
            UtxoDetail {
                amount: 10,
                block_height: 1,
                address: "addr1".to_string(),
                script_pub_key: vec![0x76, 0xa9],
                status: UtxoDetail::UNSPENT,
            },
        );
        state.store.flush(&mut slot, 1).unwrap();

        let result = get_utxo(&state, &json!({ "utxo_source": src.to_string() })).unwrap();
        assert_eq!(result["amount"], 10);
        assert_eq!(result["status"], 0);
    }

    #[test]
    fn list_unspent_only_returns_still_unspent_outputs() {
        let (_dir, state) = test_state();
        let trx = sample_trx();
        let trx_id = trx.trx_id();
        let raw = trx.bitcoin_serialize_to_vec().unwrap();

        let mut slot = SlotCache::new();
        slot.add_raw_trx(trx_id, raw);
        slot.add_addr_trx("addr1".to_string(), trx_id);
        slot.add_utxo(
            UtxoSource { trx_id, vout: 0 },
            UtxoDetail {
                amount: 5_000_000_000,
                block_height: 1,
                address: "addr1".to_string(),
                script_pub_key: vec![0x76, 0xa9],
                status: UtxoDetail::UNSPENT,
            },
        );
        state.store.flush(&mut slot, 1).unwrap();

        let result = list_unspent(&state, &json!({ "address": "addr1" })).unwrap();
        let unspent = result["unspent"].as_array().unwrap();
        assert_eq!(unspent.len(), 1);
    }
}

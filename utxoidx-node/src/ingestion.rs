//! The block-ingestion pipeline: fetch, decode, mutate the slot cache,
//! flush, advance the watermark. The single writer of the slot and
//! pending caches; the query server and memory trimmer never touch them.

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use tracing::{error, info, warn};

use utxoidx_chain::block::Block;
use utxoidx_chain::transaction::Transaction;
use utxoidx_chain::transparent::{extract_destination, UtxoSource};
use utxoidx_chain::BitcoinSerialize;
use utxoidx_client::{ClientError, UpstreamClient};
use utxoidx_state::{SlotCache, StateError, Store, UtxoDetail};

use crate::shutdown::ShutdownFlag;

/// Blocks flushed per-block once within this many blocks of the tip, so
/// readers see fresh data with bounded lag near the chain head.
const TIP_PROXIMITY_WINDOW: u32 = 20;
const IDLE_SLEEP: Duration = Duration::from_secs(5);

#[derive(Error, Debug)]
pub enum IngestionError {
    #[error("upstream request failed: {0}")]
    Upstream(#[from] ClientError),
    #[error("block decode failed: {0}")]
    Decode(#[from] utxoidx_chain::SerializationError),
    #[error("store error: {0}")]
    Store(#[from] StateError),
    #[error("prevout not found for trx_id {trx_id}, vout {vout}")]
    PrevoutNotFound { trx_id: String, vout: u32 },
}

/// Runs the ingestion loop until `shutdown` is set or a fatal error
/// occurs. Always attempts one final flush before returning, matching the
/// loop-exit flush trigger.
pub async fn run(
    client: Arc<dyn UpstreamClient>,
    store: Arc<Store>,
    watermark: Arc<AtomicU32>,
    weight_max: u64,
    store_raw_trx: bool,
    shutdown: ShutdownFlag,
) {
    let mut slot = SlotCache::new();

    loop {
        if shutdown.is_set() {
            break;
        }

        let tip = match client.block_count().await {
            Ok(tip) => tip,
            Err(err) => {
                warn!(%err, "failed to fetch tip height, retrying after idle sleep");
                tokio::time::sleep(IDLE_SLEEP).await;
                continue;
            }
        };

        let mut height = watermark.load(Ordering::SeqCst);
        if height >= tip {
            tokio::time::sleep(IDLE_SLEEP).await;
            continue;
        }

        while height < tip && !shutdown.is_set() {
            let next = height + 1;
            match ingest_one(&client, &store, &mut slot, next, store_raw_trx).await {
                Ok(()) => {}
                Err(err) => {
                    error!(height = next, %err, "ingestion failed, shutting down");
                    shutdown.set();
                    break;
                }
            }

            if should_flush(slot.weight(), weight_max, next, tip) {
                if let Err(err) = store.flush(&mut slot, next) {
                    error!(height = next, %err, "flush failed, shutting down");
                    shutdown.set();
                    break;
                }
            }

            height = next;
            watermark.store(height, Ordering::SeqCst);
        }
    }

    if !slot_is_empty(&slot) {
        let height = watermark.load(Ordering::SeqCst);
        if let Err(err) = store.flush(&mut slot, height) {
            error!(%err, "final flush on shutdown failed");
        }
    }
    info!("ingestion task exiting");
}

fn slot_is_empty(slot: &SlotCache) -> bool {
    slot.weight() == 0
}

/// Whether the slot cache should be flushed after ingesting `next`: either
/// it has grown past `weight_max`, or `next` is close enough to `tip` that
/// readers shouldn't wait for a bigger batch.
fn should_flush(slot_weight: u64, weight_max: u64, next: u32, tip: u32) -> bool {
    slot_weight > weight_max || next > tip.saturating_sub(TIP_PROXIMITY_WINDOW)
}

/// Fetches, decodes, and applies a single block at `height`, marking the
/// store mid-flight before the decode so a crash mid-application leaves
/// `chainIndexState = "0"` for the recovery protocol to find.
async fn ingest_one(
    client: &Arc<dyn UpstreamClient>,
    store: &Store,
    slot: &mut SlotCache,
    height: u32,
    store_raw_trx: bool,
) -> Result<(), IngestionError> {
    let hash = client.block_hash(height).await?;
    let raw_hex = client.raw_block(&hash).await?;
    let raw = hex::decode(raw_hex.trim())
        .map_err(|_| utxoidx_chain::SerializationError::Parse("invalid hex from upstream"))?;

    store.mark_flushing()?;

    let block = Block::decode(height, &raw)?;
    decode_and_apply(store, slot, &block, height, store_raw_trx)?;

    Ok(())
}

fn decode_and_apply(
    store: &Store,
    slot: &mut SlotCache,
    block: &Block,
    height: u32,
    store_raw_trx: bool,
) -> Result<(), IngestionError> {
    for (index, trx) in block.transactions.iter().enumerate() {
        let is_coinbase = index == 0;
        let trx_id = trx.trx_id();

        if !is_coinbase {
            for input in &trx.inputs {
                let src = input.prevout;
                let detail = match slot.get_utxo(&src) {
                    Some(detail) => detail.clone(),
                    None => store.utxo(&src)?.ok_or_else(|| IngestionError::PrevoutNotFound {
                        trx_id: src.trx_id.hex(),
                        vout: src.vout,
                    })?,
                };
                slot.del_utxo(src);

                if !detail.address.is_empty() {
                    slot.add_addr_trx(detail.address.clone(), trx_id);
                }
            }
        }

        for (vout, output) in trx.outputs.iter().enumerate() {
            let (ok, _, addresses) = extract_destination(&output.script_pub_key);
            let address = if ok { addresses.join(",") } else { String::new() };
            if ok {
                slot.add_addr_trx(address.clone(), trx_id);
            }

            let src = UtxoSource {
                trx_id,
                vout: vout as u32,
            };
            slot.add_utxo(
                src,
                UtxoDetail {
                    amount: output.amount,
                    block_height: height,
                    address,
                    script_pub_key: output.script_pub_key.0.clone(),
                    status: UtxoDetail::UNSPENT,
                },
            );
        }

        if store_raw_trx {
            record_raw_trx(slot, trx_id, trx);
        }
    }

    Ok(())
}

fn record_raw_trx(slot: &mut SlotCache, trx_id: utxoidx_chain::Uint256, trx: &Transaction) {
    if let Ok(bytes) = trx.bitcoin_serialize_to_vec() {
        slot.add_raw_trx(trx_id, bytes);
    }
}

#[cfg(test)]
mod tests {
    use utxoidx_chain::transparent::{Input, Output, Script};
    use utxoidx_chain::Uint256;

    use super::*;

    fn test_store() -> (tempdir::TempDir, Store) {
        let dir = tempdir::TempDir::new("utxoidx-node-test").unwrap();
        let config = utxoidx_state::Config {
            data_dir: dir.path().to_path_buf(),
            store_raw_trx: true,
            object_cache_weight_max: 1024 * 1024,
        };
        (dir, Store::open(&config).unwrap())
    }

    fn coinbase() -> Transaction {
        Transaction::new(
            1,
            vec![Input {
                prevout: UtxoSource {
                    trx_id: Uint256::zero(),
                    vout: 0xffff_ffff,
                },
                script_sig: Script(vec![0x03, 0x01, 0x02, 0x03]),
                sequence: 0xffff_ffff,
            }],
            vec![Output {
                amount: 5_000_000_000,
                script_pub_key: Script(vec![0x76, 0xa9]),
            }],
            0,
        )
    }

    /// A second block's coinbase, distinct in content (and therefore trx id)
    /// from [`coinbase`] so a block built from both never collides keys.
    fn other_coinbase() -> Transaction {
        Transaction::new(
            1,
            vec![Input {
                prevout: UtxoSource {
                    trx_id: Uint256::zero(),
                    vout: 0xffff_ffff,
                },
                script_sig: Script(vec![0x03, 0x02, 0x00, 0x00]),
                sequence: 0xffff_ffff,
            }],
            vec![Output {
                amount: 5_000_000_000,
                script_pub_key: Script(vec![0x76, 0xa9]),
            }],
            0,
        )
    }

    /// A single-input, single-output spend of `src`, paying a script that
    /// doesn't resolve to any address (empty classifier output), so the
    /// spend exercises the UTXO path without touching address tracking.
    fn spend(src: UtxoSource) -> Transaction {
        Transaction::new(
            1,
            vec![Input {
                prevout: src,
                script_sig: Script(vec![]),
                sequence: 0xffff_ffff,
            }],
            vec![Output {
                amount: 100,
                script_pub_key: Script(vec![]),
            }],
            0,
        )
    }

    #[test]
    fn intra_block_spend_resolves_without_touching_the_store() {
        let (_dir, store) = test_store();
        let mut slot = SlotCache::new();

        let cb = coinbase();
        let cb_id = cb.trx_id();
        let block = Block {
            height: 1,
            transactions: vec![cb, spend(UtxoSource { trx_id: cb_id, vout: 0 })],
        };

        decode_and_apply(&store, &mut slot, &block, 1, true).unwrap();

        // the coinbase output was produced and spent in the same window, so
        // it never reaches utxos_add/utxos_del.
        assert!(!slot.utxos_add.contains_key(&UtxoSource { trx_id: cb_id, vout: 0 }));
        assert!(!slot.utxos_del.contains(&UtxoSource { trx_id: cb_id, vout: 0 }));
    }

    #[test]
    fn spend_across_blocks_reads_the_prevout_from_the_store() {
        let (_dir, store) = test_store();
        let mut slot = SlotCache::new();

        let cb = coinbase();
        let cb_id = cb.trx_id();
        let block1 = Block {
            height: 1,
            transactions: vec![cb],
        };
        decode_and_apply(&store, &mut slot, &block1, 1, true).unwrap();
        store.flush(&mut slot, 1).unwrap();

        let block2 = Block {
            height: 2,
            transactions: vec![
                other_coinbase(),
                spend(UtxoSource { trx_id: cb_id, vout: 0 }),
            ],
        };
        decode_and_apply(&store, &mut slot, &block2, 2, true).unwrap();

        assert!(slot.utxos_del.contains(&UtxoSource { trx_id: cb_id, vout: 0 }));
    }

    #[test]
    fn spending_an_unknown_prevout_is_fatal() {
        let (_dir, store) = test_store();
        let mut slot = SlotCache::new();

        let missing = UtxoSource {
            trx_id: Uint256::from_bytes([0xab; 32]),
            vout: 0,
        };
        let block = Block {
            height: 1,
            transactions: vec![coinbase(), spend(missing)],
        };

        let err = decode_and_apply(&store, &mut slot, &block, 1, true).unwrap_err();
        assert!(matches!(err, IngestionError::PrevoutNotFound { .. }));
    }

    #[test]
    fn raw_trx_recording_is_skipped_when_disabled() {
        let (_dir, store) = test_store();
        let mut slot = SlotCache::new();

        let block = Block {
            height: 1,
            transactions: vec![coinbase()],
        };
        decode_and_apply(&store, &mut slot, &block, 1, false).unwrap();

        assert!(slot.raw_trxs_add.is_empty());
        assert!(!slot.utxos_add.is_empty());
    }

    #[test]
    fn raw_trx_recording_happens_when_enabled() {
        let (_dir, store) = test_store();
        let mut slot = SlotCache::new();

        let cb = coinbase();
        let cb_id = cb.trx_id();
        let block = Block {
            height: 1,
            transactions: vec![cb],
        };
        decode_and_apply(&store, &mut slot, &block, 1, true).unwrap();

        assert!(slot.raw_trxs_add.contains_key(&cb_id));
    }

    #[test]
    fn flush_does_not_trigger_for_a_small_slot_far_from_tip() {
        assert!(!should_flush(5, 10, 50, 100));
    }

    #[test]
    fn flush_triggers_once_the_slot_outgrows_the_weight_max() {
        assert!(should_flush(20, 10, 50, 100));
    }

    #[test]
    fn flush_triggers_near_the_tip_even_with_a_small_slot() {
        let tip = 100u32;
        let near_tip = tip - TIP_PROXIMITY_WINDOW + 1;
        assert!(should_flush(5, 10, near_tip, tip));
    }
}

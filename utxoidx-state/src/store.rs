//! The four logical stores and the crash-consistent flush protocol that
//! commits a pending cache to them.

use std::collections::HashSet;

use tracing::trace;
use utxoidx_chain::transparent::UtxoSource;
use utxoidx_chain::Uint256;

use crate::config::Config;
use crate::error::StateError;
use crate::pending_cache::PendingCache;
use crate::sled_format::SledGet;
use crate::slot_cache::SlotCache;
use crate::types::UtxoDetail;

const BLOCK_HEIGHT_KEY: &str = "blockHeight";
const CHAIN_INDEX_STATE_KEY: &str = "chainIndexState";

/// `chainIndexState` value meaning the last flush is in progress or crashed
/// mid-flush; re-running ingestion from `blockHeight + 1` is always safe.
pub const STATE_FLUSHING: &str = "0";
/// `chainIndexState` value meaning all four stores agree on `blockHeight`.
pub const STATE_QUIESCENT: &str = "1";

/// The durable half of the indexer: four sled trees opened once at startup
/// and held for the life of the process. Cheap to clone: each `sled::Tree`
/// is itself a handle onto shared state, so the query server and the
/// ingestion task can each hold their own `Store` without contention.
#[derive(Clone)]
pub struct Store {
    store_raw_trx: bool,
    utxo_store: sled::Tree,
    addr_trxs_store: sled::Tree,
    raw_trx_store: sled::Tree,
    config_store: sled::Tree,
}

impl Store {
    pub fn open(config: &Config) -> Result<Self, StateError> {
        let utxo_store = config.utxo_store_config().open()?.open_tree(b"utxo_store")?;
        let addr_trxs_store = config
            .addr_trxs_store_config()
            .open()?
            .open_tree(b"addr_trxs_store")?;
        let raw_trx_store = config
            .raw_trx_store_config()
            .open()?
            .open_tree(b"raw_trx_store")?;
        let config_store = config
            .config_store_config()
            .open()?
            .open_tree(b"config_store")?;

        Ok(Self {
            store_raw_trx: config.store_raw_trx,
            utxo_store,
            addr_trxs_store,
            raw_trx_store,
            config_store,
        })
    }

    /// The watermark recorded at startup, or `0` if the store is fresh.
    pub fn start_block_height(&self) -> Result<u32, StateError> {
        match self.config_store.get(BLOCK_HEIGHT_KEY)? {
            Some(bytes) => {
                let text = String::from_utf8_lossy(&bytes);
                Ok(text.parse().unwrap_or(0))
            }
            None => Ok(0),
        }
    }

    /// Marks the start of a flush cycle. Read back on startup to detect a
    /// crash mid-flush.
    pub fn mark_flushing(&self) -> Result<(), StateError> {
        self.config_store
            .insert(CHAIN_INDEX_STATE_KEY, STATE_FLUSHING)?;
        Ok(())
    }

    pub fn chain_index_state(&self) -> Result<String, StateError> {
        match self.config_store.get(CHAIN_INDEX_STATE_KEY)? {
            Some(bytes) => Ok(String::from_utf8_lossy(&bytes).into_owned()),
            None => Ok(STATE_QUIESCENT.to_string()),
        }
    }

    pub fn utxo(&self, src: &UtxoSource) -> Result<Option<UtxoDetail>, StateError> {
        self.utxo_store.zs_get(src)
    }

    pub fn address_trxs(&self, address: &str) -> Result<Option<Vec<Uint256>>, StateError> {
        self.addr_trxs_store.zs_get(address)
    }

    pub fn raw_trx(&self, trx_id: &Uint256) -> Result<Option<Vec<u8>>, StateError> {
        match self.raw_trx_store.get(trx_id.as_bytes())? {
            Some(bytes) => Ok(Some(bytes.to_vec())),
            None => Ok(None),
        }
    }

    /// Runs the full crash-consistent commit protocol described in the
    /// ingestion driver's flush step: build the pending cache (merging
    /// address-sets with whatever is already on disk), write the three
    /// content stores in order, then advance the watermark and flip the
    /// state flag back to quiescent.
    pub fn flush(&self, slot: &mut SlotCache, height: u32) -> Result<(), StateError> {
        let pending = self.build_pending_cache(slot)?;

        let mut addr_batch = sled::Batch::default();
        for (address, trx_ids) in &pending.addr_trxs_puts {
            let bytes = utxoidx_chain::BitcoinSerialize::bitcoin_serialize_to_vec(trx_ids)
                .expect("serializing to an in-memory buffer is infallible");
            addr_batch.insert(address.as_bytes(), bytes);
        }
        self.addr_trxs_store.apply_batch(addr_batch)?;

        let mut utxo_batch = sled::Batch::default();
        for (src, detail) in &pending.utxo_puts {
            let bytes = utxoidx_chain::BitcoinSerialize::bitcoin_serialize_to_vec(detail)
                .expect("serializing to an in-memory buffer is infallible");
            utxo_batch.insert(crate::sled_format::SledKey::sled_key(src), bytes);
        }
        for src in &pending.utxo_dels {
            utxo_batch.remove(crate::sled_format::SledKey::sled_key(src));
        }
        self.utxo_store.apply_batch(utxo_batch)?;

        if self.store_raw_trx {
            let mut raw_batch = sled::Batch::default();
            for (trx_id, bytes) in &pending.raw_trx_puts {
                raw_batch.insert(trx_id.as_bytes(), bytes.clone());
            }
            self.raw_trx_store.apply_batch(raw_batch)?;
        }

        self.config_store
            .insert(BLOCK_HEIGHT_KEY, height.to_string().as_bytes())?;
        self.config_store
            .insert(CHAIN_INDEX_STATE_KEY, STATE_QUIESCENT)?;

        trace!(height, "flushed slot cache");
        metrics::counter!("store.flush.count", 1);
        metrics::gauge!("store.flush.block_height", height as f64);

        slot.clear();
        Ok(())
    }

    #[cfg(test)]
    pub(crate) fn test_store() -> (tempdir::TempDir, Self) {
        let dir = tempdir::TempDir::new("utxoidx-state-test").unwrap();
        let config = Config {
            data_dir: dir.path().to_path_buf(),
            store_raw_trx: true,
            object_cache_weight_max: 1024 * 1024,
        };
        (dir, Store::open(&config).unwrap())
    }

    /// Converts a slot cache into a pending cache, merging each address's
    /// newly-touched trx-ids with whatever set is already on disk. This is
    /// the only place merging happens — not at cache-add time — so a
    /// single flush amortises many address touches into one read-modify-write.
    fn build_pending_cache(&self, slot: &SlotCache) -> Result<PendingCache, StateError> {
        let mut pending = PendingCache::default();

        for (address, new_trx_ids) in slot.addr_trxs_add.iter() {
            let mut merged: Vec<Uint256> = self
                .addr_trxs_store
                .zs_get::<str, Vec<Uint256>>(address)?
                .unwrap_or_default();
            let mut seen: HashSet<Uint256> = merged.iter().copied().collect();
            for trx_id in new_trx_ids {
                if seen.insert(*trx_id) {
                    merged.push(*trx_id);
                }
            }
            pending.addr_trxs_puts.push((address.clone(), merged));
        }

        for (src, detail) in slot.utxos_add.iter() {
            pending.utxo_puts.push((*src, detail.clone()));
        }
        for src in slot.utxos_del.iter() {
            pending.utxo_dels.push(*src);
        }

        if self.store_raw_trx {
            for (trx_id, bytes) in slot.raw_trxs_add.iter() {
                pending.raw_trx_puts.push((*trx_id, bytes.clone()));
            }
        }

        Ok(pending)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn src(n: u8) -> UtxoSource {
        UtxoSource {
            trx_id: Uint256::from_bytes([n; 32]),
            vout: 0,
        }
    }

    fn detail(addr: &str) -> UtxoDetail {
        UtxoDetail {
            amount: 1_000,
            block_height: 1,
            address: addr.to_string(),
            script_pub_key: vec![1, 2, 3],
            status: UtxoDetail::UNSPENT,
        }
    }

    #[test]
    fn fresh_store_starts_quiescent_at_height_zero() {
        let (_dir, store) = Store::test_store();
        assert_eq!(store.start_block_height().unwrap(), 0);
        assert_eq!(store.chain_index_state().unwrap(), STATE_QUIESCENT);
    }

    #[test]
    fn mark_flushing_is_visible_until_the_next_flush() {
        let (_dir, store) = Store::test_store();
        store.mark_flushing().unwrap();
        assert_eq!(store.chain_index_state().unwrap(), STATE_FLUSHING);

        let mut slot = SlotCache::new();
        store.flush(&mut slot, 1).unwrap();
        assert_eq!(store.chain_index_state().unwrap(), STATE_QUIESCENT);
        assert_eq!(store.start_block_height().unwrap(), 1);
    }

    #[test]
    fn flush_advances_the_watermark_and_writes_utxos() {
        let (_dir, store) = Store::test_store();
        let mut slot = SlotCache::new();
        let s = src(1);
        slot.add_utxo(s, detail("addr1"));
        store.flush(&mut slot, 10).unwrap();

        assert_eq!(store.start_block_height().unwrap(), 10);
        assert_eq!(store.utxo(&s).unwrap(), Some(detail("addr1")));
    }

    #[test]
    fn flush_clears_the_slot_cache() {
        let (_dir, store) = Store::test_store();
        let mut slot = SlotCache::new();
        slot.add_utxo(src(1), detail("addr1"));
        store.flush(&mut slot, 1).unwrap();
        assert_eq!(slot.weight(), 0);
    }

    #[test]
    fn a_delete_across_flushes_removes_the_utxo() {
        let (_dir, store) = Store::test_store();
        let s = src(1);

        let mut slot = SlotCache::new();
        slot.add_utxo(s, detail("addr1"));
        store.flush(&mut slot, 1).unwrap();
        assert!(store.utxo(&s).unwrap().is_some());

        slot.del_utxo(s);
        store.flush(&mut slot, 2).unwrap();
        assert_eq!(store.utxo(&s).unwrap(), None);
    }

    #[test]
    fn address_trx_sets_merge_across_flushes_instead_of_overwriting() {
        let (_dir, store) = Store::test_store();
        let first = Uint256::from_bytes([1u8; 32]);
        let second = Uint256::from_bytes([2u8; 32]);

        let mut slot = SlotCache::new();
        slot.add_addr_trx("addr1".to_string(), first);
        store.flush(&mut slot, 1).unwrap();

        slot.add_addr_trx("addr1".to_string(), second);
        store.flush(&mut slot, 2).unwrap();

        let trx_ids = store.address_trxs("addr1").unwrap().unwrap();
        assert_eq!(trx_ids.len(), 2);
        assert!(trx_ids.contains(&first));
        assert!(trx_ids.contains(&second));
    }

    #[test]
    fn raw_trx_storage_is_skipped_when_disabled() {
        let dir = tempdir::TempDir::new("utxoidx-state-test").unwrap();
        let config = Config {
            data_dir: dir.path().to_path_buf(),
            store_raw_trx: false,
            object_cache_weight_max: 1024 * 1024,
        };
        let store = Store::open(&config).unwrap();

        let trx_id = Uint256::from_bytes([9u8; 32]);
        let mut slot = SlotCache::new();
        slot.add_raw_trx(trx_id, vec![0xde, 0xad, 0xbe, 0xef]);
        store.flush(&mut slot, 1).unwrap();

        assert_eq!(store.raw_trx(&trx_id).unwrap(), None);
    }

    #[test]
    fn reflushing_the_same_contents_is_idempotent() {
        let (_dir, store) = Store::test_store();
        let s = src(1);

        let mut slot = SlotCache::new();
        slot.add_utxo(s, detail("addr1"));
        slot.add_addr_trx("addr1".to_string(), Uint256::zero());
        store.flush(&mut slot, 5).unwrap();

        let mut slot_again = SlotCache::new();
        slot_again.add_utxo(s, detail("addr1"));
        slot_again.add_addr_trx("addr1".to_string(), Uint256::zero());
        store.flush(&mut slot_again, 5).unwrap();

        assert_eq!(store.start_block_height().unwrap(), 5);
        assert_eq!(store.utxo(&s).unwrap(), Some(detail("addr1")));
        assert_eq!(store.address_trxs("addr1").unwrap().unwrap().len(), 1);
    }
}

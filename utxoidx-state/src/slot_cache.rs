//! The in-memory mutation buffer for the block range currently being
//! ingested but not yet durably flushed.

use std::collections::{HashMap, HashSet};

use utxoidx_chain::transparent::UtxoSource;
use utxoidx_chain::Uint256;

use crate::types::UtxoDetail;

/// Rough per-entry overhead counted by [`SlotCache::weight`], on top of the
/// size of any variable-length payload (scripts, raw transaction bytes).
const ENTRY_WEIGHT: u64 = 64;

/// Outputs produced, addresses touched, and raw bytes recorded since the
/// last flush. Confined to the single ingestion task; never shared.
#[derive(Default)]
pub struct SlotCache {
    pub utxos_add: HashMap<UtxoSource, UtxoDetail>,
    pub utxos_del: HashSet<UtxoSource>,
    pub addr_trxs_add: HashMap<String, HashSet<Uint256>>,
    pub raw_trxs_add: HashMap<Uint256, Vec<u8>>,
    weight: u64,
}

impl SlotCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert an output produced within the current window. Overwrites
    /// silently if the same source is added twice.
    pub fn add_utxo(&mut self, src: UtxoSource, detail: UtxoDetail) {
        self.weight += ENTRY_WEIGHT + detail.script_pub_key.len() as u64;
        self.utxos_add.insert(src, detail);
    }

    /// Spend an output. If it was produced earlier in the same window, the
    /// add and the delete cancel out (the output never reaches a store).
    /// Otherwise it must already be on disk, and is marked for deletion.
    pub fn del_utxo(&mut self, src: UtxoSource) {
        if self.utxos_add.remove(&src).is_none() {
            self.utxos_del.insert(src);
        }
    }

    /// Record that `trx_id` touched `addr`, producing or consuming one of
    /// its outputs.
    pub fn add_addr_trx(&mut self, addr: String, trx_id: Uint256) {
        self.weight += ENTRY_WEIGHT;
        self.addr_trxs_add.entry(addr).or_default().insert(trx_id);
    }

    pub fn add_raw_trx(&mut self, trx_id: Uint256, bytes: Vec<u8>) {
        self.weight += ENTRY_WEIGHT + bytes.len() as u64;
        self.raw_trxs_add.insert(trx_id, bytes);
    }

    /// An output produced earlier in the same window, found without a
    /// store round-trip. Needed because a later transaction in the same
    /// block may spend an output an earlier transaction just created.
    pub fn get_utxo(&self, src: &UtxoSource) -> Option<&UtxoDetail> {
        self.utxos_add.get(src)
    }

    /// A monotonically-non-decreasing estimate of this cache's memory
    /// footprint, used solely to decide when to flush.
    pub fn weight(&self) -> u64 {
        self.weight
    }

    pub fn clear(&mut self) {
        self.utxos_add.clear();
        self.utxos_del.clear();
        self.addr_trxs_add.clear();
        self.raw_trxs_add.clear();
        self.weight = 0;
    }
}

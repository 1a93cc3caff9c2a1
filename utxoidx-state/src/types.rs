//! Store-level value types.

use serde::{Deserialize, Serialize};
use utxoidx_chain::{BitcoinDeserialize, BitcoinSerialize, SerializationError};
use utxoidx_serde_derive::{BtcDeserialize, BtcSerialize};

/// An unspent (or formerly-unspent) output, as stored in `utxo_store`.
///
/// `status = 0` means unspent; the store layer may retain spent entries
/// with `status = 1` rather than deleting them outright, though the
/// indexer itself always deletes on spend (see [`crate::slot_cache::SlotCache::del_utxo`]).
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, BtcSerialize, BtcDeserialize)]
pub struct UtxoDetail {
    pub amount: i64,
    pub block_height: u32,
    /// Empty if destination extraction failed, the sole address for a
    /// single-destination script, or a comma-joined list for a multi-address
    /// (e.g. bare multisig) script.
    pub address: String,
    pub script_pub_key: Vec<u8>,
    pub status: u8,
}

impl UtxoDetail {
    pub const UNSPENT: u8 = 0;
    pub const SPENT: u8 = 1;

    pub fn is_unspent(&self) -> bool {
        self.status == Self::UNSPENT
    }
}

/// Whether a pending-cache entry is a put or a delete.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum Op {
    Put = 0,
    Del = 1,
}

//! The store-ready serialisation of a slot cache: three ordered sequences
//! of puts/deletes, one per content store.

use utxoidx_chain::transparent::UtxoSource;
use utxoidx_chain::Uint256;

use crate::types::UtxoDetail;

/// Built fresh for each flush by [`crate::store::Store::flush`]. Address
/// sets here are already merged with whatever the store held before the
/// flush began.
#[derive(Default)]
pub struct PendingCache {
    pub addr_trxs_puts: Vec<(String, Vec<Uint256>)>,
    pub utxo_puts: Vec<(UtxoSource, UtxoDetail)>,
    pub utxo_dels: Vec<UtxoSource>,
    pub raw_trx_puts: Vec<(Uint256, Vec<u8>)>,
}

impl PendingCache {
    pub fn is_empty(&self) -> bool {
        self.addr_trxs_puts.is_empty()
            && self.utxo_puts.is_empty()
            && self.utxo_dels.is_empty()
            && self.raw_trx_puts.is_empty()
    }

    pub fn clear(&mut self) {
        self.addr_trxs_puts.clear();
        self.utxo_puts.clear();
        self.utxo_dels.clear();
        self.raw_trx_puts.clear();
    }
}

//! Typed get/put helpers layered over `sled::Tree`'s raw byte interface.
//!
//! Every logical store picks its own key encoding (see each key type's
//! `sled_key` impl below); values are packed with the same
//! `BitcoinSerialize`/`BitcoinDeserialize` traits used for the wire format,
//! so there is exactly one binary encoding per type in the whole system.

use utxoidx_chain::transparent::UtxoSource;
use utxoidx_chain::BitcoinDeserialize;

use crate::error::StateError;

/// A type that can be turned into the bytes used as a sled key.
pub trait SledKey {
    fn sled_key(&self) -> Vec<u8>;
}

impl SledKey for str {
    fn sled_key(&self) -> Vec<u8> {
        self.as_bytes().to_vec()
    }
}

impl SledKey for UtxoSource {
    fn sled_key(&self) -> Vec<u8> {
        // trx_id (32 bytes) ‖ vout (4 bytes, big-endian), so that sled's
        // lexicographic tree ordering is also a sane iteration order.
        let mut bytes = Vec::with_capacity(36);
        bytes.extend_from_slice(self.trx_id.as_bytes());
        bytes.extend_from_slice(&self.vout.to_be_bytes());
        bytes
    }
}

/// Fetch and deserialize a value stored under a typed key.
pub trait SledGet {
    fn zs_get<K, V>(&self, key: &K) -> Result<Option<V>, StateError>
    where
        K: SledKey + ?Sized,
        V: BitcoinDeserialize;
}

impl SledGet for sled::Tree {
    fn zs_get<K, V>(&self, key: &K) -> Result<Option<V>, StateError>
    where
        K: SledKey + ?Sized,
        V: BitcoinDeserialize,
    {
        match self.get(key.sled_key())? {
            Some(bytes) => Ok(Some(V::bitcoin_deserialize(&bytes[..])?)),
            None => Ok(None),
        }
    }
}

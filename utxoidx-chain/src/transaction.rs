//! Transactions: ordered inputs and outputs, plus a lazily-computed id.

use serde::{Deserialize, Serialize};
use utxoidx_serde_derive::{BtcDeserialize, BtcSerialize};

use crate::{
    cached::Cached,
    compactint::CompactInt,
    serialization::{sha256d, BitcoinDeserialize, BitcoinSerialize, SerializationError},
    transparent,
    uint256::Uint256,
};

/// A transaction: an ordered list of inputs and outputs.
///
/// The first transaction in a block is the coinbase and its inputs carry no
/// meaningful prevout; that is a positional fact about the block, not
/// something this type encodes.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, BtcSerialize, BtcDeserialize)]
pub struct Transaction {
    /// Transaction format version.
    pub version: i32,
    pub inputs: Vec<transparent::Input>,
    pub outputs: Vec<transparent::Output>,
    pub locktime: u32,
    trx_id: Cached<Uint256>,
}

impl Transaction {
    pub fn new(
        version: i32,
        inputs: Vec<transparent::Input>,
        outputs: Vec<transparent::Output>,
        locktime: u32,
    ) -> Transaction {
        Transaction {
            version,
            inputs,
            outputs,
            locktime,
            trx_id: Cached::new(),
        }
    }

    /// The transaction's id, computing and caching it on first access.
    pub fn trx_id(&self) -> Uint256 {
        if let Some(id) = self.trx_id.value() {
            return id;
        }
        Uint256::from_bytes(self.compute_trx_id())
    }

    fn compute_trx_id(&self) -> [u8; 32] {
        let bytes = self
            .bitcoin_serialize_to_vec()
            .expect("serializing to an in-memory buffer is infallible");
        sha256d::hash(&bytes)
    }

    /// The serialized length of this transaction, in bytes.
    pub fn len(&self) -> usize {
        let mut size = 4 + CompactInt::size(self.inputs.len());
        for input in &self.inputs {
            size += input.len();
        }
        size += CompactInt::size(self.outputs.len());
        for output in &self.outputs {
            size += output.len();
        }
        size + 4
    }

    pub fn is_empty(&self) -> bool {
        self.inputs.is_empty() && self.outputs.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transparent::{Input, Output, Script, UtxoSource};

    fn sample() -> Transaction {
        Transaction::new(
            1,
            vec![Input {
                prevout: UtxoSource {
                    trx_id: Uint256::zero(),
                    vout: 0,
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
    fn trx_id_is_deterministic() {
        let tx = sample();
        assert_eq!(tx.trx_id(), tx.trx_id());
    }

    #[test]
    fn different_transactions_hash_differently() {
        let tx_a = sample();
        let mut tx_b = sample();
        tx_b.locktime = 1;
        assert_ne!(tx_a.trx_id(), tx_b.trx_id());
    }
}

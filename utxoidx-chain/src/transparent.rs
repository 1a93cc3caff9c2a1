//! Bitcoin-inherited transaction plumbing: outpoints, scripts, inputs and outputs.
#![allow(clippy::unit_arg)]

mod script;
mod script_classifier;

pub use script::Script;
pub use script_classifier::{extract_destination, ScriptType};

use serde::{Deserialize, Serialize};
use utxoidx_serde_derive::{BtcDeserialize, BtcSerialize};

use crate::serialization::{BitcoinDeserialize, BitcoinSerialize, SerializationError};
use crate::uint256::Uint256;

/// Identifies one transaction output: `(trx_id, vout)`.
///
/// Totally ordered; equal iff both fields are equal. This is the key type
/// for the UTXO set, and also the shape of a transaction input's previous-output
/// reference.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Ord, PartialOrd, Hash, Serialize, Deserialize, BtcSerialize, BtcDeserialize)]
pub struct UtxoSource {
    pub trx_id: Uint256,
    pub vout: u32,
}

impl UtxoSource {
    pub const fn len() -> usize {
        36
    }

    /// The cache-key form used by the slot cache: `hex(trx_id):vout`.
    pub fn cache_key(&self) -> String {
        format!("{}:{}", self.trx_id.hex(), self.vout)
    }
}

impl std::fmt::Display for UtxoSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.trx_id, self.vout)
    }
}

/// A transparent input to a transaction.
///
/// Bitcoin encodes the coinbase input with the same shape as a normal spend
/// (a null previous-output and an arbitrary scriptSig), so there is no
/// separate wire variant here: callers decide `is_coinbase` positionally
/// (the first transaction in a block), exactly like the original indexer.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize, BtcSerialize, BtcDeserialize)]
pub struct Input {
    pub prevout: UtxoSource,
    pub script_sig: Script,
    pub sequence: u32,
}

impl Input {
    pub fn len(&self) -> usize {
        UtxoSource::len() + self.script_sig.serialized_size() + 4
    }
}

/// A transparent output from a transaction.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize, BtcSerialize, BtcDeserialize)]
pub struct Output {
    /// Output value, in the chain's smallest unit.
    pub amount: i64,
    /// The script that must be satisfied to spend this output.
    pub script_pub_key: Script,
}

impl Output {
    pub fn len(&self) -> usize {
        8 + self.script_pub_key.serialized_size()
    }
}

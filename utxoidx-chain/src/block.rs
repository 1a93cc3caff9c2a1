//! Raw block decoding.
//!
//! Consensus fields (difficulty, merkle root, proof-of-work) are never
//! validated here; the upstream is trusted. Decoding only needs to walk past
//! the fixed-size header to reach the transaction list.

use std::io::{self, Read};

use crate::{
    compactint::CompactInt,
    serialization::{BitcoinDeserialize, BitcoinDeserializeInto, SerializationError},
    transaction::Transaction,
};

/// Bitcoin's block header is a fixed 80 bytes: version (4), prev block hash
/// (32), merkle root (32), time (4), bits (4), nonce (4).
const HEADER_LEN: usize = 80;

/// A decoded block: a height (assigned by the caller, not carried on the
/// wire) plus its ordered transactions.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Block {
    pub height: u32,
    pub transactions: Vec<Transaction>,
}

impl Block {
    /// Decodes a full raw block (header + transactions) at the given height.
    pub fn decode(height: u32, raw: &[u8]) -> Result<Block, SerializationError> {
        if raw.len() < HEADER_LEN {
            return Err(SerializationError::Parse("block shorter than header"));
        }
        let mut reader = &raw[HEADER_LEN..];
        let transactions: Vec<Transaction> = (&mut reader).bitcoin_deserialize_into()?;
        Ok(Block {
            height,
            transactions,
        })
    }

    pub fn coinbase(&self) -> Option<&Transaction> {
        self.transactions.first()
    }
}

/// Reads the leading transaction count without decoding every transaction,
/// used by callers that only need an upper bound on cache weight.
pub fn peek_transaction_count(raw: &[u8]) -> Result<u64, SerializationError> {
    if raw.len() < HEADER_LEN {
        return Err(SerializationError::Parse("block shorter than header"));
    }
    let mut reader: &[u8] = &raw[HEADER_LEN..];
    Ok(CompactInt::bitcoin_deserialize(&mut reader)?.value())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transparent::{Input, Output, Script, UtxoSource};
    use crate::uint256::Uint256;
    use crate::serialization::BitcoinSerialize;

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

    #[test]
    fn decodes_single_transaction_block() {
        let mut raw = vec![0u8; HEADER_LEN];
        let txs = vec![coinbase()];
        txs.bitcoin_serialize(&mut raw).unwrap();

        let block = Block::decode(100, &raw).unwrap();
        assert_eq!(block.height, 100);
        assert_eq!(block.transactions.len(), 1);
    }

    #[test]
    fn rejects_truncated_header() {
        let raw = vec![0u8; HEADER_LEN - 1];
        assert!(Block::decode(1, &raw).is_err());
    }
}

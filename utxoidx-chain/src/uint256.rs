//! A 32-byte big-integer identifier, used for transaction ids.

use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};
use utxoidx_serde_derive::{BtcDeserialize, BtcSerialize};

use crate::serialization::{BitcoinDeserialize, BitcoinSerialize, SerializationError};

/// A 256-bit identifier, rendered as a lowercase 64-character hex string
/// whenever it's used as a map key or wire value.
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Serialize, Deserialize, BtcSerialize, BtcDeserialize)]
pub struct Uint256(pub [u8; 32]);

impl Uint256 {
    pub const fn zero() -> Self {
        Uint256([0u8; 32])
    }

    pub fn from_bytes(bytes: [u8; 32]) -> Self {
        Uint256(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    pub fn hex(&self) -> String {
        hex::encode(self.0)
    }
}

impl fmt::Display for Uint256 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.hex())
    }
}

impl fmt::Debug for Uint256 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Uint256").field(&self.hex()).finish()
    }
}

impl FromStr for Uint256 {
    type Err = SerializationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut bytes = [0u8; 32];
        hex::decode_to_slice(s, &mut bytes[..])
            .map_err(|_| SerializationError::Parse("invalid hex in uint256"))?;
        Ok(Uint256(bytes))
    }
}

impl From<[u8; 32]> for Uint256 {
    fn from(bytes: [u8; 32]) -> Self {
        Uint256(bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hex_roundtrip() {
        let id = Uint256([7u8; 32]);
        let s = id.hex();
        assert_eq!(s.len(), 64);
        let parsed: Uint256 = s.parse().unwrap();
        assert_eq!(id, parsed);
    }

    #[test]
    fn display_is_lowercase() {
        let id = Uint256([0xabu8; 32]);
        assert!(id.to_string().chars().all(|c| !c.is_ascii_uppercase()));
    }
}

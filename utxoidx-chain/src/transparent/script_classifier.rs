//! Destination-address extraction from an output script.
//!
//! Mirrors the handful of standard Bitcoin script templates: P2PKH, P2SH,
//! bare P2PK, and bare multisig. Anything else is non-standard and has no
//! extractable destination.

use ripemd160::{Digest as _, Ripemd160};
use sha2::{Digest as _, Sha256};

use super::Script;

const MAINNET_P2PKH: u8 = 0x00;
const MAINNET_P2SH: u8 = 0x05;

const OP_DUP: u8 = 0x76;
const OP_HASH160: u8 = 0xa9;
const OP_EQUALVERIFY: u8 = 0x88;
const OP_CHECKSIG: u8 = 0xac;
const OP_EQUAL: u8 = 0x87;
const OP_CHECKMULTISIG: u8 = 0xae;
const OP_PUSH20: u8 = 0x14;
const OP_PUSH33: u8 = 0x21;
const OP_PUSH65: u8 = 0x41;

/// The recognized script templates, matching the original indexer's
/// `IsSingleAddress` / `IsMultiAddress` grouping.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum ScriptType {
    PayToPubKeyHash,
    PayToScriptHash,
    PayToPubKey,
    Multisig,
}

impl ScriptType {
    /// True for templates that resolve to exactly one address.
    pub fn is_single_address(self) -> bool {
        matches!(
            self,
            ScriptType::PayToPubKeyHash | ScriptType::PayToScriptHash | ScriptType::PayToPubKey
        )
    }

    /// True for templates that resolve to two or more addresses.
    pub fn is_multi_address(self) -> bool {
        matches!(self, ScriptType::Multisig)
    }
}

/// A hash of a pay-to-script-hash or pay-to-publickey-hash payload: SHA256
/// followed by RIPEMD160, always exactly 20 bytes.
fn hash160(bytes: &[u8]) -> [u8; 20] {
    let sha_hash = Sha256::digest(bytes);
    let ripe_hash = Ripemd160::digest(&sha_hash);
    let mut payload = [0u8; 20];
    payload.copy_from_slice(&ripe_hash);
    payload
}

fn encode_address(version: u8, payload: &[u8; 20]) -> String {
    let mut bytes = Vec::with_capacity(21);
    bytes.push(version);
    bytes.extend_from_slice(payload);
    bs58::encode(bytes).with_check().into_string()
}

/// Extracts the destination address(es) from an output script, if the
/// script matches a recognized standard template.
///
/// Returns `(ok, kind, addresses)`. `addresses` has exactly one entry for
/// single-destination templates and two or more for multisig; callers join
/// multiple entries with `,` to form the canonical address-set key.
pub fn extract_destination(script: &Script) -> (bool, Option<ScriptType>, Vec<String>) {
    let data = &script.0[..];

    if let Some(hash) = match_p2pkh(data) {
        let addr = encode_address(MAINNET_P2PKH, &hash);
        return (true, Some(ScriptType::PayToPubKeyHash), vec![addr]);
    }

    if let Some(hash) = match_p2sh(data) {
        let addr = encode_address(MAINNET_P2SH, &hash);
        return (true, Some(ScriptType::PayToScriptHash), vec![addr]);
    }

    if let Some(pubkey) = match_p2pk(data) {
        let addr = encode_address(MAINNET_P2PKH, &hash160(pubkey));
        return (true, Some(ScriptType::PayToPubKey), vec![addr]);
    }

    if let Some(pubkeys) = match_bare_multisig(data) {
        let addrs = pubkeys
            .iter()
            .map(|pk| encode_address(MAINNET_P2PKH, &hash160(pk)))
            .collect();
        return (true, Some(ScriptType::Multisig), addrs);
    }

    (false, None, Vec::new())
}

/// `OP_DUP OP_HASH160 <20 bytes> OP_EQUALVERIFY OP_CHECKSIG`
fn match_p2pkh(data: &[u8]) -> Option<[u8; 20]> {
    if data.len() == 25
        && data[0] == OP_DUP
        && data[1] == OP_HASH160
        && data[2] == OP_PUSH20
        && data[23] == OP_EQUALVERIFY
        && data[24] == OP_CHECKSIG
    {
        let mut hash = [0u8; 20];
        hash.copy_from_slice(&data[3..23]);
        Some(hash)
    } else {
        None
    }
}

/// `OP_HASH160 <20 bytes> OP_EQUAL`
fn match_p2sh(data: &[u8]) -> Option<[u8; 20]> {
    if data.len() == 23 && data[0] == OP_HASH160 && data[1] == OP_PUSH20 && data[22] == OP_EQUAL {
        let mut hash = [0u8; 20];
        hash.copy_from_slice(&data[2..22]);
        Some(hash)
    } else {
        None
    }
}

/// `<33 or 65 byte pubkey> OP_CHECKSIG`
fn match_p2pk(data: &[u8]) -> Option<&[u8]> {
    if data.len() == 35 && data[0] == OP_PUSH33 && data[34] == OP_CHECKSIG {
        Some(&data[1..34])
    } else if data.len() == 67 && data[0] == OP_PUSH65 && data[66] == OP_CHECKSIG {
        Some(&data[1..66])
    } else {
        None
    }
}

/// `OP_m <pubkey>... OP_n OP_CHECKMULTISIG`, bare (non-P2SH) multisig only.
fn match_bare_multisig(data: &[u8]) -> Option<Vec<&[u8]>> {
    if data.len() < 3 || *data.last()? != OP_CHECKMULTISIG {
        return None;
    }
    let m_op = data[0];
    if !(0x51..=0x60).contains(&m_op) {
        return None;
    }
    let n_op = data[data.len() - 2];
    if !(0x51..=0x60).contains(&n_op) {
        return None;
    }
    let n = (n_op - 0x50) as usize;

    let mut pubkeys = Vec::with_capacity(n);
    let mut pos = 1;
    let body = &data[..data.len() - 2];
    while pos < body.len() {
        let push_len = body[pos] as usize;
        if push_len != 33 && push_len != 65 {
            return None;
        }
        let start = pos + 1;
        let end = start + push_len;
        if end > body.len() {
            return None;
        }
        pubkeys.push(&body[start..end]);
        pos = end;
    }

    if pubkeys.len() == n {
        Some(pubkeys)
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn p2pkh_script(hash: [u8; 20]) -> Script {
        let mut bytes = vec![OP_DUP, OP_HASH160, OP_PUSH20];
        bytes.extend_from_slice(&hash);
        bytes.push(OP_EQUALVERIFY);
        bytes.push(OP_CHECKSIG);
        Script(bytes)
    }

    fn p2sh_script(hash: [u8; 20]) -> Script {
        let mut bytes = vec![OP_HASH160, OP_PUSH20];
        bytes.extend_from_slice(&hash);
        bytes.push(OP_EQUAL);
        Script(bytes)
    }

    #[test]
    fn extracts_p2pkh_single_address() {
        let script = p2pkh_script([7u8; 20]);
        let (ok, kind, addrs) = extract_destination(&script);
        assert!(ok);
        assert_eq!(kind, Some(ScriptType::PayToPubKeyHash));
        assert_eq!(addrs.len(), 1);
        assert!(kind.unwrap().is_single_address());
    }

    #[test]
    fn extracts_p2sh_single_address() {
        let script = p2sh_script([9u8; 20]);
        let (ok, kind, addrs) = extract_destination(&script);
        assert!(ok);
        assert_eq!(kind, Some(ScriptType::PayToScriptHash));
        assert_eq!(addrs.len(), 1);
    }

    #[test]
    fn extracts_bare_multisig_multiple_addresses() {
        let pk1 = [1u8; 33];
        let pk2 = [2u8; 33];
        let mut bytes = vec![0x51]; // OP_1
        bytes.push(33);
        bytes.extend_from_slice(&pk1);
        bytes.push(33);
        bytes.extend_from_slice(&pk2);
        bytes.push(0x52); // OP_2
        bytes.push(OP_CHECKMULTISIG);
        let script = Script(bytes);

        let (ok, kind, addrs) = extract_destination(&script);
        assert!(ok);
        assert_eq!(kind, Some(ScriptType::Multisig));
        assert_eq!(addrs.len(), 2);
        assert!(kind.unwrap().is_multi_address());
    }

    #[test]
    fn non_standard_script_has_no_destination() {
        let script = Script(vec![0x6a, 0x04, 1, 2, 3, 4]); // OP_RETURN push
        let (ok, kind, addrs) = extract_destination(&script);
        assert!(!ok);
        assert_eq!(kind, None);
        assert!(addrs.is_empty());
    }
}

//! Chain primitives: wire-format (de)serialization, transparent
//! inputs/outputs, transactions and blocks.
//!
//! This crate has no knowledge of storage or networking; it only knows how
//! to turn raw bytes into typed values and back.

pub mod block;
pub mod cached;
pub mod compactint;
pub mod serialization;
pub mod transaction;
pub mod transparent;
pub mod uint256;

pub use serialization::{BitcoinDeserialize, BitcoinDeserializeInto, BitcoinSerialize, SerializationError};
pub use uint256::Uint256;

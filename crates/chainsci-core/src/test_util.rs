//! Shared test helpers for `chainsci-core` unit tests.
//!
//! Deterministic hash builders so that tests across modules construct
//! script records the same way.

use bitcoin::hashes::Hash;
use bitcoin::{PubkeyHash, ScriptHash};

use crate::address::Address;
use crate::types::ScriptType;

/// A `PubkeyHash` distinguished only by its first byte.
pub fn pubkey_hash(b: u8) -> PubkeyHash {
    let mut bytes = [0u8; 20];
    bytes[0] = b;
    PubkeyHash::from_byte_array(bytes)
}

/// A `ScriptHash` distinguished only by its first byte.
pub fn script_hash(b: u8) -> ScriptHash {
    let mut bytes = [0u8; 20];
    bytes[0] = b;
    ScriptHash::from_byte_array(bytes)
}

/// A pubkey address handle with no registered script behind it.
pub fn pubkey_address(index: u32) -> Address {
    Address::new(index, ScriptType::Pubkey)
}

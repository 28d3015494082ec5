//! Per-type script records and the `AnyScript` tagged view over them.

use bitcoin::{PubkeyHash, PublicKey, ScriptBuf};
use serde::{Deserialize, Serialize};

use crate::address::Address;
use crate::types::ScriptType;

use super::access::ScriptAccess;
use super::store::ScriptStore;

// ==============================================================================
// Record Types
// ==============================================================================

/// A pay-to-pubkey or pay-to-pubkey-hash script. The full key is only known
/// once it has appeared on chain (P2PK output or P2PKH spend).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PubkeyData {
    pub pubkey_hash: PubkeyHash,
    pub pubkey: Option<PublicKey>,
}

/// A pay-to-script-hash script.
///
/// `wrapped` and `tx_revealed` are written together, once, by the spend that
/// first provides the redeem script. Until then the wrapped script is unknown.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScriptHashData {
    pub hash: bitcoin::ScriptHash,
    pub wrapped: Option<Address>,
    pub tx_revealed: Option<u32>,
}

impl ScriptHashData {
    pub fn new(hash: bitcoin::ScriptHash) -> Self {
        Self {
            hash,
            wrapped: None,
            tx_revealed: None,
        }
    }

    pub fn has_been_revealed(&self) -> bool {
        self.tx_revealed.is_some()
    }

    /// The wrapped address, but only if it was already known as of `tx_num`
    /// (the revealing transaction itself counts as "known").
    pub fn wrapped_as_of(&self, tx_num: u32) -> Option<Address> {
        match self.tx_revealed {
            Some(revealed) if revealed <= tx_num => self.wrapped,
            _ => None,
        }
    }
}

/// A bare multisig script. Members point into the pubkey store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MultisigData {
    pub required: u8,
    pub members: Vec<Address>,
}

impl MultisigData {
    pub fn total(&self) -> usize {
        self.members.len()
    }
}

/// An `OP_RETURN` data carrier.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NullData {
    pub data: Vec<u8>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NonstandardData {
    pub script_pubkey: ScriptBuf,
}

// ==============================================================================
// Typed Store Access
// ==============================================================================

/// Links a record type to its `ScriptType` tag and to its store inside
/// `ScriptAccess`, so that typed lookups need no runtime dispatch.
pub trait ScriptRecord: Sized {
    const SCRIPT_TYPE: ScriptType;

    fn store(access: &ScriptAccess) -> &ScriptStore<Self>;

    fn as_any(&self) -> AnyScript<'_>;
}

// ==============================================================================
// AnyScript
// ==============================================================================

/// A resolved script record of any type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnyScript<'a> {
    Pubkey(&'a PubkeyData),
    ScriptHash(&'a ScriptHashData),
    Multisig(&'a MultisigData),
    NullData(&'a NullData),
    Nonstandard(&'a NonstandardData),
}

impl<'a> AnyScript<'a> {
    pub fn script_type(&self) -> ScriptType {
        match self {
            Self::Pubkey(_) => ScriptType::Pubkey,
            Self::ScriptHash(_) => ScriptType::ScriptHash,
            Self::Multisig(_) => ScriptType::Multisig,
            Self::NullData(_) => ScriptType::NullData,
            Self::Nonstandard(_) => ScriptType::Nonstandard,
        }
    }

    /// Addresses this script directly points at: the revealed redeem script
    /// of a P2SH, or the member keys of a multisig. Leaf types yield nothing.
    pub fn nested_addresses(&self) -> &'a [Address] {
        match *self {
            Self::ScriptHash(data) => data.wrapped.as_slice(),
            Self::Multisig(data) => &data.members,
            Self::Pubkey(_) | Self::NullData(_) | Self::Nonstandard(_) => &[],
        }
    }
}

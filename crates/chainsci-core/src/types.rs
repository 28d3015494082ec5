//! Domain types shared across the crate.
//!
//! Contains the closed `ScriptType` set, the `BlockHeight` newtype, the
//! stable output/input coordinates (`OutputPointer`, `InputPointer`), and
//! the compact `Output`/`Input` records handed out by a `ChainAccess`.

use serde::{Deserialize, Serialize};

use crate::address::Address;

// ==============================================================================
// Script Type Tags
// ==============================================================================

/// The closed set of script record kinds. Each tag selects exactly one
/// per-type store inside `ScriptAccess`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScriptType {
    Pubkey,
    ScriptHash,
    Multisig,
    NullData,
    Nonstandard,
}

impl ScriptType {
    pub const ALL: [ScriptType; 5] = [
        Self::Pubkey,
        Self::ScriptHash,
        Self::Multisig,
        Self::NullData,
        Self::Nonstandard,
    ];

    /// Decode the on-disk tag byte. Unknown tags yield `None`; callers
    /// decide whether that means "skip" or "treat as nonstandard".
    pub fn from_tag(tag: u8) -> Option<Self> {
        match tag {
            0 => Some(Self::Pubkey),
            1 => Some(Self::ScriptHash),
            2 => Some(Self::Multisig),
            3 => Some(Self::NullData),
            4 => Some(Self::Nonstandard),
            _ => None,
        }
    }

    /// Whether records of this type can point at other addresses.
    pub fn is_wrapper(self) -> bool {
        matches!(self, Self::ScriptHash | Self::Multisig)
    }

    pub fn tag(self) -> u8 {
        match self {
            Self::Pubkey => 0,
            Self::ScriptHash => 1,
            Self::Multisig => 2,
            Self::NullData => 3,
            Self::Nonstandard => 4,
        }
    }
}

impl std::fmt::Display for ScriptType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Pubkey => write!(f, "pubkey"),
            Self::ScriptHash => write!(f, "scripthash"),
            Self::Multisig => write!(f, "multisig"),
            Self::NullData => write!(f, "nulldata"),
            Self::Nonstandard => write!(f, "nonstandard"),
        }
    }
}

impl std::str::FromStr for ScriptType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|ty| ty.to_string() == s)
            .ok_or_else(|| format!("unknown script type `{s}`"))
    }
}

// ==============================================================================
// Block Height
// ==============================================================================

/// A block height, wrapped for type safety.
///
/// `#[serde(transparent)]` keeps the JSON representation a bare integer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BlockHeight(pub u32);

impl From<u32> for BlockHeight {
    fn from(h: u32) -> Self {
        Self(h)
    }
}

impl From<BlockHeight> for u32 {
    fn from(h: BlockHeight) -> Self {
        h.0
    }
}

impl std::ops::Deref for BlockHeight {
    type Target = u32;
    fn deref(&self) -> &u32 {
        &self.0
    }
}

impl std::fmt::Display for BlockHeight {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

// ==============================================================================
// Output / Input Coordinates
// ==============================================================================

/// Identifies one transaction output: "output `output_num` of tx `tx_num`".
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct OutputPointer {
    pub tx_num: u32,
    pub output_num: u16,
}

impl OutputPointer {
    pub fn new(tx_num: u32, output_num: u16) -> Self {
        Self { tx_num, output_num }
    }
}

/// Identifies one transaction input.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct InputPointer {
    pub tx_num: u32,
    pub input_num: u16,
}

impl InputPointer {
    pub fn new(tx_num: u32, input_num: u16) -> Self {
        Self { tx_num, input_num }
    }
}

// ==============================================================================
// Output / Input Records
// ==============================================================================

/// A decoded output as laid out by the ingestion layer: the value plus the
/// address it pays to, split into the raw type tag and the per-type index.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Output {
    pub value: i64,
    pub address_num: u32,
    pub address_type: u8,
}

impl Output {
    pub fn new(value: i64, address: Address) -> Self {
        Self {
            value,
            address_num: address.index,
            address_type: address.script_type.tag(),
        }
    }

    /// The address this output pays to, or `None` if the stored tag is not
    /// a known `ScriptType`.
    pub fn address(&self) -> Option<Address> {
        ScriptType::from_tag(self.address_type).map(|ty| Address::new(self.address_num, ty))
    }
}

/// A decoded input. Carries the value and address of the output it spends,
/// so that input-side queries never have to chase the funding transaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Input {
    pub value: i64,
    pub spent: OutputPointer,
    pub address_num: u32,
    pub address_type: u8,
}

impl Input {
    pub fn new(spent: OutputPointer, funding: &Output) -> Self {
        Self {
            value: funding.value,
            spent,
            address_num: funding.address_num,
            address_type: funding.address_type,
        }
    }

    pub fn address(&self) -> Option<Address> {
        ScriptType::from_tag(self.address_type).map(|ty| Address::new(self.address_num, ty))
    }
}

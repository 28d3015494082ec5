use std::collections::HashMap;

use bitcoin::{PubkeyHash, PublicKey, ScriptBuf};
use serde::{Deserialize, Serialize};

use crate::address::{visit, Address};
use crate::error::CoreError;
use crate::types::ScriptType;

use super::records::{
    AnyScript, MultisigData, NonstandardData, NullData, PubkeyData, ScriptHashData, ScriptRecord,
};
use super::store::ScriptStore;

/// The persisted part of `ScriptAccess`: one store per script type.
#[derive(Debug, Default, Clone, Serialize, Deserialize)]
struct Stores {
    pubkeys: ScriptStore<PubkeyData>,
    script_hashes: ScriptStore<ScriptHashData>,
    multisigs: ScriptStore<MultisigData>,
    null_data: ScriptStore<NullData>,
    nonstandard: ScriptStore<NonstandardData>,
}

/// Registry of one `ScriptStore` per `ScriptType`.
///
/// Stores only grow while a dataset is being ingested; afterwards the whole
/// registry is shared read-only (`&ScriptAccess` is `Sync`) across scans.
/// The hash indexes are derived data and are rebuilt on deserialization.
#[derive(Debug, Default, Clone, Deserialize)]
#[serde(try_from = "Stores")]
pub struct ScriptAccess {
    stores: Stores,
    pubkey_index: HashMap<PubkeyHash, u32>,
    script_hash_index: HashMap<bitcoin::ScriptHash, u32>,
}

/// Rebuilds the hash indexes and rejects wrapping links that dangle or form
/// a cycle.
impl TryFrom<Stores> for ScriptAccess {
    type Error = CoreError;

    fn try_from(stores: Stores) -> Result<Self, CoreError> {
        let pubkey_index = stores
            .pubkeys
            .iter()
            .map(|(idx, data)| (data.pubkey_hash, idx))
            .collect();
        let script_hash_index = stores
            .script_hashes
            .iter()
            .map(|(idx, data)| (data.hash, idx))
            .collect();
        let access = Self {
            stores,
            pubkey_index,
            script_hash_index,
        };
        access.check_links()?;
        Ok(access)
    }
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Mark {
    OnPath,
    Done,
}

impl ScriptAccess {
    /// Depth-first over every wrapper record. Each nested address must
    /// resolve, and no walk may come back to an address still on its path.
    fn check_links(&self) -> Result<(), CoreError> {
        let mut marks: HashMap<Address, Mark> = HashMap::new();
        let wrappers = [ScriptType::ScriptHash, ScriptType::Multisig]
            .into_iter()
            .flat_map(|ty| (0..self.size(ty)).map(move |idx| Address::new(idx, ty)));

        for root in wrappers {
            let mut stack = vec![(root, false)];
            while let Some((current, finished)) = stack.pop() {
                if finished {
                    marks.insert(current, Mark::Done);
                    continue;
                }
                match marks.get(&current) {
                    Some(Mark::Done) => continue,
                    Some(Mark::OnPath) => return Err(wrapping_cycle(current)),
                    None => {}
                }
                marks.insert(current, Mark::OnPath);
                stack.push((current, true));
                for &nested in self.resolve(current)?.nested_addresses() {
                    match marks.get(&nested) {
                        Some(Mark::OnPath) => return Err(wrapping_cycle(nested)),
                        Some(Mark::Done) => {}
                        None => stack.push((nested, false)),
                    }
                }
            }
        }
        Ok(())
    }
}

fn wrapping_cycle(address: Address) -> CoreError {
    CoreError::InvariantViolation(format!("wrapping cycle through {address}"))
}

impl Serialize for ScriptAccess {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.stores.serialize(serializer)
    }
}

impl ScriptAccess {
    pub fn new() -> Self {
        Self::default()
    }

    // ========================================================================
    // Read access
    // ========================================================================

    /// Number of records stored for `script_type`.
    pub fn size(&self, script_type: ScriptType) -> u32 {
        match script_type {
            ScriptType::Pubkey => self.stores.pubkeys.len(),
            ScriptType::ScriptHash => self.stores.script_hashes.len(),
            ScriptType::Multisig => self.stores.multisigs.len(),
            ScriptType::NullData => self.stores.null_data.len(),
            ScriptType::Nonstandard => self.stores.nonstandard.len(),
        }
    }

    /// Total number of addresses across every script type.
    pub fn address_count(&self) -> u64 {
        ScriptType::ALL
            .iter()
            .map(|ty| u64::from(self.size(*ty)))
            .sum()
    }

    pub fn get<T: ScriptRecord>(&self, index: u32) -> Result<&T, CoreError> {
        T::store(self).get(index)
    }

    /// Resolve an address to its concrete record.
    pub fn resolve(&self, address: Address) -> Result<AnyScript<'_>, CoreError> {
        let index = address.index;
        Ok(match address.script_type {
            ScriptType::Pubkey => self.stores.pubkeys.get(index)?.as_any(),
            ScriptType::ScriptHash => self.stores.script_hashes.get(index)?.as_any(),
            ScriptType::Multisig => self.stores.multisigs.get(index)?.as_any(),
            ScriptType::NullData => self.stores.null_data.get(index)?.as_any(),
            ScriptType::Nonstandard => self.stores.nonstandard.get(index)?.as_any(),
        })
    }

    pub fn find_pubkey_hash(&self, hash: &PubkeyHash) -> Option<Address> {
        self.pubkey_index
            .get(hash)
            .map(|idx| Address::new(*idx, ScriptType::Pubkey))
    }

    pub fn find_script_hash(&self, hash: &bitcoin::ScriptHash) -> Option<Address> {
        self.script_hash_index
            .get(hash)
            .map(|idx| Address::new(*idx, ScriptType::ScriptHash))
    }

    // ========================================================================
    // Ingestion
    // ========================================================================

    /// Register a pubkey-hash script, reusing the existing record when the
    /// hash is already known. A full key fills in a record that lacked one.
    pub fn add_pubkey(
        &mut self,
        pubkey_hash: PubkeyHash,
        pubkey: Option<PublicKey>,
    ) -> Result<Address, CoreError> {
        if let Some(&idx) = self.pubkey_index.get(&pubkey_hash) {
            if let (Some(key), Ok(record)) = (pubkey, self.stores.pubkeys.get_mut(idx)) {
                record.pubkey.get_or_insert(key);
            }
            return Ok(Address::new(idx, ScriptType::Pubkey));
        }
        let idx = self.stores.pubkeys.push(PubkeyData {
            pubkey_hash,
            pubkey,
        })?;
        self.pubkey_index.insert(pubkey_hash, idx);
        Ok(Address::new(idx, ScriptType::Pubkey))
    }

    pub fn add_script_hash(&mut self, hash: bitcoin::ScriptHash) -> Result<Address, CoreError> {
        if let Some(&idx) = self.script_hash_index.get(&hash) {
            return Ok(Address::new(idx, ScriptType::ScriptHash));
        }
        let idx = self.stores.script_hashes.push(ScriptHashData::new(hash))?;
        self.script_hash_index.insert(hash, idx);
        Ok(Address::new(idx, ScriptType::ScriptHash))
    }

    /// Register a bare multisig. Every member must be an existing pubkey.
    pub fn add_multisig(&mut self, required: u8, members: Vec<Address>) -> Result<Address, CoreError> {
        if members.is_empty() || usize::from(required) > members.len() {
            return Err(CoreError::InvariantViolation(format!(
                "multisig requires {required} of {} members",
                members.len()
            )));
        }
        for member in &members {
            if member.script_type != ScriptType::Pubkey {
                return Err(CoreError::InvariantViolation(format!(
                    "multisig member {member} is not a pubkey"
                )));
            }
            self.stores.pubkeys.get(member.index)?;
        }
        let idx = self.stores.multisigs.push(MultisigData { required, members })?;
        Ok(Address::new(idx, ScriptType::Multisig))
    }

    pub fn add_null_data(&mut self, data: Vec<u8>) -> Result<Address, CoreError> {
        let idx = self.stores.null_data.push(NullData { data })?;
        Ok(Address::new(idx, ScriptType::NullData))
    }

    pub fn add_nonstandard(&mut self, script_pubkey: ScriptBuf) -> Result<Address, CoreError> {
        let idx = self.stores.nonstandard.push(NonstandardData { script_pubkey })?;
        Ok(Address::new(idx, ScriptType::Nonstandard))
    }

    /// Record that the redeem script of `script_hash` became known in
    /// transaction `tx_num`.
    ///
    /// This is the only in-place mutation a store allows. Repeating the same
    /// reveal is a no-op (`Ok(false)`); a reveal that disagrees with the one
    /// already stored is an `InvariantViolation`. So is a `wrapped` script
    /// that already reaches `script_hash`, which would close a wrapping cycle.
    pub fn reveal(
        &mut self,
        script_hash: Address,
        tx_num: u32,
        wrapped: Address,
    ) -> Result<bool, CoreError> {
        if script_hash.script_type != ScriptType::ScriptHash {
            return Err(CoreError::InvariantViolation(format!(
                "cannot reveal a redeem script for {script_hash}"
            )));
        }
        if wrapped == script_hash {
            return Err(CoreError::InvariantViolation(format!(
                "{script_hash} cannot wrap itself"
            )));
        }
        let mut wraps_back = false;
        visit(wrapped, self, |a| {
            wraps_back |= a == script_hash;
            !wraps_back
        })?;
        if wraps_back {
            return Err(CoreError::InvariantViolation(format!(
                "{script_hash} cannot wrap {wrapped}, which already wraps it"
            )));
        }

        let record = self.stores.script_hashes.get_mut(script_hash.index)?;
        match (record.tx_revealed, record.wrapped) {
            (None, _) => {
                record.tx_revealed = Some(tx_num);
                record.wrapped = Some(wrapped);
                Ok(true)
            }
            (Some(existing_tx), Some(existing)) if existing_tx == tx_num && existing == wrapped => {
                Ok(false)
            }
            (Some(existing_tx), existing) => Err(CoreError::InvariantViolation(format!(
                "{script_hash} already revealed at tx {existing_tx} as {existing:?}; \
                 refusing reveal at tx {tx_num} as {wrapped}"
            ))),
        }
    }
}

macro_rules! script_record {
    ($record:ty, $script_type:ident, $field:ident) => {
        impl ScriptRecord for $record {
            const SCRIPT_TYPE: ScriptType = ScriptType::$script_type;

            fn store(access: &ScriptAccess) -> &ScriptStore<Self> {
                &access.stores.$field
            }

            fn as_any(&self) -> AnyScript<'_> {
                AnyScript::$script_type(self)
            }
        }
    };
}

script_record!(PubkeyData, Pubkey, pubkeys);
script_record!(ScriptHashData, ScriptHash, script_hashes);
script_record!(MultisigData, Multisig, multisigs);
script_record!(NullData, NullData, null_data);
script_record!(NonstandardData, Nonstandard, nonstandard);

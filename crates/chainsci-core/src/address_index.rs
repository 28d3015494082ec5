//! Reverse index from addresses to the outputs and inputs that touch them.
//!
//! Written once by the `AddressTraverser` (single writer) and then shared
//! read-only. Snapshots can be persisted as JSON together with the checkpoint
//! (the next transaction number to index) so a later run can resume.

use std::collections::{BTreeSet, HashMap};
use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::address::Address;
use crate::chain::{ChainAccess, Transaction};
use crate::error::CoreError;
use crate::types::{InputPointer, OutputPointer};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
struct AddressEntry {
    outputs: BTreeSet<OutputPointer>,
    inputs: BTreeSet<InputPointer>,
}

#[derive(Debug, Clone, Default)]
pub struct AddressIndex {
    entries: HashMap<Address, AddressEntry>,
    checkpoint: u32,
}

/// On-disk layout. JSON object keys must be strings, so entries are stored
/// as a list of pairs instead of a map keyed by `Address`.
#[derive(Serialize, Deserialize)]
struct Snapshot {
    checkpoint: u32,
    entries: Vec<(Address, AddressEntry)>,
}

impl AddressIndex {
    pub fn new() -> Self {
        Self::default()
    }

    // ========================================================================
    // Writes
    // ========================================================================

    /// Associate `pointer` with `address`. Recording the same pair twice has
    /// no further effect.
    pub fn record(&mut self, address: Address, pointer: OutputPointer) {
        self.entries
            .entry(address)
            .or_default()
            .outputs
            .insert(pointer);
    }

    pub fn record_input(&mut self, address: Address, pointer: InputPointer) {
        self.entries
            .entry(address)
            .or_default()
            .inputs
            .insert(pointer);
    }

    pub(crate) fn set_checkpoint(&mut self, next_tx: u32) {
        self.checkpoint = next_tx;
    }

    // ========================================================================
    // Queries
    // ========================================================================

    /// Outputs paying to `address`. Each call starts a fresh iteration.
    pub fn lookup(&self, address: &Address) -> impl Iterator<Item = OutputPointer> + '_ {
        self.entries
            .get(address)
            .into_iter()
            .flat_map(|entry| entry.outputs.iter().copied())
    }

    /// Inputs spending from `address`.
    pub fn lookup_inputs(&self, address: &Address) -> impl Iterator<Item = InputPointer> + '_ {
        self.entries
            .get(address)
            .into_iter()
            .flat_map(|entry| entry.inputs.iter().copied())
    }

    /// Number of distinct addresses indexed.
    pub fn count(&self) -> usize {
        self.entries.len()
    }

    pub fn contains(&self, address: &Address) -> bool {
        self.entries.contains_key(address)
    }

    pub fn addresses(&self) -> impl Iterator<Item = Address> + '_ {
        self.entries.keys().copied()
    }

    /// The next transaction number an indexing run should process.
    pub fn checkpoint(&self) -> u32 {
        self.checkpoint
    }

    /// Transactions that create an output paying to `address`, ascending.
    pub fn output_transactions<'c>(
        &self,
        address: &Address,
        chain: &'c dyn ChainAccess,
    ) -> Result<Vec<Transaction<'c>>, CoreError> {
        let tx_nums: BTreeSet<u32> = self.lookup(address).map(|p| p.tx_num).collect();
        load_transactions(tx_nums, chain)
    }

    /// Transactions with an input spending from `address`, ascending.
    pub fn input_transactions<'c>(
        &self,
        address: &Address,
        chain: &'c dyn ChainAccess,
    ) -> Result<Vec<Transaction<'c>>, CoreError> {
        let tx_nums: BTreeSet<u32> = self.lookup_inputs(address).map(|p| p.tx_num).collect();
        load_transactions(tx_nums, chain)
    }

    /// Every transaction touching `address` on either side, ascending and
    /// deduplicated.
    pub fn transactions<'c>(
        &self,
        address: &Address,
        chain: &'c dyn ChainAccess,
    ) -> Result<Vec<Transaction<'c>>, CoreError> {
        let tx_nums: BTreeSet<u32> = self
            .lookup(address)
            .map(|p| p.tx_num)
            .chain(self.lookup_inputs(address).map(|p| p.tx_num))
            .collect();
        load_transactions(tx_nums, chain)
    }

    // ========================================================================
    // Persistence
    // ========================================================================

    pub fn save(&self, path: &Path) -> Result<(), CoreError> {
        let mut entries: Vec<(Address, AddressEntry)> = self
            .entries
            .iter()
            .map(|(address, entry)| (*address, entry.clone()))
            .collect();
        entries.sort_by_key(|(address, _)| *address);

        let snapshot = Snapshot {
            checkpoint: self.checkpoint,
            entries,
        };

        // Written to a sibling file, then renamed into place.
        let tmp = path.with_extension("tmp");
        {
            let mut writer = BufWriter::new(File::create(&tmp)?);
            serde_json::to_writer(&mut writer, &snapshot)?;
            writer.flush()?;
        }
        std::fs::rename(&tmp, path)?;
        Ok(())
    }

    pub fn load(path: &Path) -> Result<Self, CoreError> {
        let reader = BufReader::new(File::open(path)?);
        let snapshot: Snapshot = serde_json::from_reader(reader)?;
        Ok(Self {
            entries: snapshot.entries.into_iter().collect(),
            checkpoint: snapshot.checkpoint,
        })
    }
}

fn load_transactions(
    tx_nums: BTreeSet<u32>,
    chain: &dyn ChainAccess,
) -> Result<Vec<Transaction<'_>>, CoreError> {
    tx_nums
        .into_iter()
        .map(|tx_num| chain.transaction(tx_num))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chain::MemoryChain;
    use crate::types::{Output, ScriptType};

    fn pubkey(index: u32) -> Address {
        Address::new(index, ScriptType::Pubkey)
    }

    #[test]
    fn record_is_idempotent() {
        let mut index = AddressIndex::new();
        let p = OutputPointer::new(3, 1);
        index.record(pubkey(0), p);
        let once: Vec<_> = index.lookup(&pubkey(0)).collect();
        index.record(pubkey(0), p);
        let twice: Vec<_> = index.lookup(&pubkey(0)).collect();

        assert_eq!(once, twice);
        assert_eq!(twice, vec![p]);
        assert_eq!(index.count(), 1);
    }

    #[test]
    fn lookup_is_restartable_and_empty_for_unknown_addresses() {
        let mut index = AddressIndex::new();
        index.record(pubkey(0), OutputPointer::new(1, 0));
        index.record(pubkey(0), OutputPointer::new(2, 0));

        let first: Vec<_> = index.lookup(&pubkey(0)).collect();
        let second: Vec<_> = index.lookup(&pubkey(0)).collect();
        assert_eq!(first, second);
        assert_eq!(first.len(), 2);
        assert_eq!(index.lookup(&pubkey(9)).count(), 0);
    }

    #[test]
    fn count_includes_input_only_addresses() {
        let mut index = AddressIndex::new();
        index.record(pubkey(0), OutputPointer::new(1, 0));
        index.record_input(pubkey(1), InputPointer::new(2, 0));
        assert_eq!(index.count(), 2);
        assert_eq!(index.lookup(&pubkey(1)).count(), 0);
        assert_eq!(index.lookup_inputs(&pubkey(1)).count(), 1);
    }

    #[test]
    fn transactions_are_deduplicated_and_ascending() {
        let mut chain = MemoryChain::new();
        chain.push_block().unwrap();
        chain
            .push_tx(0, vec![], vec![Output::new(10, pubkey(0)), Output::new(20, pubkey(0))])
            .unwrap();
        chain.push_tx(0, vec![], vec![Output::new(30, pubkey(1))]).unwrap();

        let mut index = AddressIndex::new();
        index.record(pubkey(0), OutputPointer::new(0, 1));
        index.record(pubkey(0), OutputPointer::new(0, 0));
        index.record_input(pubkey(0), InputPointer::new(1, 0));

        let txs = index.transactions(&pubkey(0), &chain).unwrap();
        let nums: Vec<u32> = txs.iter().map(|tx| tx.tx_num).collect();
        assert_eq!(nums, vec![0, 1]);

        let outs = index.output_transactions(&pubkey(0), &chain).unwrap();
        assert_eq!(outs.len(), 1);
    }

    #[test]
    fn save_and_load_preserve_entries_and_checkpoint() {
        let dir = std::env::temp_dir().join(format!("chainsci-index-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("index.json");

        let mut index = AddressIndex::new();
        index.record(pubkey(0), OutputPointer::new(1, 0));
        index.record_input(pubkey(2), InputPointer::new(4, 1));
        index.set_checkpoint(7);
        index.save(&path).unwrap();

        let loaded = AddressIndex::load(&path).unwrap();
        assert_eq!(loaded.checkpoint(), 7);
        assert_eq!(loaded.count(), 2);
        assert_eq!(
            loaded.lookup(&pubkey(0)).collect::<Vec<_>>(),
            vec![OutputPointer::new(1, 0)]
        );
        assert_eq!(
            loaded.lookup_inputs(&pubkey(2)).collect::<Vec<_>>(),
            vec![InputPointer::new(4, 1)]
        );

        std::fs::remove_dir_all(&dir).ok();
    }
}

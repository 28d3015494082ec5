//! The ordered address indexing pass.
//!
//! Every output (and every spent output, through the inputs) is visited
//! together with the addresses it transitively wraps, and each accepted
//! address is recorded in an [`AddressIndex`]. P2SH wrapping is only followed
//! once the redeem script has been revealed, which is why transactions must
//! be processed strictly in ascending `tx_num` order and by a single writer.

use std::collections::HashSet;

use crate::address::{try_visit, Address};
use crate::address_index::AddressIndex;
use crate::chain::{ChainAccess, Transaction};
use crate::error::CoreError;
use crate::scripts::{ScriptAccess, ScriptHashData};
use crate::types::{InputPointer, OutputPointer, ScriptType};

// ==============================================================================
// Reveal Hook
// ==============================================================================

/// Extension point for indexes that need to learn when a P2SH redeem script
/// becomes known. Called once per record, while indexing the revealing
/// transaction.
pub trait RevealHook {
    fn revealed_p2sh(&mut self, address: Address, record: &ScriptHashData, scripts: &ScriptAccess);
}

impl<F> RevealHook for F
where
    F: FnMut(Address, &ScriptHashData, &ScriptAccess),
{
    fn revealed_p2sh(&mut self, address: Address, record: &ScriptHashData, scripts: &ScriptAccess) {
        self(address, record, scripts)
    }
}

/// A hook that ignores reveals.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopHook;

impl RevealHook for NoopHook {
    fn revealed_p2sh(&mut self, _: Address, _: &ScriptHashData, _: &ScriptAccess) {}
}

// ==============================================================================
// Configuration and Summary
// ==============================================================================

#[derive(Debug, Clone)]
pub struct TraverserConfig {
    /// Emit a progress event every this many transactions.
    pub progress_interval: u32,
}

impl Default for TraverserConfig {
    fn default() -> Self {
        Self {
            progress_interval: 100_000,
        }
    }
}

/// Counters collected over one indexing run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IndexSummary {
    pub transactions: u64,
    pub output_links: u64,
    pub input_links: u64,
    pub reveals: u64,
    pub unknown_scripts: u64,
    /// First transaction number not yet indexed.
    pub next_tx: u32,
}

// ==============================================================================
// Traverser
// ==============================================================================

pub struct AddressTraverser<'s, H> {
    scripts: &'s ScriptAccess,
    hook: H,
    config: TraverserConfig,
    summary: IndexSummary,
}

impl<'s, H: RevealHook> AddressTraverser<'s, H> {
    /// Start a traverser that expects `start_tx` as its first transaction.
    pub fn new(scripts: &'s ScriptAccess, hook: H, start_tx: u32) -> Self {
        Self {
            scripts,
            hook,
            config: TraverserConfig::default(),
            summary: IndexSummary {
                next_tx: start_tx,
                ..Default::default()
            },
        }
    }

    pub fn with_config(mut self, config: TraverserConfig) -> Self {
        self.config = config;
        self
    }

    pub fn summary(&self) -> &IndexSummary {
        &self.summary
    }

    pub fn into_hook(self) -> H {
        self.hook
    }

    /// Index every transaction from the current position to the chain tip.
    pub fn run(
        &mut self,
        chain: &dyn ChainAccess,
        index: &mut AddressIndex,
    ) -> Result<IndexSummary, CoreError> {
        let start = self.summary.next_tx;
        let end = chain.tx_count();
        tracing::info!(start_tx = start, end_tx = end, "indexing addresses");

        for tx_num in start..end {
            let tx = chain.transaction(tx_num)?;
            self.process_tx(&tx, index)?;

            let interval = self.config.progress_interval.max(1);
            if (tx_num + 1) % interval == 0 {
                tracing::debug!(
                    tx_num,
                    addresses = index.count(),
                    reveals = self.summary.reveals,
                    "indexing progress"
                );
            }
        }

        tracing::info!(
            transactions = self.summary.transactions,
            output_links = self.summary.output_links,
            input_links = self.summary.input_links,
            reveals = self.summary.reveals,
            unknown_scripts = self.summary.unknown_scripts,
            addresses = index.count(),
            "address indexing finished"
        );
        Ok(self.summary.clone())
    }

    /// Index a single transaction.
    ///
    /// Transactions must arrive in ascending `tx_num` order; anything at or
    /// below an already processed number is rejected, since attributing it
    /// now could use reveals that happened after it.
    pub fn process_tx(
        &mut self,
        tx: &Transaction<'_>,
        index: &mut AddressIndex,
    ) -> Result<(), CoreError> {
        if tx.tx_num < self.summary.next_tx {
            return Err(CoreError::InvariantViolation(format!(
                "transaction {} processed out of order (expected at least {})",
                tx.tx_num, self.summary.next_tx
            )));
        }

        let scripts = self.scripts;
        let tx_num = tx.tx_num;
        let mut revealed: HashSet<u32> = HashSet::new();

        for item in tx.output_pointers() {
            let (pointer, output) = item?;
            let address = self.known_or_nonstandard(output.address(), output.address_num, tx_num);
            visit_as_of(address, scripts, tx_num, &mut revealed, &mut self.hook, |a| {
                index.record(a, pointer);
                self.summary.output_links += 1;
            })?;
        }

        for item in tx.input_pointers() {
            let (pointer, input) = item?;
            let address = self.known_or_nonstandard(input.address(), input.address_num, tx_num);
            visit_as_of(address, scripts, tx_num, &mut revealed, &mut self.hook, |a| {
                index.record_input(a, pointer);
                self.summary.input_links += 1;
            })?;
        }

        self.summary.reveals += revealed.len() as u64;
        self.summary.transactions += 1;
        self.summary.next_tx = tx_num + 1;
        Ok(())
    }

    fn known_or_nonstandard(&mut self, address: Option<Address>, address_num: u32, tx_num: u32) -> Address {
        address.unwrap_or_else(|| {
            tracing::warn!(tx_num, address_num, "unknown script type; indexing as nonstandard");
            self.summary.unknown_scripts += 1;
            Address::new(address_num, ScriptType::Nonstandard)
        })
    }
}

/// Visit `address` as the chain looked while `tx_num` was being processed:
/// a P2SH is only unwrapped if its redeem script was revealed in `tx_num` or
/// earlier. A reveal happening in `tx_num` itself fires the hook, once per
/// P2SH record for the whole transaction.
fn visit_as_of<H, R>(
    address: Address,
    scripts: &ScriptAccess,
    tx_num: u32,
    revealed: &mut HashSet<u32>,
    hook: &mut H,
    mut record: R,
) -> Result<(), CoreError>
where
    H: RevealHook,
    R: FnMut(Address),
{
    try_visit(address, scripts, |a| {
        record(a);
        if a.script_type != ScriptType::ScriptHash {
            return Ok(true);
        }

        let p2sh = scripts.get::<ScriptHashData>(a.index)?;
        match p2sh.tx_revealed {
            Some(revealed_at) if revealed_at <= tx_num => {
                if revealed_at == tx_num && revealed.insert(a.index) {
                    tracing::debug!(tx_num, address = %a, "redeem script revealed");
                    hook.revealed_p2sh(a, p2sh, scripts);
                }
                Ok(true)
            }
            _ => Ok(false),
        }
    })
}

/// Bring `index` up to date with `chain`, resuming from its checkpoint.
///
/// The run is all-or-nothing: work happens on a staged copy that only
/// replaces `index` once every transaction has been processed. On error
/// `index` is left exactly as it was.
pub fn index_chain<H: RevealHook>(
    chain: &dyn ChainAccess,
    scripts: &ScriptAccess,
    index: &mut AddressIndex,
    hook: H,
) -> Result<IndexSummary, CoreError> {
    index_chain_with(chain, scripts, index, hook, TraverserConfig::default())
}

pub fn index_chain_with<H: RevealHook>(
    chain: &dyn ChainAccess,
    scripts: &ScriptAccess,
    index: &mut AddressIndex,
    hook: H,
    config: TraverserConfig,
) -> Result<IndexSummary, CoreError> {
    let mut staged = index.clone();
    let mut traverser = AddressTraverser::new(scripts, hook, staged.checkpoint()).with_config(config);
    let summary = traverser.run(chain, &mut staged)?;
    staged.set_checkpoint(summary.next_tx);
    *index = staged;
    Ok(summary)
}

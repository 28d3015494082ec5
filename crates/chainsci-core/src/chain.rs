//! Read-only access to already-ingested chain data.
//!
//! [`ChainAccess`] is the seam to the storage layer: everything in this crate
//! reads blocks and transactions through it and never writes back.
//! [`MemoryChain`] is the in-memory implementation used for JSON datasets and
//! tests.

use std::ops::Range;

use serde::{Deserialize, Serialize};

use crate::error::{next_number, CoreError};
use crate::types::{BlockHeight, Input, InputPointer, Output, OutputPointer};

// ==============================================================================
// Views
// ==============================================================================

/// A block, described by the contiguous run of transaction numbers it holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Block {
    pub height: BlockHeight,
    pub first_tx_num: u32,
    pub tx_count: u32,
}

impl Block {
    pub fn end_tx_num(&self) -> u32 {
        self.first_tx_num + self.tx_count
    }

    pub fn tx_nums(&self) -> Range<u32> {
        self.first_tx_num..self.end_tx_num()
    }
}

/// A borrowed view of one transaction.
#[derive(Debug, Clone, Copy)]
pub struct Transaction<'a> {
    pub tx_num: u32,
    pub block_height: BlockHeight,
    pub locktime: u32,
    pub inputs: &'a [Input],
    pub outputs: &'a [Output],
}

impl<'a> Transaction<'a> {
    /// Coinbase transactions are the ones that spend nothing.
    pub fn is_coinbase(&self) -> bool {
        self.inputs.is_empty()
    }

    /// Each output with its pointer. An output whose position does not fit
    /// an `OutputPointer` yields `OutOfRange`.
    pub fn output_pointers(
        &self,
    ) -> impl Iterator<Item = Result<(OutputPointer, &'a Output), CoreError>> + '_ {
        let tx_num = self.tx_num;
        self.outputs.iter().enumerate().map(move |(idx, output)| {
            let output_num = pointer_num("output", idx)?;
            Ok((OutputPointer::new(tx_num, output_num), output))
        })
    }

    pub fn input_pointers(
        &self,
    ) -> impl Iterator<Item = Result<(InputPointer, &'a Input), CoreError>> + '_ {
        let tx_num = self.tx_num;
        self.inputs.iter().enumerate().map(move |(idx, input)| {
            let input_num = pointer_num("input", idx)?;
            Ok((InputPointer::new(tx_num, input_num), input))
        })
    }
}

/// Most inputs or outputs a single transaction can carry.
pub const MAX_TX_IO: usize = u16::MAX as usize + 1;

fn pointer_num(what: &'static str, idx: usize) -> Result<u16, CoreError> {
    u16::try_from(idx).map_err(|_| CoreError::out_of_range(what, idx as u64, MAX_TX_IO as u64))
}

// ==============================================================================
// Chain Access Trait
// ==============================================================================

/// Read-only access to ingested blocks and transactions by number.
///
/// Implementations must be safe to share across scan threads: history is
/// immutable once a scan starts, so no locking is expected.
pub trait ChainAccess: Send + Sync {
    /// Number of blocks.
    fn block_count(&self) -> u32;

    /// Number of transactions across all blocks.
    fn tx_count(&self) -> u32;

    fn block(&self, height: BlockHeight) -> Result<Block, CoreError>;

    fn transaction(&self, tx_num: u32) -> Result<Transaction<'_>, CoreError>;

    fn output(&self, pointer: OutputPointer) -> Result<&Output, CoreError> {
        let tx = self.transaction(pointer.tx_num)?;
        tx.outputs.get(usize::from(pointer.output_num)).ok_or_else(|| {
            CoreError::out_of_range(
                "output",
                pointer.output_num.into(),
                tx.outputs.len() as u64,
            )
        })
    }

    fn input(&self, pointer: InputPointer) -> Result<&Input, CoreError> {
        let tx = self.transaction(pointer.tx_num)?;
        tx.inputs.get(usize::from(pointer.input_num)).ok_or_else(|| {
            CoreError::out_of_range("input", pointer.input_num.into(), tx.inputs.len() as u64)
        })
    }
}

// ==============================================================================
// In-Memory Chain
// ==============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
struct StoredBlock {
    first_tx_num: u32,
    tx_count: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct StoredTx {
    block_height: BlockHeight,
    locktime: u32,
    inputs: Vec<Input>,
    outputs: Vec<Output>,
}

/// A `ChainAccess` backed by plain vectors.
///
/// Blocks and transactions are appended in chain order; transaction numbers
/// are dense and ascending across block boundaries. Block and transaction
/// counts stay below `u32::MAX`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MemoryChain {
    blocks: Vec<StoredBlock>,
    txs: Vec<StoredTx>,
}

impl MemoryChain {
    pub fn new() -> Self {
        Self::default()
    }

    /// Open a new, empty block at the tip and return its height.
    pub fn push_block(&mut self) -> Result<BlockHeight, CoreError> {
        let height = next_number("block", self.blocks.len())?;
        let first_tx_num = next_number("transaction", self.txs.len())?;
        self.blocks.push(StoredBlock {
            first_tx_num,
            tx_count: 0,
        });
        Ok(BlockHeight(height))
    }

    /// Append a transaction to the tip block and return its tx number.
    ///
    /// A transaction may carry at most [`MAX_TX_IO`] inputs and as many
    /// outputs, so that every position fits its pointer.
    pub fn push_tx(
        &mut self,
        locktime: u32,
        inputs: Vec<Input>,
        outputs: Vec<Output>,
    ) -> Result<u32, CoreError> {
        if inputs.len() > MAX_TX_IO {
            return Err(CoreError::out_of_range("input", inputs.len() as u64 - 1, MAX_TX_IO as u64));
        }
        if outputs.len() > MAX_TX_IO {
            return Err(CoreError::out_of_range("output", outputs.len() as u64 - 1, MAX_TX_IO as u64));
        }
        let tx_num = next_number("transaction", self.txs.len())?;
        let height = BlockHeight(self.blocks.len().saturating_sub(1) as u32);
        let tip = self.blocks.last_mut().ok_or_else(|| {
            CoreError::InvariantViolation("cannot add a transaction before the first block".into())
        })?;
        tip.tx_count += 1;
        self.txs.push(StoredTx {
            block_height: height,
            locktime,
            inputs,
            outputs,
        });
        Ok(tx_num)
    }

    /// Build an input that spends `pointer`, copying the funding output's
    /// value and address.
    pub fn spend(&self, pointer: OutputPointer) -> Result<Input, CoreError> {
        let funding = self.output(pointer)?;
        Ok(Input::new(pointer, funding))
    }

    pub fn next_tx_num(&self) -> u32 {
        self.txs.len() as u32
    }
}

impl ChainAccess for MemoryChain {
    fn block_count(&self) -> u32 {
        self.blocks.len() as u32
    }

    fn tx_count(&self) -> u32 {
        self.txs.len() as u32
    }

    fn block(&self, height: BlockHeight) -> Result<Block, CoreError> {
        let stored = self.blocks.get(*height as usize).ok_or_else(|| {
            CoreError::out_of_range("block", (*height).into(), self.blocks.len() as u64)
        })?;
        Ok(Block {
            height,
            first_tx_num: stored.first_tx_num,
            tx_count: stored.tx_count,
        })
    }

    fn transaction(&self, tx_num: u32) -> Result<Transaction<'_>, CoreError> {
        let stored = self.txs.get(tx_num as usize).ok_or_else(|| {
            CoreError::out_of_range("transaction", tx_num.into(), self.txs.len() as u64)
        })?;
        Ok(Transaction {
            tx_num,
            block_height: stored.block_height,
            locktime: stored.locktime,
            inputs: &stored.inputs,
            outputs: &stored.outputs,
        })
    }
}

//! Block ranges and the parallel map-reduce scan over them.
//!
//! A [`BlockRange`] is a validated, contiguous slice `[start, end)` of block
//! heights. [`BlockRange::map_reduce`] splits it into contiguous block
//! partitions on a rayon pool; each worker folds its partition, then the
//! partial results are combined. The fold order is unspecified, so `combine`
//! must be associative and `extract` must not depend on call order.

use std::ops::Range;

use rayon::prelude::*;

use crate::chain::{Block, ChainAccess, Transaction};
use crate::error::CoreError;
use crate::types::BlockHeight;

#[derive(Debug, Clone)]
pub struct ScanConfig {
    /// Worker count. `None` uses the global rayon pool.
    pub threads: Option<usize>,
    /// Lower bound on the blocks a single partition covers.
    pub min_blocks_per_partition: usize,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            threads: None,
            min_blocks_per_partition: 16,
        }
    }
}

#[derive(Clone, Copy)]
pub struct BlockRange<'c> {
    chain: &'c dyn ChainAccess,
    start: u32,
    end: u32,
}

impl std::fmt::Debug for BlockRange<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BlockRange")
            .field("start", &self.start)
            .field("end", &self.end)
            .finish()
    }
}

impl<'c> BlockRange<'c> {
    /// Validate `blocks` against the chain. The range must be non-empty and
    /// end at or before the chain tip.
    pub fn new(chain: &'c dyn ChainAccess, blocks: Range<u32>) -> Result<Self, CoreError> {
        if blocks.end <= blocks.start {
            return Err(CoreError::out_of_range(
                "block range end at or below start",
                blocks.end.into(),
                blocks.start.into(),
            ));
        }
        let block_count = chain.block_count();
        if blocks.end > block_count {
            return Err(CoreError::out_of_range(
                "block range end",
                blocks.end.into(),
                block_count.into(),
            ));
        }
        Ok(Self {
            chain,
            start: blocks.start,
            end: blocks.end,
        })
    }

    /// The whole chain.
    pub fn full(chain: &'c dyn ChainAccess) -> Result<Self, CoreError> {
        Self::new(chain, 0..chain.block_count())
    }

    pub fn start(&self) -> u32 {
        self.start
    }

    pub fn end(&self) -> u32 {
        self.end
    }

    pub fn len(&self) -> u32 {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.end == self.start
    }

    /// Split into `[start, at)` and `[at, end)`. Both halves must be non-empty.
    pub fn split(&self, at: u32) -> Result<(Self, Self), CoreError> {
        Ok((
            Self::new(self.chain, self.start..at)?,
            Self::new(self.chain, at..self.end)?,
        ))
    }

    pub fn blocks(&self) -> impl Iterator<Item = Result<Block, CoreError>> + 'c {
        let chain = self.chain;
        (self.start..self.end).map(move |height| chain.block(BlockHeight(height)))
    }

    /// The transaction numbers covered by this range.
    pub fn tx_nums(&self) -> Result<Range<u32>, CoreError> {
        let first = self.chain.block(BlockHeight(self.start))?;
        let last = self.chain.block(BlockHeight(self.end - 1))?;
        Ok(first.first_tx_num..last.end_tx_num())
    }

    pub fn transactions(
        &self,
    ) -> Result<impl Iterator<Item = Result<Transaction<'c>, CoreError>> + 'c, CoreError> {
        let chain = self.chain;
        Ok(self.tx_nums()?.map(move |tx_num| chain.transaction(tx_num)))
    }

    // ========================================================================
    // Map-reduce
    // ========================================================================

    /// Parallel scan with the default [`ScanConfig`].
    ///
    /// `extract` runs exactly once per transaction; `T::default()` is the
    /// identity for `combine`, so an empty partition contributes nothing.
    pub fn map_reduce<T, E, C>(&self, extract: E, combine: C) -> Result<T, CoreError>
    where
        T: Default + Send,
        E: Fn(&Transaction<'_>) -> T + Sync + Send,
        C: Fn(T, T) -> T + Sync + Send,
    {
        self.map_reduce_with(&ScanConfig::default(), extract, combine)
    }

    pub fn map_reduce_with<T, E, C>(
        &self,
        config: &ScanConfig,
        extract: E,
        combine: C,
    ) -> Result<T, CoreError>
    where
        T: Default + Send,
        E: Fn(&Transaction<'_>) -> T + Sync + Send,
        C: Fn(T, T) -> T + Sync + Send,
    {
        let min_len = config.min_blocks_per_partition.max(1);
        match config.threads {
            Some(threads) => {
                let pool = rayon::ThreadPoolBuilder::new()
                    .num_threads(threads)
                    .build()
                    .map_err(|e| CoreError::WorkerPool(e.to_string()))?;
                pool.install(|| self.par_scan(min_len, &extract, &combine))
            }
            None => self.par_scan(min_len, &extract, &combine),
        }
    }

    /// Single-threaded reference scan, in block and transaction order.
    pub fn map_reduce_sequential<T, E, C>(&self, extract: E, combine: C) -> Result<T, CoreError>
    where
        T: Default,
        E: Fn(&Transaction<'_>) -> T,
        C: Fn(T, T) -> T,
    {
        let mut acc = T::default();
        for tx in self.transactions()? {
            acc = combine(acc, extract(&tx?));
        }
        Ok(acc)
    }

    fn par_scan<T, E, C>(&self, min_len: usize, extract: &E, combine: &C) -> Result<T, CoreError>
    where
        T: Default + Send,
        E: Fn(&Transaction<'_>) -> T + Sync + Send,
        C: Fn(T, T) -> T + Sync + Send,
    {
        let chain = self.chain;
        (self.start..self.end)
            .into_par_iter()
            .with_min_len(min_len)
            .try_fold(T::default, |mut acc, height| {
                let block = chain.block(BlockHeight(height))?;
                for tx_num in block.tx_nums() {
                    let tx = chain.transaction(tx_num)?;
                    acc = combine(acc, extract(&tx));
                }
                Ok::<T, CoreError>(acc)
            })
            .try_reduce(T::default, |a, b| Ok(combine(a, b)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chain::MemoryChain;
    use crate::test_util::*;
    use crate::types::Output;

    /// Blocks 0 and 1 are empty; block 2 holds one 5000-sat output.
    fn three_blocks() -> MemoryChain {
        let mut chain = MemoryChain::new();
        chain.push_block().unwrap();
        chain.push_block().unwrap();
        chain.push_block().unwrap();
        chain
            .push_tx(0, vec![], vec![Output::new(5000, pubkey_address(0))])
            .unwrap();
        chain
    }

    fn max_output(tx: &Transaction<'_>) -> i64 {
        tx.outputs.iter().map(|o| o.value).max().unwrap_or(0)
    }

    #[test]
    fn max_output_over_full_and_partial_ranges() {
        let chain = three_blocks();

        let full = BlockRange::new(&chain, 0..3).unwrap();
        assert_eq!(full.map_reduce(max_output, i64::max).unwrap(), 5000);

        let head = BlockRange::new(&chain, 0..1).unwrap();
        assert_eq!(head.map_reduce(max_output, i64::max).unwrap(), 0);
    }

    #[test]
    fn invalid_ranges_are_out_of_range() {
        let chain = three_blocks();
        for blocks in [1..1, 2..1, 0..4] {
            let err = BlockRange::new(&chain, blocks.clone()).unwrap_err();
            assert!(
                matches!(err, CoreError::OutOfRange { .. }),
                "{blocks:?} should be rejected, got {err}"
            );
        }
    }

    #[test]
    fn extract_runs_once_per_transaction() {
        let mut chain = MemoryChain::new();
        for _ in 0..40 {
            chain.push_block().unwrap();
            for _ in 0..3 {
                chain.push_tx(0, vec![], vec![]).unwrap();
            }
        }
        let range = BlockRange::full(&chain).unwrap();
        let config = ScanConfig {
            threads: Some(4),
            min_blocks_per_partition: 1,
        };

        let mut seen: Vec<u32> = range
            .map_reduce_with(&config, |tx| vec![tx.tx_num], |mut a, b| {
                a.extend(b);
                a
            })
            .unwrap();
        seen.sort_unstable();
        assert_eq!(seen, (0..120).collect::<Vec<_>>());
    }

    #[test]
    fn split_requires_interior_point() {
        let chain = three_blocks();
        let range = BlockRange::full(&chain).unwrap();
        let (left, right) = range.split(1).unwrap();
        assert_eq!((left.start(), left.end()), (0, 1));
        assert_eq!((right.start(), right.end()), (1, 3));
        assert!(range.split(0).is_err());
        assert!(range.split(3).is_err());
    }

    #[test]
    fn tx_nums_follow_block_boundaries() {
        let mut chain = MemoryChain::new();
        chain.push_block().unwrap();
        chain.push_tx(0, vec![], vec![]).unwrap();
        chain.push_block().unwrap();
        chain.push_tx(0, vec![], vec![]).unwrap();
        chain.push_tx(0, vec![], vec![]).unwrap();

        let range = BlockRange::new(&chain, 1..2).unwrap();
        assert_eq!(range.tx_nums().unwrap(), 1..3);
        assert_eq!(range.blocks().count(), 1);
    }
}

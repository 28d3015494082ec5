//! Map-reduce benchmarks: each statistic is computed once with a plain
//! sequential loop and once through `BlockRange::map_reduce_with`, and both
//! results are reported side by side so disagreements are obvious.

use std::time::Instant;

use chainsci_core::analysis::{fee, has_nonzero_locktime, max_input_value, max_output_value};
use chainsci_core::{BlockRange, ChainAccess, CoreError, ScanConfig};
use rand::seq::SliceRandom;

pub struct BenchOptions {
    pub with_random: bool,
    pub scan: ScanConfig,
}

pub fn run(range: &BlockRange<'_>, chain: &dyn ChainAccess, opts: &BenchOptions) -> eyre::Result<()> {
    println!(
        "Running performance tests on blocks {}..{}",
        range.start(),
        range.end()
    );

    println!("Heating up cache");
    range.map_reduce_with(&opts.scan, fee, i64::max)?;
    println!("Finished heating up cache");

    let locktime_1 = time_func("nonzero_locktime_single_threaded", || {
        range.map_reduce_sequential(has_nonzero_locktime, |a, b| a + b)
    })?;
    let locktime_2 = time_func("nonzero_locktime_multithreaded", || {
        range.map_reduce_with(&opts.scan, has_nonzero_locktime, |a, b| a + b)
    })?;

    let output_1 = time_func("max_output_single_threaded", || {
        range.map_reduce_sequential(max_output_value, i64::max)
    })?;
    let output_2 = time_func("max_output_multithreaded", || {
        range.map_reduce_with(&opts.scan, max_output_value, i64::max)
    })?;

    let input_1 = time_func("max_input_single_threaded", || {
        range.map_reduce_sequential(max_input_value, i64::max)
    })?;
    let input_2 = time_func("max_input_multithreaded", || {
        range.map_reduce_with(&opts.scan, max_input_value, i64::max)
    })?;

    let fee_1 = time_func("max_fee_single_threaded", || {
        range.map_reduce_sequential(fee, i64::max)
    })?;
    let fee_2 = time_func("max_fee_multithreaded", || {
        range.map_reduce_with(&opts.scan, fee, i64::max)
    })?;

    if opts.with_random {
        let mut tx_nums: Vec<u32> = range.tx_nums()?.collect();
        tx_nums.shuffle(&mut rand::thread_rng());

        time_func("max_fee_random", || max_fee_random(chain, &tx_nums))?;
        time_func("nonzero_locktime_random", || {
            nonzero_locktime_random(chain, &tx_nums)
        })?;
    }

    println!("Nonzero Locktime = ({locktime_1}, {locktime_2})");
    println!("Max Output = ({output_1}, {output_2})");
    println!("Max Input = ({input_1}, {input_2})");
    println!("Max Fee = ({fee_1}, {fee_2})");

    if (locktime_1, output_1, input_1, fee_1) != (locktime_2, output_2, input_2, fee_2) {
        eyre::bail!("single-threaded and multithreaded results disagree");
    }
    Ok(())
}

fn max_fee_random(chain: &dyn ChainAccess, tx_nums: &[u32]) -> Result<i64, CoreError> {
    tx_nums.iter().try_fold(0i64, |acc, &tx_num| {
        Ok(acc.max(fee(&chain.transaction(tx_num)?)))
    })
}

fn nonzero_locktime_random(chain: &dyn ChainAccess, tx_nums: &[u32]) -> Result<u32, CoreError> {
    tx_nums.iter().try_fold(0u32, |acc, &tx_num| {
        Ok(acc + has_nonzero_locktime(&chain.transaction(tx_num)?))
    })
}

fn time_func<T>(name: &str, func: impl FnOnce() -> Result<T, CoreError>) -> Result<T, CoreError> {
    let begin = Instant::now();
    let result = func()?;
    let secs = begin.elapsed().as_secs_f64();
    tracing::info!(benchmark = name, secs, "benchmark finished");
    println!("Time in secs for {name}: {secs:.6}");
    Ok(result)
}

use chainsci_core::analysis::{fee, has_nonzero_locktime, max_input_value, max_output_value};
use chainsci_core::types::{Output, ScriptType};
use chainsci_core::{Address, BlockRange, MemoryChain, OutputPointer, ScanConfig};

/// A deterministic synthetic chain: every block has a coinbase plus a few
/// transactions spending earlier outputs, with varied values and locktimes.
fn synthetic_chain(blocks: u32) -> MemoryChain {
    let mut seed: u64 = 0x5eed;
    let mut next = move || {
        seed = seed.wrapping_mul(6364136223846793005).wrapping_add(1442695040888963407);
        (seed >> 33) as u32
    };

    let mut chain = MemoryChain::new();
    let mut unspent: Vec<OutputPointer> = Vec::new();
    for _ in 0..blocks {
        chain.push_block().unwrap();
        let payee = Address::new(next() % 50, ScriptType::Pubkey);
        let coinbase = chain
            .push_tx(0, vec![], vec![Output::new(5_000_000_000, payee)])
            .unwrap();
        unspent.push(OutputPointer::new(coinbase, 0));

        for _ in 0..(next() % 4) {
            if unspent.is_empty() {
                break;
            }
            let pick = next() as usize % unspent.len();
            let spent = unspent.swap_remove(pick);
            let input = chain.spend(spent).unwrap();
            let fee = i64::from(next() % 10_000);
            let change = (input.value - fee) / 2;
            let locktime = if next() % 3 == 0 { next() % 700_000 } else { 0 };
            let a = Address::new(next() % 50, ScriptType::Pubkey);
            let b = Address::new(next() % 50, ScriptType::Pubkey);
            let tx = chain
                .push_tx(
                    locktime,
                    vec![input.clone()],
                    vec![Output::new(change, a), Output::new(input.value - fee - change, b)],
                )
                .unwrap();
            unspent.push(OutputPointer::new(tx, 0));
            unspent.push(OutputPointer::new(tx, 1));
        }
    }
    chain
}

fn multithreaded() -> ScanConfig {
    ScanConfig {
        threads: Some(4),
        min_blocks_per_partition: 3,
    }
}

#[test]
fn single_and_multithreaded_scans_agree() {
    let chain = synthetic_chain(200);
    let range = BlockRange::full(&chain).unwrap();
    let config = multithreaded();

    let seq_output = range.map_reduce_sequential(max_output_value, i64::max).unwrap();
    let par_output = range.map_reduce_with(&config, max_output_value, i64::max).unwrap();
    assert_eq!(seq_output, par_output);
    assert_eq!(par_output, 5_000_000_000);

    let seq_input = range.map_reduce_sequential(max_input_value, i64::max).unwrap();
    let par_input = range.map_reduce_with(&config, max_input_value, i64::max).unwrap();
    assert_eq!(seq_input, par_input);

    let seq_fee = range.map_reduce_sequential(fee, i64::max).unwrap();
    let par_fee = range.map_reduce_with(&config, fee, i64::max).unwrap();
    assert_eq!(seq_fee, par_fee);

    let seq_locktime = range
        .map_reduce_sequential(has_nonzero_locktime, |a, b| a + b)
        .unwrap();
    let par_locktime = range
        .map_reduce_with(&config, has_nonzero_locktime, |a, b| a + b)
        .unwrap();
    assert_eq!(seq_locktime, par_locktime);
}

#[test]
fn scan_over_sub_ranges_combines_to_whole() {
    let chain = synthetic_chain(120);
    let range = BlockRange::full(&chain).unwrap();
    let tx_count = |_: &chainsci_core::Transaction<'_>| 1u64;
    let total_value = |tx: &chainsci_core::Transaction<'_>| {
        tx.outputs.iter().map(|o| o.value).sum::<i64>()
    };

    let whole_count = range.map_reduce(tx_count, |a, b| a + b).unwrap();
    let whole_value = range.map_reduce(total_value, |a, b| a + b).unwrap();

    for at in [1, 17, 60, 119] {
        let (left, right) = range.split(at).unwrap();
        let count = left.map_reduce(tx_count, |a, b| a + b).unwrap()
            + right.map_reduce(tx_count, |a, b| a + b).unwrap();
        let value = left.map_reduce(total_value, |a, b| a + b).unwrap()
            + right.map_reduce(total_value, |a, b| a + b).unwrap();
        assert_eq!(count, whole_count, "split at {at}");
        assert_eq!(value, whole_value, "split at {at}");
    }

    let seq_count: u64 = range
        .transactions()
        .unwrap()
        .map(|tx| tx.map(|_| 1u64))
        .sum::<Result<u64, _>>()
        .unwrap();
    assert_eq!(seq_count, whole_count);
}

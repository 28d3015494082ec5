//! Per-transaction statistics, shaped to plug into `BlockRange::map_reduce`.

use crate::chain::Transaction;

/// Sum of input values minus sum of output values. Coinbase transactions
/// spend nothing and report a fee of zero.
#[must_use]
pub fn fee(tx: &Transaction<'_>) -> i64 {
    if tx.is_coinbase() {
        return 0;
    }
    let total_in: i64 = tx.inputs.iter().map(|i| i.value).sum();
    let total_out: i64 = tx.outputs.iter().map(|o| o.value).sum();
    total_in - total_out
}

#[must_use]
pub fn max_output_value(tx: &Transaction<'_>) -> i64 {
    tx.outputs.iter().map(|o| o.value).max().unwrap_or(0).max(0)
}

#[must_use]
pub fn max_input_value(tx: &Transaction<'_>) -> i64 {
    tx.inputs.iter().map(|i| i.value).max().unwrap_or(0).max(0)
}

#[must_use]
pub fn has_nonzero_locktime(tx: &Transaction<'_>) -> u32 {
    u32::from(tx.locktime > 0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chain::{ChainAccess, MemoryChain};
    use crate::test_util::*;
    use crate::types::{Output, OutputPointer};

    #[test]
    fn fee_is_inputs_minus_outputs() {
        let mut chain = MemoryChain::new();
        chain.push_block().unwrap();
        chain
            .push_tx(0, vec![], vec![Output::new(5_000, pubkey_address(0))])
            .unwrap();
        let input = chain.spend(OutputPointer::new(0, 0)).unwrap();
        chain
            .push_tx(
                600_000,
                vec![input],
                vec![
                    Output::new(3_000, pubkey_address(1)),
                    Output::new(1_500, pubkey_address(2)),
                ],
            )
            .unwrap();

        let coinbase = chain.transaction(0).unwrap();
        let spend = chain.transaction(1).unwrap();
        assert_eq!(fee(&coinbase), 0);
        assert_eq!(fee(&spend), 500);
        assert_eq!(max_output_value(&spend), 3_000);
        assert_eq!(max_input_value(&spend), 5_000);
        assert_eq!(max_input_value(&coinbase), 0);
        assert_eq!(has_nonzero_locktime(&coinbase), 0);
        assert_eq!(has_nonzero_locktime(&spend), 1);
    }
}

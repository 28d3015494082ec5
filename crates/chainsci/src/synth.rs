//! Synthetic dataset generation.
//!
//! Produces a chain whose shape exercises every script type: pubkey
//! payments, P2SH outputs that get revealed when first spent, bare
//! multisig, and `OP_RETURN` data carriers.

use bitcoin::hashes::Hash;
use bitcoin::{PubkeyHash, ScriptHash};
use chainsci_core::scripts::ScriptHashData;
use chainsci_core::types::Output;
use chainsci_core::{Address, CoreError, Dataset, OutputPointer, ScriptType};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

const COINBASE_VALUE: i64 = 50 * 100_000_000;

pub fn generate(blocks: u32, seed: u64) -> Result<Dataset, CoreError> {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut dataset = Dataset::default();
    let mut unspent: Vec<(OutputPointer, Address)> = Vec::new();

    for _ in 0..blocks {
        dataset.chain.push_block()?;

        let payee = pay_to(&mut rng, &mut dataset)?;
        let coinbase = dataset
            .chain
            .push_tx(0, vec![], vec![Output::new(COINBASE_VALUE, payee)])?;
        unspent.push((OutputPointer::new(coinbase, 0), payee));

        for _ in 0..rng.gen_range(0..8) {
            if unspent.is_empty() {
                break;
            }
            let pick = rng.gen_range(0..unspent.len());
            let (spent, spent_address) = unspent.swap_remove(pick);
            let input = dataset.chain.spend(spent)?;
            let tx_num = dataset.chain.next_tx_num();

            // Spending a P2SH for the first time reveals its redeem script.
            if spent_address.script_type == ScriptType::ScriptHash
                && !dataset
                    .scripts
                    .get::<ScriptHashData>(spent_address.index)?
                    .has_been_revealed()
            {
                let redeem = redeem_script(&mut rng, &mut dataset)?;
                dataset.scripts.reveal(spent_address, tx_num, redeem)?;
            }

            let fee = rng.gen_range(0..10_000).min(input.value);
            let mut remaining = input.value - fee;
            let mut outputs = Vec::new();
            if rng.gen_bool(0.05) {
                let data: [u8; 8] = rng.r#gen();
                outputs.push(Output::new(0, dataset.scripts.add_null_data(data.to_vec())?));
            }
            let payees = rng.gen_range(1..=2);
            let mut paid = Vec::with_capacity(payees);
            for i in 0..payees {
                let value = if i + 1 == payees {
                    remaining
                } else {
                    rng.gen_range(0..=remaining)
                };
                remaining -= value;
                let address = pay_to(&mut rng, &mut dataset)?;
                paid.push((outputs.len() as u16, address));
                outputs.push(Output::new(value, address));
            }

            let locktime = if rng.gen_bool(0.1) {
                rng.gen_range(1..500_000)
            } else {
                0
            };
            let tx = dataset.chain.push_tx(locktime, vec![input], outputs)?;
            unspent.extend(
                paid.into_iter()
                    .map(|(n, address)| (OutputPointer::new(tx, n), address)),
            );
        }
    }

    tracing::info!(
        blocks,
        seed,
        addresses = dataset.scripts.address_count(),
        "generated synthetic dataset"
    );
    Ok(dataset)
}

/// Pick a destination: mostly fresh or reused pubkeys, sometimes P2SH or
/// bare multisig.
fn pay_to(rng: &mut StdRng, dataset: &mut Dataset) -> Result<Address, CoreError> {
    let roll = rng.gen_range(0..100);
    match roll {
        0..=59 => new_pubkey(rng, dataset),
        60..=69 => {
            let known = dataset.scripts.size(ScriptType::Pubkey);
            if known == 0 {
                new_pubkey(rng, dataset)
            } else {
                Ok(Address::new(rng.gen_range(0..known), ScriptType::Pubkey))
            }
        }
        70..=91 => dataset
            .scripts
            .add_script_hash(ScriptHash::from_byte_array(rng.r#gen())),
        _ => new_multisig(rng, dataset),
    }
}

fn redeem_script(rng: &mut StdRng, dataset: &mut Dataset) -> Result<Address, CoreError> {
    if rng.gen_bool(0.5) {
        new_multisig(rng, dataset)
    } else {
        new_pubkey(rng, dataset)
    }
}

fn new_pubkey(rng: &mut StdRng, dataset: &mut Dataset) -> Result<Address, CoreError> {
    dataset
        .scripts
        .add_pubkey(PubkeyHash::from_byte_array(rng.r#gen()), None)
}

fn new_multisig(rng: &mut StdRng, dataset: &mut Dataset) -> Result<Address, CoreError> {
    let total = rng.gen_range(2..=3);
    let members = (0..total)
        .map(|_| new_pubkey(rng, dataset))
        .collect::<Result<Vec<_>, _>>()?;
    let required = rng.gen_range(1..=total) as u8;
    dataset.scripts.add_multisig(required, members)
}

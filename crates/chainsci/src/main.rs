mod bench;
mod cli;
mod synth;

use std::path::Path;

use bitcoin::Network;
use clap::Parser;
use eyre::{eyre, WrapErr};

use chainsci_core::encoding::{address_from_string, address_to_string};
use chainsci_core::scripts::{ScriptAccess, ScriptHashData};
use chainsci_core::traverser::{index_chain_with, TraverserConfig};
use chainsci_core::{Address, AddressIndex, BlockRange, ChainAccess, Dataset, ScanConfig};

fn main() -> eyre::Result<()> {
    let args = cli::Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_file(true)
        .with_line_number(true)
        .with_level(true)
        .init();

    let scan = ScanConfig {
        threads: args.threads,
        min_blocks_per_partition: args.min_partition_blocks,
    };

    match args.command {
        cli::Command::Bench {
            data,
            with_random,
            max_block,
        } => {
            let dataset = load_dataset(&data)?;
            let end = max_block.unwrap_or_else(|| dataset.chain.block_count());
            let range = BlockRange::new(&dataset.chain, 0..end)
                .with_context(|| format!("block range 0..{end}"))?;
            bench::run(&range, &dataset.chain, &bench::BenchOptions { with_random, scan })
        }
        cli::Command::Index {
            data,
            out,
            resume,
            progress_interval,
        } => run_index(&data, &out, resume, progress_interval),
        cli::Command::Lookup {
            data,
            index,
            address,
            network,
        } => run_lookup(&data, &index, &address, network),
        cli::Command::Generate { out, blocks, seed } => {
            let seed = seed.unwrap_or_else(rand::random);
            let dataset = synth::generate(blocks, seed).context("generate dataset")?;
            dataset
                .save(&out)
                .with_context(|| format!("write dataset to {}", out.display()))?;
            println!(
                "Wrote {} blocks, {} transactions (seed {seed}) to {}",
                dataset.chain.block_count(),
                dataset.chain.tx_count(),
                out.display()
            );
            Ok(())
        }
    }
}

fn load_dataset(path: &Path) -> eyre::Result<Dataset> {
    let dataset =
        Dataset::load(path).with_context(|| format!("load dataset {}", path.display()))?;
    tracing::info!(
        path = %path.display(),
        blocks = dataset.chain.block_count(),
        transactions = dataset.chain.tx_count(),
        addresses = dataset.scripts.address_count(),
        "loaded dataset"
    );
    Ok(dataset)
}

fn run_index(data: &Path, out: &Path, resume: bool, progress_interval: u32) -> eyre::Result<()> {
    let dataset = load_dataset(data)?;

    let mut index = if resume && out.exists() {
        let index = AddressIndex::load(out)
            .with_context(|| format!("load address index {}", out.display()))?;
        tracing::info!(checkpoint = index.checkpoint(), "resuming address index");
        index
    } else {
        AddressIndex::new()
    };

    let hook = |address: Address, record: &ScriptHashData, _: &ScriptAccess| {
        tracing::debug!(
            %address,
            tx = record.tx_revealed,
            wrapped = ?record.wrapped,
            "p2sh redeem script revealed"
        );
    };
    let summary = index_chain_with(
        &dataset.chain,
        &dataset.scripts,
        &mut index,
        hook,
        TraverserConfig { progress_interval },
    )
    .context("index addresses")?;

    index
        .save(out)
        .with_context(|| format!("write address index to {}", out.display()))?;

    println!("Indexed {} transactions", summary.transactions);
    println!("  Addresses:     {}", index.count());
    println!("  Output links:  {}", summary.output_links);
    println!("  Input links:   {}", summary.input_links);
    println!("  P2SH reveals:  {}", summary.reveals);
    if summary.unknown_scripts > 0 {
        println!("  Unknown tags:  {}", summary.unknown_scripts);
    }
    println!("  Next tx:       {}", summary.next_tx);
    Ok(())
}

fn run_lookup(data: &Path, index: &Path, text: &str, network: Network) -> eyre::Result<()> {
    let dataset = load_dataset(data)?;
    let index = AddressIndex::load(index)
        .with_context(|| format!("load address index {}", index.display()))?;

    let address = address_from_string(text, &dataset.scripts, network)
        .ok_or_else(|| eyre!("`{text}` is not a known address on {network}"))?;
    let display = address_to_string(address, &dataset.scripts, network)?;

    let transactions = index.transactions(&address, &dataset.chain)?;
    println!("{display} ({address})");
    println!("{} transactions", transactions.len());
    for tx in transactions {
        let received: i64 = tx
            .outputs
            .iter()
            .filter(|o| o.address() == Some(address))
            .map(|o| o.value)
            .sum();
        let spent: i64 = tx
            .inputs
            .iter()
            .filter(|i| i.address() == Some(address))
            .map(|i| i.value)
            .sum();
        println!(
            "  tx {:>10}  block {:>8}  in {:>3}  out {:>3}  received {received:>16}  spent {spent:>16}",
            tx.tx_num,
            tx.block_height,
            tx.inputs.len(),
            tx.outputs.len(),
        );
    }
    Ok(())
}

use std::path::PathBuf;

use bitcoin::Network;
use clap::{Parser, Subcommand};

/// chainsci: address indexing and parallel block-range scans over an
/// ingested chain dataset.
#[derive(Parser)]
#[command(version, about)]
pub struct Cli {
    /// Worker threads for parallel scans (defaults to one per core).
    #[arg(long, global = true, env = "CHAINSCI_THREADS")]
    pub threads: Option<usize>,

    /// Minimum number of blocks handed to one scan partition.
    #[arg(long, global = true, default_value = "16")]
    pub min_partition_blocks: usize,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Time single-threaded against multithreaded map-reduce scans.
    Bench {
        /// Dataset JSON file.
        #[arg(env = "CHAINSCI_DATA")]
        data: PathBuf,

        /// Also time scans that visit transactions in random order.
        #[arg(long)]
        with_random: bool,

        /// Run the benchmark up to (excluding) this block.
        #[arg(short = 'm', long)]
        max_block: Option<u32>,
    },

    /// Build or extend the address index for a dataset.
    Index {
        /// Dataset JSON file.
        #[arg(env = "CHAINSCI_DATA")]
        data: PathBuf,

        /// Where to write the index.
        #[arg(long)]
        out: PathBuf,

        /// Continue from the checkpoint of an existing index at `--out`.
        #[arg(long)]
        resume: bool,

        /// Log progress every this many transactions.
        #[arg(long, default_value = "100000")]
        progress_interval: u32,
    },

    /// List the transactions touching an address.
    Lookup {
        /// Dataset JSON file.
        #[arg(env = "CHAINSCI_DATA")]
        data: PathBuf,

        /// Address index produced by `index`.
        #[arg(long)]
        index: PathBuf,

        /// Base58 address, or the `<type> #<index>` form.
        address: String,

        /// Network the address string belongs to.
        #[arg(long, default_value = "bitcoin")]
        network: Network,
    },

    /// Write a synthetic dataset, useful for benchmarking.
    Generate {
        /// Output dataset JSON file.
        #[arg(long)]
        out: PathBuf,

        /// Number of blocks to generate.
        #[arg(long, default_value = "1000")]
        blocks: u32,

        /// RNG seed; random when omitted.
        #[arg(long)]
        seed: Option<u64>,
    },
}

pub mod address;
pub mod address_index;
pub mod analysis;
pub mod chain;
pub mod dataset;
pub mod encoding;
pub mod error;
pub mod range;
pub mod scripts;
pub mod traverser;
pub mod types;

#[cfg(test)]
mod test_util;

pub use address::{try_visit, visit, Address};
pub use address_index::AddressIndex;
pub use chain::{Block, ChainAccess, MemoryChain, Transaction};
pub use dataset::Dataset;
pub use error::CoreError;
pub use range::{BlockRange, ScanConfig};
pub use traverser::{index_chain, AddressTraverser, IndexSummary, NoopHook, RevealHook};
pub use types::{BlockHeight, InputPointer, OutputPointer, ScriptType};

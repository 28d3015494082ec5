//! JSON datasets: an ingested chain together with its script registry.

use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::chain::MemoryChain;
use crate::error::CoreError;
use crate::scripts::ScriptAccess;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Dataset {
    pub chain: MemoryChain,
    pub scripts: ScriptAccess,
}

impl Dataset {
    pub fn load(path: &Path) -> Result<Self, CoreError> {
        let reader = BufReader::new(File::open(path)?);
        Ok(serde_json::from_reader(reader)?)
    }

    pub fn save(&self, path: &Path) -> Result<(), CoreError> {
        let mut writer = BufWriter::new(File::create(path)?);
        serde_json::to_writer(&mut writer, self)?;
        writer.flush()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chain::ChainAccess;
    use crate::test_util::*;
    use crate::types::Output;

    #[test]
    fn save_then_load_preserves_chain_and_scripts() {
        let mut dataset = Dataset::default();
        let pk = dataset.scripts.add_pubkey(pubkey_hash(3), None).unwrap();
        dataset.chain.push_block().unwrap();
        dataset
            .chain
            .push_tx(0, vec![], vec![Output::new(42, pk)])
            .unwrap();

        let path = std::env::temp_dir().join(format!("chainsci-dataset-{}.json", std::process::id()));
        dataset.save(&path).unwrap();
        let loaded = Dataset::load(&path).unwrap();
        std::fs::remove_file(&path).ok();

        assert_eq!(loaded.chain.tx_count(), 1);
        assert_eq!(loaded.chain.transaction(0).unwrap().outputs[0].address(), Some(pk));
        assert_eq!(loaded.scripts.find_pubkey_hash(&pubkey_hash(3)), Some(pk));
    }
}

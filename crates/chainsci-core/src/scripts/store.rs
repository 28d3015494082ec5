use serde::{Deserialize, Serialize};

use crate::error::{next_number, CoreError};

/// Dense, append-only storage for the records of one script type.
///
/// Records are addressed by their insertion position. Once pushed, a record
/// keeps its index for the lifetime of the store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ScriptStore<T> {
    records: Vec<T>,
}

impl<T> Default for ScriptStore<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> ScriptStore<T> {
    pub fn new() -> Self {
        Self {
            records: Vec::new(),
        }
    }

    pub fn get(&self, index: u32) -> Result<&T, CoreError> {
        self.records
            .get(index as usize)
            .ok_or_else(|| CoreError::out_of_range("script", index.into(), self.records.len() as u64))
    }

    pub(crate) fn get_mut(&mut self, index: u32) -> Result<&mut T, CoreError> {
        let len = self.records.len() as u64;
        self.records
            .get_mut(index as usize)
            .ok_or_else(|| CoreError::out_of_range("script", index.into(), len))
    }

    /// Append a record and return its index.
    pub fn push(&mut self, record: T) -> Result<u32, CoreError> {
        let index = next_number("script", self.records.len())?;
        self.records.push(record);
        Ok(index)
    }

    pub fn len(&self) -> u32 {
        self.records.len() as u32
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (u32, &T)> + '_ {
        self.records
            .iter()
            .enumerate()
            .map(|(idx, record)| (idx as u32, record))
    }
}

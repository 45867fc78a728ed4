//! In-memory metadata provider for unit tests.

use crate::metadata::{KeyRecord, MetadataProvider, ProviderError};
use bytes::Bytes;
use std::collections::{HashMap, HashSet};

#[derive(Debug, Default)]
pub struct MemoryProvider {
    keys: Vec<String>,
    records: HashMap<String, KeyRecord>,
    /// Keys whose metadata fetch reports `NotFound`
    pub vanished: HashSet<String>,
    /// Keys whose metadata fetch fails with a command error
    pub broken: HashSet<String>,
    /// Overrides the reported key count
    pub reported_count: Option<u64>,
    /// Scripted random draws; round-robin over `keys` once drained
    pub random_script: Vec<String>,
    next_random: usize,
    pub random_calls: u64,
    pub list_calls: u64,
    pub fetch_calls: u64,
}

impl MemoryProvider {
    /// Provider whose keys are all 1-byte persistent strings.
    pub fn with_keys<I, S>(keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            keys: keys.into_iter().map(Into::into).collect(),
            ..Self::default()
        }
    }

    /// Provider serving exactly these records.
    pub fn with_records(records: Vec<KeyRecord>) -> Self {
        Self {
            keys: records.iter().map(|r| r.key.clone()).collect(),
            records: records.into_iter().map(|r| (r.key.clone(), r)).collect(),
            ..Self::default()
        }
    }
}

impl MetadataProvider for MemoryProvider {
    async fn total_key_count(&mut self) -> Result<u64, ProviderError> {
        Ok(self.reported_count.unwrap_or(self.keys.len() as u64))
    }

    async fn random_key(&mut self) -> Result<Option<Bytes>, ProviderError> {
        self.random_calls += 1;
        if !self.random_script.is_empty() {
            return Ok(Some(Bytes::from(self.random_script.remove(0))));
        }
        if self.keys.is_empty() {
            return Ok(None);
        }
        let key = self.keys[self.next_random % self.keys.len()].clone();
        self.next_random += 1;
        Ok(Some(Bytes::from(key)))
    }

    async fn list_all_keys(&mut self) -> Result<Vec<Bytes>, ProviderError> {
        self.list_calls += 1;
        Ok(self.keys.iter().cloned().map(Bytes::from).collect())
    }

    async fn fetch_metadata(&mut self, key: &[u8]) -> Result<KeyRecord, ProviderError> {
        self.fetch_calls += 1;
        let key = String::from_utf8_lossy(key);
        let key = key.as_ref();
        if self.vanished.contains(key) {
            return Err(ProviderError::NotFound(key.to_string()));
        }
        if self.broken.contains(key) {
            return Err(ProviderError::Command("ERR DEBUG command not allowed".into()));
        }
        Ok(self
            .records
            .get(key)
            .cloned()
            .unwrap_or_else(|| KeyRecord::new(key, "string").with_length(1)))
    }
}

//! Per-run identifier translation table

use std::collections::HashMap;

/// Maps a portable key (original id, slug) to a service-assigned id.
///
/// One map is built per phase of a run and dropped with it; nothing here is
/// shared between runs.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct IdMap {
    entries: HashMap<String, String>,
}

impl IdMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record `key -> id`. Empty keys are ignored.
    pub fn insert(&mut self, key: impl Into<String>, id: impl Into<String>) {
        let key = key.into();
        if !key.is_empty() {
            self.entries.insert(key, id.into());
        }
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries.get(key).map(String::as_str)
    }

    /// Copy every entry of `other` into this map, overwriting on conflict
    pub fn extend(&mut self, other: &IdMap) {
        for (key, id) in &other.entries {
            self.entries.insert(key.clone(), id.clone());
        }
    }
}

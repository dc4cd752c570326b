//! In-memory associative store the interpreter executes against.

use std::collections::HashMap;

/// Key → envelope map. Keys are unique; order is not observable.
///
/// Only STORE and DELETE mutate it. Clearing is done by replacing the whole
/// store, never by an instruction.
#[derive(Debug, Default)]
pub struct Store {
    entries: HashMap<String, String>,
}

impl Store {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries.get(key).map(String::as_str)
    }

    /// Insert or overwrite. Returns true when an existing entry was replaced.
    pub fn upsert(&mut self, key: String, value: String) -> bool {
        self.entries.insert(key, value).is_some()
    }

    /// Remove an entry. Absence is not an error.
    pub fn remove(&mut self, key: &str) -> bool {
        self.entries.remove(key).is_some()
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn upsert_overwrites() {
        let mut store = Store::new();
        assert!(!store.upsert("k".into(), "v1".into()));
        assert!(store.upsert("k".into(), "v2".into()));
        assert_eq!(store.get("k"), Some("v2"));
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn remove_missing_is_noop() {
        let mut store = Store::new();
        assert!(!store.remove("nope"));
        store.upsert("k".into(), "v".into());
        assert!(store.remove("k"));
        assert!(store.is_empty());
    }
}

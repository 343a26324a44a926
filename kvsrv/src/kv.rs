use super::KvService;

use labrpc::anyhow::Result;
use log::trace;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// A flat string map behind one lock. Clones share the same map, so a
/// server rebuilt around a clone keeps the data.
#[derive(Debug, Clone, Default)]
pub struct KvStore {
    map: Arc<Mutex<HashMap<String, String>>>,
}

impl KvStore {
    /// An empty store.
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, String>> {
        self.map.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Current value of `key`.
    pub fn get(&self, key: &str) -> Option<String> {
        self.lock().get(key).cloned()
    }

    /// Set `key` to `value`, replacing any previous value.
    pub fn put(&self, key: String, value: String) {
        self.lock().insert(key, value);
    }

    /// Append `value` to `key` and return what was there before (empty if
    /// the key was absent).
    pub fn append(&self, key: String, value: String) -> String {
        let mut map = self.lock();
        let entry = map.entry(key).or_default();
        let old = entry.clone();
        entry.push_str(&value);
        old
    }

    /// Number of keys.
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    /// Whether no key was ever written.
    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }
}

#[labrpc::async_trait]
impl KvService for KvStore {
    async fn get(&mut self, key: String) -> Result<Option<String>> {
        trace!("get {}", key);
        Ok(KvStore::get(self, &key))
    }
    async fn put(&mut self, key: String, value: String) -> Result<()> {
        trace!("put {}", key);
        KvStore::put(self, key, value);
        Ok(())
    }
    async fn append(&mut self, key: String, value: String) -> Result<String> {
        trace!("append {}", key);
        Ok(KvStore::append(self, key, value))
    }
}

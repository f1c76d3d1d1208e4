//! In-memory object store for tests.

use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, RwLock};

use crate::ports::{ObjectStore, StorageError};

#[derive(Debug, Default)]
struct StoreState {
    objects: HashMap<String, Vec<u8>>,
    failing_deletes: HashSet<String>,
}

/// Object store kept in a map.
///
/// Unlike the filesystem store, deleting an absent key reports
/// [`StorageError::NotFound`], the weaker contract callers must tolerate.
#[derive(Debug, Clone, Default)]
pub struct InMemoryObjectStore {
    state: Arc<RwLock<StoreState>>,
    fail_puts: Arc<AtomicBool>,
    delete_calls: Arc<AtomicUsize>,
}

impl InMemoryObjectStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Put an object directly, bypassing the port.
    pub fn insert(&self, key: &str, content: &[u8]) {
        self.state
            .write()
            .expect("object store lock poisoned")
            .objects
            .insert(key.to_string(), content.to_vec());
    }

    pub fn contains(&self, key: &str) -> bool {
        self.state
            .read()
            .expect("object store lock poisoned")
            .objects
            .contains_key(key)
    }

    pub fn get(&self, key: &str) -> Option<Vec<u8>> {
        self.state
            .read()
            .expect("object store lock poisoned")
            .objects
            .get(key)
            .cloned()
    }

    pub fn len(&self) -> usize {
        self.state.read().expect("object store lock poisoned").objects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn fail_puts(&self, fail: bool) {
        self.fail_puts.store(fail, Ordering::SeqCst);
    }

    /// Make deletes of `key` fail with an IO error.
    pub fn fail_delete_of(&self, key: &str) {
        self.state
            .write()
            .expect("object store lock poisoned")
            .failing_deletes
            .insert(key.to_string());
    }

    pub fn heal(&self) {
        self.fail_puts(false);
        self.state
            .write()
            .expect("object store lock poisoned")
            .failing_deletes
            .clear();
    }

    /// Calls to `delete`, successful or not.
    pub fn delete_calls(&self) -> usize {
        self.delete_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ObjectStore for InMemoryObjectStore {
    async fn put(&self, key: &str, content: &[u8], _content_type: &str) -> Result<(), StorageError> {
        if self.fail_puts.load(Ordering::SeqCst) {
            return Err(StorageError::io(format!("Injected put failure for {}", key)));
        }
        self.insert(key, content);
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<(), StorageError> {
        self.delete_calls.fetch_add(1, Ordering::SeqCst);
        let mut state = self.state.write().expect("object store lock poisoned");

        if state.failing_deletes.contains(key) {
            return Err(StorageError::io(format!("Injected delete failure for {}", key)));
        }
        match state.objects.remove(key) {
            Some(_) => Ok(()),
            None => Err(StorageError::not_found(key)),
        }
    }
}

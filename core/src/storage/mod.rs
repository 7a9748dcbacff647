//! Persistent key-value storage consumed by fabric-scoped cluster data.
//!
//! Values are addressed by a context path plus a key. Backends decide how and
//! when values reach durable media; callers ask for that explicitly with
//! [`Storage::persist`].

use std::{
    collections::HashMap,
    sync::{Arc, RwLock},
};

use serde::{de::DeserializeOwned, Serialize};
use serde_json::Value;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("storage lock poisoned")]
    Poisoned,
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error("invalid storage context '{0}'")]
    InvalidContext(String),
}

pub trait Storage {
    fn get(&self, contexts: &[String], key: &str) -> Result<Option<Value>, StorageError>;
    fn set(&mut self, contexts: &[String], key: &str, value: Value) -> Result<(), StorageError>;
    /// Flush pending writes.
    fn persist(&mut self) -> Result<(), StorageError>;
}

pub type SharedStorage = Arc<RwLock<dyn Storage + Send + Sync>>;

/// A storage handle bound to a context path.
#[derive(Clone)]
pub struct StorageContext {
    storage: SharedStorage,
    contexts: Vec<String>,
}

impl StorageContext {
    pub fn new(storage: SharedStorage) -> Self {
        Self {
            storage,
            contexts: Vec::new(),
        }
    }

    pub fn contexts(&self) -> &[String] {
        &self.contexts
    }

    pub fn get<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>, StorageError> {
        let storage = self.storage.read().map_err(|_| StorageError::Poisoned)?;
        match storage.get(&self.contexts, key)? {
            Some(value) => Ok(Some(serde_json::from_value(value)?)),
            None => Ok(None),
        }
    }

    pub fn has(&self, key: &str) -> Result<bool, StorageError> {
        let storage = self.storage.read().map_err(|_| StorageError::Poisoned)?;
        Ok(storage.get(&self.contexts, key)?.is_some())
    }

    pub fn set<T: Serialize + ?Sized>(&self, key: &str, value: &T) -> Result<(), StorageError> {
        let value = serde_json::to_value(value)?;
        let mut storage = self.storage.write().map_err(|_| StorageError::Poisoned)?;
        storage.set(&self.contexts, key, value)
    }

    pub fn persist(&self) -> Result<(), StorageError> {
        let mut storage = self.storage.write().map_err(|_| StorageError::Poisoned)?;
        storage.persist()
    }

    /// A child context. Names are path segments, so they may not be empty or
    /// contain the `.` separator.
    pub fn create_context(&self, context: &str) -> Result<Self, StorageError> {
        if context.is_empty() || context.contains('.') {
            return Err(StorageError::InvalidContext(context.to_owned()));
        }
        let mut contexts = self.contexts.clone();
        contexts.push(context.to_owned());
        Ok(Self {
            storage: self.storage.clone(),
            contexts,
        })
    }
}

/// Keeps values in memory. `persist` copies the working set into the
/// persisted snapshot, which is what survives a restart.
#[derive(Debug, Default)]
pub struct MemoryStorage {
    values: HashMap<String, Value>,
    persisted: HashMap<String, Value>,
    persist_count: usize,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn shared() -> Arc<RwLock<Self>> {
        Arc::new(RwLock::new(Self::new()))
    }

    fn full_key(contexts: &[String], key: &str) -> String {
        let mut full_key = contexts.join(".");
        if !full_key.is_empty() {
            full_key.push('.');
        }
        full_key.push_str(key);
        full_key
    }

    pub fn persist_count(&self) -> usize {
        self.persist_count
    }

    pub fn persisted(&self, contexts: &[&str], key: &str) -> Option<&Value> {
        let contexts: Vec<String> = contexts.iter().map(|c| c.to_string()).collect();
        self.persisted.get(&Self::full_key(&contexts, key))
    }
}

impl Storage for MemoryStorage {
    fn get(&self, contexts: &[String], key: &str) -> Result<Option<Value>, StorageError> {
        Ok(self.values.get(&Self::full_key(contexts, key)).cloned())
    }

    fn set(&mut self, contexts: &[String], key: &str, value: Value) -> Result<(), StorageError> {
        self.values.insert(Self::full_key(contexts, key), value);
        Ok(())
    }

    fn persist(&mut self) -> Result<(), StorageError> {
        self.persisted = self.values.clone();
        self.persist_count += 1;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_context_scoping() {
        let backend = MemoryStorage::shared();
        let root = StorageContext::new(backend.clone());
        let a = root.create_context("fabric-1").unwrap();
        let b = root.create_context("fabric-2").unwrap();

        a.set("label", "home").unwrap();
        assert_eq!(a.get::<String>("label").unwrap().as_deref(), Some("home"));
        assert_eq!(b.get::<String>("label").unwrap(), None);
        assert!(a.has("label").unwrap());
    }

    #[test]
    fn test_invalid_context_names() {
        let root = StorageContext::new(MemoryStorage::shared());
        assert!(matches!(
            root.create_context(""),
            Err(StorageError::InvalidContext(_))
        ));
        assert!(matches!(
            root.create_context("a.b"),
            Err(StorageError::InvalidContext(_))
        ));
    }

    #[test]
    fn test_persist_snapshots_values() {
        let backend = MemoryStorage::shared();
        let context = StorageContext::new(backend.clone())
            .create_context("device")
            .unwrap();
        context.set("passcode", &20202021u32).unwrap();
        assert!(backend.read().unwrap().persisted(&["device"], "passcode").is_none());

        context.persist().unwrap();
        let backend = backend.read().unwrap();
        assert_eq!(backend.persist_count(), 1);
        assert_eq!(
            backend.persisted(&["device"], "passcode"),
            Some(&Value::from(20202021u32))
        );
    }
}

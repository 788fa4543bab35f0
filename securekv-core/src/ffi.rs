//! UniFFI entry points for Swift and Kotlin hosts.
//!
//! Foreign callers may pass null keys and values, so every method takes
//! optional arguments and rejects absent ones with `InvalidKey` /
//! `InvalidValue` before the store is touched. Results are flattened into
//! the thrown-error convention of the generated bindings.

use std::sync::Arc;

use crate::contract::{require_key, require_value, Storage};
use crate::error::{Result, StorageError};
use crate::factory::{new_store, ResourceHandle};
use crate::platform::{AttributeBag, SecureElement};
use crate::result::{Payload, StorageResult};
use crate::types::StoreKind;

/// Namespaced secure key-value store.
///
/// # Example (Kotlin)
///
/// ```kotlin
/// val store = SecureKeyValueStore(StoreKind.ATTRIBUTE_BAG, null, accountBag, shared = false)
/// store.writeOrUpdateString("refresh_token", token)
/// val keys = store.getAllKeys()
/// ```
#[derive(uniffi::Object)]
pub struct SecureKeyValueStore {
    inner: Box<dyn Storage>,
}

#[uniffi::export]
impl SecureKeyValueStore {
    /// Creates a store of `kind` over the matching resource.
    ///
    /// # Errors
    ///
    /// - `InvalidInput` if the resource for `kind` is missing.
    #[uniffi::constructor]
    pub fn new(
        kind: StoreKind,
        secure_element: Option<Arc<dyn SecureElement>>,
        attribute_bag: Option<Arc<dyn AttributeBag>>,
        shared: bool,
    ) -> Result<Arc<Self>> {
        let handle = match kind {
            StoreKind::SecureElement => secure_element.map(ResourceHandle::SecureElement),
            StoreKind::AttributeBag => attribute_bag.map(ResourceHandle::AttributeBag),
        };
        let inner = new_store(kind, handle, shared)?;
        Ok(Arc::new(Self { inner }))
    }

    /// Creates an entry and returns its key.
    ///
    /// # Errors
    ///
    /// Fails if the arguments are invalid or the entry already exists.
    pub fn write(&self, key: Option<String>, value: Option<Vec<u8>>) -> Result<String> {
        let key = require_key(key.as_deref())?;
        let value = require_value(value.as_deref())?;
        into_key(self.inner.write(key, value)?)
    }

    /// Overwrites an entry and returns its key.
    ///
    /// # Errors
    ///
    /// Fails if the arguments are invalid or the entry does not exist.
    pub fn update(&self, key: Option<String>, value: Option<Vec<u8>>) -> Result<String> {
        let key = require_key(key.as_deref())?;
        let value = require_value(value.as_deref())?;
        into_key(self.inner.update(key, value)?)
    }

    /// Creates or overwrites an entry and returns its key.
    ///
    /// # Errors
    ///
    /// Fails if the arguments are invalid or the backend fails.
    pub fn write_or_update(&self, key: Option<String>, value: Option<Vec<u8>>) -> Result<String> {
        let key = require_key(key.as_deref())?;
        let value = require_value(value.as_deref())?;
        into_key(self.inner.write_or_update(key, value)?)
    }

    /// Creates an entry with a UTF-8 value.
    ///
    /// # Errors
    ///
    /// Fails if the arguments are invalid or the entry already exists.
    pub fn write_string(&self, key: Option<String>, value: Option<String>) -> Result<String> {
        let key = require_key(key.as_deref())?;
        let value = value.ok_or(StorageError::InvalidValue)?;
        into_key(self.inner.write_string(key, &value)?)
    }

    /// Overwrites an entry with a UTF-8 value.
    ///
    /// # Errors
    ///
    /// Fails if the arguments are invalid or the entry does not exist.
    pub fn update_string(&self, key: Option<String>, value: Option<String>) -> Result<String> {
        let key = require_key(key.as_deref())?;
        let value = value.ok_or(StorageError::InvalidValue)?;
        into_key(self.inner.update_string(key, &value)?)
    }

    /// Creates or overwrites an entry with a UTF-8 value.
    ///
    /// # Errors
    ///
    /// Fails if the arguments are invalid or the backend fails.
    pub fn write_or_update_string(
        &self,
        key: Option<String>,
        value: Option<String>,
    ) -> Result<String> {
        let key = require_key(key.as_deref())?;
        let value = value.ok_or(StorageError::InvalidValue)?;
        into_key(self.inner.write_or_update_string(key, &value)?)
    }

    /// Reads an entry.
    ///
    /// # Errors
    ///
    /// Fails if the key is invalid or the entry does not exist.
    pub fn read(&self, key: Option<String>) -> Result<Vec<u8>> {
        let key = require_key(key.as_deref())?;
        match self.inner.read(key)?.into_result()? {
            Payload::Value(value) => Ok(value),
            other => Err(unexpected(&other)),
        }
    }

    /// Reads an entry as UTF-8 text.
    ///
    /// # Errors
    ///
    /// Fails if the key is invalid, the entry does not exist, or the value
    /// cannot be decoded under the store's policy.
    pub fn read_string(&self, key: Option<String>) -> Result<String> {
        let key = require_key(key.as_deref())?;
        match self.inner.read_string(key)?.into_result()? {
            Payload::Text(text) => Ok(text),
            other => Err(unexpected(&other)),
        }
    }

    /// Removes an entry and returns its key.
    ///
    /// # Errors
    ///
    /// Fails if the key is invalid or the entry does not exist.
    pub fn delete(&self, key: Option<String>) -> Result<String> {
        let key = require_key(key.as_deref())?;
        into_key(self.inner.delete(key)?)
    }

    /// Removes every entry in the namespace and returns how many were removed.
    ///
    /// # Errors
    ///
    /// Fails with a partial-failure summary if any delete failed.
    pub fn delete_all(&self) -> Result<u32> {
        match self.inner.delete_all().into_result()? {
            Payload::Count(count) => Ok(count),
            other => Err(unexpected(&other)),
        }
    }

    /// Lists the keys in the namespace.
    ///
    /// # Errors
    ///
    /// Fails if the backend cannot be enumerated.
    pub fn get_all_keys(&self) -> Result<Vec<String>> {
        match self.inner.get_all_keys().into_result()? {
            Payload::Keys(keys) => Ok(keys),
            other => Err(unexpected(&other)),
        }
    }
}

fn into_key(result: StorageResult) -> Result<String> {
    match result.into_result()? {
        Payload::Key(key) => Ok(key),
        other => Err(unexpected(&other)),
    }
}

fn unexpected(payload: &Payload) -> StorageError {
    StorageError::Unknown(format!("unexpected payload: {payload:?}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::platform::MemoryAttributeBag;

    #[test]
    fn test_null_arguments_are_rejected() {
        let bag: Arc<dyn AttributeBag> = Arc::new(MemoryAttributeBag::new());
        let store =
            SecureKeyValueStore::new(StoreKind::AttributeBag, None, Some(bag), true).unwrap();

        assert_eq!(store.write(None, Some(vec![1])), Err(StorageError::InvalidKey));
        assert_eq!(store.write(Some("k".into()), None), Err(StorageError::InvalidValue));
        assert_eq!(store.write(Some("k".into()), Some(vec![1])), Ok("k".to_string()));
        assert_eq!(store.read(Some("k".into())), Ok(vec![1]));
        assert_eq!(store.get_all_keys(), Ok(vec!["k".to_string()]));
        assert_eq!(store.delete_all(), Ok(1));
    }

    #[test]
    fn test_string_methods() {
        let bag: Arc<dyn AttributeBag> = Arc::new(MemoryAttributeBag::new());
        let store =
            SecureKeyValueStore::new(StoreKind::AttributeBag, None, Some(bag), false).unwrap();

        assert_eq!(
            store.update_string(Some("k".into()), Some("a".into())),
            Err(StorageError::not_found("k"))
        );
        assert_eq!(store.write_string(Some("k".into()), Some("a".into())), Ok("k".to_string()));
        assert_eq!(
            store.write_string(Some("k".into()), Some("b".into())),
            Err(StorageError::already_exists("k"))
        );
        assert_eq!(store.update_string(Some("k".into()), Some("c".into())), Ok("k".to_string()));
        assert_eq!(store.read_string(Some("k".into())), Ok("c".to_string()));
        assert_eq!(store.write_string(Some("k".into()), None), Err(StorageError::InvalidValue));
        assert_eq!(store.update_string(None, Some("x".into())), Err(StorageError::InvalidKey));
    }

    #[test]
    fn test_missing_resource_is_invalid_input() {
        let err = SecureKeyValueStore::new(StoreKind::SecureElement, None, None, true)
            .err()
            .unwrap();
        assert!(matches!(err, StorageError::InvalidInput(_)));
    }
}

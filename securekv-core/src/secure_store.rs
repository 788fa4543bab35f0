//! Store backed by a capacity-limited secure element.

use std::sync::Arc;

use crate::config::TextDecoding;
use crate::contract::{check_key_size, check_value_size, Precondition, Storage};
use crate::error::{Result, StorageError};
use crate::platform::{ElementResponse, ElementState, SecureElement};
use crate::result::{Payload, StorageResult};
use crate::types::{Namespace, Operation, StoreKind};

/// Key-value store over a [`SecureElement`].
///
/// Every call first checks that the element is unlocked and fails with
/// [`StorageError::StoreLocked`] otherwise, without touching any entry.
/// Listing scans the whole element and keeps the keys under this store's
/// namespace prefix.
pub struct SecureBoundedStore {
    element: Arc<dyn SecureElement>,
    namespace: Namespace,
    text_decoding: TextDecoding,
}

impl SecureBoundedStore {
    /// Ceiling on the namespaced key, in bytes. Covers the prefix.
    pub const MAX_KEY_LEN: usize = 256;

    /// Ceiling on a value, in bytes.
    pub const MAX_VALUE_LEN: usize = 32 * 1024;

    /// Creates a store over `element` in `namespace`.
    #[must_use]
    pub fn new(element: Arc<dyn SecureElement>, namespace: Namespace) -> Self {
        Self {
            element,
            namespace,
            text_decoding: TextDecoding::default(),
        }
    }

    /// Overrides the decode policy of string reads.
    #[must_use]
    pub fn with_text_decoding(mut self, text_decoding: TextDecoding) -> Self {
        self.text_decoding = text_decoding;
        self
    }

    fn qualify(&self, key: &str) -> Result<String> {
        let namespaced = self.namespace.qualify(key);
        check_key_size(StoreKind::SecureElement, &namespaced, Self::MAX_KEY_LEN)?;
        Ok(namespaced)
    }

    fn ensure_unlocked(&self) -> Result<()> {
        match self.element.state() {
            ElementState::Unlocked => Ok(()),
            state => {
                log::debug!("secure element not ready: {state:?}");
                Err(StorageError::StoreLocked)
            }
        }
    }

    /// Explains a failed element call from its last response code.
    fn failure_cause(&self, key: &str) -> StorageError {
        let response = self.element.last_response();
        let error = match response {
            ElementResponse::Locked
            | ElementResponse::Uninitialized
            | ElementResponse::WrongPassword => StorageError::StoreLocked,
            ElementResponse::KeyNotFound => StorageError::not_found(key),
            ElementResponse::SystemError
            | ElementResponse::ProtocolError
            | ElementResponse::PermissionDenied
            | ElementResponse::ValueCorrupted
            | ElementResponse::UndefinedAction => {
                StorageError::operation_failed(format!("secure element: {response:?}"))
            }
            ElementResponse::NoError | ElementResponse::Unreported => {
                if self.element.state() == ElementState::Unlocked {
                    StorageError::Unknown("secure element rejected the call".to_string())
                } else {
                    StorageError::StoreLocked
                }
            }
        };
        log::warn!("secure element call for {key:?} failed ({response:?}): {error}");
        error
    }

    /// Checks whether `namespaced` holds a live entry.
    ///
    /// A `false` from `contains` only means absence when the element reports
    /// no failure alongside it.
    fn entry_exists(&self, key: &str, namespaced: &str) -> Result<bool> {
        if self.element.contains(namespaced.to_owned()) {
            return Ok(true);
        }
        match self.element.last_response() {
            ElementResponse::NoError | ElementResponse::KeyNotFound => Ok(false),
            _ => Err(self.failure_cause(key)),
        }
    }

    fn put_entry(
        &self,
        key: &str,
        namespaced: String,
        value: &[u8],
        precondition: Precondition,
    ) -> Result<Payload> {
        self.ensure_unlocked()?;
        let exists = self.entry_exists(key, &namespaced)?;
        precondition.check(key, exists)?;
        if !self.element.put(namespaced, value.to_vec()) {
            return Err(self.failure_cause(key));
        }
        Ok(Payload::Key(key.to_owned()))
    }

    fn mutate(&self, key: &str, value: &[u8], precondition: Precondition) -> Result<StorageResult> {
        let namespaced = self.qualify(key)?;
        check_value_size(StoreKind::SecureElement, value, Self::MAX_VALUE_LEN)?;
        Ok(StorageResult::from_outcome(
            precondition.operation(),
            self.put_entry(key, namespaced, value, precondition),
        ))
    }

    fn read_entry(&self, key: &str, namespaced: String) -> Result<Payload> {
        self.ensure_unlocked()?;
        match self.element.get(namespaced) {
            Some(value) => Ok(Payload::Value(value)),
            None => match self.element.last_response() {
                ElementResponse::NoError | ElementResponse::KeyNotFound => {
                    Err(StorageError::not_found(key))
                }
                _ => Err(self.failure_cause(key)),
            },
        }
    }

    fn delete_entry(&self, key: &str, namespaced: String) -> Result<Payload> {
        self.ensure_unlocked()?;
        if !self.entry_exists(key, &namespaced)? {
            return Err(StorageError::not_found(key));
        }
        if !self.element.delete(namespaced) {
            return Err(self.failure_cause(key));
        }
        Ok(Payload::Key(key.to_owned()))
    }

    fn list_keys(&self) -> Result<Payload> {
        self.ensure_unlocked()?;
        let Some(all) = self.element.list() else {
            return Err(self.failure_cause(self.namespace.prefix()));
        };
        let keys = all
            .iter()
            .filter_map(|namespaced| self.namespace.strip(namespaced))
            .map(str::to_owned)
            .collect();
        Ok(Payload::Keys(keys))
    }
}

impl Storage for SecureBoundedStore {
    fn kind(&self) -> StoreKind {
        StoreKind::SecureElement
    }

    fn namespace(&self) -> Namespace {
        self.namespace
    }

    fn text_decoding(&self) -> TextDecoding {
        self.text_decoding
    }

    fn write(&self, key: &str, value: &[u8]) -> Result<StorageResult> {
        self.mutate(key, value, Precondition::Absent)
    }

    fn update(&self, key: &str, value: &[u8]) -> Result<StorageResult> {
        self.mutate(key, value, Precondition::Present)
    }

    fn write_or_update(&self, key: &str, value: &[u8]) -> Result<StorageResult> {
        self.mutate(key, value, Precondition::Any)
    }

    fn read(&self, key: &str) -> Result<StorageResult> {
        let namespaced = self.qualify(key)?;
        Ok(StorageResult::from_outcome(
            Operation::Read,
            self.read_entry(key, namespaced),
        ))
    }

    fn delete(&self, key: &str) -> Result<StorageResult> {
        let namespaced = self.qualify(key)?;
        Ok(StorageResult::from_outcome(
            Operation::Delete,
            self.delete_entry(key, namespaced),
        ))
    }

    fn get_all_keys(&self) -> StorageResult {
        StorageResult::from_outcome(Operation::GetAllKeys, self.list_keys())
    }
}

//! In-memory implementations of the platform resources.
//!
//! These implementations are NOT secure for production use. They back unit
//! and integration tests, and count every data call so tests can assert that
//! a rejected operation never reached the resource.

use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};

use crate::error::{Result, StorageError};

use super::{AttributeBag, ElementResponse, ElementState, SecureElement};

fn guard<T>(lock: &Mutex<T>) -> MutexGuard<'_, T> {
    lock.lock().unwrap_or_else(PoisonError::into_inner)
}

// =============================================================================
// Memory Secure Element
// =============================================================================

/// In-memory secure element.
///
/// Starts unlocked and empty. Data calls made while the element is not
/// unlocked fail the way a platform keystore does: a `false`/`None` return
/// plus a `Locked` or `Uninitialized` response code.
pub struct MemorySecureElement {
    entries: Mutex<BTreeMap<String, Vec<u8>>>,
    state: Mutex<ElementState>,
    last_response: Mutex<ElementResponse>,
    write_failure: Mutex<Option<ElementResponse>>,
    io_calls: AtomicUsize,
}

impl MemorySecureElement {
    /// Creates an unlocked, empty element.
    #[must_use]
    pub fn new() -> Self {
        Self {
            entries: Mutex::new(BTreeMap::new()),
            state: Mutex::new(ElementState::Unlocked),
            last_response: Mutex::new(ElementResponse::NoError),
            write_failure: Mutex::new(None),
            io_calls: AtomicUsize::new(0),
        }
    }

    /// Changes the readiness reported by [`SecureElement::state`].
    pub fn set_state(&self, state: ElementState) {
        *guard(&self.state) = state;
    }

    /// Makes every `put` and `delete` fail, leaving `response` as the last
    /// response code. `None` restores normal behavior.
    pub fn fail_writes(&self, response: Option<ElementResponse>) {
        *guard(&self.write_failure) = response;
    }

    /// Number of data calls (`get`, `put`, `delete`, `contains`, `list`)
    /// received so far.
    #[must_use]
    pub fn io_calls(&self) -> usize {
        self.io_calls.load(Ordering::SeqCst)
    }

    /// Stores an entry directly, bypassing any store and the call counter.
    pub fn insert_raw(&self, key: &str, value: &[u8]) {
        guard(&self.entries).insert(key.to_owned(), value.to_vec());
    }

    /// Reads an entry directly, bypassing the call counter.
    #[must_use]
    pub fn raw(&self, key: &str) -> Option<Vec<u8>> {
        guard(&self.entries).get(key).cloned()
    }

    /// Every stored key, sorted.
    #[must_use]
    pub fn raw_keys(&self) -> Vec<String> {
        guard(&self.entries).keys().cloned().collect()
    }

    fn respond(&self, response: ElementResponse) {
        *guard(&self.last_response) = response;
    }

    /// Counts the call and checks readiness, recording the failure code.
    fn begin(&self) -> bool {
        self.io_calls.fetch_add(1, Ordering::SeqCst);
        match *guard(&self.state) {
            ElementState::Unlocked => true,
            ElementState::Locked => {
                self.respond(ElementResponse::Locked);
                false
            }
            ElementState::Uninitialized => {
                self.respond(ElementResponse::Uninitialized);
                false
            }
        }
    }

    fn injected_write_failure(&self) -> bool {
        let failure = *guard(&self.write_failure);
        failure.is_some_and(|response| {
            self.respond(response);
            true
        })
    }
}

impl Default for MemorySecureElement {
    fn default() -> Self {
        Self::new()
    }
}

impl SecureElement for MemorySecureElement {
    fn state(&self) -> ElementState {
        *guard(&self.state)
    }

    fn get(&self, key: String) -> Option<Vec<u8>> {
        if !self.begin() {
            return None;
        }
        let value = guard(&self.entries).get(&key).cloned();
        self.respond(if value.is_some() {
            ElementResponse::NoError
        } else {
            ElementResponse::KeyNotFound
        });
        value
    }

    fn put(&self, key: String, value: Vec<u8>) -> bool {
        if !self.begin() || self.injected_write_failure() {
            return false;
        }
        guard(&self.entries).insert(key, value);
        self.respond(ElementResponse::NoError);
        true
    }

    fn delete(&self, key: String) -> bool {
        if !self.begin() || self.injected_write_failure() {
            return false;
        }
        let removed = guard(&self.entries).remove(&key).is_some();
        self.respond(if removed {
            ElementResponse::NoError
        } else {
            ElementResponse::KeyNotFound
        });
        removed
    }

    fn contains(&self, key: String) -> bool {
        if !self.begin() {
            return false;
        }
        self.respond(ElementResponse::NoError);
        guard(&self.entries).contains_key(&key)
    }

    fn list(&self) -> Option<Vec<String>> {
        if !self.begin() {
            return None;
        }
        self.respond(ElementResponse::NoError);
        Some(self.raw_keys())
    }

    fn last_response(&self) -> ElementResponse {
        *guard(&self.last_response)
    }
}

// =============================================================================
// Memory Attribute Bag
// =============================================================================

/// In-memory attribute bag for one identity.
pub struct MemoryAttributeBag {
    attributes: Mutex<HashMap<String, String>>,
    identity_created: AtomicBool,
    identity_calls: AtomicUsize,
    fail_identity: AtomicBool,
    writes_before_failure: Mutex<Option<usize>>,
    io_calls: AtomicUsize,
}

impl MemoryAttributeBag {
    /// Creates a bag whose identity does not exist yet.
    #[must_use]
    pub fn new() -> Self {
        Self {
            attributes: Mutex::new(HashMap::new()),
            identity_created: AtomicBool::new(false),
            identity_calls: AtomicUsize::new(0),
            fail_identity: AtomicBool::new(false),
            writes_before_failure: Mutex::new(None),
            io_calls: AtomicUsize::new(0),
        }
    }

    /// Returns `true` once [`AttributeBag::ensure_identity`] succeeded.
    #[must_use]
    pub fn identity_exists(&self) -> bool {
        self.identity_created.load(Ordering::SeqCst)
    }

    /// Number of [`AttributeBag::ensure_identity`] calls received.
    #[must_use]
    pub fn identity_calls(&self) -> usize {
        self.identity_calls.load(Ordering::SeqCst)
    }

    /// Makes [`AttributeBag::ensure_identity`] fail.
    pub fn fail_identity(&self, fail: bool) {
        self.fail_identity.store(fail, Ordering::SeqCst);
    }

    /// Lets `writes` more `set_attribute` calls succeed, then fails every
    /// following one. `None` restores normal behavior.
    pub fn fail_writes_after(&self, writes: Option<usize>) {
        *guard(&self.writes_before_failure) = writes;
    }

    /// Number of `get_attribute`/`set_attribute` calls received so far.
    #[must_use]
    pub fn io_calls(&self) -> usize {
        self.io_calls.load(Ordering::SeqCst)
    }

    /// Reads an attribute directly, bypassing the call counter.
    #[must_use]
    pub fn raw(&self, key: &str) -> Option<String> {
        guard(&self.attributes).get(key).cloned()
    }

    /// Writes an attribute directly, bypassing the call counter.
    pub fn insert_raw(&self, key: &str, value: &str) {
        guard(&self.attributes).insert(key.to_owned(), value.to_owned());
    }

    /// Number of attributes currently set, the index record included.
    #[must_use]
    pub fn len(&self) -> usize {
        guard(&self.attributes).len()
    }

    /// Returns `true` if no attribute is set.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        guard(&self.attributes).is_empty()
    }
}

impl Default for MemoryAttributeBag {
    fn default() -> Self {
        Self::new()
    }
}

impl AttributeBag for MemoryAttributeBag {
    fn ensure_identity(&self) -> Result<()> {
        self.identity_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_identity.load(Ordering::SeqCst) {
            return Err(StorageError::operation_failed("identity could not be created"));
        }
        self.identity_created.store(true, Ordering::SeqCst);
        Ok(())
    }

    fn get_attribute(&self, key: String) -> Result<Option<String>> {
        self.io_calls.fetch_add(1, Ordering::SeqCst);
        Ok(guard(&self.attributes).get(&key).cloned())
    }

    fn set_attribute(&self, key: String, value: Option<String>) -> Result<()> {
        self.io_calls.fetch_add(1, Ordering::SeqCst);
        {
            let mut remaining = guard(&self.writes_before_failure);
            match remaining.as_mut() {
                Some(0) => {
                    return Err(StorageError::operation_failed(format!(
                        "attribute write rejected: {key}"
                    )))
                }
                Some(count) => *count -= 1,
                None => {}
            }
        }
        let mut attributes = guard(&self.attributes);
        match value {
            Some(value) => attributes.insert(key, value),
            None => attributes.remove(&key),
        };
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_secure_element_locked_calls_fail_with_code() {
        let element = MemorySecureElement::new();
        assert!(element.put("k".into(), b"v".to_vec()));
        element.set_state(ElementState::Locked);

        assert_eq!(element.get("k".into()), None);
        assert_eq!(element.last_response(), ElementResponse::Locked);
        assert!(!element.delete("k".into()));
        assert_eq!(element.raw("k").as_deref(), Some(&b"v"[..]));
        assert_eq!(element.io_calls(), 3);
    }

    #[test]
    fn test_secure_element_injected_write_failure() {
        let element = MemorySecureElement::new();
        element.fail_writes(Some(ElementResponse::SystemError));
        assert!(!element.put("k".into(), Vec::new()));
        assert_eq!(element.last_response(), ElementResponse::SystemError);
        assert!(element.raw_keys().is_empty());

        element.fail_writes(None);
        assert!(element.put("k".into(), Vec::new()));
        assert_eq!(element.list(), Some(vec!["k".to_string()]));
    }

    #[test]
    fn test_attribute_bag_fail_writes_after() {
        let bag = MemoryAttributeBag::new();
        bag.fail_writes_after(Some(1));
        assert!(bag.set_attribute("a".into(), Some("1".into())).is_ok());
        assert!(bag.set_attribute("b".into(), Some("2".into())).is_err());
        assert_eq!(bag.raw("a").as_deref(), Some("1"));
        assert_eq!(bag.raw("b"), None);

        bag.fail_writes_after(None);
        bag.set_attribute("a".into(), None).unwrap();
        assert!(bag.is_empty());
        assert_eq!(bag.io_calls(), 3);
    }
}

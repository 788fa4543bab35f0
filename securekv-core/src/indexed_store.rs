//! Store backed by an attribute bag, with emulated enumeration.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use base64::{engine::general_purpose::STANDARD, Engine as _};

use crate::config::TextDecoding;
use crate::contract::{check_key_size, check_value_size, Precondition, Storage};
use crate::error::{Result, StorageError};
use crate::index::{decode_token, encode_token, KeyIndex};
use crate::platform::AttributeBag;
use crate::result::{Payload, StorageResult};
use crate::types::{Namespace, Operation, StoreKind};

/// Attribute holding the encoded [`KeyIndex`].
///
/// Contains `_`, which standard base64 never emits, so no physical key can
/// collide with it.
pub(crate) const INDEX_RECORD_KEY: &str = "__securekv_index__";

/// Key-value store over an [`AttributeBag`].
///
/// The bag has no enumeration, so the store keeps a [`KeyIndex`] of physical
/// keys in a reserved attribute shared by every namespace of the identity.
/// Each mutation updates the index first and the value second:
///
/// ```text
/// write:  index += token  ->  attribute[token] = base64(value)
/// delete: index -= token  ->  attribute[token] = None
/// ```
///
/// # Consistency
///
/// The two steps are not atomic. If the value step fails after the index was
/// persisted, the index lists a key whose read reports `NotFound` (after a
/// write) or loses a key whose value is still stored (after a delete).
/// Normal operations accept that window; [`IndexedOpaqueStore::reconcile`]
/// prunes dangling index entries on request.
///
/// # Concurrency
///
/// The index is updated read-modify-write without locking. Concurrent
/// mutations of the same identity, from this store or any other store over
/// the same bag, can lose index updates. Callers must serialize them.
pub struct IndexedOpaqueStore {
    bag: Arc<dyn AttributeBag>,
    namespace: Namespace,
    text_decoding: TextDecoding,
    identity_ready: AtomicBool,
}

impl IndexedOpaqueStore {
    /// Ceiling on the namespaced key, in bytes.
    pub const MAX_KEY_LEN: usize = 64 * 1024;

    /// Ceiling on a value, in bytes.
    pub const MAX_VALUE_LEN: usize = 4 * 1024 * 1024;

    /// Creates a store over `bag` in `namespace`.
    ///
    /// The bag's identity is created on the first operation, not here.
    #[must_use]
    pub fn new(bag: Arc<dyn AttributeBag>, namespace: Namespace) -> Self {
        Self {
            bag,
            namespace,
            text_decoding: TextDecoding::default(),
            identity_ready: AtomicBool::new(false),
        }
    }

    /// Overrides the decode policy of string reads.
    #[must_use]
    pub fn with_text_decoding(mut self, text_decoding: TextDecoding) -> Self {
        self.text_decoding = text_decoding;
        self
    }

    /// Removes index entries of this namespace whose value is gone.
    ///
    /// Repairs the index after a write whose value step failed. Entries of
    /// other namespaces are left alone. Returns the number of entries
    /// removed.
    ///
    /// # Errors
    ///
    /// Returns an error if the bag cannot be read or the index cannot be
    /// persisted.
    pub fn reconcile(&self) -> Result<usize> {
        self.ensure_identity()?;
        let mut index = self.load_index()?;
        let mut dangling = Vec::new();
        for token in index.tokens() {
            let owned = decode_token(token)
                .is_some_and(|namespaced| self.namespace.strip(&namespaced).is_some());
            if owned && self.bag.get_attribute(token.clone())?.is_none() {
                dangling.push(token.clone());
            }
        }
        if dangling.is_empty() {
            return Ok(0);
        }
        for token in &dangling {
            index.remove(token);
        }
        self.save_index(&index)?;
        log::info!(
            "reconciled {} index: pruned {} dangling entries",
            self.namespace,
            dangling.len()
        );
        Ok(dangling.len())
    }

    fn physical_key(&self, key: &str) -> Result<String> {
        let namespaced = self.namespace.qualify(key);
        check_key_size(StoreKind::AttributeBag, &namespaced, Self::MAX_KEY_LEN)?;
        Ok(encode_token(&namespaced))
    }

    fn ensure_identity(&self) -> Result<()> {
        if self.identity_ready.load(Ordering::Acquire) {
            return Ok(());
        }
        self.bag.ensure_identity()?;
        self.identity_ready.store(true, Ordering::Release);
        log::debug!("attribute bag identity ready for {} store", self.namespace);
        Ok(())
    }

    fn load_index(&self) -> Result<KeyIndex> {
        Ok(self
            .bag
            .get_attribute(INDEX_RECORD_KEY.to_owned())?
            .map_or_else(KeyIndex::new, |blob| KeyIndex::decode(&blob)))
    }

    fn save_index(&self, index: &KeyIndex) -> Result<()> {
        self.bag
            .set_attribute(INDEX_RECORD_KEY.to_owned(), Some(index.encode()))
    }

    fn fetch(&self, physical: &str) -> Result<Option<Vec<u8>>> {
        self.bag
            .get_attribute(physical.to_owned())?
            .map(|encoded| {
                STANDARD.decode(encoded).map_err(|err| {
                    StorageError::operation_failed(format!("stored value is not base64: {err}"))
                })
            })
            .transpose()
    }

    /// Existence is decided by the raw attribute, so an undecodable value
    /// can still be overwritten or removed.
    fn exists(&self, physical: &str) -> Result<bool> {
        Ok(self.bag.get_attribute(physical.to_owned())?.is_some())
    }

    fn put_entry(
        &self,
        key: &str,
        physical: String,
        value: &[u8],
        precondition: Precondition,
    ) -> Result<Payload> {
        self.ensure_identity()?;
        let exists = self.exists(&physical)?;
        precondition.check(key, exists)?;

        let mut index = self.load_index()?;
        if index.insert(physical.clone()) {
            self.save_index(&index)?;
        }
        self.bag
            .set_attribute(physical, Some(STANDARD.encode(value)))
            .inspect_err(|err| {
                log::warn!("value write for {key:?} failed after index update: {err}");
            })?;
        Ok(Payload::Key(key.to_owned()))
    }

    fn mutate(&self, key: &str, value: &[u8], precondition: Precondition) -> Result<StorageResult> {
        let physical = self.physical_key(key)?;
        check_value_size(StoreKind::AttributeBag, value, Self::MAX_VALUE_LEN)?;
        Ok(StorageResult::from_outcome(
            precondition.operation(),
            self.put_entry(key, physical, value, precondition),
        ))
    }

    fn read_entry(&self, key: &str, physical: &str) -> Result<Payload> {
        self.ensure_identity()?;
        self.fetch(physical)?
            .map(Payload::Value)
            .ok_or_else(|| StorageError::not_found(key))
    }

    fn delete_entry(&self, key: &str, physical: String) -> Result<Payload> {
        self.ensure_identity()?;
        if !self.exists(&physical)? {
            return Err(StorageError::not_found(key));
        }

        let mut index = self.load_index()?;
        if index.remove(&physical) {
            self.save_index(&index)?;
        }
        self.bag.set_attribute(physical, None).inspect_err(|err| {
            log::warn!("value clear for {key:?} failed after index update: {err}");
        })?;
        Ok(Payload::Key(key.to_owned()))
    }

    fn list_keys(&self) -> Result<Payload> {
        self.ensure_identity()?;
        let index = self.load_index()?;
        let mut keys = Vec::with_capacity(index.len());
        for token in index.tokens() {
            let Some(namespaced) = decode_token(token) else {
                log::warn!("skipping undecodable index token {token:?}");
                continue;
            };
            if let Some(key) = self.namespace.strip(&namespaced) {
                keys.push(key.to_owned());
            }
        }
        Ok(Payload::Keys(keys))
    }
}

impl Storage for IndexedOpaqueStore {
    fn kind(&self) -> StoreKind {
        StoreKind::AttributeBag
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
        let physical = self.physical_key(key)?;
        Ok(StorageResult::from_outcome(
            Operation::Read,
            self.read_entry(key, &physical),
        ))
    }

    fn delete(&self, key: &str) -> Result<StorageResult> {
        let physical = self.physical_key(key)?;
        Ok(StorageResult::from_outcome(
            Operation::Delete,
            self.delete_entry(key, physical),
        ))
    }

    fn get_all_keys(&self) -> StorageResult {
        StorageResult::from_outcome(Operation::GetAllKeys, self.list_keys())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorCode;
    use crate::platform::MemoryAttributeBag;

    fn store(bag: &Arc<MemoryAttributeBag>, namespace: Namespace) -> IndexedOpaqueStore {
        IndexedOpaqueStore::new(bag.clone(), namespace)
    }

    fn index_of(bag: &MemoryAttributeBag) -> KeyIndex {
        KeyIndex::decode(&bag.raw(INDEX_RECORD_KEY).unwrap_or_default())
    }

    fn sorted_keys(store: &IndexedOpaqueStore) -> Vec<String> {
        let mut keys = store.get_all_keys().keys().unwrap().to_vec();
        keys.sort();
        keys
    }

    #[test]
    fn test_physical_layout() {
        let bag = Arc::new(MemoryAttributeBag::new());
        let store = store(&bag, Namespace::Shared);
        assert!(store.write("a", b"hi").unwrap().is_success());

        // "shared:a" and base64("hi")
        assert_eq!(bag.raw("c2hhcmVkOmE=").as_deref(), Some("aGk="));
        assert_eq!(bag.raw(INDEX_RECORD_KEY).as_deref(), Some("c2hhcmVkOmE="));
        assert_eq!(bag.len(), 2);
    }

    #[test]
    fn test_index_tracks_live_keys_across_namespaces() {
        let bag = Arc::new(MemoryAttributeBag::new());
        let shared = store(&bag, Namespace::Shared);
        let private = store(&bag, Namespace::Private);

        shared.write("a", b"1").unwrap();
        private.write("a", b"2").unwrap();
        shared.write_or_update("b", b"3").unwrap();
        shared.update("a", b"4").unwrap();
        assert_eq!(index_of(&bag).len(), 3);

        shared.delete("a").unwrap();
        let expected: Vec<String> = ["private:a", "shared:b"].iter().map(|k| encode_token(k)).collect();
        assert_eq!(index_of(&bag).tokens(), expected.as_slice());

        assert_eq!(sorted_keys(&shared), vec!["b".to_string()]);
        assert_eq!(sorted_keys(&private), vec!["a".to_string()]);
    }

    #[test]
    fn test_identity_created_lazily_once() {
        let bag = Arc::new(MemoryAttributeBag::new());
        let store = store(&bag, Namespace::Private);
        assert!(!bag.identity_exists());

        store.write("k", b"v").unwrap();
        store.read("k").unwrap();
        store.get_all_keys();
        assert!(bag.identity_exists());
        assert_eq!(bag.identity_calls(), 1);
    }

    #[test]
    fn test_identity_failure_is_reported_and_retried() {
        let bag = Arc::new(MemoryAttributeBag::new());
        let store = store(&bag, Namespace::Private);
        bag.fail_identity(true);

        let result = store.write("k", b"v").unwrap();
        assert_eq!(
            result.error().map(StorageError::code),
            Some(ErrorCode::OperationFailed)
        );
        assert_eq!(bag.io_calls(), 0);

        bag.fail_identity(false);
        assert!(store.write("k", b"v").unwrap().is_success());
        assert_eq!(bag.identity_calls(), 2);
    }

    #[test]
    fn test_oversize_leaves_bag_untouched() {
        let bag = Arc::new(MemoryAttributeBag::new());
        let store = store(&bag, Namespace::Shared);
        let value = vec![0u8; IndexedOpaqueStore::MAX_VALUE_LEN + 1];
        let err = store.write("k", &value).unwrap_err();
        assert_eq!(err.code(), ErrorCode::ValueSizeExceeded);

        let key = "k".repeat(IndexedOpaqueStore::MAX_KEY_LEN);
        let err = store.write(&key, b"v").unwrap_err();
        assert_eq!(err.code(), ErrorCode::KeySizeExceeded);

        assert_eq!(bag.io_calls(), 0);
        assert!(bag.is_empty());
        assert!(!bag.identity_exists());
    }

    #[test]
    fn test_failed_value_write_leaves_dangling_index_entry() {
        let bag = Arc::new(MemoryAttributeBag::new());
        let store = store(&bag, Namespace::Shared);
        store.write("kept", b"1").unwrap();

        // Index write succeeds, value write fails.
        bag.fail_writes_after(Some(1));
        let result = store.write("lost", b"2").unwrap();
        assert_eq!(
            result.error().map(StorageError::code),
            Some(ErrorCode::OperationFailed)
        );
        bag.fail_writes_after(None);

        assert_eq!(sorted_keys(&store), vec!["kept".to_string(), "lost".to_string()]);
        assert_eq!(
            store.read("lost").unwrap().error(),
            Some(&StorageError::not_found("lost"))
        );

        assert_eq!(store.reconcile().unwrap(), 1);
        assert_eq!(sorted_keys(&store), vec!["kept".to_string()]);
        assert_eq!(store.reconcile().unwrap(), 0);
    }

    #[test]
    fn test_reconcile_ignores_other_namespace() {
        let bag = Arc::new(MemoryAttributeBag::new());
        let shared = store(&bag, Namespace::Shared);
        let private = store(&bag, Namespace::Private);
        bag.insert_raw(
            INDEX_RECORD_KEY,
            &[encode_token("shared:gone"), encode_token("private:gone")].join(","),
        );

        assert_eq!(shared.reconcile().unwrap(), 1);
        assert_eq!(sorted_keys(&private), vec!["gone".to_string()]);
    }

    #[test]
    fn test_listing_skips_undecodable_tokens() {
        let bag = Arc::new(MemoryAttributeBag::new());
        let store = store(&bag, Namespace::Shared);
        let blob = format!("{},not base64!,//4=", encode_token("shared:ok"));
        bag.insert_raw(INDEX_RECORD_KEY, &blob);

        assert_eq!(sorted_keys(&store), vec!["ok".to_string()]);
    }

    #[test]
    fn test_corrupt_value_is_operation_failed() {
        let bag = Arc::new(MemoryAttributeBag::new());
        let store = store(&bag, Namespace::Shared);
        bag.insert_raw(&encode_token("shared:k"), "%%%");

        let result = store.read("k").unwrap();
        assert_eq!(
            result.error().map(StorageError::code),
            Some(ErrorCode::OperationFailed)
        );
    }

    #[test]
    fn test_corrupt_value_can_be_replaced_and_removed() {
        let bag = Arc::new(MemoryAttributeBag::new());
        let store = store(&bag, Namespace::Shared);
        let physical = encode_token("shared:k");
        bag.insert_raw(&physical, "%%%");

        assert_eq!(
            store.write("k", b"x").unwrap().error(),
            Some(&StorageError::already_exists("k"))
        );
        assert!(store.write_or_update("k", b"fresh").unwrap().is_success());
        assert_eq!(store.read("k").unwrap().value(), Some(&b"fresh"[..]));

        bag.insert_raw(&physical, "%%%");
        assert!(store.delete("k").unwrap().is_success());
        assert_eq!(bag.raw(&physical), None);
        assert_eq!(store.delete_all().count(), Some(0));
    }

    #[test]
    fn test_empty_value_is_live() {
        let bag = Arc::new(MemoryAttributeBag::new());
        let store = store(&bag, Namespace::Private);
        store.write("empty", b"").unwrap();

        assert_eq!(store.read("empty").unwrap().value(), Some(&[][..]));
        assert_eq!(
            store.write("empty", b"x").unwrap().error(),
            Some(&StorageError::already_exists("empty"))
        );
    }
}

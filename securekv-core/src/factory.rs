//! Store construction from a kind, a resource handle and a namespace flag.

use std::str::FromStr;
use std::sync::Arc;

use crate::config::StoreConfig;
use crate::contract::Storage;
use crate::error::{Result, StorageError};
use crate::indexed_store::IndexedOpaqueStore;
use crate::platform::{AttributeBag, SecureElement};
use crate::secure_store::SecureBoundedStore;
use crate::types::{Namespace, StoreKind};

/// Platform resource a store is built over.
#[derive(Clone)]
pub enum ResourceHandle {
    /// Handle for a [`SecureBoundedStore`].
    SecureElement(Arc<dyn SecureElement>),
    /// Handle for an [`IndexedOpaqueStore`].
    AttributeBag(Arc<dyn AttributeBag>),
}

impl ResourceHandle {
    /// The store kind this handle can back.
    #[must_use]
    pub const fn kind(&self) -> StoreKind {
        match self {
            Self::SecureElement(_) => StoreKind::SecureElement,
            Self::AttributeBag(_) => StoreKind::AttributeBag,
        }
    }
}

impl std::fmt::Debug for ResourceHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("ResourceHandle").field(&self.kind()).finish()
    }
}

/// Builds a store of `kind` over `handle`.
///
/// # Errors
///
/// - [`StorageError::InvalidInput`] if `handle` is missing or cannot back
///   `kind`.
pub fn new_store(
    kind: StoreKind,
    handle: Option<ResourceHandle>,
    shared: bool,
) -> Result<Box<dyn Storage>> {
    open_store(&StoreConfig::new(kind, shared), handle)
}

/// Builds a store from the name of its kind, e.g. `"secure_element"`.
///
/// # Errors
///
/// - [`StorageError::StoreNotFound`] if `kind` names no known store.
/// - Otherwise as [`new_store`].
pub fn new_store_named(
    kind: &str,
    handle: Option<ResourceHandle>,
    shared: bool,
) -> Result<Box<dyn Storage>> {
    let kind =
        StoreKind::from_str(kind).map_err(|_| StorageError::StoreNotFound(kind.to_owned()))?;
    new_store(kind, handle, shared)
}

/// Builds a store from `config` over `handle`.
///
/// # Errors
///
/// - [`StorageError::InvalidInput`] if `handle` is missing or cannot back
///   the configured kind.
pub fn open_store(config: &StoreConfig, handle: Option<ResourceHandle>) -> Result<Box<dyn Storage>> {
    let handle = handle.ok_or_else(|| {
        StorageError::InvalidInput(format!("{} store requires a resource handle", config.kind))
    })?;
    let namespace: Namespace = config.namespace();
    let store: Box<dyn Storage> = match (config.kind, handle) {
        (StoreKind::SecureElement, ResourceHandle::SecureElement(element)) => Box::new(
            SecureBoundedStore::new(element, namespace).with_text_decoding(config.text_decoding),
        ),
        (StoreKind::AttributeBag, ResourceHandle::AttributeBag(bag)) => Box::new(
            IndexedOpaqueStore::new(bag, namespace).with_text_decoding(config.text_decoding),
        ),
        (kind, handle) => {
            return Err(StorageError::InvalidInput(format!(
                "{kind} store cannot be built over a {} handle",
                handle.kind()
            )))
        }
    };
    log::debug!("opened {} store in {namespace} namespace", config.kind);
    Ok(store)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::TextDecoding;
    use crate::error::ErrorCode;
    use crate::platform::{MemoryAttributeBag, MemorySecureElement};

    fn element() -> ResourceHandle {
        ResourceHandle::SecureElement(Arc::new(MemorySecureElement::new()))
    }

    fn bag() -> ResourceHandle {
        ResourceHandle::AttributeBag(Arc::new(MemoryAttributeBag::new()))
    }

    #[test]
    fn test_new_store_selects_backend_and_namespace() {
        let store = new_store(StoreKind::SecureElement, Some(element()), true).unwrap();
        assert_eq!(store.kind(), StoreKind::SecureElement);
        assert_eq!(store.namespace(), Namespace::Shared);

        let store = new_store(StoreKind::AttributeBag, Some(bag()), false).unwrap();
        assert_eq!(store.kind(), StoreKind::AttributeBag);
        assert_eq!(store.namespace(), Namespace::Private);
    }

    #[test]
    fn test_missing_handle_is_invalid_input() {
        let err = new_store(StoreKind::AttributeBag, None, true).err().unwrap();
        assert_eq!(err.code(), ErrorCode::InvalidInput);
    }

    #[test]
    fn test_mismatched_handle_is_invalid_input() {
        let err = new_store(StoreKind::SecureElement, Some(bag()), true).err().unwrap();
        assert_eq!(err.code(), ErrorCode::InvalidInput);
        assert!(err.to_string().contains("attribute_bag handle"));
    }

    #[test]
    fn test_unknown_kind_name_is_store_not_found() {
        let err = new_store_named("hardware_token", Some(element()), true).err().unwrap();
        assert_eq!(err, StorageError::StoreNotFound("hardware_token".to_string()));
        assert!(new_store_named("secure_element", Some(element()), true).is_ok());
    }

    #[test]
    fn test_open_store_applies_text_decoding() {
        let config =
            StoreConfig::new(StoreKind::AttributeBag, false).with_text_decoding(TextDecoding::Lossy);
        let store = open_store(&config, Some(bag())).unwrap();
        assert_eq!(store.text_decoding(), TextDecoding::Lossy);
    }
}

//! Common test utilities shared across integration tests.

use std::sync::{Arc, Mutex};

use securekv_core::factory::{new_store, ResourceHandle};
use securekv_core::platform::{MemoryAttributeBag, MemorySecureElement};
use securekv_core::{Storage, StorageReceiver, StorageResult, StoreKind};

/// Two stores, one per namespace, over the same physical resource.
#[allow(dead_code, reason = "used in tests")]
pub struct Fixture {
    pub shared: Box<dyn Storage>,
    pub private: Box<dyn Storage>,
}

#[allow(dead_code, reason = "used in tests")]
pub fn handle(kind: StoreKind) -> ResourceHandle {
    match kind {
        StoreKind::SecureElement => {
            ResourceHandle::SecureElement(Arc::new(MemorySecureElement::new()))
        }
        StoreKind::AttributeBag => ResourceHandle::AttributeBag(Arc::new(MemoryAttributeBag::new())),
    }
}

#[allow(dead_code, reason = "used in tests")]
pub fn fixture(kind: StoreKind) -> Fixture {
    let handle = handle(kind);
    Fixture {
        shared: new_store(kind, Some(handle.clone()), true).expect("shared store"),
        private: new_store(kind, Some(handle), false).expect("private store"),
    }
}

#[allow(dead_code, reason = "used in tests")]
pub fn sorted_keys(store: &dyn Storage) -> Vec<String> {
    let result = store.get_all_keys();
    let mut keys = result.keys().expect("listing succeeds").to_vec();
    keys.sort();
    keys
}

/// Receiver recording every result it is handed.
#[derive(Default)]
#[allow(dead_code, reason = "used in tests")]
pub struct CaptureReceiver {
    results: Mutex<Vec<StorageResult>>,
}

impl CaptureReceiver {
    #[allow(dead_code, reason = "used in tests")]
    pub fn take(&self) -> Vec<StorageResult> {
        std::mem::take(&mut *self.results.lock().unwrap())
    }
}

impl StorageReceiver for CaptureReceiver {
    fn on_result(&self, result: StorageResult) {
        self.results.lock().unwrap().push(result);
    }
}

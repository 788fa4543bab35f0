#![deny(clippy::all, clippy::pedantic, clippy::nursery)]
//! Namespaced secure key-value storage for client SDKs.
//!
//! Two backends implement the same [`Storage`] contract:
//!
//! - [`SecureBoundedStore`] over a capacity-limited, natively enumerable
//!   [`SecureElement`](platform::SecureElement).
//! - [`IndexedOpaqueStore`] over an [`AttributeBag`](platform::AttributeBag)
//!   that only supports single-key get/set. Enumeration is emulated with a
//!   reserved index record, see [`index`].
//!
//! Stores are usually built through [`factory::new_store`] or from a
//! [`StoreConfig`].

mod config;
pub use config::*;

mod contract;
pub use contract::*;

mod error;
pub use error::*;

mod result;
pub use result::*;

mod types;
pub use types::*;

pub mod factory;
pub mod index;
pub mod logger;
pub mod platform;

mod indexed_store;
pub use indexed_store::IndexedOpaqueStore;

mod secure_store;
pub use secure_store::SecureBoundedStore;

#[cfg(feature = "ffi")]
pub mod ffi;

#[cfg(feature = "ffi")]
uniffi::setup_scaffolding!("securekv_core");

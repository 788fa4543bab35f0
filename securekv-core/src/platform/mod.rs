//! Platform resources the stores run on.
//!
//! The host supplies one handle per store:
//!
//! - [`SecureElement`]: capacity-limited secret storage with OS-level
//!   access control and native enumeration (Android Keystore, iOS Keychain).
//! - [`AttributeBag`]: flat per-identity text attributes with get/set only
//!   (Android `AccountManager` user data).
//!
//! Handles are injected at construction, never looked up globally, so tests
//! substitute the in-memory implementations from [`memory`].

mod attribute_bag;
pub mod memory;
mod secure_element;

pub use attribute_bag::AttributeBag;
pub use secure_element::{ElementResponse, ElementState, SecureElement};

// Re-export memory implementations for testing
pub use memory::{MemoryAttributeBag, MemorySecureElement};

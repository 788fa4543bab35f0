//! Attribute bag interface.

use crate::error::Result;

/// Flat text attributes attached to one physical identity.
///
/// Supports single-key reads and writes only; there is no way to list the
/// attributes that exist. Several stores may share one bag, partitioned by
/// namespace prefix.
#[cfg_attr(feature = "ffi", uniffi::export(with_foreign))]
pub trait AttributeBag: Send + Sync {
    /// Creates the identity record the attributes hang off, if missing.
    ///
    /// Called once per store before its first operation.
    ///
    /// # Errors
    ///
    /// Returns an error if the identity cannot be created.
    fn ensure_identity(&self) -> Result<()>;

    /// Reads the attribute under `key`.
    ///
    /// # Errors
    ///
    /// Returns an error if the read fails.
    fn get_attribute(&self, key: String) -> Result<Option<String>>;

    /// Writes the attribute under `key`; `None` clears it.
    ///
    /// # Errors
    ///
    /// Returns an error if the write fails.
    fn set_attribute(&self, key: String, value: Option<String>) -> Result<()>;
}

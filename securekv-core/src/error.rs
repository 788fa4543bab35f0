//! Error taxonomy shared by every store and the construction path.

use strum::Display;
use thiserror::Error;

use crate::types::StoreKind;

/// Result type for storage operations.
pub type Result<T, E = StorageError> = std::result::Result<T, E>;

/// Fixed error codes surfaced to callers.
///
/// Several [`StorageError`] variants collapse onto one code, e.g. a
/// [`StorageError::PartialFailure`] reports [`ErrorCode::OperationFailed`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display)]
#[strum(serialize_all = "snake_case")]
pub enum ErrorCode {
    /// Bad construction options.
    InvalidInput,
    /// Missing key argument.
    InvalidKey,
    /// Missing value argument.
    InvalidValue,
    /// Key exceeds the store's ceiling.
    KeySizeExceeded,
    /// Value exceeds the store's ceiling.
    ValueSizeExceeded,
    /// Key exceeds the secure element's ceiling.
    SecureElementKeySizeExceeded,
    /// Value exceeds the secure element's ceiling.
    SecureElementValueSizeExceeded,
    /// A live value already exists for the key.
    AlreadyExists,
    /// No live value exists for the key.
    NotFound,
    /// The backing resource is locked or not ready.
    StoreLocked,
    /// The requested store kind does not exist.
    StoreNotFound,
    /// The store could not be set up.
    InstantiationError,
    /// Backend I/O failed, including partial bulk failures.
    OperationFailed,
    /// The backend failed without a usable reason.
    Unknown,
}

/// Errors raised by the storage layer.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[cfg_attr(feature = "ffi", derive(uniffi::Error))]
pub enum StorageError {
    /// Construction options are missing or malformed.
    #[error("invalid_input: {0}")]
    InvalidInput(String),

    /// The key argument was absent.
    #[error("invalid_key: key must not be null")]
    InvalidKey,

    /// The value argument was absent.
    #[error("invalid_value: value must not be null")]
    InvalidValue,

    /// The namespaced key is longer than the store accepts.
    #[error("key_size_exceeded: {size} bytes exceeds the {limit} byte limit of the {store} store")]
    KeySizeExceeded {
        /// Store that rejected the key.
        store: StoreKind,
        /// Size of the namespaced key in bytes.
        size: u64,
        /// Ceiling of the store in bytes.
        limit: u64,
    },

    /// The value is larger than the store accepts.
    #[error("value_size_exceeded: {size} bytes exceeds the {limit} byte limit of the {store} store")]
    ValueSizeExceeded {
        /// Store that rejected the value.
        store: StoreKind,
        /// Size of the value in bytes.
        size: u64,
        /// Ceiling of the store in bytes.
        limit: u64,
    },

    /// A live value already exists for the key.
    #[error("already_exists: {key}")]
    AlreadyExists {
        /// Logical key.
        key: String,
    },

    /// No live value exists for the key.
    #[error("not_found: {key}")]
    NotFound {
        /// Logical key.
        key: String,
    },

    /// The backing resource is locked or not initialized.
    #[error("store_locked")]
    StoreLocked,

    /// No store exists for the requested kind.
    #[error("store_not_found: {0}")]
    StoreNotFound(String),

    /// The store could not be constructed.
    #[error("instantiation_error: {0}")]
    InstantiationError(String),

    /// Backend I/O failed.
    #[error("operation_failed: {0}")]
    OperationFailed(String),

    /// A bulk delete removed some entries but not all of them.
    #[error("operation_failed: deleted {succeeded} entries, {failed} failed")]
    PartialFailure {
        /// Entries deleted.
        succeeded: u32,
        /// Entries that could not be deleted.
        failed: u32,
    },

    /// The backend failed without reporting why.
    #[error("unknown: {0}")]
    Unknown(String),
}

impl StorageError {
    /// The taxonomy code of this error.
    #[must_use]
    pub const fn code(&self) -> ErrorCode {
        match self {
            Self::InvalidInput(_) => ErrorCode::InvalidInput,
            Self::InvalidKey => ErrorCode::InvalidKey,
            Self::InvalidValue => ErrorCode::InvalidValue,
            Self::KeySizeExceeded {
                store: StoreKind::SecureElement,
                ..
            } => ErrorCode::SecureElementKeySizeExceeded,
            Self::KeySizeExceeded { .. } => ErrorCode::KeySizeExceeded,
            Self::ValueSizeExceeded {
                store: StoreKind::SecureElement,
                ..
            } => ErrorCode::SecureElementValueSizeExceeded,
            Self::ValueSizeExceeded { .. } => ErrorCode::ValueSizeExceeded,
            Self::AlreadyExists { .. } => ErrorCode::AlreadyExists,
            Self::NotFound { .. } => ErrorCode::NotFound,
            Self::StoreLocked => ErrorCode::StoreLocked,
            Self::StoreNotFound(_) => ErrorCode::StoreNotFound,
            Self::InstantiationError(_) => ErrorCode::InstantiationError,
            Self::OperationFailed(_) | Self::PartialFailure { .. } => ErrorCode::OperationFailed,
            Self::Unknown(_) => ErrorCode::Unknown,
        }
    }

    /// Returns `true` for errors produced by input validation.
    ///
    /// These are raised before any backend I/O and never reach a
    /// [`StorageResult`](crate::StorageResult).
    #[must_use]
    pub const fn is_validation(&self) -> bool {
        matches!(
            self,
            Self::InvalidKey
                | Self::InvalidValue
                | Self::KeySizeExceeded { .. }
                | Self::ValueSizeExceeded { .. }
        )
    }

    /// Creates a backend I/O error.
    pub fn operation_failed<S: Into<String>>(message: S) -> Self {
        Self::OperationFailed(message.into())
    }

    /// Creates a not-found error for a logical key.
    pub fn not_found<S: Into<String>>(key: S) -> Self {
        Self::NotFound { key: key.into() }
    }

    /// Creates an already-exists error for a logical key.
    pub fn already_exists<S: Into<String>>(key: S) -> Self {
        Self::AlreadyExists { key: key.into() }
    }
}

#[cfg(feature = "ffi")]
impl From<uniffi::UnexpectedUniFFICallbackError> for StorageError {
    fn from(error: uniffi::UnexpectedUniFFICallbackError) -> Self {
        Self::OperationFailed(error.reason)
    }
}

#[cfg(test)]
mod tests {
    use test_case::test_case;

    use super::*;

    #[test_case(StoreKind::SecureElement, ErrorCode::SecureElementKeySizeExceeded ; "secure element")]
    #[test_case(StoreKind::AttributeBag, ErrorCode::KeySizeExceeded ; "attribute bag")]
    fn test_key_size_code_depends_on_store(store: StoreKind, expected: ErrorCode) {
        let err = StorageError::KeySizeExceeded {
            store,
            size: 300,
            limit: 256,
        };
        assert_eq!(err.code(), expected);
        assert!(err.is_validation());
    }

    #[test]
    fn test_partial_failure_reports_operation_failed() {
        let err = StorageError::PartialFailure {
            succeeded: 3,
            failed: 1,
        };
        assert_eq!(err.code(), ErrorCode::OperationFailed);
        assert!(!err.is_validation());
        assert_eq!(
            err.to_string(),
            "operation_failed: deleted 3 entries, 1 failed"
        );
    }

    #[test]
    fn test_error_display() {
        let err = StorageError::ValueSizeExceeded {
            store: StoreKind::SecureElement,
            size: 40_000,
            limit: 32_768,
        };
        assert!(err.to_string().contains("secure_element store"));
        assert_eq!(StorageError::not_found("k").to_string(), "not_found: k");
        assert_eq!(ErrorCode::StoreLocked.to_string(), "store_locked");
    }
}

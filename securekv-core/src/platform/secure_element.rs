//! Secure element interface.

/// Readiness of the secure element.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "ffi", derive(uniffi::Enum))]
pub enum ElementState {
    /// Entries can be read and written.
    Unlocked,
    /// The device credential has not been entered since boot.
    Locked,
    /// No device credential has been set up.
    Uninitialized,
}

/// Last response code reported by the secure element.
///
/// The element signals success or failure with a plain boolean or an absent
/// value; this code is the only hint at why a call failed, and platforms do
/// not always set it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "ffi", derive(uniffi::Enum))]
pub enum ElementResponse {
    /// The last call succeeded.
    NoError,
    /// The element is locked.
    Locked,
    /// The element has no credential set up.
    Uninitialized,
    /// Internal failure of the platform service.
    SystemError,
    /// Malformed request.
    ProtocolError,
    /// The caller may not access the entry.
    PermissionDenied,
    /// No entry under the requested key.
    KeyNotFound,
    /// The stored entry failed its integrity check.
    ValueCorrupted,
    /// The element does not support the request.
    UndefinedAction,
    /// The unlock credential was rejected.
    WrongPassword,
    /// The element failed without a code.
    Unreported,
}

impl ElementResponse {
    /// Maps the platform's numeric response code.
    #[must_use]
    pub const fn from_code(code: i32) -> Self {
        match code {
            1 => Self::NoError,
            2 => Self::Locked,
            3 => Self::Uninitialized,
            4 => Self::SystemError,
            5 => Self::ProtocolError,
            6 => Self::PermissionDenied,
            7 => Self::KeyNotFound,
            8 => Self::ValueCorrupted,
            9 => Self::UndefinedAction,
            10 => Self::WrongPassword,
            _ => Self::Unreported,
        }
    }
}

/// Capacity-limited secure storage shared by every store on the device.
///
/// Keys are stored exactly as given; stores partition the element only by
/// prefixing keys with their namespace. Implementations must be safe to call
/// from several threads but need not serialize compound operations.
#[cfg_attr(feature = "ffi", uniffi::export(with_foreign))]
pub trait SecureElement: Send + Sync {
    /// Current readiness. Does not touch stored entries.
    fn state(&self) -> ElementState;

    /// Returns the value under `key`, or `None` if it is absent or the read
    /// failed.
    fn get(&self, key: String) -> Option<Vec<u8>>;

    /// Stores `value` under `key`, replacing any previous value.
    fn put(&self, key: String, value: Vec<u8>) -> bool;

    /// Removes the entry under `key`. Returns `false` if nothing was removed.
    fn delete(&self, key: String) -> bool;

    /// Returns `true` if an entry exists under `key`.
    fn contains(&self, key: String) -> bool;

    /// Lists every key in the element, across all namespaces and callers.
    ///
    /// Returns `None` if listing failed.
    fn list(&self) -> Option<Vec<String>>;

    /// The response code of the most recent call.
    fn last_response(&self) -> ElementResponse;
}

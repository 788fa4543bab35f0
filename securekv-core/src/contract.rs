use crate::config::TextDecoding;
use crate::error::{Result, StorageError};
use crate::result::{deliver, Payload, StorageReceiver, StorageResult};
use crate::types::{Namespace, Operation, StoreKind};

/// Uniform key-value contract implemented by every store.
///
/// Every operation has two forms:
///
/// - A synchronous form returning a [`StorageResult`]. Input validation
///   (oversize key or value) fails with `Err` before any backend I/O; every
///   later failure is carried in the result.
/// - A `*_callback` form that runs the same synchronous path and hands the
///   result to a [`StorageReceiver`]. Validation errors are returned as `Err`
///   and the receiver is not invoked.
///
/// Keys are exact-match and case-sensitive. Empty keys and values are valid.
pub trait Storage: Send + Sync {
    /// Backend family of this store.
    fn kind(&self) -> StoreKind;

    /// Namespace every key of this store lives in.
    fn namespace(&self) -> Namespace;

    /// Decode policy applied by [`Storage::read_string`].
    fn text_decoding(&self) -> TextDecoding {
        TextDecoding::Strict
    }

    /// Creates an entry. Fails with `AlreadyExists` if a live value exists.
    ///
    /// # Errors
    ///
    /// Returns a size error if `key` or `value` exceeds the store's ceiling.
    fn write(&self, key: &str, value: &[u8]) -> Result<StorageResult>;

    /// Overwrites an entry. Fails with `NotFound` if no live value exists.
    ///
    /// # Errors
    ///
    /// Returns a size error if `key` or `value` exceeds the store's ceiling.
    fn update(&self, key: &str, value: &[u8]) -> Result<StorageResult>;

    /// Creates or overwrites an entry.
    ///
    /// # Errors
    ///
    /// Returns a size error if `key` or `value` exceeds the store's ceiling.
    fn write_or_update(&self, key: &str, value: &[u8]) -> Result<StorageResult>;

    /// Reads an entry. Fails with `NotFound` if absent.
    ///
    /// # Errors
    ///
    /// Returns a size error if `key` exceeds the store's ceiling.
    fn read(&self, key: &str) -> Result<StorageResult>;

    /// Removes an entry. Fails with `NotFound` if absent.
    ///
    /// # Errors
    ///
    /// Returns a size error if `key` exceeds the store's ceiling.
    fn delete(&self, key: &str) -> Result<StorageResult>;

    /// Lists the logical keys of every live entry in this namespace.
    fn get_all_keys(&self) -> StorageResult;

    /// Deletes every entry in this namespace.
    ///
    /// Succeeds with the number of deleted entries. If any delete fails the
    /// remaining keys are still attempted and the result carries a
    /// [`StorageError::PartialFailure`] with both counts.
    fn delete_all(&self) -> StorageResult {
        let keys = match self.get_all_keys().into_result() {
            Ok(Payload::Keys(keys)) => keys,
            Ok(_) => Vec::new(),
            Err(error) => return StorageResult::failure(Operation::DeleteAll, error),
        };

        let mut succeeded = 0u32;
        let mut failed = 0u32;
        for key in &keys {
            match self.delete(key) {
                Ok(result) if result.is_success() => succeeded += 1,
                Ok(result) => {
                    failed += 1;
                    log::debug!("delete_all: {key:?} failed: {:?}", result.error());
                }
                Err(error) => {
                    failed += 1;
                    log::debug!("delete_all: {key:?} rejected: {error}");
                }
            }
        }

        if failed > 0 {
            log::warn!(
                "delete_all in {} {} store: {succeeded} deleted, {failed} failed",
                self.namespace(),
                self.kind()
            );
            return StorageResult::failure(
                Operation::DeleteAll,
                StorageError::PartialFailure { succeeded, failed },
            );
        }
        StorageResult::success(Operation::DeleteAll, Payload::Count(succeeded))
    }

    /// [`Storage::write`] with a UTF-8 value.
    ///
    /// # Errors
    ///
    /// Same as [`Storage::write`].
    fn write_string(&self, key: &str, value: &str) -> Result<StorageResult> {
        self.write(key, value.as_bytes())
    }

    /// [`Storage::update`] with a UTF-8 value.
    ///
    /// # Errors
    ///
    /// Same as [`Storage::update`].
    fn update_string(&self, key: &str, value: &str) -> Result<StorageResult> {
        self.update(key, value.as_bytes())
    }

    /// [`Storage::write_or_update`] with a UTF-8 value.
    ///
    /// # Errors
    ///
    /// Same as [`Storage::write_or_update`].
    fn write_or_update_string(&self, key: &str, value: &str) -> Result<StorageResult> {
        self.write_or_update(key, value.as_bytes())
    }

    /// [`Storage::read`] decoding the value as UTF-8 per
    /// [`Storage::text_decoding`].
    ///
    /// # Errors
    ///
    /// Same as [`Storage::read`].
    fn read_string(&self, key: &str) -> Result<StorageResult> {
        let result = self.read(key)?;
        Ok(decode_text(key, result, self.text_decoding()))
    }

    /// Callback form of [`Storage::write`].
    ///
    /// # Errors
    ///
    /// Same as [`Storage::write`]; the receiver is not invoked.
    fn write_callback(
        &self,
        key: &str,
        value: &[u8],
        receiver: Option<&dyn StorageReceiver>,
    ) -> Result<()> {
        deliver(receiver, self.write(key, value)?);
        Ok(())
    }

    /// Callback form of [`Storage::update`].
    ///
    /// # Errors
    ///
    /// Same as [`Storage::update`]; the receiver is not invoked.
    fn update_callback(
        &self,
        key: &str,
        value: &[u8],
        receiver: Option<&dyn StorageReceiver>,
    ) -> Result<()> {
        deliver(receiver, self.update(key, value)?);
        Ok(())
    }

    /// Callback form of [`Storage::write_or_update`].
    ///
    /// # Errors
    ///
    /// Same as [`Storage::write_or_update`]; the receiver is not invoked.
    fn write_or_update_callback(
        &self,
        key: &str,
        value: &[u8],
        receiver: Option<&dyn StorageReceiver>,
    ) -> Result<()> {
        deliver(receiver, self.write_or_update(key, value)?);
        Ok(())
    }

    /// Callback form of [`Storage::read`].
    ///
    /// # Errors
    ///
    /// Same as [`Storage::read`]; the receiver is not invoked.
    fn read_callback(&self, key: &str, receiver: Option<&dyn StorageReceiver>) -> Result<()> {
        deliver(receiver, self.read(key)?);
        Ok(())
    }

    /// Callback form of [`Storage::delete`].
    ///
    /// # Errors
    ///
    /// Same as [`Storage::delete`]; the receiver is not invoked.
    fn delete_callback(&self, key: &str, receiver: Option<&dyn StorageReceiver>) -> Result<()> {
        deliver(receiver, self.delete(key)?);
        Ok(())
    }

    /// Callback form of [`Storage::delete_all`].
    fn delete_all_callback(&self, receiver: Option<&dyn StorageReceiver>) {
        deliver(receiver, self.delete_all());
    }

    /// Callback form of [`Storage::get_all_keys`].
    fn get_all_keys_callback(&self, receiver: Option<&dyn StorageReceiver>) {
        deliver(receiver, self.get_all_keys());
    }

    /// Callback form of [`Storage::write_string`].
    ///
    /// # Errors
    ///
    /// Same as [`Storage::write`]; the receiver is not invoked.
    fn write_string_callback(
        &self,
        key: &str,
        value: &str,
        receiver: Option<&dyn StorageReceiver>,
    ) -> Result<()> {
        deliver(receiver, self.write_string(key, value)?);
        Ok(())
    }

    /// Callback form of [`Storage::update_string`].
    ///
    /// # Errors
    ///
    /// Same as [`Storage::update`]; the receiver is not invoked.
    fn update_string_callback(
        &self,
        key: &str,
        value: &str,
        receiver: Option<&dyn StorageReceiver>,
    ) -> Result<()> {
        deliver(receiver, self.update_string(key, value)?);
        Ok(())
    }

    /// Callback form of [`Storage::write_or_update_string`].
    ///
    /// # Errors
    ///
    /// Same as [`Storage::write_or_update`]; the receiver is not invoked.
    fn write_or_update_string_callback(
        &self,
        key: &str,
        value: &str,
        receiver: Option<&dyn StorageReceiver>,
    ) -> Result<()> {
        deliver(receiver, self.write_or_update_string(key, value)?);
        Ok(())
    }

    /// Callback form of [`Storage::read_string`].
    ///
    /// # Errors
    ///
    /// Same as [`Storage::read`]; the receiver is not invoked.
    fn read_string_callback(
        &self,
        key: &str,
        receiver: Option<&dyn StorageReceiver>,
    ) -> Result<()> {
        deliver(receiver, self.read_string(key)?);
        Ok(())
    }
}

/// Rejects an absent key argument with [`StorageError::InvalidKey`].
///
/// # Errors
///
/// Returns [`StorageError::InvalidKey`] if `key` is `None`.
pub fn require_key(key: Option<&str>) -> Result<&str> {
    key.ok_or(StorageError::InvalidKey)
}

/// Rejects an absent value argument with [`StorageError::InvalidValue`].
///
/// # Errors
///
/// Returns [`StorageError::InvalidValue`] if `value` is `None`.
pub fn require_value(value: Option<&[u8]>) -> Result<&[u8]> {
    value.ok_or(StorageError::InvalidValue)
}

/// Existence requirement of a mutating operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Precondition {
    /// `write`: the entry must not exist.
    Absent,
    /// `update`: the entry must exist.
    Present,
    /// `write_or_update`: either.
    Any,
}

impl Precondition {
    pub(crate) const fn operation(self) -> Operation {
        match self {
            Self::Absent => Operation::Write,
            Self::Present => Operation::Update,
            Self::Any => Operation::WriteOrUpdate,
        }
    }

    /// Checks the requirement against the live state of `key`.
    pub(crate) fn check(self, key: &str, exists: bool) -> Result<()> {
        match (self, exists) {
            (Self::Absent, true) => Err(StorageError::already_exists(key)),
            (Self::Present, false) => Err(StorageError::not_found(key)),
            _ => Ok(()),
        }
    }
}

/// Enforces a byte ceiling on a namespaced key.
pub(crate) fn check_key_size(store: StoreKind, namespaced: &str, limit: usize) -> Result<()> {
    if namespaced.len() > limit {
        return Err(StorageError::KeySizeExceeded {
            store,
            size: namespaced.len() as u64,
            limit: limit as u64,
        });
    }
    Ok(())
}

/// Enforces a byte ceiling on a value.
pub(crate) fn check_value_size(store: StoreKind, value: &[u8], limit: usize) -> Result<()> {
    if value.len() > limit {
        return Err(StorageError::ValueSizeExceeded {
            store,
            size: value.len() as u64,
            limit: limit as u64,
        });
    }
    Ok(())
}

fn decode_text(key: &str, result: StorageResult, policy: TextDecoding) -> StorageResult {
    let operation = result.operation();
    let bytes = match result.into_result() {
        Ok(Payload::Value(bytes)) => bytes,
        Ok(payload) => return StorageResult::success(operation, payload),
        Err(error) => return StorageResult::failure(operation, error),
    };
    match String::from_utf8(bytes) {
        Ok(text) => StorageResult::success(operation, Payload::Text(text)),
        Err(err) => match policy {
            TextDecoding::Strict => StorageResult::failure(
                operation,
                StorageError::operation_failed(format!("value of {key:?} is not valid UTF-8")),
            ),
            TextDecoding::Lossy => {
                log::warn!("value of {key:?} is not valid UTF-8, decoding lossily");
                let text = String::from_utf8_lossy(err.as_bytes()).into_owned();
                StorageResult::success(operation, Payload::Text(text))
            }
        },
    }
}

#[cfg(test)]
mod tests {
    use test_case::test_case;

    use super::*;
    use crate::error::ErrorCode;

    #[test_case(Precondition::Absent, false => None ; "write on absent")]
    #[test_case(Precondition::Absent, true => Some(ErrorCode::AlreadyExists) ; "write on live")]
    #[test_case(Precondition::Present, false => Some(ErrorCode::NotFound) ; "update on absent")]
    #[test_case(Precondition::Present, true => None ; "update on live")]
    #[test_case(Precondition::Any, false => None ; "upsert on absent")]
    #[test_case(Precondition::Any, true => None ; "upsert on live")]
    fn test_precondition(precondition: Precondition, exists: bool) -> Option<ErrorCode> {
        precondition.check("k", exists).err().map(|err| err.code())
    }

    #[test]
    fn test_require_arguments() {
        assert_eq!(require_key(Some("")), Ok(""));
        assert_eq!(require_key(None), Err(StorageError::InvalidKey));
        assert_eq!(require_value(Some(&[][..])), Ok(&[][..]));
        assert_eq!(require_value(None), Err(StorageError::InvalidValue));
    }

    #[test]
    fn test_size_checks_are_inclusive() {
        let store = StoreKind::AttributeBag;
        assert!(check_key_size(store, "abcd", 4).is_ok());
        assert_eq!(
            check_key_size(store, "abcde", 4).unwrap_err().code(),
            ErrorCode::KeySizeExceeded
        );
        assert!(check_value_size(store, &[0; 4], 4).is_ok());
        assert_eq!(
            check_value_size(store, &[0; 5], 4).unwrap_err().code(),
            ErrorCode::ValueSizeExceeded
        );
    }

    #[test_case(TextDecoding::Strict => None ; "strict fails")]
    #[test_case(TextDecoding::Lossy => Some("a\u{FFFD}b".to_string()) ; "lossy replaces")]
    fn test_decode_text_invalid_utf8(policy: TextDecoding) -> Option<String> {
        let raw = StorageResult::success(Operation::Read, Payload::Value(vec![b'a', 0xFF, b'b']));
        let decoded = decode_text("k", raw, policy);
        if let Some(error) = decoded.error() {
            assert_eq!(error.code(), ErrorCode::OperationFailed);
        }
        decoded.text().map(str::to_owned)
    }

    #[test]
    fn test_decode_text_passes_failures_through() {
        let raw = StorageResult::failure(Operation::Read, StorageError::not_found("k"));
        let decoded = decode_text("k", raw.clone(), TextDecoding::Lossy);
        assert_eq!(decoded, raw);
    }
}

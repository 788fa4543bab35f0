use crate::error::{Result, StorageError};
use crate::types::Operation;

/// Whether an operation succeeded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Status {
    /// The payload carries the operation's output.
    Success,
    /// The payload carries a [`StorageError`].
    Failure,
}

/// Output carried by a [`StorageResult`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Payload {
    /// Logical key echoed by write, update, upsert and delete.
    Key(String),
    /// Raw value returned by a read.
    Value(Vec<u8>),
    /// Decoded value returned by a string read.
    Text(String),
    /// Keys returned by a listing.
    Keys(Vec<String>),
    /// Number of entries removed by a bulk delete.
    Count(u32),
    /// Failure cause.
    Error(StorageError),
}

/// Discriminated result of one contract operation.
///
/// Operational failures (missing entries, locked stores, backend I/O) are
/// reported here rather than returned as `Err`; only input validation
/// short-circuits with an error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorageResult {
    operation: Operation,
    status: Status,
    payload: Payload,
}

impl StorageResult {
    /// Creates a successful result.
    #[must_use]
    pub const fn success(operation: Operation, payload: Payload) -> Self {
        Self {
            operation,
            status: Status::Success,
            payload,
        }
    }

    /// Creates a failed result.
    #[must_use]
    pub const fn failure(operation: Operation, error: StorageError) -> Self {
        Self {
            operation,
            status: Status::Failure,
            payload: Payload::Error(error),
        }
    }

    /// Captures the outcome of an operation.
    #[must_use]
    pub fn from_outcome(operation: Operation, outcome: Result<Payload>) -> Self {
        match outcome {
            Ok(payload) => Self::success(operation, payload),
            Err(error) => Self::failure(operation, error),
        }
    }

    /// The operation this result reports on.
    #[must_use]
    pub const fn operation(&self) -> Operation {
        self.operation
    }

    /// Success or failure.
    #[must_use]
    pub const fn status(&self) -> Status {
        self.status
    }

    /// Returns `true` when the operation succeeded.
    #[must_use]
    pub const fn is_success(&self) -> bool {
        matches!(self.status, Status::Success)
    }

    /// The payload, output or error.
    #[must_use]
    pub const fn payload(&self) -> &Payload {
        &self.payload
    }

    /// The failure cause, if the operation failed.
    #[must_use]
    pub const fn error(&self) -> Option<&StorageError> {
        match &self.payload {
            Payload::Error(error) => Some(error),
            _ => None,
        }
    }

    /// The echoed key of a successful write, update, upsert or delete.
    #[must_use]
    pub fn key(&self) -> Option<&str> {
        match &self.payload {
            Payload::Key(key) => Some(key),
            _ => None,
        }
    }

    /// The value of a successful read.
    #[must_use]
    pub fn value(&self) -> Option<&[u8]> {
        match &self.payload {
            Payload::Value(value) => Some(value),
            _ => None,
        }
    }

    /// The decoded value of a successful string read.
    #[must_use]
    pub fn text(&self) -> Option<&str> {
        match &self.payload {
            Payload::Text(text) => Some(text),
            _ => None,
        }
    }

    /// The keys of a successful listing.
    #[must_use]
    pub fn keys(&self) -> Option<&[String]> {
        match &self.payload {
            Payload::Keys(keys) => Some(keys),
            _ => None,
        }
    }

    /// The deletion count of a successful bulk delete.
    #[must_use]
    pub const fn count(&self) -> Option<u32> {
        match &self.payload {
            Payload::Count(count) => Some(*count),
            _ => None,
        }
    }

    /// Converts into a plain `Result`, dropping the operation tag.
    ///
    /// # Errors
    ///
    /// Returns the failure cause if the operation failed.
    pub fn into_result(self) -> Result<Payload> {
        match self.payload {
            Payload::Error(error) => Err(error),
            payload => Ok(payload),
        }
    }
}

/// Receives the result of a callback-style operation.
///
/// Invoked exactly once per call, on the calling thread, with the same
/// [`StorageResult`] the synchronous form returns.
pub trait StorageReceiver: Send + Sync {
    /// Handles the result.
    fn on_result(&self, result: StorageResult);
}

/// Hands `result` to `receiver`, or drops it when no receiver was supplied.
pub(crate) fn deliver(receiver: Option<&dyn StorageReceiver>, result: StorageResult) {
    match receiver {
        Some(receiver) => receiver.on_result(result),
        None => log::debug!(
            "discarding {} result without receiver (success: {})",
            result.operation(),
            result.is_success()
        ),
    }
}

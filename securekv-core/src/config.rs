use std::str::FromStr;

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

use crate::error::{Result, StorageError};
use crate::types::{Namespace, StoreKind};

/// How string reads treat stored bytes that are not valid UTF-8.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum TextDecoding {
    /// Fail the read with `OperationFailed`.
    #[default]
    Strict,
    /// Replace invalid sequences with U+FFFD and log a warning.
    Lossy,
}

/// Options for building a store through [`crate::factory::open_store`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreConfig {
    /// Backend family.
    pub kind: StoreKind,
    /// Selects [`Namespace::Shared`] when `true`, [`Namespace::Private`] otherwise.
    #[serde(default)]
    pub shared: bool,
    /// Decode policy for string reads.
    #[serde(default)]
    pub text_decoding: TextDecoding,
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct RawStoreConfig {
    kind: String,
    #[serde(default)]
    shared: bool,
    #[serde(default)]
    text_decoding: TextDecoding,
}

impl StoreConfig {
    /// Creates a config with strict text decoding.
    #[must_use]
    pub const fn new(kind: StoreKind, shared: bool) -> Self {
        Self {
            kind,
            shared,
            text_decoding: TextDecoding::Strict,
        }
    }

    /// Overrides the text decode policy.
    #[must_use]
    pub const fn with_text_decoding(mut self, text_decoding: TextDecoding) -> Self {
        self.text_decoding = text_decoding;
        self
    }

    /// The namespace selected by [`StoreConfig::shared`].
    #[must_use]
    pub const fn namespace(&self) -> Namespace {
        Namespace::from_shared(self.shared)
    }

    /// Parses a JSON config such as
    /// `{"kind": "attribute_bag", "shared": true, "text_decoding": "lossy"}`.
    ///
    /// # Errors
    ///
    /// - [`StorageError::InvalidInput`] if the document is malformed.
    /// - [`StorageError::StoreNotFound`] if `kind` names no known store.
    pub fn from_json(json: &str) -> Result<Self> {
        let raw: RawStoreConfig = serde_json::from_str(json)
            .map_err(|err| StorageError::InvalidInput(format!("store config: {err}")))?;
        let kind = StoreKind::from_str(&raw.kind)
            .map_err(|_| StorageError::StoreNotFound(raw.kind.clone()))?;
        Ok(Self {
            kind,
            shared: raw.shared,
            text_decoding: raw.text_decoding,
        })
    }

    /// Serializes the config to JSON.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::InvalidInput`] if serialization fails.
    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string(self)
            .map_err(|err| StorageError::InvalidInput(format!("store config: {err}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorCode;

    #[test]
    fn test_from_json_defaults() {
        let config = StoreConfig::from_json(r#"{"kind": "secure_element"}"#).unwrap();
        assert_eq!(config, StoreConfig::new(StoreKind::SecureElement, false));
        assert_eq!(config.namespace(), Namespace::Private);
    }

    #[test]
    fn test_json_round_trip_keeps_policy() {
        let config = StoreConfig::new(StoreKind::AttributeBag, true)
            .with_text_decoding(TextDecoding::Lossy);
        let json = config.to_json().unwrap();
        assert!(json.contains(r#""text_decoding":"lossy""#));
        assert_eq!(StoreConfig::from_json(&json).unwrap(), config);
    }

    #[test]
    fn test_unknown_kind_is_store_not_found() {
        let err = StoreConfig::from_json(r#"{"kind": "cloud_kms"}"#).unwrap_err();
        assert_eq!(err.code(), ErrorCode::StoreNotFound);
    }

    #[test]
    fn test_malformed_config_is_invalid_input() {
        for json in ["{", r#"{"shared": true}"#, r#"{"kind": "attribute_bag", "ttl": 5}"#] {
            let err = StoreConfig::from_json(json).unwrap_err();
            assert_eq!(err.code(), ErrorCode::InvalidInput, "{json}");
        }
    }
}

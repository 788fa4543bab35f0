//! Key index codec for backends without native enumeration.
//!
//! An [`AttributeBag`](crate::platform::AttributeBag) can only get and set
//! single attributes, so the set of live keys is kept in one reserved
//! attribute holding a [`KeyIndex`]. The index lists *physical* key tokens
//! for the whole identity, both namespaces included.
//!
//! # Blob format
//!
//! ```text
//! token ("," token)*
//! ```
//!
//! Tokens are joined by [`DELIMITER`] with no trailing delimiter; an empty
//! index encodes to the empty string. Tokens produced by [`encode_token`]
//! are standard base64, which never contains the delimiter.

use base64::{engine::general_purpose::STANDARD, Engine as _};

/// Separator between tokens in an encoded index.
pub const DELIMITER: char = ',';

/// Ordered, duplicate-free list of physical key tokens.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct KeyIndex {
    tokens: Vec<String>,
}

impl KeyIndex {
    /// Creates an empty index.
    #[must_use]
    pub const fn new() -> Self {
        Self { tokens: Vec::new() }
    }

    /// Decodes an index blob.
    ///
    /// Empty segments are ignored and repeated tokens keep their first
    /// position, so a blob damaged by an interrupted write still decodes.
    #[must_use]
    pub fn decode(blob: &str) -> Self {
        let mut index = Self::new();
        for token in blob.split(DELIMITER).filter(|token| !token.is_empty()) {
            index.insert(token.to_owned());
        }
        index
    }

    /// Encodes the index into its blob form.
    #[must_use]
    pub fn encode(&self) -> String {
        let mut separator = [0u8; 4];
        self.tokens.join(DELIMITER.encode_utf8(&mut separator))
    }

    /// Appends `token` unless it is already present.
    ///
    /// Returns `true` if the index changed. The token must not contain
    /// [`DELIMITER`].
    pub fn insert(&mut self, token: String) -> bool {
        debug_assert!(!token.contains(DELIMITER), "token contains the delimiter");
        if self.contains(&token) {
            return false;
        }
        self.tokens.push(token);
        true
    }

    /// Removes `token`. Returns `true` if it was present.
    pub fn remove(&mut self, token: &str) -> bool {
        let before = self.tokens.len();
        self.tokens.retain(|existing| existing != token);
        self.tokens.len() != before
    }

    /// Returns `true` if `token` is present.
    #[must_use]
    pub fn contains(&self, token: &str) -> bool {
        self.tokens.iter().any(|existing| existing == token)
    }

    /// The tokens in insertion order.
    #[must_use]
    pub fn tokens(&self) -> &[String] {
        &self.tokens
    }

    /// Number of tokens.
    #[must_use]
    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    /// Returns `true` if the index holds no tokens.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }
}

/// Encodes a namespaced key into a delimiter-safe token.
#[must_use]
pub fn encode_token(namespaced_key: &str) -> String {
    STANDARD.encode(namespaced_key.as_bytes())
}

/// Decodes a token back into its namespaced key.
///
/// Returns `None` if the token is not base64 or does not hold UTF-8.
#[must_use]
pub fn decode_token(token: &str) -> Option<String> {
    let bytes = STANDARD.decode(token).ok()?;
    String::from_utf8(bytes).ok()
}

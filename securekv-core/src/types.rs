use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// The backend family a store runs on.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
#[cfg_attr(feature = "ffi", derive(uniffi::Enum))]
pub enum StoreKind {
    /// Capacity-limited secure element with native enumeration.
    SecureElement,
    /// Per-identity attribute bag without enumeration.
    AttributeBag,
}

/// Scope partitioning one physical resource between callers.
///
/// Every logical key is prefixed with [`Namespace::prefix`] before it reaches
/// a backend. The prefixes share no common leading substring, so filtering
/// by prefix never leaks entries across namespaces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display)]
#[strum(serialize_all = "snake_case")]
pub enum Namespace {
    /// Entries shared by every consumer of the resource.
    Shared,
    /// Entries private to the owning identity.
    Private,
}

impl Namespace {
    /// Picks the namespace from the `is_shared` construction flag.
    #[must_use]
    pub const fn from_shared(shared: bool) -> Self {
        if shared {
            Self::Shared
        } else {
            Self::Private
        }
    }

    /// The prefix prepended to logical keys.
    #[must_use]
    pub const fn prefix(self) -> &'static str {
        match self {
            Self::Shared => "shared:",
            Self::Private => "private:",
        }
    }

    /// Prepends the namespace prefix to `key`.
    #[must_use]
    pub fn qualify(self, key: &str) -> String {
        let prefix = self.prefix();
        let mut namespaced = String::with_capacity(prefix.len() + key.len());
        namespaced.push_str(prefix);
        namespaced.push_str(key);
        namespaced
    }

    /// Returns the logical key if `namespaced` belongs to this namespace.
    #[must_use]
    pub fn strip<'a>(self, namespaced: &'a str) -> Option<&'a str> {
        namespaced.strip_prefix(self.prefix())
    }
}

/// The contract operation a [`StorageResult`](crate::StorageResult) reports on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display)]
#[strum(serialize_all = "snake_case")]
pub enum Operation {
    /// Create-only write.
    Write,
    /// Overwrite of an existing entry.
    Update,
    /// Unconditional upsert.
    WriteOrUpdate,
    /// Single-key read.
    Read,
    /// Single-key delete.
    Delete,
    /// Namespace-wide delete.
    DeleteAll,
    /// Namespace-wide key listing.
    GetAllKeys,
}

//! The key model: what may name a process

use core_types::ProcessId;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::hash::Hash;

/// The capability bundle required of a key identity
///
/// Equality and hashing make a key usable as a table index; serialization
/// lets it cross the wire; `Display` gives diagnostics something readable.
/// Implemented automatically for every type that satisfies the bounds.
pub trait Keyable:
    Clone + Eq + Hash + fmt::Debug + fmt::Display + Serialize + DeserializeOwned + 'static
{
}

impl<T> Keyable for T where
    T: Clone + Eq + Hash + fmt::Debug + fmt::Display + Serialize + DeserializeOwned + 'static
{
}

/// What kind of binding a key establishes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum KeyKind {
    /// A name with exactly one owner process at a time
    Alias,
    /// A per-process name; uniqueness is scoped to the owning process
    Property,
}

impl fmt::Display for KeyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            KeyKind::Alias => write!(f, "alias"),
            KeyKind::Property => write!(f, "property"),
        }
    }
}

/// A registry key: identity, kind, and optional owner scope
///
/// The scope names the owning process at registration and unregistration
/// time; pure lookups leave it empty. Registry tables index by the
/// identity alone, never by the full key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(bound(serialize = "K: Serialize", deserialize = "K: DeserializeOwned"))]
pub struct Key<K> {
    /// The key identity
    pub id: K,
    /// Alias or property
    pub kind: KeyKind,
    /// The owning process, when the operation concerns ownership
    pub scope: Option<ProcessId>,
}

impl<K: Keyable> Key<K> {
    /// Creates an unscoped alias key (for lookups and subscriptions)
    pub fn alias(id: K) -> Self {
        Self {
            id,
            kind: KeyKind::Alias,
            scope: None,
        }
    }

    /// Creates an alias key scoped to its owner (for register/unregister)
    pub fn alias_owned_by(id: K, owner: ProcessId) -> Self {
        Self {
            id,
            kind: KeyKind::Alias,
            scope: Some(owner),
        }
    }

    /// Creates a property key scoped to its owner
    pub fn property(id: K, owner: ProcessId) -> Self {
        Self {
            id,
            kind: KeyKind::Property,
            scope: Some(owner),
        }
    }

    /// Returns true for alias keys
    pub fn is_alias(&self) -> bool {
        self.kind == KeyKind::Alias
    }

    /// Returns true for property keys
    pub fn is_property(&self) -> bool {
        self.kind == KeyKind::Property
    }
}

impl<K: Keyable> fmt::Display for Key<K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.scope {
            Some(owner) => write!(f, "{}:{} ({})", self.kind, self.id, owner),
            None => write!(f, "{}:{}", self.kind, self.id),
        }
    }
}

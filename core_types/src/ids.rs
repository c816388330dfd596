//! Process identity

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Stable identity of a process
///
/// A process is an independently scheduled unit with a private mailbox;
/// this is its name for everything else in the system. Identities are
/// minted once and never reused, and they stay meaningful after the
/// process dies — a death notification, a reaped table entry, and an
/// audit line all refer to the dead process by the same value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ProcessId(Uuid);

impl ProcessId {
    /// Mints a fresh process identity
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Rebuilds an identity from a UUID
    ///
    /// For identities that arrived over the wire or out of a stored
    /// snapshot; this never mints.
    pub fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// The underlying UUID
    pub fn as_uuid(&self) -> Uuid {
        self.0
    }
}

impl Default for ProcessId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ProcessId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "proc:{}", self.0)
    }
}

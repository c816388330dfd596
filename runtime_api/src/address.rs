//! Addressable process references

use core_types::ProcessId;
use serde::{Deserialize, Serialize};
use std::fmt;

/// An opaque process address
///
/// Anything that can be resolved to a [`ProcessId`] may be passed where a
/// service address is expected: either the identity itself, or a name
/// bound in the runtime's address table. Resolution is the runtime's job;
/// holders of an address never assume it is live.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Address {
    /// A direct process identity
    Pid(ProcessId),
    /// A name bound in the runtime's address table
    Named(String),
}

impl Address {
    /// Creates a named address
    pub fn named(name: impl Into<String>) -> Self {
        Self::Named(name.into())
    }
}

impl From<ProcessId> for Address {
    fn from(pid: ProcessId) -> Self {
        Self::Pid(pid)
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Address::Pid(pid) => write!(f, "{}", pid),
            Address::Named(name) => write!(f, "@{}", name),
        }
    }
}

//! Key-update events, subscription masks, and monitor references

use core_types::ProcessId;
use runtime_api::ExitReason;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::fmt;

/// What happened to a watched key
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum KeyUpdateEvent {
    /// The key became bound to an owner
    Registered { owner: ProcessId },
    /// The key was explicitly unbound
    Unregistered,
    /// The key's lease ran out
    ///
    /// Present in the taxonomy for wire compatibility; no timer currently
    /// produces it.
    LeaseExpired,
    /// The owning process terminated
    OwnerDied { reason: ExitReason },
    /// Ownership moved from one process to another
    OwnerChanged {
        previous: ProcessId,
        current: ProcessId,
    },
}

impl KeyUpdateEvent {
    /// Folds the event constructors into their subscription masks
    ///
    /// Total: every event maps to exactly one mask. Both death and
    /// transfer are ownership changes.
    pub fn mask(&self) -> EventMask {
        match self {
            KeyUpdateEvent::Registered { .. } => EventMask::OnRegistered,
            KeyUpdateEvent::Unregistered => EventMask::OnUnregistered,
            KeyUpdateEvent::LeaseExpired => EventMask::OnLeaseExpiry,
            KeyUpdateEvent::OwnerDied { .. } => EventMask::OnOwnershipChange,
            KeyUpdateEvent::OwnerChanged { .. } => EventMask::OnOwnershipChange,
        }
    }
}

impl fmt::Display for KeyUpdateEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            KeyUpdateEvent::Registered { owner } => write!(f, "registered to {}", owner),
            KeyUpdateEvent::Unregistered => write!(f, "unregistered"),
            KeyUpdateEvent::LeaseExpired => write!(f, "lease expired"),
            KeyUpdateEvent::OwnerDied { reason } => write!(f, "owner died: {}", reason),
            KeyUpdateEvent::OwnerChanged { previous, current } => {
                write!(f, "owner changed: {} -> {}", previous, current)
            }
        }
    }
}

/// Subscription mask values
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EventMask {
    /// Registration events
    OnRegistered,
    /// Explicit unregistration events
    OnUnregistered,
    /// Owner death and ownership transfer
    OnOwnershipChange,
    /// Lease expiry
    OnLeaseExpiry,
}

/// A subscriber's event filter
///
/// An empty filter (the default) receives every event; a selective filter
/// receives only events whose mask it lists.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventFilter {
    masks: Option<Vec<EventMask>>,
}

impl EventFilter {
    /// A filter that accepts every event
    pub fn all() -> Self {
        Self { masks: None }
    }

    /// A filter that accepts only the listed masks
    pub fn only(masks: impl Into<Vec<EventMask>>) -> Self {
        Self {
            masks: Some(masks.into()),
        }
    }

    /// Checks whether events with the given mask pass the filter
    pub fn accepts(&self, mask: EventMask) -> bool {
        match &self.masks {
            None => true,
            Some(masks) => masks.contains(&mask),
        }
    }

    /// Checks whether the filter is selective (lists explicit masks)
    pub fn is_selective(&self) -> bool {
        self.masks.is_some()
    }
}

impl Default for EventFilter {
    fn default() -> Self {
        Self::all()
    }
}

/// Opaque handle correlating a subscription with its notifications
///
/// The serial is drawn from the registry's monotonic counter, so no two
/// references issued by one registry ever compare equal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MonitorRef {
    /// The subscribing process
    pub subscriber: ProcessId,
    /// Registry-issued serial
    pub serial: u64,
}

impl fmt::Display for MonitorRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "kmref:{}#{}", self.subscriber, self.serial)
    }
}

/// Notification fanned out to a subscriber when a watched key changes
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(bound(serialize = "K: Serialize", deserialize = "K: DeserializeOwned"))]
pub struct KeyMonitorNotification<K> {
    /// The key identity that changed
    pub key: K,
    /// The subscription this notification belongs to
    pub reference: MonitorRef,
    /// What happened
    pub event: KeyUpdateEvent,
}

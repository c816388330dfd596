//! # Registry Types
//!
//! Shared types for the process registry: the key model, key-update
//! events with their subscription masks, monitor references, and the wire
//! protocol spoken between clients and the registry service.
//!
//! ## Philosophy
//!
//! - **Keys are values, not strings**: any hashable, serializable,
//!   printable value can name a process.
//! - **Events are data**: subscribers receive typed update events and
//!   filter them with declarative masks.
//! - **One protocol, one codec**: every envelope the registry sends or
//!   receives is encoded and validated in one place.

pub mod event;
pub mod key;
pub mod protocol;

pub use event::{EventFilter, EventMask, KeyMonitorNotification, KeyUpdateEvent, MonitorRef};
pub use key::{Key, KeyKind, Keyable};
pub use protocol::{
    CodecError, QueryTarget, RegisterOutcome, RegistryCodec, RegistryReply, RegistryRequest,
    UnregisterOutcome, REGISTRY_NOTIFY_ACTION, REGISTRY_REPLY_ACTION, REGISTRY_REQUEST_ACTION,
    REGISTRY_SCHEMA_VERSION,
};

//! # Inter-Process Communication (IPC)
//!
//! This crate defines the message-passing primitives shared by every
//! process in the workspace.
//!
//! ## Philosophy
//!
//! - **Messages, not shared memory**: all communication is explicit message
//!   passing between process identities.
//! - **Typed, not stringly-typed**: envelopes carry an action and a schema
//!   version; payloads decode into concrete types.
//! - **Traceable**: every message has an ID, and replies correlate back to
//!   the request that caused them.
//!
//! ## Architecture
//!
//! The [`Envelope`] is the unit of delivery. It carries routing (`to`,
//! `from`), an action string for dispatch, a schema version for
//! compatibility checks, an optional correlation ID for request/response
//! matching, and a type-erased [`Payload`].

pub mod message;

pub use message::{Envelope, MessageId, Payload, SchemaVersion};

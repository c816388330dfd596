//! # Core Types
//!
//! This crate defines the fundamental identifiers used throughout the
//! registry workspace.
//!
//! ## Philosophy
//!
//! - **Explicit over implicit**: identities are typed and cannot be confused
//!   with one another.
//! - **No ambient authority**: a `ProcessId` names a process; it grants no
//!   power by itself.
//! - **Wire-ready**: every identifier serializes, so it can cross a message
//!   boundary unchanged.

pub mod ids;

pub use ids::ProcessId;

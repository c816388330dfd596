//! # Runtime API
//!
//! This crate defines the interface between the registry (and its clients)
//! and the host actor runtime.
//!
//! ## Philosophy
//!
//! The runtime provides **mechanisms**, not policies:
//! - Point-to-point messaging with per-pair FIFO ordering
//! - Liveness monitoring (asynchronous death notifications)
//! - Address resolution (opaque address to process identity)
//! - Time management (explicit, not ambient)
//!
//! ## Design Goals
//!
//! 1. **Testability**: the entire API can be implemented in-memory and
//!    driven deterministically
//! 2. **Explicitness**: no hidden state or ambient authority
//! 3. **Simplicity**: minimal surface area — exactly what the registry
//!    requires of its host, nothing more
//!
//! ## Non-Goals
//!
//! This is NOT:
//! - A full actor framework (no supervision trees, no spawning policy)
//! - A transport (implementations decide how messages move)
//! - POSIX (no signals, no files, no fork)

pub mod address;
pub mod error;
pub mod exit;
pub mod runtime;
pub mod time;

pub use address::Address;
pub use error::RuntimeError;
pub use exit::{Delivery, DownNotification, ExitReason, MonitorHandle};
pub use runtime::ProcessRuntime;
pub use time::{Deadline, Duration, Instant};

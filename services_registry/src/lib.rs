//! # Registry Service
//!
//! This crate implements the process registry: an authoritative, in-memory
//! directory binding application-defined keys to live process identities,
//! with lifecycle notifications for interested observers.
//!
//! ## Philosophy
//!
//! - **Single writer**: one actor owns every table. No locks, no shared
//!   memory; clients interact purely by message passing.
//! - **Liveness first**: death notifications are consumed ahead of client
//!   requests, so a dead owner is reaped before anyone can observe a stale
//!   binding.
//! - **Typed keys, not strings**: anything hashable, serializable, and
//!   printable can name a process.
//! - **Subscriptions are data**: observers register declarative event
//!   filters; the registry replays an already-satisfied registration at
//!   subscribe time so rendezvous never races.
//!
//! ## Structure
//!
//! - [`state`]: the invariantful tables (names, properties, monitors,
//!   monitored-pid sets, monotonic serial)
//! - [`server`]: the registry actor — dispatcher, registration engine,
//!   subscription engine, liveness reaper
//! - [`client`]: caller-side helpers — the verb API and the await
//!   rendezvous primitive
//! - [`config`]: bootstrap configuration

pub mod client;
pub mod config;
pub mod server;
pub mod state;

pub use client::{AwaitOutcome, ClientError, ClientTransport, RegistryClient};
pub use config::RegistryConfig;
pub use server::{RegistryFault, RegistryServer};
pub use state::{MonitorEntry, RegistryState, RegistryStats};

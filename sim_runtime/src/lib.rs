//! # Simulated Runtime
//!
//! A deterministic, in-memory implementation of the host-runtime contract.
//!
//! ## Philosophy
//!
//! - **Determinism first**: same inputs, same delivery order, same clock —
//!   every test run is reproducible.
//! - **No hidden concurrency**: processes are identities with mailboxes;
//!   the test (or a service driver) decides when each one runs.
//! - **Mechanism, not policy**: the runtime delivers, monitors, and keeps
//!   time; it never decides what a service does with a message.
//!
//! ## Core behaviors
//!
//! - [`SimRuntime::spawn`] creates a process with an empty two-lane
//!   mailbox; [`SimRuntime::bind`] publishes it under a name.
//! - [`SimRuntime::kill`] records the exit and fans a
//!   [`DownNotification`] out to every watcher's signal lane.
//! - [`SimRuntime::take_delivery`] pops the signal lane before the message
//!   lane, so death notifications always overtake queued requests.
//! - Messages sent to dead or unknown processes are dropped (and logged);
//!   senders needing liveness install a monitor instead.

pub mod mailbox;

pub use mailbox::{Mailbox, MailboxConfig, MailboxError};

use core_types::ProcessId;
use ipc::Envelope;
use runtime_api::time::{Duration, Instant};
use runtime_api::{
    Address, Delivery, DownNotification, ExitReason, MonitorHandle, ProcessRuntime, RuntimeError,
};
use services_logger::{LogBuffer, LogEntry};
use std::collections::HashMap;

/// One installed liveness monitor.
#[derive(Debug, Clone)]
struct Watch {
    handle: MonitorHandle,
    watcher: ProcessId,
}

/// Deterministic in-memory runtime.
pub struct SimRuntime {
    config: MailboxConfig,
    mailboxes: HashMap<ProcessId, Mailbox>,
    process_names: HashMap<ProcessId, String>,
    bound_names: HashMap<String, ProcessId>,
    watches: HashMap<ProcessId, Vec<Watch>>,
    exited: HashMap<ProcessId, ExitReason>,
    monitor_serial: u64,
    clock: Instant,
    log: LogBuffer,
}

impl SimRuntime {
    /// Creates a runtime with default mailbox configuration.
    pub fn new() -> Self {
        Self::with_config(MailboxConfig::default())
    }

    /// Creates a runtime with the given mailbox configuration.
    pub fn with_config(config: MailboxConfig) -> Self {
        Self {
            config,
            mailboxes: HashMap::new(),
            process_names: HashMap::new(),
            bound_names: HashMap::new(),
            watches: HashMap::new(),
            exited: HashMap::new(),
            monitor_serial: 0,
            clock: Instant::epoch(),
            log: LogBuffer::new(),
        }
    }

    /// Spawns a new process with an empty mailbox.
    ///
    /// The name is for diagnostics only; use [`bind`](Self::bind) to make
    /// the process addressable.
    pub fn spawn(&mut self, name: &str) -> ProcessId {
        let pid = ProcessId::new();
        self.mailboxes.insert(pid, Mailbox::with_config(self.config));
        self.process_names.insert(pid, name.to_string());
        self.log.push(
            LogEntry::debug("process spawned")
                .with_source(pid)
                .with_field("name", name),
        );
        pid
    }

    /// Binds a name in the address table.
    ///
    /// Bindings survive the death of the process they point at; resolution
    /// keeps returning the dead identity, and callers discover the death
    /// through monitoring.
    pub fn bind(&mut self, name: impl Into<String>, pid: ProcessId) {
        self.bound_names.insert(name.into(), pid);
    }

    /// Terminates a process.
    ///
    /// The mailbox is discarded, the exit reason is recorded, and every
    /// watcher receives a [`DownNotification`] on its signal lane. Killing
    /// an already-dead or unknown process is a no-op.
    pub fn kill(&mut self, pid: ProcessId, reason: ExitReason) {
        if self.mailboxes.remove(&pid).is_none() {
            return;
        }
        self.exited.insert(pid, reason.clone());
        self.log.push(
            LogEntry::info("process terminated")
                .with_source(pid)
                .with_field("reason", reason.to_string()),
        );

        let watches = self.watches.remove(&pid).unwrap_or_default();
        for watch in watches {
            self.deliver_signal(
                watch.watcher,
                DownNotification {
                    handle: watch.handle,
                    pid,
                    reason: reason.clone(),
                },
            );
        }
    }

    /// Pops the next delivery for a process, signals first.
    pub fn take_delivery(&mut self, pid: ProcessId) -> Option<Delivery> {
        self.mailboxes.get_mut(&pid).and_then(Mailbox::pop)
    }

    /// Returns the number of pending deliveries for a process.
    pub fn pending_count(&self, pid: ProcessId) -> usize {
        self.mailboxes.get(&pid).map_or(0, Mailbox::len)
    }

    /// Returns whether the process is alive.
    pub fn is_alive(&self, pid: ProcessId) -> bool {
        self.mailboxes.contains_key(&pid)
    }

    /// Returns the recorded exit reason, if the process has terminated.
    pub fn exit_reason(&self, pid: ProcessId) -> Option<&ExitReason> {
        self.exited.get(&pid)
    }

    /// Advances the virtual clock.
    pub fn advance(&mut self, delta: Duration) {
        self.clock = self.clock + delta;
    }

    /// Read access to the structured log.
    pub fn log_buffer(&self) -> &LogBuffer {
        &self.log
    }

    fn deliver_signal(&mut self, watcher: ProcessId, signal: DownNotification) {
        if let Some(mailbox) = self.mailboxes.get_mut(&watcher) {
            mailbox.push_signal(signal);
        }
    }

    fn next_monitor_handle(&mut self) -> MonitorHandle {
        self.monitor_serial += 1;
        MonitorHandle::from_serial(self.monitor_serial)
    }
}

impl Default for SimRuntime {
    fn default() -> Self {
        Self::new()
    }
}

impl ProcessRuntime for SimRuntime {
    fn send(&mut self, envelope: Envelope) -> Result<(), RuntimeError> {
        let to = envelope.to;
        match self.mailboxes.get_mut(&to) {
            Some(mailbox) => mailbox
                .push_message(envelope)
                .map_err(|MailboxError::Full| RuntimeError::MailboxFull { pid: to }),
            None => {
                // Fire-and-forget: the sender cannot tell a dead peer from
                // a slow one, so the message is silently discarded.
                self.log.push(
                    LogEntry::debug("message dropped: destination not alive")
                        .with_field("to", to.to_string())
                        .with_field("action", envelope.action),
                );
                Ok(())
            }
        }
    }

    fn monitor(&mut self, watcher: ProcessId, target: ProcessId) -> MonitorHandle {
        let handle = self.next_monitor_handle();
        if self.mailboxes.contains_key(&target) {
            self.watches
                .entry(target)
                .or_default()
                .push(Watch { handle, watcher });
        } else {
            // Dead-on-arrival: deliver the notification immediately with
            // the recorded reason, or NoSuchProcess for never-seen pids.
            let reason = self
                .exited
                .get(&target)
                .cloned()
                .unwrap_or(ExitReason::NoSuchProcess);
            self.deliver_signal(
                watcher,
                DownNotification {
                    handle,
                    pid: target,
                    reason,
                },
            );
        }
        handle
    }

    fn resolve(&self, address: &Address) -> Option<ProcessId> {
        match address {
            Address::Pid(pid) => Some(*pid),
            Address::Named(name) => self.bound_names.get(name).copied(),
        }
    }

    fn now(&self) -> Instant {
        self.clock
    }

    fn log(&mut self, entry: LogEntry) {
        self.log.push(entry);
    }
}

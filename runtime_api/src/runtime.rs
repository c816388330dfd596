//! The host-runtime trait

use crate::{Address, MonitorHandle, RuntimeError};
use crate::time::Instant;
use core_types::ProcessId;
use ipc::Envelope;
use services_logger::LogEntry;

/// The contract a host runtime offers to services running on it
///
/// Multiple implementations are possible:
/// - Simulated runtime (deterministic, for testing)
/// - A real single-node actor runtime
/// - A distributed runtime bridging nodes
///
/// # Guarantees implementations must uphold
///
/// **FIFO pairs**: messages between one sender and one receiver are
/// delivered in send order.
///
/// **Signal priority**: death notifications produced by [`monitor`] are
/// delivered ahead of ordinary messages queued for the same receiver.
///
/// **Fire-and-forget sends**: sending to a terminated process succeeds and
/// the message is discarded; senders that need liveness install a monitor.
///
/// [`monitor`]: ProcessRuntime::monitor
pub trait ProcessRuntime {
    /// Sends a message to the envelope's destination
    ///
    /// Non-blocking. Fails only if the destination mailbox is at capacity.
    fn send(&mut self, envelope: Envelope) -> Result<(), RuntimeError>;

    /// Installs a liveness monitor on `target` for `watcher`
    ///
    /// When `target` terminates, the runtime delivers a
    /// [`DownNotification`](crate::DownNotification) carrying the returned
    /// handle to `watcher`'s signal lane. Monitoring an already-dead or
    /// unknown process delivers the notification immediately.
    fn monitor(&mut self, watcher: ProcessId, target: ProcessId) -> MonitorHandle;

    /// Resolves an opaque address to a process identity
    fn resolve(&self, address: &Address) -> Option<ProcessId>;

    /// Returns the current time
    ///
    /// Explicit, never ambient: simulated runtimes control this for
    /// deterministic testing.
    fn now(&self) -> Instant;

    /// Records a structured log entry
    fn log(&mut self, entry: LogEntry);
}

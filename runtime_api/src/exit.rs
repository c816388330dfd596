//! Liveness signals: exit reasons, monitor handles, down notifications

use core_types::ProcessId;
use ipc::Envelope;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Exit reason for a process
///
/// Structured information about why a process terminated. Delivered inside
/// [`DownNotification`] to every watcher of the dead process.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ExitReason {
    /// Normal successful exit
    Normal,
    /// Forcibly terminated
    Killed { reason: String },
    /// Crashed with an error
    Failure { error: String },
    /// The node hosting the process became unreachable
    Disconnected,
    /// The monitored process was never known to the runtime
    NoSuchProcess,
}

impl fmt::Display for ExitReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExitReason::Normal => write!(f, "normal exit"),
            ExitReason::Killed { reason } => write!(f, "killed: {}", reason),
            ExitReason::Failure { error } => write!(f, "failed: {}", error),
            ExitReason::Disconnected => write!(f, "node disconnected"),
            ExitReason::NoSuchProcess => write!(f, "no such process"),
        }
    }
}

/// Handle identifying one liveness monitor
///
/// Returned when a monitor is installed; echoed back inside the resulting
/// [`DownNotification`] so a watcher holding several monitors can tell
/// which one fired.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MonitorHandle(u64);

impl MonitorHandle {
    /// Creates a handle from its raw serial
    pub fn from_serial(serial: u64) -> Self {
        Self(serial)
    }

    /// Returns the raw serial
    pub fn as_serial(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for MonitorHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "mon:{}", self.0)
    }
}

/// Death notification
///
/// Delivered asynchronously to a watcher when a monitored process
/// terminates. Runtimes deliver these ahead of ordinary messages so that
/// stale state referring to the dead process is cleaned up before any
/// further request can observe it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DownNotification {
    /// The monitor that fired
    pub handle: MonitorHandle,
    /// The process that terminated
    pub pid: ProcessId,
    /// Why it terminated
    pub reason: ExitReason,
}

/// One mailbox delivery
///
/// A process receives either a liveness signal or an ordinary message.
/// Signals always drain first.
#[derive(Debug, Clone)]
pub enum Delivery {
    /// A death notification from the signal lane
    Down(DownNotification),
    /// An ordinary message from the message lane
    Message(Envelope),
}

//! Runtime error types

use core_types::ProcessId;
use thiserror::Error;

/// Errors that can occur when interacting with the host runtime
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RuntimeError {
    /// The destination mailbox is at capacity
    #[error("mailbox full for {pid}")]
    MailboxFull { pid: ProcessId },

    /// A bound name could not be resolved
    #[error("address not bound: {0}")]
    Unbound(String),

    /// A receive timed out
    #[error("operation timed out")]
    Timeout,

    /// A receive could not complete
    #[error("receive failed: {0}")]
    ReceiveFailed(String),
}

//! Two-lane bounded mailbox for simulated processes.
//!
//! Provides deterministic FIFO ordering per lane, with the signal lane
//! always drained before the message lane.

use ipc::Envelope;
use runtime_api::{Delivery, DownNotification};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

/// Mailbox error types.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MailboxError {
    Full,
}

/// Mailbox configuration
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct MailboxConfig {
    /// Capacity of the ordinary message lane
    ///
    /// The signal lane is unbounded: liveness notifications must not be
    /// lost to backpressure.
    pub capacity: usize,
}

impl Default for MailboxConfig {
    fn default() -> Self {
        Self { capacity: 128 }
    }
}

/// Two-lane FIFO mailbox.
///
/// Death notifications land on the signal lane, ordinary envelopes on the
/// message lane. [`Mailbox::pop`] empties the signal lane first, which is
/// what gives liveness signals their priority over client requests.
#[derive(Debug)]
pub struct Mailbox {
    capacity: usize,
    signals: VecDeque<DownNotification>,
    messages: VecDeque<Envelope>,
}

impl Mailbox {
    /// Creates a mailbox with the specified message-lane capacity.
    pub fn with_config(config: MailboxConfig) -> Self {
        Self {
            capacity: config.capacity,
            signals: VecDeque::new(),
            messages: VecDeque::new(),
        }
    }

    /// Pushes a death notification onto the signal lane.
    pub fn push_signal(&mut self, signal: DownNotification) {
        self.signals.push_back(signal);
    }

    /// Pushes an envelope onto the message lane.
    pub fn push_message(&mut self, message: Envelope) -> Result<(), MailboxError> {
        if self.messages.len() >= self.capacity {
            return Err(MailboxError::Full);
        }
        self.messages.push_back(message);
        Ok(())
    }

    /// Pops the next delivery, signals first.
    pub fn pop(&mut self) -> Option<Delivery> {
        if let Some(signal) = self.signals.pop_front() {
            return Some(Delivery::Down(signal));
        }
        self.messages.pop_front().map(Delivery::Message)
    }

    /// Returns the total number of pending deliveries.
    pub fn len(&self) -> usize {
        self.signals.len() + self.messages.len()
    }

    /// Returns whether both lanes are empty.
    pub fn is_empty(&self) -> bool {
        self.signals.is_empty() && self.messages.is_empty()
    }
}

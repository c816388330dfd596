//! Message types and envelope structure

use core_types::ProcessId;
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Identity of one envelope
///
/// Every envelope is minted with a fresh ID, and a reply quotes the ID
/// of the request that caused it in its `correlation_id`. That quoting
/// is the whole request/reply mechanism: a caller matches answers to
/// calls by ID, nothing else.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MessageId(Uuid);

impl MessageId {
    /// Mints a fresh message ID
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Rebuilds a message ID from a UUID
    pub fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// The underlying UUID
    pub fn as_uuid(&self) -> Uuid {
        self.0
    }
}

impl Default for MessageId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for MessageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "msg:{}", self.0)
    }
}

/// Declared shape of an envelope's payload
///
/// Protocols evolve; mailboxes are full of envelopes from peers built at
/// different times. The version travels with every envelope so a decoder
/// can refuse payloads it does not understand instead of misreading
/// them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchemaVersion {
    /// Incremented when the payload shape changes incompatibly
    pub major: u32,
    /// Incremented for additions old decoders can safely ignore
    pub minor: u32,
}

impl SchemaVersion {
    /// Declares a schema version
    pub const fn new(major: u32, minor: u32) -> Self {
        Self { major, minor }
    }

    /// Whether a decoder built for `other` may read this payload
    ///
    /// Agreement on the major version is the whole gate; minor revisions
    /// are additive by contract and never block decoding.
    pub fn is_compatible_with(&self, other: &SchemaVersion) -> bool {
        self.major == other.major
    }
}

impl fmt::Display for SchemaVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "v{}.{}", self.major, self.minor)
    }
}

/// Message envelope containing routing and metadata
///
/// This is the outer wrapper for all point-to-point messages. Delivery is
/// addressed by process identity on both ends; the actual payload is
/// type-erased so mailboxes can carry any message family.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Envelope {
    /// Unique identifier for this message
    pub id: MessageId,
    /// Destination process
    pub to: ProcessId,
    /// Sending process
    ///
    /// Callers are identified by this field; request handlers derive the
    /// reply destination from it.
    pub from: ProcessId,
    /// Action or method to invoke
    pub action: String,
    /// Schema version of the payload
    pub schema_version: SchemaVersion,
    /// Correlation ID for request/response matching
    pub correlation_id: Option<MessageId>,
    /// Serialized payload (type-erased)
    pub payload: Payload,
}

impl Envelope {
    /// Creates a new message envelope
    pub fn new(
        to: ProcessId,
        from: ProcessId,
        action: impl Into<String>,
        schema_version: SchemaVersion,
        payload: Payload,
    ) -> Self {
        Self {
            id: MessageId::new(),
            to,
            from,
            action: action.into(),
            schema_version,
            correlation_id: None,
            payload,
        }
    }

    /// Sets the correlation ID (for responses)
    pub fn with_correlation(mut self, correlation_id: MessageId) -> Self {
        self.correlation_id = Some(correlation_id);
        self
    }

    /// Checks if this is a response to another message
    pub fn is_reply(&self) -> bool {
        self.correlation_id.is_some()
    }
}

/// Type-erased message payload
///
/// Serialization is the workspace standard (JSON via serde); the envelope
/// does not care what it carries.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Payload {
    /// Serialized data
    data: Vec<u8>,
}

impl Payload {
    /// Creates a new payload from serializable data
    pub fn new<T: Serialize>(data: &T) -> Result<Self, serde_json::Error> {
        let json = serde_json::to_vec(data)?;
        Ok(Self { data: json })
    }

    /// Deserializes the payload into a specific type
    pub fn deserialize<T: for<'de> Deserialize<'de>>(&self) -> Result<T, serde_json::Error> {
        serde_json::from_slice(&self.data)
    }

    /// Returns the raw bytes
    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }
}

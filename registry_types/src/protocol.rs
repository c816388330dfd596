//! Registry wire protocol: requests, replies, and the envelope codec
//!
//! Every message the registry exchanges is a typed payload behind one of
//! three envelope actions. The codec validates action and schema version
//! on decode, so handlers only ever see well-formed requests.

use crate::event::{EventFilter, KeyMonitorNotification, MonitorRef};
use crate::key::{Key, Keyable};
use core_types::ProcessId;
use ipc::{Envelope, MessageId, Payload, SchemaVersion};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Envelope action for registry requests.
pub const REGISTRY_REQUEST_ACTION: &str = "registry.call.request";

/// Envelope action for registry replies.
pub const REGISTRY_REPLY_ACTION: &str = "registry.call.reply";

/// Envelope action for key-monitor notifications.
pub const REGISTRY_NOTIFY_ACTION: &str = "registry.monitor.notify";

/// Registry protocol schema version (v1.0).
pub const REGISTRY_SCHEMA_VERSION: SchemaVersion = SchemaVersion::new(1, 0);

/// Requests a client can address to the registry
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(bound(serialize = "K: Serialize", deserialize = "K: DeserializeOwned"))]
pub enum RegistryRequest<K> {
    /// Bind a key to the owner named in its scope
    Register { key: Key<K> },
    /// Unbind a key, authorized by the owner named in its scope
    Unregister { key: Key<K> },
    /// Read the current owner of an alias key
    Lookup { key: Key<K> },
    /// Enumerate the alias keys owned by a process
    OwnedNames { owner: ProcessId },
    /// Subscribe to update events for a key
    Monitor { key: Key<K>, filter: EventFilter },
    /// Ask for a point-in-time snapshot, delivered to `reply_to`
    Query {
        reply_to: ProcessId,
        target: QueryTarget,
    },
}

/// Which table a snapshot query targets
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum QueryTarget {
    /// The alias-name table
    Names,
    /// The per-process property table (not implemented)
    Properties,
}

/// Result of a registration attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RegisterOutcome {
    /// The key is bound to the requested owner (possibly already was)
    Registered,
    /// A different process owns the key; nothing changed
    AlreadyRegistered,
}

/// Result of an unregistration attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum UnregisterOutcome {
    /// The key was unbound
    Unregistered,
    /// The caller does not own the key; nothing changed
    NotOwner,
    /// The key was not bound
    NotFound,
}

/// Replies the registry sends back to callers
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(bound(serialize = "K: Serialize", deserialize = "K: DeserializeOwned"))]
pub enum RegistryReply<K> {
    Register(RegisterOutcome),
    Unregister(UnregisterOutcome),
    Lookup(Option<ProcessId>),
    OwnedNames(Vec<K>),
    Monitor(MonitorRef),
    /// Point-in-time copy of the name table
    Snapshot(Vec<(K, ProcessId)>),
}

/// Errors when encoding or decoding registry messages
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CodecError {
    #[error("unexpected action: {0}")]
    UnexpectedAction(String),

    #[error("schema mismatch: expected {expected}, got {actual}")]
    SchemaMismatch {
        expected: SchemaVersion,
        actual: SchemaVersion,
    },

    #[error("payload error: {0}")]
    Payload(String),
}

/// Encoder/decoder for registry protocol envelopes
#[derive(Debug, Clone, Copy, Default)]
pub struct RegistryCodec;

impl RegistryCodec {
    /// Creates a codec
    pub fn new() -> Self {
        Self
    }

    /// Encodes a request addressed to the registry
    pub fn encode_request<K: Keyable>(
        &self,
        to: ProcessId,
        from: ProcessId,
        request: &RegistryRequest<K>,
    ) -> Result<Envelope, CodecError> {
        let payload =
            Payload::new(request).map_err(|err| CodecError::Payload(err.to_string()))?;
        Ok(Envelope::new(
            to,
            from,
            REGISTRY_REQUEST_ACTION,
            REGISTRY_SCHEMA_VERSION,
            payload,
        ))
    }

    /// Encodes a reply correlated with its request
    pub fn encode_reply<K: Keyable>(
        &self,
        to: ProcessId,
        from: ProcessId,
        reply: &RegistryReply<K>,
        correlation_id: MessageId,
    ) -> Result<Envelope, CodecError> {
        let payload = Payload::new(reply).map_err(|err| CodecError::Payload(err.to_string()))?;
        Ok(Envelope::new(
            to,
            from,
            REGISTRY_REPLY_ACTION,
            REGISTRY_SCHEMA_VERSION,
            payload,
        )
        .with_correlation(correlation_id))
    }

    /// Encodes a key-monitor notification
    pub fn encode_notification<K: Keyable>(
        &self,
        to: ProcessId,
        from: ProcessId,
        notification: &KeyMonitorNotification<K>,
    ) -> Result<Envelope, CodecError> {
        let payload =
            Payload::new(notification).map_err(|err| CodecError::Payload(err.to_string()))?;
        Ok(Envelope::new(
            to,
            from,
            REGISTRY_NOTIFY_ACTION,
            REGISTRY_SCHEMA_VERSION,
            payload,
        ))
    }

    /// Decodes a request, validating action and schema version
    pub fn decode_request<K: Keyable>(
        &self,
        envelope: &Envelope,
    ) -> Result<RegistryRequest<K>, CodecError> {
        self.check(envelope, REGISTRY_REQUEST_ACTION)?;
        envelope
            .payload
            .deserialize::<RegistryRequest<K>>()
            .map_err(|err| CodecError::Payload(err.to_string()))
    }

    /// Decodes a reply, validating action and schema version
    pub fn decode_reply<K: Keyable>(
        &self,
        envelope: &Envelope,
    ) -> Result<RegistryReply<K>, CodecError> {
        self.check(envelope, REGISTRY_REPLY_ACTION)?;
        envelope
            .payload
            .deserialize::<RegistryReply<K>>()
            .map_err(|err| CodecError::Payload(err.to_string()))
    }

    /// Decodes a notification, validating action and schema version
    pub fn decode_notification<K: Keyable>(
        &self,
        envelope: &Envelope,
    ) -> Result<KeyMonitorNotification<K>, CodecError> {
        self.check(envelope, REGISTRY_NOTIFY_ACTION)?;
        envelope
            .payload
            .deserialize::<KeyMonitorNotification<K>>()
            .map_err(|err| CodecError::Payload(err.to_string()))
    }

    fn check(&self, envelope: &Envelope, action: &str) -> Result<(), CodecError> {
        if envelope.action != action {
            return Err(CodecError::UnexpectedAction(envelope.action.clone()));
        }
        if !envelope
            .schema_version
            .is_compatible_with(&REGISTRY_SCHEMA_VERSION)
        {
            return Err(CodecError::SchemaMismatch {
                expected: REGISTRY_SCHEMA_VERSION,
                actual: envelope.schema_version,
            });
        }
        Ok(())
    }
}

//! Caller-side helpers
//!
//! The registry is just an actor; this module gives callers a typed verb
//! API over the wire protocol, plus the await primitive that blocks until
//! a key becomes registered.
//!
//! Everything is written against [`ClientTransport`], a small capability
//! bundling what a caller needs from its host: its own identity, send,
//! selective receive with timeout, liveness monitoring, and address
//! resolution.

use core_types::ProcessId;
use ipc::Envelope;
use registry_types::{
    CodecError, EventFilter, EventMask, Key, KeyMonitorNotification, KeyUpdateEvent, Keyable,
    MonitorRef, QueryTarget, RegisterOutcome, RegistryCodec, RegistryReply, RegistryRequest,
    UnregisterOutcome, REGISTRY_NOTIFY_ACTION,
};
use runtime_api::time::{Deadline, Duration, Instant};
use runtime_api::{Address, Delivery, ExitReason, MonitorHandle, RuntimeError};
use std::collections::VecDeque;
use std::marker::PhantomData;
use thiserror::Error;

/// Default patience for request/reply calls
const DEFAULT_CALL_TIMEOUT: Duration = Duration::from_secs(5);

/// What a caller requires of its host runtime
pub trait ClientTransport {
    /// The calling process's own identity
    fn self_pid(&self) -> ProcessId;

    /// Sends a message
    fn send(&mut self, envelope: Envelope) -> Result<(), RuntimeError>;

    /// Receives the next delivery, waiting up to `timeout`
    ///
    /// `None` waits indefinitely. Implementations return
    /// [`RuntimeError::Timeout`] when the wait elapses.
    fn receive(&mut self, timeout: Option<Duration>) -> Result<Delivery, RuntimeError>;

    /// Installs a liveness monitor on `target` for the calling process
    fn monitor(&mut self, target: ProcessId) -> MonitorHandle;

    /// Resolves an opaque address
    fn resolve(&self, address: &Address) -> Option<ProcessId>;

    /// The current time, for deadline arithmetic
    fn now(&self) -> Instant;
}

/// Errors surfaced to callers
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ClientError {
    /// The registry address does not resolve to a process
    #[error("registry address could not be resolved: {0}")]
    Unresolvable(Address),

    /// No reply arrived in time
    ///
    /// Also how precondition-violating requests surface: the registry
    /// leaves them unanswered.
    #[error("call timed out")]
    Timeout,

    /// A message failed to encode or decode
    #[error("codec failure: {0}")]
    Codec(#[from] CodecError),

    /// The transport failed outright
    #[error("transport failure: {0}")]
    Transport(RuntimeError),

    /// The registry answered with the wrong reply variant
    #[error("unexpected reply variant")]
    UnexpectedReply,
}

/// Result of an await rendezvous
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AwaitOutcome<K> {
    /// The key is registered
    Registered { key: K, owner: ProcessId },
    /// The registry itself died while we were waiting
    ServerUnreachable { reason: ExitReason },
    /// The wait elapsed
    TimedOut,
}

/// Typed client handle for one registry
pub struct RegistryClient<K: Keyable, T: ClientTransport> {
    transport: T,
    registry: Address,
    call_timeout: Duration,
    codec: RegistryCodec,
    /// Deliveries consumed while waiting for a correlated reply; replayed
    /// to later waits so selective receive loses nothing it may need.
    stash: VecDeque<Delivery>,
    _key: PhantomData<K>,
}

impl<K: Keyable, T: ClientTransport> RegistryClient<K, T> {
    /// Creates a client talking to the registry at `registry`
    pub fn new(transport: T, registry: Address) -> Self {
        Self {
            transport,
            registry,
            call_timeout: DEFAULT_CALL_TIMEOUT,
            codec: RegistryCodec::new(),
            stash: VecDeque::new(),
            _key: PhantomData,
        }
    }

    /// Overrides the request/reply patience
    pub fn with_call_timeout(mut self, timeout: Duration) -> Self {
        self.call_timeout = timeout;
        self
    }

    /// Gives back the transport
    pub fn into_transport(self) -> T {
        self.transport
    }

    // ---- verbs ----------------------------------------------------------

    /// Registers the calling process under `id`
    pub fn register(&mut self, id: K) -> Result<RegisterOutcome, ClientError> {
        let me = self.transport.self_pid();
        self.register_for(id, me)
    }

    /// Registers an explicit owner under `id`
    pub fn register_for(&mut self, id: K, owner: ProcessId) -> Result<RegisterOutcome, ClientError> {
        match self.call(RegistryRequest::Register {
            key: Key::alias_owned_by(id, owner),
        })? {
            RegistryReply::Register(outcome) => Ok(outcome),
            _ => Err(ClientError::UnexpectedReply),
        }
    }

    /// Unregisters a name owned by the calling process
    pub fn unregister(&mut self, id: K) -> Result<UnregisterOutcome, ClientError> {
        let me = self.transport.self_pid();
        match self.call(RegistryRequest::Unregister {
            key: Key::alias_owned_by(id, me),
        })? {
            RegistryReply::Unregister(outcome) => Ok(outcome),
            _ => Err(ClientError::UnexpectedReply),
        }
    }

    /// Reads the current owner of `id`
    pub fn lookup(&mut self, id: K) -> Result<Option<ProcessId>, ClientError> {
        match self.call(RegistryRequest::Lookup {
            key: Key::alias(id),
        })? {
            RegistryReply::Lookup(owner) => Ok(owner),
            _ => Err(ClientError::UnexpectedReply),
        }
    }

    /// Enumerates the names owned by `owner`
    pub fn owned_names(&mut self, owner: ProcessId) -> Result<Vec<K>, ClientError> {
        match self.call(RegistryRequest::OwnedNames { owner })? {
            RegistryReply::OwnedNames(names) => Ok(names),
            _ => Err(ClientError::UnexpectedReply),
        }
    }

    /// Subscribes to update events for `key`
    pub fn monitor(&mut self, key: Key<K>, filter: EventFilter) -> Result<MonitorRef, ClientError> {
        match self.call(RegistryRequest::Monitor { key, filter })? {
            RegistryReply::Monitor(reference) => Ok(reference),
            _ => Err(ClientError::UnexpectedReply),
        }
    }

    /// Subscribes to every event for the alias `id`
    pub fn monitor_name(&mut self, id: K) -> Result<MonitorRef, ClientError> {
        self.monitor(Key::alias(id), EventFilter::all())
    }

    /// Folds over a consistent snapshot of the name table
    ///
    /// The registry copies its whole table under its single-writer
    /// boundary and ships it over; the fold runs locally.
    pub fn fold_names<A, F>(&mut self, seed: A, fold: F) -> Result<A, ClientError>
    where
        F: FnMut(A, (K, ProcessId)) -> A,
    {
        let me = self.transport.self_pid();
        match self.call(RegistryRequest::Query {
            reply_to: me,
            target: QueryTarget::Names,
        })? {
            RegistryReply::Snapshot(entries) => Ok(entries.into_iter().fold(seed, fold)),
            _ => Err(ClientError::UnexpectedReply),
        }
    }

    /// Blocks until `id` is registered
    ///
    /// Correct regardless of whether the registration happened before or
    /// after the call, thanks to replay-on-subscribe.
    pub fn await_registered(&mut self, id: K) -> Result<AwaitOutcome<K>, ClientError> {
        self.await_inner(id, None)
    }

    /// Blocks until `id` is registered, giving up after `delay`
    pub fn await_registered_timeout(
        &mut self,
        id: K,
        delay: Duration,
    ) -> Result<AwaitOutcome<K>, ClientError> {
        self.await_inner(id, Some(delay))
    }

    /// Takes the next key-monitor notification delivered to this client
    ///
    /// Stashed deliveries are checked first, then the transport is polled
    /// without waiting. Non-notification deliveries encountered along the
    /// way are discarded. Returns `None` when nothing is pending.
    pub fn poll_notification(
        &mut self,
    ) -> Result<Option<KeyMonitorNotification<K>>, ClientError> {
        loop {
            let delivery = match self.stash.pop_front() {
                Some(stashed) => stashed,
                None => match self.transport.receive(Some(Duration::ZERO)) {
                    Ok(delivery) => delivery,
                    Err(RuntimeError::Timeout) | Err(RuntimeError::ReceiveFailed(_)) => {
                        return Ok(None)
                    }
                    Err(err) => return Err(ClientError::Transport(err)),
                },
            };
            if let Delivery::Message(envelope) = &delivery {
                if envelope.action == REGISTRY_NOTIFY_ACTION {
                    return self
                        .codec
                        .decode_notification(envelope)
                        .map(Some)
                        .map_err(ClientError::from);
                }
            }
        }
    }

    // ---- await composition ----------------------------------------------

    fn await_inner(
        &mut self,
        id: K,
        delay: Option<Duration>,
    ) -> Result<AwaitOutcome<K>, ClientError> {
        let registry = match self.transport.resolve(&self.registry) {
            Some(pid) => pid,
            None => return Err(ClientError::Unresolvable(self.registry.clone())),
        };

        // Watch the registry itself: a dead server must be distinguishable
        // from a key that never arrives.
        let registry_watch = self.transport.monitor(registry);

        let reference = match self.monitor(
            Key::alias(id.clone()),
            EventFilter::only([EventMask::OnRegistered]),
        ) {
            Ok(reference) => reference,
            Err(ClientError::Timeout) => {
                // The registry may have died instead of replying.
                match self.take_registry_down(registry) {
                    Some(reason) => return Ok(AwaitOutcome::ServerUnreachable { reason }),
                    None => return Err(ClientError::Timeout),
                }
            }
            Err(err) => return Err(err),
        };

        let deadline = delay.map(|d| Deadline::after(self.transport.now(), d));
        loop {
            let delivery = match self.stash.pop_front() {
                Some(stashed) => stashed,
                None => {
                    let timeout = match deadline {
                        Some(deadline) => {
                            let now = self.transport.now();
                            if deadline.is_expired(now) {
                                return Ok(AwaitOutcome::TimedOut);
                            }
                            Some(deadline.remaining(now))
                        }
                        None => None,
                    };
                    match self.transport.receive(timeout) {
                        Ok(delivery) => delivery,
                        Err(RuntimeError::Timeout) => return Ok(AwaitOutcome::TimedOut),
                        Err(err) => return Err(ClientError::Transport(err)),
                    }
                }
            };

            match delivery {
                Delivery::Down(down) if down.handle == registry_watch || down.pid == registry => {
                    return Ok(AwaitOutcome::ServerUnreachable {
                        reason: down.reason,
                    });
                }
                Delivery::Message(envelope) if envelope.action == REGISTRY_NOTIFY_ACTION => {
                    let note: KeyMonitorNotification<K> =
                        self.codec.decode_notification(&envelope)?;
                    if note.reference == reference && note.key == id {
                        if let KeyUpdateEvent::Registered { owner } = note.event {
                            return Ok(AwaitOutcome::Registered { key: id, owner });
                        }
                    }
                }
                _ => {
                    // Not ours; a blocked await consumes and discards
                    // unrelated deliveries, like any selective receive.
                }
            }
        }
    }

    fn take_registry_down(&mut self, registry: ProcessId) -> Option<ExitReason> {
        let position = self
            .stash
            .iter()
            .position(|delivery| matches!(delivery, Delivery::Down(down) if down.pid == registry))?;
        match self.stash.remove(position) {
            Some(Delivery::Down(down)) => Some(down.reason),
            _ => None,
        }
    }

    // ---- request/reply --------------------------------------------------

    fn call(&mut self, request: RegistryRequest<K>) -> Result<RegistryReply<K>, ClientError> {
        let registry = match self.transport.resolve(&self.registry) {
            Some(pid) => pid,
            None => return Err(ClientError::Unresolvable(self.registry.clone())),
        };
        let envelope =
            self.codec
                .encode_request(registry, self.transport.self_pid(), &request)?;
        let call_id = envelope.id;
        self.transport
            .send(envelope)
            .map_err(ClientError::Transport)?;

        let deadline = Deadline::after(self.transport.now(), self.call_timeout);
        loop {
            let now = self.transport.now();
            if deadline.is_expired(now) {
                return Err(ClientError::Timeout);
            }
            let delivery = match self.transport.receive(Some(deadline.remaining(now))) {
                Ok(delivery) => delivery,
                Err(RuntimeError::Timeout) => return Err(ClientError::Timeout),
                Err(err) => return Err(ClientError::Transport(err)),
            };
            match delivery {
                Delivery::Message(envelope) if envelope.correlation_id == Some(call_id) => {
                    return self.codec.decode_reply(&envelope).map_err(ClientError::from);
                }
                other => self.stash.push_back(other),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use runtime_api::time::Instant;

    /// Scripted transport: replies are queued by the test, sends are
    /// recorded for inspection.
    struct ScriptedTransport {
        pid: ProcessId,
        registry: ProcessId,
        clock: Instant,
        sent: Vec<Envelope>,
        monitors: Vec<ProcessId>,
        script: VecDeque<Step>,
        pending: VecDeque<Delivery>,
        resolvable: bool,
    }

    enum Step {
        /// Answer the next request with this reply
        Reply(RegistryReply<String>),
        /// Answer the next request with this reply, preceded by a
        /// notification (the replay-on-subscribe shape)
        ReplyAfterNotify(RegistryReply<String>, KeyMonitorNotification<String>),
        /// Answer the next request with silence followed by a down signal
        DownInsteadOfReply(ExitReason),
    }

    impl ScriptedTransport {
        fn new() -> Self {
            Self {
                pid: ProcessId::new(),
                registry: ProcessId::new(),
                clock: Instant::epoch(),
                sent: Vec::new(),
                monitors: Vec::new(),
                script: VecDeque::new(),
                pending: VecDeque::new(),
                resolvable: true,
            }
        }

        fn push_step(&mut self, step: Step) {
            self.script.push_back(step);
        }

        fn notify(&mut self, note: KeyMonitorNotification<String>) -> Delivery {
            let codec = RegistryCodec::new();
            Delivery::Message(
                codec
                    .encode_notification(self.pid, self.registry, &note)
                    .unwrap(),
            )
        }
    }

    impl ClientTransport for ScriptedTransport {
        fn self_pid(&self) -> ProcessId {
            self.pid
        }

        fn send(&mut self, envelope: Envelope) -> Result<(), RuntimeError> {
            let request_id = envelope.id;
            self.sent.push(envelope);
            let codec = RegistryCodec::new();
            match self.script.pop_front() {
                Some(Step::Reply(reply)) => {
                    let env = codec
                        .encode_reply(self.pid, self.registry, &reply, request_id)
                        .unwrap();
                    self.pending.push_back(Delivery::Message(env));
                }
                Some(Step::ReplyAfterNotify(reply, note)) => {
                    let notification = self.notify(note);
                    self.pending.push_back(notification);
                    let env = codec
                        .encode_reply(self.pid, self.registry, &reply, request_id)
                        .unwrap();
                    self.pending.push_back(Delivery::Message(env));
                }
                Some(Step::DownInsteadOfReply(reason)) => {
                    self.pending.push_back(Delivery::Down(
                        runtime_api::DownNotification {
                            handle: MonitorHandle::from_serial(99),
                            pid: self.registry,
                            reason,
                        },
                    ));
                }
                None => {}
            }
            Ok(())
        }

        fn receive(&mut self, timeout: Option<Duration>) -> Result<Delivery, RuntimeError> {
            if let Some(delivery) = self.pending.pop_front() {
                return Ok(delivery);
            }
            match timeout {
                Some(wait) => {
                    self.clock = self.clock + wait;
                    Err(RuntimeError::Timeout)
                }
                None => Err(RuntimeError::ReceiveFailed(
                    "mailbox empty; would block forever".to_string(),
                )),
            }
        }

        fn monitor(&mut self, target: ProcessId) -> MonitorHandle {
            self.monitors.push(target);
            MonitorHandle::from_serial(self.monitors.len() as u64)
        }

        fn resolve(&self, address: &Address) -> Option<ProcessId> {
            match address {
                Address::Pid(pid) => Some(*pid),
                Address::Named(_) if self.resolvable => Some(self.registry),
                Address::Named(_) => None,
            }
        }

        fn now(&self) -> Instant {
            self.clock
        }
    }

    fn client(transport: ScriptedTransport) -> RegistryClient<String, ScriptedTransport> {
        RegistryClient::new(transport, Address::named("registry"))
    }

    #[test]
    fn test_register_round_trip() {
        let mut transport = ScriptedTransport::new();
        transport.push_step(Step::Reply(RegistryReply::Register(
            RegisterOutcome::Registered,
        )));
        let mut client = client(transport);

        let outcome = client.register("db".to_string()).unwrap();
        assert_eq!(outcome, RegisterOutcome::Registered);

        let transport = client.into_transport();
        assert_eq!(transport.sent.len(), 1);
        let codec = RegistryCodec::new();
        match codec
            .decode_request::<String>(&transport.sent[0])
            .unwrap()
        {
            RegistryRequest::Register { key } => {
                assert_eq!(key.id, "db");
                assert_eq!(key.scope, Some(transport.pid));
            }
            other => panic!("unexpected request: {:?}", other),
        }
    }

    #[test]
    fn test_unanswered_call_times_out() {
        let transport = ScriptedTransport::new();
        let mut client =
            client(transport).with_call_timeout(Duration::from_millis(50));

        let result = client.lookup("db".to_string());
        assert_eq!(result, Err(ClientError::Timeout));
    }

    #[test]
    fn test_wrong_reply_variant_is_rejected() {
        let mut transport = ScriptedTransport::new();
        transport.push_step(Step::Reply(RegistryReply::Lookup(None)));
        let mut client = client(transport);

        let result = client.register("db".to_string());
        assert_eq!(result, Err(ClientError::UnexpectedReply));
    }

    #[test]
    fn test_unresolvable_registry_address() {
        let mut transport = ScriptedTransport::new();
        transport.resolvable = false;
        let mut client = client(transport);

        let result = client.lookup("db".to_string());
        assert!(matches!(result, Err(ClientError::Unresolvable(_))));
    }

    #[test]
    fn test_fold_names_folds_snapshot_locally() {
        let owner = ProcessId::new();
        let mut transport = ScriptedTransport::new();
        transport.push_step(Step::Reply(RegistryReply::Snapshot(vec![
            ("one".to_string(), owner),
            ("two".to_string(), owner),
        ])));
        let mut client = client(transport);

        let count = client.fold_names(0usize, |acc, _| acc + 1).unwrap();
        assert_eq!(count, 2);
    }

    #[test]
    fn test_await_resolves_replayed_registration() {
        let owner = ProcessId::new();
        let mut transport = ScriptedTransport::new();
        let subscriber = transport.pid;
        let reference = MonitorRef {
            subscriber,
            serial: 2,
        };
        transport.push_step(Step::ReplyAfterNotify(
            RegistryReply::Monitor(reference),
            KeyMonitorNotification {
                key: "db".to_string(),
                reference,
                event: KeyUpdateEvent::Registered { owner },
            },
        ));
        let mut client = client(transport);

        let outcome = client.await_registered("db".to_string()).unwrap();
        assert_eq!(
            outcome,
            AwaitOutcome::Registered {
                key: "db".to_string(),
                owner
            }
        );

        // The registry itself was monitored before subscribing.
        let transport = client.into_transport();
        assert_eq!(transport.monitors, vec![transport.registry]);
    }

    #[test]
    fn test_await_timeout_elapses() {
        let mut transport = ScriptedTransport::new();
        let reference = MonitorRef {
            subscriber: transport.pid,
            serial: 2,
        };
        transport.push_step(Step::Reply(RegistryReply::Monitor(reference)));
        let mut client = client(transport);

        let outcome = client
            .await_registered_timeout("db".to_string(), Duration::from_millis(20))
            .unwrap();
        assert_eq!(outcome, AwaitOutcome::TimedOut);
    }

    #[test]
    fn test_await_detects_dead_registry() {
        let mut transport = ScriptedTransport::new();
        transport.push_step(Step::DownInsteadOfReply(ExitReason::Killed {
            reason: "crashed".to_string(),
        }));
        let mut client =
            client(transport).with_call_timeout(Duration::from_millis(50));

        let outcome = client.await_registered("db".to_string()).unwrap();
        assert_eq!(
            outcome,
            AwaitOutcome::ServerUnreachable {
                reason: ExitReason::Killed {
                    reason: "crashed".to_string()
                }
            }
        );
    }

    #[test]
    fn test_ignored_events_do_not_resolve_await() {
        let mut transport = ScriptedTransport::new();
        let reference = MonitorRef {
            subscriber: transport.pid,
            serial: 2,
        };
        // A notification for some other subscription arrives first.
        transport.push_step(Step::ReplyAfterNotify(
            RegistryReply::Monitor(reference),
            KeyMonitorNotification {
                key: "db".to_string(),
                reference: MonitorRef {
                    subscriber: transport.pid,
                    serial: 77,
                },
                event: KeyUpdateEvent::Registered {
                    owner: ProcessId::new(),
                },
            },
        ));
        let mut client = client(transport);

        let outcome = client
            .await_registered_timeout("db".to_string(), Duration::from_millis(20))
            .unwrap();
        assert_eq!(outcome, AwaitOutcome::TimedOut);
    }
}

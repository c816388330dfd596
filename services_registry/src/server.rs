//! The registry actor
//!
//! A single-consumer event loop: the driver feeds one delivery at a time
//! into [`RegistryServer::handle`], which runs to completion before the
//! next delivery is taken. Death notifications arrive on the signal lane
//! and are therefore consumed ahead of client requests.

use crate::state::{MonitorEntry, RegistryState, RegistryStats};
use core_types::ProcessId;
use ipc::Envelope;
use registry_types::{
    EventFilter, EventMask, Key, KeyKind, KeyMonitorNotification, KeyUpdateEvent, Keyable,
    MonitorRef, QueryTarget, RegisterOutcome, RegistryCodec, RegistryReply, RegistryRequest,
    UnregisterOutcome,
};
use runtime_api::{Delivery, DownNotification, ExitReason, ProcessRuntime};
use services_logger::LogEntry;
use thiserror::Error;

/// Faults that terminate the registry actor
///
/// A fault is not a reply: the driver is expected to kill the registry
/// process, and clients discover the death through their liveness
/// monitors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryFault {
    /// Snapshotting the property table is not implemented
    #[error("property snapshots are not implemented")]
    PropertySnapshot,
}

/// The registry actor: state plus handlers
pub struct RegistryServer<K: Keyable, V> {
    pid: ProcessId,
    codec: RegistryCodec,
    state: RegistryState<K, V>,
}

impl<K: Keyable, V> RegistryServer<K, V> {
    /// Creates a registry actor with empty tables
    pub fn new(pid: ProcessId) -> Self {
        Self {
            pid,
            codec: RegistryCodec::new(),
            state: RegistryState::new(),
        }
    }

    /// The registry's own process identity
    pub fn pid(&self) -> ProcessId {
        self.pid
    }

    /// Current table sizes
    pub fn stats(&self) -> RegistryStats {
        self.state.stats()
    }

    /// Processes one mailbox delivery to completion
    ///
    /// An `Err` is fatal: the actor must not continue, and the driver
    /// should terminate its process.
    pub fn handle(
        &mut self,
        delivery: Delivery,
        rt: &mut dyn ProcessRuntime,
    ) -> Result<(), RegistryFault> {
        match delivery {
            Delivery::Down(down) => {
                self.reap(down, rt);
                Ok(())
            }
            Delivery::Message(envelope) => self.dispatch(envelope, rt),
        }
    }

    // ---- dispatcher -----------------------------------------------------

    fn dispatch(
        &mut self,
        envelope: Envelope,
        rt: &mut dyn ProcessRuntime,
    ) -> Result<(), RegistryFault> {
        let request: RegistryRequest<K> = match self.codec.decode_request(&envelope) {
            Ok(request) => request,
            Err(err) => {
                rt.log(
                    LogEntry::warn("dropping undecodable request")
                        .with_source(self.pid)
                        .with_field("from", envelope.from.to_string())
                        .with_field("error", err.to_string()),
                );
                return Ok(());
            }
        };

        match request {
            RegistryRequest::Register { key } => {
                // Precondition: alias kind, scoped to an owner. Property
                // registration is accepted on the wire but its handler is
                // deferred; the request goes unanswered either way.
                let (id, owner) = match (key.kind, key.scope) {
                    (KeyKind::Alias, Some(owner)) => (key.id, owner),
                    _ => {
                        self.reject("register", &key, rt);
                        return Ok(());
                    }
                };
                let outcome = self.register(id, owner, rt);
                self.reply(&envelope, &RegistryReply::Register(outcome), rt);
            }
            RegistryRequest::Unregister { key } => {
                let (id, caller) = match (key.kind, key.scope) {
                    (KeyKind::Alias, Some(caller)) => (key.id, caller),
                    _ => {
                        self.reject("unregister", &key, rt);
                        return Ok(());
                    }
                };
                let outcome = self.unregister(id, caller, rt);
                self.reply(&envelope, &RegistryReply::Unregister(outcome), rt);
            }
            RegistryRequest::Lookup { key } => {
                if !key.is_alias() {
                    self.reject("lookup", &key, rt);
                    return Ok(());
                }
                let owner = self.state.lookup(&key.id);
                self.reply(&envelope, &RegistryReply::Lookup(owner), rt);
            }
            RegistryRequest::OwnedNames { owner } => {
                let names = self.state.names_owned_by(owner);
                self.reply(&envelope, &RegistryReply::OwnedNames(names), rt);
            }
            RegistryRequest::Monitor { key, filter } => {
                let reference = self.monitor(envelope.from, key, filter, rt);
                self.reply(&envelope, &RegistryReply::Monitor(reference), rt);
            }
            RegistryRequest::Query { reply_to, target } => match target {
                QueryTarget::Names => {
                    // Snapshot under the actor's consistency boundary: the
                    // copy reflects one point in time by construction.
                    let snapshot = self.state.snapshot_names();
                    let reply = RegistryReply::Snapshot(snapshot);
                    match self
                        .codec
                        .encode_reply(reply_to, self.pid, &reply, envelope.id)
                    {
                        Ok(out) => self.post(out, rt),
                        Err(err) => self.log_encode_failure("snapshot", &err.to_string(), rt),
                    }
                }
                QueryTarget::Properties => return Err(RegistryFault::PropertySnapshot),
            },
        }
        Ok(())
    }

    fn reject(&self, verb: &str, key: &Key<K>, rt: &mut dyn ProcessRuntime) {
        // Left unanswered on purpose: precondition violations surface to
        // the caller as a call timeout.
        rt.log(
            LogEntry::warn("request failed preconditions")
                .with_source(self.pid)
                .with_field("verb", verb)
                .with_field("key", key.to_string()),
        );
    }

    // ---- registration engine --------------------------------------------

    fn register(&mut self, id: K, owner: ProcessId, rt: &mut dyn ProcessRuntime) -> RegisterOutcome {
        match self.state.lookup(&id) {
            None => {
                if self.state.note_owner(owner) {
                    rt.monitor(self.pid, owner);
                }
                self.state.insert_name(id.clone(), owner);
                self.notify(&id, &KeyUpdateEvent::Registered { owner }, rt);
                rt.log(
                    LogEntry::info("name registered")
                        .with_source(self.pid)
                        .with_field("key", id.to_string())
                        .with_field("owner", owner.to_string()),
                );
                RegisterOutcome::Registered
            }
            Some(existing) if existing == owner => {
                // Idempotent re-registration: no state change, no event.
                RegisterOutcome::Registered
            }
            Some(existing) => {
                rt.log(
                    LogEntry::info("registration conflict")
                        .with_source(self.pid)
                        .with_field("key", id.to_string())
                        .with_field("owner", existing.to_string())
                        .with_field("requested_by", owner.to_string()),
                );
                RegisterOutcome::AlreadyRegistered
            }
        }
    }

    fn unregister(
        &mut self,
        id: K,
        caller: ProcessId,
        rt: &mut dyn ProcessRuntime,
    ) -> UnregisterOutcome {
        match self.state.lookup(&id) {
            None => UnregisterOutcome::NotFound,
            Some(owner) if owner != caller => UnregisterOutcome::NotOwner,
            Some(_) => {
                // Notify while the subscriptions still exist, then drop
                // both the binding and the key's monitor list.
                self.notify(&id, &KeyUpdateEvent::Unregistered, rt);
                self.state.remove_name(&id);
                self.state.purge_key_monitors(&id);
                rt.log(
                    LogEntry::info("name unregistered")
                        .with_source(self.pid)
                        .with_field("key", id.to_string())
                        .with_field("owner", caller.to_string()),
                );
                UnregisterOutcome::Unregistered
            }
        }
    }

    // ---- subscription engine --------------------------------------------

    fn monitor(
        &mut self,
        subscriber: ProcessId,
        key: Key<K>,
        filter: EventFilter,
        rt: &mut dyn ProcessRuntime,
    ) -> MonitorRef {
        let serial = self.state.next_monitor_serial();
        let reference = MonitorRef { subscriber, serial };

        if self.state.note_listener(subscriber) {
            rt.monitor(self.pid, subscriber);
        }

        // Replay-on-subscribe: a key that already satisfies OnRegistered
        // produces its Registered event immediately, ahead of the reply,
        // so rendezvous works whether registration came before or after
        // the subscription.
        if filter.accepts(EventMask::OnRegistered) {
            match key.kind {
                KeyKind::Alias => {
                    if let Some(owner) = self.state.lookup(&key.id) {
                        self.send_notification(
                            key.id.clone(),
                            reference,
                            KeyUpdateEvent::Registered { owner },
                            rt,
                        );
                    }
                }
                KeyKind::Property => {
                    // Property storage is deferred, so this replay cannot
                    // fire yet. The fallback of an unscoped property key to
                    // the registry's own pid is a documented gap.
                    let scope = key.scope.unwrap_or(self.pid);
                    if self.state.has_property(scope, &key.id) {
                        self.send_notification(
                            key.id.clone(),
                            reference,
                            KeyUpdateEvent::Registered { owner: scope },
                            rt,
                        );
                    }
                }
            }
        }

        self.state
            .push_monitor(key.id, MonitorEntry { reference, filter });
        reference
    }

    /// Fans an event out to every subscription of `id` whose filter
    /// accepts the event's mask
    fn notify(&mut self, id: &K, event: &KeyUpdateEvent, rt: &mut dyn ProcessRuntime) {
        let mask = event.mask();
        let targets: Vec<MonitorRef> = self
            .state
            .monitors_for(id)
            .iter()
            .filter(|entry| entry.filter.accepts(mask))
            .map(|entry| entry.reference)
            .collect();
        for reference in targets {
            self.send_notification(id.clone(), reference, event.clone(), rt);
        }
    }

    fn send_notification(
        &self,
        key: K,
        reference: MonitorRef,
        event: KeyUpdateEvent,
        rt: &mut dyn ProcessRuntime,
    ) {
        let subscriber = reference.subscriber;
        let notification = KeyMonitorNotification {
            key,
            reference,
            event,
        };
        match self
            .codec
            .encode_notification(subscriber, self.pid, &notification)
        {
            Ok(envelope) => self.post(envelope, rt),
            Err(err) => self.log_encode_failure("notification", &err.to_string(), rt),
        }
    }

    // ---- liveness reaper ------------------------------------------------

    fn reap(&mut self, down: DownNotification, rt: &mut dyn ProcessRuntime) {
        let pid = down.pid;

        // Subscriber cleanup first: a process watching its own keys must
        // not be notified about its own death.
        let mut swept = 0;
        if self.state.is_listener(pid) {
            self.state.drop_listener(pid);
            swept = self.state.sweep_subscriber(pid);
        }

        let died_names = self.state.names_owned_by(pid);
        let died_properties = self.state.property_keys_of(pid);

        for id in &died_names {
            self.notify_owner_died(id, &down.reason, rt);
        }
        for id in &died_properties {
            self.notify_owner_died(id, &down.reason, rt);
        }

        // Subscriptions keyed by the dead names are retained: new
        // observers may attach before a re-registration.
        for id in &died_names {
            self.state.remove_name(id);
        }
        for id in &died_properties {
            self.state.remove_property(pid, id);
        }
        self.state.drop_owner(pid);

        if swept > 0 || !died_names.is_empty() || !died_properties.is_empty() {
            rt.log(
                LogEntry::info("reaped dead process")
                    .with_source(self.pid)
                    .with_field("pid", pid.to_string())
                    .with_field("reason", down.reason.to_string())
                    .with_field("names", died_names.len().to_string())
                    .with_field("subscriptions", swept.to_string()),
            );
        }
    }

    /// Death dispatch per subscription: ownership-change subscribers get
    /// the reason, unregistration subscribers get a plain unbind, anyone
    /// else hears nothing
    fn notify_owner_died(&mut self, id: &K, reason: &ExitReason, rt: &mut dyn ProcessRuntime) {
        let targets: Vec<(MonitorRef, bool)> = self
            .state
            .monitors_for(id)
            .iter()
            .filter_map(|entry| {
                if entry.filter.accepts(EventMask::OnOwnershipChange) {
                    Some((entry.reference, true))
                } else if entry.filter.accepts(EventMask::OnUnregistered) {
                    Some((entry.reference, false))
                } else {
                    None
                }
            })
            .collect();
        for (reference, wants_ownership) in targets {
            let event = if wants_ownership {
                KeyUpdateEvent::OwnerDied {
                    reason: reason.clone(),
                }
            } else {
                KeyUpdateEvent::Unregistered
            };
            self.send_notification(id.clone(), reference, event, rt);
        }
    }

    // ---- plumbing -------------------------------------------------------

    fn reply(&self, request: &Envelope, reply: &RegistryReply<K>, rt: &mut dyn ProcessRuntime) {
        match self
            .codec
            .encode_reply(request.from, self.pid, reply, request.id)
        {
            Ok(envelope) => self.post(envelope, rt),
            Err(err) => self.log_encode_failure("reply", &err.to_string(), rt),
        }
    }

    fn post(&self, envelope: Envelope, rt: &mut dyn ProcessRuntime) {
        let to = envelope.to;
        if let Err(err) = rt.send(envelope) {
            rt.log(
                LogEntry::warn("send failed")
                    .with_source(self.pid)
                    .with_field("to", to.to_string())
                    .with_field("error", err.to_string()),
            );
        }
    }

    fn log_encode_failure(&self, what: &str, error: &str, rt: &mut dyn ProcessRuntime) {
        rt.log(
            LogEntry::error("encode failed")
                .with_source(self.pid)
                .with_field("what", what)
                .with_field("error", error),
        );
    }
}

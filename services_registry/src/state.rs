//! The registry's private tables
//!
//! All mutation happens from the registry actor; these structures are
//! never shared. Invariants maintained here:
//!
//! 1. Every owner in `names` (or first coordinate in `properties`) is a
//!    member of `registered_pids`.
//! 2. Every subscriber carried by a monitor entry is a member of
//!    `listening_pids`.
//! 3. `monitor_serial` only ever grows, so monitor references are unique
//!    for the lifetime of the registry.
//! 4. `names` is a functional map: at most one owner per key identity.

use core_types::ProcessId;
use registry_types::{EventFilter, Keyable, MonitorRef};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

/// One recorded subscription for a key
#[derive(Debug, Clone)]
pub struct MonitorEntry {
    /// The handle returned to the subscriber
    pub reference: MonitorRef,
    /// Which events the subscriber wants
    pub filter: EventFilter,
}

/// Table sizes, for diagnostics and tests
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegistryStats {
    /// Bound alias names
    pub names: usize,
    /// Key identities with at least one subscription
    pub monitored_keys: usize,
    /// Processes monitored because they own something
    pub owners: usize,
    /// Processes monitored because they subscribe to something
    pub listeners: usize,
}

/// The registry's state record
#[derive(Debug)]
pub struct RegistryState<K, V> {
    /// Alias key -> owner
    names: HashMap<K, ProcessId>,
    /// (owner, key) -> value. Storage is deferred: consulted by replay,
    /// never populated by any current operation.
    properties: HashMap<(ProcessId, K), V>,
    /// Key -> subscriptions, appended on subscribe, swept on death
    monitors: HashMap<K, Vec<MonitorEntry>>,
    /// Processes monitored because they own something
    registered_pids: HashSet<ProcessId>,
    /// Processes monitored because they subscribe to something
    listening_pids: HashSet<ProcessId>,
    /// Monotonic source of monitor-reference serials
    monitor_serial: u64,
}

impl<K: Keyable, V> RegistryState<K, V> {
    /// Creates empty state
    pub fn new() -> Self {
        Self {
            names: HashMap::new(),
            properties: HashMap::new(),
            monitors: HashMap::new(),
            registered_pids: HashSet::new(),
            listening_pids: HashSet::new(),
            monitor_serial: 1,
        }
    }

    /// Issues the next monitor serial
    pub fn next_monitor_serial(&mut self) -> u64 {
        self.monitor_serial += 1;
        self.monitor_serial
    }

    /// Reads the owner of a key
    pub fn lookup(&self, id: &K) -> Option<ProcessId> {
        self.names.get(id).copied()
    }

    /// Binds a key to an owner
    pub fn insert_name(&mut self, id: K, owner: ProcessId) {
        self.names.insert(id, owner);
    }

    /// Unbinds a key
    pub fn remove_name(&mut self, id: &K) {
        self.names.remove(id);
    }

    /// Returns the keys owned by a process
    pub fn names_owned_by(&self, owner: ProcessId) -> Vec<K> {
        self.names
            .iter()
            .filter(|(_, pid)| **pid == owner)
            .map(|(id, _)| id.clone())
            .collect()
    }

    /// Copies the whole name table
    pub fn snapshot_names(&self) -> Vec<(K, ProcessId)> {
        self.names
            .iter()
            .map(|(id, pid)| (id.clone(), *pid))
            .collect()
    }

    /// Checks whether a property is present for an owner
    pub fn has_property(&self, owner: ProcessId, id: &K) -> bool {
        self.properties.contains_key(&(owner, id.clone()))
    }

    /// Returns the property keys held by a process
    pub fn property_keys_of(&self, owner: ProcessId) -> Vec<K> {
        self.properties
            .keys()
            .filter(|(pid, _)| *pid == owner)
            .map(|(_, id)| id.clone())
            .collect()
    }

    /// Removes one property binding
    pub fn remove_property(&mut self, owner: ProcessId, id: &K) {
        self.properties.remove(&(owner, id.clone()));
    }

    /// Returns the subscriptions recorded for a key
    pub fn monitors_for(&self, id: &K) -> &[MonitorEntry] {
        self.monitors.get(id).map_or(&[], Vec::as_slice)
    }

    /// Appends a subscription for a key
    pub fn push_monitor(&mut self, id: K, entry: MonitorEntry) {
        self.monitors.entry(id).or_default().push(entry);
    }

    /// Drops every subscription for a key
    pub fn purge_key_monitors(&mut self, id: &K) {
        self.monitors.remove(id);
    }

    /// Drops every subscription held by a subscriber, across all keys
    ///
    /// Returns the number of entries removed.
    pub fn sweep_subscriber(&mut self, subscriber: ProcessId) -> usize {
        let mut removed = 0;
        self.monitors.retain(|_, entries| {
            let before = entries.len();
            entries.retain(|entry| entry.reference.subscriber != subscriber);
            removed += before - entries.len();
            !entries.is_empty()
        });
        removed
    }

    /// Marks a process as owning something
    ///
    /// Returns true the first time, signalling that a runtime liveness
    /// monitor must be installed.
    pub fn note_owner(&mut self, pid: ProcessId) -> bool {
        self.registered_pids.insert(pid)
    }

    /// Marks a process as subscribing to something
    ///
    /// Returns true the first time, signalling that a runtime liveness
    /// monitor must be installed.
    pub fn note_listener(&mut self, pid: ProcessId) -> bool {
        self.listening_pids.insert(pid)
    }

    /// Checks membership in the listener set
    pub fn is_listener(&self, pid: ProcessId) -> bool {
        self.listening_pids.contains(&pid)
    }

    /// Removes a process from the owner set
    pub fn drop_owner(&mut self, pid: ProcessId) {
        self.registered_pids.remove(&pid);
    }

    /// Removes a process from the listener set
    pub fn drop_listener(&mut self, pid: ProcessId) {
        self.listening_pids.remove(&pid);
    }

    /// Reports table sizes
    pub fn stats(&self) -> RegistryStats {
        RegistryStats {
            names: self.names.len(),
            monitored_keys: self.monitors.len(),
            owners: self.registered_pids.len(),
            listeners: self.listening_pids.len(),
        }
    }
}

impl<K: Keyable, V> Default for RegistryState<K, V> {
    fn default() -> Self {
        Self::new()
    }
}

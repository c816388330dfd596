//! Registry Test Utilities
//!
//! This crate provides the shared world bootstrap for end-to-end registry
//! tests.
//!
//! ## Test Philosophy
//!
//! - **Deterministic worlds**: one simulated runtime, one registry actor,
//!   any number of client processes; every interleaving is chosen by the
//!   test.
//! - **Real wire traffic**: clients speak the actual protocol through the
//!   actual codec; nothing reaches into the server's tables to mutate.
//! - **Priority is observable**: deaths can be interleaved with queued
//!   requests to check that the reaper runs first.

use core_types::ProcessId;
use registry_types::Keyable;
use runtime_api::time::{Duration, Instant};
use runtime_api::{
    Address, Delivery, ExitReason, MonitorHandle, ProcessRuntime, RuntimeError,
};
use services_registry::{
    ClientTransport, RegistryClient, RegistryConfig, RegistryServer, RegistryStats,
};
use sim_runtime::SimRuntime;
use std::cell::RefCell;
use std::rc::Rc;

/// A complete simulated world: runtime, registry actor, bound address
pub struct RegistryWorld<K: Keyable> {
    pub runtime: SimRuntime,
    pub server: RegistryServer<K, String>,
    pub registry: ProcessId,
    pub config: RegistryConfig,
}

/// Shared handle so several client transports can coexist
pub type SharedWorld<K> = Rc<RefCell<RegistryWorld<K>>>;

impl<K: Keyable> RegistryWorld<K> {
    /// Spawns a runtime with a registry actor bound under the default name
    pub fn bootstrap() -> SharedWorld<K> {
        let config = RegistryConfig::default();
        let mut runtime = SimRuntime::new();
        let registry = runtime.spawn(&config.service_name);
        runtime.bind(config.service_name.clone(), registry);
        let server = RegistryServer::new(registry);
        Rc::new(RefCell::new(Self {
            runtime,
            server,
            registry,
            config,
        }))
    }

    /// Spawns a client process
    pub fn spawn_client(&mut self, name: &str) -> ProcessId {
        self.runtime.spawn(name)
    }

    /// Drains the registry mailbox, running each handler to completion
    ///
    /// A registry fault terminates the actor, exactly as a supervisor
    /// would observe it.
    pub fn pump(&mut self) {
        while let Some(delivery) = self.runtime.take_delivery(self.registry) {
            if let Err(fault) = self.server.handle(delivery, &mut self.runtime) {
                self.runtime.kill(
                    self.registry,
                    ExitReason::Failure {
                        error: fault.to_string(),
                    },
                );
                break;
            }
        }
    }

    /// Kills a process and lets the registry consume the death signal
    pub fn kill(&mut self, pid: ProcessId, reason: ExitReason) {
        self.runtime.kill(pid, reason);
        self.pump();
    }

    /// Registry table sizes
    pub fn stats(&self) -> RegistryStats {
        self.server.stats()
    }

    /// The registry's bound address
    pub fn registry_address(&self) -> Address {
        Address::named(self.config.service_name.clone())
    }
}

/// Client transport that drives the world: sends pump the registry, and
/// receives fall back to pumping before giving up
pub struct WorldTransport<K: Keyable> {
    world: SharedWorld<K>,
    pid: ProcessId,
}

impl<K: Keyable> WorldTransport<K> {
    pub fn new(world: SharedWorld<K>, pid: ProcessId) -> Self {
        Self { world, pid }
    }
}

impl<K: Keyable> ClientTransport for WorldTransport<K> {
    fn self_pid(&self) -> ProcessId {
        self.pid
    }

    fn send(&mut self, envelope: ipc::Envelope) -> Result<(), RuntimeError> {
        let mut world = self.world.borrow_mut();
        world.runtime.send(envelope)?;
        world.pump();
        Ok(())
    }

    fn receive(&mut self, timeout: Option<Duration>) -> Result<Delivery, RuntimeError> {
        let mut world = self.world.borrow_mut();
        if let Some(delivery) = world.runtime.take_delivery(self.pid) {
            return Ok(delivery);
        }
        world.pump();
        if let Some(delivery) = world.runtime.take_delivery(self.pid) {
            return Ok(delivery);
        }
        match timeout {
            Some(wait) => {
                // Nothing in flight can still arrive; burn the wait on the
                // virtual clock and report the timeout.
                world.runtime.advance(wait);
                Err(RuntimeError::Timeout)
            }
            None => Err(RuntimeError::ReceiveFailed(
                "mailbox empty; would block forever".to_string(),
            )),
        }
    }

    fn monitor(&mut self, target: ProcessId) -> MonitorHandle {
        self.world.borrow_mut().runtime.monitor(self.pid, target)
    }

    fn resolve(&self, address: &Address) -> Option<ProcessId> {
        self.world.borrow().runtime.resolve(address)
    }

    fn now(&self) -> Instant {
        self.world.borrow().runtime.now()
    }
}

/// Spawns a client process in the world
pub fn spawn_client<K: Keyable>(world: &SharedWorld<K>, name: &str) -> ProcessId {
    world.borrow_mut().spawn_client(name)
}

/// Builds a registry client for an existing process
pub fn client<K: Keyable>(
    world: &SharedWorld<K>,
    pid: ProcessId,
) -> RegistryClient<K, WorldTransport<K>> {
    let address = world.borrow().registry_address();
    RegistryClient::new(WorldTransport::new(world.clone(), pid), address)
}

/// Kills a process and lets the reaper run
pub fn kill<K: Keyable>(world: &SharedWorld<K>, pid: ProcessId, reason: ExitReason) {
    world.borrow_mut().kill(pid, reason);
}

//! Subscription Scenarios
//!
//! Event fan-out, mask filtering, replay-on-subscribe, and monitor-ref
//! identity, observed through real client mailboxes.

use registry_types::{EventFilter, EventMask, Key, KeyUpdateEvent};
use tests_registry::{client, spawn_client, RegistryWorld};

/// Test: an unmasked subscriber sees every change, in mutation order
#[test]
fn test_unmasked_subscriber_sees_everything_in_order() {
    let world = RegistryWorld::<String>::bootstrap();
    let owner = spawn_client(&world, "owner");
    let observer = spawn_client(&world, "observer");

    let mut observing = client(&world, observer);
    observing.monitor_name("db".to_string()).unwrap();

    let mut owning = client(&world, owner);
    owning.register("db".to_string()).unwrap();
    owning.unregister("db".to_string()).unwrap();

    let first = observing.poll_notification().unwrap().unwrap();
    assert_eq!(first.key, "db");
    assert!(matches!(first.event, KeyUpdateEvent::Registered { owner: o } if o == owner));

    let second = observing.poll_notification().unwrap().unwrap();
    assert!(matches!(second.event, KeyUpdateEvent::Unregistered));

    assert!(observing.poll_notification().unwrap().is_none());
}

/// Test: idempotent re-registration emits exactly one event
#[test]
fn test_idempotent_register_notifies_once() {
    let world = RegistryWorld::<String>::bootstrap();
    let owner = spawn_client(&world, "owner");
    let observer = spawn_client(&world, "observer");

    let mut observing = client(&world, observer);
    observing.monitor_name("db".to_string()).unwrap();

    let mut owning = client(&world, owner);
    owning.register("db".to_string()).unwrap();
    owning.register("db".to_string()).unwrap();

    assert!(observing.poll_notification().unwrap().is_some());
    assert!(observing.poll_notification().unwrap().is_none());
}

/// Test: a rejected registration emits nothing
#[test]
fn test_conflicting_register_is_silent() {
    let world = RegistryWorld::<String>::bootstrap();
    let owner = spawn_client(&world, "owner");
    let intruder = spawn_client(&world, "intruder");
    let observer = spawn_client(&world, "observer");

    client(&world, owner).register("db".to_string()).unwrap();

    let mut observing = client(&world, observer);
    observing
        .monitor(
            Key::alias("db".to_string()),
            EventFilter::only([EventMask::OnUnregistered, EventMask::OnOwnershipChange]),
        )
        .unwrap();

    client(&world, intruder)
        .register_for("db".to_string(), intruder)
        .unwrap();

    assert!(observing.poll_notification().unwrap().is_none());
}

/// Test: subscribing to an already-registered key replays the
/// registration immediately
#[test]
fn test_replay_on_subscribe() {
    let world = RegistryWorld::<String>::bootstrap();
    let owner = spawn_client(&world, "owner");
    let observer = spawn_client(&world, "observer");

    client(&world, owner).register("db".to_string()).unwrap();

    let mut observing = client(&world, observer);
    let reference = observing
        .monitor(
            Key::alias("db".to_string()),
            EventFilter::only([EventMask::OnRegistered]),
        )
        .unwrap();

    let note = observing.poll_notification().unwrap().unwrap();
    assert_eq!(note.reference, reference);
    assert_eq!(note.key, "db");
    assert!(matches!(note.event, KeyUpdateEvent::Registered { owner: o } if o == owner));
}

/// Test: subscribing to an absent key replays nothing
#[test]
fn test_no_replay_for_absent_key() {
    let world = RegistryWorld::<String>::bootstrap();
    let observer = spawn_client(&world, "observer");

    let mut observing = client(&world, observer);
    observing.monitor_name("nothing-here".to_string()).unwrap();
    assert!(observing.poll_notification().unwrap().is_none());
}

/// Test: masks filter what each subscriber receives
#[test]
fn test_mask_filtering() {
    let world = RegistryWorld::<String>::bootstrap();
    let owner = spawn_client(&world, "owner");
    let wants_registered = spawn_client(&world, "wants-registered");
    let wants_unregistered = spawn_client(&world, "wants-unregistered");

    let mut registered_client = client(&world, wants_registered);
    registered_client
        .monitor(
            Key::alias("db".to_string()),
            EventFilter::only([EventMask::OnRegistered]),
        )
        .unwrap();

    let mut unregistered_client = client(&world, wants_unregistered);
    unregistered_client
        .monitor(
            Key::alias("db".to_string()),
            EventFilter::only([EventMask::OnUnregistered]),
        )
        .unwrap();

    let mut owning = client(&world, owner);
    owning.register("db".to_string()).unwrap();
    owning.unregister("db".to_string()).unwrap();

    let note = registered_client.poll_notification().unwrap().unwrap();
    assert!(matches!(note.event, KeyUpdateEvent::Registered { .. }));
    assert!(registered_client.poll_notification().unwrap().is_none());

    let note = unregistered_client.poll_notification().unwrap().unwrap();
    assert!(matches!(note.event, KeyUpdateEvent::Unregistered));
    assert!(unregistered_client.poll_notification().unwrap().is_none());
}

/// Test: several subscribers to one key all hear about it
#[test]
fn test_fan_out_to_multiple_subscribers() {
    let world = RegistryWorld::<String>::bootstrap();
    let owner = spawn_client(&world, "owner");
    let first = spawn_client(&world, "first");
    let second = spawn_client(&world, "second");

    let mut first_client = client(&world, first);
    first_client.monitor_name("db".to_string()).unwrap();
    let mut second_client = client(&world, second);
    second_client.monitor_name("db".to_string()).unwrap();

    client(&world, owner).register("db".to_string()).unwrap();

    for observing in [&mut first_client, &mut second_client] {
        let note = observing.poll_notification().unwrap().unwrap();
        assert!(matches!(note.event, KeyUpdateEvent::Registered { owner: o } if o == owner));
    }
}

/// Test: unregistering a key discards its subscriptions
#[test]
fn test_unregister_purges_subscriptions() {
    let world = RegistryWorld::<String>::bootstrap();
    let owner = spawn_client(&world, "owner");
    let observer = spawn_client(&world, "observer");

    let mut observing = client(&world, observer);
    observing.monitor_name("db".to_string()).unwrap();

    let mut owning = client(&world, owner);
    owning.register("db".to_string()).unwrap();
    owning.unregister("db".to_string()).unwrap();
    owning.register("db".to_string()).unwrap();

    // Registered, then Unregistered, then silence: the re-registration
    // happened after the purge.
    assert!(matches!(
        observing.poll_notification().unwrap().unwrap().event,
        KeyUpdateEvent::Registered { .. }
    ));
    assert!(matches!(
        observing.poll_notification().unwrap().unwrap().event,
        KeyUpdateEvent::Unregistered
    ));
    assert!(observing.poll_notification().unwrap().is_none());
    assert_eq!(world.borrow().stats().monitored_keys, 0);
}

/// Test: monitor references never repeat
#[test]
fn test_monitor_refs_unique() {
    let world = RegistryWorld::<String>::bootstrap();
    let observer = spawn_client(&world, "observer");

    let mut observing = client(&world, observer);
    let mut seen = Vec::new();
    for key in ["a", "b", "a", "c", "a"] {
        let reference = observing.monitor_name(key.to_string()).unwrap();
        assert!(!seen.contains(&reference));
        seen.push(reference);
    }
}

/// Test: notifications carry the reference of the subscription they
/// belong to, so one process can tell its subscriptions apart
#[test]
fn test_notifications_correlate_by_reference() {
    let world = RegistryWorld::<String>::bootstrap();
    let owner = spawn_client(&world, "owner");
    let observer = spawn_client(&world, "observer");

    let mut observing = client(&world, observer);
    let db_ref = observing.monitor_name("db".to_string()).unwrap();
    let cache_ref = observing.monitor_name("cache".to_string()).unwrap();

    let mut owning = client(&world, owner);
    owning.register("cache".to_string()).unwrap();
    owning.register("db".to_string()).unwrap();

    let first = observing.poll_notification().unwrap().unwrap();
    assert_eq!(first.key, "cache");
    assert_eq!(first.reference, cache_ref);

    let second = observing.poll_notification().unwrap().unwrap();
    assert_eq!(second.key, "db");
    assert_eq!(second.reference, db_ref);
}

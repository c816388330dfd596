//! Registration Scenarios
//!
//! End-to-end coverage of register / unregister / lookup / enumeration
//! through the real wire protocol.

use registry_types::{RegisterOutcome, UnregisterOutcome};
use tests_registry::{client, spawn_client, RegistryWorld};

/// Test: a process can register itself under a name
#[test]
fn test_simple_self_registration() {
    let world = RegistryWorld::<String>::bootstrap();
    let s = spawn_client(&world, "s");

    let outcome = client(&world, s).register("foobar".to_string()).unwrap();
    assert_eq!(outcome, RegisterOutcome::Registered);
}

/// Test: a registered name resolves to its owner
#[test]
fn test_verified_registration() {
    let world = RegistryWorld::<String>::bootstrap();
    let s = spawn_client(&world, "s");
    let mut s_client = client(&world, s);

    s_client.register("fwibble".to_string()).unwrap();
    assert_eq!(s_client.lookup("fwibble".to_string()).unwrap(), Some(s));
}

/// Test: one process can own several names, and they enumerate
#[test]
fn test_multiple_names_single_process() {
    let world = RegistryWorld::<String>::bootstrap();
    let s = spawn_client(&world, "s");
    let mut s_client = client(&world, s);

    for name in ["foo", "bar", "baz"] {
        assert_eq!(
            s_client.register(name.to_string()).unwrap(),
            RegisterOutcome::Registered
        );
    }
    for name in ["foo", "bar", "baz"] {
        assert_eq!(s_client.lookup(name.to_string()).unwrap(), Some(s));
    }

    let mut owned = s_client.owned_names(s).unwrap();
    owned.sort();
    assert_eq!(owned, vec!["bar", "baz", "foo"]);
}

/// Test: re-registration is idempotent for the owner and rejected for
/// anyone else, without disturbing the binding
#[test]
fn test_duplicate_registration_rejected() {
    let world = RegistryWorld::<String>::bootstrap();
    let s = spawn_client(&world, "s");
    let p = spawn_client(&world, "p");

    let mut s_client = client(&world, s);
    assert_eq!(
        s_client.register("foobar".to_string()).unwrap(),
        RegisterOutcome::Registered
    );
    assert_eq!(
        s_client.register("foobar".to_string()).unwrap(),
        RegisterOutcome::Registered
    );

    let mut p_client = client(&world, p);
    assert_eq!(
        p_client.register_for("foobar".to_string(), p).unwrap(),
        RegisterOutcome::AlreadyRegistered
    );
    assert_eq!(p_client.lookup("foobar".to_string()).unwrap(), Some(s));
}

/// Test: unregistering one name leaves the others bound
#[test]
fn test_unregister_own_name() {
    let world = RegistryWorld::<String>::bootstrap();
    let s = spawn_client(&world, "s");
    let mut s_client = client(&world, s);

    s_client.register("fwibble".to_string()).unwrap();
    s_client.register("fwobble".to_string()).unwrap();

    assert_eq!(
        s_client.unregister("fwibble".to_string()).unwrap(),
        UnregisterOutcome::Unregistered
    );
    assert_eq!(s_client.lookup("fwibble".to_string()).unwrap(), None);
    assert_eq!(s_client.lookup("fwobble".to_string()).unwrap(), Some(s));
}

/// Test: register-then-unregister leaves no trace a lookup can see
#[test]
fn test_register_unregister_round_trip_law() {
    let world = RegistryWorld::<String>::bootstrap();
    let s = spawn_client(&world, "s");
    let mut s_client = client(&world, s);

    assert_eq!(s_client.lookup("ghost".to_string()).unwrap(), None);
    s_client.register("ghost".to_string()).unwrap();
    s_client.unregister("ghost".to_string()).unwrap();
    assert_eq!(s_client.lookup("ghost".to_string()).unwrap(), None);
}

/// Test: only the owner may unregister; others change nothing
#[test]
fn test_unregister_requires_ownership() {
    let world = RegistryWorld::<String>::bootstrap();
    let s = spawn_client(&world, "s");
    let p = spawn_client(&world, "p");

    client(&world, s).register("fwibble".to_string()).unwrap();

    let mut p_client = client(&world, p);
    assert_eq!(
        p_client.unregister("fwibble".to_string()).unwrap(),
        UnregisterOutcome::NotOwner
    );
    assert_eq!(p_client.lookup("fwibble".to_string()).unwrap(), Some(s));
}

/// Test: unregistering an unbound name reports NotFound
#[test]
fn test_unregister_absent_name() {
    let world = RegistryWorld::<String>::bootstrap();
    let s = spawn_client(&world, "s");

    assert_eq!(
        client(&world, s).unregister("missing".to_string()).unwrap(),
        UnregisterOutcome::NotFound
    );
}

/// Test: fold_names sees one consistent point-in-time snapshot
#[test]
fn test_fold_names_snapshot() {
    let world = RegistryWorld::<String>::bootstrap();
    let s = spawn_client(&world, "s");
    let p = spawn_client(&world, "p");

    let mut s_client = client(&world, s);
    s_client.register("alpha".to_string()).unwrap();
    s_client.register("beta".to_string()).unwrap();
    client(&world, p).register("gamma".to_string()).unwrap();

    let count = s_client.fold_names(0usize, |acc, _| acc + 1).unwrap();
    assert_eq!(count, 3);

    let mut mine = s_client
        .fold_names(Vec::new(), |mut acc, (name, owner)| {
            if owner == s {
                acc.push(name);
            }
            acc
        })
        .unwrap();
    mine.sort();
    assert_eq!(mine, vec!["alpha", "beta"]);
}

/// Test: enumerating an unknown process yields an empty list
#[test]
fn test_owned_names_of_stranger() {
    let world = RegistryWorld::<String>::bootstrap();
    let s = spawn_client(&world, "s");
    let stranger = spawn_client(&world, "stranger");

    client(&world, s).register("foo".to_string()).unwrap();
    assert!(client(&world, s).owned_names(stranger).unwrap().is_empty());
}

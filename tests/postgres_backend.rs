//! PostgreSQL backend tests. These need a reachable server; set
//! GROUNDWORK_POSTGRES_URL (e.g. "host=localhost user=postgres
//! password=postgres dbname=groundwork_test") to run them. Without the
//! variable each test returns early.

#![cfg(feature = "postgres")]

use std::sync::{Mutex, MutexGuard};

use groundwork::atom::{Atom, PredicateSym, Term};
use groundwork::store::{FactReader, FactStore};
use groundwork::value::Constant;

// The tests share one server-side table, so they run serialized.
static TABLE_LOCK: Mutex<()> = Mutex::new(());

fn lock() -> MutexGuard<'static, ()> {
    TABLE_LOCK.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

fn open() -> Option<FactStore> {
    let url = std::env::var("GROUNDWORK_POSTGRES_URL").ok()?;
    let store = FactStore::open_postgres(&url).expect("connect to postgres");
    // Each test starts from an empty table.
    for predicate in store.list_predicates() {
        let mut atoms = Vec::new();
        store
            .get_facts(&Atom::new_query(predicate), &mut |atom| {
                atoms.push(atom);
                Ok(())
            })
            .unwrap();
        for atom in atoms {
            store.remove(&atom);
        }
    }
    Some(store)
}

fn name(s: &str) -> Constant {
    Constant::name(s).unwrap()
}

#[test]
fn add_contains_remove_on_postgres() {
    let _guard = lock();
    let Some(store) = open() else { return };
    let fact = Atom::fact("parent", vec![name("/john"), name("/mary")]);
    assert!(store.add(&fact));
    assert!(!store.add(&fact));
    assert!(store.contains(&fact));
    assert_eq!(store.estimate_fact_count(), 1);
    assert!(store.remove(&fact));
    assert!(!store.contains(&fact));
}

#[test]
fn jsonb_filters_match_bound_arguments() {
    let _guard = lock();
    let Some(store) = open() else { return };
    store.add(&Atom::fact("parent", vec![name("/john"), name("/mary")]));
    store.add(&Atom::fact("parent", vec![name("/john"), name("/bob")]));
    store.add(&Atom::fact("parent", vec![name("/alice"), name("/bob")]));

    let pattern = Atom::new(
        PredicateSym::new("parent", 2),
        vec![Term::Constant(name("/john")), Term::Variable("X".into())],
    );
    let mut seen = Vec::new();
    store
        .get_facts(&pattern, &mut |atom| {
            seen.push(atom);
            Ok(())
        })
        .unwrap();
    assert_eq!(seen.len(), 2);
}

#[test]
fn map_arguments_dedupe_on_postgres() {
    let _guard = lock();
    let Some(store) = open() else { return };
    let first = Atom::fact("data", vec![Constant::map(vec![
        (name("/a"), Constant::number(1)),
        (name("/b"), Constant::string("foo")),
    ])]);
    let second = Atom::fact("data", vec![Constant::map(vec![
        (name("/b"), Constant::string("foo")),
        (name("/a"), Constant::number(1)),
    ])]);
    assert!(store.add(&first));
    assert!(!store.add(&second));
    assert_eq!(store.estimate_fact_count(), 1);
}

#[test]
fn export_import_round_trip_on_postgres() {
    let _guard = lock();
    let Some(store) = open() else { return };
    store.add(&Atom::fact("age", vec![name("/mary"), Constant::number(30)]));
    store.add(&Atom::fact("str", vec![Constant::string("=€$")]));

    let mut buffer = Vec::new();
    store.export(&mut buffer).unwrap();

    let Some(target) = open() else { return };
    target.import(buffer.as_slice()).unwrap();
    assert_eq!(target.estimate_fact_count(), 2);
}

use groundwork::atom::Atom;
use groundwork::store::{FactStore, SqliteOptions};
use groundwork::value::Constant;

fn name(s: &str) -> Constant {
    Constant::name(s).unwrap()
}

fn parent(child: &str, who: &str) -> Atom {
    Atom::fact("parent", vec![name(child), name(who)])
}

#[test]
fn file_backed_store_survives_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("facts.db");
    let path = path.to_str().unwrap();

    let store = FactStore::open_sqlite(path, SqliteOptions::default()).unwrap();
    assert!(store.add(&parent("/john", "/mary")));
    store.close();

    let reopened = FactStore::open_sqlite(path, SqliteOptions::default()).unwrap();
    assert!(reopened.contains(&parent("/john", "/mary")));
    assert_eq!(reopened.estimate_fact_count(), 1);
}

#[test]
fn in_memory_stores_are_isolated() {
    let first = FactStore::open_sqlite(":memory:", SqliteOptions::default()).unwrap();
    let second = FactStore::open_sqlite(":memory:", SqliteOptions::default()).unwrap();
    assert!(first.add(&parent("/john", "/mary")));
    assert_eq!(second.estimate_fact_count(), 0);
    assert!(!second.contains(&parent("/john", "/mary")));
}

#[test]
fn pragma_overrides_are_accepted() {
    let options = SqliteOptions::default()
        .pragma("synchronous", "NORMAL")
        .pragma("cache_size", "-2000");
    let store = FactStore::open_sqlite(":memory:", options).unwrap();
    assert!(store.add(&parent("/john", "/mary")));
    assert!(store.contains(&parent("/john", "/mary")));
}

#[test]
fn in_memory_data_is_shared_across_the_pool() {
    // More facts than one connection would see if the pool handed out
    // unrelated private databases.
    let store = FactStore::open_sqlite(":memory:", SqliteOptions::default()).unwrap();
    let atoms: Vec<Atom> = (0..100)
        .map(|i| Atom::fact("n", vec![Constant::number(i)]))
        .collect();
    store.batch_insert(&atoms).unwrap();
    for atom in &atoms {
        assert!(store.contains(atom));
    }
    assert_eq!(store.estimate_fact_count(), 100);
}

#[test]
fn dropping_a_store_releases_the_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("facts.db");
    let path = path.to_str().unwrap();
    {
        let store = FactStore::open_sqlite(path, SqliteOptions::default()).unwrap();
        store.add(&parent("/a", "/b"));
    }
    // Reopening after an implicit drop works the same as after close().
    let reopened = FactStore::open_sqlite(path, SqliteOptions::default()).unwrap();
    assert_eq!(reopened.estimate_fact_count(), 1);
}

use groundwork::atom::{Atom, PredicateSym, Term};
use groundwork::error::GroundworkError;
use groundwork::store::{FactReader, FactStore, SqliteOptions};
use groundwork::value::Constant;

fn store() -> FactStore {
    FactStore::open_sqlite(":memory:", SqliteOptions::default()).unwrap()
}

fn name(s: &str) -> Constant {
    Constant::name(s).unwrap()
}

fn parent(child: &str, who: &str) -> Atom {
    Atom::fact("parent", vec![name(child), name(who)])
}

fn collect(store: &FactStore, pattern: &Atom) -> Vec<Atom> {
    let mut out = Vec::new();
    store
        .get_facts(pattern, &mut |atom| {
            out.push(atom);
            Ok(())
        })
        .unwrap();
    out
}

#[test]
fn bound_first_argument_filters_rows() {
    let store = store();
    store.add(&parent("/john", "/mary"));
    store.add(&parent("/john", "/bob"));
    store.add(&parent("/alice", "/bob"));

    let pattern = Atom::new(
        PredicateSym::new("parent", 2),
        vec![Term::Constant(name("/john")), Term::Variable("X".into())],
    );
    let results = collect(&store, &pattern);
    assert_eq!(results.len(), 2);
    assert!(results.contains(&parent("/john", "/mary")));
    assert!(results.contains(&parent("/john", "/bob")));
}

#[test]
fn bound_second_argument_filters_rows() {
    let store = store();
    store.add(&parent("/john", "/mary"));
    store.add(&parent("/john", "/bob"));
    store.add(&parent("/alice", "/bob"));

    let pattern = Atom::new(
        PredicateSym::new("parent", 2),
        vec![Term::Variable("X".into()), Term::Constant(name("/bob"))],
    );
    let results = collect(&store, &pattern);
    assert_eq!(results.len(), 2);
    assert!(results.contains(&parent("/john", "/bob")));
    assert!(results.contains(&parent("/alice", "/bob")));
}

#[test]
fn fully_bound_pattern_matches_one_row() {
    let store = store();
    store.add(&parent("/john", "/mary"));
    store.add(&parent("/john", "/bob"));
    let results = collect(&store, &parent("/john", "/mary"));
    assert_eq!(results, vec![parent("/john", "/mary")]);
}

#[test]
fn wildcard_query_streams_every_fact_of_the_predicate() {
    let store = store();
    store.add(&parent("/john", "/mary"));
    store.add(&parent("/alice", "/bob"));
    store.add(&Atom::fact("age", vec![name("/mary"), Constant::number(30)]));

    let results = collect(&store, &Atom::new_query(PredicateSym::new("parent", 2)));
    assert_eq!(results.len(), 2);
}

#[test]
fn absent_predicate_yields_nothing() {
    let store = store();
    store.add(&parent("/john", "/mary"));
    let results = collect(&store, &Atom::new_query(PredicateSym::new("sibling", 2)));
    assert!(results.is_empty());
}

#[test]
fn bound_map_argument_matches_any_entry_order() {
    let store = store();
    let stored = Atom::fact("data", vec![Constant::map(vec![
        (name("/a"), Constant::number(1)),
        (name("/b"), Constant::string("foo")),
    ])]);
    store.add(&stored);

    // Same map, entries written the other way round.
    let pattern = Atom::fact("data", vec![Constant::map(vec![
        (name("/b"), Constant::string("foo")),
        (name("/a"), Constant::number(1)),
    ])]);
    let results = collect(&store, &pattern);
    assert_eq!(results, vec![stored]);
}

#[test]
fn bound_scalar_variants_compare_by_json_value() {
    let store = store();
    store.add(&Atom::fact("weight", vec![name("/crate"), Constant::float(2.5)]));
    store.add(&Atom::fact("weight", vec![name("/anvil"), Constant::float(100.0)]));
    store.add(&Atom::fact("tag", vec![name("/crate"), Constant::bytes(vec![0, 255])]));

    let pattern = Atom::new(
        PredicateSym::new("weight", 2),
        vec![Term::Variable("X".into()), Term::Constant(Constant::float(2.5))],
    );
    assert_eq!(collect(&store, &pattern).len(), 1);

    let pattern = Atom::new(
        PredicateSym::new("tag", 2),
        vec![Term::Variable("X".into()), Term::Constant(Constant::bytes(vec![0, 255]))],
    );
    assert_eq!(collect(&store, &pattern).len(), 1);
}

#[test]
fn nested_compound_arguments_round_trip_through_queries() {
    let store = store();
    let fact = Atom::fact("config", vec![
        name("/svc"),
        Constant::structure(vec![
            (name("/retries"), Constant::number(3)),
            (name("/backoff"), Constant::list(vec![Constant::number(1), Constant::number(2)])),
        ]),
    ]);
    store.add(&fact);
    let results = collect(&store, &Atom::new_query(PredicateSym::new("config", 2)));
    assert_eq!(results, vec![fact]);
}

#[test]
fn yield_error_terminates_the_scan() {
    let store = store();
    store.add(&parent("/john", "/mary"));
    store.add(&parent("/john", "/bob"));
    store.add(&parent("/john", "/eve"));

    let mut seen = 0;
    let result = store.get_facts(&Atom::new_query(PredicateSym::new("parent", 2)), &mut |_| {
        seen += 1;
        if seen == 2 {
            Err(GroundworkError::Interrupted)
        } else {
            Ok(())
        }
    });
    assert!(matches!(result, Err(GroundworkError::Interrupted)));
    assert_eq!(seen, 2);
}

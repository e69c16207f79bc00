use groundwork::atom::Atom;
use groundwork::rdf::{atoms_to_rdf, rdf_to_atoms, Node, NAMESPACE, RDF_STATEMENT, RDF_TYPE};
use groundwork::value::Constant;

fn name(s: &str) -> Constant {
    Constant::name(s).unwrap()
}

#[test]
fn arity_three_reification_round_trip() {
    let atom = Atom::fact("located_at", vec![
        name("/eiffel"),
        name("/paris"),
        Constant::string("France"),
    ]);
    let dataset = atoms_to_rdf(std::slice::from_ref(&atom)).unwrap();

    // The reification carries the statement type plus one quad per role.
    assert!(dataset
        .quads
        .iter()
        .any(|q| q.predicate == Node::iri(RDF_TYPE) && q.object == Node::iri(RDF_STATEMENT)));

    let raised = rdf_to_atoms(&dataset).unwrap();
    assert_eq!(raised, vec![atom]);
}

#[test]
fn arity_five_keeps_argument_positions() {
    let atom = Atom::fact("route", vec![
        name("/a"),
        name("/b"),
        Constant::number(1),
        Constant::number(2),
        Constant::number(3),
    ]);
    let dataset = atoms_to_rdf(std::slice::from_ref(&atom)).unwrap();
    assert!(dataset
        .quads
        .iter()
        .any(|q| q.predicate == Node::iri(format!("{}arg4", NAMESPACE))));
    assert_eq!(rdf_to_atoms(&dataset).unwrap(), vec![atom]);
}

#[test]
fn mixed_arity_dataset_round_trips_as_a_set() {
    let atoms = vec![
        Atom::fact("halted", vec![]),
        Atom::fact("person", vec![name("/alice")]),
        Atom::fact("knows", vec![name("/alice"), name("/bob")]),
        Atom::fact("located_at", vec![name("/eiffel"), name("/paris"), Constant::string("France")]),
    ];
    let dataset = atoms_to_rdf(&atoms).unwrap();
    let raised = rdf_to_atoms(&dataset).unwrap();
    assert_eq!(raised.len(), atoms.len());
    for atom in &atoms {
        assert!(raised.contains(atom), "missing {}", atom);
    }
}

#[test]
fn typed_literals_keep_their_variants() {
    let atoms = vec![
        Atom::fact("age", vec![name("/mary"), Constant::number(30)]),
        Atom::fact("weight", vec![name("/mary"), Constant::float(65.5)]),
        Atom::fact("token", vec![name("/mary"), Constant::bytes(vec![1, 2, 3])]),
        Atom::fact("label", vec![name("/mary"), Constant::string("hello")]),
    ];
    let dataset = atoms_to_rdf(&atoms).unwrap();
    let raised = rdf_to_atoms(&dataset).unwrap();
    for atom in &atoms {
        assert!(raised.contains(atom), "missing {}", atom);
    }
}

#[test]
fn multiple_reified_atoms_stay_separate() {
    let atoms = vec![
        Atom::fact("located_at", vec![name("/eiffel"), name("/paris"), Constant::string("France")]),
        Atom::fact("located_at", vec![name("/liberty"), name("/nyc"), Constant::string("USA")]),
    ];
    let dataset = atoms_to_rdf(&atoms).unwrap();
    assert_eq!(dataset.quads.len(), 10);
    let raised = rdf_to_atoms(&dataset).unwrap();
    assert_eq!(raised.len(), 2);
    for atom in &atoms {
        assert!(raised.contains(atom));
    }
}

#[test]
fn non_ground_atoms_cannot_be_lowered() {
    use groundwork::atom::{PredicateSym, Term};
    let pattern = Atom::new(
        PredicateSym::new("p", 1),
        vec![Term::Variable("X".into())],
    );
    assert!(atoms_to_rdf(std::slice::from_ref(&pattern)).is_err());
}

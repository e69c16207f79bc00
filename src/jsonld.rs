//! JSON-LD rendition of facts.
//!
//! A linked-data flavored document encoding, separate from the storage
//! stream in [`crate::codec`]. Values follow the canonical codec except
//! that lists must be wrapped as `{"@list": […]}`; a bare JSON array is
//! rejected here. Atoms map by arity:
//!
//! * arity 0: `{"@type": "p"}`
//! * arity 1: `{"@id": a, "@type": "p"}`
//! * arity 2: `{"@id": a, "p": b}`
//! * arity 3+: `{"@type": "p", "arg0": a, "arg1": b, …}`
//!
//! A whole fact set becomes one document carrying the shared `@context`
//! and a `@graph` array. The reverse direction detects the arity from
//! which of `@id`, `@type` and plain properties are present.

use serde_json::{json, Map as JsonMap, Value};

use crate::atom::{Atom, PredicateSym, Term};
use crate::codec;
use crate::error::{GroundworkError, Result};
use crate::fingerprint::sorted_entries;
use crate::rdf::NAMESPACE;
use crate::value::Constant;

/// XSD namespace used by the shared context.
pub const XSD_NAMESPACE: &str = "http://www.w3.org/2001/XMLSchema#";

/// The shared `@context`: the vocabulary namespace, the xsd prefix, the
/// positional `argN` terms, and list-container definitions for the
/// function objects.
pub fn context() -> Value {
    let mut object = JsonMap::new();
    object.insert("@vocab".to_owned(), json!(NAMESPACE));
    object.insert("xsd".to_owned(), json!(XSD_NAMESPACE));
    for i in 0..10 {
        object.insert(format!("arg{}", i), json!(format!("{}arg{}", NAMESPACE, i)));
    }
    for (term, iri) in [
        (codec::FN_PAIR, "pair"),
        (codec::FN_MAP, "map"),
        (codec::FN_STRUCT, "struct"),
    ] {
        object.insert(
            term.to_owned(),
            json!({"@id": format!("{}{}", NAMESPACE, iri), "@container": "@list"}),
        );
    }
    Value::Object(object)
}

// ------------- Values -------------

/// Encodes a constant as a JSON-LD value. Lists become `@list` objects;
/// everything else matches the canonical codec.
pub fn encode_value(c: &Constant) -> Result<Value> {
    Ok(match c {
        Constant::List(elements) => {
            let elements: Vec<Value> = elements.iter().map(encode_value).collect::<Result<_>>()?;
            tagged_object(codec::AT_LIST, elements)
        }
        Constant::Pair(fst, snd) => {
            tagged_object(codec::FN_PAIR, vec![encode_value(fst)?, encode_value(snd)?])
        }
        Constant::Map(entries) => tagged_object(codec::FN_MAP, encode_entries(entries)?),
        Constant::Struct(entries) => tagged_object(codec::FN_STRUCT, encode_entries(entries)?),
        scalar => codec::encode_constant(scalar)?,
    })
}

fn tagged_object(key: &str, elements: Vec<Value>) -> Value {
    let mut object = JsonMap::new();
    object.insert(key.to_owned(), Value::Array(elements));
    Value::Object(object)
}

fn encode_entries(entries: &[(Constant, Constant)]) -> Result<Vec<Value>> {
    sorted_entries(entries).into_iter().map(encode_value).collect()
}

/// Decodes a JSON-LD value. Scalars and function objects follow the
/// canonical codec; bare arrays are an error in this context.
pub fn decode_value(value: &Value) -> Result<Constant> {
    match value {
        Value::Array(_) => Err(GroundworkError::Codec(
            "bare arrays are not JSON-LD values; use @list".into(),
        )),
        Value::Object(object) => {
            if object.len() != 1 {
                return Err(GroundworkError::Codec(format!(
                    "expected a single-key JSON-LD value object, got {} keys",
                    object.len()
                )));
            }
            let (key, payload) = object.iter().next().expect("one key");
            let elements = match payload {
                Value::Array(elements) => elements,
                _ => {
                    return Err(GroundworkError::Codec(format!(
                        "{} payload must be an array",
                        key
                    )))
                }
            };
            let elements: Vec<Constant> =
                elements.iter().map(decode_value).collect::<Result<_>>()?;
            match key.as_str() {
                codec::AT_LIST => Ok(Constant::List(elements)),
                codec::FN_PAIR => {
                    if elements.len() != 2 {
                        return Err(GroundworkError::Codec(format!(
                            "fn:pair expects 2 args, got {}",
                            elements.len()
                        )));
                    }
                    let mut elements = elements.into_iter();
                    let fst = elements.next().expect("two args");
                    let snd = elements.next().expect("two args");
                    Ok(Constant::pair(fst, snd))
                }
                codec::FN_MAP => Ok(Constant::map(pair_up(elements, codec::FN_MAP)?)),
                codec::FN_STRUCT => Ok(Constant::structure(pair_up(elements, codec::FN_STRUCT)?)),
                other => Err(GroundworkError::Codec(format!(
                    "unknown JSON-LD object key: {}",
                    other
                ))),
            }
        }
        scalar => codec::decode_constant(scalar),
    }
}

fn pair_up(elements: Vec<Constant>, what: &str) -> Result<Vec<(Constant, Constant)>> {
    if elements.len() % 2 != 0 {
        return Err(GroundworkError::Codec(format!(
            "{} expects an even number of args, got {}",
            what,
            elements.len()
        )));
    }
    let mut entries = Vec::with_capacity(elements.len() / 2);
    let mut elements = elements.into_iter();
    while let (Some(key), Some(value)) = (elements.next(), elements.next()) {
        entries.push((key, value));
    }
    Ok(entries)
}

// ------------- Atoms -------------

/// The arity-based properties of one atom, without `@context`.
fn atom_properties(atom: &Atom) -> Result<JsonMap<String, Value>> {
    let args = atom.ground_args()?;
    let mut object = JsonMap::new();
    match args.len() {
        0 => {
            object.insert("@type".to_owned(), json!(atom.predicate.symbol));
        }
        1 => {
            object.insert("@id".to_owned(), encode_value(args[0])?);
            object.insert("@type".to_owned(), json!(atom.predicate.symbol));
        }
        2 => {
            object.insert("@id".to_owned(), encode_value(args[0])?);
            object.insert(atom.predicate.symbol.clone(), encode_value(args[1])?);
        }
        _ => {
            object.insert("@type".to_owned(), json!(atom.predicate.symbol));
            for (index, arg) in args.iter().enumerate() {
                object.insert(format!("arg{}", index), encode_value(arg)?);
            }
        }
    }
    Ok(object)
}

/// Encodes one atom as a standalone JSON-LD document with its own context.
pub fn atom_to_jsonld(atom: &Atom) -> Result<Value> {
    let mut object = atom_properties(atom)?;
    object.insert("@context".to_owned(), context());
    Ok(Value::Object(object))
}

/// Encodes a fact set as one document: shared `@context` plus `@graph`.
pub fn atoms_to_jsonld(atoms: &[Atom]) -> Result<Value> {
    let graph: Vec<Value> = atoms
        .iter()
        .map(|atom| Ok(Value::Object(atom_properties(atom)?)))
        .collect::<Result<_>>()?;
    let mut object = JsonMap::new();
    object.insert("@context".to_owned(), context());
    object.insert("@graph".to_owned(), Value::Array(graph));
    Ok(Value::Object(object))
}

/// Decodes a single atom object, standalone or from inside a `@graph`.
pub fn atom_from_jsonld(value: &Value) -> Result<Atom> {
    let object = value
        .as_object()
        .ok_or_else(|| GroundworkError::Codec("JSON-LD atom must be an object".into()))?;

    let mut id: Option<Constant> = None;
    let mut type_value: Option<String> = None;
    let mut properties: Vec<(String, Constant)> = Vec::new();
    for (key, payload) in object {
        match key.as_str() {
            "@context" => continue,
            "@id" => id = Some(decode_value(payload)?),
            "@type" => {
                let symbol = payload.as_str().ok_or_else(|| {
                    GroundworkError::Codec("@type must be a string".into())
                })?;
                type_value = Some(symbol.to_owned());
            }
            _ => properties.push((key.clone(), decode_value(payload)?)),
        }
    }
    reconstruct_atom(id, type_value, properties)
}

/// Decodes a whole document, reading atoms from `@graph` and skipping the
/// context and unknown document keys.
pub fn atoms_from_jsonld(value: &Value) -> Result<Vec<Atom>> {
    let object = value
        .as_object()
        .ok_or_else(|| GroundworkError::Codec("JSON-LD document must be an object".into()))?;
    let graph = match object.get("@graph") {
        Some(Value::Array(graph)) => graph,
        Some(_) => return Err(GroundworkError::Codec("@graph must be an array".into())),
        None => return Ok(Vec::new()),
    };
    graph.iter().map(atom_from_jsonld).collect()
}

/// Rebuilds an atom from which of `@id`, `@type` and plain properties are
/// present, mirroring the arity-based encoding.
fn reconstruct_atom(
    id: Option<Constant>,
    type_value: Option<String>,
    properties: Vec<(String, Constant)>,
) -> Result<Atom> {
    match (id, type_value, properties) {
        (None, Some(symbol), properties) if properties.is_empty() => Ok(Atom {
            predicate: PredicateSym::new(symbol, 0),
            args: vec![],
        }),
        (Some(subject), Some(symbol), properties) if properties.is_empty() => Ok(Atom {
            predicate: PredicateSym::new(symbol, 1),
            args: vec![Term::Constant(subject)],
        }),
        (Some(subject), None, mut properties) if properties.len() == 1 => {
            let (symbol, object) = properties.pop().expect("one property");
            Ok(Atom {
                predicate: PredicateSym::new(symbol, 2),
                args: vec![Term::Constant(subject), Term::Constant(object)],
            })
        }
        (_, Some(symbol), properties) if !properties.is_empty() => {
            let arity = properties.len();
            let mut by_key: std::collections::HashMap<String, Constant> =
                properties.into_iter().collect();
            let mut args = Vec::with_capacity(arity);
            for index in 0..arity {
                let key = format!("arg{}", index);
                let value = by_key.remove(&key).ok_or_else(|| {
                    GroundworkError::Codec(format!(
                        "missing {} for arity {} predicate",
                        key, arity
                    ))
                })?;
                args.push(Term::Constant(value));
            }
            Ok(Atom {
                predicate: PredicateSym::new(symbol, arity),
                args,
            })
        }
        _ => Err(GroundworkError::Codec(
            "cannot determine atom arity from JSON-LD structure".into(),
        )),
    }
}

//! The canonical JSON codec.
//!
//! This is the normal form for values both at rest (the `args` column) and
//! in flight (the import/export stream). The encoding is self-describing:
//! the JSON token alone determines the variant on decode.
//!
//! * Name → JSON string with a leading `/`.
//! * String → any other JSON string.
//! * Bytes → JSON string `b"…"` with the ASCII-safe escape form.
//! * Number → JSON integer; Float → JSON number with a fractional part.
//! * List → JSON array.
//! * Pair/Map/Struct → single-key objects `{"fn:pair":…}`, `{"fn:map":…}`,
//!   `{"fn:struct":…}` carrying a flat argument array. Map and struct
//!   entries are emitted in key fingerprint order, which makes the encoded
//!   form canonical: structurally equal values encode to identical bytes.
//!
//! `{"@list": […]}` is accepted on decode as an alias for List, for
//! interchange with linked-data tooling. `null` is rejected.

use serde_json::{Map as JsonMap, Number, Value};

use crate::atom::{Atom, PredicateSym, Term};
use crate::error::{GroundworkError, Result};
use crate::fingerprint::{atom_hash, sorted_entries};
use crate::value::{escape_bytes, unescape_bytes, Constant};

pub const FN_PAIR: &str = "fn:pair";
pub const FN_MAP: &str = "fn:map";
pub const FN_STRUCT: &str = "fn:struct";
pub const AT_LIST: &str = "@list";

// ------------- Encoding -------------

/// Encodes a constant into its canonical JSON value.
pub fn encode_constant(c: &Constant) -> Result<Value> {
    Ok(match c {
        Constant::Name(symbol) => Value::String(symbol.clone()),
        Constant::String(s) => Value::String(s.clone()),
        Constant::Bytes(b) => Value::String(format!("b\"{}\"", escape_bytes(b))),
        Constant::Number(n) => Value::Number(Number::from(*n)),
        Constant::Float(x) => Value::Number(
            Number::from_f64(*x)
                .ok_or_else(|| GroundworkError::Codec(format!("non-finite float {} has no JSON form", x)))?,
        ),
        Constant::List(elements) => {
            Value::Array(elements.iter().map(encode_constant).collect::<Result<_>>()?)
        }
        Constant::Pair(fst, snd) => {
            fn_object(FN_PAIR, vec![encode_constant(fst)?, encode_constant(snd)?])
        }
        Constant::Map(entries) => fn_object(FN_MAP, encode_entries(entries)?),
        Constant::Struct(entries) => fn_object(FN_STRUCT, encode_entries(entries)?),
    })
}

/// Flattens map/struct entries into `[k1, v1, k2, v2, …]` in key
/// fingerprint order, the deterministic on-disk form.
fn encode_entries(entries: &[(Constant, Constant)]) -> Result<Vec<Value>> {
    sorted_entries(entries).into_iter().map(encode_constant).collect()
}

fn fn_object(key: &str, args: Vec<Value>) -> Value {
    let mut object = JsonMap::new();
    object.insert(key.to_owned(), Value::Array(args));
    Value::Object(object)
}

/// Encodes an argument list as canonical JSON array text.
pub fn encode_args<'a>(args: impl IntoIterator<Item = &'a Constant>) -> Result<String> {
    let encoded: Vec<Value> = args.into_iter().map(encode_constant).collect::<Result<_>>()?;
    Ok(Value::Array(encoded).to_string())
}

/// Encodes an atom in the wire form used by the import/export stream:
/// `{"predicate":{"symbol":S,"arity":N},"args":[…]}`.
pub fn encode_atom(atom: &Atom) -> Result<Value> {
    let args: Vec<Value> = atom
        .ground_args()?
        .into_iter()
        .map(encode_constant)
        .collect::<Result<_>>()?;
    let mut object = JsonMap::new();
    object.insert("predicate".to_owned(), serde_json::to_value(&atom.predicate)?);
    object.insert("args".to_owned(), Value::Array(args));
    Ok(Value::Object(object))
}

// ------------- Row pre-encoding -------------

/// A fact as persisted: predicate key, structural hash, canonical args.
#[derive(Debug, Clone)]
pub struct FactRow {
    pub predicate: String,
    pub atom_hash: i64,
    pub args: String,
}

/// Converts a ground atom into its row form in a single pass. Fails on
/// atoms containing variables.
pub fn encode_row(atom: &Atom) -> Result<FactRow> {
    let hash = atom_hash(atom)?;
    let args = encode_args(atom.ground_args()?)?;
    Ok(FactRow {
        predicate: atom.predicate.key(),
        atom_hash: hash,
        args,
    })
}

// ------------- Decoding -------------

/// Decodes a canonical JSON value back into a constant.
pub fn decode_constant(value: &Value) -> Result<Constant> {
    match value {
        Value::Null => Err(GroundworkError::Codec("null is not a constant".into())),
        Value::Bool(_) => Err(GroundworkError::Codec("boolean is not a constant".into())),
        Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                Ok(Constant::Number(i))
            } else if n.is_u64() {
                Err(GroundworkError::Codec(format!("integer out of range: {}", n)))
            } else {
                // A token with a fractional part or exponent.
                Ok(Constant::Float(n.as_f64().expect("checked numeric token")))
            }
        }
        Value::String(s) => decode_string_token(s),
        Value::Array(elements) => Ok(Constant::List(
            elements.iter().map(decode_constant).collect::<Result<_>>()?,
        )),
        Value::Object(object) => decode_object(object),
    }
}

fn decode_string_token(s: &str) -> Result<Constant> {
    if s.starts_with('/') {
        Constant::name(s).map_err(|e| GroundworkError::Codec(e.to_string()))
    } else if let Some(inner) = s.strip_prefix("b\"").and_then(|rest| rest.strip_suffix('"')) {
        Ok(Constant::Bytes(unescape_bytes(inner)?))
    } else {
        Ok(Constant::String(s.to_owned()))
    }
}

fn decode_object(object: &JsonMap<String, Value>) -> Result<Constant> {
    if object.len() != 1 {
        return Err(GroundworkError::Codec(format!(
            "expected a single-key function object, got {} keys",
            object.len()
        )));
    }
    let (key, value) = object.iter().next().expect("one key");
    let args = match value {
        Value::Array(args) => args,
        _ => {
            return Err(GroundworkError::Codec(format!(
                "{} payload must be an array",
                key
            )))
        }
    };
    let args: Vec<Constant> = args.iter().map(decode_constant).collect::<Result<_>>()?;
    match key.as_str() {
        AT_LIST => Ok(Constant::List(args)),
        FN_PAIR => {
            if args.len() != 2 {
                return Err(GroundworkError::Codec(format!(
                    "fn:pair expects 2 args, got {}",
                    args.len()
                )));
            }
            let mut args = args.into_iter();
            let fst = args.next().expect("two args");
            let snd = args.next().expect("two args");
            Ok(Constant::pair(fst, snd))
        }
        FN_MAP => Ok(Constant::map(pair_up(args, FN_MAP)?)),
        FN_STRUCT => Ok(Constant::structure(pair_up(args, FN_STRUCT)?)),
        other => Err(GroundworkError::Codec(format!("unknown object key: {}", other))),
    }
}

fn pair_up(args: Vec<Constant>, what: &str) -> Result<Vec<(Constant, Constant)>> {
    if args.len() % 2 != 0 {
        return Err(GroundworkError::Codec(format!(
            "{} expects an even number of args, got {}",
            what,
            args.len()
        )));
    }
    let mut entries = Vec::with_capacity(args.len() / 2);
    let mut args = args.into_iter();
    while let (Some(key), Some(value)) = (args.next(), args.next()) {
        entries.push((key, value));
    }
    Ok(entries)
}

/// Decodes a stored args column back into constants.
pub fn decode_args(json: &str) -> Result<Vec<Constant>> {
    let value: Value = serde_json::from_str(json)?;
    match value {
        Value::Array(elements) => elements.iter().map(decode_constant).collect(),
        _ => Err(GroundworkError::Codec("args column must hold a JSON array".into())),
    }
}

/// Reconstructs a ground atom from its predicate and stored args column.
pub fn decode_stored_atom(predicate: &PredicateSym, args_json: &str) -> Result<Atom> {
    let constants = decode_args(args_json)?;
    Ok(Atom {
        predicate: predicate.clone(),
        args: constants.into_iter().map(Term::Constant).collect(),
    })
}

/// Decodes an atom object in the wire form. Unknown keys are ignored,
/// matching the tolerant reader side of the stream contract.
pub fn decode_atom(value: &Value) -> Result<Atom> {
    let object = value
        .as_object()
        .ok_or_else(|| GroundworkError::Codec("atom must be a JSON object".into()))?;
    let predicate = object
        .get("predicate")
        .ok_or_else(|| GroundworkError::Codec("atom object is missing \"predicate\"".into()))?;
    let predicate: PredicateSym = serde_json::from_value(predicate.clone())?;
    let args = match object.get("args") {
        Some(Value::Array(args)) => args,
        Some(_) => return Err(GroundworkError::Codec("atom \"args\" must be an array".into())),
        None => return Err(GroundworkError::Codec("atom object is missing \"args\"".into())),
    };
    if args.len() != predicate.arity {
        return Err(GroundworkError::Codec(format!(
            "predicate {} declares arity {} but atom has {} args",
            predicate.symbol,
            predicate.arity,
            args.len()
        )));
    }
    let constants: Vec<Constant> = args.iter().map(decode_constant).collect::<Result<_>>()?;
    Ok(Atom {
        predicate,
        args: constants.into_iter().map(Term::Constant).collect(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn name(s: &str) -> Constant {
        Constant::name(s).unwrap()
    }

    fn round_trip(c: &Constant) -> Constant {
        decode_constant(&encode_constant(c).unwrap()).unwrap()
    }

    #[test]
    fn scalar_round_trips() {
        for c in [
            name("/john"),
            Constant::string("hello"),
            Constant::string(""),
            Constant::bytes(vec![0, 1, 2, 255]),
            Constant::number(-42),
            Constant::float(3.25),
            Constant::float(-0.5),
        ] {
            assert_eq!(round_trip(&c), c);
        }
    }

    #[test]
    fn integral_float_keeps_its_variant() {
        let c = Constant::float(1.0);
        let v = encode_constant(&c).unwrap();
        assert_eq!(v.to_string(), "1.0");
        assert_eq!(round_trip(&c), c);
    }

    #[test]
    fn compound_round_trips() {
        let c = Constant::map(vec![
            (name("/a"), Constant::number(1)),
            (name("/b"), Constant::list(vec![Constant::string("x"), Constant::number(2)])),
        ]);
        assert_eq!(round_trip(&c), c);

        let c = Constant::pair(name("/l"), Constant::structure(vec![(name("/f"), Constant::float(2.5))]));
        assert_eq!(round_trip(&c), c);
    }

    #[test]
    fn canonical_form_is_order_insensitive() {
        let a = Constant::map(vec![
            (name("/a"), Constant::number(1)),
            (name("/b"), Constant::string("foo")),
        ]);
        let b = Constant::map(vec![
            (name("/b"), Constant::string("foo")),
            (name("/a"), Constant::number(1)),
        ]);
        assert_eq!(
            encode_constant(&a).unwrap().to_string(),
            encode_constant(&b).unwrap().to_string()
        );
    }

    #[test]
    fn empty_compounds_round_trip() {
        for c in [
            Constant::list(vec![]),
            Constant::map(vec![]),
            Constant::structure(vec![]),
        ] {
            assert_eq!(round_trip(&c), c);
        }
    }

    #[test]
    fn at_list_is_accepted_as_list_alias() {
        let v: Value = serde_json::from_str(r#"{"@list":[1,2]}"#).unwrap();
        assert_eq!(
            decode_constant(&v).unwrap(),
            Constant::list(vec![Constant::number(1), Constant::number(2)])
        );
    }

    #[test]
    fn malformed_input_is_rejected() {
        for json in [
            "null",
            "true",
            r#"{"fn:pair":[1]}"#,
            r#"{"fn:map":[1]}"#,
            r#"{"fn:other":[1,2]}"#,
            r#"{"fn:pair":[1,2],"extra":3}"#,
            "18446744073709551615",
        ] {
            let v: Value = serde_json::from_str(json).unwrap();
            assert!(decode_constant(&v).is_err(), "should reject {}", json);
        }
    }

    #[test]
    fn non_finite_floats_are_codec_errors() {
        assert!(encode_constant(&Constant::float(f64::NAN)).is_err());
        assert!(encode_constant(&Constant::float(f64::INFINITY)).is_err());
    }

    #[test]
    fn atom_wire_round_trip() {
        let atom = Atom::fact("age", vec![name("/mary"), Constant::number(30)]);
        let wire = encode_atom(&atom).unwrap();
        assert_eq!(decode_atom(&wire).unwrap(), atom);
    }

    #[test]
    fn atom_wire_rejects_arity_mismatch() {
        let v: Value = serde_json::from_str(
            r#"{"predicate":{"symbol":"p","arity":2},"args":[1]}"#,
        )
        .unwrap();
        assert!(decode_atom(&v).is_err());
    }

    #[test]
    fn negative_numbers_fold_the_sign_into_the_token() {
        let v: Value = serde_json::from_str("-5").unwrap();
        assert_eq!(decode_constant(&v).unwrap(), Constant::number(-5));
        let v: Value = serde_json::from_str("-2.5").unwrap();
        assert_eq!(decode_constant(&v).unwrap(), Constant::float(-2.5));
    }

    #[test]
    fn row_encoding_rejects_variables() {
        let pattern = Atom::new_query(PredicateSym::new("p", 1));
        assert!(encode_row(&pattern).is_err());
    }
}

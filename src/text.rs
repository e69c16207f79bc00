//! Parser for the canonical constant text form.
//!
//! The grammar lives in `constant.pest` and mirrors what
//! [`crate::value::Constant`]'s `Display` emits, so
//! `parse_constant(&c.to_string())` reproduces `c`. The syntax also shows
//! up as the literal content when compound values are lowered to RDF
//! string literals.

use std::str::FromStr;

use pest::iterators::Pair;
use pest::Parser;
use pest_derive::Parser;

use crate::error::{GroundworkError, Result};
use crate::value::{unescape_bytes, unescape_text, Constant};

#[derive(Parser)]
#[grammar = "constant.pest"] // relative to src
struct ConstantParser;

/// Parses the text form of a constant, e.g. `/john`, `b"\x00"`,
/// `[/a : 1, /b : "foo"]` or `fn:pair(1, 2)`.
pub fn parse_constant(input: &str) -> Result<Constant> {
    let mut parsed = ConstantParser::parse(Rule::root, input)
        .map_err(|e| GroundworkError::Parse { message: e.to_string() })?;
    let root = parsed.next().expect("grammar yields one root");
    let constant = root
        .into_inner()
        .next()
        .expect("root wraps one constant");
    build_constant(constant)
}

impl FromStr for Constant {
    type Err = GroundworkError;

    fn from_str(s: &str) -> Result<Constant> {
        parse_constant(s)
    }
}

fn build_constant(pair: Pair<Rule>) -> Result<Constant> {
    match pair.as_rule() {
        Rule::constant => build_constant(pair.into_inner().next().expect("one alternative")),
        Rule::name => Constant::name(pair.as_str()),
        Rule::string => {
            let raw = pair.as_str();
            Ok(Constant::String(unescape_text(&raw[1..raw.len() - 1])?))
        }
        Rule::bytes => {
            let raw = pair.as_str();
            Ok(Constant::Bytes(unescape_bytes(&raw[2..raw.len() - 1])?))
        }
        Rule::int => {
            let n: i64 = pair.as_str().parse().map_err(|_| GroundworkError::Parse {
                message: format!("integer out of range: {}", pair.as_str()),
            })?;
            Ok(Constant::Number(n))
        }
        Rule::float => {
            let x: f64 = pair.as_str().parse().map_err(|_| GroundworkError::Parse {
                message: format!("malformed float: {}", pair.as_str()),
            })?;
            Ok(Constant::Float(x))
        }
        Rule::list => {
            let elements: Vec<Constant> =
                pair.into_inner().map(build_constant).collect::<Result<_>>()?;
            Ok(Constant::List(elements))
        }
        Rule::map => Ok(Constant::map(build_entries(pair)?)),
        Rule::strukt => Ok(Constant::structure(build_entries(pair)?)),
        Rule::fncall => build_fncall(pair),
        rule => Err(GroundworkError::Parse {
            message: format!("unexpected rule {:?}", rule),
        }),
    }
}

fn build_entries(pair: Pair<Rule>) -> Result<Vec<(Constant, Constant)>> {
    pair.into_inner()
        .map(|entry| {
            let mut parts = entry.into_inner();
            let key = build_constant(parts.next().expect("entry key"))?;
            let value = build_constant(parts.next().expect("entry value"))?;
            Ok((key, value))
        })
        .collect()
}

fn build_fncall(pair: Pair<Rule>) -> Result<Constant> {
    let mut parts = pair.into_inner();
    let symbol = parts.next().expect("fn symbol").as_str().to_owned();
    let args: Vec<Constant> = parts.map(build_constant).collect::<Result<_>>()?;
    match symbol.as_str() {
        crate::codec::FN_PAIR => {
            if args.len() != 2 {
                return Err(GroundworkError::Parse {
                    message: format!("fn:pair expects 2 args, got {}", args.len()),
                });
            }
            let mut args = args.into_iter();
            let fst = args.next().expect("two args");
            let snd = args.next().expect("two args");
            Ok(Constant::pair(fst, snd))
        }
        crate::codec::FN_MAP | crate::codec::FN_STRUCT => {
            if args.len() % 2 != 0 {
                return Err(GroundworkError::Parse {
                    message: format!("{} expects an even number of args, got {}", symbol, args.len()),
                });
            }
            let mut entries = Vec::with_capacity(args.len() / 2);
            let mut args = args.into_iter();
            while let (Some(key), Some(value)) = (args.next(), args.next()) {
                entries.push((key, value));
            }
            if symbol == crate::codec::FN_MAP {
                Ok(Constant::map(entries))
            } else {
                Ok(Constant::structure(entries))
            }
        }
        other => Err(GroundworkError::Parse {
            message: format!("unknown function symbol: {}", other),
        }),
    }
}

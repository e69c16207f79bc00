//! Arity-based RDF mapping.
//!
//! A second, optional external encoding of facts as RDF quads in a single
//! default graph. The lowering is determined by predicate arity:
//!
//! * arity 0: `_:bN rdf:type <ns:p>` for a fresh blank node
//! * arity 1: `a rdf:type <ns:p>`
//! * arity 2: `a <ns:p> b`
//! * arity 3+: reification; a fresh blank statement node carries
//!   `rdf:type rdf:Statement`, `rdf:subject`, `rdf:predicate`,
//!   `rdf:object`, plus `<ns:argI>` properties for the remaining positions
//!
//! Names become IRIs; strings, bytes, integers and floats become typed
//! literals. Compound values fall back to an `xsd:string` literal of their
//! canonical text form, a lossy path accepted as a non-goal for full
//! interop.
//!
//! The raising direction groups quads by subject, reconstructs reified
//! statements first, and treats everything else as type or simple triples.
//! Detection of W3C n-ary relation patterns is a declared extension point
//! and currently always declines.
//!
//! Datasets serialize to and from N-Quads text ([`Dataset::to_nquads`],
//! [`Dataset::from_nquads`]) for interchange with RDF tooling.

use std::collections::HashMap;

use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};

use crate::atom::{Atom, PredicateSym, Term};
use crate::error::{GroundworkError, Result};
use crate::value::{format_float, Constant};

// RDF syntax namespace
pub const RDF_TYPE: &str = "http://www.w3.org/1999/02/22-rdf-syntax-ns#type";
pub const RDF_STATEMENT: &str = "http://www.w3.org/1999/02/22-rdf-syntax-ns#Statement";
pub const RDF_SUBJECT: &str = "http://www.w3.org/1999/02/22-rdf-syntax-ns#subject";
pub const RDF_PREDICATE: &str = "http://www.w3.org/1999/02/22-rdf-syntax-ns#predicate";
pub const RDF_OBJECT: &str = "http://www.w3.org/1999/02/22-rdf-syntax-ns#object";

// XSD datatypes
pub const XSD_STRING: &str = "http://www.w3.org/2001/XMLSchema#string";
pub const XSD_INTEGER: &str = "http://www.w3.org/2001/XMLSchema#integer";
pub const XSD_DOUBLE: &str = "http://www.w3.org/2001/XMLSchema#double";
pub const XSD_BASE64: &str = "http://www.w3.org/2001/XMLSchema#base64Binary";

/// Namespace for predicate IRIs and `argI` properties.
pub const NAMESPACE: &str = "http://groundwork.datalog.org/";

/// Name of the single graph all quads live in.
pub const DEFAULT_GRAPH: &str = "@default";

// ------------- Quad model -------------
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Node {
    Iri(String),
    Blank(String),
    Literal { value: String, datatype: String },
}

impl Node {
    pub fn iri(value: impl Into<String>) -> Node {
        Node::Iri(value.into())
    }

    pub fn blank(label: impl Into<String>) -> Node {
        Node::Blank(label.into())
    }

    pub fn literal(value: impl Into<String>, datatype: impl Into<String>) -> Node {
        Node::Literal { value: value.into(), datatype: datatype.into() }
    }

    pub fn is_blank(&self) -> bool {
        matches!(self, Node::Blank(_))
    }

    /// Grouping key; distinct subjects must map to distinct keys.
    fn key(&self) -> String {
        match self {
            Node::Iri(value) => format!("<{}>", value),
            Node::Blank(label) => format!("_:{}", label),
            Node::Literal { value, datatype } => format!("\"{}\"^^{}", value, datatype),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Quad {
    pub subject: Node,
    pub predicate: Node,
    pub object: Node,
    pub graph: String,
}

impl Quad {
    pub fn new(subject: Node, predicate: Node, object: Node) -> Quad {
        Quad { subject, predicate, object, graph: DEFAULT_GRAPH.to_owned() }
    }
}

/// A quad dataset with a single default graph.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Dataset {
    pub quads: Vec<Quad>,
}

impl Dataset {
    /// Serializes the dataset as N-Quads (one `s p o .` line per quad;
    /// the default graph is implicit).
    pub fn to_nquads(&self) -> String {
        let mut out = String::new();
        for quad in &self.quads {
            write_node(&mut out, &quad.subject);
            out.push(' ');
            write_node(&mut out, &quad.predicate);
            out.push(' ');
            write_node(&mut out, &quad.object);
            out.push_str(" .\n");
        }
        out
    }

    /// Parses N-Quads text back into a dataset. Blank lines and `#`
    /// comment lines are skipped; a literal without a datatype reads as
    /// `xsd:string`.
    pub fn from_nquads(text: &str) -> Result<Dataset> {
        let mut quads = Vec::new();
        for (number, line) in text.lines().enumerate() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let mut rest = line;
            let subject = read_node(&mut rest).map_err(|e| at_line(number, e))?;
            let predicate = read_node(&mut rest).map_err(|e| at_line(number, e))?;
            let object = read_node(&mut rest).map_err(|e| at_line(number, e))?;
            if rest.trim() != "." {
                return Err(at_line(number, GroundworkError::Rdf("missing terminating '.'".into())));
            }
            quads.push(Quad::new(subject, predicate, object));
        }
        Ok(Dataset { quads })
    }
}

fn at_line(number: usize, e: GroundworkError) -> GroundworkError {
    GroundworkError::Rdf(format!("line {}: {}", number + 1, e))
}

fn write_node(out: &mut String, node: &Node) {
    match node {
        Node::Iri(iri) => {
            out.push('<');
            out.push_str(iri);
            out.push('>');
        }
        Node::Blank(label) => {
            out.push_str("_:");
            out.push_str(label);
        }
        Node::Literal { value, datatype } => {
            out.push('"');
            out.push_str(&escape_literal(value));
            out.push('"');
            if datatype != XSD_STRING {
                out.push_str("^^<");
                out.push_str(datatype);
                out.push('>');
            }
        }
    }
}

fn escape_literal(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            _ => out.push(c),
        }
    }
    out
}

/// Reads the next node from the front of `rest`, advancing past it.
fn read_node(rest: &mut &str) -> Result<Node> {
    let s = rest.trim_start();
    if let Some(after) = s.strip_prefix('<') {
        let end = after
            .find('>')
            .ok_or_else(|| GroundworkError::Rdf("unterminated IRI".into()))?;
        *rest = &after[end + 1..];
        return Ok(Node::iri(&after[..end]));
    }
    if let Some(after) = s.strip_prefix("_:") {
        let end = after
            .find(|c: char| c.is_whitespace())
            .unwrap_or(after.len());
        *rest = &after[end..];
        return Ok(Node::blank(&after[..end]));
    }
    if let Some(after) = s.strip_prefix('"') {
        let (value, tail) = read_quoted(after)?;
        let (datatype, tail) = if let Some(dt_rest) = tail.strip_prefix("^^<") {
            let end = dt_rest
                .find('>')
                .ok_or_else(|| GroundworkError::Rdf("unterminated datatype IRI".into()))?;
            (dt_rest[..end].to_owned(), &dt_rest[end + 1..])
        } else {
            (XSD_STRING.to_owned(), tail)
        };
        *rest = tail;
        return Ok(Node::Literal { value, datatype });
    }
    Err(GroundworkError::Rdf(format!("unrecognized node: {}", s)))
}

/// Consumes an escaped literal body up to its closing quote. Returns the
/// unescaped value and the text after the quote.
fn read_quoted(s: &str) -> Result<(String, &str)> {
    let mut value = String::new();
    let mut chars = s.char_indices();
    while let Some((i, c)) = chars.next() {
        match c {
            '"' => return Ok((value, &s[i + 1..])),
            '\\' => match chars.next() {
                Some((_, '"')) => value.push('"'),
                Some((_, '\\')) => value.push('\\'),
                Some((_, 'n')) => value.push('\n'),
                Some((_, 'r')) => value.push('\r'),
                Some((_, 't')) => value.push('\t'),
                other => {
                    return Err(GroundworkError::Rdf(format!(
                        "invalid literal escape: \\{}",
                        other.map(|(_, c)| String::from(c)).unwrap_or_default()
                    )))
                }
            },
            _ => value.push(c),
        }
    }
    Err(GroundworkError::Rdf("unterminated literal".into()))
}

/// Mints process-unique blank node labels within one lowering run.
struct BlankIssuer {
    next: u64,
}

impl BlankIssuer {
    fn new() -> Self {
        Self { next: 0 }
    }

    fn issue(&mut self, hint: &str) -> Node {
        let label = format!("{}{}", hint, self.next);
        self.next += 1;
        Node::Blank(label)
    }
}

// ------------- Lowering -------------

/// Converts atoms into an RDF dataset using the arity-based mapping.
pub fn atoms_to_rdf(atoms: &[Atom]) -> Result<Dataset> {
    let mut issuer = BlankIssuer::new();
    let mut dataset = Dataset::default();
    for atom in atoms {
        atom_to_quads(atom, &mut issuer, &mut dataset.quads)?;
    }
    Ok(dataset)
}

fn atom_to_quads(atom: &Atom, issuer: &mut BlankIssuer, out: &mut Vec<Quad>) -> Result<()> {
    let predicate_iri = format!("{}{}", NAMESPACE, atom.predicate.symbol);
    let args = atom.ground_args()?;
    match args.len() {
        0 => {
            out.push(Quad::new(
                issuer.issue("b"),
                Node::iri(RDF_TYPE),
                Node::iri(predicate_iri),
            ));
        }
        1 => {
            out.push(Quad::new(
                constant_to_node(args[0]),
                Node::iri(RDF_TYPE),
                Node::iri(predicate_iri),
            ));
        }
        2 => {
            out.push(Quad::new(
                constant_to_node(args[0]),
                Node::iri(predicate_iri),
                constant_to_node(args[1]),
            ));
        }
        _ => reify_atom(&args, &predicate_iri, issuer, out),
    }
    Ok(())
}

/// The reification pattern for arity 3 and above.
fn reify_atom(args: &[&Constant], predicate_iri: &str, issuer: &mut BlankIssuer, out: &mut Vec<Quad>) {
    let statement = issuer.issue("stmt");
    out.push(Quad::new(statement.clone(), Node::iri(RDF_TYPE), Node::iri(RDF_STATEMENT)));
    out.push(Quad::new(statement.clone(), Node::iri(RDF_SUBJECT), constant_to_node(args[0])));
    out.push(Quad::new(statement.clone(), Node::iri(RDF_PREDICATE), Node::iri(predicate_iri)));
    out.push(Quad::new(statement.clone(), Node::iri(RDF_OBJECT), constant_to_node(args[1])));
    for (index, &arg) in args.iter().enumerate().skip(2) {
        out.push(Quad::new(
            statement.clone(),
            Node::iri(format!("{}arg{}", NAMESPACE, index)),
            constant_to_node(arg),
        ));
    }
}

fn constant_to_node(c: &Constant) -> Node {
    match c {
        Constant::Name(symbol) => Node::iri(symbol.clone()),
        Constant::String(s) => Node::literal(s.clone(), XSD_STRING),
        Constant::Number(n) => Node::literal(n.to_string(), XSD_INTEGER),
        Constant::Float(x) => Node::literal(format_float(*x), XSD_DOUBLE),
        Constant::Bytes(b) => Node::literal(BASE64.encode(b), XSD_BASE64),
        // Compound values: canonical text form, lossy by design.
        compound => Node::literal(compound.to_string(), XSD_STRING),
    }
}

// ------------- Raising -------------

/// Reconstructs atoms from a dataset's default graph.
pub fn rdf_to_atoms(dataset: &Dataset) -> Result<Vec<Atom>> {
    // Group quads by subject, preserving first-seen subject order so the
    // output is deterministic.
    let mut order: Vec<String> = Vec::new();
    let mut by_subject: HashMap<String, Vec<&Quad>> = HashMap::new();
    for quad in &dataset.quads {
        let key = quad.subject.key();
        if !by_subject.contains_key(&key) {
            order.push(key.clone());
        }
        by_subject.entry(key).or_default().push(quad);
    }

    let mut atoms = Vec::new();
    for key in order {
        let quads = &by_subject[&key];
        if let Some(atom) = try_reification(quads) {
            atoms.push(atom);
            continue;
        }
        if let Some(atom) = try_nary_pattern(quads) {
            atoms.push(atom);
            continue;
        }
        for &quad in quads.iter() {
            let predicate_iri = match &quad.predicate {
                Node::Iri(iri) => iri.as_str(),
                _ => continue,
            };
            // Constituents of a reified statement are not atoms themselves.
            if predicate_iri == RDF_SUBJECT
                || predicate_iri == RDF_PREDICATE
                || predicate_iri == RDF_OBJECT
            {
                continue;
            }
            if predicate_iri == RDF_TYPE {
                if node_iri(&quad.object) == Some(RDF_STATEMENT) {
                    continue;
                }
                atoms.push(type_triple_to_atom(quad)?);
            } else {
                atoms.push(simple_triple_to_atom(quad)?);
            }
        }
    }
    Ok(atoms)
}

/// Recognizes the reification signature: a statement-typed subject with at
/// least rdf:subject, rdf:predicate and rdf:object, plus contiguous argI
/// properties. Declines (returns None) on anything incomplete.
fn try_reification(quads: &[&Quad]) -> Option<Atom> {
    let mut has_statement_type = false;
    let mut subject: Option<&Node> = None;
    let mut predicate: Option<&Node> = None;
    let mut object: Option<&Node> = None;
    let mut extra: HashMap<usize, &Node> = HashMap::new();

    for quad in quads {
        let predicate_iri = match &quad.predicate {
            Node::Iri(iri) => iri.as_str(),
            _ => continue,
        };
        match predicate_iri {
            RDF_TYPE => {
                if node_iri(&quad.object) == Some(RDF_STATEMENT) {
                    has_statement_type = true;
                }
            }
            RDF_SUBJECT => subject = Some(&quad.object),
            RDF_PREDICATE => predicate = Some(&quad.object),
            RDF_OBJECT => object = Some(&quad.object),
            other => {
                if let Some(rest) = other.strip_prefix(NAMESPACE).and_then(|p| p.strip_prefix("arg")) {
                    if let Ok(index) = rest.parse::<usize>() {
                        extra.insert(index, &quad.object);
                    }
                }
            }
        }
    }

    if !has_statement_type {
        return None;
    }
    let (subject, predicate, object) = (subject?, predicate?, object?);
    let symbol = predicate_symbol(node_iri(predicate)?);

    let arity = 2 + extra.len();
    let mut args = Vec::with_capacity(arity);
    args.push(node_to_constant(subject).ok()?);
    args.push(node_to_constant(object).ok()?);
    for index in 2..arity {
        let node = *extra.get(&index)?;
        args.push(node_to_constant(node).ok()?);
    }

    Some(Atom {
        predicate: PredicateSym::new(symbol, arity),
        args: args.into_iter().map(Term::Constant).collect(),
    })
}

/// W3C n-ary relation patterns; a declared extension point.
fn try_nary_pattern(_quads: &[&Quad]) -> Option<Atom> {
    None
}

/// An rdf:type triple raises to arity 0 (blank subject) or arity 1.
fn type_triple_to_atom(quad: &Quad) -> Result<Atom> {
    let type_iri = node_iri(&quad.object)
        .ok_or_else(|| GroundworkError::Rdf("rdf:type object must be an IRI".into()))?;
    let symbol = predicate_symbol(type_iri);
    if quad.subject.is_blank() {
        return Ok(Atom::fact(symbol, vec![]));
    }
    let subject = node_to_constant(&quad.subject)?;
    Ok(Atom::fact(symbol, vec![subject]))
}

/// Any other triple raises to an arity 2 atom.
fn simple_triple_to_atom(quad: &Quad) -> Result<Atom> {
    let predicate_iri = node_iri(&quad.predicate)
        .ok_or_else(|| GroundworkError::Rdf("triple predicate must be an IRI".into()))?;
    let symbol = predicate_symbol(predicate_iri);
    let subject = node_to_constant(&quad.subject)?;
    let object = node_to_constant(&quad.object)?;
    Ok(Atom::fact(symbol, vec![subject, object]))
}

fn node_iri(node: &Node) -> Option<&str> {
    match node {
        Node::Iri(iri) => Some(iri.as_str()),
        _ => None,
    }
}

/// Strips the store namespace; foreign IRIs keep their full form.
fn predicate_symbol(iri: &str) -> String {
    iri.strip_prefix(NAMESPACE).unwrap_or(iri).to_owned()
}

fn node_to_constant(node: &Node) -> Result<Constant> {
    match node {
        Node::Iri(iri) => Constant::name(iri.clone())
            .map_err(|e| GroundworkError::Rdf(format!("IRI is not a name: {}", e))),
        Node::Blank(label) => Err(GroundworkError::Rdf(format!(
            "blank node _:{} has no constant form",
            label
        ))),
        Node::Literal { value, datatype } => match datatype.as_str() {
            XSD_BASE64 => {
                let bytes = BASE64
                    .decode(value.as_bytes())
                    .map_err(|e| GroundworkError::Rdf(format!("bad base64Binary literal: {}", e)))?;
                Ok(Constant::Bytes(bytes))
            }
            XSD_INTEGER => value
                .parse::<i64>()
                .map(Constant::Number)
                .map_err(|e| GroundworkError::Rdf(format!("bad integer literal: {}", e))),
            XSD_DOUBLE => value
                .parse::<f64>()
                .map(Constant::Float)
                .map_err(|e| GroundworkError::Rdf(format!("bad double literal: {}", e))),
            // xsd:string and anything unrecognized raise as strings.
            _ => Ok(Constant::String(value.clone())),
        },
    }
}

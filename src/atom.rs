//! Predicates, terms, and atoms.
//!
//! An [`Atom`] is a [`PredicateSym`] applied to a sequence of [`Term`]s of
//! exactly the declared arity. The store only persists ground atoms; query
//! patterns may use variables as wildcards.
//!
//! The persisted key form of a predicate is `"{symbol}_{arity}"`. Since the
//! symbol alphabet permits underscores, [`PredicateSym::from_key`] splits at
//! the last underscore.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{GroundworkError, Result};
use crate::value::Constant;

// ------------- PredicateSym -------------
/// A predicate symbol with its fixed arity.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PredicateSym {
    pub symbol: String,
    pub arity: usize,
}

impl PredicateSym {
    pub fn new(symbol: impl Into<String>, arity: usize) -> Self {
        Self { symbol: symbol.into(), arity }
    }

    /// The canonical database key, e.g. `parent_2`.
    pub fn key(&self) -> String {
        format!("{}_{}", self.symbol, self.arity)
    }

    /// Parses a database key back into a predicate symbol. The split point
    /// is the last underscore, so `my_predicate_3` round-trips.
    pub fn from_key(key: &str) -> Result<Self> {
        let split = key
            .rfind('_')
            .ok_or_else(|| GroundworkError::PredicateKey(key.to_owned()))?;
        let symbol = &key[..split];
        let arity: usize = key[split + 1..]
            .parse()
            .map_err(|_| GroundworkError::PredicateKey(key.to_owned()))?;
        if symbol.is_empty() {
            return Err(GroundworkError::PredicateKey(key.to_owned()));
        }
        Ok(Self::new(symbol, arity))
    }
}

impl fmt::Display for PredicateSym {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}/{}", self.symbol, self.arity)
    }
}

// ------------- Term -------------
/// An atom argument: either a ground constant or a wildcard variable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Term {
    Constant(Constant),
    Variable(String),
}

impl Term {
    pub fn is_constant(&self) -> bool {
        matches!(self, Term::Constant(_))
    }

    /// The constant payload, if this term is ground.
    pub fn constant(&self) -> Option<&Constant> {
        match self {
            Term::Constant(c) => Some(c),
            Term::Variable(_) => None,
        }
    }
}

impl From<Constant> for Term {
    fn from(c: Constant) -> Self {
        Term::Constant(c)
    }
}

impl fmt::Display for Term {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Term::Constant(c) => write!(f, "{}", c),
            Term::Variable(v) => write!(f, "{}", v),
        }
    }
}

// ------------- Atom -------------
/// A predicate applied to arguments. Ground atoms are facts; atoms with
/// variables are query patterns.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Atom {
    pub predicate: PredicateSym,
    pub args: Vec<Term>,
}

impl Atom {
    /// Creates an atom from terms. The predicate arity must match.
    pub fn new(predicate: PredicateSym, args: Vec<Term>) -> Self {
        debug_assert_eq!(predicate.arity, args.len());
        Self { predicate, args }
    }

    /// Creates a ground atom directly from constants, deriving the arity.
    pub fn fact(symbol: impl Into<String>, args: Vec<Constant>) -> Self {
        let symbol = symbol.into();
        Self {
            predicate: PredicateSym::new(symbol, args.len()),
            args: args.into_iter().map(Term::Constant).collect(),
        }
    }

    /// The all-wildcard pattern matching every fact of a predicate.
    pub fn new_query(predicate: PredicateSym) -> Self {
        let args = (0..predicate.arity).map(|i| Term::Variable(format!("X{}", i))).collect();
        Self { predicate, args }
    }

    pub fn is_ground(&self) -> bool {
        self.args.iter().all(Term::is_constant)
    }

    /// Borrows the arguments as constants, failing on the first variable.
    pub fn ground_args(&self) -> Result<Vec<&Constant>> {
        self.args
            .iter()
            .map(|t| t.constant().ok_or_else(|| GroundworkError::NonGround(self.to_string())))
            .collect()
    }
}

impl fmt::Display for Atom {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}(", self.predicate.symbol)?;
        for (i, arg) in self.args.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}", arg)?;
        }
        write!(f, ")")
    }
}

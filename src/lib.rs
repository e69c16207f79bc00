//! Groundwork – a persistent, concurrent-safe fact store for Datalog-style
//! logic engines.
//!
//! Clients assert, retract, query and bulk-transfer ground *atoms*:
//! predicate symbols applied to fully evaluated constants drawn from a
//! closed value algebra (names, strings, numbers, floats, byte strings,
//! lists, pairs, maps, structs). Everything lives in one relational table:
//!
//! ```text
//! facts(predicate TEXT, atom_hash BIGINT PRIMARY KEY, args <binary JSON>)
//! ```
//!
//! The `atom_hash` is a structural 64-bit fingerprint of the whole atom,
//! order-insensitive for map and struct arguments, so a map argument
//! deduplicates to the same row no matter which order its entries were
//! written in. The `args` column holds the canonical JSON encoding, which
//! doubles as the bulk import/export stream format and lets the query
//! planner push ground-argument filters into the SQL layer as JSON-path
//! predicates.
//!
//! ## Modules
//! * [`value`] – the [`value::Constant`] algebra and its canonical text form.
//! * [`atom`] – [`atom::PredicateSym`], [`atom::Term`], [`atom::Atom`].
//! * [`fingerprint`] – structural hashing and the atom primary key.
//! * [`codec`] – the canonical JSON codec for storage and transport.
//! * [`text`] – parser for the constant text form (pest grammar).
//! * [`dialect`] – SQL generation for SQLite and PostgreSQL.
//! * [`store`] – [`store::FactStore`] over a pooled backend, plus bulk
//!   import/export.
//! * [`memory`] – [`memory::MemoryStore`], the in-process store.
//! * [`rdf`] – optional arity-based RDF quad mapping.
//! * [`jsonld`] – linked-data document rendition (`@context`/`@graph`).
//!
//! ## Backends
//! The embedded backend is SQLite: a file path, or `:memory:` for an
//! isolated in-memory database. A PostgreSQL backend is available behind
//! the `postgres` cargo feature.
//!
//! ## Quick Start
//! ```
//! use groundwork::atom::Atom;
//! use groundwork::store::{FactStore, SqliteOptions};
//! use groundwork::value::Constant;
//!
//! let store = FactStore::open_sqlite(":memory:", SqliteOptions::default()).unwrap();
//! let fact = Atom::fact("parent", vec![
//!     Constant::name("/john").unwrap(),
//!     Constant::name("/mary").unwrap(),
//! ]);
//! assert!(store.add(&fact));
//! assert!(!store.add(&fact));
//! assert!(store.contains(&fact));
//! assert_eq!(store.estimate_fact_count(), 1);
//! ```
//!
//! ## License
//! Dual licensed under Apache-2.0 and MIT.

pub mod atom;
pub mod codec;
pub mod dialect;
pub mod error;
pub mod fingerprint;
pub mod jsonld;
pub mod memory;
pub mod rdf;
pub mod store;
pub mod text;
pub mod value;

// Re-export the types most hosts touch.
pub use atom::{Atom, PredicateSym, Term};
pub use error::{GroundworkError, Result};
pub use memory::MemoryStore;
pub use store::{FactReader, FactStore, SqliteOptions};
pub use value::Constant;

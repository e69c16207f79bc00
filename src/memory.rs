//! In-memory fact store.
//!
//! [`MemoryStore`] keeps facts in process memory, keyed the same way the
//! persistent store keys its rows: by predicate, then by structural atom
//! hash. It implements [`FactReader`], so it can seed a persistent store
//! through [`crate::store::FactStore::merge`] and serves as the lightweight
//! default for hosts that do not need durability.

use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::sync::RwLock;

use tracing::warn;

use crate::atom::{Atom, PredicateSym, Term};
use crate::error::Result;
use crate::fingerprint::atom_hash;
use crate::store::FactReader;

pub struct MemoryStore {
    facts: RwLock<HashMap<PredicateSym, HashMap<i64, Atom>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self { facts: RwLock::new(HashMap::new()) }
    }

    /// Adds a ground atom. Returns `true` iff it was not present.
    pub fn add(&self, atom: &Atom) -> bool {
        let hash = match atom_hash(atom) {
            Ok(hash) => hash,
            Err(e) => {
                warn!(error = %e, atom = %atom, "add failed");
                return false;
            }
        };
        let mut facts = self.facts.write().unwrap();
        match facts.entry(atom.predicate.clone()).or_default().entry(hash) {
            Entry::Occupied(_) => false,
            Entry::Vacant(slot) => {
                slot.insert(atom.clone());
                true
            }
        }
    }

    pub fn contains(&self, atom: &Atom) -> bool {
        let Ok(hash) = atom_hash(atom) else {
            return false;
        };
        self.facts
            .read()
            .unwrap()
            .get(&atom.predicate)
            .is_some_and(|bucket| bucket.contains_key(&hash))
    }

    /// Removes a ground atom. Returns `true` iff it was present.
    pub fn remove(&self, atom: &Atom) -> bool {
        let Ok(hash) = atom_hash(atom) else {
            return false;
        };
        let mut facts = self.facts.write().unwrap();
        let Some(bucket) = facts.get_mut(&atom.predicate) else {
            return false;
        };
        let removed = bucket.remove(&hash).is_some();
        if bucket.is_empty() {
            facts.remove(&atom.predicate);
        }
        removed
    }

    pub fn estimate_fact_count(&self) -> i64 {
        self.facts
            .read()
            .unwrap()
            .values()
            .map(|bucket| bucket.len() as i64)
            .sum()
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl FactReader for MemoryStore {
    fn list_predicates(&self) -> Vec<PredicateSym> {
        self.facts.read().unwrap().keys().cloned().collect()
    }

    fn get_facts(
        &self,
        pattern: &Atom,
        yield_fn: &mut dyn FnMut(Atom) -> Result<()>,
    ) -> Result<()> {
        // Clone the matching bucket out so the lock is not held across
        // callback invocations.
        let matching: Vec<Atom> = {
            let facts = self.facts.read().unwrap();
            match facts.get(&pattern.predicate) {
                Some(bucket) => bucket
                    .values()
                    .filter(|atom| matches_pattern(pattern, atom))
                    .cloned()
                    .collect(),
                None => Vec::new(),
            }
        };
        for atom in matching {
            yield_fn(atom)?;
        }
        Ok(())
    }
}

fn matches_pattern(pattern: &Atom, atom: &Atom) -> bool {
    pattern.args.iter().zip(&atom.args).all(|(p, a)| match p {
        Term::Variable(_) => true,
        Term::Constant(c) => a.constant() == Some(c),
    })
}

//! Structural fingerprints and the atom hash.
//!
//! Every value gets a stable 64-bit fingerprint from a seeded [`SeaHasher`]
//! digest over its structure. Map and struct entries are folded in key
//! fingerprint order, so the digest never depends on in-memory entry order.
//!
//! Fingerprints are combined with Szudzik's elegant pairing function into
//! the [`atom_hash`], the primary key of a persisted fact. The hash starts
//! from the predicate and folds every argument with its type tag, flattening
//! map and struct arguments into their sorted entries. The accumulator is
//! reinterpreted as `i64` for storage in a signed BIGINT column.

use std::hash::Hasher;

use seahash::SeaHasher;

use crate::atom::Atom;
use crate::error::{GroundworkError, Result};
use crate::value::Constant;

/// Stable discriminant for each value variant, folded into hashes next to
/// the value fingerprint. Must never be renumbered once data exists.
pub fn type_tag(c: &Constant) -> u64 {
    match c {
        Constant::Name(_) => 1,
        Constant::String(_) => 2,
        Constant::Bytes(_) => 3,
        Constant::Number(_) => 4,
        Constant::Float(_) => 5,
        Constant::List(_) => 6,
        Constant::Pair(_, _) => 7,
        Constant::Map(_) => 8,
        Constant::Struct(_) => 9,
    }
}

/// Szudzik's elegant pairing function on unsigned 64-bit integers.
/// See <http://szudzik.com/ElegantPairing.pdf>.
pub fn szudzik_pair(fst: u64, snd: u64) -> u64 {
    if fst >= snd {
        fst.wrapping_mul(fst).wrapping_add(fst).wrapping_add(snd)
    } else {
        snd.wrapping_mul(snd).wrapping_add(fst)
    }
}

/// The structural fingerprint of a value.
pub fn fingerprint(c: &Constant) -> u64 {
    let mut hasher = SeaHasher::new();
    write_constant(&mut hasher, c);
    hasher.finish()
}

fn write_constant(hasher: &mut SeaHasher, c: &Constant) {
    hasher.write_u8(type_tag(c) as u8);
    match c {
        Constant::Name(s) => hasher.write(s.as_bytes()),
        Constant::String(s) => hasher.write(s.as_bytes()),
        Constant::Bytes(b) => hasher.write(b),
        Constant::Number(n) => hasher.write_i64(*n),
        Constant::Float(x) => hasher.write_u64(x.to_bits()),
        Constant::List(elements) => {
            for element in elements {
                hasher.write_u64(fingerprint(element));
            }
        }
        Constant::Pair(fst, snd) => {
            hasher.write_u64(fingerprint(fst));
            hasher.write_u64(fingerprint(snd));
        }
        Constant::Map(entries) | Constant::Struct(entries) => {
            for (key_print, value_print) in sorted_entry_prints(entries) {
                hasher.write_u64(key_print);
                hasher.write_u64(value_print);
            }
        }
    }
}

/// Fingerprints of map/struct entries in key fingerprint order. Sorting
/// here keeps the digest order-insensitive even for values assembled
/// without the normalizing constructors.
fn sorted_entry_prints(entries: &[(Constant, Constant)]) -> Vec<(u64, u64)> {
    let mut prints: Vec<(u64, u64)> = entries
        .iter()
        .map(|(key, value)| (fingerprint(key), fingerprint(value)))
        .collect();
    prints.sort_by_key(|(key_print, _)| *key_print);
    prints
}

/// Map/struct entries sorted by key fingerprint, flattened key-then-value.
/// Shared by the hasher and the canonical encoder.
pub(crate) fn sorted_entries(entries: &[(Constant, Constant)]) -> Vec<&Constant> {
    let mut sorted: Vec<&(Constant, Constant)> = entries.iter().collect();
    sorted.sort_by_key(|(key, _)| fingerprint(key));
    let mut flat = Vec::with_capacity(sorted.len() * 2);
    for (key, value) in sorted {
        flat.push(key);
        flat.push(value);
    }
    flat
}

/// The 64-bit structural hash of a ground atom, used as the primary key.
/// Fails if any argument is a variable.
pub fn atom_hash(atom: &Atom) -> Result<i64> {
    let symbol_hash = seahash::hash(atom.predicate.symbol.as_bytes());
    let mut acc = szudzik_pair(symbol_hash, atom.predicate.arity as u64);
    for term in &atom.args {
        let constant = term
            .constant()
            .ok_or_else(|| GroundworkError::NonGround(atom.to_string()))?;
        match constant {
            Constant::Map(entries) | Constant::Struct(entries) => {
                // Order-insensitive: fold the sorted entries, key then value.
                for part in sorted_entries(entries) {
                    acc = szudzik_pair(acc, szudzik_pair(fingerprint(part), type_tag(part)));
                }
            }
            _ => {
                acc = szudzik_pair(acc, szudzik_pair(fingerprint(constant), type_tag(constant)));
            }
        }
    }
    Ok(acc as i64)
}

// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Content keys for collection predicates.
//!
//! Elements are reduced to a keyed hash of their content so that set style
//! checks are a hash-set lookup instead of pairwise deep comparison.
//! Primitives hash their literal encoding, lists and tuples hash their
//! elements in order, maps and objects hash their entries in key order.
//! Variant and generic wrappers are transparent.
//!
//! The key of a [`ContentHasher`] is random and lives only as long as the
//! hasher. Content keys must never be stored or compared across hashers.

use crate::value::Value;

use std::collections::HashSet;

pub type ContentKey = [u8; 32];

pub struct ContentHasher {
    key: [u8; 32],
}

impl ContentHasher {
    /// Hasher with a fresh random seed.
    pub fn new() -> Self {
        Self {
            key: rand::random(),
        }
    }

    pub fn key(&self, value: &Value) -> ContentKey {
        let mut hasher = blake3::Hasher::new_keyed(&self.key);
        self.feed(&mut hasher, value);
        *hasher.finalize().as_bytes()
    }

    fn feed(&self, hasher: &mut blake3::Hasher, value: &Value) {
        match value.unwrapped() {
            Value::Null => {
                hasher.update(b"n");
            }
            Value::Bool(b) => {
                hasher.update(if *b { b"t" } else { b"f" });
            }
            Value::Number(n) => {
                hasher.update(b"d");
                hasher.update(&canonical_bits(*n).to_le_bytes());
            }
            Value::String(s) => {
                hasher.update(b"s");
                hasher.update(&(s.len() as u64).to_le_bytes());
                hasher.update(s.as_bytes());
            }
            v @ (Value::List(_) | Value::Tuple(_)) => {
                let items = v.as_sequence().unwrap_or_default();
                hasher.update(b"l");
                hasher.update(&(items.len() as u64).to_le_bytes());
                for item in items {
                    hasher.update(&self.key(item));
                }
            }
            v @ (Value::Map(_) | Value::Object(_)) => {
                hasher.update(b"m");
                if let Some(entries) = v.as_entries() {
                    hasher.update(&(entries.len() as u64).to_le_bytes());
                    // BTreeMap iterates in sorted key order.
                    for (k, item) in entries.iter() {
                        hasher.update(&(k.len() as u64).to_le_bytes());
                        hasher.update(k.as_bytes());
                        hasher.update(&self.key(item));
                    }
                }
            }
            Value::Variant(_) | Value::Generic(_) => (),
        }
    }

    pub fn key_set(&self, items: &[Value]) -> HashSet<ContentKey> {
        items.iter().map(|v| self.key(v)).collect()
    }
}

// -0.0 and 0.0 compare equal and so must hash equal. All NaNs share one key.
fn canonical_bits(n: f64) -> u64 {
    if n == 0.0 {
        0
    } else if n.is_nan() {
        f64::NAN.to_bits()
    } else {
        n.to_bits()
    }
}

/// Structural equality that ignores wrappers and type descriptors.
/// Sequences compare positionally. NaN equals NaN, matching content keys.
pub fn deep_eq(a: &Value, b: &Value) -> bool {
    let (a, b) = (a.unwrapped(), b.unwrapped());
    match (a, b) {
        (Value::Null, Value::Null) => true,
        (Value::Bool(x), Value::Bool(y)) => x == y,
        (Value::Number(x), Value::Number(y)) => x == y || (x.is_nan() && y.is_nan()),
        (Value::String(x), Value::String(y)) => x == y,
        _ => match (a.as_sequence(), b.as_sequence()) {
            (Some(x), Some(y)) => x.len() == y.len() && x.iter().zip(y).all(|(p, q)| deep_eq(p, q)),
            (None, None) => match (a.as_entries(), b.as_entries()) {
                (Some(x), Some(y)) => {
                    x.len() == y.len()
                        && x.iter()
                            .zip(y.iter())
                            .all(|((kx, vx), (ky, vy))| kx == ky && deep_eq(vx, vy))
                }
                _ => false,
            },
            _ => false,
        },
    }
}

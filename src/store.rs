// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Path addressed store of resolved value trees.
//!
//! Every path prefix is identified by a hash chained from the root: the hash
//! of a prefix is the keyed hash of the previous prefix's hash followed by the
//! tagged text of the next step. Looking up a path computes the chain, finds
//! the longest prefix already cached and only walks the remaining steps,
//! caching every node it visits on the way.
//!
//! Entries also keep the literal prefix text, and a hit whose text differs
//! from the requested prefix is treated as a miss, so a hash collision can
//! never alias two distinct paths.

use crate::error::ResolutionError;
use crate::path::{Path, Step};
use crate::value::Value;

use core::sync::atomic::{AtomicUsize, Ordering};
use std::collections::HashMap;

use parking_lot::RwLock;
use tracing::trace;

pub type PathHash = [u8; 32];

#[derive(Debug)]
struct Entry {
    text: String,
    value: Value,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StoreStats {
    /// Lookups answered entirely from the cache.
    pub hits: usize,
    /// Steps walked through value trees because their prefix was not cached.
    pub steps_walked: usize,
}

#[derive(Debug)]
pub struct ValueReferenceStore {
    key: [u8; 32],
    entries: RwLock<HashMap<PathHash, Entry>>,
    hits: AtomicUsize,
    steps_walked: AtomicUsize,
}

impl Default for ValueReferenceStore {
    fn default() -> Self {
        Self::new()
    }
}

impl ValueReferenceStore {
    pub fn new() -> Self {
        Self::with_key(rand::random())
    }

    pub fn with_key(key: [u8; 32]) -> Self {
        Self {
            key,
            entries: RwLock::new(HashMap::new()),
            hits: AtomicUsize::new(0),
            steps_walked: AtomicUsize::new(0),
        }
    }

    fn chain(&self, prior: Option<&PathHash>, step: &Step) -> PathHash {
        let mut hasher = blake3::Hasher::new_keyed(&self.key);
        if let Some(prior) = prior {
            hasher.update(prior);
        }
        hasher.update(&[step.tag()]);
        hasher.update(step.text().as_bytes());
        *hasher.finalize().as_bytes()
    }

    /// Hash of every prefix of `path`, shortest first.
    pub fn prefix_hashes(&self, path: &Path) -> Vec<PathHash> {
        let mut hashes: Vec<PathHash> = Vec::with_capacity(path.len());
        for step in path.steps() {
            let h = self.chain(hashes.last(), step);
            hashes.push(h);
        }
        hashes
    }

    /// Publish the value tree of a source or reference alias.
    ///
    /// Replacing an alias drops every cached node below it.
    pub fn insert_root(&self, alias: &str, value: Value) {
        let root = Path::from_root(alias);
        let hash = self.chain(None, &root.steps()[0]);

        let mut entries = self.entries.write();
        if entries.contains_key(&hash) {
            entries.retain(|_, e| !is_under(&e.text, alias));
        }
        entries.insert(
            hash,
            Entry {
                text: alias.to_string(),
                value,
            },
        );
    }

    pub fn contains_root(&self, alias: &str) -> bool {
        let hash = self.chain(None, &Step::Root(alias.to_string()));
        self.entries
            .read()
            .get(&hash)
            .map(|e| e.text == alias)
            .unwrap_or(false)
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn stats(&self) -> StoreStats {
        StoreStats {
            hits: self.hits.load(Ordering::Relaxed),
            steps_walked: self.steps_walked.load(Ordering::Relaxed),
        }
    }

    /// Resolve `path` to a value, reusing the longest cached prefix.
    pub fn get_at_path(&self, path: &Path) -> Result<Value, ResolutionError> {
        let hashes = self.prefix_hashes(path);
        let texts = path.prefix_texts();
        let n = hashes.len();

        // The read lock only covers the prefix search, not the walk.
        let cached = {
            let entries = self.entries.read();
            (0..n).rev().find_map(|i| {
                entries
                    .get(&hashes[i])
                    .filter(|e| e.text == texts[i])
                    .map(|e| (i, e.value.clone()))
            })
        };

        let Some((mut depth, mut node)) = cached else {
            trace!(path = %path, "root not found");
            return Err(ResolutionError::NotFound(path.root().to_string()));
        };

        if depth + 1 == n {
            self.hits.fetch_add(1, Ordering::Relaxed);
            trace!(path = %path, "cache hit");
            return Ok(node);
        }

        trace!(path = %path, cached = depth + 1, "walking uncached steps");
        while depth + 1 < n {
            let step = &path.steps()[depth + 1];
            let child = child(&node, step).map_err(|kind| {
                let prefix = texts[depth].clone();
                match kind {
                    Some(kind) => ResolutionError::NotTraversable {
                        path: path.to_string(),
                        prefix,
                        step: step.to_string(),
                        kind,
                    },
                    None => ResolutionError::MissingStep {
                        path: path.to_string(),
                        prefix,
                        step: step.to_string(),
                    },
                }
            })?;

            depth += 1;
            self.steps_walked.fetch_add(1, Ordering::Relaxed);
            self.entries.write().insert(
                hashes[depth],
                Entry {
                    text: texts[depth].clone(),
                    value: child.clone(),
                },
            );
            node = child;
        }

        Ok(node)
    }
}

// Err(None): the step does not exist. Err(Some(kind)): the node cannot be
// traversed by this kind of step.
fn child(node: &Value, step: &Step) -> Result<Value, Option<&'static str>> {
    match step {
        Step::Attr(name) => match node.as_entries() {
            Some(entries) => entries.get(name).cloned().ok_or(None),
            None => Err(Some(node.unwrapped().kind().name())),
        },
        Step::Index(idx) => match node.as_sequence() {
            Some(items) => items.get(*idx).cloned().ok_or(None),
            None => Err(Some(node.unwrapped().kind().name())),
        },
        Step::Root(_) => Err(Some(node.unwrapped().kind().name())),
    }
}

fn is_under(text: &str, alias: &str) -> bool {
    match text.strip_prefix(alias) {
        Some(rest) => rest.is_empty() || rest.starts_with('.') || rest.starts_with('['),
        None => false,
    }
}

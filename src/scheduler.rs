// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Dependency graph used to order reference resolution.

use core::fmt;
use core::hash::Hash;
use std::collections::{HashMap, HashSet, VecDeque};

/// A cycle, listed in dependency order: each node depends on the next one and
/// the last node depends on the first.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cycle<K> {
    nodes: Vec<K>,
}

impl<K: Clone> Cycle<K> {
    pub fn nodes(&self) -> &[K] {
        &self.nodes
    }

    /// Adjacent `(dependent, dependency)` pairs making up the cycle.
    pub fn pairs(&self) -> Vec<(K, K)> {
        let n = self.nodes.len();
        (0..n)
            .map(|i| (self.nodes[i].clone(), self.nodes[(i + 1) % n].clone()))
            .collect()
    }
}

impl<K: fmt::Display> fmt::Display for Cycle<K> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        for node in &self.nodes {
            write!(f, "{node} -> ")?;
        }
        match self.nodes.first() {
            Some(first) => write!(f, "{first}"),
            None => Ok(()),
        }
    }
}

#[derive(Debug)]
pub enum SortResult<K> {
    // Order in which nodes must be processed. Dependencies come first.
    Order(Vec<K>),
    // Every distinct cycle found.
    Cycles(Vec<Cycle<K>>),
}

/// Directed graph over opaque keys. An edge `from -> to` records that `from`
/// depends on `to`.
///
/// Nodes are kept in insertion order, which makes both the topological order
/// and the reported cycles deterministic.
#[derive(Debug, Clone)]
pub struct DependencyGraph<K> {
    keys: Vec<K>,
    index: HashMap<K, usize>,
    // depends_on[i] lists the nodes node i depends on.
    depends_on: Vec<Vec<usize>>,
    order: Vec<K>,
    cycles: Vec<Cycle<K>>,
    ran: bool,
}

impl<K> Default for DependencyGraph<K>
where
    K: Clone + Eq + Hash,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<K> DependencyGraph<K>
where
    K: Clone + Eq + Hash,
{
    pub fn new() -> Self {
        Self {
            keys: vec![],
            index: HashMap::new(),
            depends_on: vec![],
            order: vec![],
            cycles: vec![],
            ran: false,
        }
    }

    pub fn add_node(&mut self, key: K) -> usize {
        if let Some(idx) = self.index.get(&key) {
            return *idx;
        }
        let idx = self.keys.len();
        self.keys.push(key.clone());
        self.index.insert(key, idx);
        self.depends_on.push(vec![]);
        self.ran = false;
        idx
    }

    /// Record that `from` depends on `to`.
    pub fn add_edge(&mut self, from: K, to: K) {
        let from = self.add_node(from);
        let to = self.add_node(to);
        if !self.depends_on[from].contains(&to) {
            self.depends_on[from].push(to);
        }
        self.ran = false;
    }

    pub fn contains(&self, key: &K) -> bool {
        self.index.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    /// Direct dependencies of `key`.
    pub fn dependencies(&self, key: &K) -> Vec<&K> {
        match self.index.get(key) {
            Some(idx) => self.depends_on[*idx].iter().map(|d| &self.keys[*d]).collect(),
            None => vec![],
        }
    }

    /// Compute the topological order and collect all cycles.
    pub fn run(&mut self) -> &mut Self {
        self.order = self.sort();
        self.cycles = if self.order.len() == self.keys.len() {
            vec![]
        } else {
            self.find_cycles()
        };
        self.ran = true;
        self
    }

    /// Nodes with every dependency placed before its dependents. Only
    /// meaningful after [`DependencyGraph::run`] and when the graph is acyclic.
    pub fn order(&self) -> &[K] {
        &self.order
    }

    pub fn has_cycles(&self) -> bool {
        !self.cycles.is_empty()
    }

    pub fn cycles(&self) -> &[Cycle<K>] {
        &self.cycles
    }

    pub fn has_run(&self) -> bool {
        self.ran
    }

    /// Run the graph and return either the order or the cycles.
    pub fn schedule(&mut self) -> SortResult<K> {
        self.run();
        if self.has_cycles() {
            SortResult::Cycles(self.cycles.clone())
        } else {
            SortResult::Order(self.order.clone())
        }
    }

    // Kahn's algorithm. Nodes caught in or behind a cycle never become ready
    // and are left out of the order.
    fn sort(&self) -> Vec<K> {
        let n = self.keys.len();
        let mut pending: Vec<usize> = self.depends_on.iter().map(|d| d.len()).collect();
        let mut dependents = vec![vec![]; n];
        for (from, deps) in self.depends_on.iter().enumerate() {
            for to in deps {
                dependents[*to].push(from);
            }
        }

        let mut ready: VecDeque<usize> = (0..n).filter(|i| pending[*i] == 0).collect();
        let mut order = Vec::with_capacity(n);
        while let Some(node) = ready.pop_front() {
            order.push(self.keys[node].clone());
            for dependent in &dependents[node] {
                pending[*dependent] -= 1;
                if pending[*dependent] == 0 {
                    ready.push_back(*dependent);
                }
            }
        }
        order
    }

    // Depth first search over every node. Each back edge closes a cycle made
    // of the nodes on the stack between its two ends.
    fn find_cycles(&self) -> Vec<Cycle<K>> {
        #[derive(Clone, Copy, PartialEq)]
        enum Color {
            White,
            Gray,
            Black,
        }

        let n = self.keys.len();
        let mut color = vec![Color::White; n];
        let mut stack: Vec<usize> = vec![];
        let mut seen: HashSet<Vec<usize>> = HashSet::new();
        let mut cycles = vec![];

        for start in 0..n {
            if color[start] != Color::White {
                continue;
            }

            // Explicit stack of (node, next dependency to visit).
            let mut frames = vec![(start, 0usize)];
            color[start] = Color::Gray;
            stack.push(start);

            while let Some((node, next)) = frames.last_mut() {
                let node = *node;
                if let Some(dep) = self.depends_on[node].get(*next).copied() {
                    *next += 1;
                    match color[dep] {
                        Color::White => {
                            color[dep] = Color::Gray;
                            stack.push(dep);
                            frames.push((dep, 0));
                        }
                        Color::Gray => {
                            let pos = stack.iter().rposition(|s| *s == dep).unwrap_or(0);
                            let members = stack[pos..].to_vec();
                            if seen.insert(canonical(&members)) {
                                cycles.push(Cycle {
                                    nodes: members.iter().map(|i| self.keys[*i].clone()).collect(),
                                });
                            }
                        }
                        Color::Black => (),
                    }
                } else {
                    color[node] = Color::Black;
                    stack.pop();
                    frames.pop();
                }
            }
        }

        cycles
    }
}

// Rotation of the cycle that starts at its smallest index.
fn canonical(members: &[usize]) -> Vec<usize> {
    let start = members
        .iter()
        .enumerate()
        .min_by_key(|(_, m)| **m)
        .map(|(i, _)| i)
        .unwrap_or(0);
    members[start..]
        .iter()
        .chain(&members[..start])
        .copied()
        .collect()
}

// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use crate::scheduler::*;

use anyhow::{bail, Result};
use proptest::prelude::*;

use std::collections::{BTreeSet, HashMap};

fn make_graph(edges: &[(&'static str, &'static str)]) -> DependencyGraph<&'static str> {
    let mut graph = DependencyGraph::new();
    for (from, to) in edges {
        graph.add_edge(*from, *to);
    }
    graph
}

fn check_order(edges: &[(&'static str, &'static str)], r: SortResult<&'static str>) -> Result<()> {
    match r {
        SortResult::Order(order) => {
            let position: HashMap<_, _> = order.iter().enumerate().map(|(i, k)| (*k, i)).collect();
            for (from, to) in edges {
                assert!(
                    position[to] < position[from],
                    "{to} must precede {from} in {order:?}"
                );
            }
            Ok(())
        }
        SortResult::Cycles(cycles) => bail!("unexpected cycles {cycles:?}"),
    }
}

fn cycle_sets(graph: &DependencyGraph<&'static str>) -> BTreeSet<BTreeSet<&'static str>> {
    graph
        .cycles()
        .iter()
        .map(|c| c.nodes().iter().copied().collect())
        .collect()
}

#[test]
fn chain() -> Result<()> {
    let edges = [("d", "c"), ("c", "b"), ("b", "a")];
    let mut graph = make_graph(&edges);
    let r = graph.schedule();
    check_order(&edges, r)?;
    assert_eq!(graph.order(), ["a", "b", "c", "d"]);
    Ok(())
}

#[test]
fn diamond() -> Result<()> {
    let edges = [("top", "left"), ("top", "right"), ("left", "base"), ("right", "base")];
    let mut graph = make_graph(&edges);
    check_order(&edges, graph.schedule())?;
    assert_eq!(graph.order().first(), Some(&"base"));
    assert_eq!(graph.order().last(), Some(&"top"));
    Ok(())
}

#[test]
fn isolated_nodes_keep_insertion_order() -> Result<()> {
    let mut graph = DependencyGraph::new();
    for k in ["x", "y", "z"] {
        graph.add_node(k);
    }
    match graph.schedule() {
        SortResult::Order(order) => assert_eq!(order, ["x", "y", "z"]),
        SortResult::Cycles(_) => bail!("no cycles expected"),
    }
    assert!(graph.has_run());
    Ok(())
}

#[test]
fn mutual_dependency() {
    let mut graph = make_graph(&[("a", "b"), ("b", "a")]);
    graph.run();
    assert!(graph.has_cycles());
    assert_eq!(graph.cycles().len(), 1);

    let pairs = graph.cycles()[0].pairs();
    assert_eq!(pairs.len(), 2);
    assert!(pairs.contains(&("a", "b")));
    assert!(pairs.contains(&("b", "a")));
    assert_eq!(graph.cycles()[0].to_string(), "a -> b -> a");
}

#[test]
fn self_dependency() {
    let mut graph = make_graph(&[("a", "a"), ("b", "a")]);
    graph.run();
    assert_eq!(cycle_sets(&graph), BTreeSet::from([BTreeSet::from(["a"])]));
    assert_eq!(graph.cycles()[0].pairs(), vec![("a", "a")]);
}

#[test]
fn every_cycle_is_reported() {
    // Two disjoint cycles, one cycle sharing a node with another, and an
    // acyclic tail hanging off one of them.
    let mut graph = make_graph(&[
        ("a", "b"),
        ("b", "a"),
        ("c", "d"),
        ("d", "e"),
        ("e", "c"),
        ("e", "f"),
        ("f", "e"),
        ("tail", "a"),
        ("ok", "leaf"),
    ]);
    graph.run();

    let expected = BTreeSet::from([
        BTreeSet::from(["a", "b"]),
        BTreeSet::from(["c", "d", "e"]),
        BTreeSet::from(["e", "f"]),
    ]);
    assert_eq!(cycle_sets(&graph), expected);
    assert_eq!(graph.cycles().len(), 3);
}

#[test]
fn cycles_are_not_duplicated() {
    let mut graph = make_graph(&[("a", "b"), ("b", "c"), ("c", "a"), ("x", "b"), ("y", "c")]);
    graph.run();
    assert_eq!(graph.cycles().len(), 1);
    assert_eq!(graph.cycles()[0].nodes().len(), 3);
}

#[test]
fn rerun_after_edit() -> Result<()> {
    let mut graph = make_graph(&[("a", "b")]);
    check_order(&[("a", "b")], graph.schedule())?;
    graph.add_edge("b", "a");
    assert!(!graph.has_run());
    assert!(matches!(graph.schedule(), SortResult::Cycles(_)));
    Ok(())
}

#[test]
fn dependencies() {
    let graph = make_graph(&[("a", "b"), ("a", "c"), ("a", "b")]);
    assert_eq!(graph.dependencies(&"a"), vec![&"b", &"c"]);
    assert!(graph.dependencies(&"zzz").is_empty());
    assert_eq!(graph.len(), 3);
}

// Edges only point from higher to lower node ids, so the graph is acyclic.
fn dag() -> impl Strategy<Value = (usize, Vec<(usize, usize)>)> {
    (1usize..24).prop_flat_map(|n| {
        let edges = prop::collection::vec((0..n, 0..n), 0..n * 3).prop_map(|pairs| {
            pairs
                .into_iter()
                .filter(|(a, b)| a != b)
                .map(|(a, b)| (a.max(b), a.min(b)))
                .collect::<Vec<_>>()
        });
        (Just(n), edges)
    })
}

proptest! {
    #[test]
    fn order_is_a_linear_extension((n, edges) in dag()) {
        let mut graph = DependencyGraph::new();
        for k in 0..n {
            graph.add_node(k);
        }
        for (from, to) in &edges {
            graph.add_edge(*from, *to);
        }
        graph.run();

        prop_assert!(!graph.has_cycles());
        prop_assert_eq!(graph.order().len(), n);
        let position: HashMap<usize, usize> =
            graph.order().iter().enumerate().map(|(i, k)| (*k, i)).collect();
        for (from, to) in &edges {
            prop_assert!(position[to] < position[from]);
        }
    }

    #[test]
    fn back_edge_creates_a_cycle((_n, edges) in dag(), pick in any::<prop::sample::Index>()) {
        prop_assume!(!edges.is_empty());
        let (from, to) = edges[pick.index(edges.len())];

        let mut graph = DependencyGraph::new();
        for (a, b) in &edges {
            graph.add_edge(*a, *b);
        }
        graph.add_edge(to, from);
        graph.run();

        prop_assert!(graph.has_cycles());
        prop_assert!(graph.order().len() < graph.len());
        let offending = graph
            .cycles()
            .iter()
            .flat_map(|c| c.pairs())
            .any(|pair| pair == (to, from) || pair == (from, to));
        prop_assert!(offending);
    }
}

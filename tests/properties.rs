use proptest::prelude::*;
use std::collections::BTreeSet;

use subnet::{is_connected, mcl, modularity, nw_conn_steiner, MclConfig, Network, SteinerConfig};

fn id(i: usize) -> String {
    format!("n{i}")
}

/// Network on `n` nodes from raw endpoint pairs (taken mod `n`), optionally threaded by a path
/// so the result is connected.
fn build(n: usize, edges: &[(usize, usize)], weights: &[f64], connect: bool) -> Network {
    let mut b = Network::builder();
    for i in 0..n {
        b.add_node(id(i), weights.get(i).copied().unwrap_or(1.0));
    }
    if connect {
        for i in 1..n {
            b.add_edge(id(i - 1), id(i), 1.0);
        }
    }
    for &(u, v) in edges {
        b.add_edge(id(u % n), id(v % n), 1.0);
    }
    b.build().unwrap()
}

/// Modularity straight from the definition, over ordered pairs `i != j`.
fn brute_force_modularity(g: &Network, labels: &[usize]) -> f64 {
    let n = g.node_count();
    let m = g.edge_count() as f64;
    if m == 0.0 {
        return 0.0;
    }
    let mut q = 0.0;
    for i in 0..n {
        for j in 0..n {
            if i == j || labels[i] != labels[j] {
                continue;
            }
            let a = if g.has_edge(i, j) { 1.0 } else { 0.0 };
            q += a - (g.degree(i) * g.degree(j)) as f64 / (2.0 * m);
        }
    }
    q / (2.0 * m)
}

proptest! {
    // Property: the Steiner subnetwork is connected and contains every terminal.
    #[test]
    fn prop_steiner_connected_superset(
        n in 2usize..9,
        edges in prop::collection::vec((0usize..9, 0usize..9), 0..16),
        weights in prop::collection::vec(0.1f64..10.0, 9),
        picks in prop::collection::btree_set(0usize..9, 1..5),
    ) {
        let g = build(n, &edges, &weights, true);
        let terminals: BTreeSet<String> = picks.into_iter().map(|p| id(p % n)).collect();
        let out = nw_conn_steiner(&g, &terminals, SteinerConfig::default()).unwrap();
        prop_assert!(is_connected(&out));
        for t in &terminals {
            prop_assert!(out.contains(t), "missing terminal {t}");
        }
    }

    // Property: the closed form agrees with the pairwise definition.
    #[test]
    fn prop_modularity_matches_definition(
        n in 1usize..9,
        edges in prop::collection::vec((0usize..9, 0usize..9), 0..20),
        raw_labels in prop::collection::vec(0usize..3, 9),
    ) {
        let g = build(n, &edges, &[], false);
        let labels: Vec<usize> = raw_labels[..n].to_vec();
        let mut partition: Vec<Vec<String>> = vec![Vec::new(); 3];
        for (i, &l) in labels.iter().enumerate() {
            partition[l].push(g.id(i).to_string());
        }
        let q = modularity(&g, &partition).unwrap();
        let expected = brute_force_modularity(&g, &labels);
        prop_assert!((q - expected).abs() < 1e-9, "q={q} expected={expected}");
    }

    // Property: MCL clusters are disjoint and cover the node set.
    #[test]
    fn prop_mcl_parts_are_disjoint_cover(
        n in 1usize..9,
        edges in prop::collection::vec((0usize..9, 0usize..9), 0..20),
    ) {
        let g = build(n, &edges, &[], false);
        let parts = mcl(&g, MclConfig::default()).unwrap().unwrap();
        let mut seen = BTreeSet::new();
        for part in &parts {
            prop_assert!(!part.is_empty());
            for node in part {
                prop_assert!(seen.insert(node.clone()), "{node} in two clusters");
            }
        }
        prop_assert_eq!(seen.len(), g.node_count());
    }
}

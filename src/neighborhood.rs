//! d-hop neighborhoods.

use std::collections::BTreeSet;

use crate::graph::GraphRef;
use crate::network::Network;

/// Nodes within `1..=d` hops of `nodes`, excluding `nodes` themselves. `d = 0` yields nothing.
pub fn neighbor<G: GraphRef>(graph: &G, nodes: &BTreeSet<usize>, d: usize) -> BTreeSet<usize> {
    let mut seen: BTreeSet<usize> = nodes.clone();
    let mut frontier: Vec<usize> = nodes.iter().copied().collect();
    let mut out = BTreeSet::new();
    for _ in 0..d {
        let mut next = Vec::new();
        for &u in &frontier {
            for &v in graph.neighbors_ref(u) {
                if seen.insert(v) {
                    out.insert(v);
                    next.push(v);
                }
            }
        }
        if next.is_empty() {
            break;
        }
        frontier = next;
    }
    out
}

/// Restrict `network` to `nodes` plus their `d`-hop neighborhood.
///
/// Useful before the \(O(n^2)\) or \(O(n^3)\) searches on large inputs.
pub fn shrink(network: &Network, nodes: &BTreeSet<usize>, d: usize) -> Network {
    let mut keep = neighbor(network, nodes, d);
    keep.extend(nodes.iter().copied().filter(|&i| i < network.node_count()));
    let out = network.induced(keep);
    tracing::debug!(before = network.node_count(), after = out.node_count(), d, "shrunk network");
    out
}

//! Approximate node-weighted Steiner tree (Klein & Ravi greedy merge).
//!
//! Start from the connected pieces of the terminal set ("trees"). Each round, every non-tree
//! node `v` prices attaching itself to each tree: the node weights strictly between `v` and the
//! cheapest tree vertex along a shortest (fewest hops) path. With `k` trees tied at the
//! cheapest price (at least 2), its quotient cost is
//!
//! \[
//!   \frac{w(v) + \sum_{i=1}^{k} c_i}{k}
//! \]
//!
//! and the node with the smallest quotient merges its `k` trees into one. The answer is
//! approximate by construction; ties go to the lighter node, then to the lower id.

use std::collections::BTreeSet;
use std::time::Duration;

use crate::budget::Deadline;
use crate::network::Network;
use crate::primitives::{connected_components, is_connected, ShortestPaths};
use crate::{Error, Result};

#[derive(Debug, Clone, Copy, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SteinerConfig {
    /// Wall-clock limit, checked once per merge round.
    pub time_limit: Option<Duration>,
}

/// Steiner subnetwork of a **connected** network.
///
/// Errors: [`Error::Disconnected`] if `network` has more than one component,
/// [`Error::NoTerminals`] if no terminal id is present.
pub fn nw_conn_steiner<I, S>(network: &Network, terminals: I, config: SteinerConfig) -> Result<Network>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    if !is_connected(network) {
        return Err(Error::Disconnected("nw_conn_steiner"));
    }
    let local = network.local_terminals(terminals);
    if local.is_empty() {
        return Err(Error::NoTerminals);
    }
    let deadline = Deadline::after(config.time_limit);
    let nodes = steiner_nodes(network, &local, &deadline)?;
    Ok(network.induced(nodes))
}

/// Steiner subnetwork of an arbitrary network: solved per component that holds at least one
/// terminal, then composed. Components without terminals contribute nothing.
pub fn nw_steiner<I, S>(network: &Network, terminals: I, config: SteinerConfig) -> Result<Network>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let local = network.local_terminals(terminals);
    if local.is_empty() {
        return Err(Error::NoTerminals);
    }
    let deadline = Deadline::after(config.time_limit);
    let mut collected = BTreeSet::new();
    for comp in connected_components(network) {
        let comp_terms: BTreeSet<usize> =
            comp.iter().enumerate().filter(|&(_, u)| local.contains(u)).map(|(j, _)| j).collect();
        if comp_terms.is_empty() {
            continue;
        }
        let sub = network.induced(comp.iter().copied());
        let nodes = steiner_nodes(&sub, &comp_terms, &deadline)?;
        collected.extend(nodes.into_iter().map(|j| comp[j]));
    }
    let out = network.induced(collected);
    tracing::debug!(terminals = local.len(), nodes = out.node_count(), "nw_steiner done");
    Ok(out)
}

struct Candidate {
    node: usize,
    quotient: f64,
    weight: f64,
    // (tree index, linker vertex inside that tree)
    targets: Vec<(usize, usize)>,
}

/// Cheapest attachment of `v` to `tree`: `(cost, linker)`. The first (lowest index) vertex
/// reaching the minimum wins.
fn attach(network: &Network, sp: &ShortestPaths, v: usize, tree: &BTreeSet<usize>) -> (f64, usize) {
    let mut best = (f64::INFINITY, usize::MAX);
    for &x in tree {
        let Some(path) = sp.path(v, x) else { continue };
        let cost: f64 = if path.len() > 2 {
            path[1..path.len() - 1].iter().map(|&u| network.node_weight(u)).sum()
        } else {
            0.0
        };
        if cost < best.0 {
            best = (cost, x);
        }
    }
    best
}

/// Core merge loop on a connected network; returns the collector set (indices into `network`).
fn steiner_nodes(
    network: &Network,
    local: &BTreeSet<usize>,
    deadline: &Deadline,
) -> Result<BTreeSet<usize>> {
    let order: Vec<usize> = local.iter().copied().collect();
    let terminal_graph = network.induced(order.iter().copied());
    let mut trees: Vec<BTreeSet<usize>> = connected_components(&terminal_graph)
        .into_iter()
        .map(|c| c.into_iter().map(|j| order[j]).collect())
        .collect();
    let mut collector: BTreeSet<usize> = local.clone();
    if trees.len() <= 1 {
        return Ok(collector);
    }

    let sp = ShortestPaths::all_pairs(network);
    let n = network.node_count();
    tracing::debug!(nodes = n, trees = trees.len(), "steiner merge start");

    while trees.len() > 1 {
        deadline.check("nw_steiner")?;
        let mut in_tree = vec![false; n];
        for t in &trees {
            for &u in t {
                in_tree[u] = true;
            }
        }

        let mut best: Option<Candidate> = None;
        for v in (0..n).filter(|&v| !in_tree[v]) {
            let mut pool: Vec<(usize, f64, usize)> = trees
                .iter()
                .enumerate()
                .map(|(i, t)| {
                    let (cost, linker) = attach(network, &sp, v, t);
                    (i, cost, linker)
                })
                .collect();
            pool.sort_by(|a, b| a.1.total_cmp(&b.1));
            let min = pool[0].1;
            let tied = pool.iter().take_while(|p| p.1 == min).count();
            let k = tied.max(2);
            let weight = network.node_weight(v);
            let quotient = (pool[..k].iter().map(|p| p.1).sum::<f64>() + weight) / k as f64;

            let better = match &best {
                None => true,
                Some(b) => quotient < b.quotient || (quotient == b.quotient && weight < b.weight),
            };
            if better {
                best = Some(Candidate {
                    node: v,
                    quotient,
                    weight,
                    targets: pool[..k].iter().map(|p| (p.0, p.2)).collect(),
                });
            }
        }

        // A connected network with two or more trees always has a non-tree node between them.
        let Some(best) = best else { break };
        tracing::trace!(
            node = network.id(best.node),
            quotient = best.quotient,
            merged = best.targets.len(),
            "steiner merge"
        );

        let mut merged = BTreeSet::new();
        for &(i, linker) in &best.targets {
            merged.extend(trees[i].iter().copied());
            if let Some(path) = sp.path(best.node, linker) {
                merged.extend(path);
            }
        }
        let selected: BTreeSet<usize> = best.targets.iter().map(|t| t.0).collect();
        let mut next: Vec<BTreeSet<usize>> = trees
            .into_iter()
            .enumerate()
            .filter(|(i, _)| !selected.contains(i))
            .map(|(_, t)| t)
            .collect();
        collector.extend(merged.iter().copied());
        next.push(merged);
        trees = next;
    }
    Ok(collector)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::primitives::is_connected;

    fn square(weights: [f64; 4]) -> Network {
        let mut b = Network::builder();
        b.add_edge("a", "b", 1.0)
            .add_edge("b", "c", 1.0)
            .add_edge("c", "d", 1.0)
            .add_edge("a", "d", 1.0);
        for (id, w) in ["a", "b", "c", "d"].iter().zip(weights) {
            b.add_node(*id, w);
        }
        b.build().unwrap()
    }

    #[test]
    fn adjacent_terminals_need_no_merge() {
        let g = square([10.0, 1.0, 1.0, 1.0]);
        let out = nw_conn_steiner(&g, ["a", "d"], SteinerConfig::default()).unwrap();
        assert_eq!(out.ids(), &["a", "d"]);
        assert_eq!(out.edge_count(), 1);
    }

    #[test]
    fn opposite_corners_take_the_lighter_side() {
        // a and c are opposite; b (weight 5) vs d (weight 1).
        let g = square([1.0, 5.0, 1.0, 1.0]);
        let out = nw_conn_steiner(&g, ["a", "c"], SteinerConfig::default()).unwrap();
        assert_eq!(out.ids(), &["a", "c", "d"]);
        assert!(is_connected(&out));
    }

    #[test]
    fn equal_quotient_breaks_on_id() {
        let g = square([1.0, 1.0, 1.0, 1.0]);
        let out = nw_conn_steiner(&g, ["a", "c"], SteinerConfig::default()).unwrap();
        assert_eq!(out.ids(), &["a", "b", "c"]);
    }

    #[test]
    fn long_path_pulls_in_interior_nodes() {
        // t1 - x - y - t2, plus a heavy shortcut hub connected to both terminals.
        let mut b = Network::builder();
        b.add_edge("t1", "x", 1.0)
            .add_edge("x", "y", 1.0)
            .add_edge("y", "t2", 1.0)
            .add_edge("t1", "hub", 1.0)
            .add_edge("hub", "t2", 1.0)
            .add_node("hub", 100.0);
        let g = b.build().unwrap();
        let out = nw_conn_steiner(&g, ["t1", "t2"], SteinerConfig::default()).unwrap();
        assert_eq!(out.ids(), &["t1", "t2", "x", "y"]);
    }

    #[test]
    fn disconnected_input_is_rejected() {
        let mut b = Network::builder();
        b.add_edge("a", "b", 1.0).add_edge("c", "d", 1.0);
        let g = b.build().unwrap();
        assert!(matches!(
            nw_conn_steiner(&g, ["a"], SteinerConfig::default()),
            Err(Error::Disconnected(_))
        ));
        assert!(matches!(
            nw_conn_steiner(&square([1.0; 4]), ["zz"], SteinerConfig::default()),
            Err(Error::NoTerminals)
        ));
    }

    #[test]
    fn per_component_solutions_are_composed() {
        let mut b = Network::builder();
        b.add_edge("a", "b", 1.0)
            .add_edge("b", "c", 1.0)
            .add_edge("x", "y", 1.0)
            .add_edge("p", "q", 1.0);
        let g = b.build().unwrap();
        let out = nw_steiner(&g, ["a", "c", "x"], SteinerConfig::default()).unwrap();
        assert_eq!(out.ids(), &["a", "b", "c", "x"]);
        assert_eq!(out.edge_count(), 2);
    }
}

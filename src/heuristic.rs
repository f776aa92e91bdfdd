//! Score-threshold seed expansion.
//!
//! A connected seed grows greedily: look at the `rad`-hop frontier for increasing `rad`, and
//! absorb the heaviest frontier node(s) whenever their weight is at least
//! `score(seed) * r / (1 - r)`. Each absorbed node is wired in along a shortest path to the
//! nearest seed vertex, so the seed stays connected.

use std::collections::BTreeSet;
use std::time::Duration;

use crate::budget::Deadline;
use crate::graph::GraphRef;
use crate::neighborhood::neighbor;
use crate::network::Network;
use crate::primitives::{connected_components, is_connected};
use crate::{Error, Result};

/// How a seed's current node weights are summarised.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum SeedScore {
    #[default]
    Sum,
    Mean,
}

impl SeedScore {
    pub fn score(self, weights: &[f64]) -> f64 {
        let sum: f64 = weights.iter().sum();
        match self {
            SeedScore::Sum => sum,
            SeedScore::Mean if weights.is_empty() => 0.0,
            SeedScore::Mean => sum / weights.len() as f64,
        }
    }
}

#[derive(Debug, Clone, Copy)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct HeuristicConfig {
    /// Largest frontier radius `d` tried per round.
    pub radius: usize,
    /// Expansion rate `r` in `[0, 1]`; `1.0` is treated as `0.99`.
    pub rate: f64,
    pub score: SeedScore,
    pub time_limit: Option<Duration>,
}

impl Default for HeuristicConfig {
    fn default() -> Self {
        Self { radius: 1, rate: 0.2, score: SeedScore::Sum, time_limit: None }
    }
}

impl HeuristicConfig {
    fn effective_rate(&self) -> Result<f64> {
        if !(0.0..=1.0).contains(&self.rate) {
            return Err(Error::InvalidParameter(format!("rate must be in [0, 1], got {}", self.rate)));
        }
        Ok(if self.rate == 1.0 { 0.99 } else { self.rate })
    }
}

/// Grow one connected seed. Returns the induced subgraph on the grown node set.
///
/// Errors: [`Error::NoTerminals`] if no seed id is in `network`, [`Error::Disconnected`] if
/// the seed does not induce a connected subgraph.
pub fn seed_query<I, S>(network: &Network, seed: I, config: HeuristicConfig) -> Result<Network>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let rate = config.effective_rate()?;
    let seed = network.local_terminals(seed);
    if seed.is_empty() {
        return Err(Error::NoTerminals);
    }
    if !is_connected(&network.induced(seed.iter().copied())) {
        return Err(Error::Disconnected("seed_query"));
    }
    let deadline = Deadline::after(config.time_limit);
    let grown = grow(network, seed, rate, config, &deadline)?;
    Ok(network.induced(grown))
}

/// Expand every connected piece of the terminal set independently and compose the results.
pub fn list_query<I, S>(network: &Network, terminals: I, config: HeuristicConfig) -> Result<Network>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let rate = config.effective_rate()?;
    let local = network.local_terminals(terminals);
    if local.is_empty() {
        return Err(Error::NoTerminals);
    }
    let order: Vec<usize> = local.iter().copied().collect();
    let seeds = network.induced(order.iter().copied());
    let deadline = Deadline::after(config.time_limit);

    let mut collected = BTreeSet::new();
    for comp in connected_components(&seeds) {
        let seed: BTreeSet<usize> = comp.into_iter().map(|j| order[j]).collect();
        collected.extend(grow(network, seed, rate, config, &deadline)?);
    }
    let out = network.induced(collected);
    tracing::debug!(terminals = local.len(), nodes = out.node_count(), "list_query done");
    Ok(out)
}

fn grow(
    network: &Network,
    mut seed: BTreeSet<usize>,
    rate: f64,
    config: HeuristicConfig,
    deadline: &Deadline,
) -> Result<BTreeSet<usize>> {
    let factor = rate / (1.0 - rate);
    loop {
        deadline.check("seed_query")?;
        let before = seed.len();
        for rad in 1..=config.radius {
            let weights: Vec<f64> = seed.iter().map(|&u| network.node_weight(u)).collect();
            let subsum = config.score.score(&weights);
            let frontier = neighbor(network, &seed, rad);
            if frontier.is_empty() {
                break;
            }
            let w = frontier
                .iter()
                .map(|&u| network.node_weight(u))
                .fold(f64::NEG_INFINITY, f64::max);
            if w >= subsum * factor {
                let heaviest: Vec<usize> =
                    frontier.into_iter().filter(|&u| network.node_weight(u) == w).collect();
                for node in heaviest {
                    let path = path_to_nearest(network, node, &seed);
                    tracing::trace!(node = network.id(node), rad, weight = w, "seed absorbs");
                    seed.extend(path);
                }
                break;
            }
        }
        if seed.len() == before {
            return Ok(seed);
        }
    }
}

/// Shortest path from `node` to the closest member of `seed` (lowest index on ties).
fn path_to_nearest(network: &Network, node: usize, seed: &BTreeSet<usize>) -> Vec<usize> {
    let n = network.node_count();
    let mut parent = vec![usize::MAX; n];
    let mut queue = std::collections::VecDeque::from([node]);
    parent[node] = node;
    // BFS layer by layer; stop at the first layer that touches the seed.
    while !queue.is_empty() {
        let mut hits: Vec<usize> = queue.iter().copied().filter(|u| seed.contains(u)).collect();
        if !hits.is_empty() {
            hits.sort_unstable();
            let mut path = vec![hits[0]];
            let mut cur = hits[0];
            while cur != node {
                cur = parent[cur];
                path.push(cur);
            }
            return path;
        }
        let mut next = std::collections::VecDeque::new();
        for u in queue {
            for &v in network.neighbors_ref(u) {
                if parent[v] == usize::MAX {
                    parent[v] = u;
                    next.push_back(v);
                }
            }
        }
        queue = next;
    }
    vec![node]
}

#[cfg(test)]
mod tests {
    use super::*;

    // a - b - c - d, plus b - e ; weights chosen per test.
    fn graph(weights: &[(&str, f64)]) -> Network {
        let mut b = Network::builder();
        b.add_edge("a", "b", 1.0)
            .add_edge("b", "c", 1.0)
            .add_edge("c", "d", 1.0)
            .add_edge("b", "e", 1.0);
        for &(id, w) in weights {
            b.add_node(id, w);
        }
        b.build().unwrap()
    }

    #[test]
    fn heavy_neighbors_are_absorbed_until_rate_fails() {
        // Seed {a}=1. r=0.5 => factor 1. b=2 >= 1 absorbed; then frontier {c, e}: c=5 >= 3.
        // Then frontier {d, e}: max 0.1 < 8 so stop.
        let g = graph(&[("a", 1.0), ("b", 2.0), ("c", 5.0), ("d", 0.1), ("e", 0.1)]);
        let cfg = HeuristicConfig { radius: 1, rate: 0.5, ..Default::default() };
        let out = seed_query(&g, ["a"], cfg).unwrap();
        assert_eq!(out.ids(), &["a", "b", "c"]);
    }

    #[test]
    fn larger_radius_reaches_past_light_nodes() {
        // b is light, c is heavy and two hops away: radius 2 takes c and the path via b.
        let g = graph(&[("a", 1.0), ("b", 0.1), ("c", 9.0), ("d", 0.1), ("e", 0.1)]);
        let cfg = HeuristicConfig { radius: 1, rate: 0.5, ..Default::default() };
        assert_eq!(seed_query(&g, ["a"], cfg).unwrap().ids(), &["a"]);

        let cfg = HeuristicConfig { radius: 2, rate: 0.5, ..Default::default() };
        assert_eq!(seed_query(&g, ["a"], cfg).unwrap().ids(), &["a", "b", "c"]);
    }

    #[test]
    fn rate_one_is_clamped_and_zero_takes_everything() {
        let g = graph(&[("a", 1.0)]);
        let cfg = HeuristicConfig { rate: 1.0, ..Default::default() };
        assert_eq!(seed_query(&g, ["a"], cfg).unwrap().ids(), &["a"]);

        let cfg = HeuristicConfig { rate: 0.0, ..Default::default() };
        assert_eq!(seed_query(&g, ["a"], cfg).unwrap().node_count(), 5);
    }

    #[test]
    fn disconnected_seed_is_rejected_but_listed_seeds_are_split() {
        let g = graph(&[]);
        let cfg = HeuristicConfig { rate: 0.9, ..Default::default() };
        assert!(matches!(seed_query(&g, ["a", "d"], cfg), Err(Error::Disconnected(_))));
        let out = list_query(&g, ["a", "d", "missing"], cfg).unwrap();
        assert_eq!(out.ids(), &["a", "d"]);
        assert!(matches!(list_query(&g, ["missing"], cfg), Err(Error::NoTerminals)));
    }

    #[test]
    fn mean_score_is_average_weight() {
        assert_eq!(SeedScore::Mean.score(&[1.0, 3.0]), 2.0);
        assert_eq!(SeedScore::Sum.score(&[1.0, 3.0]), 4.0);
        assert_eq!(SeedScore::Mean.score(&[]), 0.0);
    }
}

//! Node ranking utilities.

use std::cmp::Reverse;
use std::collections::BinaryHeap;
use std::str::FromStr;

use ordered_float::NotNan;

use crate::betweenness::betweenness_centrality;
use crate::network::Network;
use crate::{Error, Result};

/// Measure used by [`gene_rank`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum RankBy {
    /// Number of neighbors (edge weights ignored).
    Degree,
    /// Input node score.
    Score,
    /// Normalised betweenness centrality.
    Betweenness,
}

impl FromStr for RankBy {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "degree" => Ok(RankBy::Degree),
            "score" => Ok(RankBy::Score),
            "betweenness" => Ok(RankBy::Betweenness),
            other => Err(Error::UnknownMeasure(other.to_string())),
        }
    }
}

impl RankBy {
    pub fn measure(self, network: &Network) -> Vec<f64> {
        let n = network.node_count();
        match self {
            RankBy::Degree => (0..n).map(|u| network.degree(u) as f64).collect(),
            RankBy::Score => (0..n).map(|u| network.node_score(u)).collect(),
            RankBy::Betweenness => betweenness_centrality(network),
        }
    }
}

/// Top `top` nodes by `by` (`"degree"`, `"score"` or `"betweenness"`), highest first, ties by
/// id. Returns `min(top, |V|)` pairs.
pub fn gene_rank(network: &Network, by: &str, top: usize) -> Result<Vec<(String, f64)>> {
    let by: RankBy = by.parse()?;
    let scores = by.measure(network);
    Ok(top_k(&scores, top)
        .into_iter()
        .map(|(i, s)| (network.id(i).to_string(), s))
        .collect())
}

/// Indices of the `k` largest finite scores, descending; equal scores keep the lower index.
pub fn top_k(scores: &[f64], k: usize) -> Vec<(usize, f64)> {
    if k == 0 || scores.is_empty() { return Vec::new(); }
    // Min-heap on (score, Reverse(index)): the root is the entry to evict next.
    let mut heap = BinaryHeap::with_capacity(k + 1);
    for (i, &score) in scores.iter().enumerate() {
        let Ok(s) = NotNan::new(score) else { continue };
        if !score.is_finite() { continue; }
        let key = (s, Reverse(i));
        if heap.len() < k {
            heap.push(Reverse(key));
        } else if let Some(Reverse(worst)) = heap.peek() {
            if key > *worst {
                heap.pop();
                heap.push(Reverse(key));
            }
        }
    }
    let mut results: Vec<(NotNan<f64>, Reverse<usize>)> = heap.into_iter().map(|Reverse(key)| key).collect();
    results.sort_unstable_by(|a, b| b.cmp(a));
    results.into_iter().map(|(s, Reverse(i))| (i, s.into_inner())).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn star() -> Network {
        let mut b = Network::builder();
        b.add_edge("c", "x", 1.0).add_edge("c", "y", 1.0).add_edge("c", "z", 1.0);
        b.add_node("y", 7.0);
        b.build().unwrap()
    }

    #[test]
    fn star_degree_ranking() {
        let ranked = gene_rank(&star(), "degree", 2).unwrap();
        assert_eq!(ranked, vec![("c".to_string(), 3.0), ("x".to_string(), 1.0)]);
    }

    #[test]
    fn score_and_betweenness_rankings() {
        let g = star();
        let by_score = gene_rank(&g, "score", 1).unwrap();
        assert_eq!(by_score, vec![("y".to_string(), 7.0)]);

        let by_bc = gene_rank(&g, "betweenness", 10).unwrap();
        assert_eq!(by_bc.len(), 4);
        assert_eq!(by_bc[0].0, "c");
        assert!((by_bc[0].1 - 1.0).abs() < 1e-12);
    }

    #[test]
    fn unknown_measure_is_a_precondition_error() {
        let err = gene_rank(&star(), "pagerank", 3).unwrap_err();
        assert!(matches!(err, Error::UnknownMeasure(ref m) if m == "pagerank"));
        assert_eq!(err.kind(), crate::ErrorKind::Precondition);
    }

    #[test]
    fn top_k_orders_and_breaks_ties_by_index() {
        let scores = [0.5, 2.0, f64::NAN, 2.0, 0.0, f64::INFINITY];
        assert_eq!(top_k(&scores, 3), vec![(1, 2.0), (3, 2.0), (0, 0.5)]);
        assert_eq!(top_k(&scores, 0), vec![]);
        assert_eq!(top_k(&scores, 10).len(), 4);
    }
}

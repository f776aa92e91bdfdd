//! Markov clustering (MCL) and modularity.
//!
//! MCL alternates *expansion* (\(M \leftarrow M^2\)) and *inflation* (elementwise power `r`,
//! columns renormalised) on the column-stochastic matrix of the graph with self-loops added,
//! until the matrix stops changing. The non-zero support of the limit, read as an undirected
//! graph, falls apart into the clusters.

use std::collections::BTreeSet;
use std::time::Duration;

use crate::budget::Deadline;
use crate::graph::GraphRef;
use crate::matrix::Matrix;
use crate::network::Network;
use crate::primitives::connected_components;
use crate::{Error, Result};

/// Disjoint groups of node ids.
pub type Partition = Vec<Vec<String>>;

#[derive(Debug, Clone, Copy)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct MclConfig {
    /// Inflation exponent `r`.
    pub inflation: f64,
    /// Networks with more nodes than this are not clustered ([`mcl`] returns `Ok(None)`).
    pub order_limit: usize,
    pub max_iterations: usize,
    /// Convergence: largest elementwise change of one expand/inflate cycle.
    pub tolerance: f64,
    /// Entries below this are zeroed after inflation.
    pub prune: f64,
    pub time_limit: Option<Duration>,
}

impl Default for MclConfig {
    fn default() -> Self {
        Self {
            inflation: 2.0,
            order_limit: 1000,
            max_iterations: 1000,
            tolerance: 1e-12,
            prune: 1e-12,
            time_limit: None,
        }
    }
}

struct Support(Vec<Vec<usize>>);

impl GraphRef for Support {
    fn node_count(&self) -> usize {
        self.0.len()
    }
    fn neighbors_ref(&self, node: usize) -> &[usize] {
        &self.0[node]
    }
}

/// Cluster `network` with MCL.
///
/// Returns `Ok(None)` when the network exceeds `order_limit` (clustering skipped, not an
/// error), and `Ok(Some(vec![]))` for the empty network.
pub fn mcl(network: &Network, config: MclConfig) -> Result<Option<Partition>> {
    let n = network.node_count();
    if n > config.order_limit {
        tracing::debug!(nodes = n, limit = config.order_limit, "mcl skipped: order limit");
        return Ok(None);
    }
    if !(config.inflation.is_finite() && config.inflation > 0.0) {
        return Err(Error::InvalidParameter(format!("inflation must be positive, got {}", config.inflation)));
    }
    if n == 0 {
        return Ok(Some(Vec::new()));
    }
    let deadline = Deadline::after(config.time_limit);

    let mut m = Matrix::identity(n);
    for (u, v, _, w) in network.edges() {
        m[(u, v)] = w;
        m[(v, u)] = w;
    }
    m.normalize_columns();

    let r = config.inflation;
    let prune = config.prune;
    for iteration in 0..config.max_iterations {
        deadline.check("mcl")?;
        let expanded = m.matmul(&m);
        let mut inflated = expanded.clone();
        inflated.map_in_place(|v| {
            let p = v.powf(r);
            if p < prune { 0.0 } else { p }
        });
        inflated.normalize_columns();
        let change = inflated.max_abs_diff(&expanded);
        m = inflated;
        if change <= config.tolerance {
            tracing::debug!(nodes = n, iterations = iteration + 1, "mcl converged");
            return Ok(Some(clusters(network, &m)));
        }
    }
    Err(Error::BudgetExceeded { stage: "mcl", iterations: config.max_iterations })
}

fn clusters(network: &Network, m: &Matrix) -> Partition {
    let n = m.rows();
    let mut adj = vec![Vec::new(); n];
    for i in 0..n {
        for j in (i + 1)..n {
            if m[(i, j)] > 0.0 || m[(j, i)] > 0.0 {
                adj[i].push(j);
                adj[j].push(i);
            }
        }
    }
    for nbrs in &mut adj {
        nbrs.sort_unstable();
    }
    connected_components(&Support(adj))
        .into_iter()
        .map(|c| c.into_iter().map(|i| network.id(i).to_string()).collect())
        .collect()
}

/// Newman modularity of `partition` on the unweighted graph:
///
/// \[
///   Q = \frac{1}{2m} \sum_{c} \Big( 2 E_c - \sum_{i \ne j \in c} \frac{k_i k_j}{2m} \Big)
/// \]
///
/// Graphs without edges score 0. Ids not in `network` are an error.
pub fn modularity<P: AsRef<[S]>, S: AsRef<str>>(network: &Network, partition: &[P]) -> Result<f64> {
    let m = network.edge_count() as f64;
    if m == 0.0 {
        return Ok(0.0);
    }
    let two_m = 2.0 * m;
    let mut q = 0.0;
    for part in partition {
        let mut members = BTreeSet::new();
        for id in part.as_ref() {
            let id = id.as_ref();
            members.insert(network.index_of(id).ok_or_else(|| Error::UnknownNode(id.to_string()))?);
        }
        let real = members
            .iter()
            .map(|&u| network.neighbors_ref(u).iter().filter(|&&v| v > u && members.contains(&v)).count())
            .sum::<usize>() as f64;
        let degrees: Vec<f64> = members.iter().map(|&u| network.degree(u) as f64).collect();
        let sum: f64 = degrees.iter().sum();
        let sum_sq: f64 = degrees.iter().map(|k| k * k).sum();
        q += 2.0 * real - (sum * sum - sum_sq) / two_m;
    }
    Ok(q / two_m)
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Two triangles joined by one bridge: {a,b,c} - {d,e,f}.
    fn barbell() -> Network {
        let mut b = Network::builder();
        for (u, v) in [("a", "b"), ("b", "c"), ("a", "c"), ("d", "e"), ("e", "f"), ("d", "f"), ("c", "d")] {
            b.add_edge(u, v, 1.0);
        }
        b.build().unwrap()
    }

    #[test]
    fn barbell_splits_into_triangles() {
        let parts = mcl(&barbell(), MclConfig::default()).unwrap().unwrap();
        assert_eq!(parts, vec![vec!["a", "b", "c"], vec!["d", "e", "f"]]);
    }

    #[test]
    fn order_limit_returns_sentinel() {
        let cfg = MclConfig { order_limit: 5, ..Default::default() };
        assert_eq!(mcl(&barbell(), cfg).unwrap(), None);
        assert_eq!(mcl(&Network::default(), cfg).unwrap(), Some(vec![]));
    }

    #[test]
    fn iteration_budget_is_enforced() {
        let cfg = MclConfig { max_iterations: 1, ..Default::default() };
        assert!(matches!(mcl(&barbell(), cfg), Err(Error::BudgetExceeded { stage: "mcl", .. })));
    }

    #[test]
    fn modularity_of_barbell_split() {
        // m = 7; each triangle: E = 3, degrees (2, 2, 3) => sum 7, sum_sq 17, cross = 32.
        // Q = (2 * (6 - 32/14)) / 14
        let g = barbell();
        let q = modularity(&g, &[vec!["a", "b", "c"], vec!["d", "e", "f"]]).unwrap();
        let expected = 2.0 * (6.0 - 32.0 / 14.0) / 14.0;
        assert!((q - expected).abs() < 1e-12, "q={q}");

        let whole = modularity(&g, &[vec!["a", "b", "c", "d", "e", "f"]]).unwrap();
        assert!(whole.abs() < 1e-12, "single community has Q=0, got {whole}");

        assert!(matches!(modularity(&g, &[vec!["nope"]]), Err(Error::UnknownNode(_))));
    }
}

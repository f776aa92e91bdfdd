//! Limited (horizon-bounded) k-walk (Dupont et al., 2006).
//!
//! For a node of interest (NOI) the walk starts at NOI and is absorbed by any other terminal.
//! Two lattices over `(state, step)` are built up to the horizon `L`:
//!
//! - `alpha[i, l]`: probability of standing on transient state `i` after `l` steps, not yet
//!   absorbed. `alpha[:, l] = alpha[:, l-1] * Qx`, starting from `alpha[NOI, 0] = 1`.
//! - `beta[i, m]`: probability that a walk at `i` is absorbed in exactly `m` more steps.
//!   `beta[:, 0] = 0`, `beta[:, 1] = rowsum(Rx)`, `beta[:, m] = Qx * beta[:, m-1]`.
//!
//! The expected number of passages over the transient edge `i -> j`, scaled by the probability
//! that NOI is absorbed at exactly step `L - 1`, is
//! \[
//!   E[i,j] = \frac{\sum_{l=0}^{L-1} \alpha[i,l]\, Q_x[i,j]\, \beta[j, l]}{\beta[NOI, L-1]}
//! \]
//! Both lattices are read at the same column `l`. On a bipartite network adjacent states never
//! share a non-zero column, so `E` vanishes and the search falls back to the whole component.
//! and the kept nodes are those touched by the edges that survive the largest threshold
//! under which they still form one connected piece.

use std::collections::BTreeSet;
use std::time::Duration;

use crate::budget::Deadline;
use crate::markov::{transient_order, transition_matrix, AbsorbingSplit};
use crate::matrix::Matrix;
use crate::network::Network;
use crate::primitives::{connected_components, is_connected};
use crate::{Error, Result};

#[derive(Debug, Clone, Copy)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct LimitedWalkConfig {
    /// Horizon `L` (lattice width). Must be at least 2.
    pub horizon: usize,
    /// Rounds; each round re-runs with the terminals replaced by everything collected so far.
    pub iterations: usize,
    /// Largest allowed order of `Qx`.
    pub max_order: usize,
    pub time_limit: Option<Duration>,
}

impl Default for LimitedWalkConfig {
    fn default() -> Self {
        Self { horizon: 50, iterations: 1, max_order: 2000, time_limit: None }
    }
}

impl LimitedWalkConfig {
    fn validate(&self) -> Result<()> {
        if self.horizon < 2 {
            return Err(Error::InvalidParameter(format!("horizon must be >= 2, got {}", self.horizon)));
        }
        if self.iterations == 0 {
            return Err(Error::InvalidParameter("iterations must be >= 1".to_string()));
        }
        Ok(())
    }
}

/// Forward and backward passage-time lattices for one NOI.
#[derive(Debug, Clone)]
pub struct PassageLattices {
    /// transient states x horizon
    pub alpha: Matrix,
    /// absorbing states x horizon: probability of being absorbed by that state at step `l`
    pub alpha_absorbing: Matrix,
    /// transient states x horizon
    pub beta: Matrix,
}

pub fn passage_lattices(split: &AbsorbingSplit, horizon: usize) -> PassageLattices {
    let m = split.order();
    let mut alpha = Matrix::zeros(m, horizon);
    let mut alpha_absorbing = Matrix::zeros(split.absorbing.len(), horizon);
    let mut beta = Matrix::zeros(m, horizon);
    if horizon == 0 {
        return PassageLattices { alpha, alpha_absorbing, beta };
    }

    alpha[(0, 0)] = 1.0;
    for l in 1..horizon {
        let prev = alpha.column(l - 1);
        alpha.set_column(l, &split.q.vec_mul(&prev));
        alpha_absorbing.set_column(l, &split.r.vec_mul(&prev));
    }

    if horizon > 1 {
        beta.set_column(1, &split.r.row_sums());
    }
    for step in 2..horizon {
        let prev = beta.column(step - 1);
        beta.set_column(step, &split.q.mul_vec(&prev));
    }
    PassageLattices { alpha, alpha_absorbing, beta }
}

/// Expected edge-passage matrix over transient states (indexed like `split.transient`).
///
/// All zero when NOI cannot be absorbed at exactly step `L - 1`.
pub fn edge_passage(split: &AbsorbingSplit, lattices: &PassageLattices) -> Matrix {
    let m = split.order();
    let horizon = lattices.alpha.cols();
    let mut edge = Matrix::zeros(m, m);
    if horizon < 2 {
        return edge;
    }
    let denom = lattices.beta[(0, horizon - 1)];
    if !(denom.is_finite() && denom > 0.0) {
        tracing::trace!(horizon, "no absorption within horizon");
        return edge;
    }
    for i in 0..m {
        let alpha_i = lattices.alpha.row(i);
        for j in 0..m {
            let qij = split.q[(i, j)];
            if qij == 0.0 {
                continue;
            }
            let beta_j = lattices.beta.row(j);
            let s: f64 = alpha_i.iter().zip(beta_j).map(|(a, b)| a * b).sum();
            edge[(i, j)] = qij * s / denom;
        }
    }
    edge
}

/// Outcome of the automatic edge threshold search.
#[derive(Debug, Clone, PartialEq)]
pub enum Threshold {
    /// Largest row-maximum `theta` whose surviving edges (`E >= theta`) form one connected
    /// piece; `kept` are the touched positions, ascending.
    Connected { theta: f64, kept: Vec<usize> },
    /// No positive threshold connects; everything is kept.
    Fallback,
}

/// Try the distinct row maxima of `edge` from the largest down; accept the first threshold
/// whose binarised graph is connected.
///
/// Edges are added in descending value order into a union-find, so each candidate threshold
/// is checked incrementally instead of rebuilding the graph.
pub fn auto_threshold(edge: &Matrix) -> Threshold {
    let m = edge.rows();
    let mut thetas: Vec<f64> =
        (0..m).map(|i| edge.row(i).iter().copied().fold(0.0, f64::max)).collect();
    thetas.sort_by(|a, b| b.total_cmp(a));
    thetas.dedup();

    let mut entries: Vec<(f64, usize, usize)> = Vec::new();
    for i in 0..m {
        for (j, &v) in edge.row(i).iter().enumerate() {
            if v > 0.0 {
                entries.push((v, i, j));
            }
        }
    }
    entries.sort_by(|a, b| b.0.total_cmp(&a.0));

    let mut parent: Vec<usize> = (0..m).collect();
    let mut touched = vec![false; m];
    let mut touched_count = 0usize;
    let mut components = 0usize;
    let mut next = 0usize;

    fn find(parent: &mut [usize], mut x: usize) -> usize {
        while parent[x] != x {
            parent[x] = parent[parent[x]];
            x = parent[x];
        }
        x
    }

    for theta in thetas {
        if theta <= 0.0 {
            break;
        }
        while next < entries.len() && entries[next].0 >= theta {
            let (_, i, j) = entries[next];
            next += 1;
            for u in [i, j] {
                if !touched[u] {
                    touched[u] = true;
                    touched_count += 1;
                    components += 1;
                }
            }
            let (ri, rj) = (find(&mut parent, i), find(&mut parent, j));
            if ri != rj {
                parent[ri] = rj;
                components -= 1;
            }
        }
        tracing::trace!(theta, touched = touched_count, components, "threshold candidate");
        if components == 1 {
            let kept = (0..m).filter(|&u| touched[u]).collect();
            return Threshold::Connected { theta, kept };
        }
    }
    Threshold::Fallback
}

/// Nodes kept for one NOI (graph indices, NOI included).
fn walk_from(
    p: &Matrix,
    noi: usize,
    terminals: &BTreeSet<usize>,
    horizon: usize,
    deadline: &Deadline,
) -> Result<BTreeSet<usize>> {
    deadline.check("lim_k_walks")?;
    let split = AbsorbingSplit::new(p, noi, terminals);
    let lattices = passage_lattices(&split, horizon);
    let edge = edge_passage(&split, &lattices);
    let mut kept: BTreeSet<usize> = match auto_threshold(&edge) {
        Threshold::Connected { theta, kept } => {
            tracing::trace!(noi, theta, kept = kept.len(), "threshold accepted");
            kept.into_iter().map(|pos| split.transient[pos]).collect()
        }
        Threshold::Fallback => {
            tracing::warn!(noi, horizon, "no positive threshold connects; keeping all transient states");
            split.transient.iter().copied().collect()
        }
    };
    kept.insert(noi);
    Ok(kept)
}

fn round_picks(
    p: &Matrix,
    terminals: &BTreeSet<usize>,
    horizon: usize,
    deadline: &Deadline,
    parallel: bool,
) -> Result<Vec<BTreeSet<usize>>> {
    let nois: Vec<usize> = terminals.iter().copied().collect();
    #[cfg(feature = "parallel")]
    {
        if parallel {
            use rayon::prelude::*;
            return nois.par_iter().map(|&noi| walk_from(p, noi, terminals, horizon, deadline)).collect();
        }
    }
    #[cfg(not(feature = "parallel"))]
    let _ = parallel;
    nois.iter().map(|&noi| walk_from(p, noi, terminals, horizon, deadline)).collect()
}

/// Collected node set on a connected network (indices into `network`).
fn lim_k_nodes(
    network: &Network,
    terminals: &BTreeSet<usize>,
    config: LimitedWalkConfig,
    deadline: &Deadline,
    parallel: bool,
) -> Result<BTreeSet<usize>> {
    let p = transition_matrix(network);
    let mut collect = terminals.clone();
    for round in 0..config.iterations {
        let k = collect.clone();
        let order = transient_order(network.node_count(), k.len());
        if order > config.max_order {
            return Err(Error::OrderLimit { order, limit: config.max_order });
        }
        for picked in round_picks(&p, &k, config.horizon, deadline, parallel)? {
            collect.extend(picked);
        }
        tracing::debug!(round, terminals = k.len(), collected = collect.len(), "lim_k_walks round");
    }
    Ok(collect)
}

fn lim_k_walks_impl<I, S>(
    network: &Network,
    terminals: I,
    config: LimitedWalkConfig,
    parallel: bool,
) -> Result<Network>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    config.validate()?;
    if !is_connected(network) {
        return Err(Error::Disconnected("lim_k_walks"));
    }
    let local = network.local_terminals(terminals);
    if local.len() < 2 {
        return Err(Error::TooFewTerminals { required: 2, found: local.len() });
    }
    let deadline = Deadline::after(config.time_limit);
    let nodes = lim_k_nodes(network, &local, config, &deadline, parallel)?;
    Ok(network.induced(nodes))
}

/// Limited k-walk on a connected network with at least two terminals.
pub fn lim_k_walks<I, S>(network: &Network, terminals: I, config: LimitedWalkConfig) -> Result<Network>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    lim_k_walks_impl(network, terminals, config, false)
}

/// [`lim_k_walks`] with each round's NOIs spread over the rayon pool. Same output.
#[cfg(feature = "parallel")]
pub fn lim_k_walks_parallel<I, S>(
    network: &Network,
    terminals: I,
    config: LimitedWalkConfig,
) -> Result<Network>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    lim_k_walks_impl(network, terminals, config, true)
}

/// Limited k-walk over every connected component holding at least two terminals; the
/// per-component answers are composed. Components with fewer terminals are skipped.
pub fn lim_k_search<I, S>(network: &Network, terminals: I, config: LimitedWalkConfig) -> Result<Network>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    config.validate()?;
    let local = network.local_terminals(terminals);
    if local.is_empty() {
        return Err(Error::NoTerminals);
    }
    let deadline = Deadline::after(config.time_limit);
    let mut collected = BTreeSet::new();
    for comp in connected_components(network) {
        let comp_terms: BTreeSet<usize> =
            comp.iter().enumerate().filter(|&(_, u)| local.contains(u)).map(|(j, _)| j).collect();
        if comp_terms.len() < 2 {
            continue;
        }
        let sub = network.induced(comp.iter().copied());
        let nodes = lim_k_nodes(&sub, &comp_terms, config, &deadline, false)?;
        collected.extend(nodes.into_iter().map(|j| comp[j]));
    }
    Ok(network.induced(collected))
}

#[cfg(test)]
mod tests {
    use super::*;

    // a - x - b with a pendant p on x.
    fn fork() -> Network {
        let mut b = Network::builder();
        b.add_edge("a", "x", 1.0).add_edge("x", "b", 1.0).add_edge("x", "p", 1.0);
        b.build().unwrap()
    }

    fn split_for(g: &Network, noi: &str, terms: &[&str]) -> AbsorbingSplit {
        let p = transition_matrix(g);
        let k: BTreeSet<usize> = terms.iter().map(|t| g.index_of(t).unwrap()).collect();
        AbsorbingSplit::new(&p, g.index_of(noi).unwrap(), &k)
    }

    #[test]
    fn forward_lattice_conserves_probability() {
        let g = fork();
        let split = split_for(&g, "a", &["a", "b"]);
        let lat = passage_lattices(&split, 8);
        let mut absorbed = 0.0;
        for l in 0..8 {
            absorbed += lat.alpha_absorbing.column(l).iter().sum::<f64>();
            let alive: f64 = lat.alpha.column(l).iter().sum();
            assert!((alive + absorbed - 1.0).abs() < 1e-12, "step {l}");
        }
    }

    #[test]
    fn backward_lattice_base_is_absorption_in_one_step() {
        let g = fork();
        let split = split_for(&g, "a", &["a", "b"]);
        let lat = passage_lattices(&split, 4);
        assert_eq!(lat.beta.column(0), vec![0.0; split.order()]);
        assert_eq!(lat.beta.column(1), split.r.row_sums());
        // transient order: a, p, x ; only x touches b
        assert!((lat.beta[(2, 1)] - 1.0 / 3.0).abs() < 1e-12);
        // a reaches b in exactly two steps with probability 1/3
        assert!((lat.beta[(0, 2)] - 1.0 / 3.0).abs() < 1e-12);
    }

    // Triangle a, x, y with b hanging off y, and q hanging off b.
    fn kite() -> Network {
        let mut b = Network::builder();
        b.add_edge("a", "x", 1.0)
            .add_edge("x", "y", 1.0)
            .add_edge("a", "y", 1.0)
            .add_edge("y", "b", 1.0)
            .add_edge("b", "q", 1.0);
        b.build().unwrap()
    }

    #[test]
    fn edge_passage_pairs_lattice_columns() {
        // transient order: a, q, x, y; q is never reached before absorption.
        let g = kite();
        let split = split_for(&g, "a", &["a", "b"]);
        let lat = passage_lattices(&split, 3);
        let e = edge_passage(&split, &lat);
        let close = |got: f64, want: f64| assert!((got - want).abs() < 1e-12, "{got} != {want}");
        close(e[(0, 2)], 5.0 / 24.0);
        close(e[(0, 3)], 0.0);
        close(e[(2, 0)], 1.0 / 12.0);
        close(e[(2, 3)], 0.5);
        close(e[(3, 0)], 1.0 / 12.0);
        close(e[(3, 2)], 1.0 / 12.0);
        assert!(e.row(1).iter().all(|&v| v == 0.0));
        assert_eq!(auto_threshold(&e), Threshold::Connected { theta: e[(2, 3)], kept: vec![2, 3] });
    }

    #[test]
    fn bipartite_network_always_falls_back() {
        // Adjacent states of a bipartite graph sit on lattice columns of opposite parity.
        let g = fork();
        for horizon in [3, 4, 5, 8] {
            let split = split_for(&g, "a", &["a", "b"]);
            let e = edge_passage(&split, &passage_lattices(&split, horizon));
            assert_eq!(auto_threshold(&e), Threshold::Fallback, "horizon {horizon}");
            let cfg = LimitedWalkConfig { horizon, ..Default::default() };
            assert_eq!(lim_k_walks(&g, ["a", "b"], cfg).unwrap().ids(), &["a", "b", "p", "x"]);
        }
    }

    #[test]
    fn later_rounds_walk_from_collected_nodes() {
        let g = kite();
        let cfg = LimitedWalkConfig { horizon: 3, ..Default::default() };
        assert_eq!(lim_k_walks(&g, ["a", "b"], cfg).unwrap().ids(), &["a", "b", "x", "y"]);

        // Round two starts from {a, b, x, y}; b's walk can only loop through q, which it keeps.
        let cfg = LimitedWalkConfig { iterations: 2, ..cfg };
        assert_eq!(lim_k_walks(&g, ["a", "b"], cfg).unwrap().ids(), &["a", "b", "q", "x", "y"]);
    }

    #[test]
    fn unreachable_horizon_yields_zero_matrix_and_fallback() {
        let g = fork();
        let split = split_for(&g, "a", &["a", "b"]);
        let lat = passage_lattices(&split, 2);
        let e = edge_passage(&split, &lat);
        assert!(e.row_sums().iter().all(|&s| s == 0.0));
        assert_eq!(auto_threshold(&e), Threshold::Fallback);
    }

    #[test]
    fn threshold_skips_disconnected_levels() {
        // Two strong but separate edges (0-1, 2-3) and a weak bridge 1-2.
        let e = Matrix::from_rows(&[
            vec![0.0, 0.9, 0.0, 0.0],
            vec![0.0, 0.0, 0.2, 0.0],
            vec![0.0, 0.0, 0.0, 0.9],
            vec![0.0, 0.0, 0.0, 0.0],
        ]);
        assert_eq!(auto_threshold(&e), Threshold::Connected { theta: 0.2, kept: vec![0, 1, 2, 3] });
    }

    #[test]
    fn search_skips_components_with_one_terminal() {
        let mut b = Network::builder();
        b.add_edge("a", "x", 1.0).add_edge("x", "b", 1.0).add_edge("u", "v", 1.0);
        let g = b.build().unwrap();
        let cfg = LimitedWalkConfig { horizon: 3, ..Default::default() };
        let out = lim_k_search(&g, ["a", "b", "u"], cfg).unwrap();
        assert_eq!(out.ids(), &["a", "b", "x"]);
        assert!(matches!(lim_k_walks(&g, ["a", "b"], cfg), Err(Error::Disconnected(_))));
        assert!(matches!(
            lim_k_walks(&fork(), ["a"], cfg),
            Err(Error::TooFewTerminals { found: 1, .. })
        ));
        assert!(matches!(
            lim_k_walks(&fork(), ["a", "b"], LimitedWalkConfig { horizon: 1, ..cfg }),
            Err(Error::InvalidParameter(_))
        ));
    }
}

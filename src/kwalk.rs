//! Unbounded k-walk (Dupont et al., 2006).
//!
//! For each terminal taken as the node of interest (NOI), the other terminals become absorbing
//! and everything else transient. Row NOI of the fundamental matrix \(N = (I - Q_x)^{-1}\)
//! holds the expected number of visits to each transient state before absorption. The most
//! visited candidates (and near-ties, controlled by the inclusion parameter `r`) join the
//! answer.
//!
//! Only row NOI of \(N\) is needed, so instead of inverting we solve
//! \((I - Q_x)^\top x = e_0\), which is a single \(O(m^3/3)\) elimination with
//! \(m = |V| - |K| + 1\).

use std::collections::BTreeSet;
use std::time::Duration;

use crate::budget::Deadline;
use crate::markov::{transient_order, transition_matrix, AbsorbingSplit};
use crate::matrix::Matrix;
use crate::network::Network;
use crate::primitives::is_connected;
use crate::{Error, Result};

/// Visit counts closer than this (relative) are treated as the same value.
const TIE_RTOL: f64 = 1e-9;

#[derive(Debug, Clone, Copy)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct KWalkConfig {
    /// Inclusion parameter `r`: when NOI itself holds the top visit count `w1`, nodes at the
    /// runner-up count `w2` are admitted if `w2 / r >= w1`. `0` is treated as `0.001`.
    pub inclusion: f64,
    /// Largest allowed order of `Qx`.
    pub max_order: usize,
    pub time_limit: Option<Duration>,
}

impl Default for KWalkConfig {
    fn default() -> Self {
        Self { inclusion: 0.5, max_order: 1000, time_limit: None }
    }
}

struct Prepared {
    terminals: BTreeSet<usize>,
    r: f64,
    p: Matrix,
    deadline: Deadline,
}

fn prepare<I, S>(network: &Network, terminals: I, config: KWalkConfig) -> Result<Prepared>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    if !config.inclusion.is_finite() || config.inclusion < 0.0 {
        return Err(Error::InvalidParameter(format!(
            "inclusion must be non-negative, got {}",
            config.inclusion
        )));
    }
    let r = if config.inclusion == 0.0 { 0.001 } else { config.inclusion };
    if !is_connected(network) {
        return Err(Error::Disconnected("k_walk"));
    }
    let terminals = network.local_terminals(terminals);
    if terminals.len() < 2 {
        return Err(Error::TooFewTerminals { required: 2, found: terminals.len() });
    }
    let order = transient_order(network.node_count(), terminals.len());
    if order > config.max_order {
        return Err(Error::OrderLimit { order, limit: config.max_order });
    }
    tracing::debug!(nodes = network.node_count(), terminals = terminals.len(), r, "k_walk start");
    Ok(Prepared {
        terminals,
        r,
        p: transition_matrix(network),
        deadline: Deadline::after(config.time_limit),
    })
}

fn same(a: f64, b: f64) -> bool {
    (a - b).abs() <= TIE_RTOL * a.abs().max(b.abs())
}

/// Expected visits from NOI to every transient state (NOI first), i.e. row NOI of `N`.
pub(crate) fn visit_counts(split: &AbsorbingSplit) -> Result<Vec<f64>> {
    let m = split.order();
    let mut a = Matrix::identity(m);
    for i in 0..m {
        for j in 0..m {
            a[(i, j)] -= split.q[(j, i)];
        }
    }
    let mut e0 = vec![0.0; m];
    e0[0] = 1.0;
    a.solve(&e0)
}

/// Candidates selected for one NOI (graph indices, NOI itself excluded).
fn select_for_noi(prep: &Prepared, noi: usize) -> Result<BTreeSet<usize>> {
    prep.deadline.check("k_walk")?;
    let split = AbsorbingSplit::new(&prep.p, noi, &prep.terminals);
    let scores = visit_counts(&split)?;

    let mut distinct = scores.clone();
    distinct.sort_by(|a, b| b.total_cmp(a));
    let w1 = distinct[0];
    let w2 = distinct.iter().copied().find(|&v| !same(v, w1));
    let noi_is_max = same(scores[0], w1);

    let mut select = BTreeSet::new();
    for (pos, &score) in scores.iter().enumerate().skip(1) {
        let node = split.transient[pos];
        if same(score, w1) {
            select.insert(node);
        } else if let Some(w2) = w2 {
            if noi_is_max && same(score, w2) && w2 / prep.r >= w1 {
                select.insert(node);
            }
        }
    }
    tracing::trace!(noi, w1, ?w2, noi_is_max, selected = select.len(), "k_walk noi");
    Ok(select)
}

/// Unbounded k-walk on a connected network.
///
/// Errors: [`Error::Disconnected`], [`Error::TooFewTerminals`] (fewer than two terminals in the
/// network), [`Error::OrderLimit`] when `Qx` would exceed `max_order`.
pub fn k_walk<I, S>(network: &Network, terminals: I, config: KWalkConfig) -> Result<Network>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let prep = prepare(network, terminals, config)?;
    let mut collect = prep.terminals.clone();
    for &noi in &prep.terminals {
        collect.extend(select_for_noi(&prep, noi)?);
    }
    Ok(network.induced(collect))
}

/// [`k_walk`] with the per-NOI solves spread over the rayon pool. Same output.
#[cfg(feature = "parallel")]
pub fn k_walk_parallel<I, S>(network: &Network, terminals: I, config: KWalkConfig) -> Result<Network>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    use rayon::prelude::*;

    let prep = prepare(network, terminals, config)?;
    let nois: Vec<usize> = prep.terminals.iter().copied().collect();
    let picks: Vec<BTreeSet<usize>> =
        nois.par_iter().map(|&noi| select_for_noi(&prep, noi)).collect::<Result<_>>()?;
    let mut collect = prep.terminals.clone();
    for p in picks {
        collect.extend(p);
    }
    Ok(network.induced(collect))
}

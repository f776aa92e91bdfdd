//! Absorbing Markov chain plumbing shared by the k-walk scorers.
//!
//! The walk moves along edges proportionally to edge weight:
//! \[
//!   P(u \to v) = \frac{w(u,v)}{\sum_x w(u,x)}
//! \]
//! For a node of interest (NOI) and terminal set \(K\), the transient states are
//! \(\{NOI\} \cup (V \setminus K)\) with NOI first, and the absorbing states are
//! \(K \setminus \{NOI\}\). `Qx` is the transient-to-transient block of `P`, `Rx` the
//! transient-to-absorbing block.

use std::collections::BTreeSet;

use crate::graph::WeightedGraph;
use crate::matrix::Matrix;

/// Dense row-stochastic transition matrix \(D^{-1}A\). Rows of isolated nodes stay zero.
pub fn transition_matrix<G: WeightedGraph>(graph: &G) -> Matrix {
    let n = graph.node_count();
    let mut p = Matrix::zeros(n, n);
    for u in 0..n {
        for v in graph.neighbors(u) {
            p[(u, v)] = graph.edge_weight(u, v).max(0.0);
        }
    }
    p.normalize_rows();
    p
}

/// `P` partitioned around one node of interest. Built fresh per NOI.
#[derive(Debug, Clone)]
pub struct AbsorbingSplit {
    /// Transient states (graph indices), NOI at position 0, the rest ascending.
    pub transient: Vec<usize>,
    /// Absorbing states (graph indices), ascending.
    pub absorbing: Vec<usize>,
    pub q: Matrix,
    pub r: Matrix,
}

impl AbsorbingSplit {
    pub fn new(p: &Matrix, noi: usize, terminals: &BTreeSet<usize>) -> Self {
        let mut transient = vec![noi];
        transient.extend((0..p.rows()).filter(|i| *i != noi && !terminals.contains(i)));
        let absorbing: Vec<usize> = terminals.iter().copied().filter(|&t| t != noi).collect();
        let q = p.select(&transient, &transient);
        let r = p.select(&transient, &absorbing);
        Self { transient, absorbing, q, r }
    }

    /// Number of transient states (the order of `Qx`).
    pub fn order(&self) -> usize {
        self.transient.len()
    }
}

/// Order of `Qx` for a network of `n` nodes and `k` terminals.
pub(crate) fn transient_order(n: usize, k: usize) -> usize {
    n - k + 1
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::AdjacencyMatrix;

    #[test]
    fn rows_are_stochastic_and_weighted() {
        // 0 -(2)- 1 -(1)- 2
        let adj = vec![
            vec![0.0, 2.0, 0.0],
            vec![2.0, 0.0, 1.0],
            vec![0.0, 1.0, 0.0],
        ];
        let p = transition_matrix(&AdjacencyMatrix(&adj));
        for i in 0..3 {
            let s: f64 = p.row(i).iter().sum();
            assert!((s - 1.0).abs() < 1e-12);
        }
        assert!((p[(1, 0)] - 2.0 / 3.0).abs() < 1e-12);
        assert_eq!(p[(0, 1)], 1.0);
    }

    #[test]
    fn split_puts_noi_first() {
        // star: 0 center, leaves 1, 2, 3; terminals {1, 3}, NOI 3
        let adj = vec![
            vec![0.0, 1.0, 1.0, 1.0],
            vec![1.0, 0.0, 0.0, 0.0],
            vec![1.0, 0.0, 0.0, 0.0],
            vec![1.0, 0.0, 0.0, 0.0],
        ];
        let p = transition_matrix(&AdjacencyMatrix(&adj));
        let split = AbsorbingSplit::new(&p, 3, &BTreeSet::from([1, 3]));
        assert_eq!(split.transient, vec![3, 0, 2]);
        assert_eq!(split.absorbing, vec![1]);
        assert_eq!(split.order(), transient_order(4, 2));
        // center -> terminal 1 with probability 1/3
        assert!((split.r[(1, 0)] - 1.0 / 3.0).abs() < 1e-12);
        assert_eq!(split.q[(0, 1)], 1.0);
    }
}

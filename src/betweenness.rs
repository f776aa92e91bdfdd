//! Betweenness centrality.
//!
//! Public invariant:
//! - The output vector is indexed by node index (stable ordering).
//! - Disconnected graphs are allowed; unreachable pairs contribute 0.
//!
//! Notes:
//! - This is Brandes' algorithm for **undirected, unweighted** graphs.
//! - Every unordered pair is accumulated from both endpoints, and the sum is scaled by
//!   \(1/((n-1)(n-2))\) for \(n \ge 3\), so a star's center scores exactly 1.

use std::collections::VecDeque;

use crate::graph::GraphRef;

/// Normalised betweenness centrality (Brandes), one score per node index.
pub fn betweenness_centrality<G: GraphRef>(graph: &G) -> Vec<f64> {
    let n = graph.node_count();
    if n <= 2 {
        return vec![0.0; n];
    }

    let mut betweenness = vec![0.0; n];
    let mut stack: Vec<usize> = Vec::with_capacity(n);
    let mut pred: Vec<Vec<usize>> = vec![Vec::new(); n];
    let mut sigma = vec![0.0f64; n];
    let mut dist: Vec<i64> = vec![-1; n];
    let mut delta = vec![0.0f64; n];
    let mut queue: VecDeque<usize> = VecDeque::new();

    for s in 0..n {
        stack.clear();
        for p in &mut pred {
            p.clear();
        }
        sigma.fill(0.0);
        dist.fill(-1);
        delta.fill(0.0);

        sigma[s] = 1.0;
        dist[s] = 0;
        queue.push_back(s);

        while let Some(v) = queue.pop_front() {
            stack.push(v);
            for &w in graph.neighbors_ref(v) {
                if dist[w] < 0 {
                    dist[w] = dist[v] + 1;
                    queue.push_back(w);
                }
                if dist[w] == dist[v] + 1 {
                    sigma[w] += sigma[v];
                    pred[w].push(v);
                }
            }
        }

        while let Some(w) = stack.pop() {
            for &v in &pred[w] {
                // sigma[w] can be 0 for disconnected nodes; guard division.
                let sigma_w = sigma[w];
                if sigma_w > 0.0 {
                    delta[v] += (sigma[v] / sigma_w) * (1.0 + delta[w]);
                }
            }
            if w != s {
                betweenness[w] += delta[w];
            }
        }
    }

    let norm = 1.0 / ((n - 1) * (n - 2)) as f64;
    for b in &mut betweenness {
        *b *= norm;
    }
    betweenness
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::network::Network;

    #[test]
    fn line_graph_middle_is_highest() {
        // a - b - c - d
        let mut g = Network::builder();
        g.add_edge("a", "b", 1.0).add_edge("b", "c", 1.0).add_edge("c", "d", 1.0);
        let g = g.build().unwrap();

        let bc = betweenness_centrality(&g);
        // endpoints are 0; b lies on (a,c) and (a,d): 2 pairs * 2 / (3 * 2)
        assert_eq!(bc[0], 0.0);
        assert_eq!(bc[3], 0.0);
        assert!((bc[1] - 2.0 / 3.0).abs() < 1e-12, "b={}", bc[1]);
        assert!((bc[2] - 2.0 / 3.0).abs() < 1e-12, "c={}", bc[2]);
    }

    #[test]
    fn star_center_is_one() {
        let mut g = Network::builder();
        g.add_edge("c", "x", 1.0).add_edge("c", "y", 1.0).add_edge("c", "z", 1.0);
        let g = g.build().unwrap();
        let bc = betweenness_centrality(&g);
        assert!((bc[0] - 1.0).abs() < 1e-12);
        assert!(bc[1..].iter().all(|&b| b == 0.0));
    }
}

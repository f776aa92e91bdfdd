//! Graph primitives: unweighted shortest paths and connected components.
//!
//! All traversals scan neighbors in ascending index order and record the first discovery as the
//! BFS parent, so every path returned here is reproducible.

use std::collections::VecDeque;

use crate::graph::GraphRef;

const UNSEEN: usize = usize::MAX;

/// BFS from `source`; returns `(parent, dist)` with `UNSEEN` for unreachable nodes.
fn bfs_tree<G: GraphRef>(graph: &G, source: usize) -> (Vec<usize>, Vec<usize>) {
    let n = graph.node_count();
    let mut parent = vec![UNSEEN; n];
    let mut dist = vec![UNSEEN; n];
    let mut queue = VecDeque::new();
    parent[source] = source;
    dist[source] = 0;
    queue.push_back(source);
    while let Some(u) = queue.pop_front() {
        for &v in graph.neighbors_ref(u) {
            if dist[v] == UNSEEN {
                dist[v] = dist[u] + 1;
                parent[v] = u;
                queue.push_back(v);
            }
        }
    }
    (parent, dist)
}

fn walk_back(parent: &[usize], source: usize, target: usize) -> Option<Vec<usize>> {
    if parent[target] == UNSEEN {
        return None;
    }
    let mut path = vec![target];
    let mut cur = target;
    while cur != source {
        cur = parent[cur];
        path.push(cur);
    }
    path.reverse();
    Some(path)
}

/// Shortest (fewest hops) path `source ..= target`, or `None` if unreachable.
pub fn shortest_path<G: GraphRef>(graph: &G, source: usize, target: usize) -> Option<Vec<usize>> {
    let (parent, _) = bfs_tree(graph, source);
    walk_back(&parent, source, target)
}

/// All-pairs shortest paths, stored as one BFS parent tree per source.
///
/// Memory is \(O(n^2)\); build it on the component you are about to search, not the whole
/// input graph.
#[derive(Debug, Clone)]
pub struct ShortestPaths {
    parent: Vec<Vec<usize>>,
    dist: Vec<Vec<usize>>,
}

impl ShortestPaths {
    pub fn all_pairs<G: GraphRef>(graph: &G) -> Self {
        let n = graph.node_count();
        let mut parent = Vec::with_capacity(n);
        let mut dist = Vec::with_capacity(n);
        for s in 0..n {
            let (p, d) = bfs_tree(graph, s);
            parent.push(p);
            dist.push(d);
        }
        Self { parent, dist }
    }

    /// Path `source ..= target` (both endpoints included).
    pub fn path(&self, source: usize, target: usize) -> Option<Vec<usize>> {
        walk_back(&self.parent[source], source, target)
    }

    /// Hop count, `None` if unreachable.
    pub fn distance(&self, source: usize, target: usize) -> Option<usize> {
        match self.dist[source][target] {
            UNSEEN => None,
            d => Some(d),
        }
    }
}

/// Connected components, ordered by smallest member; members ascending.
pub fn connected_components<G: GraphRef>(graph: &G) -> Vec<Vec<usize>> {
    let n = graph.node_count();
    let mut label = vec![UNSEEN; n];
    let mut comps = Vec::new();
    let mut stack = Vec::new();
    for start in 0..n {
        if label[start] != UNSEEN {
            continue;
        }
        let id = comps.len();
        let mut members = vec![start];
        label[start] = id;
        stack.push(start);
        while let Some(u) = stack.pop() {
            for &v in graph.neighbors_ref(u) {
                if label[v] == UNSEEN {
                    label[v] = id;
                    members.push(v);
                    stack.push(v);
                }
            }
        }
        members.sort_unstable();
        comps.push(members);
    }
    comps
}

/// `true` for graphs with at most one component (the empty graph counts as connected).
pub fn is_connected<G: GraphRef>(graph: &G) -> bool {
    let n = graph.node_count();
    if n <= 1 {
        return true;
    }
    let (_, dist) = bfs_tree(graph, 0);
    dist.iter().all(|&d| d != UNSEEN)
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Adj(Vec<Vec<usize>>);

    impl GraphRef for Adj {
        fn node_count(&self) -> usize {
            self.0.len()
        }
        fn neighbors_ref(&self, node: usize) -> &[usize] {
            &self.0[node]
        }
    }

    #[test]
    fn bfs_prefers_lowest_index_parent() {
        // 0 - 1 - 3, 0 - 2 - 3: two shortest paths to 3, the one through 1 wins.
        let g = Adj(vec![vec![1, 2], vec![0, 3], vec![0, 3], vec![1, 2]]);
        assert_eq!(shortest_path(&g, 0, 3), Some(vec![0, 1, 3]));
        assert_eq!(shortest_path(&g, 3, 3), Some(vec![3]));

        let sp = ShortestPaths::all_pairs(&g);
        assert_eq!(sp.path(3, 0), Some(vec![3, 1, 0]));
        assert_eq!(sp.distance(2, 1), Some(2));
    }

    #[test]
    fn components_and_connectivity() {
        // {0,2} {1} {3,4}
        let g = Adj(vec![vec![2], vec![], vec![0], vec![4], vec![3]]);
        assert_eq!(connected_components(&g), vec![vec![0, 2], vec![1], vec![3, 4]]);
        assert!(!is_connected(&g));
        assert_eq!(shortest_path(&g, 0, 4), None);
        assert!(is_connected(&Adj(vec![])));
        assert!(is_connected(&Adj(vec![vec![]])));
    }
}

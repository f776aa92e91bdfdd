//! The scored, weighted, undirected network every algorithm runs on.
//!
//! Node ids are opaque strings kept in lexicographic order, so node index order *is* id order.
//! Each node carries an input `score` and a derived `weight`; each edge likewise. Weights start
//! out equal to scores and are re-derived with [`Network::map_node_weights`] /
//! [`Network::map_edge_weights`], which return new networks.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use crate::graph::{Graph, GraphRef, WeightedGraph};
use crate::{Error, Result};

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Network {
    ids: Vec<String>,
    index: HashMap<String, usize>,
    node_score: Vec<f64>,
    node_weight: Vec<f64>,
    // CSR-ish: per node, sorted neighbor indices with aligned edge attributes.
    adj: Vec<Vec<usize>>,
    edge_score: Vec<Vec<f64>>,
    edge_weight: Vec<Vec<f64>>,
}

/// Incrementally collects nodes and edges, validating everything in [`NetworkBuilder::build`].
#[derive(Debug, Clone, Default)]
pub struct NetworkBuilder {
    nodes: BTreeMap<String, f64>,
    edges: BTreeMap<(String, String), f64>,
    self_loops: usize,
}

impl NetworkBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add (or re-score) a node.
    pub fn add_node(&mut self, id: impl Into<String>, score: f64) -> &mut Self {
        self.nodes.insert(id.into(), score);
        self
    }

    /// Add an undirected edge. Unknown endpoints are created with score `1.0`; a repeated edge
    /// keeps the last score. Self-loops are dropped.
    pub fn add_edge(&mut self, a: impl Into<String>, b: impl Into<String>, score: f64) -> &mut Self {
        let (a, b) = (a.into(), b.into());
        if a == b {
            self.self_loops += 1;
            self.nodes.entry(a).or_insert(1.0);
            return self;
        }
        self.nodes.entry(a.clone()).or_insert(1.0);
        self.nodes.entry(b.clone()).or_insert(1.0);
        let key = if a < b { (a, b) } else { (b, a) };
        self.edges.insert(key, score);
        self
    }

    pub fn build(&self) -> Result<Network> {
        if self.self_loops > 0 {
            tracing::warn!(dropped = self.self_loops, "self-loops dropped");
        }
        let parts = Parts {
            nodes: self.nodes.iter().map(|(id, &s)| (id.clone(), (s, s))).collect(),
            edges: self.edges.iter().map(|(k, &s)| (k.clone(), (s, s))).collect(),
        };
        parts.assemble()
    }
}

/// Owned id-keyed view used to (re)build a [`Network`].
struct Parts {
    nodes: BTreeMap<String, (f64, f64)>,
    edges: BTreeMap<(String, String), (f64, f64)>,
}

fn check_positive(what: &'static str, id: &str, value: f64) -> Result<()> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(Error::NonPositiveScore { what, id: id.to_string(), value })
    }
}

impl Parts {
    fn assemble(self) -> Result<Network> {
        let n = self.nodes.len();
        let mut net = Network {
            ids: Vec::with_capacity(n),
            index: HashMap::with_capacity(n),
            node_score: Vec::with_capacity(n),
            node_weight: Vec::with_capacity(n),
            adj: vec![Vec::new(); n],
            edge_score: vec![Vec::new(); n],
            edge_weight: vec![Vec::new(); n],
        };
        for (i, (id, (score, weight))) in self.nodes.into_iter().enumerate() {
            check_positive("node", &id, score)?;
            check_positive("node weight", &id, weight)?;
            net.index.insert(id.clone(), i);
            net.ids.push(id);
            net.node_score.push(score);
            net.node_weight.push(weight);
        }
        // BTreeMap order over (low, high) pairs keeps every adjacency list sorted.
        let mut pending: Vec<(usize, usize, f64, f64)> = Vec::with_capacity(self.edges.len());
        for ((a, b), (score, weight)) in self.edges {
            let label = format!("{a}-{b}");
            check_positive("edge", &label, score)?;
            check_positive("edge weight", &label, weight)?;
            let ia = *net.index.get(&a).ok_or_else(|| Error::UnknownNode(a.clone()))?;
            let ib = *net.index.get(&b).ok_or_else(|| Error::UnknownNode(b.clone()))?;
            pending.push((ia, ib, score, weight));
        }
        for &(u, v, s, w) in &pending {
            net.adj[u].push(v);
            net.edge_score[u].push(s);
            net.edge_weight[u].push(w);
            net.adj[v].push(u);
            net.edge_score[v].push(s);
            net.edge_weight[v].push(w);
        }
        for u in 0..n {
            let mut triples: Vec<(usize, f64, f64)> = net.adj[u]
                .iter()
                .zip(&net.edge_score[u])
                .zip(&net.edge_weight[u])
                .map(|((&v, &s), &w)| (v, s, w))
                .collect();
            triples.sort_by_key(|t| t.0);
            net.adj[u] = triples.iter().map(|t| t.0).collect();
            net.edge_score[u] = triples.iter().map(|t| t.1).collect();
            net.edge_weight[u] = triples.iter().map(|t| t.2).collect();
        }
        Ok(net)
    }
}

impl Network {
    pub fn builder() -> NetworkBuilder {
        NetworkBuilder::new()
    }

    pub fn node_count(&self) -> usize {
        self.ids.len()
    }

    pub fn edge_count(&self) -> usize {
        self.adj.iter().map(Vec::len).sum::<usize>() / 2
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    pub fn ids(&self) -> &[String] {
        &self.ids
    }

    pub fn id(&self, node: usize) -> &str {
        &self.ids[node]
    }

    pub fn index_of(&self, id: &str) -> Option<usize> {
        self.index.get(id).copied()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.index.contains_key(id)
    }

    pub fn node_score(&self, node: usize) -> f64 {
        self.node_score[node]
    }

    pub fn node_weight(&self, node: usize) -> f64 {
        self.node_weight[node]
    }

    pub fn node_weights(&self) -> &[f64] {
        &self.node_weight
    }

    pub fn degree(&self, node: usize) -> usize {
        self.adj[node].len()
    }

    pub fn has_edge(&self, u: usize, v: usize) -> bool {
        self.adj[u].binary_search(&v).is_ok()
    }

    pub fn edge_score(&self, u: usize, v: usize) -> Option<f64> {
        self.adj[u].binary_search(&v).ok().map(|k| self.edge_score[u][k])
    }

    /// Undirected edges as `(u, v, score, weight)` with `u < v`, in index order.
    pub fn edges(&self) -> impl Iterator<Item = (usize, usize, f64, f64)> + '_ {
        self.adj.iter().enumerate().flat_map(move |(u, nbrs)| {
            nbrs.iter()
                .enumerate()
                .filter(move |(_, &v)| u < v)
                .map(move |(k, &v)| (u, v, self.edge_score[u][k], self.edge_weight[u][k]))
        })
    }

    /// Terminal ids present in this network, as sorted node indices.
    pub fn local_terminals<I, S>(&self, terminals: I) -> BTreeSet<usize>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        terminals.into_iter().filter_map(|t| self.index_of(t.as_ref())).collect()
    }

    /// Id-keyed view of a subset of nodes and every edge between them.
    fn parts_of(&self, keep: &[bool]) -> Parts {
        let nodes = (0..self.node_count())
            .filter(|&i| keep[i])
            .map(|i| (self.ids[i].clone(), (self.node_score[i], self.node_weight[i])))
            .collect();
        let edges = self
            .edges()
            .filter(|&(u, v, _, _)| keep[u] && keep[v])
            .map(|(u, v, s, w)| ((self.ids[u].clone(), self.ids[v].clone()), (s, w)))
            .collect();
        Parts { nodes, edges }
    }

    fn rebuild(parts: Parts) -> Network {
        // Values were validated when `self` was built; re-validation cannot fail.
        let net = parts.assemble();
        debug_assert!(net.is_ok(), "rebuilding validated parts failed: {:?}", net.as_ref().err());
        net.unwrap_or_default()
    }

    /// Subgraph induced on `nodes` (indices into `self`). Out-of-range indices are ignored.
    pub fn induced<I: IntoIterator<Item = usize>>(&self, nodes: I) -> Network {
        let mut keep = vec![false; self.node_count()];
        for i in nodes {
            if let Some(slot) = keep.get_mut(i) {
                *slot = true;
            }
        }
        Self::rebuild(self.parts_of(&keep))
    }

    /// Subgraph induced on the given ids; unknown ids are ignored.
    pub fn induced_by_ids<I, S>(&self, ids: I) -> Network
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.induced(self.local_terminals(ids))
    }

    /// Union of two networks' nodes and edges. Attributes from `other` win on overlap.
    pub fn compose(&self, other: &Network) -> Network {
        let mut parts = self.parts_of(&vec![true; self.node_count()]);
        let theirs = other.parts_of(&vec![true; other.node_count()]);
        parts.nodes.extend(theirs.nodes);
        parts.edges.extend(theirs.edges);
        Self::rebuild(parts)
    }

    /// New network whose node weights are `f(score)`. Fails if any derived weight is not
    /// positive and finite.
    pub fn map_node_weights<F: Fn(f64) -> f64>(&self, f: F) -> Result<Network> {
        let mut parts = self.parts_of(&vec![true; self.node_count()]);
        for (score, weight) in parts.nodes.values_mut() {
            *weight = f(*score);
        }
        parts.assemble()
    }

    /// New network whose edge weights are `f(score)`.
    pub fn map_edge_weights<F: Fn(f64) -> f64>(&self, f: F) -> Result<Network> {
        let mut parts = self.parts_of(&vec![true; self.node_count()]);
        for (score, weight) in parts.edges.values_mut() {
            *weight = f(*score);
        }
        parts.assemble()
    }

    /// Restrict to nodes that have an entry in `scores` and set their score (and weight) from it.
    pub fn overlay_node_scores(&self, scores: &BTreeMap<String, f64>) -> Result<Network> {
        let keep: Vec<bool> = self.ids.iter().map(|id| scores.contains_key(id)).collect();
        let mut parts = self.parts_of(&keep);
        for (id, attr) in parts.nodes.iter_mut() {
            let s = scores[id];
            *attr = (s, s);
        }
        let net = parts.assemble()?;
        tracing::debug!(
            before = self.node_count(),
            after = net.node_count(),
            "overlaid node scores"
        );
        Ok(net)
    }

    /// Export to a `petgraph` undirected graph (node weight = id, edge weight = edge weight).
    /// Node indices are preserved.
    #[cfg(feature = "petgraph")]
    pub fn to_petgraph(&self) -> petgraph::graph::UnGraph<String, f64> {
        let mut g = petgraph::graph::UnGraph::with_capacity(self.node_count(), self.edge_count());
        let idx: Vec<_> = self.ids.iter().map(|id| g.add_node(id.clone())).collect();
        for (u, v, _, w) in self.edges() {
            g.add_edge(idx[u], idx[v], w);
        }
        g
    }
}

impl Graph for Network {
    fn node_count(&self) -> usize {
        self.ids.len()
    }
    fn neighbors(&self, node: usize) -> Vec<usize> {
        self.adj[node].clone()
    }
    fn out_degree(&self, node: usize) -> usize {
        self.adj[node].len()
    }
}

impl GraphRef for Network {
    fn node_count(&self) -> usize {
        self.ids.len()
    }
    fn neighbors_ref(&self, node: usize) -> &[usize] {
        &self.adj[node]
    }
}

impl WeightedGraph for Network {
    fn edge_weight(&self, source: usize, target: usize) -> f64 {
        match self.adj[source].binary_search(&target) {
            Ok(k) => self.edge_weight[source][k],
            Err(_) => 0.0,
        }
    }
}

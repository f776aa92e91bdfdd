//! Minimal graph adapter traits.
//!
//! The algorithms only need "who are my neighbors" plus an edge weight; anything that can
//! answer those (a [`crate::Network`], a dense matrix, a `petgraph::Graph`) can be plugged in.
//! Nodes are dense indices `0..node_count()`.

pub trait Graph {
    fn node_count(&self) -> usize;
    fn neighbors(&self, node: usize) -> Vec<usize>;
    fn out_degree(&self, node: usize) -> usize {
        self.neighbors(node).len()
    }
}

/// A graph view that can return **borrowed** neighbor slices.
///
/// Implementors must return neighbors sorted ascending; BFS-based primitives rely on that
/// order for their tie-breaks.
pub trait GraphRef {
    fn node_count(&self) -> usize;
    fn neighbors_ref(&self, node: usize) -> &[usize];
    fn out_degree(&self, node: usize) -> usize {
        self.neighbors_ref(node).len()
    }
}

pub trait WeightedGraph: Graph {
    /// Weight of `source -> target`, `0.0` when there is no edge.
    fn edge_weight(&self, source: usize, target: usize) -> f64;
}

pub struct AdjacencyMatrix<'a>(pub &'a [Vec<f64>]);

impl<'a> Graph for AdjacencyMatrix<'a> {
    fn node_count(&self) -> usize {
        self.0.len()
    }
    fn neighbors(&self, node: usize) -> Vec<usize> {
        self.0[node].iter().enumerate().filter(|(_, &w)| w > 0.0).map(|(i, _)| i).collect()
    }
}

impl<'a> WeightedGraph for AdjacencyMatrix<'a> {
    fn edge_weight(&self, source: usize, target: usize) -> f64 {
        self.0[source][target]
    }
}

#[cfg(feature = "petgraph")]
impl<N, E, Ty, Ix> Graph for petgraph::Graph<N, E, Ty, Ix>
where
    Ty: petgraph::EdgeType,
    Ix: petgraph::graph::IndexType,
{
    fn node_count(&self) -> usize {
        self.node_count()
    }
    fn neighbors(&self, node: usize) -> Vec<usize> {
        let mut out: Vec<usize> =
            self.neighbors(petgraph::graph::NodeIndex::new(node)).map(|idx| idx.index()).collect();
        out.sort_unstable();
        out.dedup();
        out
    }
}

/// Edge weights come from `E: Into<f64>`; parallel edges are summed.
#[cfg(feature = "petgraph")]
impl<N, E, Ty, Ix> WeightedGraph for petgraph::Graph<N, E, Ty, Ix>
where
    E: Copy + Into<f64>,
    Ty: petgraph::EdgeType,
    Ix: petgraph::graph::IndexType,
{
    fn edge_weight(&self, source: usize, target: usize) -> f64 {
        use petgraph::graph::NodeIndex;
        self.edges_connecting(NodeIndex::new(source), NodeIndex::new(target))
            .map(|e| (*e.weight()).into())
            .sum()
    }
}

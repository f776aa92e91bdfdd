//! `subnet`: infer a connected explanatory subnetwork from a weighted graph and a
//! small set of terminal (seed) nodes.
//!
//! Algorithms:
//! - [`nw_steiner`]: approximate node-weighted Steiner tree (greedy quotient-cost merge).
//! - [`list_query`] / [`seed_query`]: score-threshold seed expansion.
//! - [`k_walk`]: unbounded k-walk (absorbing Markov chain visit counts).
//! - [`lim_k_search`] / [`lim_k_walks`]: horizon-bounded k-walk (passage-time lattices).
//! - [`mcl`], [`modularity`], [`gene_rank`]: clustering and ranking on the same graph type.
//!
//! Public invariants (must not drift):
//! - **Immutability**: algorithms take `&Network` and return a new induced [`Network`].
//! - **Determinism**: every "pick the best node" step breaks ties by node id order, which is
//!   the same as node index order inside a [`Network`]. Serial and `parallel` variants agree.
//! - **Fail fast**: structural preconditions are checked before any matrix work.
//! - **Finite output**: numeric degeneracies are zero-filled, never surfaced as NaN/inf.

pub mod betweenness;
pub mod budget;
pub mod graph;
pub mod heuristic;
pub mod io;
pub mod kwalk;
pub mod limkwalk;
pub mod markov;
pub mod matrix;
pub mod mcl;
pub mod neighborhood;
pub mod network;
pub mod primitives;
pub mod rank;
pub mod steiner;

pub use betweenness::betweenness_centrality;
pub use graph::{AdjacencyMatrix, Graph, GraphRef, WeightedGraph};
pub use heuristic::{list_query, seed_query, HeuristicConfig, SeedScore};
pub use io::{
    categorize, load_edge_list, load_node_scores, load_terminals, read_edge_list,
    read_node_scores, read_terminals, write_edge_attributes, write_node_attributes, write_sif,
    Categories, EdgeCategory, NodeCategory,
};
pub use kwalk::{k_walk, KWalkConfig};
pub use limkwalk::{
    auto_threshold, edge_passage, lim_k_search, lim_k_walks, passage_lattices,
    LimitedWalkConfig, PassageLattices, Threshold,
};
pub use markov::{transition_matrix, AbsorbingSplit};
pub use matrix::Matrix;
pub use mcl::{mcl, modularity, MclConfig, Partition};
pub use neighborhood::{neighbor, shrink};
pub use network::{Network, NetworkBuilder};
pub use primitives::{connected_components, is_connected, shortest_path, ShortestPaths};
pub use rank::{gene_rank, top_k, RankBy};
pub use steiner::{nw_conn_steiner, nw_steiner, SteinerConfig};

#[cfg(feature = "parallel")]
pub use kwalk::k_walk_parallel;
#[cfg(feature = "parallel")]
pub use limkwalk::lim_k_walks_parallel;

/// Coarse classification of [`Error`], mirroring who has to act on it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Bad input data or a graph that violates an algorithm's structural contract.
    Input,
    /// A caller-side precondition (parameter, terminal count, measure name).
    Precondition,
    /// A computation guard tripped (size bound, budget, singular system).
    Computation,
}

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("graph must be connected for {0}")]
    Disconnected(&'static str),
    #[error("no terminals present in the graph")]
    NoTerminals,
    #[error("{what} score for {id} must be positive and finite, got {value}")]
    NonPositiveScore {
        what: &'static str,
        id: String,
        value: f64,
    },
    #[error("unknown node: {0}")]
    UnknownNode(String),
    #[error("{source_name}:{line}: {message}")]
    Parse {
        source_name: String,
        line: usize,
        message: String,
    },
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error("at least {required} terminals required, got {found}")]
    TooFewTerminals { required: usize, found: usize },
    #[error("unknown ranking measure: {0} (expected degree, score or betweenness)")]
    UnknownMeasure(String),
    #[error("invalid parameter: {0}")]
    InvalidParameter(String),
    #[error("matrix order {order} exceeds limit {limit}")]
    OrderLimit { order: usize, limit: usize },
    #[error("singular linear system")]
    SingularMatrix,
    #[error("{stage} did not converge within {iterations} iterations")]
    BudgetExceeded {
        stage: &'static str,
        iterations: usize,
    },
    #[error("deadline exceeded during {0}")]
    DeadlineExceeded(&'static str),
}

impl Error {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::Disconnected(_)
            | Error::NoTerminals
            | Error::NonPositiveScore { .. }
            | Error::UnknownNode(_)
            | Error::Parse { .. }
            | Error::Io(_) => ErrorKind::Input,
            Error::TooFewTerminals { .. }
            | Error::UnknownMeasure(_)
            | Error::InvalidParameter(_) => ErrorKind::Precondition,
            Error::OrderLimit { .. }
            | Error::SingularMatrix
            | Error::BudgetExceeded { .. }
            | Error::DeadlineExceeded(_) => ErrorKind::Computation,
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;

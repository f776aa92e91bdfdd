//! Text input and Cytoscape-style output.
//!
//! Inputs are whitespace-delimited line formats; `#` starts a comment line in edge lists and
//! node score files. Outputs are `.sif` (edges), `.noa` (node attributes) and `.eda` (edge
//! attributes), one record per line, in node/edge index order.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::fs::File;
use std::io::{BufRead, BufReader, Write};
use std::path::Path;

use crate::network::Network;
use crate::{Error, Result};

const COMMENT: char = '#';
const DEFAULT_SCORE: f64 = 1.0;

fn open(path: &Path) -> Result<(BufReader<File>, String)> {
    let file = File::open(path)?;
    Ok((BufReader::new(file), path.display().to_string()))
}

fn parse_score(source_name: &str, line: usize, column: usize, field: Option<&str>) -> Result<f64> {
    match field {
        None => Ok(DEFAULT_SCORE),
        Some(raw) => raw.parse::<f64>().map_err(|e| Error::Parse {
            source_name: source_name.to_string(),
            line,
            message: format!("column {column}: invalid score {raw:?}: {e}"),
        }),
    }
}

/// Records of a line-oriented file: `(1-based line number, fields)`, skipping blank and
/// comment lines.
fn records<R: BufRead>(reader: R) -> impl Iterator<Item = Result<(usize, Vec<String>)>> {
    reader.lines().enumerate().filter_map(|(i, line)| match line {
        Err(e) => Some(Err(Error::Io(e))),
        Ok(line) => {
            let line = line.trim();
            if line.is_empty() || line.starts_with(COMMENT) {
                None
            } else {
                Some(Ok((i + 1, line.split_whitespace().map(str::to_string).collect())))
            }
        }
    })
}

/// Parse an edge list: `src dst [score]` per line. A missing score is `1.0`.
///
/// `source_name` only labels parse errors.
pub fn read_edge_list<R: BufRead>(reader: R, source_name: &str) -> Result<Network> {
    let mut builder = Network::builder();
    let mut lines = 0usize;
    for record in records(reader) {
        let (line, fields) = record?;
        if fields.len() < 2 {
            return Err(Error::Parse {
                source_name: source_name.to_string(),
                line,
                message: "expected `source target [score]`".to_string(),
            });
        }
        let score = parse_score(source_name, line, 3, fields.get(2).map(String::as_str))?;
        builder.add_edge(fields[0].as_str(), fields[1].as_str(), score);
        lines += 1;
    }
    let network = builder.build()?;
    tracing::debug!(
        source = source_name,
        lines,
        nodes = network.node_count(),
        edges = network.edge_count(),
        "read edge list"
    );
    Ok(network)
}

pub fn load_edge_list(path: impl AsRef<Path>) -> Result<Network> {
    let (reader, name) = open(path.as_ref())?;
    read_edge_list(reader, &name)
}

/// Parse node scores: `id [score]` per line. A missing score is `1.0`; later lines win.
pub fn read_node_scores<R: BufRead>(reader: R, source_name: &str) -> Result<BTreeMap<String, f64>> {
    let mut scores = BTreeMap::new();
    for record in records(reader) {
        let (line, mut fields) = record?;
        let score = parse_score(source_name, line, 2, fields.get(1).map(String::as_str))?;
        let id = fields.swap_remove(0);
        if !(score.is_finite() && score > 0.0) {
            return Err(Error::NonPositiveScore { what: "node", id, value: score });
        }
        scores.insert(id, score);
    }
    Ok(scores)
}

pub fn load_node_scores(path: impl AsRef<Path>) -> Result<BTreeMap<String, f64>> {
    let (reader, name) = open(path.as_ref())?;
    read_node_scores(reader, &name)
}

/// Parse a terminal list: one id per non-blank line (surrounding whitespace trimmed).
pub fn read_terminals<R: BufRead>(reader: R) -> Result<BTreeSet<String>> {
    let mut terminals = BTreeSet::new();
    for line in reader.lines() {
        let line = line?;
        let id = line.trim();
        if !id.is_empty() {
            terminals.insert(id.to_string());
        }
    }
    Ok(terminals)
}

pub fn load_terminals(path: impl AsRef<Path>) -> Result<BTreeSet<String>> {
    let (reader, _) = open(path.as_ref())?;
    read_terminals(reader)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum NodeCategory {
    Terminal,
    /// In the subnetwork but not a terminal.
    Linker,
    Other,
}

impl fmt::Display for NodeCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            NodeCategory::Terminal => "terminal",
            NodeCategory::Linker => "linker",
            NodeCategory::Other => "other",
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum EdgeCategory {
    TerminalTerminal,
    TerminalLinker,
    LinkerLinker,
    /// Global edge that is also a subnetwork edge.
    Subnetwork,
    Other,
}

impl fmt::Display for EdgeCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            EdgeCategory::TerminalTerminal => "terminal_terminal",
            EdgeCategory::TerminalLinker => "terminal_linker",
            EdgeCategory::LinkerLinker => "linker_linker",
            EdgeCategory::Subnetwork => "subnetwork",
            EdgeCategory::Other => "other",
        })
    }
}

/// Per-node and per-edge categories, aligned with [`Network::ids`] and [`Network::edges`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Categories {
    pub nodes: Vec<NodeCategory>,
    pub edges: Vec<EdgeCategory>,
}

/// Categorise `global`'s nodes and edges.
///
/// With `sub = None`, `global` is the extracted subnetwork itself: non-terminals are linkers and
/// edges are classified by how many terminal endpoints they have. With `sub = Some(s)`, nodes
/// of `s` that are not terminals are linkers, the rest are `Other`, and edges are
/// `Subnetwork` when `s` has them.
pub fn categorize(global: &Network, sub: Option<&Network>, terminals: &BTreeSet<String>) -> Categories {
    let is_terminal = |u: usize| terminals.contains(global.id(u));
    let nodes = (0..global.node_count())
        .map(|u| {
            if is_terminal(u) {
                NodeCategory::Terminal
            } else if sub.map_or(true, |s| s.contains(global.id(u))) {
                NodeCategory::Linker
            } else {
                NodeCategory::Other
            }
        })
        .collect();
    let edges = global
        .edges()
        .map(|(u, v, _, _)| match sub {
            Some(s) => {
                let inside = match (s.index_of(global.id(u)), s.index_of(global.id(v))) {
                    (Some(a), Some(b)) => s.has_edge(a, b),
                    _ => false,
                };
                if inside {
                    EdgeCategory::Subnetwork
                } else {
                    EdgeCategory::Other
                }
            }
            None => match (is_terminal(u), is_terminal(v)) {
                (true, true) => EdgeCategory::TerminalTerminal,
                (true, false) | (false, true) => EdgeCategory::TerminalLinker,
                (false, false) => EdgeCategory::LinkerLinker,
            },
        })
        .collect();
    Categories { nodes, edges }
}

/// Write edges as SIF: `a<TAB>interaction<TAB>b`.
pub fn write_sif<W: Write>(mut writer: W, network: &Network, interaction: &str) -> Result<()> {
    for (u, v, _, _) in network.edges() {
        writeln!(writer, "{}\t{}\t{}", network.id(u), interaction, network.id(v))?;
    }
    writer.flush()?;
    Ok(())
}

/// Write a `.noa` node attribute file: header `name class=class`, then `id = value`.
/// `values` is aligned with [`Network::ids`].
pub fn write_node_attributes<W: Write, V: fmt::Display>(
    mut writer: W,
    network: &Network,
    name: &str,
    class: &str,
    values: &[V],
) -> Result<()> {
    if values.len() != network.node_count() {
        return Err(Error::InvalidParameter(format!(
            "{} node attribute values for {} nodes",
            values.len(),
            network.node_count()
        )));
    }
    writeln!(writer, "{name} class={class}")?;
    for (id, value) in network.ids().iter().zip(values) {
        writeln!(writer, "{id} = {value}")?;
    }
    writer.flush()?;
    Ok(())
}

/// Write a `.eda` edge attribute file: header `name class=class`, then
/// `a (interaction) b = value`. `values` is aligned with [`Network::edges`].
pub fn write_edge_attributes<W: Write, V: fmt::Display>(
    mut writer: W,
    network: &Network,
    interaction: &str,
    name: &str,
    class: &str,
    values: &[V],
) -> Result<()> {
    if values.len() != network.edge_count() {
        return Err(Error::InvalidParameter(format!(
            "{} edge attribute values for {} edges",
            values.len(),
            network.edge_count()
        )));
    }
    writeln!(writer, "{name} class={class}")?;
    for ((u, v, _, _), value) in network.edges().zip(values) {
        writeln!(writer, "{} ({interaction}) {} = {value}", network.id(u), network.id(v))?;
    }
    writer.flush()?;
    Ok(())
}

//! End-to-end run: load a network and terminals, extract a subnetwork, cluster and rank it,
//! and write Cytoscape files.
//!
//! ```text
//! SUBNET_EDGES=edges.txt SUBNET_TERMINALS=seeds.txt [SUBNET_NODES=scores.txt] \
//! SUBNET_METHOD=steiner|heuristic|kwalk|limkwalk [SUBNET_OUT=out/] \
//! RUST_LOG=subnet=debug cargo run --example subnetwork
//! ```
//!
//! Without `SUBNET_EDGES` a seeded two-block random graph is used.

use std::collections::BTreeSet;
use std::fs::File;
use std::io::BufWriter;
use std::path::{Path, PathBuf};

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use subnet::{
    categorize, gene_rank, k_walk, lim_k_search, list_query, load_edge_list, load_node_scores,
    load_terminals, mcl, modularity, nw_steiner, write_edge_attributes, write_node_attributes,
    write_sif, HeuristicConfig, KWalkConfig, LimitedWalkConfig, MclConfig, Network,
    SteinerConfig,
};

fn two_block(n: usize, p_in: f64, p_out: f64, seed: u64) -> subnet::Result<Network> {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let half = n / 2;
    let mut b = Network::builder();
    for i in 0..n {
        b.add_node(format!("g{i:03}"), rng.random_range(0.1..5.0));
        if i > 0 {
            // Backbone path keeps the graph connected.
            b.add_edge(format!("g{:03}", i - 1), format!("g{i:03}"), 1.0);
        }
    }
    for i in 0..n {
        for j in (i + 1)..n {
            let same = (i < half) == (j < half);
            let p = if same { p_in } else { p_out };
            if rng.random::<f64>() < p {
                b.add_edge(format!("g{i:03}"), format!("g{j:03}"), rng.random_range(0.5..2.0));
            }
        }
    }
    b.build()
}

fn extract(method: &str, g: &Network, terminals: &BTreeSet<String>) -> subnet::Result<Network> {
    match method {
        "heuristic" => list_query(g, terminals, HeuristicConfig::default()),
        "kwalk" => k_walk(g, terminals, KWalkConfig::default()),
        "limkwalk" => lim_k_search(g, terminals, LimitedWalkConfig::default()),
        _ => {
            // Steiner minimises node weight: high-scoring genes should be cheap to include.
            let costs = g.map_node_weights(|s| 1.0 / s)?;
            nw_steiner(&costs, terminals, SteinerConfig::default())
        }
    }
}

fn write_outputs(dir: &Path, g: &Network, sub: &Network, terminals: &BTreeSet<String>) -> subnet::Result<()> {
    std::fs::create_dir_all(dir)?;
    let own = categorize(sub, None, terminals);
    write_sif(BufWriter::new(File::create(dir.join("subnetwork.sif"))?), sub, "pp")?;
    write_node_attributes(
        BufWriter::new(File::create(dir.join("subnetwork.noa"))?),
        sub,
        "NodeCategory",
        "String",
        &own.nodes,
    )?;
    write_edge_attributes(
        BufWriter::new(File::create(dir.join("subnetwork.eda"))?),
        sub,
        "pp",
        "EdgeCategory",
        "String",
        &own.edges,
    )?;

    let global = categorize(g, Some(sub), terminals);
    write_sif(BufWriter::new(File::create(dir.join("global.sif"))?), g, "pp")?;
    write_node_attributes(
        BufWriter::new(File::create(dir.join("global.noa"))?),
        g,
        "NodeCategory",
        "String",
        &global.nodes,
    )?;
    write_edge_attributes(
        BufWriter::new(File::create(dir.join("global.eda"))?),
        g,
        "pp",
        "EdgeCategory",
        "String",
        &global.edges,
    )?;
    Ok(())
}

fn main() -> subnet::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "subnet=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let g = match std::env::var("SUBNET_EDGES") {
        Ok(path) => load_edge_list(&path)?,
        Err(_) => two_block(120, 0.08, 0.004, 123)?,
    };
    let g = match std::env::var("SUBNET_NODES") {
        Ok(path) => g.overlay_node_scores(&load_node_scores(&path)?)?,
        Err(_) => g,
    };
    let terminals: BTreeSet<String> = match std::env::var("SUBNET_TERMINALS") {
        Ok(path) => load_terminals(&path)?,
        Err(_) => g.ids().iter().step_by(17).cloned().collect(),
    };
    let method = std::env::var("SUBNET_METHOD").unwrap_or_else(|_| "steiner".to_string());

    let sub = extract(&method, &g, &terminals)?;
    println!(
        "graph: n={} m={}  terminals={}  method={method}",
        g.node_count(),
        g.edge_count(),
        terminals.len()
    );
    println!("subnetwork: n={} m={}", sub.node_count(), sub.edge_count());

    match mcl(&sub, MclConfig::default())? {
        Some(parts) => {
            let q = modularity(&sub, &parts)?;
            println!("mcl: {} clusters, modularity={q:.4}", parts.len());
        }
        None => println!("mcl: skipped (network too large)"),
    }

    println!("top-10 by degree:");
    for (id, d) in gene_rank(&sub, "degree", 10)? {
        println!("  {id:>8}  {d}");
    }

    if let Ok(dir) = std::env::var("SUBNET_OUT") {
        let dir = PathBuf::from(dir);
        write_outputs(&dir, &g, &sub, &terminals)?;
        println!("wrote Cytoscape files to {}", dir.display());
    }
    Ok(())
}

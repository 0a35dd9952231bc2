use harbor_streets::config::HARBOR_BOUNDS;
use harbor_streets::{PbfExtract, StreetGraph, StreetSource};
use serde::{Deserialize, Serialize};
use std::fs::{self, File};

const FILE_NAME: &str = "./osm_data/new-york-latest.osm.pbf";

#[derive(Serialize, Deserialize)]
struct SimplificationStats {
    nodes_before: usize,
    edges_before: usize,
    nodes_after: usize,
    edges_after: usize,
    merged_edges: usize,
    total_length_m: f64,
}

fn main() -> anyhow::Result<()> {
    env_logger::init_from_env(
        env_logger::Env::default().filter_or(env_logger::DEFAULT_FILTER_ENV, "info"),
    );

    let data = PbfExtract::new(FILE_NAME).fetch(&HARBOR_BOUNDS)?;

    let mut graph = StreetGraph::from_osm(&data, &HARBOR_BOUNDS);
    graph.retain_largest_component();
    let (nodes_before, edges_before) = (graph.node_count(), graph.edge_count());

    graph.simplify()?;

    let stats = SimplificationStats {
        nodes_before,
        edges_before,
        nodes_after: graph.node_count(),
        edges_after: graph.edge_count(),
        merged_edges: graph.edges().iter().filter(|e| e.geometry.is_some()).count(),
        total_length_m: graph
            .edges()
            .iter()
            .filter_map(|e| e.attributes.get("length").and_then(|l| l.as_f64()))
            .sum(),
    };

    println!(
        "Graph: #nodes {}, #edges {}",
        stats.nodes_before, stats.edges_before
    );
    println!(
        "Simplified graph: #nodes {}, #edges {}",
        stats.nodes_after, stats.edges_after
    );

    fs::create_dir_all("output")?;
    serde_json::to_writer_pretty(File::create("output/simplification.json")?, &stats)?;

    Ok(())
}

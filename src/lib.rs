use std::path::Path;

pub mod config;
pub mod error;
pub mod flatten;
pub mod graph;
pub mod osm;
pub mod overpass;
pub mod reader;
pub mod report;
pub mod table;
pub mod writer;

pub use config::{BoundingBox, HARBOR_BOUNDS, PREFERRED_COLUMNS};
pub use error::{Error, Result};
pub use graph::StreetGraph;
pub use osm::{HasTags, OsmData, OsmNode, OsmWay};
pub use overpass::OverpassClient;
pub use reader::PbfExtract;
pub use report::Summary;
pub use table::StreetTable;

/// Anything that can hand back the raw drivable ways and nodes of an area.
pub trait StreetSource {
    fn fetch(&self, bbox: &BoundingBox) -> Result<OsmData>;
}

/// Fetch the street network for `bbox` and reduce it to the simplified graph
/// of its largest connected component.
pub fn fetch_graph<S: StreetSource + ?Sized>(source: &S, bbox: &BoundingBox) -> Result<StreetGraph> {
    let data = source.fetch(bbox)?;

    let mut graph = StreetGraph::from_osm(&data, bbox);
    let dropped = graph.retain_largest_component();
    log::debug!("Dropped {dropped} nodes outside the largest component");

    graph.simplify()?;
    if graph.edge_count() == 0 {
        return Err(Error::EmptyGraph(*bbox));
    }
    Ok(graph)
}

/// Edge table of `graph` restricted to the preferred columns, lists flattened.
pub fn prepare_streets(graph: &StreetGraph) -> Result<StreetTable> {
    let (nodes, edges) = table::graph_to_tables(graph)?;
    log::debug!("Discarding {} node rows", nodes.len());

    let mut streets = edges.select(&PREFERRED_COLUMNS);
    flatten::flatten_lists(&mut streets);
    Ok(streets)
}

/// The whole run: fetch, simplify, tabulate, write and report.
pub fn run<S: StreetSource + ?Sized>(source: &S, bbox: &BoundingBox, output: &Path) -> Result<Summary> {
    report::print_fetch_start(bbox);

    let graph = fetch_graph(source, bbox)?;
    report::print_graph(&graph);

    let streets = prepare_streets(&graph)?;
    let size_bytes = writer::write_geojson(output, &streets)?;
    log::info!("Wrote {}", output.display());

    let summary = Summary::new(bbox, &graph, &streets, output.canonicalize()?, size_bytes);
    print!("{summary}");
    Ok(summary)
}

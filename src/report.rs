use crate::config::BoundingBox;
use crate::graph::StreetGraph;
use crate::table::StreetTable;
use std::fmt;
use std::path::PathBuf;

const BYTES_PER_MB: f64 = 1024.0 * 1024.0;

#[derive(Debug, Clone, PartialEq)]
pub struct Summary {
    pub bbox: BoundingBox,
    pub node_count: usize,
    pub edge_count: usize,
    pub feature_count: usize,
    pub path: PathBuf,
    pub size_bytes: u64,
    /// `None` when the output has no `highway` column.
    pub highway_counts: Option<Vec<(String, usize)>>,
}

impl Summary {
    pub fn new(
        bbox: &BoundingBox,
        graph: &StreetGraph,
        streets: &StreetTable,
        path: PathBuf,
        size_bytes: u64,
    ) -> Summary {
        Summary {
            bbox: *bbox,
            node_count: graph.node_count(),
            edge_count: graph.edge_count(),
            feature_count: streets.feature_count(),
            path,
            size_bytes,
            highway_counts: streets.value_counts("highway"),
        }
    }

    pub fn size_mb(&self) -> f64 {
        self.size_bytes as f64 / BYTES_PER_MB
    }
}

impl fmt::Display for Summary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f)?;
        writeln!(f, "Wrote {} street segments to:", thousands(self.feature_count))?;
        writeln!(f, "  {}", self.path.display())?;
        writeln!(f, "  Size: {:.1} MB", self.size_mb())?;

        if let Some(counts) = &self.highway_counts {
            writeln!(f)?;
            writeln!(f, "Street types:")?;
            for (highway, count) in counts {
                writeln!(f, "  {}: {}", highway, thousands(*count))?;
            }
        }
        Ok(())
    }
}

pub fn print_fetch_start(bbox: &BoundingBox) {
    println!("Fetching OSM street network for bbox:");
    println!("  {bbox}");
    println!();
}

pub fn print_graph(graph: &StreetGraph) {
    println!(
        "Downloaded graph: {} nodes, {} edges",
        thousands(graph.node_count()),
        thousands(graph.edge_count())
    );
}

/// `1234567` -> `1,234,567`
pub fn thousands(n: usize) -> String {
    let digits = n.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(c);
    }
    out
}

#[test]
fn test_thousands() {
    assert_eq!("0", thousands(0));
    assert_eq!("999", thousands(999));
    assert_eq!("1,000", thousands(1000));
    assert_eq!("48,213", thousands(48213));
    assert_eq!("1,234,567", thousands(1234567));
}

#[test]
fn test_summary_display() {
    let summary = Summary {
        bbox: crate::config::HARBOR_BOUNDS,
        node_count: 10,
        edge_count: 20,
        feature_count: 1500,
        path: PathBuf::from("/repo/public/assets/data/harbor-streets.geojson"),
        size_bytes: 3 * 1024 * 1024 + 200 * 1024,
        highway_counts: Some(vec![
            ("residential".to_string(), 1200),
            ("primary".to_string(), 300),
        ]),
    };

    let expected = "\nWrote 1,500 street segments to:\n  \
        /repo/public/assets/data/harbor-streets.geojson\n  \
        Size: 3.2 MB\n\n\
        Street types:\n  residential: 1,200\n  primary: 300\n";
    assert_eq!(expected, summary.to_string());
}

#[test]
fn test_summary_without_highway_column() {
    let summary = Summary {
        bbox: crate::config::HARBOR_BOUNDS,
        node_count: 0,
        edge_count: 0,
        feature_count: 0,
        path: PathBuf::from("out.geojson"),
        size_bytes: 0,
        highway_counts: None,
    };
    assert!(!summary.to_string().contains("Street types"));
}

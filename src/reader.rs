use crate::config::BoundingBox;
use crate::error::Error;
use crate::osm::{OsmData, OsmNode, OsmWay};
use crate::StreetSource;
use osmpbf::{Element, ElementReader};
use std::collections::HashMap;
use std::io::Read;
use std::path::{Path, PathBuf};

pub trait Filter {
    fn collect_filtered<T, F>(path: &Path, filter_map: F) -> Result<Vec<T>, osmpbf::Error>
    where
        F: Fn(Element) -> Option<T> + Send + Sync,
        T: Send;
}

impl<R: Read + Send> Filter for ElementReader<R> {
    fn collect_filtered<T, F>(path: &Path, filter_map: F) -> Result<Vec<T>, osmpbf::Error>
    where
        F: Fn(Element) -> Option<T> + Send + Sync,
        T: Send,
    {
        let reader = ElementReader::from_path(path)?;
        reader
            .par_map_reduce(
                |element| filter_map(element).map(|item| vec![item]),
                || None,
                |a, b| match (a, b) {
                    (res @ Some(_), None) => res,
                    (None, res @ Some(_)) => res,
                    (Some(r1), Some(r2)) => Some(r1.into_iter().chain(r2).collect()),
                    _ => None,
                },
            )
            .map(|opt| opt.unwrap_or_default())
    }
}

/// Read an OSM file and parse out all of the drivable ways.
pub fn collect_street_ways(path: &Path) -> Result<Vec<OsmWay>, Error> {
    let ways =
        ElementReader::<std::fs::File>::collect_filtered(path, |element| match element {
            Element::Way(way) => Some(OsmWay::from_osm_way(&way)).filter(OsmWay::is_drivable),
            _ => None,
        })?;

    log::info!("Number of drivable ways {}", ways.len());
    Ok(ways)
}

/// Nodes inside `bbox`; anything outside would be truncated from the graph anyway.
pub fn collect_nodes(path: &Path, bbox: BoundingBox) -> Result<HashMap<i64, OsmNode>, Error> {
    let nodes = ElementReader::<std::fs::File>::collect_filtered(path, move |element| {
        let (id, node) = match element {
            Element::Node(node) => (node.id(), OsmNode::new(node.lat(), node.lon(), node.tags())),
            Element::DenseNode(node) => {
                (node.id(), OsmNode::new(node.lat(), node.lon(), node.tags()))
            }
            _ => return None,
        };
        bbox.contains(node.lat, node.lon).then_some((id, node))
    })?;

    log::info!("Number of nodes in bounds {}", nodes.len());
    Ok(nodes.into_iter().collect())
}

/// A local `.osm.pbf` extract used in place of the Overpass API.
pub struct PbfExtract {
    path: PathBuf,
}

impl PbfExtract {
    pub fn new(path: impl Into<PathBuf>) -> PbfExtract {
        PbfExtract { path: path.into() }
    }
}

impl StreetSource for PbfExtract {
    fn fetch(&self, bbox: &BoundingBox) -> Result<OsmData, Error> {
        log::info!("Reading {}", self.path.display());
        Ok(OsmData {
            nodes: collect_nodes(&self.path, *bbox)?,
            ways: collect_street_ways(&self.path)?,
        })
    }
}

#[test]
fn test_missing_extract_is_an_error() {
    let source = PbfExtract::new("./osm_data/does-not-exist.osm.pbf");
    assert!(source.fetch(&crate::config::HARBOR_BOUNDS).is_err());
}

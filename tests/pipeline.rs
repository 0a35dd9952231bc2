use std::collections::{BTreeSet, HashMap};
use std::fs;
use std::path::Path;

use geo::LineString;
use harbor_streets::osm::Attributes;
use harbor_streets::{
    fetch_graph, prepare_streets, run, writer, Error, OsmData, OsmNode, OsmWay, Result,
    StreetGraph, StreetSource, BoundingBox, HARBOR_BOUNDS,
};
use serde_json::{json, Value};

/// Serves a fixed set of OSM elements.
struct FixedSource(OsmData);

impl StreetSource for FixedSource {
    fn fetch(&self, _bbox: &BoundingBox) -> Result<OsmData> {
        Ok(self.0.clone())
    }
}

struct FailingSource;

impl StreetSource for FailingSource {
    fn fetch(&self, _bbox: &BoundingBox) -> Result<OsmData> {
        Err(Error::Overpass {
            status: 504,
            body: "Gateway Timeout".to_string(),
        })
    }
}

fn way(way_id: i64, node_ids: &[i64], tags: &[(&str, &str)]) -> OsmWay {
    OsmWay {
        way_id,
        node_ids: node_ids.to_vec(),
        tags: tags
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect(),
    }
}

/// A small grid around Battery Park: a two-way avenue crossed by a one-way
/// street, with a name change along the avenue.
fn harbor_data() -> OsmData {
    let nodes: HashMap<i64, OsmNode> = (1..=8)
        .map(|id| {
            let node = OsmNode {
                lat: 40.700 + id as f64 * 0.001,
                lon: -74.015 + (id % 3) as f64 * 0.001,
                tags: HashMap::new(),
            };
            (id, node)
        })
        .collect();

    OsmData {
        nodes,
        ways: vec![
            way(
                100,
                &[1, 2, 3],
                &[("highway", "primary"), ("name", "West Street"), ("lanes", "3")],
            ),
            way(
                101,
                &[3, 4, 5],
                &[("highway", "primary"), ("name", "West Side Highway"), ("maxspeed", "35 mph")],
            ),
            way(
                102,
                &[6, 4, 7],
                &[("highway", "residential"), ("name", "Albany Street"), ("oneway", "yes")],
            ),
            way(103, &[7, 8], &[("highway", "footway")]),
        ],
    }
}

fn read_features(path: &Path) -> Vec<Value> {
    let written: Value = serde_json::from_str(&fs::read_to_string(path).unwrap()).unwrap();
    assert_eq!(json!("FeatureCollection"), written["type"]);
    written["features"].as_array().unwrap().clone()
}

fn property_keys(features: &[Value]) -> BTreeSet<String> {
    features
        .iter()
        .flat_map(|f| f["properties"].as_object().unwrap().keys().cloned())
        .collect()
}

#[test]
fn test_run_writes_one_feature_per_edge() {
    let dir = tempfile::tempdir().unwrap();
    let output = dir.path().join("public/assets/data/harbor-streets.geojson");
    let source = FixedSource(harbor_data());

    let summary = run(&source, &HARBOR_BOUNDS, &output).unwrap();
    let graph = fetch_graph(&source, &HARBOR_BOUNDS).unwrap();
    let features = read_features(&output);

    assert_eq!(graph.edge_count(), features.len());
    assert_eq!(summary.feature_count, features.len());
    assert_eq!(summary.edge_count, graph.edge_count());
    assert!(summary.path.is_absolute());
    assert_eq!(summary.size_bytes, fs::metadata(&output).unwrap().len());

    for feature in features.iter() {
        assert!(!feature["geometry"].is_null());
        assert_eq!(json!("LineString"), feature["geometry"]["type"]);
        for value in feature["properties"].as_object().unwrap().values() {
            assert!(!value.is_array(), "{feature}");
        }
    }

    // `osmid`, `reversed` and the footway never make it to the output.
    let expected: BTreeSet<String> = ["name", "highway", "lanes", "maxspeed", "oneway", "length"]
        .iter()
        .map(|s| s.to_string())
        .collect();
    assert_eq!(expected, property_keys(&features));

    let highway_counts = summary.highway_counts.unwrap();
    assert_eq!("primary", highway_counts[0].0);
}

#[test]
fn test_merged_names_flatten_to_first() {
    let dir = tempfile::tempdir().unwrap();
    let output = dir.path().join("streets.geojson");
    run(&FixedSource(harbor_data()), &HARBOR_BOUNDS, &output).unwrap();
    let features = read_features(&output);

    // Nodes 2 and 3 are pass-through, so the avenue collapses to 1 <-> 4 and each
    // direction keeps the name of the way it starts on.
    let mut names: Vec<String> = features
        .iter()
        .map(|f| f["properties"]["name"].as_str().unwrap().to_string())
        .collect();
    names.sort();
    assert_eq!(
        vec![
            "Albany Street",
            "Albany Street",
            "West Side Highway",
            "West Side Highway",
            "West Side Highway",
            "West Street",
        ],
        names
    );

    let merged: Vec<&Value> = features
        .iter()
        .filter(|f| f["geometry"]["coordinates"].as_array().unwrap().len() == 4)
        .collect();
    assert_eq!(2, merged.len());
    for feature in merged {
        assert_eq!(json!("3"), feature["properties"]["lanes"]);
        assert_eq!(json!("35 mph"), feature["properties"]["maxspeed"]);
        assert_eq!(json!("primary"), feature["properties"]["highway"]);
    }
}

#[test]
fn test_runs_are_repeatable() {
    let dir = tempfile::tempdir().unwrap();
    let first = dir.path().join("first.geojson");
    let second = dir.path().join("second.geojson");
    let source = FixedSource(harbor_data());

    run(&source, &HARBOR_BOUNDS, &first).unwrap();
    run(&source, &HARBOR_BOUNDS, &second).unwrap();

    let first = read_features(&first);
    let second = read_features(&second);
    assert_eq!(first.len(), second.len());
    assert_eq!(property_keys(&first), property_keys(&second));

    let geometries = |features: &[Value]| -> BTreeSet<String> {
        features.iter().map(|f| f["geometry"].to_string()).collect()
    };
    assert_eq!(geometries(&first), geometries(&second));
}

#[test]
fn test_three_edge_highway_scenario() {
    let mut graph = StreetGraph::new();
    for id in 1..=6 {
        graph.add_node(id, 40.70 + id as f64 * 0.01, -74.0);
    }
    let attributes = |highway: Option<Value>| -> Attributes {
        let mut attributes = Attributes::new();
        attributes.insert("length".to_string(), json!(100.0));
        if let Some(highway) = highway {
            attributes.insert("highway".to_string(), highway);
        }
        attributes
    };
    graph.add_edge(1, 2, None, attributes(Some(json!(["residential", "tertiary"]))));
    graph.add_edge(3, 4, None, attributes(Some(json!("primary"))));
    graph.add_edge(5, 6, None, attributes(None));

    let streets = prepare_streets(&graph).unwrap();
    assert_eq!(3, streets.feature_count());

    let dir = tempfile::tempdir().unwrap();
    let output = dir.path().join("scenario.geojson");
    writer::write_geojson(&output, &streets).unwrap();

    let features = read_features(&output);
    assert_eq!(json!("residential"), features[0]["properties"]["highway"]);
    assert_eq!(json!("primary"), features[1]["properties"]["highway"]);
    assert!(features[2]["properties"].get("highway").is_none());

    let expected: BTreeSet<String> = ["highway", "length"].iter().map(|s| s.to_string()).collect();
    assert_eq!(expected, property_keys(&features));
}

#[test]
fn test_failed_fetch_leaves_previous_output() {
    let dir = tempfile::tempdir().unwrap();
    let output = dir.path().join("harbor-streets.geojson");
    fs::write(&output, "{\"type\":\"FeatureCollection\",\"features\":[]}").unwrap();

    let result = run(&FailingSource, &HARBOR_BOUNDS, &output);

    assert!(matches!(result, Err(Error::Overpass { status: 504, .. })));
    assert_eq!(
        "{\"type\":\"FeatureCollection\",\"features\":[]}",
        fs::read_to_string(&output).unwrap()
    );
}

#[test]
fn test_failed_fetch_writes_nothing() {
    let dir = tempfile::tempdir().unwrap();
    let output = dir.path().join("public/assets/data/harbor-streets.geojson");

    assert!(run(&FailingSource, &HARBOR_BOUNDS, &output).is_err());
    assert!(!output.exists());
}

#[test]
fn test_empty_response_is_an_error() {
    let dir = tempfile::tempdir().unwrap();
    let output = dir.path().join("harbor-streets.geojson");

    let result = run(&FixedSource(OsmData::default()), &HARBOR_BOUNDS, &output);

    assert!(matches!(result, Err(Error::EmptyGraph(_))));
    assert!(!output.exists());
}

#[test]
fn test_explicit_geometry_survives_export() {
    let mut graph = StreetGraph::new();
    graph.add_node(1, 40.70, -74.00);
    graph.add_node(2, 40.71, -74.02);
    let bend = LineString::from(vec![(-74.00, 40.70), (-74.03, 40.705), (-74.02, 40.71)]);
    graph.add_edge(1, 2, Some(bend), Attributes::new());

    let streets = prepare_streets(&graph).unwrap();
    assert_eq!(3, streets.rows[0].geometry.0.len());
    assert!(streets.property_columns().next().is_none());
}

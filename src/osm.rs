use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::{BTreeMap, HashMap};

/// Edge attribute map. Values are plain JSON so merged edges can hold lists.
pub type Attributes = BTreeMap<String, Value>;

/// Way tags copied onto graph edges when present.
const USEFUL_WAY_TAGS: [&str; 14] = [
    "access", "area", "bridge", "est_width", "highway", "junction", "landuse", "lanes", "maxspeed",
    "name", "ref", "service", "tunnel", "width",
];

/// `(tag, patterns)` pairs a drivable way must NOT match. A pattern matches when
/// it occurs anywhere in the value, the same as Overpass' `!~` regex filter.
const DRIVE_EXCLUSIONS: [(&str, &[&str]); 6] = [
    ("area", &["yes"]),
    ("access", &["private"]),
    (
        "highway",
        &[
            "abandoned", "bridleway", "bus_guideway", "construction", "corridor", "cycleway",
            "elevator", "escalator", "footway", "no", "path", "pedestrian", "planned", "platform",
            "proposed", "raceway", "razed", "service", "steps", "track",
        ],
    ),
    ("motor_vehicle", &["no"]),
    ("motorcar", &["no"]),
    (
        "service",
        &["alley", "driveway", "emergency_access", "parking", "parking_aisle", "private"],
    ),
];

const ONEWAY_VALUES: [&str; 7] = ["yes", "true", "1", "-1", "reverse", "T", "F"];
const REVERSED_VALUES: [&str; 3] = ["-1", "reverse", "T"];

pub trait HasTags {
    fn tags(&self) -> &HashMap<String, String>;

    fn tag(&self, key: &str) -> Option<&str> {
        self.tags().get(key).map(String::as_str)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OsmWay {
    pub way_id: i64,

    pub node_ids: Vec<i64>, // Ordered node ids as digitised in OSM.

    pub tags: HashMap<String, String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OsmNode {
    pub lat: f64,
    pub lon: f64,
    pub tags: HashMap<String, String>,
}

/// Raw elements as returned by a street source, before any graph is built.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct OsmData {
    pub nodes: HashMap<i64, OsmNode>,
    pub ways: Vec<OsmWay>,
}

fn collect_tags<'a>(tags: impl Iterator<Item = (&'a str, &'a str)>) -> HashMap<String, String> {
    tags.fold(HashMap::new(), |mut acc, (k, v)| {
        acc.insert(k.to_string(), v.to_string());
        acc
    })
}

impl OsmNode {
    pub fn new<'a>(lat: f64, lon: f64, tags: impl Iterator<Item = (&'a str, &'a str)>) -> OsmNode {
        OsmNode {
            lat,
            lon,
            tags: collect_tags(tags),
        }
    }
}

impl OsmWay {
    pub fn from_osm_way(way: &osmpbf::Way) -> OsmWay {
        // Our refs are *deltas* - this means if we actually want the node ids, we need to iterate
        // over and add the delta to the previous number and that is our node id.
        let node_ids = way
            .raw_refs()
            .iter()
            .scan(0_i64, |acc, n| {
                *acc += n;
                Some(*acc)
            })
            .collect();

        OsmWay {
            way_id: way.id(),
            node_ids,
            tags: collect_tags(way.tags()),
        }
    }

    /// Whether the way belongs to the public drivable street network.
    pub fn is_drivable(&self) -> bool {
        self.tag("highway").is_some()
            && DRIVE_EXCLUSIONS.iter().all(|(key, patterns)| {
                self.tag(key)
                    .map_or(true, |value| !patterns.iter().any(|p| value.contains(p)))
            })
    }

    pub fn is_oneway(&self) -> bool {
        match self.tag("oneway") {
            Some(value) if ONEWAY_VALUES.contains(&value) => true,
            _ => self.tag("junction") == Some("roundabout"),
        }
    }

    /// One-way against the digitised direction.
    pub fn is_reversed(&self) -> bool {
        self.tag("oneway")
            .map_or(false, |value| REVERSED_VALUES.contains(&value))
    }

    /// Attributes shared by every edge cut from this way. `length` and
    /// `reversed` are per-edge and added by the graph.
    pub fn edge_attributes(&self) -> Attributes {
        let mut attributes = Attributes::new();
        attributes.insert("osmid".to_string(), Value::from(self.way_id));
        attributes.insert("oneway".to_string(), Value::from(self.is_oneway()));
        for key in USEFUL_WAY_TAGS {
            if let Some(value) = self.tag(key) {
                attributes.insert(key.to_string(), Value::from(value));
            }
        }
        attributes
    }
}

impl HasTags for OsmWay {
    fn tags(&self) -> &HashMap<String, String> {
        &self.tags
    }
}

/// Overpass QL filter selecting the same ways as [`OsmWay::is_drivable`].
pub fn overpass_drive_filter() -> String {
    DRIVE_EXCLUSIONS
        .iter()
        .fold(String::from(r#"["highway"]"#), |mut acc, (key, patterns)| {
            acc.push_str(&format!(r#"["{}"!~"{}"]"#, key, patterns.join("|")));
            acc
        })
}

#[cfg(test)]
pub(crate) fn test_way(way_id: i64, node_ids: &[i64], tags: &[(&str, &str)]) -> OsmWay {
    OsmWay {
        way_id,
        node_ids: node_ids.to_vec(),
        tags: collect_tags(tags.iter().copied()),
    }
}

#[test]
fn test_drive_filter() {
    assert!(test_way(1, &[1, 2], &[("highway", "residential")]).is_drivable());
    assert!(test_way(1, &[1, 2], &[("highway", "motorway_link")]).is_drivable());
    assert!(!test_way(1, &[1, 2], &[("name", "Broadway")]).is_drivable());
    assert!(!test_way(1, &[1, 2], &[("highway", "footway")]).is_drivable());
    assert!(!test_way(1, &[1, 2], &[("highway", "service")]).is_drivable());
    assert!(!test_way(1, &[1, 2], &[("highway", "primary"), ("access", "private")]).is_drivable());
    assert!(!test_way(1, &[1, 2], &[("highway", "tertiary"), ("motorcar", "no")]).is_drivable());
    assert!(!test_way(1, &[1, 2], &[("highway", "pedestrian"), ("area", "yes")]).is_drivable());
}

#[test]
fn test_oneway_detection() {
    let two_way = test_way(1, &[1, 2], &[("highway", "residential")]);
    assert!(!two_way.is_oneway());
    assert!(!two_way.is_reversed());

    let oneway = test_way(1, &[1, 2], &[("highway", "residential"), ("oneway", "yes")]);
    assert!(oneway.is_oneway());
    assert!(!oneway.is_reversed());

    let reversed = test_way(1, &[1, 2], &[("highway", "residential"), ("oneway", "-1")]);
    assert!(reversed.is_oneway());
    assert!(reversed.is_reversed());

    let roundabout = test_way(1, &[1, 2], &[("highway", "primary"), ("junction", "roundabout")]);
    assert!(roundabout.is_oneway());

    let explicit_no = test_way(1, &[1, 2], &[("highway", "primary"), ("oneway", "no")]);
    assert!(!explicit_no.is_oneway());
}

#[test]
fn test_edge_attributes_keep_useful_tags_only() {
    let way = test_way(
        42,
        &[1, 2],
        &[
            ("highway", "secondary"),
            ("name", "Atlantic Avenue"),
            ("lanes", "2"),
            ("surface", "asphalt"),
        ],
    );
    let attributes = way.edge_attributes();

    assert_eq!(attributes["osmid"], Value::from(42));
    assert_eq!(attributes["oneway"], Value::from(false));
    assert_eq!(attributes["highway"], Value::from("secondary"));
    assert_eq!(attributes["lanes"], Value::from("2"));
    assert!(!attributes.contains_key("surface"));
}

#[test]
fn test_overpass_drive_filter() {
    let filter = overpass_drive_filter();
    assert!(filter.starts_with(r#"["highway"]["area"!~"yes"]["access"!~"private"]"#));
    assert!(filter.contains(r#"["motorcar"!~"no"]"#));
    assert!(filter.ends_with(
        r#"["service"!~"alley|driveway|emergency_access|parking|parking_aisle|private"]"#
    ));
}

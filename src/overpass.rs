use crate::config::{BoundingBox, QUERY_TIMEOUT_SECS};
use crate::error::{Error, Result};
use crate::osm::{overpass_drive_filter, OsmData, OsmNode, OsmWay};
use crate::StreetSource;
use reqwest::blocking::Client;
use serde::Deserialize;
use std::collections::HashMap;
use std::time::Duration;

#[derive(Debug, Deserialize)]
pub struct OverpassResponse {
    #[serde(default)]
    pub elements: Vec<OverpassElement>,
    /// Set by the server on runtime errors such as a query timeout.
    #[serde(default)]
    pub remark: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum OverpassElement {
    Node {
        id: i64,
        lat: f64,
        lon: f64,
        #[serde(default)]
        tags: HashMap<String, String>,
    },
    Way {
        id: i64,
        nodes: Vec<i64>,
        #[serde(default)]
        tags: HashMap<String, String>,
    },
    #[serde(other)]
    Other,
}

impl OverpassResponse {
    pub fn into_osm_data(self) -> OsmData {
        self.elements
            .into_iter()
            .fold(OsmData::default(), |mut data, element| {
                match element {
                    OverpassElement::Node { id, lat, lon, tags } => {
                        data.nodes.insert(id, OsmNode { lat, lon, tags });
                    }
                    OverpassElement::Way { id, nodes, tags } => data.ways.push(OsmWay {
                        way_id: id,
                        node_ids: nodes,
                        tags,
                    }),
                    OverpassElement::Other => {}
                }
                data
            })
    }
}

/// Drivable ways inside `bbox` plus all of their nodes.
pub fn build_query(bbox: &BoundingBox) -> String {
    format!(
        "[out:json][timeout:{}];(way{}({});>;);out;",
        QUERY_TIMEOUT_SECS,
        overpass_drive_filter(),
        bbox.to_overpass()
    )
}

pub fn parse_response(body: &str) -> Result<OsmData> {
    let response: OverpassResponse = serde_json::from_str(body)?;
    if let Some(remark) = &response.remark {
        log::warn!("Overpass remark: {remark}");
    }
    Ok(response.into_osm_data())
}

pub struct OverpassClient {
    client: Client,
    endpoint: String,
}

impl OverpassClient {
    pub fn new(endpoint: &str) -> Result<OverpassClient> {
        let client = Client::builder()
            .user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")))
            .timeout(Duration::from_secs(QUERY_TIMEOUT_SECS))
            .build()?;
        Ok(OverpassClient {
            client,
            endpoint: endpoint.to_string(),
        })
    }
}

impl StreetSource for OverpassClient {
    fn fetch(&self, bbox: &BoundingBox) -> Result<OsmData> {
        let query = build_query(bbox);
        log::info!("Querying {}", self.endpoint);
        log::debug!("{query}");

        let response = self
            .client
            .post(&self.endpoint)
            .form(&[("data", &query)])
            .send()?;

        let status = response.status();
        if !status.is_success() {
            return Err(Error::Overpass {
                status: status.as_u16(),
                body: response.text().unwrap_or_default(),
            });
        }

        let data = parse_response(&response.text()?)?;
        log::info!(
            "Received {} ways and {} nodes",
            data.ways.len(),
            data.nodes.len()
        );
        Ok(data)
    }
}

#[test]
fn test_build_query() {
    let query = build_query(&crate::config::HARBOR_BOUNDS);
    assert!(query.starts_with("[out:json][timeout:180];(way[\"highway\"]"));
    assert!(query.ends_with("(40.48,-74.26,40.92,-73.75);>;);out;"));
}

#[test]
fn test_parse_response() {
    let body = r#"{
        "version": 0.6,
        "generator": "Overpass API",
        "elements": [
            {"type": "node", "id": 1, "lat": 40.70, "lon": -74.01},
            {"type": "node", "id": 2, "lat": 40.71, "lon": -74.00, "tags": {"highway": "traffic_signals"}},
            {"type": "way", "id": 100, "nodes": [1, 2], "tags": {"highway": "primary", "name": "West Street"}},
            {"type": "relation", "id": 5, "members": []}
        ]
    }"#;
    let data = parse_response(body).unwrap();

    assert_eq!(2, data.nodes.len());
    assert_eq!(Some("traffic_signals"), data.nodes[&2].tags.get("highway").map(String::as_str));
    assert_eq!(1, data.ways.len());
    assert_eq!(vec![1, 2], data.ways[0].node_ids);
    assert_eq!(Some("West Street"), data.ways[0].tags.get("name").map(String::as_str));
}

#[test]
fn test_parse_response_rejects_malformed_body() {
    assert!(matches!(
        parse_response("<html>Too Many Requests</html>"),
        Err(Error::Json(_))
    ));
}

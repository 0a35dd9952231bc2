use crate::error::Result;
use crate::graph::{NodeId, StreetGraph};
use crate::osm::Attributes;
use geo::LineString;
use serde_json::Value;
use std::collections::HashMap;

#[derive(Debug, Clone, PartialEq)]
pub struct NodeRow {
    pub osmid: NodeId,
    pub x: f64,
    pub y: f64,
}

/// One graph edge, indexed by `(u, v, key)`.
#[derive(Debug, Clone, PartialEq)]
pub struct EdgeRow {
    pub u: NodeId,
    pub v: NodeId,
    pub key: usize,
    pub geometry: LineString<f64>,
    pub attributes: Attributes,
}

#[derive(Debug, Clone, Default)]
pub struct EdgeTable {
    /// Attribute columns in first-seen order, followed by `geometry`.
    pub columns: Vec<String>,
    pub rows: Vec<EdgeRow>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct StreetRow {
    pub geometry: LineString<f64>,
    pub properties: Attributes,
}

/// Street segments with a plain sequential index.
#[derive(Debug, Clone, Default)]
pub struct StreetTable {
    pub columns: Vec<String>,
    pub rows: Vec<StreetRow>,
}

pub fn graph_to_tables(graph: &StreetGraph) -> Result<(Vec<NodeRow>, EdgeTable)> {
    let nodes = graph
        .nodes()
        .map(|(osmid, node)| NodeRow {
            osmid,
            x: node.lon,
            y: node.lat,
        })
        .collect();

    let mut columns: Vec<String> = Vec::new();
    let mut rows = Vec::with_capacity(graph.edge_count());
    for edge in graph.edges() {
        for key in edge.attributes.keys() {
            if !columns.contains(key) {
                columns.push(key.clone());
            }
        }
        rows.push(EdgeRow {
            u: edge.u,
            v: edge.v,
            key: edge.key,
            geometry: graph.edge_geometry(edge)?,
            attributes: edge.attributes.clone(),
        });
    }
    columns.push("geometry".to_string());

    Ok((nodes, EdgeTable { columns, rows }))
}

impl EdgeTable {
    /// Keep the `preferred` columns that exist on this table, in `preferred`
    /// order, and drop the multi-edge index.
    pub fn select(self, preferred: &[&str]) -> StreetTable {
        let columns: Vec<String> = preferred
            .iter()
            .filter(|c| self.columns.iter().any(|have| have == *c))
            .map(|c| c.to_string())
            .collect();

        let rows = self
            .rows
            .into_iter()
            .map(|row| StreetRow {
                geometry: row.geometry,
                properties: row
                    .attributes
                    .into_iter()
                    .filter(|(key, _)| columns.contains(key))
                    .collect(),
            })
            .collect();

        StreetTable { columns, rows }
    }
}

impl StreetTable {
    pub fn feature_count(&self) -> usize {
        self.rows.len()
    }

    pub fn has_column(&self, column: &str) -> bool {
        self.columns.iter().any(|c| c == column)
    }

    /// Every column except `geometry`.
    pub fn property_columns(&self) -> impl Iterator<Item = &str> {
        self.columns
            .iter()
            .map(String::as_str)
            .filter(|c| *c != "geometry")
    }

    /// Distinct values of `column` by descending count, ties by value. Nulls
    /// and missing cells are not counted. `None` if the column is absent.
    pub fn value_counts(&self, column: &str) -> Option<Vec<(String, usize)>> {
        if !self.has_column(column) {
            return None;
        }

        let mut counts: HashMap<String, usize> = HashMap::new();
        for value in self.rows.iter().filter_map(|row| row.properties.get(column)) {
            let label = match value {
                Value::Null => continue,
                Value::String(s) => s.clone(),
                other => other.to_string(),
            };
            *counts.entry(label).or_insert(0) += 1;
        }

        let mut counts: Vec<(String, usize)> = counts.into_iter().collect();
        counts.sort_by(|(a, count_a), (b, count_b)| count_b.cmp(count_a).then_with(|| a.cmp(b)));
        Some(counts)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn attributes(pairs: &[(&str, Value)]) -> Attributes {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect()
    }

    fn graph() -> StreetGraph {
        let mut graph = StreetGraph::new();
        graph.add_node(1, 40.70, -74.00);
        graph.add_node(2, 40.71, -74.01);
        graph.add_node(3, 40.72, -74.02);
        graph.add_edge(
            1,
            2,
            None,
            attributes(&[
                ("highway", json!("primary")),
                ("osmid", json!(7)),
                ("length", json!(12.5)),
            ]),
        );
        graph.add_edge(
            2,
            3,
            Some(LineString::from(vec![(-74.01, 40.71), (-74.015, 40.715), (-74.02, 40.72)])),
            attributes(&[("name", json!("Water Street")), ("osmid", json!([8, 9]))]),
        );
        graph
    }

    #[test]
    fn test_graph_to_tables() {
        let (nodes, edges) = graph_to_tables(&graph()).unwrap();

        assert_eq!(3, nodes.len());
        assert_eq!(NodeRow { osmid: 1, x: -74.00, y: 40.70 }, nodes[0]);

        assert_eq!(vec!["highway", "length", "osmid", "name", "geometry"], edges.columns);
        assert_eq!(2, edges.rows.len());
        assert_eq!(2, edges.rows[0].geometry.0.len());
        assert_eq!(3, edges.rows[1].geometry.0.len());
    }

    #[test]
    fn test_select_intersects_preferred_columns() {
        let (_, edges) = graph_to_tables(&graph()).unwrap();
        let streets = edges.select(&crate::config::PREFERRED_COLUMNS);

        // `osmid` is not preferred; `lanes`, `maxspeed` and `oneway` are not present.
        assert_eq!(vec!["geometry", "name", "highway", "length"], streets.columns);
        assert_eq!(vec!["name", "highway", "length"], streets.property_columns().collect::<Vec<_>>());
        assert_eq!(2, streets.feature_count());
        assert!(!streets.rows[0].properties.contains_key("osmid"));
        assert!(!streets.rows[0].properties.contains_key("name"));
        assert_eq!(streets.rows[1].properties["name"], json!("Water Street"));
    }

    #[test]
    fn test_value_counts() {
        let row = |highway: Option<Value>| StreetRow {
            geometry: LineString::from(vec![(0.0, 0.0), (1.0, 1.0)]),
            properties: highway
                .map(|h| attributes(&[("highway", h)]))
                .unwrap_or_default(),
        };
        let table = StreetTable {
            columns: vec!["geometry".to_string(), "highway".to_string()],
            rows: vec![
                row(Some(json!("residential"))),
                row(Some(json!("primary"))),
                row(Some(json!("residential"))),
                row(Some(json!("motorway"))),
                row(Some(Value::Null)),
                row(None),
            ],
        };

        assert_eq!(
            Some(vec![
                ("residential".to_string(), 2),
                ("motorway".to_string(), 1),
                ("primary".to_string(), 1),
            ]),
            table.value_counts("highway")
        );
        assert_eq!(None, table.value_counts("lanes"));
    }
}

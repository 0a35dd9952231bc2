use crate::config::BoundingBox;
use crate::error::{Error, Result};
use crate::osm::{Attributes, OsmData, OsmWay};
use geo::{Coord, Distance, Haversine, LineString, Point};
use serde_json::Value;
use std::collections::{BTreeMap, HashMap, HashSet, VecDeque};

pub type NodeId = i64;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GraphNode {
    pub lat: f64,
    pub lon: f64,
}

impl GraphNode {
    pub fn coord(&self) -> Coord<f64> {
        Coord {
            x: self.lon,
            y: self.lat,
        }
    }
}

/// A directed street segment. `key` distinguishes parallel edges between the
/// same pair of nodes.
#[derive(Debug, Clone, PartialEq)]
pub struct StreetEdge {
    pub u: NodeId,
    pub v: NodeId,
    pub key: usize,
    /// Only set on merged edges; a raw edge is the straight line between its nodes.
    pub geometry: Option<LineString<f64>>,
    pub attributes: Attributes,
}

/// Directed multigraph of the drivable street network.
#[derive(Debug, Clone, Default)]
pub struct StreetGraph {
    nodes: BTreeMap<NodeId, GraphNode>,
    edges: Vec<StreetEdge>,
    /// Number of parallel edges per `(u, v)`, i.e. the next free key.
    edge_keys: HashMap<(NodeId, NodeId), usize>,
}

impl StreetGraph {
    pub fn new() -> StreetGraph {
        StreetGraph::default()
    }

    /// Build the unsimplified graph from raw OSM elements, truncated to `bbox`.
    pub fn from_osm(data: &OsmData, bbox: &BoundingBox) -> StreetGraph {
        let mut graph = StreetGraph::new();
        for (id, node) in data.nodes.iter() {
            if bbox.contains(node.lat, node.lon) {
                graph.add_node(*id, node.lat, node.lon);
            }
        }

        for way in data.ways.iter().filter(|w| w.is_drivable()) {
            graph.add_way(way);
        }

        // Nodes that never made it onto an edge (untagged vertices, other ways' nodes).
        let used: HashSet<NodeId> = graph.edges.iter().flat_map(|e| [e.u, e.v]).collect();
        graph.nodes.retain(|id, _| used.contains(id));

        log::debug!(
            "Built raw graph: {} nodes, {} edges",
            graph.node_count(),
            graph.edge_count()
        );
        graph
    }

    fn add_way(&mut self, way: &OsmWay) {
        let attributes = way.edge_attributes();
        let oneway = way.is_oneway();

        let mut node_ids = way.node_ids.clone();
        if way.is_reversed() {
            node_ids.reverse();
        }

        for pair in node_ids.windows(2) {
            let (a, b) = (pair[0], pair[1]);
            if a == b {
                continue;
            }
            let Some(length) = self.segment_length(a, b) else {
                continue;
            };

            let mut forward = attributes.clone();
            forward.insert("length".to_string(), Value::from(length));
            forward.insert("reversed".to_string(), Value::from(false));
            self.add_edge(a, b, None, forward);

            if !oneway {
                let mut backward = attributes.clone();
                backward.insert("length".to_string(), Value::from(length));
                backward.insert("reversed".to_string(), Value::from(true));
                self.add_edge(b, a, None, backward);
            }
        }
    }

    /// Great-circle distance in metres, if both nodes are in the graph.
    fn segment_length(&self, a: NodeId, b: NodeId) -> Option<f64> {
        let pt_a = self.nodes.get(&a)?.coord();
        let pt_b = self.nodes.get(&b)?.coord();
        Some(Haversine::distance(Point::from(pt_a), Point::from(pt_b)))
    }

    /// Adds (or replaces) a node
    pub fn add_node(&mut self, id: NodeId, lat: f64, lon: f64) -> Option<GraphNode> {
        self.nodes.insert(id, GraphNode { lat, lon })
    }

    /// Adds an edge, provided both endpoints exist.
    pub fn add_edge(
        &mut self,
        u: NodeId,
        v: NodeId,
        geometry: Option<LineString<f64>>,
        attributes: Attributes,
    ) -> bool {
        if !self.nodes.contains_key(&u) || !self.nodes.contains_key(&v) {
            return false;
        }
        let next_key = self.edge_keys.entry((u, v)).or_insert(0);
        let key = *next_key;
        *next_key += 1;
        self.edges.push(StreetEdge {
            u,
            v,
            key,
            geometry,
            attributes,
        });
        true
    }

    pub fn node(&self, id: NodeId) -> Option<&GraphNode> {
        self.nodes.get(&id)
    }

    pub fn nodes(&self) -> impl Iterator<Item = (NodeId, &GraphNode)> {
        self.nodes.iter().map(|(id, node)| (*id, node))
    }

    pub fn edges(&self) -> &[StreetEdge] {
        &self.edges
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    /// The edge's own geometry, or the straight line between its nodes.
    pub fn edge_geometry(&self, edge: &StreetEdge) -> Result<LineString<f64>> {
        if let Some(geometry) = &edge.geometry {
            return Ok(geometry.clone());
        }
        let u = self.nodes.get(&edge.u).ok_or(Error::MissingNode(edge.u))?;
        let v = self.nodes.get(&edge.v).ok_or(Error::MissingNode(edge.v))?;
        Ok(LineString::new(vec![u.coord(), v.coord()]))
    }

    /// Drop everything outside the largest weakly connected component.
    /// Returns the number of nodes removed.
    pub fn retain_largest_component(&mut self) -> usize {
        let mut neighbours: HashMap<NodeId, Vec<NodeId>> = HashMap::new();
        for edge in self.edges.iter() {
            neighbours.entry(edge.u).or_default().push(edge.v);
            neighbours.entry(edge.v).or_default().push(edge.u);
        }

        let mut seen = HashSet::new();
        let mut largest: HashSet<NodeId> = HashSet::new();
        for &start in self.nodes.keys() {
            if !seen.insert(start) {
                continue;
            }
            let mut component = HashSet::from([start]);
            let mut queue = VecDeque::from([start]);
            while let Some(n) = queue.pop_front() {
                for &next in neighbours.get(&n).into_iter().flatten() {
                    if seen.insert(next) {
                        component.insert(next);
                        queue.push_back(next);
                    }
                }
            }
            if component.len() > largest.len() {
                largest = component;
            }
        }

        let before = self.nodes.len();
        self.nodes.retain(|id, _| largest.contains(id));
        self.edges
            .retain(|e| largest.contains(&e.u) && largest.contains(&e.v));
        self.reindex_keys();
        before - self.nodes.len()
    }

    /// Collapse chains of pass-through nodes into single edges.
    /// Returns the number of nodes removed.
    pub fn simplify(&mut self) -> Result<usize> {
        let adjacency = Adjacency::new(&self.edges);
        let endpoints: HashSet<NodeId> = self
            .nodes
            .keys()
            .copied()
            .filter(|n| adjacency.is_endpoint(*n))
            .collect();

        let mut paths = Vec::new();
        for endpoint in self.nodes.keys().filter(|n| endpoints.contains(*n)) {
            for &successor in adjacency.successors(*endpoint) {
                if !endpoints.contains(&successor) {
                    paths.push(adjacency.build_path(*endpoint, successor, &endpoints)?);
                }
            }
        }

        let mut first_edge: HashMap<(NodeId, NodeId), usize> = HashMap::new();
        for (index, edge) in self.edges.iter().enumerate() {
            first_edge.entry((edge.u, edge.v)).or_insert(index);
        }

        let mut interstitial = HashSet::new();
        let mut merged = Vec::with_capacity(paths.len());
        for path in paths.iter() {
            let mut values: BTreeMap<String, Vec<Value>> = BTreeMap::new();
            for pair in path.windows(2) {
                let index = first_edge
                    .get(&(pair[0], pair[1]))
                    .ok_or(Error::Simplification(pair[0]))?;
                for (key, value) in self.edges[*index].attributes.iter() {
                    values.entry(key.clone()).or_default().push(value.clone());
                }
            }

            let attributes = values
                .into_iter()
                .map(|(key, values)| {
                    let value = if key == "length" {
                        Value::from(values.iter().filter_map(Value::as_f64).sum::<f64>())
                    } else {
                        merge_values(values)
                    };
                    (key, value)
                })
                .collect();

            let coords = path
                .iter()
                .map(|n| self.nodes.get(n).map(GraphNode::coord).ok_or(Error::MissingNode(*n)))
                .collect::<Result<Vec<_>>>()?;

            interstitial.extend(path[1..path.len() - 1].iter().copied());
            merged.push(StreetEdge {
                u: path[0],
                v: path[path.len() - 1],
                key: 0,
                geometry: Some(LineString::new(coords)),
                attributes,
            });
        }

        let before = self.nodes.len();
        self.nodes.retain(|id, _| !interstitial.contains(id));
        self.edges
            .retain(|e| !interstitial.contains(&e.u) && !interstitial.contains(&e.v));
        self.edges.extend(merged);
        self.reindex_keys();

        let removed = before - self.nodes.len();
        log::info!(
            "Simplified graph: {} paths merged, {} nodes removed",
            paths.len(),
            removed
        );
        Ok(removed)
    }

    fn reindex_keys(&mut self) {
        self.edge_keys.clear();
        for edge in self.edges.iter_mut() {
            let count = self.edge_keys.entry((edge.u, edge.v)).or_insert(0);
            edge.key = *count;
            *count += 1;
        }
    }
}

/// A single value when every edge along a path agrees, otherwise the distinct
/// values in first-seen order.
fn merge_values(values: Vec<Value>) -> Value {
    let mut distinct: Vec<Value> = Vec::with_capacity(values.len());
    for value in values {
        if !distinct.contains(&value) {
            distinct.push(value);
        }
    }
    if distinct.len() == 1 {
        distinct.remove(0)
    } else {
        Value::Array(distinct)
    }
}

struct Adjacency {
    successors: HashMap<NodeId, Vec<NodeId>>,
    predecessors: HashMap<NodeId, Vec<NodeId>>,
    in_degree: HashMap<NodeId, usize>,
    out_degree: HashMap<NodeId, usize>,
}

impl Adjacency {
    fn new(edges: &[StreetEdge]) -> Adjacency {
        let mut adjacency = Adjacency {
            successors: HashMap::new(),
            predecessors: HashMap::new(),
            in_degree: HashMap::new(),
            out_degree: HashMap::new(),
        };
        for edge in edges {
            let succ = adjacency.successors.entry(edge.u).or_default();
            if !succ.contains(&edge.v) {
                succ.push(edge.v);
            }
            let pred = adjacency.predecessors.entry(edge.v).or_default();
            if !pred.contains(&edge.u) {
                pred.push(edge.u);
            }
            *adjacency.out_degree.entry(edge.u).or_insert(0) += 1;
            *adjacency.in_degree.entry(edge.v).or_insert(0) += 1;
        }
        adjacency
    }

    fn successors(&self, n: NodeId) -> &[NodeId] {
        self.successors.get(&n).map_or(&[], Vec::as_slice)
    }

    fn predecessors(&self, n: NodeId) -> &[NodeId] {
        self.predecessors.get(&n).map_or(&[], Vec::as_slice)
    }

    /// A node is an endpoint if it has a self-loop, is a source or sink, or is
    /// anything other than a plain pass-through between two neighbours.
    fn is_endpoint(&self, n: NodeId) -> bool {
        let neighbours: HashSet<NodeId> = self
            .successors(n)
            .iter()
            .chain(self.predecessors(n))
            .copied()
            .collect();
        if neighbours.contains(&n) {
            return true;
        }

        let in_degree = self.in_degree.get(&n).copied().unwrap_or(0);
        let out_degree = self.out_degree.get(&n).copied().unwrap_or(0);
        if in_degree == 0 || out_degree == 0 {
            return true;
        }

        let degree = in_degree + out_degree;
        !(neighbours.len() == 2 && (degree == 2 || degree == 4))
    }

    /// Walk from `endpoint` through `first` until the next endpoint.
    fn build_path(
        &self,
        endpoint: NodeId,
        first: NodeId,
        endpoints: &HashSet<NodeId>,
    ) -> Result<Vec<NodeId>> {
        let mut path = vec![endpoint, first];
        for &next in self.successors(first) {
            if path.contains(&next) {
                continue;
            }
            let mut successor = next;
            path.push(successor);
            while !endpoints.contains(&successor) {
                let candidates: Vec<NodeId> = self
                    .successors(successor)
                    .iter()
                    .copied()
                    .filter(|n| !path.contains(n))
                    .collect();
                match candidates.as_slice() {
                    [only] => {
                        successor = *only;
                        path.push(successor);
                    }
                    [] => {
                        // Self-looping path: close it back onto the endpoint.
                        if self.successors(successor).contains(&endpoint) {
                            path.push(endpoint);
                        }
                        return Ok(path);
                    }
                    _ => return Err(Error::Simplification(successor)),
                }
            }
            return Ok(path);
        }
        Ok(path)
    }
}

use crate::config::BoundingBox;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),
    #[error("Overpass returned status {status}: {body}")]
    Overpass { status: u16, body: String },
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Invalid JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("PBF error: {0}")]
    Pbf(#[from] osmpbf::Error),
    #[error("Found no graph edges within {0}")]
    EmptyGraph(BoundingBox),
    #[error("Edge references missing node {0}")]
    MissingNode(i64),
    #[error("Unexpected simplify pattern at node {0}: more than one unvisited successor")]
    Simplification(i64),
}

pub type Result<T> = std::result::Result<T, Error>;

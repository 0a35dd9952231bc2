use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};

/// NY Harbor, matching the bounds the harbor-watch scene uses for AIS traffic.
pub const HARBOR_BOUNDS: BoundingBox = BoundingBox {
    south: 40.48,
    north: 40.92,
    west: -74.26,
    east: -73.75,
};

/// Output location, relative to the repository root.
pub const OUTPUT_FILE: &str = "public/assets/data/harbor-streets.geojson";

pub const OVERPASS_URL: &str = "https://overpass-api.de/api/interpreter";

/// Used both as the Overpass server-side timeout and the HTTP client timeout.
pub const QUERY_TIMEOUT_SECS: u64 = 180;

/// Edge columns worth shipping to the scene. Anything else is dropped.
pub const PREFERRED_COLUMNS: [&str; 7] = [
    "geometry", "name", "highway", "lanes", "maxspeed", "oneway", "length",
];

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub south: f64,
    pub north: f64,
    pub west: f64,
    pub east: f64,
}

impl BoundingBox {
    /// Inclusive on all four edges.
    pub fn contains(&self, lat: f64, lon: f64) -> bool {
        (self.south..=self.north).contains(&lat) && (self.west..=self.east).contains(&lon)
    }

    /// Overpass expects `south,west,north,east`.
    pub fn to_overpass(&self) -> String {
        format!("{},{},{},{}", self.south, self.west, self.north, self.east)
    }
}

impl fmt::Display for BoundingBox {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "N={}, S={}, E={}, W={}",
            self.north, self.south, self.east, self.west
        )
    }
}

/// Absolute location of the GeoJSON output under the crate root.
pub fn output_path() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join(OUTPUT_FILE)
}

#[test]
fn test_bounding_box_contains() {
    assert!(HARBOR_BOUNDS.contains(40.70, -74.01));
    assert!(HARBOR_BOUNDS.contains(40.48, -73.75));
    assert!(!HARBOR_BOUNDS.contains(40.95, -74.01));
    assert!(!HARBOR_BOUNDS.contains(40.70, -73.70));
}

#[test]
fn test_bounding_box_formats() {
    assert_eq!(HARBOR_BOUNDS.to_overpass(), "40.48,-74.26,40.92,-73.75");
    assert_eq!(
        HARBOR_BOUNDS.to_string(),
        "N=40.92, S=40.48, E=-73.75, W=-74.26"
    );
}

#[test]
fn test_output_path_under_crate_root() {
    let path = output_path();
    assert!(path.is_absolute());
    assert!(path.ends_with("public/assets/data/harbor-streets.geojson"));
}

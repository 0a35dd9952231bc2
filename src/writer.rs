use crate::error::Result;
use crate::table::StreetTable;
use geojson::{Feature, FeatureCollection, Geometry, JsonObject};
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::Path;

pub fn to_feature_collection(table: &StreetTable) -> FeatureCollection {
    let features = table
        .rows
        .iter()
        .map(|row| Feature {
            bbox: None,
            geometry: Some(Geometry::new(geojson::Value::from(&row.geometry))),
            id: None,
            properties: Some(
                row.properties
                    .iter()
                    .map(|(k, v)| (k.clone(), v.clone()))
                    .collect::<JsonObject>(),
            ),
            foreign_members: None,
        })
        .collect();

    FeatureCollection {
        bbox: None,
        features,
        foreign_members: None,
    }
}

/// Write `table` as a GeoJSON FeatureCollection, creating parent directories
/// and replacing any existing file. Returns the size of the written file.
pub fn write_geojson(path: &Path, table: &StreetTable) -> Result<u64> {
    if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
        fs::create_dir_all(dir)?;
    }

    let mut writer = BufWriter::new(File::create(path)?);
    serde_json::to_writer(&mut writer, &to_feature_collection(table))?;
    writer.flush()?;

    Ok(fs::metadata(path)?.len())
}

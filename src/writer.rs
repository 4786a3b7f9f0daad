//! GeoJSON boundary output.

use geo_types::Polygon;
use geojson::{Feature, FeatureCollection, GeoJson, Geometry, JsonObject};
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum WriteError {
    #[error("failed to serialize boundary feature: {0}")]
    Serialize(#[from] serde_json::Error),
    #[error("failed to write boundary file '{}': {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Persist `ring` as a single-feature GeoJSON file with `properties`
/// attached to the feature.
pub fn write_boundary(
    path: &Path,
    ring: &Polygon<f64>,
    properties: JsonObject,
) -> Result<(), WriteError> {
    let geometry = Geometry {
        bbox: None,
        value: geojson::Value::from(ring),
        foreign_members: None,
    };
    let feature = Feature {
        bbox: None,
        geometry: Some(geometry),
        id: None,
        properties: Some(properties),
        foreign_members: None,
    };
    let collection = GeoJson::FeatureCollection(FeatureCollection {
        bbox: None,
        features: vec![feature],
        foreign_members: None,
    });

    // Serialize fully before touching the path so a failure cannot leave a
    // half-written file behind.
    let body = serde_json::to_string(&collection)?;
    std::fs::write(path, body).map_err(|source| WriteError::Io {
        path: path.to_path_buf(),
        source,
    })?;

    log::info!("boundary written to {}", path.display());
    Ok(())
}

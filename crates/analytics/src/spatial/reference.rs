//! Loads reference regions from a GeoJSON `FeatureCollection`.
//!
//! Point features are used as is. Polygon and MultiPolygon features are
//! reduced to the vertex centroid of their first outer ring.

use std::fs::File;
use std::io::BufReader;
use std::io::Read;
use std::path::Path;

use serde::Deserialize;
use serde_json::Map;
use serde_json::Value;

use crate::error::ReferenceDataError;
use crate::spatial::ReferencePoint;

pub const DEFAULT_NAME_PROPERTY: &str = "name";

#[derive(Debug, Deserialize)]
struct FeatureCollection {
    features: Vec<Feature>,
}

#[derive(Debug, Deserialize)]
struct Feature {
    #[serde(default)]
    properties: Option<Map<String, Value>>,
    geometry: Option<Geometry>,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type")]
enum Geometry {
    Point { coordinates: Vec<f64> },
    Polygon { coordinates: Vec<Vec<Vec<f64>>> },
    MultiPolygon { coordinates: Vec<Vec<Vec<Vec<f64>>>> },
    #[serde(other)]
    Unsupported,
}

/// Reads reference points from a GeoJSON file.
pub fn from_path(
    path: &Path,
    name_property: &str,
) -> Result<Vec<ReferencePoint>, ReferenceDataError> {
    let file = File::open(path)?;
    from_reader(BufReader::new(file), name_property)
}

/// Reads reference points from a GeoJSON `FeatureCollection`, naming each
/// point after the `name_property` string property of its feature.
pub fn from_reader<R: Read>(
    reader: R,
    name_property: &str,
) -> Result<Vec<ReferencePoint>, ReferenceDataError> {
    let collection: FeatureCollection = serde_json::from_reader(reader)?;

    collection
        .features
        .into_iter()
        .enumerate()
        .map(|(index, feature)| {
            to_reference_point(feature, name_property)
                .map_err(|reason| ReferenceDataError::InvalidFeature { index, reason })
        })
        .collect()
}

fn to_reference_point(feature: Feature, name_property: &str) -> Result<ReferencePoint, String> {
    let name = feature
        .properties
        .as_ref()
        .and_then(|props| props.get(name_property))
        .and_then(Value::as_str)
        .ok_or_else(|| format!("missing the `{name_property}` string property"))?;

    let (x, y) = match feature.geometry {
        Some(Geometry::Point { coordinates }) => position(&coordinates)?,
        Some(Geometry::Polygon { coordinates }) => centroid(coordinates.first())?,
        Some(Geometry::MultiPolygon { coordinates }) => {
            centroid(coordinates.first().and_then(|polygon| polygon.first()))?
        }
        Some(Geometry::Unsupported) => return Err(String::from("unsupported geometry type")),
        None => return Err(String::from("missing geometry")),
    };

    Ok(ReferencePoint::new(x, y, name))
}

fn position(coordinates: &[f64]) -> Result<(f64, f64), String> {
    match coordinates {
        [x, y, ..] => Ok((*x, *y)),
        _ => Err(String::from("a position needs at least two coordinates")),
    }
}

fn centroid(ring: Option<&Vec<Vec<f64>>>) -> Result<(f64, f64), String> {
    let ring = ring.ok_or_else(|| String::from("polygon without an outer ring"))?;

    // A closed ring repeats its first vertex at the end.
    let vertices = match ring.as_slice() {
        [first, rest @ .., last] if first == last => &ring[..rest.len() + 1],
        all => all,
    };

    if vertices.is_empty() {
        return Err(String::from("polygon with an empty outer ring"));
    }

    let (mut sum_x, mut sum_y) = (0.0, 0.0);
    for vertex in vertices {
        let (x, y) = position(vertex)?;
        sum_x += x;
        sum_y += y;
    }

    let count = vertices.len() as f64;
    Ok((sum_x / count, sum_y / count))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    const REGIONS: &str = r#"{
        "type": "FeatureCollection",
        "features": [
            {
                "type": "Feature",
                "properties": { "name": "Geneva", "code": "GE" },
                "geometry": { "type": "Point", "coordinates": [8.0, 47.0] }
            },
            {
                "type": "Feature",
                "properties": { "name": "Square" },
                "geometry": {
                    "type": "Polygon",
                    "coordinates": [[[0.0, 0.0], [2.0, 0.0], [2.0, 2.0], [0.0, 2.0], [0.0, 0.0]]]
                }
            },
            {
                "type": "Feature",
                "properties": { "name": "Islands" },
                "geometry": {
                    "type": "MultiPolygon",
                    "coordinates": [[[[10.0, 10.0], [12.0, 10.0], [11.0, 13.0]]]]
                }
            }
        ]
    }"#;

    #[test]
    fn reads_points_and_polygon_centroids() -> Result<(), ReferenceDataError> {
        let points = from_reader(Cursor::new(REGIONS), DEFAULT_NAME_PROPERTY)?;

        assert_eq!(
            points,
            vec![
                ReferencePoint::new(8.0, 47.0, "Geneva"),
                ReferencePoint::new(1.0, 1.0, "Square"),
                ReferencePoint::new(11.0, 11.0, "Islands"),
            ]
        );

        Ok(())
    }

    #[test]
    fn uses_the_configured_name_property() -> Result<(), ReferenceDataError> {
        let json = r#"{"type": "FeatureCollection", "features": [
            {"type": "Feature", "properties": {"code": "GE"},
             "geometry": {"type": "Point", "coordinates": [8.0, 47.0, 370.0]}}
        ]}"#;

        let points = from_reader(Cursor::new(json), "code")?;

        assert_eq!(points, vec![ReferencePoint::new(8.0, 47.0, "GE")]);

        Ok(())
    }

    #[test]
    fn rejects_features_without_name() {
        let json = r#"{"type": "FeatureCollection", "features": [
            {"type": "Feature", "properties": null,
             "geometry": {"type": "Point", "coordinates": [8.0, 47.0]}}
        ]}"#;

        let error = from_reader(Cursor::new(json), DEFAULT_NAME_PROPERTY).unwrap_err();

        assert!(matches!(error, ReferenceDataError::InvalidFeature { index: 0, .. }));
    }

    #[test]
    fn rejects_unsupported_geometry() {
        let json = r#"{"type": "FeatureCollection", "features": [
            {"type": "Feature", "properties": {"name": "River"},
             "geometry": {"type": "LineString", "coordinates": [[0.0, 0.0], [1.0, 1.0]]}}
        ]}"#;

        let error = from_reader(Cursor::new(json), DEFAULT_NAME_PROPERTY).unwrap_err();

        assert!(matches!(error, ReferenceDataError::InvalidFeature { index: 0, .. }));
    }
}

use geo_types::{Coord, LineString, MultiPolygon, Polygon};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::crs::Crs;
use crate::error::InputError;
use crate::models::{
    AnnotatedCollection, Classification, GeometryCollection, GeometryRecord, CLASSIFICATION_KEY,
    ESTIMATED_HEIGHT_KEY, SHADOW_LENGTH_KEY,
};

// GeoJSON-like feature structure
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct Feature {
    #[serde(default = "feature_type")]
    pub r#type: String,
    pub geometry: Option<FeatureGeometry>,
    #[serde(default)]
    pub properties: Option<Map<String, Value>>,
}

// Geometry part of a feature
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct FeatureGeometry {
    pub r#type: String,
    pub coordinates: Value, // Using Value for flexibility with different geometry types
}

#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct FeatureCollection {
    pub r#type: String,
    pub features: Vec<Feature>,
}

fn feature_type() -> String {
    "Feature".to_string()
}

/// Buildings and shadows split out of one classified upload.
#[derive(Debug, Clone)]
pub struct ClassifiedFeatures {
    pub buildings: GeometryCollection,
    pub shadows: GeometryCollection,
    pub skipped: usize,
}

impl ClassifiedFeatures {
    /// Every classified record, buildings first.
    pub fn all_records(&self) -> Vec<GeometryRecord> {
        self.buildings
            .records()
            .iter()
            .chain(self.shadows.records())
            .cloned()
            .collect()
    }
}

/// Parse a WGS84 FeatureCollection and split it by `classification`.
///
/// Features with any other label, or without one, are counted in `skipped`.
pub fn parse_classified_features(geojson: &str) -> Result<ClassifiedFeatures, InputError> {
    let collection: FeatureCollection = serde_json::from_str(geojson)?;
    if collection.r#type != "FeatureCollection" {
        return Err(InputError::NotFeatureCollection(collection.r#type));
    }

    let mut buildings = Vec::new();
    let mut shadows = Vec::new();
    let mut skipped = 0;

    for (index, feature) in collection.features.into_iter().enumerate() {
        let properties = feature.properties.unwrap_or_default();
        let classification = properties
            .get(CLASSIFICATION_KEY)
            .and_then(Value::as_str)
            .and_then(Classification::from_label);

        let (Some(classification), Some(geometry)) = (classification, feature.geometry) else {
            skipped += 1;
            continue;
        };

        let record = GeometryRecord {
            classification,
            geometry: to_multipolygon(index, &geometry)?,
            properties,
        };
        match classification {
            Classification::Building => buildings.push(record),
            Classification::Shadow => shadows.push(record),
        }
    }

    Ok(ClassifiedFeatures {
        buildings: GeometryCollection::new(Crs::WGS84, buildings),
        shadows: GeometryCollection::new(Crs::WGS84, shadows),
        skipped,
    })
}

fn to_multipolygon(index: usize, geometry: &FeatureGeometry) -> Result<MultiPolygon<f64>, InputError> {
    let malformed = || InputError::MalformedCoordinates { index };
    match geometry.r#type.as_str() {
        "Polygon" => {
            let rings = geometry.coordinates.as_array().ok_or_else(malformed)?;
            Ok(MultiPolygon::new(vec![parse_polygon(rings).ok_or_else(malformed)?]))
        }
        "MultiPolygon" => {
            let polygons = geometry.coordinates.as_array().ok_or_else(malformed)?;
            polygons
                .iter()
                .map(|p| p.as_array().and_then(|rings| parse_polygon(rings)).ok_or_else(malformed))
                .collect::<Result<Vec<_>, _>>()
                .map(MultiPolygon::new)
        }
        other => Err(InputError::UnsupportedGeometry {
            index,
            kind: other.to_string(),
        }),
    }
}

fn parse_polygon(rings: &[Value]) -> Option<Polygon<f64>> {
    let mut rings = rings.iter().map(parse_ring);
    let exterior = rings.next()??;
    let interiors = rings.collect::<Option<Vec<_>>>()?;
    Some(Polygon::new(exterior, interiors))
}

fn parse_ring(ring: &Value) -> Option<LineString<f64>> {
    ring.as_array()?
        .iter()
        .map(|position| {
            let pair = position.as_array()?;
            if pair.len() < 2 {
                return None;
            }
            Some(Coord {
                x: pair[0].as_f64()?,
                y: pair[1].as_f64()?,
            })
        })
        .collect::<Option<Vec<_>>>()
        .map(LineString::new)
}

fn multipolygon_coordinates(geometry: &MultiPolygon<f64>) -> Value {
    let ring_coords = |ring: &LineString<f64>| -> Value {
        Value::Array(ring.coords().map(|c| Value::from(vec![c.x, c.y])).collect())
    };
    Value::Array(
        geometry
            .iter()
            .map(|polygon| {
                Value::Array(
                    std::iter::once(polygon.exterior())
                        .chain(polygon.interiors())
                        .map(ring_coords)
                        .collect(),
                )
            })
            .collect(),
    )
}

/// Annotated buildings as a FeatureCollection with the two height fields.
///
/// Undefined values are written as `null`.
pub fn annotated_to_feature_collection(annotated: &AnnotatedCollection) -> FeatureCollection {
    let features = annotated
        .results
        .iter()
        .map(|result| {
            let mut properties = result.building.properties.clone();
            properties.insert(SHADOW_LENGTH_KEY.to_string(), optional_number(result.shadow_length));
            properties.insert(ESTIMATED_HEIGHT_KEY.to_string(), optional_number(result.estimated_height));
            Feature {
                r#type: feature_type(),
                geometry: Some(FeatureGeometry {
                    r#type: "MultiPolygon".to_string(),
                    coordinates: multipolygon_coordinates(&result.building.geometry),
                }),
                properties: Some(properties),
            }
        })
        .collect();

    FeatureCollection {
        r#type: "FeatureCollection".to_string(),
        features,
    }
}

fn optional_number(value: Option<f64>) -> Value {
    value.map(Value::from).unwrap_or(Value::Null)
}

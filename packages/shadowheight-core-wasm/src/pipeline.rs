use crate::config::EstimationConfig;
use crate::console_log;
use crate::crs::Crs;
use crate::error::{InputError, PipelineError, ProjectionError};
use crate::geojson_features::{annotated_to_feature_collection, parse_classified_features, FeatureCollection};
use crate::height_estimator::estimate_heights_with;
use crate::models::{AnnotatedCollection, GeometryCollection, HeightTableRow};
use crate::reproject::{reproject, select_planar_crs};

/// Classified WGS84 GeoJSON in, annotated WGS84 buildings out.
///
/// One planar CRS is chosen from all classified features so that buildings
/// and shadows are measured in the same system.
pub fn run_estimation(geojson: &str, config: &EstimationConfig) -> Result<AnnotatedCollection, PipelineError> {
    config.validate()?;

    let classified = parse_classified_features(geojson)?;
    console_log!(
        "Parsed {} buildings and {} shadows ({} other features skipped)",
        classified.buildings.len(),
        classified.shadows.len(),
        classified.skipped
    );
    if classified.buildings.is_empty() {
        return Err(InputError::NoBuildings.into());
    }

    let working_crs = select_planar_crs(&classified.all_records(), config.hemisphere)?;
    let buildings = reproject(&classified.buildings, working_crs)?;
    let shadows = reproject(&classified.shadows, working_crs)?;

    let annotated = estimate_heights_with(&buildings, &shadows, config)?;
    let geodetic = to_geodetic(annotated)?;
    Ok(geodetic)
}

/// Reproject annotated results back to WGS84, keeping the annotations.
fn to_geodetic(annotated: AnnotatedCollection) -> Result<AnnotatedCollection, ProjectionError> {
    let buildings = GeometryCollection::new(
        annotated.crs,
        annotated.results.iter().map(|r| r.building.clone()).collect(),
    );
    let geodetic = reproject(&buildings, Crs::WGS84)?;

    let results = annotated
        .results
        .into_iter()
        .zip(geodetic.into_records())
        .map(|(mut result, building)| {
            result.building = building;
            result
        })
        .collect();

    Ok(AnnotatedCollection {
        crs: Crs::WGS84,
        results,
    })
}

pub fn estimate_to_feature_collection(
    geojson: &str,
    config: &EstimationConfig,
) -> Result<FeatureCollection, PipelineError> {
    let annotated = run_estimation(geojson, config)?;
    Ok(annotated_to_feature_collection(&annotated))
}

/// Full run serialized as a GeoJSON string.
pub fn estimate_to_geojson(geojson: &str, config: &EstimationConfig) -> Result<String, PipelineError> {
    let collection = estimate_to_feature_collection(geojson, config)?;
    let json = serde_json::to_string(&collection)?;
    console_log!("Annotated GeoJSON size: {} bytes", json.len());
    Ok(json)
}

/// Rows of (segment_id, shadow_length_m, estimated_height_m) in building order.
pub fn estimate_height_table(geojson: &str, config: &EstimationConfig) -> Result<Vec<HeightTableRow>, PipelineError> {
    let annotated = run_estimation(geojson, config)?;
    Ok(annotated.results.iter().map(HeightTableRow::from).collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reproject::project_coord;
    use geo::Coord;
    use serde_json::{json, Value};

    const ORIGIN: (f64, f64) = (500_000.0, 4_649_776.0);

    // Build rings in UTM 31N metres and hand them over as WGS84 degrees
    fn ring_to_lon_lat(points: &[(f64, f64)]) -> Value {
        let mut coords: Vec<Value> = points
            .iter()
            .map(|&(x, y)| {
                let c = project_coord(Crs::Planar(32631), Crs::WGS84, Coord { x, y }).unwrap();
                json!([c.x, c.y])
            })
            .collect();
        coords.push(coords[0].clone());
        Value::Array(coords)
    }

    fn square(center: (f64, f64), half: f64) -> Vec<(f64, f64)> {
        vec![
            (center.0 - half, center.1 - half),
            (center.0 + half, center.1 - half),
            (center.0 + half, center.1 + half),
            (center.0 - half, center.1 + half),
        ]
    }

    fn strip_along(azimuth_deg: f64, near: f64, far: f64, half_width: f64) -> Vec<(f64, f64)> {
        let az = azimuth_deg.to_radians();
        let (ux, uy) = (az.sin(), az.cos());
        let (vx, vy) = (uy, -ux);
        let at = |t: f64, s: f64| (ORIGIN.0 + ux * t + vx * s, ORIGIN.1 + uy * t + vy * s);
        vec![at(near, -half_width), at(far, -half_width), at(far, half_width), at(near, half_width)]
    }

    fn feature(classification: &str, segment_id: i64, ring: Vec<(f64, f64)>) -> Value {
        json!({
            "type": "Feature",
            "properties": { "classification": classification, "segment_id": segment_id },
            "geometry": { "type": "Polygon", "coordinates": [ring_to_lon_lat(&ring)] }
        })
    }

    fn scenario() -> String {
        json!({
            "type": "FeatureCollection",
            "features": [
                feature("buildings", 1, square(ORIGIN, 6.0)),
                feature("shadow", 2, strip_along(144.5, 20.0, 32.0, 5.0)),
                // far to the north-west, nothing in its sun direction
                feature("buildings", 3, square((ORIGIN.0 - 300.0, ORIGIN.1 + 300.0), 6.0)),
                feature("water", 4, square((ORIGIN.0 + 50.0, ORIGIN.1), 3.0)),
            ]
        })
        .to_string()
    }

    #[test]
    fn estimates_from_geodetic_input() {
        let annotated = run_estimation(&scenario(), &EstimationConfig::with_sun(144.5, 34.2)).unwrap();

        assert_eq!(annotated.crs, Crs::WGS84);
        assert_eq!(annotated.len(), 2);

        let first = &annotated.results[0];
        let length = first.shadow_length.unwrap();
        let height = first.estimated_height.unwrap();
        // centroid is recomputed after a degree round trip, allow a few centimetres
        assert!((length - 20.0).abs() < 0.05, "shadow length {length}");
        assert!((height - 13.6).abs() < 0.05, "height {height}");

        assert_eq!(annotated.results[1].shadow_length, None);
        assert_eq!(annotated.results[1].estimated_height, None);
    }

    #[test]
    fn output_geometry_is_back_in_degrees() {
        let annotated = run_estimation(&scenario(), &EstimationConfig::default()).unwrap();
        let first = annotated.results[0].building.geometry.0[0].exterior().0[0];
        assert!((first.x - 3.0).abs() < 0.01, "longitude {}", first.x);
        assert!((first.y - 42.0).abs() < 0.1, "latitude {}", first.y);
    }

    #[test]
    fn geojson_output_carries_annotations() {
        let json = estimate_to_geojson(&scenario(), &EstimationConfig::default()).unwrap();
        let value: Value = serde_json::from_str(&json).unwrap();

        let features = value["features"].as_array().unwrap();
        assert_eq!(features.len(), 2);
        assert_eq!(features[0]["properties"]["segment_id"], 1);
        assert!(features[0]["properties"]["shadow_length_m"].as_f64().is_some());
        assert!(features[0]["properties"]["estimated_height_m"].as_f64().is_some());
        assert_eq!(features[1]["properties"]["segment_id"], 3);
        assert!(features[1]["properties"]["estimated_height_m"].is_null());
    }

    #[test]
    fn height_table_rows_follow_building_order() {
        let rows = estimate_height_table(&scenario(), &EstimationConfig::default()).unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].segment_id, Some(json!(1)));
        assert!(rows[0].shadow_length_m.is_some());
        assert_eq!(rows[1].segment_id, Some(json!(3)));
        assert_eq!(rows[1].shadow_length_m, None);
    }

    #[test]
    fn input_without_buildings_is_rejected() {
        let only_shadow = json!({
            "type": "FeatureCollection",
            "features": [feature("shadow", 2, strip_along(144.5, 20.0, 32.0, 5.0))]
        });
        let err = run_estimation(&only_shadow.to_string(), &EstimationConfig::default()).unwrap_err();
        assert!(matches!(err, PipelineError::Input(InputError::NoBuildings)));
    }

    #[test]
    fn buildings_without_shadows_are_all_undefined() {
        let no_shadow = json!({
            "type": "FeatureCollection",
            "features": [feature("buildings", 1, square(ORIGIN, 6.0))]
        });
        let annotated = run_estimation(&no_shadow.to_string(), &EstimationConfig::default()).unwrap();
        assert_eq!(annotated.unmatched_count(), 1);
    }

    #[test]
    fn area_free_input_fails_projection() {
        let empty_rings = json!({
            "type": "FeatureCollection",
            "features": [{
                "type": "Feature",
                "properties": { "classification": "buildings" },
                "geometry": { "type": "MultiPolygon", "coordinates": [] }
            }]
        });
        let err = run_estimation(&empty_rings.to_string(), &EstimationConfig::default()).unwrap_err();
        assert!(matches!(err, PipelineError::Projection(ProjectionError::UndefinedCentroid)));
    }
}

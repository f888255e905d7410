//! Per-building shadow search and height conversion.
//!
//! Each building casts a finite ray from its centroid along the sun azimuth.
//! Shadows are probed in input order; the distance from the centroid to the
//! nearest point of the ray inside a shadow gives the shadow length, and
//! `length * tan(elevation)` the height.

use geo::algorithm::line_intersection::{line_intersection, LineIntersection};
use geo::{BooleanOps, Centroid, Distance, Euclidean, Intersects, Line, LineString, MultiLineString, MultiPolygon, Point};

#[cfg(feature = "parallel")]
use rayon::prelude::*;

use crate::config::{EstimationConfig, ShadowMatchPolicy};
use crate::console_log;
use crate::error::{EstimationError, GeometryError};
use crate::models::{AnnotatedCollection, EstimationResult, GeometryCollection, GeometryRecord, ScanOutcome};
use crate::sun_ray::project_sun_ray;

/// Estimate heights with the default ray length and first-match policy.
pub fn estimate_heights(
    buildings: &GeometryCollection,
    shadows: &GeometryCollection,
    sun_azimuth_deg: f64,
    sun_elevation_deg: f64,
) -> Result<AnnotatedCollection, EstimationError> {
    let config = EstimationConfig::with_sun(sun_azimuth_deg, sun_elevation_deg);
    estimate_heights_with(buildings, shadows, &config)
}

/// Estimate heights for every building, in input order.
///
/// Both collections must share the same planar CRS. Buildings whose ray hits
/// no shadow, or whose measurement is unusable, get `None` for both values.
pub fn estimate_heights_with(
    buildings: &GeometryCollection,
    shadows: &GeometryCollection,
    config: &EstimationConfig,
) -> Result<AnnotatedCollection, EstimationError> {
    config.validate()?;

    if buildings.crs() != shadows.crs() {
        return Err(EstimationError::CrsMismatch {
            buildings: buildings.crs(),
            shadows: shadows.crs(),
        });
    }
    if !buildings.crs().is_planar() {
        return Err(EstimationError::NotPlanar(buildings.crs()));
    }

    let tan_elevation = config.sun_elevation_deg.to_radians().tan();
    let estimate = |building: &GeometryRecord| estimate_building(building, shadows.records(), config, tan_elevation);

    #[cfg(feature = "parallel")]
    let results: Vec<EstimationResult> = if config.parallel {
        buildings.records().par_iter().map(estimate).collect()
    } else {
        buildings.records().iter().map(estimate).collect()
    };
    #[cfg(not(feature = "parallel"))]
    let results: Vec<EstimationResult> = buildings.records().iter().map(estimate).collect();

    let annotated = AnnotatedCollection {
        crs: buildings.crs(),
        results,
    };
    console_log!(
        "Estimated heights for {} buildings against {} shadows ({} without a measurable shadow)",
        annotated.len(),
        shadows.len(),
        annotated.unmatched_count()
    );
    Ok(annotated)
}

fn estimate_building(
    building: &GeometryRecord,
    shadows: &[GeometryRecord],
    config: &EstimationConfig,
    tan_elevation: f64,
) -> EstimationResult {
    let state = match building.geometry.centroid() {
        Some(centroid) => {
            let ray = project_sun_ray(centroid, config.sun_azimuth_deg, config.ray_length_m);
            scan_shadows(centroid, ray, shadows, config.shadow_match)
        }
        None => ScanState::Unmeasurable {
            shadow: None,
            error: GeometryError::DegenerateBuilding,
        },
    };

    let (shadow_length, matched_shadow, outcome) = match state {
        ScanState::Found { shadow, distance } => (Some(distance), Some(shadow), ScanOutcome::Found),
        ScanState::Unmeasurable { shadow, error } => (None, shadow, ScanOutcome::Unmeasurable(error)),
        ScanState::Scanning | ScanState::Exhausted => (None, None, ScanOutcome::Exhausted),
    };

    EstimationResult {
        building: building.clone(),
        shadow_length,
        estimated_height: shadow_length.map(|length| length * tan_elevation),
        matched_shadow,
        outcome,
    }
}

/// Progress of the search for one building.
#[derive(Debug, Clone, Copy, PartialEq)]
enum ScanState {
    Scanning,
    Found { shadow: usize, distance: f64 },
    Exhausted,
    Unmeasurable { shadow: Option<usize>, error: GeometryError },
}

fn scan_shadows(centroid: Point<f64>, ray: Line<f64>, shadows: &[GeometryRecord], policy: ShadowMatchPolicy) -> ScanState {
    scan(shadows.iter().map(|shadow| probe_shadow(centroid, ray, &shadow.geometry)), policy)
}

/// Drive the scan over lazily evaluated probe results, one per shadow.
fn scan<I>(probes: I, policy: ShadowMatchPolicy) -> ScanState
where
    I: IntoIterator<Item = Result<Option<f64>, GeometryError>>,
{
    let mut state = ScanState::Scanning;

    for (index, probe) in probes.into_iter().enumerate() {
        match probe {
            Ok(None) | Err(GeometryError::EmptyIntersection) => continue,
            Ok(Some(distance)) => match policy {
                ShadowMatchPolicy::FirstMatch => {
                    return ScanState::Found { shadow: index, distance };
                }
                ShadowMatchPolicy::Nearest => {
                    let closer = match state {
                        ScanState::Found { distance: best, .. } => distance < best,
                        _ => true,
                    };
                    if closer {
                        state = ScanState::Found { shadow: index, distance };
                    }
                }
            },
            // a measurement already taken under Nearest outranks a later failure
            Err(_) if matches!(state, ScanState::Found { .. }) => continue,
            Err(error) => {
                return ScanState::Unmeasurable {
                    shadow: Some(index),
                    error,
                };
            }
        }
    }

    match state {
        ScanState::Scanning => ScanState::Exhausted,
        other => other,
    }
}

/// Distance from `centroid` to where `ray` enters `shadow`.
///
/// `Ok(None)` when the ray misses the shadow entirely. A centroid inside or on
/// the shadow measures zero; a ray that only touches the boundary measures to
/// the touching point.
fn probe_shadow(centroid: Point<f64>, ray: Line<f64>, shadow: &MultiPolygon<f64>) -> Result<Option<f64>, GeometryError> {
    if !ray.intersects(shadow) {
        return Ok(None);
    }
    if shadow.intersects(&centroid) {
        return Ok(Some(0.0));
    }

    let distance = clipped_distance(centroid, ray, shadow)
        .or_else(|| touch_distance(centroid, ray, shadow))
        .ok_or(GeometryError::EmptyIntersection)?;
    finite_distance(distance).map(Some)
}

/// Nearest distance to the pieces of `ray` lying inside `shadow`.
fn clipped_distance(centroid: Point<f64>, ray: Line<f64>, shadow: &MultiPolygon<f64>) -> Option<f64> {
    let ray_lines = MultiLineString::new(vec![LineString::new(vec![ray.start, ray.end])]);
    let inside = shadow.clip(&ray_lines, false);

    // grazing a vertex or edge clips to nothing or to zero-length pieces
    inside
        .0
        .iter()
        .filter(|piece| piece.lines().any(|segment| segment.start != segment.end))
        .map(|piece| Euclidean::distance(&centroid, piece))
        .reduce(f64::min)
}

/// Nearest point where `ray` meets the boundary of `shadow`.
fn touch_distance(centroid: Point<f64>, ray: Line<f64>, shadow: &MultiPolygon<f64>) -> Option<f64> {
    shadow
        .iter()
        .flat_map(|polygon| std::iter::once(polygon.exterior()).chain(polygon.interiors()))
        .flat_map(|ring| ring.lines())
        .filter_map(|edge| line_intersection(ray, edge))
        .map(|hit| match hit {
            LineIntersection::SinglePoint { intersection, .. } => {
                Euclidean::distance(&centroid, &Point::from(intersection))
            }
            LineIntersection::Collinear { intersection } => Euclidean::distance(&centroid, &intersection),
        })
        .reduce(f64::min)
}

fn finite_distance(distance: f64) -> Result<f64, GeometryError> {
    if distance.is_finite() {
        Ok(distance)
    } else {
        Err(GeometryError::NonFiniteDistance)
    }
}

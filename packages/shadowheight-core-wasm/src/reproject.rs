use geo::{BooleanOps, Centroid, Coord, MapCoords, MultiPolygon};
use proj4rs::proj::Proj;
use proj4rs::transform::transform;

use crate::console_log;
use crate::crs::{Crs, HemispherePolicy, UtmZone};
use crate::error::ProjectionError;
use crate::models::{GeometryCollection, GeometryRecord};

/// Reproject a geodetic collection into the UTM zone under its centroid.
pub fn reproject_to_planar(
    collection: &GeometryCollection,
    policy: HemispherePolicy,
) -> Result<GeometryCollection, ProjectionError> {
    let target = select_planar_crs(collection.records(), policy)?;
    reproject(collection, target)
}

/// Pick the planar CRS for the centroid of the union of `records`.
///
/// Records are expected in geodetic degrees.
pub fn select_planar_crs(records: &[GeometryRecord], policy: HemispherePolicy) -> Result<Crs, ProjectionError> {
    if records.is_empty() {
        return Err(ProjectionError::EmptyCollection);
    }

    let merged = records
        .iter()
        .fold(MultiPolygon::<f64>::new(Vec::new()), |acc, record| {
            union_multipolygon(&acc, &record.geometry)
        });
    let centroid = merged.centroid().ok_or(ProjectionError::UndefinedCentroid)?;

    let zone = UtmZone::for_lon_lat(centroid.x(), centroid.y(), policy)?;
    console_log!(
        "Centroid ({:.6}, {:.6}) falls in UTM zone {} -> {}",
        centroid.x(),
        centroid.y(),
        zone.number,
        zone.crs()
    );
    Ok(zone.crs())
}

fn union_multipolygon(a: &MultiPolygon<f64>, b: &MultiPolygon<f64>) -> MultiPolygon<f64> {
    if a.0.is_empty() {
        return b.clone();
    }
    if b.0.is_empty() {
        return a.clone();
    }
    a.union(b)
}

/// Transform every record of `collection` into `target`.
///
/// The whole collection moves at once: either every geometry is converted
/// or an error is returned and the input is left untouched.
pub fn reproject(collection: &GeometryCollection, target: Crs) -> Result<GeometryCollection, ProjectionError> {
    let source = collection.crs();
    if source == target {
        return Ok(collection.clone());
    }

    let transform = Transform::between(source, target)?;
    let records = collection
        .records()
        .iter()
        .map(|record| {
            let geometry = record
                .geometry
                .try_map_coords(|coord| transform.apply(coord))?;
            Ok(GeometryRecord {
                classification: record.classification,
                geometry,
                properties: record.properties.clone(),
            })
        })
        .collect::<Result<Vec<_>, ProjectionError>>()?;

    Ok(GeometryCollection::new(target, records))
}

/// Project a single coordinate from `source` to `target`.
pub fn project_coord(source: Crs, target: Crs, coord: Coord<f64>) -> Result<Coord<f64>, ProjectionError> {
    if source == target {
        return Ok(coord);
    }
    Transform::between(source, target)?.apply(coord)
}

/// A resolved point transform between two supported systems.
///
/// `proj4rs` works in radians on the geodetic side; degrees are converted
/// on the way in and out.
struct Transform {
    from: Proj,
    to: Proj,
    from_geodetic: bool,
    to_geodetic: bool,
}

impl Transform {
    fn between(source: Crs, target: Crs) -> Result<Self, ProjectionError> {
        if !source.is_planar() && !target.is_planar() {
            return Err(ProjectionError::UnsupportedTransform { from: source, to: target });
        }
        Crs::from_epsg(source.epsg())?;
        Crs::from_epsg(target.epsg())?;

        Ok(Self {
            from: source.proj()?,
            to: target.proj()?,
            from_geodetic: !source.is_planar(),
            to_geodetic: !target.is_planar(),
        })
    }

    fn apply(&self, coord: Coord<f64>) -> Result<Coord<f64>, ProjectionError> {
        let non_finite = || ProjectionError::NonFiniteCoordinate { x: coord.x, y: coord.y };
        if !coord.x.is_finite() || !coord.y.is_finite() {
            return Err(non_finite());
        }

        let mut point = if self.from_geodetic {
            (coord.x.to_radians(), coord.y.to_radians(), 0.0)
        } else {
            (coord.x, coord.y, 0.0)
        };
        transform(&self.from, &self.to, &mut point).map_err(|err| ProjectionError::Transform {
            x: coord.x,
            y: coord.y,
            reason: err.to_string(),
        })?;

        let (x, y) = if self.to_geodetic {
            (point.0.to_degrees(), point.1.to_degrees())
        } else {
            (point.0, point.1)
        };
        if x.is_finite() && y.is_finite() {
            Ok(Coord { x, y })
        } else {
            Err(non_finite())
        }
    }
}

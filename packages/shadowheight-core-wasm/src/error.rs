use thiserror::Error;

use crate::crs::Crs;

/// Failure to pick or apply a coordinate reference system.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ProjectionError {
    #[error("cannot reproject an empty geometry collection")]
    EmptyCollection,

    #[error("geometry union has no defined centroid")]
    UndefinedCentroid,

    #[error("centroid ({lon}, {lat}) is not a finite geodetic coordinate")]
    InvalidCentroid { lon: f64, lat: f64 },

    #[error("no transform available from {from} to {to}")]
    UnsupportedTransform { from: Crs, to: Crs },

    #[error("EPSG:{0} is not a supported coordinate reference system")]
    UnsupportedEpsg(u32),

    #[error("no projection definition for EPSG:{epsg}: {reason}")]
    Definition { epsg: u32, reason: String },

    #[error("projection of ({x}, {y}) failed: {reason}")]
    Transform { x: f64, y: f64, reason: String },

    #[error("transform produced a non-finite coordinate from ({x}, {y})")]
    NonFiniteCoordinate { x: f64, y: f64 },
}

/// Per-building geometric irregularities that degrade to an undefined result.
#[derive(Error, Debug, Clone, Copy, PartialEq)]
pub enum GeometryError {
    #[error("sun ray touches the shadow without a measurable intersection")]
    EmptyIntersection,

    #[error("distance to the shadow intersection is not finite")]
    NonFiniteDistance,

    #[error("building geometry has no defined centroid")]
    DegenerateBuilding,
}

/// Batch-level failures of the height estimator.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum EstimationError {
    #[error("{name} must be finite, got {value}")]
    NonFiniteParameter { name: &'static str, value: f64 },

    #[error("ray length must be positive, got {0}")]
    NonPositiveRayLength(f64),

    #[error("buildings are in {buildings} but shadows are in {shadows}")]
    CrsMismatch { buildings: Crs, shadows: Crs },

    #[error("height estimation requires a planar CRS, got {0}")]
    NotPlanar(Crs),
}

/// Problems with the GeoJSON handed over by the presentation layer.
#[derive(Error, Debug)]
pub enum InputError {
    #[error("invalid GeoJSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("expected a FeatureCollection, got {0}")]
    NotFeatureCollection(String),

    #[error("feature {index} has unsupported geometry type {kind}")]
    UnsupportedGeometry { index: usize, kind: String },

    #[error("feature {index} has malformed coordinates")]
    MalformedCoordinates { index: usize },

    #[error("input contains no features classified as buildings")]
    NoBuildings,
}

/// Anything that aborts a full GeoJSON-to-GeoJSON run.
#[derive(Error, Debug)]
pub enum PipelineError {
    #[error(transparent)]
    Input(#[from] InputError),

    #[error(transparent)]
    Projection(#[from] ProjectionError),

    #[error(transparent)]
    Estimation(#[from] EstimationError),

    #[error("failed to serialize output: {0}")]
    Output(#[from] serde_json::Error),
}

// This is the models module containing shared data structures
use geo_types::MultiPolygon;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::crs::Crs;
use crate::error::GeometryError;

/// Property key carrying the feature label.
pub const CLASSIFICATION_KEY: &str = "classification";
/// Property key of the pass-through identifier.
pub const SEGMENT_ID_KEY: &str = "segment_id";
pub const SHADOW_LENGTH_KEY: &str = "shadow_length_m";
pub const ESTIMATED_HEIGHT_KEY: &str = "estimated_height_m";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Classification {
    Building,
    Shadow,
}

impl Classification {
    pub fn from_label(label: &str) -> Option<Self> {
        match label {
            "buildings" => Some(Classification::Building),
            "shadow" => Some(Classification::Shadow),
            _ => None,
        }
    }
}

/// A single classified vector feature.
#[derive(Debug, Clone, PartialEq)]
pub struct GeometryRecord {
    pub classification: Classification,
    pub geometry: MultiPolygon<f64>,
    // Input feature properties, including classification and segment_id
    pub properties: Map<String, Value>,
}

impl GeometryRecord {
    pub fn new(classification: Classification, geometry: MultiPolygon<f64>) -> Self {
        Self {
            classification,
            geometry,
            properties: Map::new(),
        }
    }

    pub fn with_property(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.properties.insert(key.to_string(), value.into());
        self
    }

    pub fn segment_id(&self) -> Option<&Value> {
        self.properties.get(SEGMENT_ID_KEY)
    }
}

/// Ordered records that all live in one CRS.
#[derive(Debug, Clone, PartialEq)]
pub struct GeometryCollection {
    crs: Crs,
    records: Vec<GeometryRecord>,
}

impl GeometryCollection {
    pub fn new(crs: Crs, records: Vec<GeometryRecord>) -> Self {
        Self { crs, records }
    }

    pub fn crs(&self) -> Crs {
        self.crs
    }

    pub fn records(&self) -> &[GeometryRecord] {
        &self.records
    }

    pub fn into_records(self) -> Vec<GeometryRecord> {
        self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

/// How the shadow scan for one building ended.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ScanOutcome {
    Found,
    Exhausted,
    Unmeasurable(GeometryError),
}

/// A building annotated with its shadow length and height.
#[derive(Debug, Clone, PartialEq)]
pub struct EstimationResult {
    pub building: GeometryRecord,
    pub shadow_length: Option<f64>,
    pub estimated_height: Option<f64>,
    pub matched_shadow: Option<usize>,
    pub outcome: ScanOutcome,
}

/// Annotated buildings that share one CRS.
#[derive(Debug, Clone, PartialEq)]
pub struct AnnotatedCollection {
    pub crs: Crs,
    pub results: Vec<EstimationResult>,
}

impl AnnotatedCollection {
    pub fn len(&self) -> usize {
        self.results.len()
    }

    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }

    pub fn unmatched_count(&self) -> usize {
        self.results.iter().filter(|r| r.shadow_length.is_none()).count()
    }
}

/// One line of the estimated heights table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HeightTableRow {
    pub segment_id: Option<Value>,
    pub shadow_length_m: Option<f64>,
    pub estimated_height_m: Option<f64>,
}

impl From<&EstimationResult> for HeightTableRow {
    fn from(result: &EstimationResult) -> Self {
        Self {
            segment_id: result.building.segment_id().cloned(),
            shadow_length_m: result.shadow_length,
            estimated_height_m: result.estimated_height,
        }
    }
}

use wasm_bindgen::prelude::*;
use serde_wasm_bindgen::to_value;

// Create a console module for logging
pub mod console;
// Coordinate reference systems and UTM zones
pub mod crs;
// Error types shared across the pipeline
pub mod error;
// Shared data structures
pub mod models;
// Estimation settings
pub mod config;
// Planar reprojection
pub mod reproject;
// Sun ray construction
pub mod sun_ray;
// Shadow search and height conversion
pub mod height_estimator;
// GeoJSON input/output
pub mod geojson_features;
// End-to-end runs used by the JS exports
pub mod pipeline;

pub use config::{EstimationConfig, ShadowMatchPolicy};
pub use crs::{Crs, HemispherePolicy};
pub use error::{EstimationError, GeometryError, PipelineError, ProjectionError};
pub use height_estimator::{estimate_heights, estimate_heights_with};
pub use models::{AnnotatedCollection, EstimationResult, GeometryCollection, GeometryRecord};
pub use reproject::{reproject, reproject_to_planar};
pub use sun_ray::project_sun_ray;

// Enable better panic messages in console during development
#[cfg(feature = "console_error_panic_hook")]
pub use console_error_panic_hook::set_once as set_panic_hook;

// Use the macro from our console module
#[macro_export]
macro_rules! console_log {
    ($($t:tt)*) => ($crate::console::log(&format!($($t)*)))
}

use std::sync::Once;
static INIT: Once = Once::new();

// This sets up the wasm_bindgen start functionality
#[wasm_bindgen(start)]
pub fn start() {
    INIT.call_once(|| {
        // Set the panic hook for better error messages
        #[cfg(feature = "console_error_panic_hook")]
        console_error_panic_hook::set_once();

        console_log!("Shadow height WASM module initialized");
    });
}

fn to_js_error(err: PipelineError) -> JsValue {
    JsValue::from_str(&err.to_string())
}

// Annotated buildings as a GeoJSON string, for display and download
#[wasm_bindgen]
pub fn estimate_building_heights(geojson: &str, sun_azimuth_deg: f64, sun_elevation_deg: f64) -> Result<String, JsValue> {
    let config = EstimationConfig::with_sun(sun_azimuth_deg, sun_elevation_deg);
    run_timed(geojson, &config)
}

// Same as above with the full JSON settings object
#[wasm_bindgen]
pub fn estimate_building_heights_with_config(geojson: &str, config_json: &str) -> Result<String, JsValue> {
    let config = EstimationConfig::from_json(config_json)
        .map_err(|e| JsValue::from_str(&format!("Invalid config JSON: {}", e)))?;
    run_timed(geojson, &config)
}

fn run_timed(geojson: &str, config: &EstimationConfig) -> Result<String, JsValue> {
    let started = js_sys::Date::now();
    let result = pipeline::estimate_to_geojson(geojson, config).map_err(to_js_error)?;
    console_log!("Height estimation finished in {:.1} ms", js_sys::Date::now() - started);
    Ok(result)
}

// Table rows {segment_id, shadow_length_m, estimated_height_m} as JS objects
#[wasm_bindgen]
pub fn estimate_height_table(geojson: &str, sun_azimuth_deg: f64, sun_elevation_deg: f64) -> Result<JsValue, JsValue> {
    let config = EstimationConfig::with_sun(sun_azimuth_deg, sun_elevation_deg);
    let rows = pipeline::estimate_height_table(geojson, &config).map_err(to_js_error)?;
    Ok(to_value(&rows)?)
}

// Get information about WASM module capabilities
#[wasm_bindgen]
pub fn get_wasm_info() -> String {
    serde_json::to_string(&serde_json::json!({
        "parallel_processing": cfg!(feature = "parallel"),
        "supported_crs": ["EPSG:4326", "EPSG:32601-32660", "EPSG:32701-32760"],
        "defaults": EstimationConfig::default(),
    }))
    .unwrap_or_else(|_| "{}".to_string())
}

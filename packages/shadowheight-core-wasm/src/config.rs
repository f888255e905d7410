use serde::{Deserialize, Serialize};

use crate::crs::HemispherePolicy;
use crate::error::EstimationError;
use crate::sun_ray::DEFAULT_RAY_LENGTH;

pub const DEFAULT_SUN_AZIMUTH_DEG: f64 = 144.5;
pub const DEFAULT_SUN_ELEVATION_DEG: f64 = 34.2;

/// Which intersecting shadow a building is measured against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ShadowMatchPolicy {
    /// Earliest shadow in input order wins.
    #[default]
    FirstMatch,
    /// Smallest measured distance among all intersecting shadows.
    Nearest,
}

// Input settings passed from the presentation layer as JSON
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct EstimationConfig {
    pub sun_azimuth_deg: f64,
    pub sun_elevation_deg: f64,
    pub ray_length_m: f64,
    pub hemisphere: HemispherePolicy,
    pub shadow_match: ShadowMatchPolicy,
    // Only honoured when built with the `parallel` feature
    pub parallel: bool,
}

impl Default for EstimationConfig {
    fn default() -> Self {
        Self {
            sun_azimuth_deg: DEFAULT_SUN_AZIMUTH_DEG,
            sun_elevation_deg: DEFAULT_SUN_ELEVATION_DEG,
            ray_length_m: DEFAULT_RAY_LENGTH,
            hemisphere: HemispherePolicy::default(),
            shadow_match: ShadowMatchPolicy::default(),
            parallel: false,
        }
    }
}

impl EstimationConfig {
    pub fn with_sun(sun_azimuth_deg: f64, sun_elevation_deg: f64) -> Self {
        Self {
            sun_azimuth_deg,
            sun_elevation_deg,
            ..Self::default()
        }
    }

    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// Reject parameters that cannot produce any number at all.
    ///
    /// Elevations outside (0, 90) are accepted; they only give degenerate heights.
    pub fn validate(&self) -> Result<(), EstimationError> {
        for (name, value) in [
            ("sun azimuth", self.sun_azimuth_deg),
            ("sun elevation", self.sun_elevation_deg),
            ("ray length", self.ray_length_m),
        ] {
            if !value.is_finite() {
                return Err(EstimationError::NonFiniteParameter { name, value });
            }
        }
        if self.ray_length_m <= 0.0 {
            return Err(EstimationError::NonPositiveRayLength(self.ray_length_m));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_form_values() {
        let config = EstimationConfig::default();
        assert_eq!(config.sun_azimuth_deg, 144.5);
        assert_eq!(config.sun_elevation_deg, 34.2);
        assert_eq!(config.ray_length_m, 100.0);
        assert_eq!(config.shadow_match, ShadowMatchPolicy::FirstMatch);
        assert_eq!(config.hemisphere, HemispherePolicy::CentroidLatitude);
    }

    #[test]
    fn partial_json_falls_back_to_defaults() {
        let config = EstimationConfig::from_json(r#"{"sunAzimuthDeg": 120.0, "shadowMatch": "nearest"}"#).unwrap();
        assert_eq!(config.sun_azimuth_deg, 120.0);
        assert_eq!(config.sun_elevation_deg, 34.2);
        assert_eq!(config.shadow_match, ShadowMatchPolicy::Nearest);

        let legacy = EstimationConfig::from_json(r#"{"hemisphere": "northernOnly"}"#).unwrap();
        assert_eq!(legacy.hemisphere, HemispherePolicy::NorthernOnly);
    }

    #[test]
    fn validation() {
        assert!(EstimationConfig::default().validate().is_ok());
        // degenerate but accepted
        assert!(EstimationConfig::with_sun(0.0, -5.0).validate().is_ok());

        let err = EstimationConfig::with_sun(f64::NAN, 30.0).validate().unwrap_err();
        assert!(matches!(err, EstimationError::NonFiniteParameter { name: "sun azimuth", .. }));

        let mut short = EstimationConfig::default();
        short.ray_length_m = 0.0;
        assert_eq!(short.validate().unwrap_err(), EstimationError::NonPositiveRayLength(0.0));
    }
}

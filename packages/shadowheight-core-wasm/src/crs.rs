//! Coordinate reference systems and the UTM zone family.
//!
//! Only WGS84 geographic (EPSG:4326) and the WGS84 UTM zones
//! (EPSG:326xx north, EPSG:327xx south) are supported. Projection
//! definitions come from `proj4rs`, which is pure Rust and builds for wasm32.

use std::fmt;

use proj4rs::proj::Proj;
use serde::{Deserialize, Serialize};

use crate::error::ProjectionError;

pub const WGS84_EPSG: u32 = 4326;
pub const UTM_NORTH_BASE: u32 = 32600;
pub const UTM_SOUTH_BASE: u32 = 32700;

/// A coordinate reference system identified by its EPSG code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Crs {
    /// Longitude/latitude in degrees.
    Geodetic(u32),
    /// Easting/northing in metres.
    Planar(u32),
}

impl Crs {
    pub const WGS84: Crs = Crs::Geodetic(WGS84_EPSG);

    pub fn epsg(&self) -> u32 {
        match self {
            Crs::Geodetic(code) | Crs::Planar(code) => *code,
        }
    }

    pub fn is_planar(&self) -> bool {
        matches!(self, Crs::Planar(_))
    }

    /// Build the `proj4rs` definition for this system.
    pub fn proj(&self) -> Result<Proj, ProjectionError> {
        let code = u16::try_from(self.epsg()).map_err(|_| ProjectionError::UnsupportedEpsg(self.epsg()))?;
        Proj::from_epsg_code(code).map_err(|err| ProjectionError::Definition {
            epsg: self.epsg(),
            reason: err.to_string(),
        })
    }

    /// Resolve an EPSG code into one of the supported systems.
    pub fn from_epsg(epsg: u32) -> Result<Self, ProjectionError> {
        if epsg == WGS84_EPSG {
            Ok(Crs::Geodetic(epsg))
        } else if UtmZone::from_epsg(epsg).is_some() {
            Ok(Crs::Planar(epsg))
        } else {
            Err(ProjectionError::UnsupportedEpsg(epsg))
        }
    }
}

impl fmt::Display for Crs {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "EPSG:{}", self.epsg())
    }
}

/// Which hemisphere variant to use when picking a UTM zone.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum HemispherePolicy {
    /// North for latitude >= 0, south otherwise.
    #[default]
    CentroidLatitude,
    /// Always the northern code, whatever the latitude.
    NorthernOnly,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Hemisphere {
    North,
    South,
}

/// A single 6-degree UTM zone on the WGS84 ellipsoid.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UtmZone {
    pub number: u32,
    pub hemisphere: Hemisphere,
}

impl UtmZone {
    /// Pick the zone containing `(lon, lat)` in degrees.
    pub fn for_lon_lat(lon: f64, lat: f64, policy: HemispherePolicy) -> Result<Self, ProjectionError> {
        if !lon.is_finite() || !lat.is_finite() {
            return Err(ProjectionError::InvalidCentroid { lon, lat });
        }

        // floor((lon + 180) / 6) + 1, longitude 180 folds into zone 60
        let number = (((lon + 180.0) / 6.0).floor() as i64 + 1).clamp(1, 60) as u32;
        let hemisphere = match policy {
            HemispherePolicy::NorthernOnly => Hemisphere::North,
            HemispherePolicy::CentroidLatitude if lat < 0.0 => Hemisphere::South,
            HemispherePolicy::CentroidLatitude => Hemisphere::North,
        };

        Ok(Self { number, hemisphere })
    }

    /// Parse EPSG 326xx / 327xx into a zone.
    pub fn from_epsg(epsg: u32) -> Option<Self> {
        if (UTM_NORTH_BASE + 1..=UTM_NORTH_BASE + 60).contains(&epsg) {
            Some(Self { number: epsg - UTM_NORTH_BASE, hemisphere: Hemisphere::North })
        } else if (UTM_SOUTH_BASE + 1..=UTM_SOUTH_BASE + 60).contains(&epsg) {
            Some(Self { number: epsg - UTM_SOUTH_BASE, hemisphere: Hemisphere::South })
        } else {
            None
        }
    }

    pub fn epsg(&self) -> u32 {
        match self.hemisphere {
            Hemisphere::North => UTM_NORTH_BASE + self.number,
            Hemisphere::South => UTM_SOUTH_BASE + self.number,
        }
    }

    pub fn crs(&self) -> Crs {
        Crs::Planar(self.epsg())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zone_from_longitude() {
        let zone = UtmZone::for_lon_lat(-3.7037, 40.4168, HemispherePolicy::CentroidLatitude).unwrap();
        assert_eq!(zone.number, 30);
        assert_eq!(zone.epsg(), 32630);

        let first = UtmZone::for_lon_lat(-180.0, 10.0, HemispherePolicy::CentroidLatitude).unwrap();
        assert_eq!(first.number, 1);

        let last = UtmZone::for_lon_lat(180.0, 10.0, HemispherePolicy::CentroidLatitude).unwrap();
        assert_eq!(last.number, 60);
    }

    #[test]
    fn southern_centroid_selects_south_code() {
        let zone = UtmZone::for_lon_lat(-58.3816, -34.6037, HemispherePolicy::CentroidLatitude).unwrap();
        assert_eq!(zone.epsg(), 32721);
    }

    #[test]
    fn northern_only_policy_ignores_latitude() {
        let zone = UtmZone::for_lon_lat(-58.3816, -34.6037, HemispherePolicy::NorthernOnly).unwrap();
        assert_eq!(zone.epsg(), 32621);
    }

    #[test]
    fn non_finite_centroid_is_rejected() {
        let err = UtmZone::for_lon_lat(f64::NAN, 0.0, HemispherePolicy::default()).unwrap_err();
        assert!(matches!(err, ProjectionError::InvalidCentroid { .. }));
    }

    #[test]
    fn parse_epsg_codes() {
        assert_eq!(Crs::from_epsg(4326).unwrap(), Crs::WGS84);
        assert_eq!(Crs::from_epsg(32631).unwrap(), Crs::Planar(32631));
        assert_eq!(Crs::from_epsg(32760).unwrap(), Crs::Planar(32760));
        assert!(Crs::from_epsg(32600).is_err());
        assert!(Crs::from_epsg(32661).is_err());
        assert!(Crs::from_epsg(3857).is_err());
    }

    #[test]
    fn definitions_resolve_for_supported_codes() {
        assert!(Crs::WGS84.proj().is_ok());
        assert!(Crs::Planar(32631).proj().is_ok());
        assert!(Crs::Planar(32721).proj().is_ok());
        assert!(matches!(
            Crs::Planar(70_000).proj(),
            Err(ProjectionError::UnsupportedEpsg(70_000))
        ));
    }
}

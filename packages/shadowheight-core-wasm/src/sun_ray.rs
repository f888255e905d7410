use geo::{Coord, Line, Point};

/// Nominal ray length in metres.
pub const DEFAULT_RAY_LENGTH: f64 = 100.0;

/// Segment from `origin` along compass bearing `azimuth_deg` (0 = north, clockwise).
///
/// Planar axes are x = east, y = north.
pub fn project_sun_ray(origin: Point<f64>, azimuth_deg: f64, length: f64) -> Line<f64> {
    let azimuth = azimuth_deg.to_radians();
    let end = Coord {
        x: origin.x() + length * azimuth.sin(),
        y: origin.y() + length * azimuth.cos(),
    };
    Line::new(origin.0, end)
}

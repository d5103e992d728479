use std::fmt;

use geo::{Bearing, Distance, Haversine};
use geo_types::Point;

/// Mean earth radius used by the haversine metric, in meters.
pub const EARTH_RADIUS_M: f64 = 6_371_008.8;

/// Great circle distance in meters. Points are (x = lon, y = lat).
pub fn distance_m(from: Point, to: Point) -> f64 {
    Haversine.distance(from, to)
}

/// Initial bearing in degrees clockwise from north, normalized to [0, 360).
pub fn bearing_deg(from: Point, to: Point) -> f64 {
    normalize_deg(Haversine.bearing(from, to))
}

pub fn normalize_deg(degrees: f64) -> f64 {
    let normalized = degrees.rem_euclid(360.0);
    // rem_euclid can round up to exactly 360 for tiny negative inputs
    if normalized >= 360.0 { 0.0 } else { normalized }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CompassDirection {
    North,
    NorthEast,
    East,
    SouthEast,
    South,
    SouthWest,
    West,
    NorthWest,
}

impl CompassDirection {
    /// Eight 45° sectors, each centred on its compass point.
    pub fn from_bearing(bearing: f64) -> Self {
        const DIRECTIONS: [CompassDirection; 8] = [
            CompassDirection::North,
            CompassDirection::NorthEast,
            CompassDirection::East,
            CompassDirection::SouthEast,
            CompassDirection::South,
            CompassDirection::SouthWest,
            CompassDirection::West,
            CompassDirection::NorthWest,
        ];

        let sector = ((normalize_deg(bearing) + 22.5) / 45.0).floor() as usize % 8;
        DIRECTIONS[sector]
    }

    pub fn abbreviation(&self) -> &'static str {
        match self {
            CompassDirection::North => "N",
            CompassDirection::NorthEast => "NE",
            CompassDirection::East => "E",
            CompassDirection::SouthEast => "SE",
            CompassDirection::South => "S",
            CompassDirection::SouthWest => "SW",
            CompassDirection::West => "W",
            CompassDirection::NorthWest => "NW",
        }
    }
}

impl fmt::Display for CompassDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            CompassDirection::North => "North",
            CompassDirection::NorthEast => "Northeast",
            CompassDirection::East => "East",
            CompassDirection::SouthEast => "Southeast",
            CompassDirection::South => "South",
            CompassDirection::SouthWest => "Southwest",
            CompassDirection::West => "West",
            CompassDirection::NorthWest => "Northwest",
        };
        write!(f, "{}", name)
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    /// Longitude offset that puts a point `meters` east of the origin along the equator.
    pub(crate) fn equator_lon(meters: f64) -> f64 {
        (meters / EARTH_RADIUS_M).to_degrees()
    }

    #[test]
    fn distance_along_equator() {
        let origin = Point::new(0.0, 0.0);
        let east = Point::new(equator_lon(100.0), 0.0);
        assert!((distance_m(origin, east) - 100.0).abs() < 1e-6);
    }

    #[test]
    fn one_thousandth_degree_is_about_111_meters() {
        let d = distance_m(Point::new(0.0, 0.0), Point::new(0.001, 0.0));
        assert!((d - 111.19).abs() < 0.01, "got {}", d);
    }

    #[test]
    fn bearings_of_cardinal_moves() {
        let origin = Point::new(0.0, 0.0);
        assert!(bearing_deg(origin, Point::new(0.0, 1.0)).abs() < 1e-9);
        assert!((bearing_deg(origin, Point::new(1.0, 0.0)) - 90.0).abs() < 1e-9);
        assert!((bearing_deg(origin, Point::new(0.0, -1.0)) - 180.0).abs() < 1e-9);
        assert!((bearing_deg(origin, Point::new(-1.0, 0.0)) - 270.0).abs() < 1e-9);
    }

    #[test]
    fn normalizes_negative_and_large_angles() {
        assert_eq!(normalize_deg(-90.0), 270.0);
        assert_eq!(normalize_deg(720.0), 0.0);
        assert_eq!(normalize_deg(45.0), 45.0);
    }

    #[test]
    fn compass_sectors() {
        assert_eq!(CompassDirection::from_bearing(0.0), CompassDirection::North);
        assert_eq!(CompassDirection::from_bearing(22.4), CompassDirection::North);
        assert_eq!(CompassDirection::from_bearing(22.5), CompassDirection::NorthEast);
        assert_eq!(CompassDirection::from_bearing(180.0), CompassDirection::South);
        assert_eq!(CompassDirection::from_bearing(337.4), CompassDirection::NorthWest);
        assert_eq!(CompassDirection::from_bearing(337.5), CompassDirection::North);
        assert_eq!(CompassDirection::from_bearing(-90.0), CompassDirection::West);
        assert_eq!(CompassDirection::SouthWest.abbreviation(), "SW");
    }
}

use std::fmt;

use geo_types::Point;
use serde::{Deserialize, Serialize};

use crate::geodesy;

/// Precision used by the fitness API route maps (5 decimal places).
pub const POLYLINE_PRECISION: u32 = 5;

// A full lat/lon delta at precision 5 or 6 fits in 7 chunks of 5 bits. Longer values can only
// come from corrupt input and would overflow the decoder's accumulators.
const MAX_CHUNKS_PER_VALUE: usize = 7;

#[derive(Debug, Clone, PartialEq)]
pub enum PolylineError {
    Malformed(String),
    ValueTooLong(usize),
}

impl fmt::Display for PolylineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PolylineError::Malformed(reason) => write!(f, "Malformed polyline: {}", reason),
            PolylineError::ValueTooLong(position) => write!(f, "Polyline value too long at position {}", position),
        }
    }
}

impl std::error::Error for PolylineError {}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Waypoint {
    pub latitude: f64,
    pub longitude: f64,
}

impl Waypoint {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self { latitude, longitude }
    }

    pub fn point(&self) -> Point {
        Point::new(self.longitude, self.latitude)
    }
}

/// An ordered list of waypoints to be visited in sequence. Immutable once built.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Route {
    pub id: i64,
    pub name: String,
    pub total_distance_m: f64,
    waypoints: Vec<Waypoint>,
}

impl Route {
    /// Total distance is the sum of the legs between consecutive waypoints.
    pub fn new(id: i64, name: String, waypoints: Vec<Waypoint>) -> Self {
        let total_distance_m = leg_distances(&waypoints).iter().sum();
        Self {
            id,
            name,
            total_distance_m,
            waypoints,
        }
    }

    /// For routes where the provider reports its own total distance.
    pub fn with_total_distance(id: i64, name: String, waypoints: Vec<Waypoint>, total_distance_m: f64) -> Self {
        Self {
            id,
            name,
            total_distance_m,
            waypoints,
        }
    }

    /// Decodes an encoded polyline (precision 1e5) as shipped by mapping APIs.
    pub fn from_polyline(id: i64, name: String, encoded: &str, total_distance_m: Option<f64>) -> Result<Self, PolylineError> {
        check_value_lengths(encoded)?;
        let line = polyline::decode_polyline(encoded, POLYLINE_PRECISION)
            .map_err(|e| PolylineError::Malformed(e.to_string()))?;
        let waypoints = line.into_iter().map(|c| Waypoint::new(c.y, c.x)).collect();
        Ok(match total_distance_m {
            Some(total) => Self::with_total_distance(id, name, waypoints, total),
            None => Self::new(id, name, waypoints),
        })
    }

    pub fn waypoints(&self) -> &[Waypoint] {
        &self.waypoints
    }

    pub fn len(&self) -> usize {
        self.waypoints.len()
    }

    pub fn is_empty(&self) -> bool {
        self.waypoints.is_empty()
    }
}

// Characters from '_' upwards carry the continuation bit
fn check_value_lengths(encoded: &str) -> Result<(), PolylineError> {
    let mut run = 0;
    for (position, byte) in encoded.bytes().enumerate() {
        if byte >= b'_' {
            run += 1;
            if run >= MAX_CHUNKS_PER_VALUE {
                return Err(PolylineError::ValueTooLong(position));
            }
        } else {
            run = 0;
        }
    }
    Ok(())
}

/// `legs[i]` is the distance from waypoint `i` to waypoint `i + 1`.
pub fn leg_distances(waypoints: &[Waypoint]) -> Vec<f64> {
    waypoints
        .windows(2)
        .map(|pair| geodesy::distance_m(pair[0].point(), pair[1].point()))
        .collect()
}

use chrono::{DateTime, Utc};
use geo_types::Point;
use serde::{Deserialize, Serialize};

/// A single position sample as reported by the location source.
/// Fields the source could not determine are `None` and are left out of any delta math.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PositionFix {
    pub latitude: f64,
    pub longitude: f64,
    pub altitude: Option<f64>,
    pub speed: Option<f64>,
    pub bearing: Option<f64>,
    pub timestamp: DateTime<Utc>,
}

impl PositionFix {
    pub fn new(latitude: f64, longitude: f64, timestamp: DateTime<Utc>) -> Self {
        Self {
            latitude,
            longitude,
            altitude: None,
            speed: None,
            bearing: None,
            timestamp,
        }
    }

    pub fn with_altitude(mut self, altitude: f64) -> Self {
        self.altitude = Some(altitude);
        self
    }

    pub fn with_speed(mut self, speed: f64) -> Self {
        self.speed = Some(speed);
        self
    }

    pub fn with_bearing(mut self, bearing: f64) -> Self {
        self.bearing = Some(bearing);
        self
    }

    /// x = longitude, y = latitude.
    pub fn point(&self) -> Point {
        Point::new(self.longitude, self.latitude)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn point_is_lon_lat() {
        let fix = PositionFix::new(55.5, 10.2, DateTime::default());
        assert_eq!(fix.point().x(), 10.2);
        assert_eq!(fix.point().y(), 55.5);
    }

    #[test]
    fn builders_fill_optional_fields() {
        let fix = PositionFix::new(0.0, 0.0, DateTime::default())
            .with_altitude(12.0)
            .with_speed(3.5)
            .with_bearing(270.0);

        assert_eq!(fix.altitude, Some(12.0));
        assert_eq!(fix.speed, Some(3.5));
        assert_eq!(fix.bearing, Some(270.0));
    }
}

use std::{fmt, fs::File, io::{BufReader, Read}, path::Path, str::FromStr};

use chrono::{DateTime, Utc};
use trip_metrics_lib::{
    position_fix::PositionFix,
    route::{Route, Waypoint},
};

#[derive(Debug)]
pub enum ImportError {
    Io(String),
    Gpx(String),
    MissingTime(usize),
    InvalidTime(String),
    NoPoints,
}

impl fmt::Display for ImportError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ImportError::Io(reason) => write!(f, "Failed to open GPX file: {}", reason),
            ImportError::Gpx(reason) => write!(f, "Failed to parse GPX: {}", reason),
            ImportError::MissingTime(index) => write!(f, "Track point {} has no time", index),
            ImportError::InvalidTime(reason) => write!(f, "Invalid track point time: {}", reason),
            ImportError::NoPoints => write!(f, "GPX file contains no points"),
        }
    }
}

impl std::error::Error for ImportError {}

/// Every track point of every track and segment, in file order.
pub fn read_track<R: Read>(reader: R) -> Result<Vec<PositionFix>, ImportError> {
    let gpx = gpx::read(reader).map_err(|e| ImportError::Gpx(e.to_string()))?;

    let mut fixes = Vec::new();
    for track in gpx.tracks {
        for segment in track.segments {
            for point in segment.points {
                let time = point.time.ok_or(ImportError::MissingTime(fixes.len()))?;
                let formatted = time.format().map_err(|e| ImportError::InvalidTime(e.to_string()))?;
                let timestamp = DateTime::<Utc>::from_str(&formatted).map_err(|e| ImportError::InvalidTime(e.to_string()))?;

                let position = point.point();
                let mut fix = PositionFix::new(position.y(), position.x(), timestamp);
                fix.altitude = point.elevation;
                fix.speed = point.speed;
                fixes.push(fix);
            }
        }
    }

    if fixes.is_empty() {
        return Err(ImportError::NoPoints);
    }
    Ok(fixes)
}

/// The first `<rte>` of the file, or the points of its first track when it has no routes.
/// Route distance is computed from the waypoints.
pub fn read_route<R: Read>(reader: R, id: i64) -> Result<Route, ImportError> {
    let gpx = gpx::read(reader).map_err(|e| ImportError::Gpx(e.to_string()))?;

    let (name, points) = if let Some(route) = gpx.routes.into_iter().next() {
        (route.name, route.points)
    } else if let Some(track) = gpx.tracks.into_iter().next() {
        (track.name, track.segments.into_iter().flat_map(|segment| segment.points).collect())
    } else {
        return Err(ImportError::NoPoints);
    };

    let waypoints: Vec<Waypoint> = points
        .iter()
        .map(|point| {
            let position = point.point();
            Waypoint::new(position.y(), position.x())
        })
        .collect();

    if waypoints.is_empty() {
        return Err(ImportError::NoPoints);
    }

    Ok(Route::new(id, name.unwrap_or_else(|| "Unnamed".to_string()), waypoints))
}

pub fn read_track_file(path: &Path) -> Result<Vec<PositionFix>, ImportError> {
    let file = File::open(path).map_err(|e| ImportError::Io(format!("{:?}: {}", path, e)))?;
    read_track(BufReader::new(file))
}

pub fn read_route_file(path: &Path, id: i64) -> Result<Route, ImportError> {
    let file = File::open(path).map_err(|e| ImportError::Io(format!("{:?}: {}", path, e)))?;
    read_route(BufReader::new(file), id)
}

#[cfg(test)]
mod tests {
    use super::*;

    const TRACK: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<gpx version="1.1" creator="trip_metrics" xmlns="http://www.topografix.com/GPX/1/1">
  <trk>
    <name>Harbour run</name>
    <trkseg>
      <trkpt lat="56.1500" lon="10.2100"><ele>12.5</ele><time>2024-05-01T08:00:00Z</time></trkpt>
      <trkpt lat="56.1505" lon="10.2110"><ele>14.0</ele><time>2024-05-01T08:00:10Z</time></trkpt>
    </trkseg>
    <trkseg>
      <trkpt lat="56.1510" lon="10.2120"><time>2024-05-01T08:00:20Z</time></trkpt>
    </trkseg>
  </trk>
</gpx>"#;

    const ROUTE: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<gpx version="1.1" creator="trip_metrics" xmlns="http://www.topografix.com/GPX/1/1">
  <rte>
    <name>Loop</name>
    <rtept lat="0.0" lon="0.0"></rtept>
    <rtept lat="0.0" lon="0.001"></rtept>
    <rtept lat="0.0" lon="0.002"></rtept>
  </rte>
</gpx>"#;

    #[test]
    fn reads_track_points_across_segments() {
        let fixes = read_track(TRACK.as_bytes()).unwrap();

        assert_eq!(fixes.len(), 3);
        assert_eq!(fixes[0].latitude, 56.15);
        assert_eq!(fixes[0].longitude, 10.21);
        assert_eq!(fixes[0].altitude, Some(12.5));
        assert_eq!(fixes[2].altitude, None);
        assert_eq!(fixes[1].timestamp.to_rfc3339(), "2024-05-01T08:00:10+00:00");
    }

    #[test]
    fn reads_route_waypoints() {
        let route = read_route(ROUTE.as_bytes(), 42).unwrap();

        assert_eq!(route.id, 42);
        assert_eq!(route.name, "Loop");
        assert_eq!(route.len(), 3);
        assert_eq!(route.waypoints()[1], Waypoint::new(0.0, 0.001));
        assert!((route.total_distance_m - 222.39).abs() < 0.01);
    }

    #[test]
    fn track_can_serve_as_route() {
        let route = read_route(TRACK.as_bytes(), 1).unwrap();
        assert_eq!(route.name, "Harbour run");
        assert_eq!(route.len(), 3);
    }

    #[test]
    fn track_points_need_time() {
        let untimed = TRACK.replace("<time>2024-05-01T08:00:10Z</time>", "");
        assert!(matches!(read_track(untimed.as_bytes()), Err(ImportError::MissingTime(1))));
    }

    #[test]
    fn route_file_without_points_is_rejected() {
        assert!(matches!(read_track(ROUTE.as_bytes()), Err(ImportError::NoPoints)));
    }

    #[test]
    fn missing_file_is_an_io_error() {
        assert!(matches!(
            read_track_file(Path::new("/nonexistent/track.gpx")),
            Err(ImportError::Io(_))
        ));
    }
}

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{activity::ActivityType, position_fix::PositionFix};

/// The finalized record of a stopped session, in the shape the activity uploader expects.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActivitySummary {
    pub name: String,
    #[serde(rename = "type")]
    pub activity_type: ActivityType,
    #[serde(with = "start_date_format")]
    pub start_date: DateTime<Utc>,
    /// Whole seconds, pauses excluded.
    pub elapsed_time: i64,
    pub distance: f64,
    pub total_elevation_gain: f64,
    pub latlng: Vec<[f64; 2]>,
    /// Seconds since `start_date`, one per `latlng` entry.
    pub time: Vec<i64>,
    /// Only fixes that reported an altitude contribute here.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub altitude: Vec<f64>,
}

impl ActivitySummary {
    pub fn new(
        activity_type: ActivityType,
        start_date: DateTime<Utc>,
        elapsed_time: i64,
        distance: f64,
        total_elevation_gain: f64,
        samples: &[PositionFix],
    ) -> Self {
        let latlng = samples.iter().map(|fix| [fix.latitude, fix.longitude]).collect();
        let time = samples
            .iter()
            .map(|fix| fix.timestamp.signed_duration_since(start_date).num_seconds())
            .collect();
        let altitude = samples.iter().filter_map(|fix| fix.altitude).collect();

        Self {
            name: format!("{} activity", activity_type),
            activity_type,
            start_date,
            elapsed_time,
            distance,
            total_elevation_gain,
            latlng,
            time,
            altitude,
        }
    }

    pub fn with_name(mut self, name: String) -> Self {
        self.name = name;
        self
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

mod start_date_format {
    use chrono::{DateTime, SecondsFormat, Utc};
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(date: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&date.to_rfc3339_opts(SecondsFormat::Secs, true))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<DateTime<Utc>, D::Error> {
        let s = String::deserialize(deserializer)?;
        DateTime::parse_from_rfc3339(&s)
            .map(|date| date.with_timezone(&Utc))
            .map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeDelta;
    use serde_json::json;

    use super::*;

    fn start() -> DateTime<Utc> {
        DateTime::parse_from_rfc3339("2024-05-01T08:00:00Z").unwrap().with_timezone(&Utc)
    }

    #[test]
    fn serializes_upload_fields() {
        let samples = [
            PositionFix::new(55.0, 10.0, start() + TimeDelta::milliseconds(1500)).with_altitude(12.0),
            PositionFix::new(55.001, 10.0, start() + TimeDelta::seconds(10)),
        ];
        let summary = ActivitySummary::new(ActivityType::Ride, start(), 600, 111.2, 4.0, &samples);

        let value: serde_json::Value = serde_json::from_str(&summary.to_json().unwrap()).unwrap();
        assert_eq!(
            value,
            json!({
                "name": "Ride activity",
                "type": "Ride",
                "start_date": "2024-05-01T08:00:00Z",
                "elapsed_time": 600,
                "distance": 111.2,
                "total_elevation_gain": 4.0,
                "latlng": [[55.0, 10.0], [55.001, 10.0]],
                "time": [1, 10],
                "altitude": [12.0],
            })
        );
    }

    #[test]
    fn altitude_is_omitted_when_no_fix_reported_one() {
        let samples = [PositionFix::new(1.0, 2.0, start())];
        let summary = ActivitySummary::new(ActivityType::Walk, start(), 0, 0.0, 0.0, &samples)
            .with_name("Lunch walk".into());

        let value: serde_json::Value = serde_json::from_str(&summary.to_json().unwrap()).unwrap();
        assert!(value.get("altitude").is_none());
        assert_eq!(value["name"], "Lunch walk");

        let parsed: ActivitySummary = serde_json::from_value(value).unwrap();
        assert_eq!(parsed, summary);
    }
}

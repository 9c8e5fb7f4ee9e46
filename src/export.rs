//! Export / import document
//!
//! The interchange format is a JSON object with three members:
//!
//! ```json
//! {
//!   "userStats": { "runnerLevel": 2, "enduranceLevel": 1, "speedLevel": 1,
//!                  "totalWorkouts": 5, "totalDistance": 4.2, "totalTime": 3600.0 },
//!   "workouts": [ { "date": "2025-03-01T07:30:00Z", "averageSpeed": 6.1,
//!                   "peakSpeed": 8.4, "distance": 1.2, "time": 900.0,
//!                   "route": [ { "latitude": 40.0, "longitude": -74.0 } ] } ],
//!   "infoDict": { "note": "free-form" }
//! }
//! ```
//!
//! The "obfuscated" variant is the same JSON text, base64 encoded. It is a
//! transport encoding only.

use base64::{engine::general_purpose, Engine as _};
use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::error::TrackerError;
use crate::types::{Coordinate, UserStats, WorkoutRecord};

/// Free-form string annotations carried alongside the data
pub type InfoMap = BTreeMap<String, String>;

/// One workout as it appears in the export document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportedWorkout {
    /// ISO-8601 timestamp
    pub date: String,
    pub average_speed: f64,
    pub peak_speed: f64,
    pub distance: f64,
    pub time: f64,
    pub route: Vec<Coordinate>,
}

impl From<&WorkoutRecord> for ExportedWorkout {
    fn from(workout: &WorkoutRecord) -> Self {
        Self {
            date: workout.date.to_rfc3339_opts(SecondsFormat::Secs, true),
            average_speed: workout.average_speed,
            peak_speed: workout.peak_speed,
            distance: workout.distance,
            time: workout.time,
            route: workout.route.clone(),
        }
    }
}

impl ExportedWorkout {
    fn to_record(&self, index: usize) -> Result<WorkoutRecord, TrackerError> {
        let date = DateTime::parse_from_rfc3339(&self.date)
            .map_err(|e| {
                TrackerError::ImportError(format!(
                    "workout {index}: invalid date '{}': {e}",
                    self.date
                ))
            })?
            .with_timezone(&Utc);
        Ok(WorkoutRecord::new(
            date,
            self.average_speed,
            self.peak_speed,
            self.distance,
            self.time,
            self.route.clone(),
        ))
    }
}

/// The complete export document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportDocument {
    pub user_stats: UserStats,
    pub workouts: Vec<ExportedWorkout>,
    pub info_dict: InfoMap,
}

/// Fully decoded import, ready to be applied in one step
#[derive(Debug, Clone, PartialEq)]
pub struct ImportedData {
    pub stats: UserStats,
    pub workouts: Vec<WorkoutRecord>,
    pub info: InfoMap,
}

impl ExportDocument {
    pub fn new(stats: &UserStats, workouts: &[WorkoutRecord], info: &InfoMap) -> Self {
        Self {
            user_stats: stats.clone(),
            workouts: workouts.iter().map(ExportedWorkout::from).collect(),
            info_dict: info.clone(),
        }
    }

    /// Pretty-printed JSON
    pub fn to_json(&self) -> Result<String, TrackerError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Base64 of the pretty-printed JSON
    pub fn to_base64(&self) -> Result<String, TrackerError> {
        Ok(general_purpose::STANDARD.encode(self.to_json()?))
    }

    pub fn from_json(json: &str) -> Result<Self, TrackerError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn from_base64(encoded: &str) -> Result<Self, TrackerError> {
        let bytes = general_purpose::STANDARD.decode(encoded.trim())?;
        let json = String::from_utf8(bytes)
            .map_err(|e| TrackerError::ImportError(format!("payload is not UTF-8: {e}")))?;
        Self::from_json(&json)
    }

    /// Decode every workout. Fails on the first bad record so nothing is
    /// half-imported.
    pub fn decode(&self) -> Result<ImportedData, TrackerError> {
        check_stats(&self.user_stats)?;
        let workouts = self
            .workouts
            .iter()
            .enumerate()
            .map(|(index, w)| w.to_record(index))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(ImportedData {
            stats: self.user_stats.clone(),
            workouts,
            info: self.info_dict.clone(),
        })
    }
}

// Levels start at 1; totals are finite and non-negative
fn check_stats(stats: &UserStats) -> Result<(), TrackerError> {
    let levels = [
        ("runnerLevel", stats.runner_level),
        ("enduranceLevel", stats.endurance_level),
        ("speedLevel", stats.speed_level),
    ];
    for (name, level) in levels {
        if level < 1 {
            return Err(TrackerError::ImportError(format!(
                "userStats.{name} must be at least 1, got {level}"
            )));
        }
    }
    for (name, total) in [
        ("totalDistance", stats.total_distance),
        ("totalTime", stats.total_time),
    ] {
        if !total.is_finite() || total < 0.0 {
            return Err(TrackerError::ImportError(format!(
                "userStats.{name} must be a non-negative number, got {total}"
            )));
        }
    }
    Ok(())
}

/// Either encoding, detected from the first non-blank character
pub fn parse_any(input: &str) -> Result<ExportDocument, TrackerError> {
    if input.trim_start().starts_with('{') {
        ExportDocument::from_json(input)
    } else {
        ExportDocument::from_base64(input)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use pretty_assertions::assert_eq;

    fn sample_workouts() -> Vec<WorkoutRecord> {
        vec![
            WorkoutRecord::new(
                Utc.with_ymd_and_hms(2025, 3, 1, 7, 30, 0).unwrap(),
                6.123456789,
                8.987654321,
                1.2345678901234567,
                612.34,
                vec![
                    Coordinate::new(40.712776, -74.005974),
                    Coordinate::new(40.7128001234567, -74.0059123456789),
                ],
            ),
            WorkoutRecord::new(
                Utc.with_ymd_and_hms(2025, 3, 2, 18, 0, 5).unwrap(),
                0.1 + 0.2,
                1.0 / 3.0,
                0.0,
                900.0,
                vec![],
            ),
        ]
    }

    fn sample_document() -> ExportDocument {
        let stats = UserStats {
            runner_level: 2,
            total_workouts: 5,
            total_distance: 12.75,
            total_time: 4321.5,
            ..UserStats::default()
        };
        let mut info = InfoMap::new();
        info.insert("shoe".to_string(), "trail".to_string());
        ExportDocument::new(&stats, &sample_workouts(), &info)
    }

    #[test]
    fn test_field_names() {
        let json = sample_document().to_json().unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();

        assert_eq!(value["userStats"]["runnerLevel"], 2);
        assert_eq!(value["userStats"]["totalTime"], 4321.5);
        assert_eq!(value["workouts"][0]["date"], "2025-03-01T07:30:00Z");
        assert_eq!(value["workouts"][0]["route"][0]["latitude"], 40.712776);
        assert!(value["workouts"][0].get("averageSpeed").is_some());
        assert!(value["workouts"][0].get("id").is_none());
        assert_eq!(value["infoDict"]["shoe"], "trail");
    }

    #[test]
    fn test_roundtrip_preserves_values_and_order() {
        let original = sample_workouts();
        let json = sample_document().to_json().unwrap();
        let imported = ExportDocument::from_json(&json).unwrap().decode().unwrap();

        assert_eq!(imported.workouts.len(), original.len());
        for (a, b) in original.iter().zip(&imported.workouts) {
            assert_eq!(a.date, b.date);
            assert_eq!(a.average_speed.to_bits(), b.average_speed.to_bits());
            assert_eq!(a.peak_speed.to_bits(), b.peak_speed.to_bits());
            assert_eq!(a.distance.to_bits(), b.distance.to_bits());
            assert_eq!(a.time.to_bits(), b.time.to_bits());
            assert_eq!(a.route, b.route);
        }
        assert_eq!(imported.stats.total_distance, 12.75);
        assert_eq!(imported.info["shoe"], "trail");
    }

    #[test]
    fn test_base64_variant() {
        let document = sample_document();
        let encoded = document.to_base64().unwrap();
        assert!(!encoded.contains('{'));

        let decoded = ExportDocument::from_base64(&format!("{encoded}\n")).unwrap();
        assert_eq!(decoded, document);
        assert_eq!(parse_any(&encoded).unwrap(), document);
        assert_eq!(parse_any(&document.to_json().unwrap()).unwrap(), document);
    }

    #[test]
    fn test_missing_field_rejected() {
        let json = r#"{
            "userStats": {"runnerLevel": 1, "enduranceLevel": 1, "speedLevel": 1,
                          "totalWorkouts": 1, "totalDistance": 1.0, "totalTime": 60.0},
            "workouts": [{"date": "2025-03-01T07:30:00Z", "averageSpeed": 1.0,
                          "distance": 1.0, "time": 60.0, "route": []}],
            "infoDict": {}
        }"#;
        assert!(matches!(
            ExportDocument::from_json(json),
            Err(TrackerError::JsonError(_))
        ));
    }

    #[test]
    fn test_bad_date_rejects_whole_import() {
        let mut document = sample_document();
        document.workouts[1].date = "yesterday".to_string();
        assert!(matches!(document.decode(), Err(TrackerError::ImportError(_))));
    }

    #[test]
    fn test_invalid_stats_reject_whole_import() {
        let mut document = sample_document();
        document.user_stats.runner_level = 0;
        match document.decode() {
            Err(TrackerError::ImportError(msg)) => assert!(msg.contains("runnerLevel")),
            other => panic!("expected import error, got {other:?}"),
        }

        let mut document = sample_document();
        document.user_stats.total_distance = -5.0;
        match document.decode() {
            Err(TrackerError::ImportError(msg)) => assert!(msg.contains("totalDistance")),
            other => panic!("expected import error, got {other:?}"),
        }

        let json = r#"{
            "userStats": {"runnerLevel": 1, "enduranceLevel": 0, "speedLevel": 1,
                          "totalWorkouts": 0, "totalDistance": 0, "totalTime": 0},
            "workouts": [],
            "infoDict": {}
        }"#;
        let document = ExportDocument::from_json(json).unwrap();
        assert!(matches!(document.decode(), Err(TrackerError::ImportError(_))));
    }

    #[test]
    fn test_garbage_base64_rejected() {
        assert!(matches!(
            ExportDocument::from_base64("***not base64***"),
            Err(TrackerError::Base64Error(_))
        ));
    }

    #[test]
    fn test_integer_totals_accepted() {
        let json = r#"{
            "userStats": {"runnerLevel": 3, "enduranceLevel": 2, "speedLevel": 4,
                          "totalWorkouts": 11, "totalDistance": 20, "totalTime": 7200},
            "workouts": [],
            "infoDict": {}
        }"#;
        let imported = ExportDocument::from_json(json).unwrap().decode().unwrap();
        assert_eq!(imported.stats.total_distance, 20.0);
        assert_eq!(imported.stats.speed_level, 4);
    }
}

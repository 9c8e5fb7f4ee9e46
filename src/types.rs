//! Core types for the CRDO tracking engine
//!
//! This module defines the values that flow between the engine stages:
//! raw location samples, smoothed coordinates, session states, finished
//! workout records and the cumulative user statistics.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Metres per statute mile
pub const METERS_PER_MILE: f64 = 1609.34;

/// Conversion factor from metres per second to miles per hour
pub const MPS_TO_MPH: f64 = 2.237;

/// A WGS84 position in decimal degrees
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinate {
    pub latitude: f64,
    pub longitude: f64,
}

impl Coordinate {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }
}

/// One reading from the location source
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LocationSample {
    /// Reported position
    pub coordinate: Coordinate,
    /// Instantaneous ground speed in m/s; negative when the sensor has no fix
    pub speed_mps: f64,
    /// When the reading was taken
    pub timestamp: DateTime<Utc>,
}

impl LocationSample {
    pub fn new(coordinate: Coordinate, speed_mps: f64, timestamp: DateTime<Utc>) -> Self {
        Self {
            coordinate,
            speed_mps,
            timestamp,
        }
    }

    /// Speed converted to mph, or `None` when the reading is unavailable
    pub fn speed_mph(&self) -> Option<f64> {
        if self.speed_mps.is_nan() || self.speed_mps < 0.0 {
            None
        } else {
            Some(self.speed_mps * MPS_TO_MPH)
        }
    }
}

/// Lifecycle state of a workout session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum SessionState {
    Idle,
    /// Pre-start countdown; `remaining == 0` is the "go" signal
    Countdown { remaining: u32 },
    Running,
    Paused,
    Ended,
}

impl SessionState {
    /// Whether the session is between start and end
    pub fn is_active(&self) -> bool {
        matches!(
            self,
            SessionState::Countdown { .. } | SessionState::Running | SessionState::Paused
        )
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SessionState::Idle => write!(f, "idle"),
            SessionState::Countdown { remaining: 0 } => write!(f, "countdown (go)"),
            SessionState::Countdown { remaining } => write!(f, "countdown ({remaining}s)"),
            SessionState::Running => write!(f, "running"),
            SessionState::Paused => write!(f, "paused"),
            SessionState::Ended => write!(f, "ended"),
        }
    }
}

/// A finished workout, emitted once when a session ends
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkoutRecord {
    #[serde(default = "Uuid::new_v4")]
    pub id: Uuid,
    /// Time the session ended
    pub date: DateTime<Utc>,
    /// Average speed (mph)
    pub average_speed: f64,
    /// Peak speed (mph)
    pub peak_speed: f64,
    /// Distance (miles)
    pub distance: f64,
    /// Elapsed running time (seconds)
    pub time: f64,
    /// Smoothed route
    pub route: Vec<Coordinate>,
}

impl WorkoutRecord {
    pub fn new(
        date: DateTime<Utc>,
        average_speed: f64,
        peak_speed: f64,
        distance: f64,
        time: f64,
        route: Vec<Coordinate>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            date,
            average_speed,
            peak_speed,
            distance,
            time,
            route,
        }
    }

    /// Average pace in minutes per mile, if any distance was covered
    pub fn pace_min_per_mile(&self) -> Option<f64> {
        if self.distance > 0.0 {
            Some(self.time / 60.0 / self.distance)
        } else {
            None
        }
    }
}

/// Cumulative progression statistics
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserStats {
    pub runner_level: u32,
    pub endurance_level: u32,
    pub speed_level: u32,
    pub total_workouts: u32,
    /// Total distance (miles)
    pub total_distance: f64,
    /// Total time (seconds)
    pub total_time: f64,
}

impl Default for UserStats {
    fn default() -> Self {
        Self {
            runner_level: 1,
            endurance_level: 1,
            speed_level: 1,
            total_workouts: 0,
            total_distance: 0.0,
            total_time: 0.0,
        }
    }
}

/// Distance bucket used to tag workouts in the history
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum WorkoutCategory {
    #[serde(rename = "Short Run")]
    Short,
    #[serde(rename = "1 Mile")]
    OneMile,
    #[serde(rename = "3K")]
    ThreeK,
    #[serde(rename = "5K")]
    FiveK,
    #[serde(rename = "10K")]
    TenK,
    #[serde(rename = "Half Marathon")]
    HalfMarathon,
    #[serde(rename = "Marathon")]
    Marathon,
    #[serde(rename = "Ultra")]
    Ultra,
}

impl WorkoutCategory {
    pub const ALL: [WorkoutCategory; 8] = [
        WorkoutCategory::Short,
        WorkoutCategory::OneMile,
        WorkoutCategory::ThreeK,
        WorkoutCategory::FiveK,
        WorkoutCategory::TenK,
        WorkoutCategory::HalfMarathon,
        WorkoutCategory::Marathon,
        WorkoutCategory::Ultra,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            WorkoutCategory::Short => "Short Run",
            WorkoutCategory::OneMile => "1 Mile",
            WorkoutCategory::ThreeK => "3K",
            WorkoutCategory::FiveK => "5K",
            WorkoutCategory::TenK => "10K",
            WorkoutCategory::HalfMarathon => "Half Marathon",
            WorkoutCategory::Marathon => "Marathon",
            WorkoutCategory::Ultra => "Ultra",
        }
    }
}

impl fmt::Display for WorkoutCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Which distance table to use when classifying workouts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CategoryBoundaries {
    /// Non-overlapping ranges built from standard race distances
    #[default]
    Standard,
    /// The historical table, reproduced exactly (overlapping ranges included)
    Legacy,
}

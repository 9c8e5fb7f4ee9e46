//! Per-sample route pipeline
//!
//! Every location sample accepted by a running session passes through the
//! same stages, in order:
//!
//! 1. `GeoSmoother` - reject jitter, produce the route point
//! 2. `DistanceAccumulator` - integrate the smoothed point into miles
//! 3. `SpeedTracker` - fold the raw speed into current/average/peak
//!
//! The pipeline owns the route, so a session's aggregates live and die with it.

use crate::distance::DistanceAccumulator;
use crate::smoother::GeoSmoother;
use crate::speed::SpeedTracker;
use crate::types::{Coordinate, LocationSample};

/// What a single sample contributed to the session
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StageOutput {
    /// Smoothed point appended to the route
    pub point: Coordinate,
    /// Miles added to the running total
    pub delta_miles: f64,
    /// Current speed after this sample (mph)
    pub speed_mph: f64,
}

#[derive(Debug, Clone)]
pub struct RoutePipeline {
    smoother: GeoSmoother,
    distance: DistanceAccumulator,
    speed: SpeedTracker,
    route: Vec<Coordinate>,
}

impl Default for RoutePipeline {
    fn default() -> Self {
        Self::new(GeoSmoother::default())
    }
}

impl RoutePipeline {
    pub fn new(smoother: GeoSmoother) -> Self {
        Self {
            smoother,
            distance: DistanceAccumulator::new(),
            speed: SpeedTracker::new(),
            route: Vec::new(),
        }
    }

    /// Create a pipeline whose smoother keeps `window` fixes
    pub fn with_smoothing_window(window: usize) -> Self {
        Self::new(GeoSmoother::new(window))
    }

    /// Run one sample through all stages
    pub fn process(&mut self, sample: &LocationSample) -> StageOutput {
        // Stage 1: smooth the raw fix
        let point = self.smoother.smooth(sample.coordinate, sample.speed_mps);

        // Stage 2: integrate distance along the smoothed route
        let delta_miles = self.distance.push(point);

        // Stage 3: speed statistics (unavailable speed records as invalid)
        self.speed.record(sample.speed_mph().unwrap_or(-1.0));

        self.route.push(point);

        StageOutput {
            point,
            delta_miles,
            speed_mph: self.speed.current_mph(),
        }
    }

    pub fn route(&self) -> &[Coordinate] {
        &self.route
    }

    pub fn distance_miles(&self) -> f64 {
        self.distance.total_miles()
    }

    pub fn speed(&self) -> &SpeedTracker {
        &self.speed
    }

    /// Drop all state from a previous session
    pub fn reset(&mut self) {
        self.smoother.reset();
        self.distance.reset();
        self.speed.reset();
        self.route.clear();
    }

    /// Consume the pipeline, handing over the route
    pub fn into_route(self) -> Vec<Coordinate> {
        self.route
    }
}

//! Route smoothing
//!
//! GPS fixes jitter by several metres even when the runner stands still.
//! The smoother keeps a short rolling history of raw fixes and emits a
//! recency-weighted average, switching to a plain mean of the latest fixes
//! when the sensor reports walking-pace speeds or no speed at all.

use std::collections::VecDeque;

use crate::config::DEFAULT_SMOOTHING_WINDOW;
use crate::types::Coordinate;

/// Minimum buffered fixes before smoothing kicks in
pub const MIN_POINTS_FOR_SMOOTHING: usize = 3;

/// Below this raw speed (m/s) the fix is treated as stationary noise
pub const STATIONARY_SPEED_MPS: f64 = 1.0;

/// Number of recent fixes averaged in the stationary regime
pub const STATIONARY_WINDOW: usize = 5;

/// Rolling-window coordinate smoother
#[derive(Debug, Clone)]
pub struct GeoSmoother {
    history: VecDeque<Coordinate>,
    window_size: usize,
}

impl Default for GeoSmoother {
    fn default() -> Self {
        Self::new(DEFAULT_SMOOTHING_WINDOW)
    }
}

impl GeoSmoother {
    pub fn new(window_size: usize) -> Self {
        Self {
            history: VecDeque::with_capacity(window_size),
            window_size,
        }
    }

    /// Push a raw fix and return the smoothed coordinate for it.
    ///
    /// `raw_speed_mps` is the sensor's instantaneous speed; negative values
    /// (no speed available) count as stationary.
    pub fn smooth(&mut self, coordinate: Coordinate, raw_speed_mps: f64) -> Coordinate {
        self.history.push_back(coordinate);
        while self.history.len() > self.window_size {
            self.history.pop_front();
        }

        if self.history.len() < MIN_POINTS_FOR_SMOOTHING {
            return coordinate;
        }

        if raw_speed_mps.is_nan() || raw_speed_mps < STATIONARY_SPEED_MPS {
            return self.recent_mean(STATIONARY_WINDOW);
        }

        self.weighted_mean()
    }

    /// Weighted mean where the i-th oldest fix has weight i + 1
    fn weighted_mean(&self) -> Coordinate {
        let mut total_weight = 0.0;
        let mut lat = 0.0;
        let mut lon = 0.0;
        for (index, point) in self.history.iter().enumerate() {
            let weight = (index + 1) as f64;
            total_weight += weight;
            lat += point.latitude * weight;
            lon += point.longitude * weight;
        }
        Coordinate::new(lat / total_weight, lon / total_weight)
    }

    fn recent_mean(&self, count: usize) -> Coordinate {
        let skip = self.history.len().saturating_sub(count);
        let recent = self.history.iter().skip(skip);
        let n = (self.history.len() - skip) as f64;
        let (lat, lon) = recent.fold((0.0, 0.0), |(lat, lon), p| {
            (lat + p.latitude, lon + p.longitude)
        });
        Coordinate::new(lat / n, lon / n)
    }

    pub fn len(&self) -> usize {
        self.history.len()
    }

    pub fn is_empty(&self) -> bool {
        self.history.is_empty()
    }

    pub fn reset(&mut self) {
        self.history.clear();
    }
}

//! Distance integration over consecutive route points

use crate::types::{Coordinate, METERS_PER_MILE};

/// Mean Earth radius (metres)
pub const EARTH_RADIUS_M: f64 = 6_371_000.0;

/// Great-circle distance between two coordinates in metres (haversine)
pub fn haversine_meters(a: Coordinate, b: Coordinate) -> f64 {
    let dlat = (b.latitude - a.latitude).to_radians();
    let dlon = (b.longitude - a.longitude).to_radians();
    let h = (dlat / 2.0).sin().powi(2)
        + a.latitude.to_radians().cos()
            * b.latitude.to_radians().cos()
            * (dlon / 2.0).sin().powi(2);
    let c = 2.0 * h.sqrt().atan2((1.0 - h).sqrt());
    EARTH_RADIUS_M * c
}

/// Running distance total
#[derive(Debug, Clone, Default)]
pub struct DistanceAccumulator {
    last: Option<Coordinate>,
    total_miles: f64,
}

impl DistanceAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Miles between `previous` and `current`; zero when there is no previous point
    pub fn accumulate(previous: Option<Coordinate>, current: Coordinate) -> f64 {
        match previous {
            Some(prev) => haversine_meters(prev, current) / METERS_PER_MILE,
            None => 0.0,
        }
    }

    /// Add `current` to the route and return the distance it contributed
    pub fn push(&mut self, current: Coordinate) -> f64 {
        let delta = Self::accumulate(self.last, current);
        self.total_miles += delta;
        self.last = Some(current);
        delta
    }

    pub fn total_miles(&self) -> f64 {
        self.total_miles
    }

    pub fn last_point(&self) -> Option<Coordinate> {
        self.last
    }

    pub fn reset(&mut self) {
        self.last = None;
        self.total_miles = 0.0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn within(actual: f64, expected: f64, tolerance: f64) -> bool {
        ((actual - expected) / expected).abs() <= tolerance
    }

    #[test]
    fn test_same_point_is_zero() {
        let a = Coordinate::new(37.3349, -122.00902);
        assert_eq!(DistanceAccumulator::accumulate(Some(a), a), 0.0);
    }

    #[test]
    fn test_first_point_is_baseline_only() {
        let mut acc = DistanceAccumulator::new();
        assert_eq!(acc.push(Coordinate::new(10.0, 10.0)), 0.0);
        assert_eq!(acc.total_miles(), 0.0);
        assert_eq!(acc.last_point(), Some(Coordinate::new(10.0, 10.0)));
    }

    #[test]
    fn test_one_degree_of_latitude() {
        // ~111.195 km on a 6371 km sphere
        let d = haversine_meters(Coordinate::new(0.0, 0.0), Coordinate::new(1.0, 0.0));
        assert!(within(d, 111_195.0, 0.005));
    }

    #[test]
    fn test_london_to_paris() {
        let london = Coordinate::new(51.5074, -0.1278);
        let paris = Coordinate::new(48.8566, 2.3522);
        let miles = DistanceAccumulator::accumulate(Some(london), paris);
        // reference great-circle distance ~213.5 miles
        assert!(within(miles, 213.5, 0.005));
    }

    #[test]
    fn test_accumulates_segments() {
        let mut acc = DistanceAccumulator::new();
        acc.push(Coordinate::new(0.0, 0.0));
        let first = acc.push(Coordinate::new(0.01, 0.0));
        let second = acc.push(Coordinate::new(0.02, 0.0));
        assert!((acc.total_miles() - (first + second)).abs() < 1e-12);
        assert!(within(acc.total_miles(), 1.3818, 0.005));

        acc.reset();
        assert_eq!(acc.total_miles(), 0.0);
        assert_eq!(acc.last_point(), None);
    }
}

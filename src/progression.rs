//! Levels and workout categories
//!
//! Levels are derived from cumulative totals and only ever move up. The
//! engine owns the `UserStats` aggregate and is the only thing that mutates it.

use tracing::info;

use crate::types::{CategoryBoundaries, UserStats, WorkoutCategory, WorkoutRecord};

/// Highest reachable level
pub const MAX_LEVEL: u32 = 99;

/// Workouts per runner level
pub const WORKOUTS_PER_RUNNER_LEVEL: u32 = 5;

/// Miles per endurance level
pub const MILES_PER_ENDURANCE_LEVEL: f64 = 10.0;

/// Miles per speed level
pub const MILES_PER_SPEED_LEVEL: f64 = 5.0;

/// Experience needed to complete `level`
pub fn experience_for_level(level: u32) -> u64 {
    u64::from(level) * 100
}

/// Progress through `level` for the given experience, clamped to 0-1
pub fn progress_for_level(level: u32, experience: u64) -> f64 {
    let floor = experience_for_level(level.saturating_sub(1)) as f64;
    let ceiling = experience_for_level(level) as f64;
    if ceiling <= floor {
        return 0.0;
    }
    ((experience as f64 - floor) / (ceiling - floor)).clamp(0.0, 1.0)
}

fn level_from_count(count: u32, per_level: u32) -> u32 {
    (1 + count / per_level).min(MAX_LEVEL)
}

fn level_from_miles(miles: f64, per_level: f64) -> u32 {
    let steps = (miles / per_level).floor();
    if steps.is_nan() || steps < 0.0 {
        return 1;
    }
    // float -> int casts saturate, so huge totals clamp before the min
    (1u32.saturating_add(steps as u32)).min(MAX_LEVEL)
}

#[derive(Debug, Clone, Default)]
pub struct ProgressionEngine {
    stats: UserStats,
}

impl ProgressionEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Resume from previously persisted stats
    pub fn with_stats(stats: UserStats) -> Self {
        Self { stats }
    }

    pub fn stats(&self) -> &UserStats {
        &self.stats
    }

    /// Fold one finished workout into the totals and raise levels
    pub fn update_stats(&mut self, distance: f64, time: f64) -> &UserStats {
        let stats = &mut self.stats;
        stats.total_workouts = stats.total_workouts.saturating_add(1);
        stats.total_distance += sanitize(distance);
        stats.total_time += sanitize(time);

        let runner = level_from_count(stats.total_workouts, WORKOUTS_PER_RUNNER_LEVEL);
        let endurance = level_from_miles(stats.total_distance, MILES_PER_ENDURANCE_LEVEL);
        let speed = level_from_miles(stats.total_distance, MILES_PER_SPEED_LEVEL);

        raise(&mut stats.runner_level, runner, "runner");
        raise(&mut stats.endurance_level, endurance, "endurance");
        raise(&mut stats.speed_level, speed, "speed");

        &self.stats
    }

    pub fn record_workout(&mut self, workout: &WorkoutRecord) -> &UserStats {
        self.update_stats(workout.distance, workout.time)
    }

    /// Experience shown against the runner level bar
    pub fn runner_experience(&self) -> u64 {
        u64::from(self.stats.total_workouts) * 10
    }

    /// Experience shown against the endurance level bar
    pub fn endurance_experience(&self) -> u64 {
        (self.stats.total_distance * 10.0) as u64
    }

    /// Experience shown against the speed level bar
    pub fn speed_experience(&self) -> u64 {
        (self.stats.total_distance * 5.0) as u64
    }

    /// Replace the stats wholesale (used when importing a backup)
    pub fn restore(&mut self, stats: UserStats) {
        self.stats = stats;
    }

    pub fn reset(&mut self) {
        self.stats = UserStats::default();
    }
}

fn sanitize(value: f64) -> f64 {
    if value.is_finite() && value > 0.0 {
        value
    } else {
        0.0
    }
}

fn raise(level: &mut u32, candidate: u32, name: &'static str) {
    if candidate > *level {
        info!(level = name, from = *level, to = candidate, "level up");
        *level = candidate;
    }
}

impl WorkoutCategory {
    /// Tag a distance (miles) with its category
    pub fn classify(miles: f64, boundaries: CategoryBoundaries) -> WorkoutCategory {
        if miles.is_nan() || miles < 0.0 {
            return WorkoutCategory::Short;
        }
        match boundaries {
            CategoryBoundaries::Standard => classify_standard(miles),
            CategoryBoundaries::Legacy => classify_legacy(miles),
        }
    }
}

impl WorkoutRecord {
    pub fn category(&self, boundaries: CategoryBoundaries) -> WorkoutCategory {
        WorkoutCategory::classify(self.distance, boundaries)
    }
}

// Race distances in miles: 3K 1.864, 5K 3.107, 10K 6.214, half 13.109, full 26.219
fn classify_standard(miles: f64) -> WorkoutCategory {
    match miles {
        m if m < 1.0 => WorkoutCategory::Short,
        m if m < 1.864 => WorkoutCategory::OneMile,
        m if m < 3.107 => WorkoutCategory::ThreeK,
        m if m < 6.214 => WorkoutCategory::FiveK,
        m if m < 13.109 => WorkoutCategory::TenK,
        m if m < 26.219 => WorkoutCategory::HalfMarathon,
        m if m < 50.0 => WorkoutCategory::Marathon,
        _ => WorkoutCategory::Ultra,
    }
}

// Evaluated top to bottom, first match wins; the 5K row shadows most of the
// rows after it.
fn classify_legacy(miles: f64) -> WorkoutCategory {
    match miles {
        m if m < 1.0 => WorkoutCategory::Short,
        m if (1.0..1.86).contains(&m) => WorkoutCategory::OneMile,
        m if (1.86..3.11).contains(&m) => WorkoutCategory::ThreeK,
        m if (3.11..621.0).contains(&m) => WorkoutCategory::FiveK,
        m if (60.21..130.1).contains(&m) => WorkoutCategory::TenK,
        m if m == 130.1 => WorkoutCategory::HalfMarathon,
        m if (26.2..50.0).contains(&m) => WorkoutCategory::Marathon,
        _ => WorkoutCategory::Ultra,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_five_workouts_of_two_miles() {
        let mut engine = ProgressionEngine::new();
        for _ in 0..5 {
            engine.update_stats(2.0, 300.0);
        }
        let stats = engine.stats();
        assert_eq!(stats.total_workouts, 5);
        assert_eq!(stats.total_distance, 10.0);
        assert_eq!(stats.total_time, 1500.0);
        assert_eq!(stats.runner_level, 2);
        assert_eq!(stats.endurance_level, 2);
        assert_eq!(stats.speed_level, 3);
    }

    #[test]
    fn test_levels_never_regress() {
        let mut engine = ProgressionEngine::with_stats(UserStats {
            runner_level: 7,
            endurance_level: 4,
            speed_level: 9,
            ..UserStats::default()
        });
        engine.update_stats(1.0, 60.0);
        let stats = engine.stats();
        assert_eq!(stats.runner_level, 7);
        assert_eq!(stats.endurance_level, 4);
        assert_eq!(stats.speed_level, 9);
    }

    #[test]
    fn test_levels_cap_at_99() {
        let mut engine = ProgressionEngine::new();
        engine.update_stats(10_000.0, 60.0);
        assert_eq!(engine.stats().endurance_level, MAX_LEVEL);
        assert_eq!(engine.stats().speed_level, MAX_LEVEL);
    }

    #[test]
    fn test_negative_inputs_do_not_shrink_totals() {
        let mut engine = ProgressionEngine::new();
        engine.update_stats(3.0, 100.0);
        engine.update_stats(-2.0, f64::NAN);
        assert_eq!(engine.stats().total_distance, 3.0);
        assert_eq!(engine.stats().total_time, 100.0);
        assert_eq!(engine.stats().total_workouts, 2);
    }

    #[test]
    fn test_progress_for_level() {
        assert_eq!(experience_for_level(2), 200);
        assert_eq!(progress_for_level(2, 150), 0.5);
        assert_eq!(progress_for_level(1, 0), 0.0);
        assert_eq!(progress_for_level(1, 50), 0.5);
        assert_eq!(progress_for_level(3, 10), 0.0);
        assert_eq!(progress_for_level(3, 1_000), 1.0);
    }

    #[test]
    fn test_display_experience() {
        let mut engine = ProgressionEngine::new();
        engine.update_stats(2.5, 600.0);
        assert_eq!(engine.runner_experience(), 10);
        assert_eq!(engine.endurance_experience(), 25);
        assert_eq!(engine.speed_experience(), 12);
    }

    #[test]
    fn test_reset() {
        let mut engine = ProgressionEngine::new();
        engine.update_stats(50.0, 600.0);
        engine.reset();
        assert_eq!(engine.stats(), &UserStats::default());
    }

    #[test]
    fn test_standard_categories() {
        let cases = [
            (0.4, WorkoutCategory::Short),
            (1.0, WorkoutCategory::OneMile),
            (2.0, WorkoutCategory::ThreeK),
            (3.2, WorkoutCategory::FiveK),
            (10.0, WorkoutCategory::TenK),
            (13.2, WorkoutCategory::HalfMarathon),
            (26.3, WorkoutCategory::Marathon),
            (60.0, WorkoutCategory::Ultra),
            (-1.0, WorkoutCategory::Short),
        ];
        for (miles, expected) in cases {
            assert_eq!(
                WorkoutCategory::classify(miles, CategoryBoundaries::Standard),
                expected,
                "{miles} miles"
            );
        }
    }

    #[test]
    fn test_legacy_categories_match_historical_table() {
        let legacy = |m| WorkoutCategory::classify(m, CategoryBoundaries::Legacy);
        assert_eq!(legacy(0.5), WorkoutCategory::Short);
        assert_eq!(legacy(1.5), WorkoutCategory::OneMile);
        assert_eq!(legacy(2.0), WorkoutCategory::ThreeK);
        // 5K row swallows everything up to 621 miles
        assert_eq!(legacy(10.0), WorkoutCategory::FiveK);
        assert_eq!(legacy(30.0), WorkoutCategory::FiveK);
        assert_eq!(legacy(130.1), WorkoutCategory::FiveK);
        assert_eq!(legacy(700.0), WorkoutCategory::Ultra);
    }

    #[test]
    fn test_record_category() {
        let record = WorkoutRecord::new(chrono::Utc::now(), 6.0, 7.0, 3.2, 1800.0, vec![]);
        assert_eq!(record.category(CategoryBoundaries::Standard), WorkoutCategory::FiveK);
    }
}

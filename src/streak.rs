//! Daily goal bookkeeping and streaks
//!
//! A day counts toward a streak once its accumulated active time reaches the
//! daily goal. `DailyProgress` keeps the per-day totals, `CompletedDaySet`
//! remembers which days made it, and `StreakTracker` reads streaks off the set.

use chrono::{Days, Local, NaiveDate};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use tracing::info;

/// Calendar days on which the daily goal was met
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CompletedDaySet {
    days: BTreeSet<NaiveDate>,
}

impl CompletedDaySet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark `day` as completed. Returns false if it already was.
    pub fn insert(&mut self, day: NaiveDate) -> bool {
        self.days.insert(day)
    }

    pub fn contains(&self, day: NaiveDate) -> bool {
        self.days.contains(&day)
    }

    pub fn len(&self) -> usize {
        self.days.len()
    }

    pub fn is_empty(&self) -> bool {
        self.days.is_empty()
    }

    /// Days in ascending order
    pub fn iter(&self) -> impl Iterator<Item = NaiveDate> + '_ {
        self.days.iter().copied()
    }

    pub fn first(&self) -> Option<NaiveDate> {
        self.days.first().copied()
    }

    pub fn clear(&mut self) {
        self.days.clear();
    }
}

impl FromIterator<NaiveDate> for CompletedDaySet {
    fn from_iter<I: IntoIterator<Item = NaiveDate>>(iter: I) -> Self {
        Self {
            days: iter.into_iter().collect(),
        }
    }
}

/// One cell of the recent-days strip
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DayStatus {
    pub date: NaiveDate,
    pub completed: bool,
}

/// Streak queries over a completed-day set
pub struct StreakTracker<'a> {
    days: &'a CompletedDaySet,
}

impl<'a> StreakTracker<'a> {
    pub fn new(days: &'a CompletedDaySet) -> Self {
        Self { days }
    }

    /// Consecutive completed days ending today, or ending yesterday when today
    /// has not been completed yet
    pub fn current_streak(&self, today: NaiveDate) -> u32 {
        let mut day = if self.days.contains(today) {
            Some(today)
        } else {
            today.checked_sub_days(Days::new(1))
        };

        let mut streak = 0;
        while let Some(d) = day {
            if !self.days.contains(d) {
                break;
            }
            streak += 1;
            day = d.checked_sub_days(Days::new(1));
        }
        streak
    }

    /// `current_streak` against the local calendar date
    pub fn current_streak_now(&self) -> u32 {
        self.current_streak(Local::now().date_naive())
    }

    /// Longest run of consecutive completed days
    pub fn longest_streak(&self) -> u32 {
        let mut longest = 0;
        let mut run = 0;
        let mut previous: Option<NaiveDate> = None;
        for day in self.days.iter() {
            run = match previous.and_then(|p| p.succ_opt()) {
                Some(expected) if expected == day => run + 1,
                _ => 1,
            };
            longest = longest.max(run);
            previous = Some(day);
        }
        longest
    }

    /// The last `count` days up to and including `today`, oldest first
    pub fn recent_days(&self, today: NaiveDate, count: u32) -> Vec<DayStatus> {
        (0..count)
            .rev()
            .filter_map(|offset| today.checked_sub_days(Days::new(u64::from(offset))))
            .map(|date| DayStatus {
                date,
                completed: self.days.contains(date),
            })
            .collect()
    }
}

/// Per-day active-time totals
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DailyProgress {
    totals: BTreeMap<NaiveDate, f64>,
}

impl DailyProgress {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add active seconds to `day` and return the new total
    pub fn add(&mut self, day: NaiveDate, seconds: f64) -> f64 {
        let total = self.totals.entry(day).or_insert(0.0);
        if seconds.is_finite() && seconds > 0.0 {
            *total += seconds;
        }
        *total
    }

    pub fn total(&self, day: NaiveDate) -> f64 {
        self.totals.get(&day).copied().unwrap_or(0.0)
    }

    pub fn clear(&mut self) {
        self.totals.clear();
    }
}

/// The daily goal rule tying `DailyProgress` to `CompletedDaySet`
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DailyGoal {
    pub seconds: f64,
}

impl DailyGoal {
    pub fn new(seconds: f64) -> Self {
        Self { seconds }
    }

    pub fn is_met(&self, total_seconds: f64) -> bool {
        total_seconds >= self.seconds
    }

    /// Fraction of the goal done, 0-1
    pub fn fraction(&self, total_seconds: f64) -> f64 {
        (total_seconds.max(0.0).min(self.seconds) / self.seconds).clamp(0.0, 1.0)
    }

    /// Seconds still needed today; the natural length for the next session
    pub fn remaining(&self, total_seconds: f64) -> f64 {
        self.seconds - total_seconds.max(0.0).min(self.seconds)
    }

    /// Credit `seconds` to `day` and mark the day completed if the goal is met.
    /// Returns true when this call newly completed the day.
    pub fn credit(
        &self,
        progress: &mut DailyProgress,
        completed: &mut CompletedDaySet,
        day: NaiveDate,
        seconds: f64,
    ) -> bool {
        let total = progress.add(day, seconds);
        if self.is_met(total) && completed.insert(day) {
            info!(%day, total_secs = total, "daily goal met");
            return true;
        }
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn days_before(today: NaiveDate, offsets: &[u64]) -> CompletedDaySet {
        offsets
            .iter()
            .map(|o| today.checked_sub_days(Days::new(*o)).unwrap())
            .collect()
    }

    #[test]
    fn test_current_streak_including_today() {
        let today = date(2025, 6, 10);
        let set = days_before(today, &[0, 1, 2]);
        assert_eq!(StreakTracker::new(&set).current_streak(today), 3);
    }

    #[test]
    fn test_current_streak_counts_from_yesterday() {
        let today = date(2025, 6, 10);
        let set = days_before(today, &[1]);
        assert_eq!(StreakTracker::new(&set).current_streak(today), 1);
    }

    #[test]
    fn test_current_streak_empty_and_gap() {
        let today = date(2025, 6, 10);
        let empty = CompletedDaySet::new();
        assert_eq!(StreakTracker::new(&empty).current_streak(today), 0);

        let gap = days_before(today, &[0, 2, 3]);
        assert_eq!(StreakTracker::new(&gap).current_streak(today), 1);

        let stale = days_before(today, &[2, 3, 4]);
        assert_eq!(StreakTracker::new(&stale).current_streak(today), 0);
    }

    #[test]
    fn test_streak_across_month_boundary() {
        let today = date(2025, 3, 1);
        let set: CompletedDaySet = [date(2025, 2, 27), date(2025, 2, 28), date(2025, 3, 1)]
            .into_iter()
            .collect();
        let tracker = StreakTracker::new(&set);
        assert_eq!(tracker.current_streak(today), 3);
        assert_eq!(tracker.longest_streak(), 3);
    }

    #[test]
    fn test_longest_streak() {
        let set: CompletedDaySet = [
            date(2025, 1, 1),
            date(2025, 1, 2),
            date(2025, 1, 5),
            date(2025, 1, 6),
            date(2025, 1, 7),
            date(2025, 1, 8),
            date(2025, 1, 20),
        ]
        .into_iter()
        .collect();
        assert_eq!(StreakTracker::new(&set).longest_streak(), 4);

        let single: CompletedDaySet = [date(2025, 1, 1)].into_iter().collect();
        assert_eq!(StreakTracker::new(&single).longest_streak(), 1);
        assert_eq!(StreakTracker::new(&CompletedDaySet::new()).longest_streak(), 0);
    }

    #[test]
    fn test_insert_is_idempotent() {
        let mut set = CompletedDaySet::new();
        assert!(set.insert(date(2025, 1, 1)));
        assert!(!set.insert(date(2025, 1, 1)));
        assert_eq!(set.len(), 1);
    }

    #[test]
    fn test_recent_days_strip() {
        let today = date(2025, 6, 10);
        let set = days_before(today, &[0, 3]);
        let strip = StreakTracker::new(&set).recent_days(today, 14);
        assert_eq!(strip.len(), 14);
        assert_eq!(strip[0].date, date(2025, 5, 28));
        assert_eq!(strip[13].date, today);
        assert!(strip[13].completed);
        assert!(strip[10].completed);
        assert_eq!(strip.iter().filter(|d| d.completed).count(), 2);
    }

    #[test]
    fn test_goal_credit_marks_day_once() {
        let goal = DailyGoal::new(900.0);
        let mut progress = DailyProgress::new();
        let mut completed = CompletedDaySet::new();
        let day = date(2025, 6, 10);

        assert!(!goal.credit(&mut progress, &mut completed, day, 600.0));
        assert_eq!(goal.remaining(progress.total(day)), 300.0);
        assert_eq!(goal.fraction(progress.total(day)), 600.0 / 900.0);

        assert!(goal.credit(&mut progress, &mut completed, day, 300.0));
        assert!(completed.contains(day));
        assert!(!goal.credit(&mut progress, &mut completed, day, 120.0));
        assert_eq!(progress.total(day), 1020.0);
        assert_eq!(goal.fraction(progress.total(day)), 1.0);
        assert_eq!(goal.remaining(progress.total(day)), 0.0);
    }

    #[test]
    fn test_serialization_is_plain_list() {
        let set: CompletedDaySet = [date(2025, 1, 2), date(2025, 1, 1)].into_iter().collect();
        let json = serde_json::to_string(&set).unwrap();
        assert_eq!(json, r#"["2025-01-01","2025-01-02"]"#);
    }
}

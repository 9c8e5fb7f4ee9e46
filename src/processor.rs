//! Stateful activity processor
//!
//! Ties finished sessions to everything that outlives them: history,
//! progression, the daily goal and streaks, and the export document.

use chrono::{Local, NaiveDate};
use serde::Serialize;
use std::collections::BTreeMap;
use tracing::{info, warn};
use uuid::Uuid;

use crate::config::EngineConfig;
use crate::error::TrackerError;
use crate::export::{parse_any, ExportDocument, InfoMap};
use crate::progression::ProgressionEngine;
use crate::session::SessionStateMachine;
use crate::store::{InMemoryHistory, InMemoryStatsStore, StatsStore, WorkoutHistory};
use crate::streak::{CompletedDaySet, DailyGoal, DailyProgress, DayStatus, StreakTracker};
use crate::types::{UserStats, WorkoutCategory, WorkoutRecord};

/// What recording a workout changed
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RecordOutcome {
    pub category: WorkoutCategory,
    pub day: NaiveDate,
    /// Active seconds on `day` after this workout
    pub day_total_seconds: f64,
    /// The workout pushed the day over the daily goal
    pub goal_newly_met: bool,
    pub stats: UserStats,
}

/// Totals across the stored history
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct HistorySummary {
    pub workouts: usize,
    pub total_distance: f64,
    pub total_time: f64,
    pub by_category: BTreeMap<WorkoutCategory, usize>,
}

pub struct ActivityProcessor<H = InMemoryHistory, S = InMemoryStatsStore>
where
    H: WorkoutHistory,
    S: StatsStore,
{
    config: EngineConfig,
    progression: ProgressionEngine,
    history: H,
    stats_store: S,
    daily: DailyProgress,
    completed: CompletedDaySet,
    info: InfoMap,
}

impl ActivityProcessor {
    /// Processor backed by in-memory stores
    pub fn new(config: EngineConfig) -> Result<Self, TrackerError> {
        Self::with_stores(config, InMemoryHistory::new(), InMemoryStatsStore::default())
    }
}

impl<H: WorkoutHistory, S: StatsStore> ActivityProcessor<H, S> {
    /// Processor over host-provided stores; stats are read from `stats_store`
    pub fn with_stores(
        config: EngineConfig,
        history: H,
        stats_store: S,
    ) -> Result<Self, TrackerError> {
        config.validate()?;
        let progression = ProgressionEngine::with_stats(stats_store.load());
        Ok(Self {
            config,
            progression,
            history,
            stats_store,
            daily: DailyProgress::new(),
            completed: CompletedDaySet::new(),
            info: InfoMap::new(),
        })
    }

    /// Restore the daily bookkeeping persisted by the host
    pub fn with_daily_state(mut self, daily: DailyProgress, completed: CompletedDaySet) -> Self {
        self.daily = daily;
        self.completed = completed;
        self
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// A fresh idle session using this processor's configuration
    pub fn new_session(&self) -> SessionStateMachine {
        // config was validated on construction
        SessionStateMachine::build(self.config.clone())
    }

    fn goal(&self) -> DailyGoal {
        DailyGoal::new(self.config.daily_goal_seconds)
    }

    /// Record a finished workout against the local calendar day it ended on
    pub fn record_workout(&mut self, workout: WorkoutRecord) -> RecordOutcome {
        let day = workout.date.with_timezone(&Local).date_naive();
        self.record_workout_on(workout, day)
    }

    /// Record a finished workout against `day`
    pub fn record_workout_on(&mut self, workout: WorkoutRecord, day: NaiveDate) -> RecordOutcome {
        let category = workout.category(self.config.category_boundaries);
        let stats = self.progression.record_workout(&workout).clone();
        self.stats_store.save(&stats);

        let goal = self.goal();
        let goal_newly_met = goal.credit(&mut self.daily, &mut self.completed, day, workout.time);
        let day_total_seconds = self.daily.total(day);

        info!(
            id = %workout.id,
            %category,
            %day,
            day_total_secs = day_total_seconds,
            "workout recorded"
        );
        self.history.append(workout);

        RecordOutcome {
            category,
            day,
            day_total_seconds,
            goal_newly_met,
            stats,
        }
    }

    pub fn stats(&self) -> &UserStats {
        self.progression.stats()
    }

    pub fn progression(&self) -> &ProgressionEngine {
        &self.progression
    }

    pub fn workouts(&self) -> Vec<WorkoutRecord> {
        self.history.list()
    }

    pub fn delete_workout(&mut self, id: Uuid) -> bool {
        self.history.delete(id)
    }

    pub fn clear_history(&mut self) {
        self.history.clear();
    }

    pub fn history_summary(&self) -> HistorySummary {
        let boundaries = self.config.category_boundaries;
        self.history
            .list()
            .iter()
            .fold(HistorySummary::default(), |mut summary, w| {
                summary.workouts += 1;
                summary.total_distance += w.distance;
                summary.total_time += w.time;
                *summary.by_category.entry(w.category(boundaries)).or_insert(0) += 1;
                summary
            })
    }

    pub fn reset_stats(&mut self) {
        self.progression.reset();
        self.stats_store.save(self.progression.stats());
    }

    pub fn daily_progress(&self) -> &DailyProgress {
        &self.daily
    }

    /// Fraction of the daily goal done on `day`
    pub fn goal_fraction(&self, day: NaiveDate) -> f64 {
        self.goal().fraction(self.daily.total(day))
    }

    /// Seconds still needed on `day` to meet the goal
    pub fn remaining_goal_seconds(&self, day: NaiveDate) -> f64 {
        self.goal().remaining(self.daily.total(day))
    }

    pub fn completed_days(&self) -> &CompletedDaySet {
        &self.completed
    }

    /// Mark a day completed regardless of its recorded time
    pub fn mark_day_completed(&mut self, day: NaiveDate) -> bool {
        self.completed.insert(day)
    }

    pub fn reset_streaks(&mut self) {
        self.completed.clear();
    }

    pub fn current_streak(&self, today: NaiveDate) -> u32 {
        StreakTracker::new(&self.completed).current_streak(today)
    }

    pub fn longest_streak(&self) -> u32 {
        StreakTracker::new(&self.completed).longest_streak()
    }

    pub fn recent_days(&self, today: NaiveDate, count: u32) -> Vec<DayStatus> {
        StreakTracker::new(&self.completed).recent_days(today, count)
    }

    pub fn info(&self) -> &InfoMap {
        &self.info
    }

    pub fn set_info(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.info.insert(key.into(), value.into());
    }

    pub fn remove_info(&mut self, key: &str) -> Option<String> {
        self.info.remove(key)
    }

    pub fn export(&self) -> ExportDocument {
        ExportDocument::new(self.stats(), &self.history.list(), &self.info)
    }

    /// Apply an export document. Everything is decoded before anything is
    /// changed, so a bad document leaves the processor untouched.
    pub fn import(&mut self, document: &ExportDocument) -> Result<(), TrackerError> {
        let data = document.decode().inspect_err(|e| {
            warn!(error = %e, "import rejected");
        })?;

        info!(workouts = data.workouts.len(), "importing export document");
        self.progression.restore(data.stats);
        self.stats_store.save(self.progression.stats());
        self.history.replace_all(data.workouts);
        self.info = data.info;
        Ok(())
    }

    /// Import plain or base64 JSON text
    pub fn import_str(&mut self, input: &str) -> Result<(), TrackerError> {
        let document = parse_any(input).inspect_err(|e| {
            warn!(error = %e, "import rejected");
        })?;
        self.import(&document)
    }
}

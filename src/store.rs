//! Persistence contracts
//!
//! The engine never decides how data is stored; hosts plug in their own
//! backends through these traits. In-memory implementations are provided for
//! embedding and tests.

use uuid::Uuid;

use crate::types::{UserStats, WorkoutRecord};

/// Append-only workout history
pub trait WorkoutHistory {
    /// All workouts, oldest first
    fn list(&self) -> Vec<WorkoutRecord>;

    fn append(&mut self, workout: WorkoutRecord);

    /// Remove a workout. Returns false if no workout had that id.
    fn delete(&mut self, id: Uuid) -> bool;

    fn clear(&mut self);

    /// Swap the whole history at once
    fn replace_all(&mut self, workouts: Vec<WorkoutRecord>);
}

/// Durable home for the progression stats
pub trait StatsStore {
    fn load(&self) -> UserStats;

    fn save(&mut self, stats: &UserStats);
}

#[derive(Debug, Clone, Default)]
pub struct InMemoryHistory {
    workouts: Vec<WorkoutRecord>,
}

impl InMemoryHistory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.workouts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.workouts.is_empty()
    }
}

impl WorkoutHistory for InMemoryHistory {
    fn list(&self) -> Vec<WorkoutRecord> {
        self.workouts.clone()
    }

    fn append(&mut self, workout: WorkoutRecord) {
        self.workouts.push(workout);
    }

    fn delete(&mut self, id: Uuid) -> bool {
        let before = self.workouts.len();
        self.workouts.retain(|w| w.id != id);
        self.workouts.len() != before
    }

    fn clear(&mut self) {
        self.workouts.clear();
    }

    fn replace_all(&mut self, workouts: Vec<WorkoutRecord>) {
        self.workouts = workouts;
    }
}

#[derive(Debug, Clone, Default)]
pub struct InMemoryStatsStore {
    stats: UserStats,
}

impl StatsStore for InMemoryStatsStore {
    fn load(&self) -> UserStats {
        self.stats.clone()
    }

    fn save(&mut self, stats: &UserStats) {
        self.stats = stats.clone();
    }
}

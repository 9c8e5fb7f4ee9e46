//! Thread-safe session handle
//!
//! Location callbacks and the clock timer usually fire on different threads.
//! `SharedSession` serializes them: every call holds the session lock for its
//! whole duration, so a pause can never interleave with a half-applied sample
//! or tick, and a sample arriving after the session ended is discarded.

use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use chrono::{DateTime, Utc};

use crate::config::EngineConfig;
use crate::error::TrackerError;
use crate::session::{SampleOutcome, SessionSnapshot, SessionStateMachine};
use crate::types::{LocationSample, SessionState, WorkoutRecord};

/// Cloneable handle to one session
#[derive(Debug, Clone, Default)]
pub struct SharedSession {
    inner: Arc<Mutex<SessionStateMachine>>,
}

impl SharedSession {
    pub fn new(config: EngineConfig) -> Result<Self, TrackerError> {
        Ok(Self::from_machine(SessionStateMachine::new(config)?))
    }

    pub fn from_machine(machine: SessionStateMachine) -> Self {
        Self {
            inner: Arc::new(Mutex::new(machine)),
        }
    }

    fn lock(&self) -> MutexGuard<'_, SessionStateMachine> {
        // The machine is consistent between calls, so a panic elsewhere
        // does not leave it half-updated.
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Run `f` with exclusive access to the session
    pub fn with<R>(&self, f: impl FnOnce(&mut SessionStateMachine) -> R) -> R {
        f(&mut self.lock())
    }

    pub fn state(&self) -> SessionState {
        self.lock().state()
    }

    pub fn start(&self) -> Result<SessionState, TrackerError> {
        self.lock().start()
    }

    pub fn advance_countdown(&self) -> Result<SessionState, TrackerError> {
        self.lock().advance_countdown()
    }

    pub fn cancel(&self) -> Result<SessionState, TrackerError> {
        self.lock().cancel()
    }

    pub fn pause(&self) -> Result<SessionState, TrackerError> {
        self.lock().pause()
    }

    pub fn resume(&self) -> Result<SessionState, TrackerError> {
        self.lock().resume()
    }

    pub fn end(&self) -> Result<SessionState, TrackerError> {
        self.lock().end()
    }

    pub fn end_at(&self, ended_at: DateTime<Utc>) -> Result<SessionState, TrackerError> {
        self.lock().end_at(ended_at)
    }

    pub fn tick(&self) -> SessionState {
        self.lock().tick()
    }

    pub fn advance(&self, elapsed: Duration) -> SessionState {
        self.lock().advance(elapsed)
    }

    pub fn process_sample(&self, sample: &LocationSample) -> SampleOutcome {
        self.lock().process_sample(sample)
    }

    pub fn elapsed_seconds(&self) -> f64 {
        self.lock().elapsed_seconds()
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        self.lock().snapshot()
    }

    pub fn take_workout(&self) -> Option<WorkoutRecord> {
        self.lock().take_workout()
    }
}

//! Workout session state machine
//!
//! ```text
//! Idle --start--> Countdown(n) --advance..--> Countdown(0) "go" --advance--> Running
//!   \--start (countdown 0)-------------------------------------------------> Running
//! Running --pause--> Paused --resume--> Running
//! Running | Paused --end / ceiling--> Ended (emits one WorkoutRecord)
//! Countdown --cancel--> Ended (no record)
//! ```
//!
//! The machine is driven by three independent inputs: control calls from the
//! UI, a periodic clock tick and location samples. It does no timing of its
//! own; the host decides when ticks and countdown steps happen, which keeps
//! every transition deterministic and testable.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::time::Duration;
use tracing::{debug, info};

use crate::config::EngineConfig;
use crate::error::TrackerError;
use crate::pipeline::{RoutePipeline, StageOutput};
use crate::types::{Coordinate, LocationSample, SessionState, WorkoutRecord};

/// Result of offering a location sample to the session
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SampleOutcome {
    /// The sample was folded into the route and aggregates
    Applied(StageOutput),
    /// The session was not running; nothing changed
    Discarded,
}

/// Point-in-time view of a session for display
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SessionSnapshot {
    #[serde(flatten)]
    pub state: SessionState,
    pub elapsed_seconds: f64,
    pub progress_fraction: f64,
    pub distance_miles: f64,
    pub current_speed_mph: f64,
    pub average_speed_mph: f64,
    pub peak_speed_mph: f64,
    pub route_points: usize,
}

/// Explicit context for one workout attempt
#[derive(Debug, Clone)]
pub struct SessionStateMachine {
    config: EngineConfig,
    state: SessionState,
    pipeline: RoutePipeline,
    elapsed_ticks: u64,
    ceiling_ticks: u64,
    workout: Option<WorkoutRecord>,
}

impl Default for SessionStateMachine {
    fn default() -> Self {
        let config = EngineConfig::default();
        Self::build(config)
    }
}

impl SessionStateMachine {
    /// Create an idle session after validating `config`
    pub fn new(config: EngineConfig) -> Result<Self, TrackerError> {
        config.validate()?;
        Ok(Self::build(config))
    }

    pub(crate) fn build(config: EngineConfig) -> Self {
        Self {
            pipeline: RoutePipeline::with_smoothing_window(config.smoothing_window),
            ceiling_ticks: config.ceiling_ticks(),
            state: SessionState::Idle,
            elapsed_ticks: 0,
            workout: None,
            config,
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    fn transition(&mut self, next: SessionState) -> SessionState {
        debug!(from = %self.state, to = %next, "session transition");
        self.state = next;
        next
    }

    /// Begin the session: enter the countdown, or run immediately when the
    /// configured countdown is zero.
    pub fn start(&mut self) -> Result<SessionState, TrackerError> {
        if self.state != SessionState::Idle {
            return Err(TrackerError::invalid_transition("start", self.state));
        }

        self.pipeline.reset();
        self.elapsed_ticks = 0;
        self.workout = None;

        let next = match self.config.countdown_seconds {
            0 => SessionState::Running,
            remaining => SessionState::Countdown { remaining },
        };
        Ok(self.transition(next))
    }

    /// Step the countdown. The host calls this once per second while counting,
    /// then once more after `GO_SIGNAL_HOLD` to leave the "go" signal.
    pub fn advance_countdown(&mut self) -> Result<SessionState, TrackerError> {
        match self.state {
            SessionState::Countdown { remaining: 0 } => Ok(self.transition(SessionState::Running)),
            SessionState::Countdown { remaining } => {
                Ok(self.transition(SessionState::Countdown {
                    remaining: remaining - 1,
                }))
            }
            state => Err(TrackerError::invalid_transition("advance countdown", state)),
        }
    }

    /// Abort during the countdown. Nothing ran, so no workout is emitted.
    pub fn cancel(&mut self) -> Result<SessionState, TrackerError> {
        match self.state {
            SessionState::Countdown { .. } => Ok(self.transition(SessionState::Ended)),
            state => Err(TrackerError::invalid_transition("cancel", state)),
        }
    }

    pub fn pause(&mut self) -> Result<SessionState, TrackerError> {
        match self.state {
            SessionState::Running => Ok(self.transition(SessionState::Paused)),
            state => Err(TrackerError::invalid_transition("pause", state)),
        }
    }

    pub fn resume(&mut self) -> Result<SessionState, TrackerError> {
        match self.state {
            SessionState::Paused => Ok(self.transition(SessionState::Running)),
            state => Err(TrackerError::invalid_transition("resume", state)),
        }
    }

    /// End the session now
    pub fn end(&mut self) -> Result<SessionState, TrackerError> {
        self.end_at(Utc::now())
    }

    /// End the session, stamping the workout with `ended_at`
    pub fn end_at(&mut self, ended_at: DateTime<Utc>) -> Result<SessionState, TrackerError> {
        match self.state {
            SessionState::Running | SessionState::Paused => Ok(self.finish(ended_at)),
            state => Err(TrackerError::invalid_transition("end", state)),
        }
    }

    fn finish(&mut self, ended_at: DateTime<Utc>) -> SessionState {
        let speed = self.pipeline.speed();
        let record = WorkoutRecord::new(
            ended_at,
            speed.average_mph(),
            speed.peak_mph(),
            self.pipeline.distance_miles(),
            self.elapsed_seconds(),
            self.pipeline.route().to_vec(),
        );
        info!(
            id = %record.id,
            distance_miles = record.distance,
            time_secs = record.time,
            route_points = record.route.len(),
            "workout finished"
        );
        self.workout = Some(record);
        self.transition(SessionState::Ended)
    }

    /// Advance the clock by one tick. Only moves while running; reaching the
    /// ceiling ends the session.
    pub fn tick(&mut self) -> SessionState {
        self.advance_ticks(1, Utc::now())
    }

    /// Advance the clock by as many whole ticks as fit in `elapsed`
    pub fn advance(&mut self, elapsed: Duration) -> SessionState {
        self.advance_at(elapsed, Utc::now())
    }

    /// Advance the clock by `elapsed`, an interval that ends at `now`. A
    /// workout cut off by the ceiling is dated at the instant the ceiling was
    /// reached, not at `now`.
    pub fn advance_at(&mut self, elapsed: Duration, now: DateTime<Utc>) -> SessionState {
        let ticks = elapsed.as_millis() / u128::from(self.config.tick_interval_ms.max(1));
        self.advance_ticks(u64::try_from(ticks).unwrap_or(u64::MAX), now)
    }

    fn advance_ticks(&mut self, ticks: u64, now: DateTime<Utc>) -> SessionState {
        if self.state != SessionState::Running {
            return self.state;
        }
        let remaining = self.ceiling_ticks.saturating_sub(self.elapsed_ticks);
        let applied = ticks.min(remaining);
        self.elapsed_ticks += applied;
        if self.elapsed_ticks >= self.ceiling_ticks {
            info!(ceiling_secs = self.config.session_ceiling_seconds, "session ceiling reached");
            let overshoot_ms = (ticks - applied).saturating_mul(self.config.tick_interval_ms);
            let ended_at = chrono::Duration::from_std(Duration::from_millis(overshoot_ms))
                .ok()
                .and_then(|overshoot| now.checked_sub_signed(overshoot))
                .unwrap_or(now);
            return self.finish(ended_at);
        }
        self.state
    }

    /// Offer a location sample. Applied only while running.
    pub fn process_sample(&mut self, sample: &LocationSample) -> SampleOutcome {
        if self.state != SessionState::Running {
            debug!(state = %self.state, "discarding location sample");
            return SampleOutcome::Discarded;
        }
        SampleOutcome::Applied(self.pipeline.process(sample))
    }

    /// The finished workout, if the session has ended with one
    pub fn workout(&self) -> Option<&WorkoutRecord> {
        self.workout.as_ref()
    }

    /// Hand over the finished workout. Returns it at most once.
    pub fn take_workout(&mut self) -> Option<WorkoutRecord> {
        self.workout.take()
    }

    pub fn elapsed_seconds(&self) -> f64 {
        self.elapsed_ticks.saturating_mul(self.config.tick_interval_ms) as f64 / 1000.0
    }

    /// Fraction of the session ceiling used, 0-1
    pub fn progress_fraction(&self) -> f64 {
        (self.elapsed_ticks as f64 / self.ceiling_ticks as f64).clamp(0.0, 1.0)
    }

    pub fn distance_miles(&self) -> f64 {
        self.pipeline.distance_miles()
    }

    /// Live speed; zero unless running
    pub fn current_speed_mph(&self) -> f64 {
        if self.state == SessionState::Running {
            self.pipeline.speed().current_mph()
        } else {
            0.0
        }
    }

    pub fn average_speed_mph(&self) -> f64 {
        self.pipeline.speed().average_mph()
    }

    pub fn peak_speed_mph(&self) -> f64 {
        self.pipeline.speed().peak_mph()
    }

    pub fn route(&self) -> &[Coordinate] {
        self.pipeline.route()
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            state: self.state,
            elapsed_seconds: self.elapsed_seconds(),
            progress_fraction: self.progress_fraction(),
            distance_miles: self.distance_miles(),
            current_speed_mph: self.current_speed_mph(),
            average_speed_mph: self.average_speed_mph(),
            peak_speed_mph: self.peak_speed_mph(),
            route_points: self.route().len(),
        }
    }
}

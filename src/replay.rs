//! Replay of recorded location streams
//!
//! A recorded stream is a sequence of timestamped events: location samples
//! and the control actions the runner took. `Replay` drives a session from
//! those timestamps instead of a live clock, so the finished workout carries
//! the recorded times.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

use crate::config::EngineConfig;
use crate::error::TrackerError;
use crate::session::{SampleOutcome, SessionStateMachine};
use crate::types::{LocationSample, SessionState, WorkoutRecord};

/// One line of a recorded stream
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ReplayEvent {
    Control {
        control: ControlAction,
        timestamp: DateTime<Utc>,
    },
    Sample(LocationSample),
}

impl ReplayEvent {
    pub fn timestamp(&self) -> DateTime<Utc> {
        match self {
            ReplayEvent::Control { timestamp, .. } => *timestamp,
            ReplayEvent::Sample(sample) => sample.timestamp,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ControlAction {
    Pause,
    Resume,
    End,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ReplayCounts {
    pub samples_applied: usize,
    pub samples_discarded: usize,
    /// Control events that arrived after the session had already ended
    pub controls_ignored: usize,
}

/// A session driven by recorded timestamps
#[derive(Debug, Clone)]
pub struct Replay {
    session: SessionStateMachine,
    origin: Option<DateTime<Utc>>,
    last_timestamp: Option<DateTime<Utc>>,
    consumed_ms: u64,
    counts: ReplayCounts,
}

impl Replay {
    /// Start a running session. The countdown is skipped because a recorded
    /// stream begins with its first sample.
    pub fn new(config: EngineConfig) -> Result<Self, TrackerError> {
        let mut session = SessionStateMachine::new(config)?;
        session.start()?;
        while matches!(session.state(), SessionState::Countdown { .. }) {
            session.advance_countdown()?;
        }
        Ok(Self {
            session,
            origin: None,
            last_timestamp: None,
            consumed_ms: 0,
            counts: ReplayCounts::default(),
        })
    }

    pub fn session(&self) -> &SessionStateMachine {
        &self.session
    }

    pub fn counts(&self) -> ReplayCounts {
        self.counts
    }

    /// Whether no event has been applied yet
    pub fn is_empty(&self) -> bool {
        self.origin.is_none()
    }

    /// Move the clock to the event's timestamp, then apply it. Returns the
    /// sample outcome for sample events.
    pub fn apply(&mut self, event: &ReplayEvent) -> Result<Option<SampleOutcome>, TrackerError> {
        let timestamp = event.timestamp();
        self.advance_clock(timestamp);

        match event {
            ReplayEvent::Sample(sample) => {
                let outcome = self.session.process_sample(sample);
                match outcome {
                    SampleOutcome::Applied(_) => self.counts.samples_applied += 1,
                    SampleOutcome::Discarded => self.counts.samples_discarded += 1,
                }
                Ok(Some(outcome))
            }
            ReplayEvent::Control { control, .. } => {
                if self.session.state() == SessionState::Ended {
                    debug!(?control, "session already ended, ignoring control event");
                    self.counts.controls_ignored += 1;
                    return Ok(None);
                }
                match control {
                    ControlAction::Pause => self.session.pause()?,
                    ControlAction::Resume => self.session.resume()?,
                    ControlAction::End => self.session.end_at(timestamp)?,
                };
                Ok(None)
            }
        }
    }

    // Whole ticks only; the remainder carries over to the next event
    fn advance_clock(&mut self, timestamp: DateTime<Utc>) {
        let start = *self.origin.get_or_insert(timestamp);
        self.last_timestamp = Some(timestamp);

        let target_ms = u64::try_from((timestamp - start).num_milliseconds()).unwrap_or(0);
        if target_ms <= self.consumed_ms {
            return;
        }
        let tick_ms = self.session.config().tick_interval_ms.max(1);
        let delta = target_ms - self.consumed_ms;
        let remainder = delta % tick_ms;
        let whole = delta - remainder;

        let reached = i64::try_from(remainder)
            .ok()
            .and_then(|ms| timestamp.checked_sub_signed(chrono::Duration::milliseconds(ms)))
            .unwrap_or(timestamp);
        self.session.advance_at(Duration::from_millis(whole), reached);
        self.consumed_ms += whole;
    }

    /// End the session at the last event time if it is still open and hand
    /// over the workout
    pub fn finish(mut self) -> Result<Option<WorkoutRecord>, TrackerError> {
        if self.session.state().is_active() {
            let ended_at = self.last_timestamp.unwrap_or_else(Utc::now);
            self.session.end_at(ended_at)?;
        }
        debug!(counts = ?self.counts, "replay finished");
        Ok(self.session.take_workout())
    }
}

//! CRDO core - on-device session tracking and progression engine
//!
//! The core turns a stream of raw location samples into a finished workout
//! through a deterministic pipeline: smoothing → distance accumulation →
//! speed tracking → session aggregation. Finished workouts feed the
//! progression levels, the daily goal and streaks, and the export document.
//!
//! ## Modules
//!
//! - **Session**: `SessionStateMachine` (and the thread-safe `SharedSession`)
//!   owns the lifecycle and the per-sample `RoutePipeline`
//! - **Processor**: `ActivityProcessor` records workouts, levels, streaks and
//!   handles export / import

pub mod config;
pub mod distance;
pub mod error;
pub mod export;
pub mod format;
pub mod pipeline;
pub mod processor;
pub mod progression;
pub mod replay;
pub mod session;
pub mod shared;
pub mod smoother;
pub mod speed;
pub mod store;
pub mod streak;
pub mod types;

// FFI bindings for C interop (always available for cdylib/staticlib builds)
pub mod ffi;

pub use config::EngineConfig;
pub use distance::{haversine_meters, DistanceAccumulator};
pub use error::TrackerError;
pub use export::{parse_any, ExportDocument, InfoMap};
pub use pipeline::RoutePipeline;
pub use processor::{ActivityProcessor, HistorySummary, RecordOutcome};
pub use progression::{experience_for_level, progress_for_level, ProgressionEngine};
pub use replay::{ControlAction, Replay, ReplayCounts, ReplayEvent};
pub use session::{SampleOutcome, SessionSnapshot, SessionStateMachine};
pub use shared::SharedSession;
pub use smoother::GeoSmoother;
pub use speed::SpeedTracker;
pub use store::{InMemoryHistory, InMemoryStatsStore, StatsStore, WorkoutHistory};
pub use streak::{CompletedDaySet, DailyGoal, DailyProgress, DayStatus, StreakTracker};
pub use types::{
    CategoryBoundaries, Coordinate, LocationSample, SessionState, UserStats, WorkoutCategory,
    WorkoutRecord,
};

/// Core version, also written into exported info maps by the CLI
pub const CORE_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Producer name for exported documents
pub const PRODUCER_NAME: &str = "crdo-core";

//! CRDO CLI - Command-line interface for the CRDO core
//!
//! Commands:
//! - replay: Run a recorded location stream through a session
//! - summary: Summarize an export document
//! - convert: Convert an export document between JSON and base64
//! - streak: Compute streaks from a list of completed days
//! - doctor: Diagnose configuration and environment

use chrono::{Local, NaiveDate};
use clap::{Parser, Subcommand, ValueEnum};
use serde::Serialize;
use std::fs;
use std::io::{self, BufRead, BufReader, Read, Write};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing::info;
use tracing_subscriber::EnvFilter;

use crdo_core::format;
use crdo_core::progression::{progress_for_level, MAX_LEVEL};
use crdo_core::replay::{Replay, ReplayCounts, ReplayEvent};
use crdo_core::{
    parse_any, ActivityProcessor, CategoryBoundaries, CompletedDaySet, EngineConfig,
    ExportDocument, HistorySummary, ProgressionEngine, SampleOutcome, StreakTracker, TrackerError,
    UserStats, WorkoutCategory, WorkoutRecord, CORE_VERSION, PRODUCER_NAME,
};

/// CRDO - session tracking and progression engine
#[derive(Parser)]
#[command(name = "crdo")]
#[command(author = "CRDO Contributors")]
#[command(version = CORE_VERSION)]
#[command(about = "Replay workouts and inspect CRDO export documents", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a recorded NDJSON location stream through a session
    Replay {
        /// Input file path (use - for stdin)
        #[arg(short, long)]
        input: PathBuf,

        /// Engine configuration JSON file
        #[arg(long)]
        config: Option<PathBuf>,

        /// Countdown length in seconds (0, 3 or 10)
        #[arg(long)]
        countdown: Option<u32>,

        /// Session ceiling in seconds
        #[arg(long)]
        ceiling: Option<u64>,

        /// Category table used to tag the workout
        #[arg(long)]
        boundaries: Option<BoundaryTable>,

        /// Record the workout into this export document (created if missing)
        #[arg(long)]
        record_into: Option<PathBuf>,

        /// Print a session snapshot after every applied sample
        #[arg(long)]
        snapshots: bool,

        /// Output format
        #[arg(long, default_value = "text")]
        output_format: OutputFormat,
    },

    /// Summarize an export document (JSON or base64)
    Summary {
        /// Input file path (use - for stdin)
        #[arg(short, long)]
        input: PathBuf,

        /// Category table used to group workouts
        #[arg(long, default_value = "standard")]
        boundaries: BoundaryTable,

        /// Output format
        #[arg(long, default_value = "text")]
        output_format: OutputFormat,
    },

    /// Convert an export document between plain JSON and base64
    Convert {
        /// Input file path (use - for stdin)
        #[arg(short, long)]
        input: PathBuf,

        /// Output file path (use - for stdout)
        #[arg(short, long, default_value = "-")]
        output: PathBuf,

        /// Target encoding
        #[arg(long)]
        to: Encoding,
    },

    /// Compute streaks from completed days
    Streak {
        /// JSON array of ISO dates (use - for stdin)
        #[arg(short, long)]
        input: Option<PathBuf>,

        /// Completed day, may be repeated
        #[arg(long = "day")]
        days: Vec<NaiveDate>,

        /// Reference date (defaults to the local date)
        #[arg(long)]
        today: Option<NaiveDate>,

        /// Length of the recent-days strip
        #[arg(long, default_value = "14")]
        window: u32,

        /// Output format
        #[arg(long, default_value = "text")]
        output_format: OutputFormat,
    },

    /// Diagnose configuration and environment
    Doctor {
        /// Check an engine configuration file
        #[arg(long)]
        config: Option<PathBuf>,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum OutputFormat {
    /// Human-readable text
    Text,
    /// Compact JSON
    Json,
    /// Pretty-printed JSON
    JsonPretty,
}

#[derive(Clone, Copy, ValueEnum)]
enum BoundaryTable {
    /// Non-overlapping race distances
    Standard,
    /// Historical table
    Legacy,
}

impl From<BoundaryTable> for CategoryBoundaries {
    fn from(table: BoundaryTable) -> Self {
        match table {
            BoundaryTable::Standard => CategoryBoundaries::Standard,
            BoundaryTable::Legacy => CategoryBoundaries::Legacy,
        }
    }
}

#[derive(Clone, Copy, ValueEnum)]
enum Encoding {
    /// Pretty-printed JSON
    Json,
    /// Base64 of the JSON text
    Base64,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .try_init();

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!(
                "{}",
                serde_json::to_string(&CliError::from(e))
                    .unwrap_or_else(|_| "Unknown error".to_string())
            );
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<(), CrdoCliError> {
    match cli.command {
        Commands::Replay {
            input,
            config,
            countdown,
            ceiling,
            boundaries,
            record_into,
            snapshots,
            output_format,
        } => {
            let mut engine_config = load_config(config.as_deref())?;
            if let Some(seconds) = countdown {
                engine_config.countdown_seconds = seconds;
            }
            if let Some(seconds) = ceiling {
                engine_config.session_ceiling_seconds = seconds;
            }
            if let Some(table) = boundaries {
                engine_config.category_boundaries = table.into();
            }
            engine_config.validate()?;
            cmd_replay(
                &input,
                engine_config,
                record_into.as_deref(),
                snapshots,
                output_format,
            )
        }
        Commands::Summary {
            input,
            boundaries,
            output_format,
        } => cmd_summary(&input, boundaries, output_format),
        Commands::Convert { input, output, to } => cmd_convert(&input, &output, to),
        Commands::Streak {
            input,
            days,
            today,
            window,
            output_format,
        } => cmd_streak(input.as_deref(), days, today, window, output_format),
        Commands::Doctor { config, json } => cmd_doctor(config.as_deref(), json),
    }
}

fn read_input(input: &Path) -> Result<String, CrdoCliError> {
    if input.to_string_lossy() == "-" {
        let mut buffer = String::new();
        io::stdin().read_to_string(&mut buffer)?;
        Ok(buffer)
    } else {
        Ok(fs::read_to_string(input)?)
    }
}

fn load_config(path: Option<&Path>) -> Result<EngineConfig, CrdoCliError> {
    match path {
        Some(path) => Ok(EngineConfig::from_json(&fs::read_to_string(path)?)?),
        None => Ok(EngineConfig::default()),
    }
}

fn write_value<T: Serialize>(value: &T, format: OutputFormat) -> Result<(), CrdoCliError> {
    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string(value)?),
        OutputFormat::JsonPretty | OutputFormat::Text => {
            println!("{}", serde_json::to_string_pretty(value)?)
        }
    }
    Ok(())
}

fn cmd_replay(
    input: &Path,
    config: EngineConfig,
    record_into: Option<&Path>,
    snapshots: bool,
    output_format: OutputFormat,
) -> Result<(), CrdoCliError> {
    let reader: Box<dyn BufRead> = if input.to_string_lossy() == "-" {
        Box::new(BufReader::new(io::stdin()))
    } else {
        Box::new(BufReader::new(fs::File::open(input)?))
    };

    let mut replay = Replay::new(config.clone())?;
    let mut stdout = io::stdout();

    for (index, line) in reader.lines().enumerate() {
        let line = line?;
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }

        let event: ReplayEvent = serde_json::from_str(trimmed).map_err(|e| {
            CrdoCliError::ParseError(format!("Failed to parse line {}: {}", index + 1, e))
        })?;

        if let Some(SampleOutcome::Applied(_)) = replay.apply(&event)? {
            if snapshots {
                writeln!(stdout, "{}", serde_json::to_string(&replay.session().snapshot())?)?;
            }
        }
    }

    if replay.is_empty() {
        return Err(CrdoCliError::NoSamples);
    }

    let counts = replay.counts();

    let workout = replay.finish()?.ok_or(CrdoCliError::NoWorkout)?;
    let category = workout.category(config.category_boundaries);

    let stats = match record_into {
        Some(path) => Some(record_workout(path, config, workout.clone())?),
        None => None,
    };

    let report = ReplayReport {
        category,
        pace: workout.pace_min_per_mile().map(format::pace),
        counts,
        workout,
        stats,
    };

    match output_format {
        OutputFormat::Text => {
            let w = &report.workout;
            println!("Workout Replay");
            println!("==============");
            println!("Category:  {}", report.category);
            println!("Duration:  {}", format::workout_duration(w.time));
            println!("Clock:     {}", format::session_clock(w.time));
            println!("Distance:  {:.2} mi", w.distance);
            println!("Avg speed: {:.1} mph", w.average_speed);
            println!("Peak:      {:.1} mph", w.peak_speed);
            println!("Pace:      {}", report.pace.as_deref().unwrap_or("-"));
            println!(
                "Samples:   {} applied, {} discarded",
                report.counts.samples_applied, report.counts.samples_discarded
            );
            if report.counts.controls_ignored > 0 {
                println!(
                    "Controls:  {} ignored after the ceiling",
                    report.counts.controls_ignored
                );
            }
            if let Some(stats) = &report.stats {
                println!();
                print_levels(stats);
            }
        }
        structured => write_value(&report, structured)?,
    }

    Ok(())
}

fn record_workout(
    path: &Path,
    config: EngineConfig,
    workout: WorkoutRecord,
) -> Result<UserStats, CrdoCliError> {
    let mut processor = ActivityProcessor::new(config)?;
    if path.exists() {
        processor.import_str(&fs::read_to_string(path)?)?;
    }

    let outcome = processor.record_workout(workout);
    processor.set_info("producer", PRODUCER_NAME);
    processor.set_info("version", CORE_VERSION);
    fs::write(path, processor.export().to_json()?)?;
    info!(path = %path.display(), "export document updated");

    Ok(outcome.stats)
}

fn print_levels(stats: &UserStats) {
    let engine = ProgressionEngine::with_stats(stats.clone());

    println!("Levels (max {MAX_LEVEL})");
    for (name, level, xp) in [
        ("Runner", stats.runner_level, engine.runner_experience()),
        ("Endurance", stats.endurance_level, engine.endurance_experience()),
        ("Speed", stats.speed_level, engine.speed_experience()),
    ] {
        println!(
            "  {:<10} {:>2}  ({:.0}%)",
            name,
            level,
            progress_for_level(level, xp) * 100.0
        );
    }
}

fn cmd_summary(
    input: &Path,
    boundaries: BoundaryTable,
    output_format: OutputFormat,
) -> Result<(), CrdoCliError> {
    let document = parse_any(&read_input(input)?)?;

    let config = EngineConfig::default().with_category_boundaries(boundaries.into());
    let mut processor = ActivityProcessor::new(config)?;
    processor.import(&document)?;

    let report = SummaryReport {
        summary: processor.history_summary(),
        stats: processor.stats().clone(),
        info: document.info_dict.len(),
    };

    match output_format {
        OutputFormat::Text => {
            let summary = &report.summary;
            println!("Workout History");
            println!("===============");
            println!("Workouts:   {}", summary.workouts);
            println!("Distance:   {:.2} mi", summary.total_distance);
            println!("Time:       {}", format::total_time(summary.total_time));
            println!("Info keys:  {}", report.info);
            if !summary.by_category.is_empty() {
                println!("\nBy category:");
                for category in WorkoutCategory::ALL {
                    if let Some(count) = summary.by_category.get(&category) {
                        println!("  {:<14} {}", category.label(), count);
                    }
                }
            }
            println!();
            print_levels(&report.stats);
        }
        structured => write_value(&report, structured)?,
    }

    Ok(())
}

fn cmd_convert(input: &Path, output: &Path, to: Encoding) -> Result<(), CrdoCliError> {
    let document: ExportDocument = parse_any(&read_input(input)?)?;

    // Make sure every record would import before handing the file on
    document.decode()?;

    let encoded = match to {
        Encoding::Json => document.to_json()?,
        Encoding::Base64 => document.to_base64()?,
    };

    if output.to_string_lossy() == "-" {
        println!("{}", encoded);
    } else {
        fs::write(output, encoded)?;
    }

    Ok(())
}

fn cmd_streak(
    input: Option<&Path>,
    days: Vec<NaiveDate>,
    today: Option<NaiveDate>,
    window: u32,
    output_format: OutputFormat,
) -> Result<(), CrdoCliError> {
    let mut completed: CompletedDaySet = match input {
        Some(path) => serde_json::from_str(&read_input(path)?)?,
        None => CompletedDaySet::new(),
    };
    for day in days {
        completed.insert(day);
    }

    let today = today.unwrap_or_else(|| Local::now().date_naive());
    let tracker = StreakTracker::new(&completed);
    let report = StreakReport {
        today,
        current_streak: tracker.current_streak(today),
        longest_streak: tracker.longest_streak(),
        completed_days: completed.len(),
        recent: tracker
            .recent_days(today, window)
            .into_iter()
            .map(|d| d.completed)
            .collect(),
    };

    match output_format {
        OutputFormat::Text => {
            let strip: String = report
                .recent
                .iter()
                .map(|done| if *done { '#' } else { '.' })
                .collect();
            println!("Current streak: {}", report.current_streak);
            println!("Longest streak: {}", report.longest_streak);
            println!("Completed days: {}", report.completed_days);
            println!("Last {} days:   {}", window, strip);
        }
        structured => write_value(&report, structured)?,
    }

    Ok(())
}

fn cmd_doctor(config: Option<&Path>, json: bool) -> Result<(), CrdoCliError> {
    let mut checks: Vec<DoctorCheck> = Vec::new();

    checks.push(DoctorCheck {
        name: "core_version".to_string(),
        status: CheckStatus::Ok,
        message: format!("CRDO core version {}", CORE_VERSION),
    });

    if let Some(config_path) = config {
        if config_path.exists() {
            match fs::read_to_string(config_path) {
                Ok(content) => match EngineConfig::from_json(&content) {
                    Ok(config) => checks.push(DoctorCheck {
                        name: "config".to_string(),
                        status: CheckStatus::Ok,
                        message: format!(
                            "Config valid (countdown {}s, ceiling {}s, goal {}s)",
                            config.countdown_seconds,
                            config.session_ceiling_seconds,
                            config.daily_goal_seconds
                        ),
                    }),
                    Err(e) => checks.push(DoctorCheck {
                        name: "config".to_string(),
                        status: CheckStatus::Error,
                        message: e.to_string(),
                    }),
                },
                Err(e) => checks.push(DoctorCheck {
                    name: "config".to_string(),
                    status: CheckStatus::Error,
                    message: format!("Cannot read config file: {}", e),
                }),
            }
        } else {
            checks.push(DoctorCheck {
                name: "config".to_string(),
                status: CheckStatus::Warning,
                message: "Config file does not exist, defaults apply".to_string(),
            });
        }
    }

    let stdin_check = if atty::is(atty::Stream::Stdin) {
        DoctorCheck {
            name: "stdin".to_string(),
            status: CheckStatus::Ok,
            message: "stdin is a TTY (interactive mode)".to_string(),
        }
    } else {
        DoctorCheck {
            name: "stdin".to_string(),
            status: CheckStatus::Ok,
            message: "stdin is a pipe (replay ready)".to_string(),
        }
    };
    checks.push(stdin_check);

    let report = DoctorReport {
        producer: PRODUCER_NAME.to_string(),
        version: CORE_VERSION.to_string(),
        checks,
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!("CRDO Doctor Report");
        println!("==================");
        println!("Producer: {}", report.producer);
        println!("Version:  {}", report.version);
        println!("\nChecks:");
        for check in &report.checks {
            let status_icon = match check.status {
                CheckStatus::Ok => "[OK]",
                CheckStatus::Warning => "[WARN]",
                CheckStatus::Error => "[ERR]",
            };
            println!("  {} {}: {}", status_icon, check.name, check.message);
        }
    }

    let has_errors = report
        .checks
        .iter()
        .any(|c| matches!(c.status, CheckStatus::Error));
    if has_errors {
        Err(CrdoCliError::DoctorFailed)
    } else {
        Ok(())
    }
}

// Error types

#[derive(Debug)]
enum CrdoCliError {
    Io(io::Error),
    Tracker(TrackerError),
    Json(serde_json::Error),
    NoSamples,
    NoWorkout,
    DoctorFailed,
    ParseError(String),
}

impl From<io::Error> for CrdoCliError {
    fn from(e: io::Error) -> Self {
        CrdoCliError::Io(e)
    }
}

impl From<TrackerError> for CrdoCliError {
    fn from(e: TrackerError) -> Self {
        CrdoCliError::Tracker(e)
    }
}

impl From<serde_json::Error> for CrdoCliError {
    fn from(e: serde_json::Error) -> Self {
        CrdoCliError::Json(e)
    }
}

#[derive(serde::Serialize)]
struct CliError {
    code: String,
    message: String,
    hint: Option<String>,
}

impl From<CrdoCliError> for CliError {
    fn from(e: CrdoCliError) -> Self {
        match e {
            CrdoCliError::Tracker(e @ TrackerError::InvalidTransition { .. }) => CliError {
                code: "INVALID_TRANSITION".to_string(),
                message: e.to_string(),
                hint: Some("Check the order of control events in the stream".to_string()),
            },
            CrdoCliError::Tracker(e @ TrackerError::InvalidConfig(_)) => CliError {
                code: "INVALID_CONFIG".to_string(),
                message: e.to_string(),
                hint: Some("Run 'crdo doctor --config <file>' for details".to_string()),
            },
            CrdoCliError::Tracker(TrackerError::JsonError(e)) | CrdoCliError::Json(e) => {
                CliError {
                    code: "JSON_ERROR".to_string(),
                    message: e.to_string(),
                    hint: Some("Check JSON syntax".to_string()),
                }
            }
            CrdoCliError::Tracker(TrackerError::IoError(e)) | CrdoCliError::Io(e) => CliError {
                code: "IO_ERROR".to_string(),
                message: e.to_string(),
                hint: Some("Check file paths and permissions".to_string()),
            },
            CrdoCliError::Tracker(e) => CliError {
                code: "IMPORT_ERROR".to_string(),
                message: e.to_string(),
                hint: Some("Ensure the input is a CRDO export document".to_string()),
            },
            CrdoCliError::NoSamples => CliError {
                code: "NO_SAMPLES".to_string(),
                message: "No location samples found in input".to_string(),
                hint: Some("Ensure input file is not empty".to_string()),
            },
            CrdoCliError::NoWorkout => CliError {
                code: "NO_WORKOUT".to_string(),
                message: "Session ended without a workout".to_string(),
                hint: Some("A session must run before it can produce a workout".to_string()),
            },
            CrdoCliError::DoctorFailed => CliError {
                code: "DOCTOR_FAILED".to_string(),
                message: "One or more health checks failed".to_string(),
                hint: Some("Review the doctor report for details".to_string()),
            },
            CrdoCliError::ParseError(msg) => CliError {
                code: "PARSE_ERROR".to_string(),
                message: msg,
                hint: Some("Each line must be a location sample or a control event".to_string()),
            },
        }
    }
}

// Report types

#[derive(serde::Serialize)]
struct ReplayReport {
    workout: WorkoutRecord,
    category: WorkoutCategory,
    pace: Option<String>,
    #[serde(flatten)]
    counts: ReplayCounts,
    #[serde(skip_serializing_if = "Option::is_none")]
    stats: Option<UserStats>,
}

#[derive(serde::Serialize)]
struct SummaryReport {
    summary: HistorySummary,
    stats: UserStats,
    info: usize,
}

#[derive(serde::Serialize)]
struct StreakReport {
    today: NaiveDate,
    current_streak: u32,
    longest_streak: u32,
    completed_days: usize,
    recent: Vec<bool>,
}

#[derive(serde::Serialize)]
struct DoctorReport {
    producer: String,
    version: String,
    checks: Vec<DoctorCheck>,
}

#[derive(serde::Serialize)]
struct DoctorCheck {
    name: String,
    status: CheckStatus,
    message: String,
}

#[derive(serde::Serialize)]
enum CheckStatus {
    Ok,
    Warning,
    Error,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn code_for(e: CrdoCliError) -> String {
        CliError::from(e).code
    }

    #[test]
    fn test_config_load_errors_keep_their_codes() {
        let json = serde_json::from_str::<EngineConfig>("{ nope").unwrap_err();
        assert_eq!(code_for(TrackerError::from(json).into()), "JSON_ERROR");

        let io = io::Error::new(io::ErrorKind::NotFound, "config.json");
        assert_eq!(code_for(TrackerError::from(io).into()), "IO_ERROR");

        let invalid = TrackerError::InvalidConfig("tick".to_string());
        assert_eq!(code_for(invalid.into()), "INVALID_CONFIG");
    }

    #[test]
    fn test_import_errors_map_to_import_code() {
        let err = parse_any("***not base64***").unwrap_err();
        assert_eq!(code_for(err.into()), "IMPORT_ERROR");
    }
}

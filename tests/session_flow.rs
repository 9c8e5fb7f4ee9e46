use std::thread;
use std::time::Duration;

use chrono::{NaiveDate, TimeZone, Utc};
use pretty_assertions::assert_eq;

use crdo_core::{
    ActivityProcessor, Coordinate, EngineConfig, LocationSample, SampleOutcome, SessionState,
    SessionStateMachine, SharedSession, WorkoutCategory,
};

fn sample_at(second: u32, latitude: f64) -> LocationSample {
    LocationSample::new(
        Coordinate::new(latitude, -0.1276),
        3.0,
        Utc.with_ymd_and_hms(2025, 6, 10, 7, 0, 0).unwrap()
            + chrono::Duration::seconds(second.into()),
    )
}

fn run_session(session: &mut SessionStateMachine, from: u32, count: u32) {
    for i in from..from + count {
        let outcome = session.process_sample(&sample_at(i, 51.5 + f64::from(i) * 0.00003));
        assert!(matches!(outcome, SampleOutcome::Applied(_)));
        session.advance(Duration::from_secs(1));
    }
}

#[test]
fn test_full_session_into_processor_and_back() {
    let config = EngineConfig::default();
    let mut processor = ActivityProcessor::new(config.clone()).unwrap();
    let mut session = processor.new_session();

    assert_eq!(session.start().unwrap(), SessionState::Countdown { remaining: 3 });
    for expected in [2, 1, 0] {
        assert_eq!(
            session.advance_countdown().unwrap(),
            SessionState::Countdown { remaining: expected }
        );
    }
    assert_eq!(session.advance_countdown().unwrap(), SessionState::Running);

    run_session(&mut session, 0, 20);
    session.pause().unwrap();
    let distance_at_pause = session.distance_miles();

    session.advance(Duration::from_secs(5));
    assert_eq!(
        session.process_sample(&sample_at(21, 52.0)),
        SampleOutcome::Discarded
    );
    assert_eq!(session.distance_miles(), distance_at_pause);

    session.resume().unwrap();
    run_session(&mut session, 20, 5);

    let ended_at = Utc.with_ymd_and_hms(2025, 6, 10, 7, 0, 30).unwrap();
    assert_eq!(session.end_at(ended_at).unwrap(), SessionState::Ended);

    let workout = session.take_workout().unwrap();
    assert_eq!(workout.time, 25.0);
    assert_eq!(workout.route.len(), 25);
    assert!(workout.distance > 0.0);
    assert!((workout.average_speed - 3.0 * 2.237).abs() < 1e-9);
    assert!(session.take_workout().is_none());

    let day = NaiveDate::from_ymd_opt(2025, 6, 10).unwrap();
    let outcome = processor.record_workout_on(workout.clone(), day);
    assert_eq!(outcome.category, WorkoutCategory::Short);
    assert!(!outcome.goal_newly_met);
    assert_eq!(processor.remaining_goal_seconds(day), 875.0);
    assert_eq!(outcome.stats.total_workouts, 1);

    let exported = processor.export().to_base64().unwrap();
    let mut restored = ActivityProcessor::new(config).unwrap();
    restored.import_str(&exported).unwrap();

    let workouts = restored.workouts();
    assert_eq!(workouts.len(), 1);
    assert_eq!(workouts[0].distance.to_bits(), workout.distance.to_bits());
    assert_eq!(workouts[0].time, workout.time);
    assert_eq!(workouts[0].route, workout.route);
    assert_eq!(workouts[0].date, ended_at);
    assert_eq!(restored.stats(), processor.stats());
}

#[test]
fn test_daily_goal_builds_streak() {
    let mut processor = ActivityProcessor::new(EngineConfig::default()).unwrap();
    let first = NaiveDate::from_ymd_opt(2025, 6, 8).unwrap();

    for offset in 0..3u64 {
        let day = first + chrono::Days::new(offset);
        let config = EngineConfig::default().with_countdown(0);
        let mut session = SessionStateMachine::new(config).unwrap();
        session.start().unwrap();
        // runs to the ceiling and ends itself
        let state = session.advance(Duration::from_secs(900));
        assert_eq!(state, SessionState::Ended);

        let workout = session.take_workout().unwrap();
        assert_eq!(workout.time, 900.0);
        assert!(processor.record_workout_on(workout, day).goal_newly_met);
    }

    let today = NaiveDate::from_ymd_opt(2025, 6, 10).unwrap();
    assert_eq!(processor.current_streak(today), 3);
    assert_eq!(processor.longest_streak(), 3);
    assert_eq!(processor.goal_fraction(today), 1.0);
}

#[test]
fn test_shared_session_across_threads() {
    let session = SharedSession::new(EngineConfig::default().with_countdown(0)).unwrap();
    session.start().unwrap();

    let clock = {
        let session = session.clone();
        thread::spawn(move || {
            for _ in 0..100 {
                session.tick();
            }
        })
    };
    let location = {
        let session = session.clone();
        thread::spawn(move || {
            for i in 0..10 {
                session.process_sample(&sample_at(i, 51.5 + f64::from(i) * 0.00003));
            }
        })
    };
    clock.join().unwrap();
    location.join().unwrap();

    assert_eq!(session.elapsed_seconds(), 1.0);
    session.end().unwrap();

    let workout = session.take_workout().unwrap();
    assert_eq!(workout.route.len(), 10);
    assert_eq!(workout.time, 1.0);
}

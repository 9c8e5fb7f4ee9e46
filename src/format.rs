//! Clock and duration display strings

/// Session clock: `MM:SS.hh`
pub fn session_clock(seconds: f64) -> String {
    let seconds = seconds.max(0.0);
    let whole = seconds.floor() as u64;
    let hundredths = ((seconds - seconds.floor()) * 100.0) as u64;
    format!("{:02}:{:02}.{:02}", whole / 60, whole % 60, hundredths.min(99))
}

/// Daily progress clock: `MM:SS.hh`, or `H:MM:SS.hh` past an hour
pub fn daily_clock(seconds: f64) -> String {
    let seconds = seconds.max(0.0);
    let whole = seconds.floor() as u64;
    let hundredths = (((seconds - seconds.floor()) * 100.0) as u64).min(99);
    let hours = whole / 3600;
    let minutes = (whole % 3600) / 60;
    let secs = whole % 60;
    if hours > 0 {
        format!("{hours}:{minutes:02}:{secs:02}.{hundredths:02}")
    } else {
        format!("{minutes:02}:{secs:02}.{hundredths:02}")
    }
}

/// `HH:MM:SS`
pub fn hms(seconds: f64) -> String {
    let whole = seconds.max(0.0) as u64;
    format!("{:02}:{:02}:{:02}", whole / 3600, (whole % 3600) / 60, whole % 60)
}

/// Compact total such as `3h 25m`
pub fn total_time(seconds: f64) -> String {
    let whole = seconds.max(0.0) as u64;
    format!("{}h {}m", whole / 3600, (whole % 3600) / 60)
}

/// Workout card duration: `1h 5m` or `12m 30s`
pub fn workout_duration(seconds: f64) -> String {
    let whole = seconds.max(0.0) as u64;
    let hours = whole / 3600;
    let minutes = (whole % 3600) / 60;
    if hours > 0 {
        format!("{hours}h {minutes}m")
    } else {
        format!("{minutes}m {}s", whole % 60)
    }
}

/// Pace as `M:SS /mi`
pub fn pace(min_per_mile: f64) -> String {
    let total = (min_per_mile.max(0.0) * 60.0).round() as u64;
    format!("{}:{:02} /mi", total / 60, total % 60)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_session_clock() {
        assert_eq!(session_clock(0.0), "00:00.00");
        assert_eq!(session_clock(65.25), "01:05.25");
        assert_eq!(session_clock(900.0), "15:00.00");
    }

    #[test]
    fn test_daily_clock() {
        assert_eq!(daily_clock(754.5), "12:34.50");
        assert_eq!(daily_clock(3725.0), "1:02:05.00");
    }

    #[test]
    fn test_durations() {
        assert_eq!(hms(3725.0), "01:02:05");
        assert_eq!(total_time(12_300.0), "3h 25m");
        assert_eq!(workout_duration(750.0), "12m 30s");
        assert_eq!(workout_duration(3900.0), "1h 5m");
    }

    #[test]
    fn test_pace() {
        assert_eq!(pace(8.5), "8:30 /mi");
        assert_eq!(pace(10.0), "10:00 /mi");
    }
}

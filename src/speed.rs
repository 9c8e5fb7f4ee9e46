//! Speed statistics for a single session

/// Whole-session speed accumulator (mph)
#[derive(Debug, Clone, Default)]
pub struct SpeedTracker {
    readings: Vec<f64>,
    sum: f64,
    peak: f64,
    current: f64,
}

impl SpeedTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record an instantaneous reading.
    ///
    /// Negative or NaN readings mean the sensor had no speed: the current
    /// speed drops to zero and nothing is appended.
    pub fn record(&mut self, instantaneous_mph: f64) {
        if instantaneous_mph.is_nan() || instantaneous_mph < 0.0 {
            self.current = 0.0;
            return;
        }
        self.current = instantaneous_mph;
        self.readings.push(instantaneous_mph);
        self.sum += instantaneous_mph;
        if instantaneous_mph > self.peak {
            self.peak = instantaneous_mph;
        }
    }

    pub fn current_mph(&self) -> f64 {
        self.current
    }

    pub fn average_mph(&self) -> f64 {
        if self.readings.is_empty() {
            return 0.0;
        }
        self.sum / self.readings.len() as f64
    }

    pub fn peak_mph(&self) -> f64 {
        self.peak
    }

    pub fn sample_count(&self) -> usize {
        self.readings.len()
    }

    pub fn readings(&self) -> &[f64] {
        &self.readings
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

use super::config::ClockConfig;

/// Accelerated time of day.
///
/// The hour of day wraps from 24 back to 0; `total_hours` keeps counting so
/// session billing never has to reason about midnight.
#[derive(Debug, Clone)]
pub struct GameClock {
    start_hour: f64,
    total_hours: f64,
    hours_per_second: f64,
}

impl GameClock {
    pub fn new(config: &ClockConfig) -> Self {
        Self {
            start_hour: config.start_hour.rem_euclid(24.0),
            total_hours: 0.0,
            hours_per_second: config.hours_per_second,
        }
    }

    /// Advance by `dt_secs` real seconds; time stands still while the doors are closed.
    /// Returns true when the hour of day wrapped past midnight.
    pub fn advance(&mut self, dt_secs: f32, doors_open: bool) -> bool {
        if !doors_open || dt_secs <= 0.0 {
            return false;
        }
        let day_before = self.day();
        self.total_hours += dt_secs as f64 * self.hours_per_second;
        self.day() != day_before
    }

    /// Hour of day in [0, 24)
    pub fn hour_of_day(&self) -> f64 {
        (self.start_hour + self.total_hours).rem_euclid(24.0)
    }

    /// Game hours elapsed since opening, monotonic
    pub fn total_hours(&self) -> f64 {
        self.total_hours
    }

    /// Number of midnights passed since opening
    pub fn day(&self) -> u64 {
        ((self.start_hour + self.total_hours) / 24.0).floor() as u64
    }

    pub fn hours_per_second(&self) -> f64 {
        self.hours_per_second
    }
}

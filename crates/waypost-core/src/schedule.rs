use std::time::Duration;

pub const DEFAULT_INITIAL_DELAY: Duration = Duration::from_secs(10);
pub const DEFAULT_INTERVAL: Duration = Duration::from_secs(5);

/// Timing of the critical-service reaper, fixed for the lifetime of a host.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReaperSchedule {
    pub initial_delay: Duration,
    pub interval: Duration,
}

impl ReaperSchedule {
    pub fn new(initial_delay: Duration, interval: Duration) -> Self {
        Self { initial_delay, interval }
    }

    /// Builds a schedule where `None` or a zero duration means "use the default".
    pub fn resolve(initial_delay: Option<Duration>, interval: Option<Duration>) -> Self {
        Self {
            initial_delay: initial_delay.filter(|d| !d.is_zero()).unwrap_or(DEFAULT_INITIAL_DELAY),
            interval: interval.filter(|d| !d.is_zero()).unwrap_or(DEFAULT_INTERVAL),
        }
    }
}

impl Default for ReaperSchedule {
    fn default() -> Self {
        Self::new(DEFAULT_INITIAL_DELAY, DEFAULT_INTERVAL)
    }
}

use std::time::Duration;

/// Every schedule the panel runs on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timings {
    /// Cadence of the recurring job-status poll.
    pub status_interval: Duration,
    /// Cadence of the recurring statistics poll.
    pub statistics_interval: Duration,
    /// Lifetime of success and error toasts.
    pub toast_duration: Duration,
    /// Lifetime of info toasts.
    pub info_toast_duration: Duration,
    /// Wait before the extra status poll that follows a start/stop command.
    pub settle_delay: Duration,
    /// Wait between a first-time save and the switch to the dashboard.
    pub setup_complete_delay: Duration,
}

impl Default for Timings {
    fn default() -> Self {
        Self {
            status_interval: Duration::from_secs(5),
            statistics_interval: Duration::from_secs(30),
            toast_duration: Duration::from_secs(5),
            info_toast_duration: Duration::from_secs(8),
            settle_delay: Duration::from_millis(1000),
            setup_complete_delay: Duration::from_millis(1500),
        }
    }
}

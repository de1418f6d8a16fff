use chrono::{DateTime, Duration, Utc};
use serde::Serialize;

/// Inclusive range of instants over which events are counted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TimeWindow {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl TimeWindow {
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        Self { start, end }
    }

    /// The window covering the last `days` days up to now.
    pub fn last_days(days: u32) -> Self {
        Self::ending_at(Utc::now(), days)
    }

    /// A start earlier than chrono can represent is clamped to its minimum.
    pub fn ending_at(end: DateTime<Utc>, days: u32) -> Self {
        let start = end
            .checked_sub_signed(Duration::days(i64::from(days)))
            .unwrap_or(DateTime::<Utc>::MIN_UTC);
        Self { start, end }
    }

    pub fn contains(&self, ts: &DateTime<Utc>) -> bool {
        self.start <= *ts && *ts <= self.end
    }
}

/// Format a wait duration for log lines, e.g. `1h 2m 5s` or `0.5s`.
pub fn format_wait(wait: std::time::Duration) -> String {
    let secs = wait.as_secs();
    if secs == 0 {
        return format!("{:.1}s", wait.as_secs_f64());
    }

    let hours = secs / 3600;
    let minutes = (secs % 3600) / 60;
    let seconds = secs % 60;

    if hours > 0 {
        format!("{}h {}m {}s", hours, minutes, seconds)
    } else if minutes > 0 {
        format!("{}m {}s", minutes, seconds)
    } else {
        format!("{}s", seconds)
    }
}

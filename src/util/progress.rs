//! Countdown display for long waits.

use indicatif::{ProgressBar, ProgressStyle};
use std::time::Duration;

use super::time::format_wait;

const TICK: Duration = Duration::from_secs(1);

/// Sleep for exactly `wait`, redrawing a countdown on stderr once per second.
///
/// Waits shorter than one tick sleep silently. Nothing is drawn when stderr
/// is not a terminal.
pub async fn sleep_with_progress(wait: Duration) {
    if wait < TICK {
        tokio::time::sleep(wait).await;
        return;
    }

    let whole_secs = wait.as_secs();
    let bar = ProgressBar::new(whole_secs);
    if let Ok(style) = ProgressStyle::with_template("{prefix:>12.bold.yellow} [{bar:25}] {msg}") {
        bar.set_style(style.progress_chars("=> "));
    }
    bar.set_prefix("Sleeping");

    for elapsed in 0..whole_secs {
        let remaining = wait.saturating_sub(Duration::from_secs(elapsed));
        bar.set_message(format!("{} remaining", format_wait(remaining)));
        tokio::time::sleep(TICK).await;
        bar.inc(1);
    }

    let rest = wait.saturating_sub(Duration::from_secs(whole_secs));
    if !rest.is_zero() {
        tokio::time::sleep(rest).await;
    }

    bar.finish_and_clear();
}

use std::ops::ControlFlow;
use std::time::Duration;

use chrono::{DateTime, SecondsFormat, Utc};
use tokio::time::{MissedTickBehavior, interval};
use zoe_core::{RoundError, RoundOutcome};

use crate::session::Session;

/// What an autonomous session sends and how often.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Schedule {
    /// The message sent on every tick.
    pub prompt: String,
    /// Time between ticks. The first tick fires immediately.
    pub interval: Duration,
}

impl Schedule {
    /// Creates a schedule ticking every `minutes`.
    #[inline]
    pub fn every_minutes(prompt: impl Into<String>, minutes: u64) -> Self {
        Self {
            prompt: prompt.into(),
            interval: Duration::from_secs(minutes * 60),
        }
    }
}

/// The result of one tick.
#[derive(Debug)]
pub struct TickReport {
    /// When the round finished.
    pub at: DateTime<Utc>,
    /// The round result.
    pub result: Result<RoundOutcome, RoundError>,
}

/// Formats a finished round as a timestamped log line.
pub fn format_tick_line(at: &DateTime<Utc>, text: &str) -> String {
    format!(
        "[{}] Assistant: {text}",
        at.to_rfc3339_opts(SecondsFormat::Millis, true)
    )
}

/// Sends the scheduled prompt on every tick until `on_tick` breaks.
///
/// Rounds run one at a time: a tick that falls due while a round is still
/// running is skipped rather than queued. Failed rounds are handed to
/// `on_tick` like successful ones.
pub async fn run_autonomous<F>(
    session: &mut Session,
    schedule: &Schedule,
    mut on_tick: F,
) where
    F: FnMut(TickReport) -> ControlFlow<()>,
{
    let mut ticker = interval(schedule.interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        ticker.tick().await;
        let result = session.send_message(&schedule.prompt).await;
        if let Err(err) = &result {
            warn!("scheduled round failed: {err}");
        }
        let report = TickReport {
            at: Utc::now(),
            result,
        };
        if on_tick(report).is_break() {
            break;
        }
    }
}

use std::time::Duration;

use chrono::{DateTime, Utc};
use log::{error, info, warn};
use reqwest::Client;
use tokio::time::sleep;

use crate::config::Config;
use crate::http;
use crate::notify::Notifier;
use crate::parser::{self, BucketStatus};

/// Seconds added to the retry delay per consecutive fetch failure.
const RETRY_STEP_SECS: u64 = 30;
/// Fixed wait when the endpoint answered but reported no buckets.
const EMPTY_PAYLOAD_DELAY: Duration = Duration::from_secs(60);
/// Fixed wait when every reported reset instant has already passed.
const STALE_DATA_DELAY: Duration = Duration::from_secs(30);
/// How far past the reset instant a wake-up still counts as on time.
const MISSED_WINDOW_SECS: i64 = 60;
/// Grace period after a reset before re-querying, letting upstream settle.
const SETTLE_DELAY: Duration = Duration::from_secs(5);
/// Pause after an unexpected cycle fault before resuming the loop.
const FAULT_PAUSE: Duration = Duration::from_secs(60);

/// A bucket whose reset is still ahead, with the distance recomputed from
/// the wall clock at evaluation time. Never cached across sleeps.
#[derive(Debug, Clone, PartialEq)]
pub struct PendingReset {
    pub bucket_id: String,
    pub reset_at: DateTime<Utc>,
    pub utilization: f64,
    pub seconds_until: f64,
}

/// The only state carried from one cycle to the next.
#[derive(Debug, Default)]
pub struct MonitorState {
    pub retry_count: u32,
}

#[derive(Debug, PartialEq)]
pub(crate) enum NextStep {
    /// Endpoint reachable but nothing monitorable in the payload.
    RetryEmpty,
    /// Buckets parsed, but every reset instant is already in the past.
    RetryAllPast,
    /// Sleep until just before the nearest upcoming reset.
    Wait { target: PendingReset, sleep: Duration },
}

#[derive(Debug, PartialEq)]
pub(crate) enum WakeOutcome {
    /// Within the notification window around the reset instant.
    Reached,
    /// Beyond the missed-window threshold; restart the cycle instead.
    Missed,
    /// Woke before the window opened; wait this much and re-check.
    Early(Duration),
}

fn seconds_between(from: DateTime<Utc>, to: DateTime<Utc>) -> f64 {
    (to - from).num_milliseconds() as f64 / 1000.0
}

/// Capped linear backoff for consecutive fetch failures.
pub(crate) fn retry_delay(retry_count: u32, max_retry_delay_secs: u64) -> Duration {
    let secs = RETRY_STEP_SECS
        .saturating_mul(u64::from(retry_count))
        .min(max_retry_delay_secs);
    Duration::from_secs(secs)
}

/// Decide what this cycle does with the freshly parsed bucket set.
/// Upcoming buckets are logged with hours-until-reset, past ones as stale;
/// ties on the minimum break by first-seen order.
pub(crate) fn plan_cycle(
    buckets: &[BucketStatus],
    now: DateTime<Utc>,
    sleep_buffer_secs: u64,
) -> NextStep {
    if buckets.is_empty() {
        return NextStep::RetryEmpty;
    }

    let mut next: Option<PendingReset> = None;
    for bucket in buckets {
        let seconds_until = seconds_between(now, bucket.reset_at);
        if seconds_until > 0.0 {
            info!(
                "{}: {:.2} hours until reset ({})",
                bucket.bucket_id,
                seconds_until / 3600.0,
                bucket.reset_at.to_rfc3339()
            );
            if next.as_ref().map_or(true, |n| seconds_until < n.seconds_until) {
                next = Some(PendingReset {
                    bucket_id: bucket.bucket_id.clone(),
                    reset_at: bucket.reset_at,
                    utilization: bucket.utilization,
                    seconds_until,
                });
            }
        } else {
            info!(
                "{}: reset time already passed ({})",
                bucket.bucket_id,
                bucket.reset_at.to_rfc3339()
            );
        }
    }

    match next {
        Some(target) => {
            let sleep = Duration::from_secs_f64(
                (target.seconds_until - sleep_buffer_secs as f64).max(0.0),
            );
            NextStep::Wait { target, sleep }
        }
        None => NextStep::RetryAllPast,
    }
}

/// Classify the post-sleep distance to the reset instant.
pub(crate) fn classify_wake(time_until_reset: f64, sleep_buffer_secs: u64) -> WakeOutcome {
    let buffer = sleep_buffer_secs as f64;
    let missed = -(MISSED_WINDOW_SECS as f64);
    if time_until_reset <= buffer && time_until_reset >= missed {
        WakeOutcome::Reached
    } else if time_until_reset < missed {
        WakeOutcome::Missed
    } else {
        WakeOutcome::Early(Duration::from_secs_f64(time_until_reset.max(1.0)))
    }
}

/// Run the monitor until the process is interrupted. Any unexpected fault
/// inside a cycle is logged with full detail and treated as transient.
pub async fn run(cfg: &Config) -> anyhow::Result<()> {
    info!("starting reset monitor");
    info!("  API URL: {}", cfg.api_url);
    info!("  sleep buffer: {}s before reset time", cfg.sleep_buffer_secs);

    let client = http::build_client(cfg)?;
    let notifier = Notifier::new(cfg.clone(), client.clone());
    let mut state = MonitorState::default();

    loop {
        if let Err(e) = cycle(&client, &notifier, cfg, &mut state).await {
            error!("unexpected error in monitoring loop: {e:#}");
            info!("resuming in {}s", FAULT_PAUSE.as_secs());
            sleep(FAULT_PAUSE).await;
        }
    }
}

/// One pass through the state machine: fetch, parse, select, sleep,
/// confirm, notify, settle. Handled failures resolve to `Ok` with the
/// appropriate delay already slept; only unclassified faults return `Err`.
async fn cycle(
    client: &Client,
    notifier: &Notifier,
    cfg: &Config,
    state: &mut MonitorState,
) -> anyhow::Result<()> {
    info!("fetching reset status from API");
    let payload = match http::fetch_status(client, cfg).await {
        Ok(p) => {
            state.retry_count = 0;
            p
        }
        Err(e) => {
            state.retry_count += 1;
            let delay = retry_delay(state.retry_count, cfg.max_retry_delay_secs);
            warn!(
                "fetch failed: {e}; retrying in {}s (attempt {})",
                delay.as_secs(),
                state.retry_count
            );
            sleep(delay).await;
            return Ok(());
        }
    };

    let buckets = parser::parse_buckets(&payload);
    match plan_cycle(&buckets, Utc::now(), cfg.sleep_buffer_secs) {
        NextStep::RetryEmpty => {
            warn!(
                "no reset times found in API response; retrying in {}s",
                EMPTY_PAYLOAD_DELAY.as_secs()
            );
            sleep(EMPTY_PAYLOAD_DELAY).await;
        }
        NextStep::RetryAllPast => {
            warn!(
                "all reset times are in the past; fetching fresh data in {}s",
                STALE_DATA_DELAY.as_secs()
            );
            sleep(STALE_DATA_DELAY).await;
        }
        NextStep::Wait { target, sleep: duration } => {
            if !duration.is_zero() {
                info!(
                    "sleeping {:.2} hours until {} reset ({}s before reset time)",
                    duration.as_secs_f64() / 3600.0,
                    target.bucket_id,
                    cfg.sleep_buffer_secs
                );
                sleep(duration).await;
            }
            confirm_and_notify(client, notifier, cfg, &target).await;
        }
    }
    Ok(())
}

/// Re-check the wall clock after the coarse sleep. Notifies inside the
/// window, warns and gives up on a missed window, or keeps napping until
/// the window opens.
async fn confirm_and_notify(
    client: &Client,
    notifier: &Notifier,
    cfg: &Config,
    target: &PendingReset,
) {
    loop {
        let time_until = seconds_between(Utc::now(), target.reset_at);
        match classify_wake(time_until, cfg.sleep_buffer_secs) {
            WakeOutcome::Reached => {
                info!("reset time reached for {}", target.bucket_id);
                notifier
                    .notify(&target.bucket_id, target.reset_at, target.utilization)
                    .await;
                settle_and_refresh(client, cfg).await;
                return;
            }
            WakeOutcome::Missed => {
                warn!(
                    "missed reset window for {} by {:.0}s",
                    target.bucket_id, -time_until
                );
                return;
            }
            WakeOutcome::Early(remaining) => {
                info!("still {time_until:.1}s until reset, sleeping");
                sleep(remaining).await;
            }
        }
    }
}

/// Give upstream a moment to finish its own reset bookkeeping, then fetch
/// once for visibility. The result is logged, never reused for scheduling;
/// the next cycle always starts clean.
async fn settle_and_refresh(client: &Client, cfg: &Config) {
    info!("waiting {}s for the reset to complete", SETTLE_DELAY.as_secs());
    sleep(SETTLE_DELAY).await;
    info!("fetching fresh data after reset");
    match http::fetch_status(client, cfg).await {
        Ok(payload) => {
            for bucket in parser::parse_buckets(&payload) {
                info!(
                    "  {}: next reset at {}",
                    bucket.bucket_id,
                    bucket.reset_at.to_rfc3339()
                );
            }
        }
        Err(e) => warn!("failed to fetch fresh data after reset: {e}"),
    }
}

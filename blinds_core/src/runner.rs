//! Single-threaded event dispatcher for one session.
//!
//! Change-feed batches and timer expiries are handled strictly one after the
//! other on the calling thread, so the session never sees concurrent events.

use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use blinds_traits::{Changes, Device};
use crossbeam_channel as xch;

use crate::config::RunnerCfg;
use crate::error::{BlindsError, Result};
use crate::session::BlindsSession;
use crate::util::ms_between;

/// Longest single wait, so shutdown requests are noticed promptly.
const MAX_WAIT: Duration = Duration::from_millis(50);

/// How a run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunReport {
    /// Reported position once settled
    pub position: u8,
    /// Wall time of the run on the session clock
    pub elapsed_ms: u64,
    /// Change-feed batches handled
    pub batches: usize,
    /// Timer expiries handled
    pub timers: usize,
}

/// Dispatch feed batches and timers until the session has been idle for
/// `cfg.idle_ms`.
///
/// Fails with `BlindsError::RunTimeout` after `cfg.max_run_ms`,
/// `BlindsError::Interrupted` when `shutdown` is raised and
/// `BlindsError::FeedClosed` if the feed disconnects while the session is
/// still moving.
pub fn run<D: Device>(
    session: &mut BlindsSession<D>,
    feed: &xch::Receiver<Changes>,
    cfg: &RunnerCfg,
    shutdown: &AtomicBool,
) -> Result<RunReport> {
    let start = session.clock().now();
    let mut last_activity = start;
    let mut batches = 0usize;
    let mut timers = 0usize;

    loop {
        if shutdown.load(Ordering::Relaxed) {
            tracing::info!("runner interrupted");
            return Err(BlindsError::Interrupted.into());
        }

        let now = session.clock().now();
        let elapsed_ms = ms_between(start, now) as u64;
        if elapsed_ms >= cfg.max_run_ms {
            tracing::warn!(elapsed_ms, max_run_ms = cfg.max_run_ms, "run did not settle");
            return Err(BlindsError::RunTimeout(cfg.max_run_ms).into());
        }

        let fired = session.poll_timers();
        if fired > 0 {
            timers += fired;
            last_activity = now;
        }

        if session.is_idle() && ms_between(last_activity, now) >= cfg.idle_ms as f64 {
            let report = RunReport {
                position: session.estimate().reported(),
                elapsed_ms,
                batches,
                timers,
            };
            tracing::info!(?report, "run settled");
            return Ok(report);
        }

        let wait = session
            .next_deadline()
            .map(|d| d.saturating_duration_since(now))
            .unwrap_or(MAX_WAIT)
            .min(MAX_WAIT);

        match feed.recv_timeout(wait) {
            Ok(changes) => {
                session.handle_changes(&changes);
                batches += 1;
                last_activity = session.clock().now();
            }
            Err(xch::RecvTimeoutError::Timeout) => {}
            Err(xch::RecvTimeoutError::Disconnected) => {
                if session.is_idle() {
                    // nothing more can arrive; settle on what we have
                    session.clock().sleep(wait);
                    continue;
                }
                if session.next_deadline().is_some() {
                    // timers can still finish the move
                    session.clock().sleep(wait);
                    continue;
                }
                tracing::warn!("device change feed closed mid-move");
                return Err(BlindsError::FeedClosed.into());
            }
        }
    }
}

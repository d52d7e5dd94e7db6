//! Paced tick loop driving a [`ChainTracker`](crate::ChainTracker).

use crate::ChainTracker;
use crate::error::Result;
use rode_traits::{CountStore, EncoderInput, LengthSink};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

/// Pacing and budget for the tick loop.
#[derive(Debug, Clone, Copy)]
pub struct RunParams {
    /// Tick frequency in Hz.
    pub rate_hz: u32,
    /// Stop after this many ticks; `None` runs until shutdown.
    pub max_ticks: Option<u64>,
}

impl Default for RunParams {
    fn default() -> Self {
        Self {
            rate_hz: 100,
            max_ticks: None,
        }
    }
}

#[inline]
fn period(rate_hz: u32) -> Duration {
    Duration::from_micros((1_000_000 / u64::from(rate_hz.max(1))).max(1))
}

#[inline]
fn budget_exhausted(done: u64, max_ticks: Option<u64>) -> bool {
    matches!(max_ticks, Some(max) if done >= max)
}

/// Drive the tracker until `shutdown` is set or the tick budget runs out.
///
/// Initializes the tracker if the caller has not, paces ticks through the
/// tracker's clock, and flushes any pending count on the way out. Returns
/// the final deployed length in meters.
pub fn run<I, S, P>(
    tracker: &mut ChainTracker<I, S, P>,
    params: RunParams,
    shutdown: &Arc<AtomicBool>,
) -> Result<f32>
where
    I: EncoderInput,
    S: CountStore,
    P: LengthSink,
{
    tracker.init()?;
    let clock = tracker.clock();
    let pause = period(params.rate_hz);
    let mut ticks: u64 = 0;
    tracing::info!(rate_hz = params.rate_hz, "tick loop started");

    while !shutdown.load(Ordering::Relaxed) && !budget_exhausted(ticks, params.max_ticks) {
        let status = tracker.tick()?;
        if let Some(direction) = status.movement {
            tracing::trace!(?direction, deployed_m = status.deployed_m, "tick");
        }
        ticks = ticks.saturating_add(1);
        clock.sleep(pause);
    }

    // Do not leave a changed count unpersisted across shutdown.
    if tracker.pending_write()
        && let Err(e) = tracker.flush_now()
    {
        tracing::warn!(error = %e, "final flush failed");
    }

    let deployed_m = tracker.deployed_m();
    tracing::info!(deployed_m, ticks, "tick loop stopped");
    Ok(deployed_m)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn period_is_inverse_of_rate() {
        assert_eq!(period(100), Duration::from_millis(10));
        assert_eq!(period(1), Duration::from_secs(1));
    }

    #[test]
    fn period_guards_zero_rate() {
        assert_eq!(period(0), Duration::from_secs(1));
    }

    #[test]
    fn budget_none_never_exhausts() {
        assert!(!budget_exhausted(u64::MAX, None));
    }

    #[test]
    fn budget_some_exhausts_at_limit() {
        assert!(!budget_exhausted(4, Some(5)));
        assert!(budget_exhausted(5, Some(5)));
    }
}

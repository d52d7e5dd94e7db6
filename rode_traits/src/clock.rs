use std::thread;
use std::time::{Duration, Instant};

/// Time source for the tick loop and flush scheduling.
///
/// `now` yields a monotonic `Instant`, `sleep` paces the loop (test clocks
/// may advance virtual time instead of blocking), and `ms_since` measures
/// the milliseconds elapsed from an epoch `Instant`.
pub trait Clock {
    fn now(&self) -> Instant;
    fn sleep(&self, d: Duration);

    /// Milliseconds since `epoch`; an epoch in the future reads as 0.
    fn ms_since(&self, epoch: Instant) -> u64 {
        let dur = self.now().saturating_duration_since(epoch);
        dur.as_millis() as u64
    }
}

/// Production clock: `std::time::Instant` for time, a real thread sleep
/// for pacing.
#[derive(Debug, Default, Clone, Copy)]
pub struct MonotonicClock;

impl MonotonicClock {
    #[inline]
    pub fn new() -> Self {
        Self
    }
}

impl Clock for MonotonicClock {
    #[inline]
    fn now(&self) -> Instant {
        Instant::now()
    }

    #[inline]
    fn sleep(&self, d: Duration) {
        if d.is_zero() {
            return;
        }
        thread::sleep(d);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ms_since_saturates_for_future_epochs() {
        let clk = MonotonicClock::new();
        let future = clk.now() + Duration::from_secs(60);
        assert_eq!(clk.ms_since(future), 0);
    }

    #[test]
    fn zero_sleep_returns_immediately() {
        let clk = MonotonicClock::new();
        let t0 = Instant::now();
        clk.sleep(Duration::ZERO);
        assert!(t0.elapsed() < Duration::from_millis(50));
    }
}

//! Autonomous blink timer.
//!
//! Eyes close at a random interval, then reopen after a fixed dwell. The
//! schedule runs on timer deadlines, not on frames, so the blink cadence does
//! not depend on the render rate.

use std::cell::Cell;
use std::rc::Rc;
use std::time::Duration;

use rand::{Rng, SeedableRng};
use rand_xoshiro::Xoshiro256PlusPlus;
use serde::{Deserialize, Serialize};

use crate::timer::{TimerId, TimerQueue};

/// Blink cadence settings
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct BlinkConfig {
    /// Shortest time between blinks (milliseconds, inclusive)
    pub min_interval_ms: u64,
    /// Longest time between blinks (milliseconds, exclusive)
    pub max_interval_ms: u64,
    /// How long the eyes stay shut (milliseconds)
    pub dwell_ms: u64,
}

impl Default for BlinkConfig {
    fn default() -> Self {
        Self {
            min_interval_ms: 2000,
            max_interval_ms: 5000,
            dwell_ms: 200,
        }
    }
}

impl BlinkConfig {
    pub fn dwell(&self) -> Duration {
        Duration::from_millis(self.dwell_ms)
    }

    /// Clamp into a schedulable cadence: intervals of at least 1 ms,
    /// `max >= min`, and a dwell that ends before the next blink can start.
    pub fn sanitized(&self) -> Self {
        let mut fixed = self.clone();
        fixed.min_interval_ms = fixed.min_interval_ms.max(1);
        fixed.max_interval_ms = fixed.max_interval_ms.max(fixed.min_interval_ms);
        fixed.dwell_ms = fixed.dwell_ms.min(fixed.min_interval_ms - 1);

        if fixed != *self {
            log::warn!(
                "blink config {}..{} ms, dwell {} ms adjusted to {}..{} ms, dwell {} ms",
                self.min_interval_ms,
                self.max_interval_ms,
                self.dwell_ms,
                fixed.min_interval_ms,
                fixed.max_interval_ms,
                fixed.dwell_ms
            );
        }
        fixed
    }
}

/// Shared "eyes closed" flag. The scheduler writes it, the driver polls it.
#[derive(Debug, Clone, Default)]
pub struct BlinkSignal(Rc<Cell<bool>>);

impl BlinkSignal {
    pub fn is_blinking(&self) -> bool {
        self.0.get()
    }

    fn set(&self, blinking: bool) {
        self.0.set(blinking);
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum BlinkTimer {
    /// Recurring: eyes close
    Close,
    /// One-shot: eyes reopen after the dwell
    Open,
}

pub struct BlinkScheduler<R = Xoshiro256PlusPlus> {
    config: BlinkConfig,
    rng: R,
    timers: TimerQueue<BlinkTimer>,
    recurring: Option<TimerId>,
    signal: BlinkSignal,
    blink_count: u64,
}

impl BlinkScheduler<Xoshiro256PlusPlus> {
    /// Scheduler with a seeded RNG.
    pub fn seeded(config: BlinkConfig, seed: u64) -> Self {
        Self::with_rng(config, Xoshiro256PlusPlus::seed_from_u64(seed))
    }
}

impl<R: Rng> BlinkScheduler<R> {
    /// Out-of-range settings are clamped, see [`BlinkConfig::sanitized`].
    pub fn with_rng(config: BlinkConfig, rng: R) -> Self {
        Self {
            config: config.sanitized(),
            rng,
            timers: TimerQueue::new(),
            recurring: None,
            signal: BlinkSignal::default(),
            blink_count: 0,
        }
    }

    /// Arm the recurring timer, measured from `now`.
    ///
    /// Does nothing if it is already armed.
    pub fn start(&mut self, now: Duration) {
        if self.recurring.is_some() {
            return;
        }
        let interval = self.next_interval();
        self.recurring = Some(self.timers.schedule(now + interval, BlinkTimer::Close));
        log::debug!("blink scheduler started, first blink in {:?}", interval);
    }

    /// Draw the next interval, uniform in `[min_interval_ms, max_interval_ms)`.
    pub fn next_interval(&mut self) -> Duration {
        let min = self.config.min_interval_ms as f64;
        let max = self.config.max_interval_ms as f64;
        if max <= min {
            return Duration::from_millis(self.config.min_interval_ms);
        }
        let ms = self.rng.gen_range(min..max);
        Duration::from_secs_f64(ms / 1000.0)
    }

    /// Fire every timer due at or before `now`, in deadline order.
    pub fn advance(&mut self, now: Duration) {
        while let Some(fired) = self.timers.pop_due(now) {
            match fired.payload {
                BlinkTimer::Close => {
                    self.signal.set(true);
                    self.blink_count += 1;
                    self.timers
                        .schedule(fired.deadline + self.config.dwell(), BlinkTimer::Open);

                    let interval = self.next_interval();
                    self.recurring = Some(
                        self.timers
                            .schedule(fired.deadline + interval, BlinkTimer::Close),
                    );
                    log::debug!(
                        "blink #{} at {:?}, next in {:?}",
                        self.blink_count,
                        fired.deadline,
                        interval
                    );
                }
                BlinkTimer::Open => {
                    self.signal.set(false);
                }
            }
        }
    }

    /// Cancel the recurring timer. An in-flight reopen still fires.
    ///
    /// Calling this again, or before [`BlinkScheduler::start`], is a no-op.
    pub fn cancel(&mut self) {
        if let Some(id) = self.recurring.take() {
            self.timers.cancel(id);
            log::debug!("blink scheduler cancelled after {} blinks", self.blink_count);
        }
    }

    pub fn is_running(&self) -> bool {
        self.recurring.is_some()
    }

    pub fn is_blinking(&self) -> bool {
        self.signal.is_blinking()
    }

    pub fn signal(&self) -> BlinkSignal {
        self.signal.clone()
    }

    /// Number of blinks started so far.
    pub fn blink_count(&self) -> u64 {
        self.blink_count
    }

    pub fn config(&self) -> &BlinkConfig {
        &self.config
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ms(v: u64) -> Duration {
        Duration::from_millis(v)
    }

    /// Step time in 1 ms increments and record (open→closed, closed→open) edges.
    fn record_edges(
        scheduler: &mut BlinkScheduler,
        until_ms: u64,
    ) -> (Vec<u64>, Vec<u64>) {
        let mut closes = Vec::new();
        let mut opens = Vec::new();
        let mut was_blinking = scheduler.is_blinking();
        for t in 0..=until_ms {
            scheduler.advance(ms(t));
            let blinking = scheduler.is_blinking();
            if blinking && !was_blinking {
                closes.push(t);
            } else if !blinking && was_blinking {
                opens.push(t);
            }
            was_blinking = blinking;
        }
        (closes, opens)
    }

    #[test]
    fn test_not_blinking_before_first_interval() {
        let mut scheduler = BlinkScheduler::seeded(BlinkConfig::default(), 1);
        scheduler.start(Duration::ZERO);
        scheduler.advance(ms(1999));
        assert!(!scheduler.is_blinking());
        assert_eq!(scheduler.blink_count(), 0);
    }

    #[test]
    fn test_dwell_is_exactly_200ms() {
        for seed in 0..8 {
            let mut scheduler = BlinkScheduler::seeded(BlinkConfig::default(), seed);
            scheduler.start(Duration::ZERO);
            let (closes, opens) = record_edges(&mut scheduler, 30_000);

            assert!(closes.len() >= 5, "seed {} blinked only {}", seed, closes.len());
            for (close, open) in closes.iter().zip(opens.iter()) {
                // Intervals are fractional ms; on a 1 ms grid the edges can be off by one step each.
                let dwell = open - close;
                assert!((199..=201).contains(&dwell), "dwell was {}ms", dwell);
            }
        }
    }

    #[test]
    fn test_dwell_exact_on_deadlines() {
        let config = BlinkConfig {
            min_interval_ms: 1000,
            max_interval_ms: 1000,
            dwell_ms: 200,
        };
        let mut scheduler = BlinkScheduler::seeded(config, 7);
        scheduler.start(Duration::ZERO);

        scheduler.advance(ms(999));
        assert!(!scheduler.is_blinking());
        scheduler.advance(ms(1000));
        assert!(scheduler.is_blinking());
        scheduler.advance(ms(1199));
        assert!(scheduler.is_blinking());
        scheduler.advance(ms(1200));
        assert!(!scheduler.is_blinking());
    }

    #[test]
    fn test_intervals_in_range_and_roughly_uniform() {
        let mut scheduler = BlinkScheduler::seeded(BlinkConfig::default(), 42);
        let samples = 20_000;
        let mut buckets = [0usize; 6]; // 500ms-wide buckets over [2000, 5000)
        let mut sum = 0.0;

        for _ in 0..samples {
            let ms = scheduler.next_interval().as_secs_f64() * 1000.0;
            assert!((2000.0..5000.0).contains(&ms), "interval {} out of range", ms);
            sum += ms;
            let bucket = ((ms - 2000.0) / 500.0) as usize;
            buckets[bucket.min(5)] += 1;
        }

        let mean = sum / samples as f64;
        assert!((mean - 3500.0).abs() < 30.0, "mean was {}", mean);

        let expected = samples as f64 / 6.0;
        for count in buckets {
            let deviation = (count as f64 - expected).abs() / expected;
            assert!(deviation < 0.08, "bucket deviation {:.3}", deviation);
        }
    }

    #[test]
    fn test_large_time_jump_fires_every_blink() {
        let config = BlinkConfig {
            min_interval_ms: 1000,
            max_interval_ms: 1000,
            dwell_ms: 200,
        };
        let mut scheduler = BlinkScheduler::seeded(config, 3);
        scheduler.start(Duration::ZERO);

        // One slow frame spanning several blinks
        scheduler.advance(ms(5100));
        assert_eq!(scheduler.blink_count(), 5);
        assert!(scheduler.is_blinking());
        scheduler.advance(ms(5200));
        assert!(!scheduler.is_blinking());
    }

    #[test]
    fn test_cancel_lets_inflight_open_finish() {
        let config = BlinkConfig {
            min_interval_ms: 1000,
            max_interval_ms: 1000,
            dwell_ms: 200,
        };
        let mut scheduler = BlinkScheduler::seeded(config, 9);
        scheduler.start(Duration::ZERO);
        scheduler.advance(ms(1050));
        assert!(scheduler.is_blinking());

        scheduler.cancel();
        scheduler.cancel();
        assert!(!scheduler.is_running());

        scheduler.advance(ms(10_000));
        assert!(!scheduler.is_blinking());
        assert_eq!(scheduler.blink_count(), 1);
    }

    #[test]
    fn test_zero_interval_is_clamped() {
        let config = BlinkConfig {
            min_interval_ms: 0,
            max_interval_ms: 0,
            dwell_ms: 0,
        };
        let mut scheduler = BlinkScheduler::seeded(config, 5);
        assert_eq!(scheduler.config().min_interval_ms, 1);
        assert_eq!(scheduler.config().dwell_ms, 0);

        // Must return instead of rescheduling at the same deadline forever
        scheduler.start(Duration::ZERO);
        scheduler.advance(ms(10));
        assert_eq!(scheduler.blink_count(), 10);
    }

    #[test]
    fn test_dwell_longer_than_interval_is_clamped() {
        let config = BlinkConfig {
            min_interval_ms: 150,
            max_interval_ms: 150,
            dwell_ms: 200,
        };
        let mut scheduler = BlinkScheduler::seeded(config, 5);
        assert_eq!(scheduler.config().dwell_ms, 149);

        scheduler.start(Duration::ZERO);
        let (closes, opens) = record_edges(&mut scheduler, 1000);
        assert_eq!(closes, vec![150, 300, 450, 600, 750, 900]);
        for (close, open) in closes.iter().zip(opens.iter()) {
            assert_eq!(open - close, 149);
        }
    }

    #[test]
    fn test_sane_config_is_unchanged() {
        let config = BlinkConfig::default();
        assert_eq!(config.sanitized(), config);

        let inverted = BlinkConfig {
            min_interval_ms: 3000,
            max_interval_ms: 1000,
            dwell_ms: 200,
        };
        assert_eq!(inverted.sanitized().max_interval_ms, 3000);
    }

    #[test]
    fn test_start_twice_keeps_single_timer() {
        let config = BlinkConfig {
            min_interval_ms: 1000,
            max_interval_ms: 1000,
            dwell_ms: 200,
        };
        let mut scheduler = BlinkScheduler::seeded(config, 0);
        scheduler.start(Duration::ZERO);
        scheduler.start(Duration::ZERO);
        scheduler.advance(ms(1000));
        assert_eq!(scheduler.blink_count(), 1);
    }
}

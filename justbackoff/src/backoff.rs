use crate::jitter::{JitterSource, ThreadRandom};
use crate::util::{to_duration, to_seconds};
use std::time::Duration;
use tracing::{debug, trace};

pub const DEFAULT_MIN_MS: f64 = 100.0;
pub const DEFAULT_MAX_MS: f64 = 10_000.0;
pub const DEFAULT_FACTOR: f64 = 2.0;

/// Exponential backoff counter.
///
/// Starts at `min_ms`, is multiplied by `factor` on every call to
/// [`Backoff::duration`] and is capped at `max_ms`. Configuration is fixed
/// at construction; build a new value to change it. Delays are configured in
/// milliseconds and returned in seconds.
///
/// [`Backoff::for_attempt`] only reads configuration and can be shared
/// across threads. [`Backoff::duration`] and [`Backoff::reset`] mutate the
/// counter and need exclusive access.
///
/// No input is rejected. Inverted (`min_ms > max_ms`), negative or zero
/// values produce the degenerate results described on each method.
#[derive(Clone, Debug)]
pub struct Backoff<R = ThreadRandom> {
    min_ms: f64,
    max_ms: f64,
    factor: f64,
    jitter: bool,
    attempt: f64,
    source: R,
}

impl Default for Backoff {
    fn default() -> Self {
        Backoff::new(DEFAULT_MIN_MS, DEFAULT_MAX_MS, DEFAULT_FACTOR, false)
    }
}

impl Backoff {
    /// Jittered delays draw from the thread-local generator.
    pub fn new(min_ms: f64, max_ms: f64, factor: f64, jitter: bool) -> Self {
        Backoff::with_source(min_ms, max_ms, factor, jitter, ThreadRandom)
    }
}

impl<R: JitterSource> Backoff<R> {
    pub fn with_source(min_ms: f64, max_ms: f64, factor: f64, jitter: bool, source: R) -> Self {
        Self {
            min_ms,
            max_ms,
            factor,
            jitter,
            attempt: 0.0,
            source,
        }
    }

    /// Returns the delay for the current attempt, then advances the counter.
    pub fn duration(&mut self) -> f64 {
        let d = self.for_attempt(self.attempt);
        self.attempt += 1.0;
        trace!(attempt = self.attempt, seconds = d, "backoff advanced");
        d
    }

    /// Delay in seconds for attempt `attempt`, the first attempt being 0.
    ///
    /// Computes `min_ms * factor^attempt`. With jitter enabled the value is
    /// replaced by `u * (raw - min_ms) + min_ms` for a sample `u` in `[0, 1)`.
    /// With `factor < 1` the raw value sits under `min_ms`, so the jittered
    /// delay falls below the floor. Anything above `max_ms` returns `max_ms`
    /// itself, unjittered; overflowing growth caps the same way, except that
    /// a zero `min_ms` stays at zero and a zero sample stays at `min_ms`.
    pub fn for_attempt(&self, attempt: f64) -> f64 {
        let growth = self.factor.powf(attempt);
        // 0 * inf is NaN; the limit of 0 * factor^n is 0
        let mut dur = if growth.is_infinite() && self.min_ms == 0.0 {
            0.0
        } else {
            self.min_ms * growth
        };

        if self.jitter {
            let u = self.source.sample();
            dur = if u == 0.0 {
                self.min_ms
            } else {
                u * (dur - self.min_ms) + self.min_ms
            };
        }

        if dur > self.max_ms {
            return to_seconds(self.max_ms);
        }

        to_seconds(dur)
    }

    /// Restarts the sequence.
    ///
    /// The counter becomes `round(min_ms / 1000)` (ties to even), not 0. For
    /// `min_ms` up to 500 that is 0; larger minimums restart further along
    /// the curve. This mirrors long-standing observable behaviour and is
    /// most likely an accident; callers that need a true restart should
    /// build a fresh `Backoff`. Negative minimums restart at 0.
    pub fn reset(&mut self) {
        self.attempt = to_seconds(self.min_ms).round_ties_even().max(0.0);
        debug!(attempt = self.attempt, "backoff reset");
    }

    /// Current attempt number.
    pub fn attempt(&self) -> f64 {
        self.attempt
    }

    /// [`Backoff::duration`] as a sleepable `Duration`.
    ///
    /// The counter advances even when the delay is not representable.
    pub fn next_duration(&mut self) -> Option<Duration> {
        to_duration(self.duration())
    }

    pub fn duration_for_attempt(&self, attempt: f64) -> Option<Duration> {
        to_duration(self.for_attempt(attempt))
    }

    pub fn min_ms(&self) -> f64 {
        self.min_ms
    }

    pub fn max_ms(&self) -> f64 {
        self.max_ms
    }

    pub fn factor(&self) -> f64 {
        self.factor
    }

    pub fn jitter(&self) -> bool {
        self.jitter
    }
}

//! Sources of uniform randomness for jittered delays.
//!
//! [`Backoff`](crate::Backoff) asks its source for one sample in `[0, 1)` per
//! jittered delay. The default draws from the thread-local generator; tests
//! and reproducible tooling swap in [`FixedSource`] or [`SeededSource`].

use rand::rngs::StdRng;
use rand::{thread_rng, Rng, SeedableRng};
use std::sync::Mutex;

/// Uniform samples in `[0, 1)`.
///
/// Takes `&self` so that [`Backoff::for_attempt`](crate::Backoff::for_attempt)
/// stays callable through a shared reference.
pub trait JitterSource {
    fn sample(&self) -> f64;
}

/// Draws from `rand::thread_rng()`.
#[derive(Clone, Copy, Debug, Default)]
pub struct ThreadRandom;

impl JitterSource for ThreadRandom {
    fn sample(&self) -> f64 {
        thread_rng().gen::<f64>()
    }
}

/// Always yields the same value.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FixedSource(pub f64);

impl JitterSource for FixedSource {
    fn sample(&self) -> f64 {
        self.0
    }
}

/// Deterministic sequence from a seed.
#[derive(Debug)]
pub struct SeededSource {
    rng: Mutex<StdRng>,
}

impl SeededSource {
    pub fn new(seed: u64) -> Self {
        Self {
            rng: Mutex::new(StdRng::seed_from_u64(seed)),
        }
    }
}

impl JitterSource for SeededSource {
    fn sample(&self) -> f64 {
        let mut rng = self.rng.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        rng.gen::<f64>()
    }
}

impl<T: JitterSource + ?Sized> JitterSource for Box<T> {
    fn sample(&self) -> f64 {
        (**self).sample()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn thread_random_stays_in_unit_interval() {
        let src = ThreadRandom;
        for _ in 0..1000 {
            let v = src.sample();
            assert!((0.0..1.0).contains(&v), "sample {v} out of range");
        }
    }

    #[test]
    fn seeded_sources_agree() {
        let a = SeededSource::new(7);
        let b = SeededSource::new(7);
        let xs: Vec<f64> = (0..5).map(|_| a.sample()).collect();
        let ys: Vec<f64> = (0..5).map(|_| b.sample()).collect();
        assert_eq!(xs, ys);
        assert!(xs.iter().all(|v| (0.0..1.0).contains(v)));
    }

    #[test]
    fn boxed_source_delegates() {
        let src: Box<dyn JitterSource> = Box::new(FixedSource(0.25));
        assert_eq!(src.sample(), 0.25);
    }
}

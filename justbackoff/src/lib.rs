//! Simple exponential backoff.
//!
//! ```
//! use justbackoff::Backoff;
//!
//! let mut b = Backoff::new(100.0, 10_000.0, 2.0, false);
//! assert_eq!(b.duration(), 0.1);
//! assert_eq!(b.duration(), 0.2);
//! assert_eq!(b.for_attempt(5.0), 3.2);
//! b.reset();
//! assert_eq!(b.duration(), 0.1);
//! ```
//!
//! Delays are configured in milliseconds and returned in seconds. Waiting
//! and retrying are left to the caller; [`to_duration`] turns a delay into
//! something a timer accepts.

pub mod backoff;
#[cfg(feature = "cli")]
pub mod cli;
pub mod config;
pub mod jitter;
#[cfg(feature = "cli")]
pub mod output;
pub mod util;

pub use backoff::Backoff;
pub use config::{BackoffConfig, ConfigError, ConfigWarning};
pub use jitter::{FixedSource, JitterSource, SeededSource, ThreadRandom};
pub use util::{to_duration, to_ms, to_seconds};

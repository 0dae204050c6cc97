//! Randomized pauses between batch actions
//!
//! The dispatcher draws a delay from a [`DelayRange`] after each batch item
//! and hands it to a [`Sleeper`]. The production sleeper wakes once a second
//! to check a [`ShutdownFlag`], so a signal stops a long batch between items.

use async_trait::async_trait;
use rand::Rng;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::time::sleep;

use crate::config::PacingConfig;

/// Inclusive range of whole seconds to pause
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DelayRange {
    pub min_secs: u64,
    pub max_secs: u64,
}

impl DelayRange {
    pub const RETWEET: DelayRange = DelayRange::new(5, 20);
    pub const REPLY: DelayRange = DelayRange::new(15, 40);

    pub const fn new(min_secs: u64, max_secs: u64) -> Self {
        Self { min_secs, max_secs }
    }

    /// Draw a uniformly random delay from the range
    pub fn sample(&self) -> Duration {
        self.sample_with(&mut rand::thread_rng())
    }

    fn sample_with<R: Rng + ?Sized>(&self, rng: &mut R) -> Duration {
        if self.min_secs >= self.max_secs {
            return Duration::from_secs(self.min_secs);
        }
        Duration::from_secs(rng.gen_range(self.min_secs..=self.max_secs))
    }

    pub fn contains(&self, delay: Duration) -> bool {
        let min = Duration::from_secs(self.min_secs);
        let max = Duration::from_secs(self.max_secs);
        delay >= min && delay <= max
    }
}

/// Pacing for each batch action
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pacing {
    pub retweet: DelayRange,
    pub reply: DelayRange,
}

impl Default for Pacing {
    fn default() -> Self {
        Self {
            retweet: DelayRange::RETWEET,
            reply: DelayRange::REPLY,
        }
    }
}

impl From<&PacingConfig> for Pacing {
    fn from(config: &PacingConfig) -> Self {
        Self {
            retweet: DelayRange::new(config.retweet_min_secs, config.retweet_max_secs),
            reply: DelayRange::new(config.reply_min_secs, config.reply_max_secs),
        }
    }
}

/// Shared "stop after the current item" flag
#[derive(Debug, Clone, Default)]
pub struct ShutdownFlag(Arc<AtomicBool>);

impl ShutdownFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn trigger(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn is_triggered(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

/// Suspends the dispatcher between batch items
#[async_trait]
pub trait Sleeper: Send + Sync {
    /// Pause for `duration`. Returns `false` if the pause was cut short by a
    /// shutdown request and the batch should stop.
    async fn pause(&self, duration: Duration) -> bool;

    /// Whether a shutdown is already pending, checked before each item
    fn should_stop(&self) -> bool {
        false
    }
}

/// Real-time sleeper that checks a shutdown flag once per second
#[derive(Debug, Clone, Default)]
pub struct ShutdownSleeper {
    shutdown: ShutdownFlag,
}

impl ShutdownSleeper {
    pub fn new(shutdown: ShutdownFlag) -> Self {
        Self { shutdown }
    }
}

#[async_trait]
impl Sleeper for ShutdownSleeper {
    async fn pause(&self, duration: Duration) -> bool {
        let tick = Duration::from_secs(1);
        let mut remaining = duration;

        while !remaining.is_zero() {
            if self.shutdown.is_triggered() {
                return false;
            }
            let step = remaining.min(tick);
            sleep(step).await;
            remaining -= step;
        }

        !self.shutdown.is_triggered()
    }

    fn should_stop(&self) -> bool {
        self.shutdown.is_triggered()
    }
}

/// Sleeper that returns immediately and records each requested pause
#[derive(Debug, Clone, Default)]
pub struct RecordingSleeper {
    pauses: Arc<Mutex<Vec<Duration>>>,
    /// Report a shutdown after this many pauses
    stop_after: Option<usize>,
}

impl RecordingSleeper {
    pub fn new() -> Self {
        Self::default()
    }

    /// Simulate a shutdown arriving during pause number `n` (1-based)
    pub fn stopping_after(n: usize) -> Self {
        Self {
            pauses: Arc::new(Mutex::new(Vec::new())),
            stop_after: Some(n),
        }
    }

    pub fn pauses(&self) -> Vec<Duration> {
        self.pauses.lock().unwrap().clone()
    }
}

#[async_trait]
impl Sleeper for RecordingSleeper {
    async fn pause(&self, duration: Duration) -> bool {
        let mut pauses = self.pauses.lock().unwrap();
        pauses.push(duration);
        match self.stop_after {
            Some(n) => pauses.len() < n,
            None => true,
        }
    }
}

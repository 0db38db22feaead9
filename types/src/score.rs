//! Monotonic ordering key for "what's new since X" queries.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

/// Ordering key assigned to an output when it is stored.
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct Score(u64);

impl Score {
    pub const ZERO: Self = Self(0);

    pub fn new(value: u64) -> Self {
        Self(value)
    }

    pub fn value(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for Score {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Hands out strictly increasing scores seeded from wall-clock milliseconds.
///
/// Two outputs stored in the same millisecond still receive distinct scores,
/// and a clock stepping backwards never produces a score below one already
/// issued.
#[derive(Debug, Default)]
pub struct ScoreClock {
    last: AtomicU64,
}

impl ScoreClock {
    pub fn new() -> Self {
        Self::default()
    }

    /// Resume after `floor`, e.g. the highest score already persisted.
    pub fn starting_after(floor: Score) -> Self {
        Self {
            last: AtomicU64::new(floor.value()),
        }
    }

    pub fn next(&self) -> Score {
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis() as u64)
            .unwrap_or(0);
        let mut current = self.last.load(Ordering::Relaxed);
        loop {
            let candidate = now.max(current + 1);
            match self.last.compare_exchange_weak(
                current,
                candidate,
                Ordering::AcqRel,
                Ordering::Relaxed,
            ) {
                Ok(_) => return Score(candidate),
                Err(observed) => current = observed,
            }
        }
    }
}

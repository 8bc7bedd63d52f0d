//! Monotonic clock for frame timestamps.

use std::sync::Arc;
use std::time::Instant;

/// Monotonic clock shared by every frame of a track
///
/// Timestamps are microseconds since the clock was created, so frames from
/// one track are always ordered regardless of wall-clock adjustments.
#[derive(Debug, Clone)]
pub struct FrameClock {
    start: Arc<Instant>,
}

impl FrameClock {
    /// Create a clock whose time zero is now
    pub fn new() -> Self {
        Self {
            start: Arc::new(Instant::now()),
        }
    }

    /// Create a clock from an existing start instant
    ///
    /// Use this to share one timebase between tracks of the same stream.
    pub fn from_instant(start: Instant) -> Self {
        Self {
            start: Arc::new(start),
        }
    }

    /// Microseconds elapsed since time zero
    #[inline]
    pub fn timestamp_us(&self) -> u64 {
        self.start.elapsed().as_micros() as u64
    }

    /// Microseconds between time zero and `instant` (zero if earlier)
    #[inline]
    pub fn timestamp_us_at(&self, instant: Instant) -> u64 {
        instant.saturating_duration_since(*self.start).as_micros() as u64
    }

    pub fn start_instant(&self) -> Instant {
        *self.start
    }
}

impl Default for FrameClock {
    fn default() -> Self {
        Self::new()
    }
}

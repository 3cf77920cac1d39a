//! Clock and timing utilities for reconciling session time bases.
//!
//! A session is anchored to a monotonic epoch captured at `start_session`.
//! Camera frames, analyzer readings, and game events all arrive with their
//! own `Instant`s; this module converts them to seconds relative to that
//! epoch and provides the wall-clock stamps used for file naming.

use std::time::{Duration, Instant};

use chrono::{DateTime, Local};

/// Format used for output file names (`session_<stamp>.mkv`).
pub const FILE_STAMP_FORMAT: &str = "%Y%m%d_%H%M%S";

/// A recording clock that provides monotonic timestamps relative to
/// a fixed epoch (the moment the session started).
#[derive(Debug, Clone)]
pub struct RecordingClock {
    /// The instant the session started.
    epoch: Instant,

    /// Wall-clock time at epoch.
    epoch_wall: DateTime<Local>,
}

impl RecordingClock {
    /// Create a new recording clock anchored to now.
    pub fn start() -> Self {
        Self {
            epoch: Instant::now(),
            epoch_wall: Local::now(),
        }
    }

    /// Create a clock from a known epoch.
    pub fn from_epoch(epoch: Instant, wall: DateTime<Local>) -> Self {
        Self {
            epoch,
            epoch_wall: wall,
        }
    }

    /// Seconds between the epoch and `instant`. Instants earlier than the
    /// epoch saturate to zero.
    pub fn relative_secs(&self, instant: Instant) -> f64 {
        instant.saturating_duration_since(self.epoch).as_secs_f64()
    }

    /// The underlying epoch instant.
    pub fn epoch(&self) -> Instant {
        self.epoch
    }

    /// Wall-clock time at session start (RFC 3339).
    pub fn epoch_rfc3339(&self) -> String {
        self.epoch_wall.to_rfc3339()
    }

    /// Wall-clock time at session start as fractional unix seconds.
    pub fn epoch_unix_secs(&self) -> f64 {
        self.epoch_wall.timestamp_millis() as f64 / 1_000.0
    }

    /// Wall-clock unix seconds corresponding to `instant`.
    pub fn unix_secs_at(&self, instant: Instant) -> f64 {
        self.epoch_unix_secs() + self.relative_secs(instant)
    }

    /// Wall-clock time corresponding to `instant` (RFC 3339).
    pub fn rfc3339_at(&self, instant: Instant) -> String {
        let offset = instant.saturating_duration_since(self.epoch);
        chrono::Duration::from_std(offset)
            .map(|d| self.epoch_wall + d)
            .unwrap_or(self.epoch_wall)
            .to_rfc3339()
    }

    /// `YYYYMMDD_HHMMSS` stamp of the session start, in local time.
    pub fn file_stamp(&self) -> String {
        self.epoch_wall.format(FILE_STAMP_FORMAT).to_string()
    }

    /// Identifier derived from the start time (`session_<unix seconds>`).
    pub fn session_id(&self) -> String {
        format!("session_{}", self.epoch_wall.timestamp())
    }
}

/// `YYYYMMDD_HHMMSS` stamp for the current local time.
pub fn file_stamp_now() -> String {
    Local::now().format(FILE_STAMP_FORMAT).to_string()
}

/// Convert a nominal rate in Hz to a tick interval.
pub fn interval_for_hz(hz: u32) -> Duration {
    Duration::from_nanos(1_000_000_000 / u64::from(hz.max(1)))
}

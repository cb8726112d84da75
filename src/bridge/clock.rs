//! Wall clock and monotonic clock for the guest

use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};

/// How host time advances
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ClockKind {
    /// Real time
    #[default]
    Realtime,
    /// Time only moves when the host advances it, one frame at a time
    Virtual,
}

#[derive(Debug, Clone)]
enum Source {
    Realtime { start: Instant },
    Virtual { elapsed: Duration },
}

#[derive(Debug, Clone)]
pub struct Clock {
    source: Source,
    /// Wall-clock time when the clock was created
    epoch: SystemTime,
}

impl Clock {
    pub fn new(kind: ClockKind) -> Self {
        match kind {
            ClockKind::Realtime => Self::realtime(),
            ClockKind::Virtual => Self::virtual_time(),
        }
    }

    pub fn realtime() -> Self {
        Self {
            source: Source::Realtime {
                start: Instant::now(),
            },
            epoch: SystemTime::now(),
        }
    }

    pub fn virtual_time() -> Self {
        Self {
            source: Source::Virtual {
                elapsed: Duration::ZERO,
            },
            epoch: SystemTime::now(),
        }
    }

    pub fn kind(&self) -> ClockKind {
        match self.source {
            Source::Realtime { .. } => ClockKind::Realtime,
            Source::Virtual { .. } => ClockKind::Virtual,
        }
    }

    /// Time since the host started
    pub fn elapsed(&self) -> Duration {
        match &self.source {
            Source::Realtime { start } => start.elapsed(),
            Source::Virtual { elapsed } => *elapsed,
        }
    }

    /// Move a virtual clock forward. No effect on a realtime clock.
    pub fn advance(&mut self, step: Duration) {
        if let Source::Virtual { elapsed } = &mut self.source {
            *elapsed = elapsed.saturating_add(step);
        }
    }

    /// Milliseconds since the Unix epoch
    pub fn date_now_ms(&self) -> i64 {
        let now = match &self.source {
            Source::Realtime { .. } => SystemTime::now(),
            Source::Virtual { elapsed } => self.epoch + *elapsed,
        };
        now.duration_since(UNIX_EPOCH)
            .map(|since| i64::try_from(since.as_millis()).unwrap_or(i64::MAX))
            .unwrap_or(0)
    }

    /// Fractional milliseconds since the host started
    pub fn performance_now_ms(&self) -> f64 {
        self.elapsed().as_secs_f64() * 1000.0
    }
}

impl Default for Clock {
    fn default() -> Self {
        Self::realtime()
    }
}

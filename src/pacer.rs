// Copyright (c) 2026 rezky_nightky

use std::thread;
use std::time::{Duration, Instant};

/// How far behind the deadline may fall before it is pulled back to now.
const MAX_LAG: Duration = Duration::from_secs(1);

/// Deadline-based frame limiter.
///
/// The deadline advances by one period per call instead of being recomputed
/// from the current time, so per-frame jitter does not accumulate.
#[derive(Debug)]
pub struct FramePacer {
    next: Option<Instant>,
}

impl FramePacer {
    pub fn new() -> Self {
        Self { next: None }
    }

    pub fn period(target_fps: f64) -> Duration {
        Duration::from_secs_f64(1.0 / target_fps)
    }

    /// Blocks until the next frame deadline. Returns `false` when the
    /// deadline had already passed and no sleep happened.
    pub fn limit(&mut self, target_fps: f64) -> bool {
        let period = Self::period(target_fps);
        let now = Instant::now();
        let mut next = self.next.unwrap_or(now) + period;

        if now > next + MAX_LAG {
            tracing::debug!(
                behind_ms = (now - next).as_millis() as u64,
                "frame deadline resynchronised"
            );
            next = now;
        }
        self.next = Some(next);

        if next <= now {
            return false;
        }
        thread::sleep(next - now);
        true
    }
}

impl Default for FramePacer {
    fn default() -> Self {
        Self::new()
    }
}

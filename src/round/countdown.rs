use tokio::time::Duration;

/// Result of feeding elapsed time into a countdown
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CountdownTick {
    /// Paused, canceled or already expired
    Idle,
    Running(Duration),
    /// Reached zero on this tick; reported once
    Expired,
}

/// Logical per-round countdown driven by the session's tick events
///
/// Holding the countdown as data rather than as a spawned timer means a tick
/// can never land on a round other than the one it was counted for.
#[derive(Debug, Clone)]
pub struct Countdown {
    duration: Duration,
    remaining: Duration,
    running: bool,
    expired: bool,
}

impl Countdown {
    pub fn new(duration: Duration) -> Self {
        Self {
            duration,
            remaining: duration,
            running: false,
            expired: false,
        }
    }

    /// Full duration again, paused
    pub fn reset(&mut self) {
        self.remaining = self.duration;
        self.running = false;
        self.expired = false;
    }

    pub fn resume(&mut self) {
        if !self.expired && !self.remaining.is_zero() {
            self.running = true;
        }
    }

    pub fn pause(&mut self) {
        self.running = false;
    }

    pub fn tick(&mut self, elapsed: Duration) -> CountdownTick {
        if !self.running {
            return CountdownTick::Idle;
        }

        self.remaining = self.remaining.saturating_sub(elapsed);
        if self.remaining.is_zero() {
            self.running = false;
            self.expired = true;
            return CountdownTick::Expired;
        }
        CountdownTick::Running(self.remaining)
    }

    pub fn remaining(&self) -> Duration {
        self.remaining
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    pub fn is_expired(&self) -> bool {
        self.expired
    }
}

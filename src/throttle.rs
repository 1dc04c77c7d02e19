//! Minimum interval between two transmitted commands.
//!
//! The oscilloscopes drop or garble commands that arrive too quickly after the
//! previous one. `WriteThrottle` is a cooperative gate, not a lock: the session
//! calls [`WriteThrottle::wait`] before each write and [`WriteThrottle::mark`]
//! after it. Time is measured on the monotonic tokio clock, so tests can run
//! with paused time.

use std::time::Duration;
use tokio::time::Instant;

/// Default minimum time between two commands.
pub const DEFAULT_WRITE_INTERVAL: Duration = Duration::from_millis(10);

/// Rate limiter state owned by one instrument session.
#[derive(Debug, Clone)]
pub struct WriteThrottle {
    interval: Duration,
    last_write: Option<Instant>,
}

impl Default for WriteThrottle {
    fn default() -> Self {
        Self::new(DEFAULT_WRITE_INTERVAL)
    }
}

impl WriteThrottle {
    /// Create a throttle enforcing `interval` between transmissions.
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            last_write: None,
        }
    }

    /// Configured minimum interval.
    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Change the minimum interval; takes effect for the next command.
    pub fn set_interval(&mut self, interval: Duration) {
        self.interval = interval;
    }

    /// Time still to wait at `now` before the next transmission. Never negative.
    pub fn remaining(&self, now: Instant) -> Duration {
        match self.last_write {
            Some(last) => self
                .interval
                .saturating_sub(now.saturating_duration_since(last)),
            None => Duration::ZERO,
        }
    }

    /// Sleep until the interval since the previous transmission has elapsed.
    pub async fn wait(&self) {
        let remaining = self.remaining(Instant::now());
        if !remaining.is_zero() {
            tracing::trace!(?remaining, "throttling next command");
            tokio::time::sleep(remaining).await;
        }
    }

    /// Record that a command was just transmitted.
    pub fn mark(&mut self) {
        self.last_write = Some(Instant::now());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_first_command_is_not_delayed() {
        let throttle = WriteThrottle::default();
        assert_eq!(throttle.remaining(Instant::now()), Duration::ZERO);

        let start = Instant::now();
        throttle.wait().await;
        assert_eq!(start.elapsed(), Duration::ZERO);
    }

    #[tokio::test(start_paused = true)]
    async fn test_wait_covers_deficit() {
        let mut throttle = WriteThrottle::new(Duration::from_millis(50));
        throttle.mark();
        tokio::time::advance(Duration::from_millis(20)).await;

        assert_eq!(throttle.remaining(Instant::now()), Duration::from_millis(30));

        let start = Instant::now();
        throttle.wait().await;
        assert!(start.elapsed() >= Duration::from_millis(30));
        assert_eq!(throttle.remaining(Instant::now()), Duration::ZERO);
    }

    #[tokio::test(start_paused = true)]
    async fn test_remaining_saturates_after_interval() {
        let mut throttle = WriteThrottle::new(Duration::from_millis(10));
        throttle.mark();
        tokio::time::advance(Duration::from_secs(1)).await;
        assert_eq!(throttle.remaining(Instant::now()), Duration::ZERO);
    }

    #[test]
    fn test_set_interval() {
        let mut throttle = WriteThrottle::default();
        assert_eq!(throttle.interval(), DEFAULT_WRITE_INTERVAL);
        throttle.set_interval(Duration::from_millis(250));
        assert_eq!(throttle.interval(), Duration::from_millis(250));
    }
}

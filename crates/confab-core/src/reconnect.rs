//! Reconnect backoff controller.
//!
//! Decides whether and when to rerun the join pipeline after a
//! reconnectable failure. Waits escalate from a fixed wait to a short
//! backoff and then to a long backoff for every later attempt, all bounded
//! by a total reconnect timeout measured from the first failure of the
//! episode. A successful reconnect starts a new episode.

use rand::Rng;
use std::time::Duration;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::debug;

/// Reconnect configuration
#[derive(Debug, Clone)]
pub struct ReconnectConfig {
    /// Wait before the first retry of an episode
    pub fixed_wait: Duration,

    /// Wait before the second retry
    pub short_backoff: Duration,

    /// Wait before every later retry
    pub long_backoff: Duration,

    /// Episode length after which retries stop
    pub reconnect_timeout: Duration,

    /// Add up to 25% random jitter to each wait
    pub jitter: bool,
}

impl Default for ReconnectConfig {
    fn default() -> Self {
        Self {
            fixed_wait: Duration::from_millis(100),
            short_backoff: Duration::from_secs(1),
            long_backoff: Duration::from_secs(5),
            reconnect_timeout: Duration::from_secs(120),
            jitter: true,
        }
    }
}

impl ReconnectConfig {
    /// Wait before retry number `attempt` (zero-based) of an episode
    #[must_use]
    pub fn backoff_duration(&self, attempt: u32) -> Duration {
        let base = match attempt {
            0 => self.fixed_wait,
            1 => self.short_backoff,
            _ => self.long_backoff,
        };

        if self.jitter {
            let jitter_percent: u32 = rand::thread_rng().gen_range(0..25);
            base + base * jitter_percent / 100
        } else {
            base
        }
    }
}

/// Controller state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReconnectState {
    /// No failure seen in the current episode
    Idle,
    /// At least one retry scheduled
    Retrying,
    /// A retry connected
    Succeeded,
    /// Timeout exceeded or canceled; no further retries
    GivenUp,
}

/// Result of reporting a failure
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReconnectDecision {
    /// Retry after the given wait
    Retry(Duration),
    /// Stop for good
    GiveUp,
}

/// Backoff state machine
#[derive(Debug, Clone)]
pub struct ReconnectController {
    config: ReconnectConfig,
    state: ReconnectState,
    attempts: u32,
    episode_start: Option<Instant>,
    canceled: bool,
}

impl ReconnectController {
    /// Create a controller
    #[must_use]
    pub fn new(config: ReconnectConfig) -> Self {
        Self {
            config,
            state: ReconnectState::Idle,
            attempts: 0,
            episode_start: None,
            canceled: false,
        }
    }

    /// Current state
    #[must_use]
    pub fn state(&self) -> ReconnectState {
        self.state
    }

    /// Retries scheduled in the current episode
    #[must_use]
    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    /// Whether [`Self::cancel`] was called
    #[must_use]
    pub fn is_canceled(&self) -> bool {
        self.canceled
    }

    /// Report a reconnectable failure observed at `now`
    pub fn on_failure(&mut self, now: Instant) -> ReconnectDecision {
        if self.canceled || self.state == ReconnectState::GivenUp {
            self.state = ReconnectState::GivenUp;
            return ReconnectDecision::GiveUp;
        }

        let start = *self.episode_start.get_or_insert(now);
        let elapsed = now.saturating_duration_since(start);
        if elapsed > self.config.reconnect_timeout {
            debug!(
                "Giving up after {} attempts ({:?} elapsed)",
                self.attempts, elapsed
            );
            self.state = ReconnectState::GivenUp;
            return ReconnectDecision::GiveUp;
        }

        let wait = self.config.backoff_duration(self.attempts);
        self.attempts += 1;
        self.state = ReconnectState::Retrying;
        ReconnectDecision::Retry(wait)
    }

    /// Report a successful connection; the next failure starts a new episode
    pub fn on_success(&mut self) {
        if self.state == ReconnectState::Retrying {
            self.state = ReconnectState::Succeeded;
        }
        self.attempts = 0;
        self.episode_start = None;
    }

    /// Stop retrying for good
    pub fn cancel(&mut self) {
        self.canceled = true;
        self.state = ReconnectState::GivenUp;
    }

    /// Sleep for `delay` unless `token` is canceled first.
    ///
    /// Returns `true` if the full wait elapsed.
    pub async fn wait(delay: Duration, token: &CancellationToken) -> bool {
        tokio::select! {
            () = token.cancelled() => false,
            () = tokio::time::sleep(delay) => true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> ReconnectConfig {
        ReconnectConfig {
            fixed_wait: Duration::from_millis(10),
            short_backoff: Duration::from_millis(100),
            long_backoff: Duration::from_millis(1000),
            reconnect_timeout: Duration::from_secs(30),
            jitter: false,
        }
    }

    #[test]
    fn test_backoff_escalation_then_give_up() {
        let mut controller = ReconnectController::new(config());
        let start = Instant::now();

        // A successful connection precedes the failures.
        controller.on_success();
        assert_eq!(controller.state(), ReconnectState::Idle);

        assert_eq!(
            controller.on_failure(start),
            ReconnectDecision::Retry(Duration::from_millis(10))
        );
        assert_eq!(
            controller.on_failure(start + Duration::from_secs(1)),
            ReconnectDecision::Retry(Duration::from_millis(100))
        );
        assert_eq!(
            controller.on_failure(start + Duration::from_secs(2)),
            ReconnectDecision::Retry(Duration::from_millis(1000))
        );
        assert_eq!(controller.state(), ReconnectState::Retrying);

        assert_eq!(
            controller.on_failure(start + Duration::from_secs(31)),
            ReconnectDecision::GiveUp
        );
        assert_eq!(controller.state(), ReconnectState::GivenUp);
        assert_eq!(
            controller.on_failure(start + Duration::from_secs(32)),
            ReconnectDecision::GiveUp
        );
    }

    #[test]
    fn test_long_backoff_repeats() {
        let mut controller = ReconnectController::new(config());
        let start = Instant::now();
        for _ in 0..2 {
            controller.on_failure(start);
        }
        for _ in 0..5 {
            assert_eq!(
                controller.on_failure(start),
                ReconnectDecision::Retry(Duration::from_millis(1000))
            );
        }
    }

    #[test]
    fn test_success_resets_backoff() {
        let mut controller = ReconnectController::new(config());
        let start = Instant::now();
        controller.on_failure(start);
        controller.on_failure(start);
        controller.on_success();
        assert_eq!(controller.state(), ReconnectState::Succeeded);
        assert_eq!(controller.attempts(), 0);

        // New episode: fixed wait again, and the timeout restarts.
        let later = start + Duration::from_secs(100);
        assert_eq!(
            controller.on_failure(later),
            ReconnectDecision::Retry(Duration::from_millis(10))
        );
    }

    #[test]
    fn test_cancel_gives_up() {
        let mut controller = ReconnectController::new(config());
        controller.cancel();
        assert!(controller.is_canceled());
        assert_eq!(
            controller.on_failure(Instant::now()),
            ReconnectDecision::GiveUp
        );
    }

    #[test]
    fn test_jitter_bounds() {
        let config = ReconnectConfig {
            jitter: true,
            ..config()
        };
        for _ in 0..100 {
            let wait = config.backoff_duration(2);
            assert!(wait >= Duration::from_millis(1000));
            assert!(wait < Duration::from_millis(1250));
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_wait_completes() {
        let token = CancellationToken::new();
        assert!(ReconnectController::wait(Duration::from_secs(5), &token).await);
    }

    #[tokio::test(start_paused = true)]
    async fn test_wait_cancelled_early() {
        let token = CancellationToken::new();
        let canceler = token.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(10)).await;
            canceler.cancel();
        });
        let started = Instant::now();
        assert!(!ReconnectController::wait(Duration::from_secs(60), &token).await);
        assert!(started.elapsed() < Duration::from_secs(1));
    }
}

//! Signaling connection health
//!
//! Tracks keep-alive pings, round trip times, inbound activity and packet
//! loss for the current connection, and scores them into a status and a
//! reconnect decision.

use std::collections::VecDeque;
use std::time::Duration;
use tokio::time::Instant;

/// Health status
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HealthStatus {
    /// Pongs arrive and inbound traffic flows
    Healthy,

    /// Some pongs missed or elevated packet loss
    Degraded,

    /// Reconnect threshold reached
    Critical,
}

/// What the controller should do about the connection
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HealthAction {
    /// Keep going
    None,
    /// Tear the connection down and reconnect
    Reconnect,
}

/// Health monitoring configuration
#[derive(Debug, Clone)]
pub struct HealthConfig {
    /// Consecutive missed pongs that mark the link degraded
    pub degraded_missed_pongs: u32,

    /// Consecutive missed pongs that trigger a reconnect
    pub max_missed_pongs: u32,

    /// Time without any inbound signal that triggers a reconnect
    pub no_signal_timeout: Duration,

    /// Average packet loss (percent) that marks the link degraded
    pub degraded_packet_loss_percent: f64,

    /// Number of packet-loss samples averaged
    pub packet_loss_window: usize,
}

impl Default for HealthConfig {
    fn default() -> Self {
        Self {
            degraded_missed_pongs: 2,
            max_missed_pongs: 4,
            no_signal_timeout: Duration::from_secs(60),
            degraded_packet_loss_percent: 5.0,
            packet_loss_window: 10,
        }
    }
}

/// Rolling health counters for one connection
#[derive(Debug, Clone)]
pub struct ConnectionHealthData {
    consecutive_missed_pongs: u32,
    outstanding_ping: Option<(u32, Instant)>,
    next_ping_id: u32,
    last_rtt: Option<Duration>,
    last_good_signal: Instant,
    packet_loss: VecDeque<f64>,
}

impl ConnectionHealthData {
    /// Fresh counters
    #[must_use]
    pub fn new(now: Instant) -> Self {
        Self {
            consecutive_missed_pongs: 0,
            outstanding_ping: None,
            next_ping_id: 1,
            last_rtt: None,
            last_good_signal: now,
            packet_loss: VecDeque::new(),
        }
    }

    /// Reset for a new connection
    pub fn reset(&mut self, now: Instant) {
        *self = Self::new(now);
    }

    /// Allocate an id for a ping about to be sent.
    ///
    /// A previous ping that never got its pong counts as missed.
    pub fn record_ping_sent(&mut self, now: Instant) -> u32 {
        if self.outstanding_ping.is_some() {
            self.consecutive_missed_pongs += 1;
        }
        let id = self.next_ping_id;
        self.next_ping_id = self.next_ping_id.wrapping_add(1).max(1);
        self.outstanding_ping = Some((id, now));
        id
    }

    /// Record a pong; returns the round trip time if it answers the
    /// outstanding ping
    pub fn record_pong(&mut self, ping_id: u32, now: Instant) -> Option<Duration> {
        let (id, sent) = self.outstanding_ping?;
        if id != ping_id {
            return None;
        }
        let rtt = now.saturating_duration_since(sent);
        self.outstanding_ping = None;
        self.consecutive_missed_pongs = 0;
        self.last_rtt = Some(rtt);
        self.last_good_signal = now;
        Some(rtt)
    }

    /// Any inbound frame proves the link is alive
    pub fn record_good_signal(&mut self, now: Instant) {
        self.last_good_signal = now;
    }

    /// Add a packet-loss sample, keeping at most `window` samples
    pub fn record_packet_loss(&mut self, percent: f64, window: usize) {
        self.packet_loss.push_back(percent);
        while self.packet_loss.len() > window.max(1) {
            self.packet_loss.pop_front();
        }
    }

    /// Consecutive missed pongs
    #[must_use]
    pub fn consecutive_missed_pongs(&self) -> u32 {
        self.consecutive_missed_pongs
    }

    /// Last measured round trip
    #[must_use]
    pub fn last_rtt(&self) -> Option<Duration> {
        self.last_rtt
    }

    /// Time since the last inbound signal
    #[must_use]
    pub fn time_since_good_signal(&self, now: Instant) -> Duration {
        now.saturating_duration_since(self.last_good_signal)
    }

    /// Mean of the packet-loss window
    #[must_use]
    pub fn average_packet_loss(&self) -> f64 {
        if self.packet_loss.is_empty() {
            return 0.0;
        }
        self.packet_loss.iter().sum::<f64>() / self.packet_loss.len() as f64
    }
}

/// Scores [`ConnectionHealthData`]
#[derive(Debug, Clone, Default)]
pub struct ConnectionHealthPolicy {
    config: HealthConfig,
}

impl ConnectionHealthPolicy {
    /// Create a policy
    #[must_use]
    pub fn new(config: HealthConfig) -> Self {
        Self { config }
    }

    /// Configuration
    #[must_use]
    pub fn config(&self) -> &HealthConfig {
        &self.config
    }

    /// Current status
    #[must_use]
    pub fn status(&self, data: &ConnectionHealthData, now: Instant) -> HealthStatus {
        if self.evaluate(data, now) == HealthAction::Reconnect {
            HealthStatus::Critical
        } else if data.consecutive_missed_pongs >= self.config.degraded_missed_pongs
            || data.average_packet_loss() >= self.config.degraded_packet_loss_percent
        {
            HealthStatus::Degraded
        } else {
            HealthStatus::Healthy
        }
    }

    /// Whether the connection should be replaced
    #[must_use]
    pub fn evaluate(&self, data: &ConnectionHealthData, now: Instant) -> HealthAction {
        if data.consecutive_missed_pongs >= self.config.max_missed_pongs
            || data.time_since_good_signal(now) >= self.config.no_signal_timeout
        {
            HealthAction::Reconnect
        } else {
            HealthAction::None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missed_pongs_escalate() {
        let policy = ConnectionHealthPolicy::default();
        let now = Instant::now();
        let mut data = ConnectionHealthData::new(now);

        data.record_ping_sent(now);
        assert_eq!(policy.status(&data, now), HealthStatus::Healthy);

        data.record_ping_sent(now);
        data.record_ping_sent(now);
        assert_eq!(data.consecutive_missed_pongs(), 2);
        assert_eq!(policy.status(&data, now), HealthStatus::Degraded);

        data.record_ping_sent(now);
        data.record_ping_sent(now);
        assert_eq!(policy.evaluate(&data, now), HealthAction::Reconnect);
        assert_eq!(policy.status(&data, now), HealthStatus::Critical);
    }

    #[test]
    fn test_pong_resets_and_measures_rtt() {
        let start = Instant::now();
        let mut data = ConnectionHealthData::new(start);
        let first = data.record_ping_sent(start);
        let second = data.record_ping_sent(start);
        assert_eq!(data.consecutive_missed_pongs(), 1);

        // A late pong for a superseded ping is ignored.
        assert!(data.record_pong(first, start).is_none());

        let later = start + Duration::from_millis(40);
        assert_eq!(data.record_pong(second, later), Some(Duration::from_millis(40)));
        assert_eq!(data.consecutive_missed_pongs(), 0);
        assert_eq!(data.last_rtt(), Some(Duration::from_millis(40)));
        assert!(data.record_pong(second, later).is_none());
    }

    #[test]
    fn test_silence_triggers_reconnect() {
        let policy = ConnectionHealthPolicy::new(HealthConfig {
            no_signal_timeout: Duration::from_secs(10),
            ..HealthConfig::default()
        });
        let start = Instant::now();
        let mut data = ConnectionHealthData::new(start);

        assert_eq!(
            policy.evaluate(&data, start + Duration::from_secs(9)),
            HealthAction::None
        );
        assert_eq!(
            policy.evaluate(&data, start + Duration::from_secs(10)),
            HealthAction::Reconnect
        );

        data.record_good_signal(start + Duration::from_secs(9));
        assert_eq!(
            policy.evaluate(&data, start + Duration::from_secs(10)),
            HealthAction::None
        );
    }

    #[test]
    fn test_packet_loss_window() {
        let policy = ConnectionHealthPolicy::default();
        let now = Instant::now();
        let mut data = ConnectionHealthData::new(now);
        for _ in 0..10 {
            data.record_packet_loss(10.0, 3);
        }
        data.record_packet_loss(1.0, 3);
        assert_eq!(data.average_packet_loss(), 7.0);
        assert_eq!(policy.status(&data, now), HealthStatus::Degraded);
    }
}

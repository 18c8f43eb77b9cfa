//! Session configuration

use crate::health::HealthConfig;
use crate::policy::{
    AllHighestDownlinkPolicy, DownlinkPolicy, DownlinkPolicyKind, NoVideoDownlinkPolicy,
    PriorityPolicyConfig, SimulcastUplinkPolicy, SingleLayerUplinkPolicy, UplinkPolicy,
    UplinkPolicyKind, VideoPriorityBasedPolicy,
};
use crate::reconnect::ReconnectConfig;
use crate::signaling::JoinSettings;
use confab_transport::TransportConfig;
use std::time::Duration;

/// Session configuration
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Signaling socket configuration
    pub transport: TransportConfig,

    /// Reconnect backoff
    pub reconnect: ReconnectConfig,

    /// Keep-alive thresholds
    pub health: HealthConfig,

    /// Receive-side policy
    pub downlink_policy: DownlinkPolicyKind,

    /// Settings of the priority-based downlink policy
    pub priority_policy: PriorityPolicyConfig,

    /// Send-side policy
    pub uplink_policy: UplinkPolicyKind,

    /// Ceiling for local video (kbps)
    pub max_uplink_bandwidth_kbps: u32,

    /// Simulcast layers (1-3)
    pub simulcast_layers: usize,

    /// Most remote videos announced in Join
    pub max_remote_videos: u32,

    /// Offer SDP compression in Join
    pub sdp_compression: bool,

    /// Wait for JoinAck/Index and for SubscribeAck
    pub ack_timeout: Duration,

    /// Wait for ICE gathering to finish
    pub ice_gathering_timeout: Duration,

    /// Wait for ICE to connect
    pub ice_connected_timeout: Duration,

    /// Keep-alive ping period
    pub ping_interval: Duration,

    /// Wait for LeaveAck when stopping
    pub leave_ack_timeout: Duration,

    /// Application name reported in Join
    pub app_name: String,

    /// Application version reported in Join
    pub app_version: String,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            transport: TransportConfig::default(),
            reconnect: ReconnectConfig::default(),
            health: HealthConfig::default(),
            downlink_policy: DownlinkPolicyKind::default(),
            priority_policy: PriorityPolicyConfig::default(),
            uplink_policy: UplinkPolicyKind::default(),
            max_uplink_bandwidth_kbps: 1400,
            simulcast_layers: 3,
            max_remote_videos: 25,
            sdp_compression: true,
            ack_timeout: Duration::from_secs(15),
            ice_gathering_timeout: Duration::from_secs(5),
            ice_connected_timeout: Duration::from_secs(15),
            ping_interval: Duration::from_secs(10),
            leave_ack_timeout: Duration::from_secs(2),
            app_name: String::new(),
            app_version: String::new(),
        }
    }
}

impl SessionConfig {
    /// Pings that may go unanswered before the socket counts as idle
    pub const IDLE_PINGS: u32 = 3;

    /// Socket configuration, with the idle timeout raised so that keep-alive
    /// traffic always arrives before it fires
    #[must_use]
    pub fn transport_config(&self) -> TransportConfig {
        let mut transport = self.transport.clone();
        let floor = self.ping_interval.saturating_mul(Self::IDLE_PINGS);
        if transport.idle_timeout < floor {
            transport.idle_timeout = floor;
        }
        transport
    }

    /// Instantiate the configured downlink policy
    #[must_use]
    pub fn downlink_policy(&self) -> Box<dyn DownlinkPolicy> {
        match self.downlink_policy {
            DownlinkPolicyKind::AllHighest => Box::new(AllHighestDownlinkPolicy::new(
                self.priority_policy.max_subscriptions,
            )),
            DownlinkPolicyKind::PriorityBased => {
                Box::new(VideoPriorityBasedPolicy::new(self.priority_policy.clone()))
            }
            DownlinkPolicyKind::NoVideo => Box::new(NoVideoDownlinkPolicy),
        }
    }

    /// Instantiate the configured uplink policy
    #[must_use]
    pub fn uplink_policy(&self) -> Box<dyn UplinkPolicy> {
        match self.uplink_policy {
            UplinkPolicyKind::Simulcast => Box::new(SimulcastUplinkPolicy::new(
                self.max_uplink_bandwidth_kbps,
                self.simulcast_layers,
            )),
            UplinkPolicyKind::SingleLayer => {
                Box::new(SingleLayerUplinkPolicy::new(self.max_uplink_bandwidth_kbps))
            }
        }
    }

    /// Join parameters
    #[must_use]
    pub fn join_settings(&self) -> JoinSettings {
        let mut settings = JoinSettings {
            max_num_of_videos: self.max_remote_videos,
            sdp_compression: self.sdp_compression,
            ..JoinSettings::default()
        };
        settings.client_details.app_name.clone_from(&self.app_name);
        settings.client_details.app_version.clone_from(&self.app_version);
        settings
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_policy_factories() {
        let mut config = SessionConfig::default();
        assert_eq!(config.downlink_policy().name(), "priority-based");
        assert_eq!(config.uplink_policy().name(), "simulcast");

        config.downlink_policy = DownlinkPolicyKind::NoVideo;
        config.uplink_policy = UplinkPolicyKind::SingleLayer;
        assert_eq!(config.downlink_policy().name(), "no-video");
        assert_eq!(config.uplink_policy().name(), "single-layer");
    }

    #[test]
    fn test_idle_timeout_covers_ping_interval() {
        let config = SessionConfig::default();
        assert_eq!(
            config.transport_config().idle_timeout,
            TransportConfig::default().idle_timeout
        );

        let slow = SessionConfig {
            ping_interval: Duration::from_secs(45),
            ..SessionConfig::default()
        };
        assert_eq!(slow.transport_config().idle_timeout, Duration::from_secs(135));
        assert_eq!(
            slow.transport_config().connect_timeout,
            slow.transport.connect_timeout
        );
    }

    #[test]
    fn test_join_settings() {
        let config = SessionConfig {
            max_remote_videos: 9,
            sdp_compression: false,
            app_name: "fitclass".into(),
            ..SessionConfig::default()
        };
        let settings = config.join_settings();
        assert_eq!(settings.max_num_of_videos, 9);
        assert!(!settings.sdp_compression);
        assert_eq!(settings.client_details.app_name, "fitclass");
    }
}

//! Bandwidth policies.
//!
//! Downlink policies decide which remote streams to receive; uplink
//! policies decide how the local video is encoded. Both are pure decision
//! functions over the stream index and the latest client metrics. The
//! session controller owns one instance of each and acts on their output.

mod downlink;
mod uplink;

pub use downlink::{
    AllHighestDownlinkPolicy, DownlinkPolicy, NoVideoDownlinkPolicy, PriorityPolicyConfig,
    VideoPriorityBasedPolicy,
};
pub use uplink::{
    EncodingParams, SimulcastUplinkPolicy, SingleLayerUplinkPolicy, UplinkPolicy, UplinkUpdate,
};

use crate::messages::{ClientMetricFrame, Metric, MetricKind};
use serde::{Deserialize, Serialize};

/// Latest connection metrics reported by the media stack
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ClientMetrics {
    /// Downlink estimate (kbps)
    pub available_incoming_kbps: Option<u32>,
    /// Uplink estimate (kbps)
    pub available_outgoing_kbps: Option<u32>,
    /// Receive packet loss (percent)
    pub packet_loss_percent: f64,
    /// Round trip time (ms)
    pub rtt_ms: Option<u32>,
}

impl ClientMetrics {
    /// Report for the server
    #[must_use]
    pub fn to_frame(&self) -> ClientMetricFrame {
        let mut metrics = Vec::with_capacity(4);
        if let Some(kbps) = self.available_incoming_kbps {
            metrics.push(metric(MetricKind::AvailableIncomingBitrate, f64::from(kbps)));
        }
        if let Some(kbps) = self.available_outgoing_kbps {
            metrics.push(metric(MetricKind::AvailableOutgoingBitrate, f64::from(kbps)));
        }
        metrics.push(metric(MetricKind::PacketLossPercent, self.packet_loss_percent));
        if let Some(rtt) = self.rtt_ms {
            metrics.push(metric(MetricKind::RoundTripTime, f64::from(rtt)));
        }
        ClientMetricFrame { metrics }
    }
}

fn metric(kind: MetricKind, value: f64) -> Metric {
    Metric {
        kind: kind as i32,
        value,
    }
}

/// Downlink policy selection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DownlinkPolicyKind {
    /// [`AllHighestDownlinkPolicy`]
    AllHighest,
    /// [`VideoPriorityBasedPolicy`]
    #[default]
    PriorityBased,
    /// [`NoVideoDownlinkPolicy`]
    NoVideo,
}

/// Uplink policy selection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum UplinkPolicyKind {
    /// [`SimulcastUplinkPolicy`]
    #[default]
    Simulcast,
    /// [`SingleLayerUplinkPolicy`]
    SingleLayer,
}

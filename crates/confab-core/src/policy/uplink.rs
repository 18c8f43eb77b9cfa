//! Send-side encoding policies.

use super::ClientMetrics;
use crate::stream_index::VideoStreamIndex;

/// Parameters of one send encoding
#[derive(Debug, Clone, PartialEq)]
pub struct EncodingParams {
    /// Restriction identifier
    pub rid: String,
    /// Bitrate ceiling (kbps)
    pub max_bitrate_kbps: u32,
    /// Resolution divisor
    pub scale_resolution_down_by: f64,
    /// Whether the layer is sent
    pub active: bool,
}

/// Encodings that changed since the last update was taken
#[derive(Debug, Clone, PartialEq)]
pub struct UplinkUpdate {
    /// New encodings
    pub encodings: Vec<EncodingParams>,
    /// The number of encodings changed, so parameters alone cannot express it
    pub needs_renegotiation: bool,
}

/// Decides how local video is encoded
pub trait UplinkPolicy: Send {
    /// Policy name for logs
    fn name(&self) -> &'static str;

    /// Feed the latest index
    fn update_index(&mut self, index: &VideoStreamIndex);

    /// Feed the latest metrics
    fn update_metrics(&mut self, metrics: &ClientMetrics);

    /// Change the configured ceiling
    fn set_max_bandwidth_kbps(&mut self, kbps: u32);

    /// Encodings for the current inputs
    fn encoding_parameters(&self) -> Vec<EncodingParams>;

    /// Encodings that differ from the last ones taken, if any
    fn take_update(&mut self) -> Option<UplinkUpdate>;
}

#[derive(Debug, Clone, Default)]
struct AppliedEncodings {
    last: Option<Vec<EncodingParams>>,
}

impl AppliedEncodings {
    fn take_update(&mut self, current: Vec<EncodingParams>) -> Option<UplinkUpdate> {
        let needs_renegotiation = match &self.last {
            Some(last) if *last == current => return None,
            Some(last) => last.len() != current.len(),
            None => false,
        };
        self.last = Some(current.clone());
        Some(UplinkUpdate {
            encodings: current,
            needs_renegotiation,
        })
    }
}

const SIMULCAST_RIDS: [&[&str]; 3] = [&["high"], &["low", "high"], &["low", "mid", "high"]];
const SIMULCAST_SPLITS: [&[u32]; 3] = [&[100], &[25, 75], &[15, 30, 55]];
const SIMULCAST_SCALES: [&[f64]; 3] = [&[1.0], &[2.0, 1.0], &[4.0, 2.0, 1.0]];

/// Share of `max_kbps` given to a layer, saturating at `u32::MAX`
fn layer_bitrate_kbps(max_kbps: u32, split_percent: u32) -> u32 {
    let kbps = u64::from(max_kbps) * u64::from(split_percent) / 100;
    u32::try_from(kbps).unwrap_or(u32::MAX)
}

/// Simulcast with one to three layers.
///
/// The configured ceiling is split across layers (lowest first). In a
/// meeting of at most two attendees only the top layer is sent. When an
/// uplink estimate is known, layers are switched off from the top until
/// the active ones fit; at least one layer always stays active.
#[derive(Debug, Clone)]
pub struct SimulcastUplinkPolicy {
    max_bandwidth_kbps: u32,
    layers: usize,
    num_participants: u32,
    uplink_estimate_kbps: Option<u32>,
    applied: AppliedEncodings,
}

impl SimulcastUplinkPolicy {
    /// Create a policy; `layers` is clamped to 1..=3
    #[must_use]
    pub fn new(max_bandwidth_kbps: u32, layers: usize) -> Self {
        Self {
            max_bandwidth_kbps,
            layers: layers.clamp(1, 3),
            num_participants: 0,
            uplink_estimate_kbps: None,
            applied: AppliedEncodings::default(),
        }
    }

    /// Change the number of layers (clamped to 1..=3)
    pub fn set_layer_count(&mut self, layers: usize) {
        self.layers = layers.clamp(1, 3);
    }
}

impl UplinkPolicy for SimulcastUplinkPolicy {
    fn name(&self) -> &'static str {
        "simulcast"
    }

    fn update_index(&mut self, index: &VideoStreamIndex) {
        self.num_participants = index.num_participants();
    }

    fn update_metrics(&mut self, metrics: &ClientMetrics) {
        if metrics.available_outgoing_kbps.is_some() {
            self.uplink_estimate_kbps = metrics.available_outgoing_kbps;
        }
    }

    fn set_max_bandwidth_kbps(&mut self, kbps: u32) {
        self.max_bandwidth_kbps = kbps;
    }

    fn encoding_parameters(&self) -> Vec<EncodingParams> {
        let table = self.layers - 1;
        let mut encodings: Vec<EncodingParams> = SIMULCAST_RIDS[table]
            .iter()
            .zip(SIMULCAST_SPLITS[table])
            .zip(SIMULCAST_SCALES[table])
            .map(|((rid, split), scale)| EncodingParams {
                rid: (*rid).to_string(),
                max_bitrate_kbps: layer_bitrate_kbps(self.max_bandwidth_kbps, *split),
                scale_resolution_down_by: *scale,
                active: true,
            })
            .collect();

        let top = encodings.len() - 1;
        if (1..=2).contains(&self.num_participants) {
            for encoding in &mut encodings[..top] {
                encoding.active = false;
            }
        }

        if let Some(estimate) = self.uplink_estimate_kbps {
            let estimate = u64::from(estimate);
            let active_total = |encodings: &[EncodingParams]| -> u64 {
                encodings
                    .iter()
                    .filter(|e| e.active)
                    .map(|e| u64::from(e.max_bitrate_kbps))
                    .sum()
            };

            while active_total(&encodings) > estimate
                && encodings.iter().filter(|e| e.active).count() > 1
            {
                if let Some(highest) = encodings.iter_mut().rev().find(|e| e.active) {
                    highest.active = false;
                }
            }

            // A single layer over budget moves down to the best one that fits.
            if active_total(&encodings) > estimate {
                let fallback = encodings
                    .iter()
                    .rposition(|e| u64::from(e.max_bitrate_kbps) <= estimate)
                    .unwrap_or(0);
                for (i, encoding) in encodings.iter_mut().enumerate() {
                    encoding.active = i == fallback;
                }
            }
        }

        encodings
    }

    fn take_update(&mut self) -> Option<UplinkUpdate> {
        let current = self.encoding_parameters();
        self.applied.take_update(current)
    }
}

/// One encoding, scaled down as the meeting grows.
///
/// Up to four attendees the full ceiling and resolution are used; beyond
/// that both shrink by `sqrt(n / 4)`.
#[derive(Debug, Clone)]
pub struct SingleLayerUplinkPolicy {
    max_bandwidth_kbps: u32,
    num_participants: u32,
    uplink_estimate_kbps: Option<u32>,
    applied: AppliedEncodings,
}

impl SingleLayerUplinkPolicy {
    /// Minimum bitrate ever requested (kbps)
    pub const MIN_BITRATE_KBPS: u32 = 100;

    /// Create a policy
    #[must_use]
    pub fn new(max_bandwidth_kbps: u32) -> Self {
        Self {
            max_bandwidth_kbps,
            num_participants: 0,
            uplink_estimate_kbps: None,
            applied: AppliedEncodings::default(),
        }
    }
}

impl UplinkPolicy for SingleLayerUplinkPolicy {
    fn name(&self) -> &'static str {
        "single-layer"
    }

    fn update_index(&mut self, index: &VideoStreamIndex) {
        self.num_participants = index.num_participants();
    }

    fn update_metrics(&mut self, metrics: &ClientMetrics) {
        if metrics.available_outgoing_kbps.is_some() {
            self.uplink_estimate_kbps = metrics.available_outgoing_kbps;
        }
    }

    fn set_max_bandwidth_kbps(&mut self, kbps: u32) {
        self.max_bandwidth_kbps = kbps;
    }

    fn encoding_parameters(&self) -> Vec<EncodingParams> {
        let scale = if self.num_participants > 4 {
            (f64::from(self.num_participants) / 4.0).sqrt()
        } else {
            1.0
        };

        let mut bitrate = (f64::from(self.max_bandwidth_kbps) / scale) as u32;
        if let Some(estimate) = self.uplink_estimate_kbps {
            bitrate = bitrate.min(estimate);
        }
        let bitrate = bitrate.max(Self::MIN_BITRATE_KBPS.min(self.max_bandwidth_kbps));

        vec![EncodingParams {
            rid: "high".to_string(),
            max_bitrate_kbps: bitrate,
            scale_resolution_down_by: scale,
            active: true,
        }]
    }

    fn take_update(&mut self) -> Option<UplinkUpdate> {
        let current = self.encoding_parameters();
        self.applied.take_update(current)
    }
}

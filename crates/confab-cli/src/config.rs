//! Configuration file for the Confab CLI.

use confab_core::policy::{DownlinkPolicyKind, PriorityPolicyConfig, UplinkPolicyKind};
use confab_core::{HealthConfig, ReconnectConfig, SessionConfig};
use confab_transport::TransportConfig;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Highest accepted local video ceiling (kbps)
const MAX_UPLINK_KBPS: u32 = 100_000;

/// Longest accepted keep-alive period (seconds)
const MAX_PING_INTERVAL_SECS: u64 = 300;

/// Confab configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    /// Signaling configuration
    #[serde(default)]
    pub signaling: SignalingConfig,
    /// Reconnect configuration
    #[serde(default)]
    pub reconnect: ReconnectSettings,
    /// Video configuration
    #[serde(default)]
    pub video: VideoConfig,
    /// Keep-alive configuration
    #[serde(default)]
    pub keepalive: KeepaliveConfig,
    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Signaling configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SignalingConfig {
    /// Socket connect timeout (seconds)
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_secs: u64,
    /// Wait for JoinAck and SubscribeAck (seconds)
    #[serde(default = "default_ack_timeout")]
    pub ack_timeout_secs: u64,
    /// Offer SDP compression
    #[serde(default = "default_true")]
    pub sdp_compression: bool,
}

/// Reconnect configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReconnectSettings {
    /// First retry wait (milliseconds)
    #[serde(default = "default_fixed_wait")]
    pub fixed_wait_ms: u64,
    /// Second retry wait (milliseconds)
    #[serde(default = "default_short_backoff")]
    pub short_backoff_ms: u64,
    /// Later retry wait (milliseconds)
    #[serde(default = "default_long_backoff")]
    pub long_backoff_ms: u64,
    /// Give up after this long (seconds)
    #[serde(default = "default_reconnect_timeout")]
    pub timeout_secs: u64,
    /// Randomize waits
    #[serde(default = "default_true")]
    pub jitter: bool,
}

/// Video configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VideoConfig {
    /// Receive-side policy
    #[serde(default)]
    pub downlink_policy: DownlinkPolicyKind,
    /// Send-side policy
    #[serde(default)]
    pub uplink_policy: UplinkPolicyKind,
    /// Ceiling for local video (kbps)
    #[serde(default = "default_max_uplink")]
    pub max_uplink_kbps: u32,
    /// Simulcast layers
    #[serde(default = "default_simulcast_layers")]
    pub simulcast_layers: usize,
    /// Most remote videos received
    #[serde(default = "default_max_remote_videos")]
    pub max_remote_videos: u32,
    /// Downlink estimate before the first metrics (kbps)
    #[serde(default = "default_initial_downlink")]
    pub initial_downlink_kbps: u32,
}

/// Keep-alive configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KeepaliveConfig {
    /// Ping period (seconds)
    #[serde(default = "default_ping_interval")]
    pub ping_interval_secs: u64,
    /// Missed pongs before reconnecting
    #[serde(default = "default_max_missed_pongs")]
    pub max_missed_pongs: u32,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level
    #[serde(default = "default_log_level")]
    pub level: String,
}

// Default values

fn default_true() -> bool {
    true
}

fn default_connect_timeout() -> u64 {
    15
}

fn default_ack_timeout() -> u64 {
    15
}

fn default_fixed_wait() -> u64 {
    100
}

fn default_short_backoff() -> u64 {
    1000
}

fn default_long_backoff() -> u64 {
    5000
}

fn default_reconnect_timeout() -> u64 {
    120
}

fn default_max_uplink() -> u32 {
    1400
}

fn default_simulcast_layers() -> usize {
    3
}

fn default_max_remote_videos() -> u32 {
    25
}

fn default_initial_downlink() -> u32 {
    2000
}

fn default_ping_interval() -> u64 {
    10
}

fn default_max_missed_pongs() -> u32 {
    4
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for SignalingConfig {
    fn default() -> Self {
        Self {
            connect_timeout_secs: default_connect_timeout(),
            ack_timeout_secs: default_ack_timeout(),
            sdp_compression: true,
        }
    }
}

impl Default for ReconnectSettings {
    fn default() -> Self {
        Self {
            fixed_wait_ms: default_fixed_wait(),
            short_backoff_ms: default_short_backoff(),
            long_backoff_ms: default_long_backoff(),
            timeout_secs: default_reconnect_timeout(),
            jitter: true,
        }
    }
}

impl Default for VideoConfig {
    fn default() -> Self {
        Self {
            downlink_policy: DownlinkPolicyKind::default(),
            uplink_policy: UplinkPolicyKind::default(),
            max_uplink_kbps: default_max_uplink(),
            simulcast_layers: default_simulcast_layers(),
            max_remote_videos: default_max_remote_videos(),
            initial_downlink_kbps: default_initial_downlink(),
        }
    }
}

impl Default for KeepaliveConfig {
    fn default() -> Self {
        Self {
            ping_interval_secs: default_ping_interval(),
            max_missed_pongs: default_max_missed_pongs(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

impl Config {
    /// Load configuration from file
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn load<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let contents = fs::read_to_string(path)?;
        let config: Self = toml::from_str(&contents)?;
        Ok(config)
    }

    /// Save configuration to file
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be written.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> anyhow::Result<()> {
        let contents = toml::to_string_pretty(self)?;
        if let Some(parent) = path.as_ref().parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, contents)?;
        Ok(())
    }

    /// Default config path
    #[must_use]
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("/tmp"))
            .join("confab/config.toml")
    }

    /// Load `path` if it exists; a missing default file yields defaults
    ///
    /// # Errors
    ///
    /// Returns an error if an existing file cannot be parsed, or if a
    /// non-default path does not exist.
    pub fn load_or_default(path: &Path) -> anyhow::Result<Self> {
        if path.exists() {
            Self::load(path)
        } else if path == Self::default_path() {
            Ok(Self::default())
        } else {
            anyhow::bail!("Config file not found: {}", path.display())
        }
    }

    /// Validate configuration
    ///
    /// # Errors
    ///
    /// Returns an error if configuration is invalid.
    pub fn validate(&self) -> anyhow::Result<()> {
        let valid_log_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_log_levels.contains(&self.logging.level.to_lowercase().as_str()) {
            anyhow::bail!(
                "Invalid log level: {}. Must be one of: {}",
                self.logging.level,
                valid_log_levels.join(", ")
            );
        }

        if self.signaling.connect_timeout_secs == 0 || self.signaling.ack_timeout_secs == 0 {
            anyhow::bail!("Signaling timeouts must be at least 1 second");
        }

        if !(1..=3).contains(&self.video.simulcast_layers) {
            anyhow::bail!("Simulcast layers must be between 1 and 3");
        }

        if !(100..=MAX_UPLINK_KBPS).contains(&self.video.max_uplink_kbps) {
            anyhow::bail!("Max uplink bandwidth must be between 100 and {MAX_UPLINK_KBPS} kbps");
        }

        if self.video.max_remote_videos == 0 || self.video.max_remote_videos > 250 {
            anyhow::bail!("Max remote videos must be between 1 and 250");
        }

        if self.keepalive.ping_interval_secs == 0 || self.keepalive.max_missed_pongs == 0 {
            anyhow::bail!("Keep-alive interval and missed pong limit must be non-zero");
        }

        if self.keepalive.ping_interval_secs > MAX_PING_INTERVAL_SECS {
            anyhow::bail!("Keep-alive interval must be at most {MAX_PING_INTERVAL_SECS} seconds");
        }

        if self.reconnect.fixed_wait_ms > self.reconnect.timeout_secs.saturating_mul(1000) {
            anyhow::bail!("Reconnect fixed wait exceeds the reconnect timeout");
        }

        Ok(())
    }

    /// Engine configuration
    #[must_use]
    pub fn session_config(&self) -> SessionConfig {
        let defaults = SessionConfig::default();
        SessionConfig {
            transport: TransportConfig {
                connect_timeout: Duration::from_secs(self.signaling.connect_timeout_secs),
                idle_timeout: Duration::from_secs(
                    self.keepalive
                        .ping_interval_secs
                        .saturating_mul(u64::from(SessionConfig::IDLE_PINGS)),
                ),
            },
            reconnect: ReconnectConfig {
                fixed_wait: Duration::from_millis(self.reconnect.fixed_wait_ms),
                short_backoff: Duration::from_millis(self.reconnect.short_backoff_ms),
                long_backoff: Duration::from_millis(self.reconnect.long_backoff_ms),
                reconnect_timeout: Duration::from_secs(self.reconnect.timeout_secs),
                jitter: self.reconnect.jitter,
            },
            health: HealthConfig {
                max_missed_pongs: self.keepalive.max_missed_pongs,
                degraded_missed_pongs: (self.keepalive.max_missed_pongs / 2).max(1),
                ..HealthConfig::default()
            },
            downlink_policy: self.video.downlink_policy,
            priority_policy: PriorityPolicyConfig {
                max_subscriptions: self.video.max_remote_videos as usize,
                initial_downlink_estimate_kbps: self.video.initial_downlink_kbps,
            },
            uplink_policy: self.video.uplink_policy,
            max_uplink_bandwidth_kbps: self.video.max_uplink_kbps,
            simulcast_layers: self.video.simulcast_layers,
            max_remote_videos: self.video.max_remote_videos,
            sdp_compression: self.signaling.sdp_compression,
            ack_timeout: Duration::from_secs(self.signaling.ack_timeout_secs),
            ping_interval: Duration::from_secs(self.keepalive.ping_interval_secs),
            app_name: "confab-cli".to_string(),
            app_version: env!("CARGO_PKG_VERSION").to_string(),
            ..defaults
        }
    }
}

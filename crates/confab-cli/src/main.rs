//! Confab CLI
//!
//! Joins meetings from the command line and inspects signaling frames.

mod config;

use clap::{Parser, Subcommand};
use confab_core::health::HealthStatus;
use confab_core::messages::{AudioStreamInfo, DataMessagePayload};
use confab_core::session::LoopbackPeerFactory;
use confab_core::{
    FrameCodec, JoinDescriptor, RemoteVideoSource, SessionController, SessionObserver,
    SessionStatusCode, VideoStreamIdSet,
};
use confab_transport::websocket::TungsteniteConnector;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use config::Config;

/// Confab - WebRTC signaling client
#[derive(Parser)]
#[command(name = "confab")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long)]
    verbose: bool,

    /// Configuration file path
    #[arg(short, long)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Join a meeting and stay until Ctrl+C or the meeting ends
    Join {
        /// Join descriptor JSON file (`{"Meeting": ..., "Attendee": ...}`)
        #[arg(required = true)]
        descriptor: PathBuf,

        /// Send local video
        #[arg(long)]
        video: bool,

        /// Start muted
        #[arg(long)]
        muted: bool,
    },

    /// Decode a hex-encoded signal frame
    Decode {
        /// Frame bytes as hex
        #[arg(required = true)]
        hex: String,
    },

    /// Print the effective configuration
    Config {
        /// Also write it to the config file
        #[arg(long)]
        write: bool,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let config_path = cli.config.clone().unwrap_or_else(Config::default_path);
    let config = Config::load_or_default(&config_path)?;
    config.validate()?;

    let level = if cli.verbose {
        "debug".to_string()
    } else {
        config.logging.level.to_lowercase()
    };
    tracing_subscriber::fmt().with_env_filter(level).init();

    match cli.command {
        Commands::Join {
            descriptor,
            video,
            muted,
        } => {
            join_meeting(descriptor, video, muted, &config).await?;
        }
        Commands::Decode { hex } => {
            decode_frame(&hex)?;
        }
        Commands::Config { write } => {
            show_config(&config, write, &config_path)?;
        }
    }

    Ok(())
}

/// Prints session events as they happen
struct ConsoleObserver;

impl SessionObserver for ConsoleObserver {
    fn session_connecting(&self, reconnecting: bool) {
        if reconnecting {
            println!("Reconnecting...");
        } else {
            println!("Connecting...");
        }
    }

    fn session_started(&self, reconnecting: bool) {
        println!("{}", if reconnecting { "Reconnected" } else { "Connected" });
    }

    fn session_stopped(&self, status: SessionStatusCode) {
        println!("Session ended: {status}");
    }

    fn video_subscriptions_changed(&self, subscribed: &VideoStreamIdSet) {
        println!("Receiving video streams: {:?}", subscribed.to_vec());
    }

    fn remote_video_sources_changed(&self, sources: &[RemoteVideoSource]) {
        println!("Remote video sources: {}", sources.len());
        for source in sources {
            println!("  {} ({})", source.attendee_id, source.external_user_id);
        }
    }

    fn data_message_received(&self, message: &DataMessagePayload) {
        println!(
            "[{}] {}: {}",
            message.topic,
            message.sender_attendee_id,
            String::from_utf8_lossy(&message.data)
        );
    }

    fn attendee_audio_changed(&self, info: &AudioStreamInfo) {
        tracing::debug!("Audio stream {:?}", info);
    }

    fn primary_meeting_promotion(&self, status: SessionStatusCode) {
        println!("Primary meeting promotion: {status}");
    }

    fn connection_health_changed(&self, status: HealthStatus) {
        if status != HealthStatus::Healthy {
            tracing::warn!("Connection health {:?}", status);
        }
    }
}

/// Join a meeting until interrupted or ended by the server
async fn join_meeting(
    descriptor_path: PathBuf,
    video: bool,
    muted: bool,
    config: &Config,
) -> anyhow::Result<()> {
    let json = std::fs::read_to_string(&descriptor_path)?;
    let descriptor = JoinDescriptor::from_json(&json)?;
    descriptor.validate()?;

    println!("Meeting: {}", descriptor.meeting.meeting_id);
    println!("Attendee: {}", descriptor.attendee.attendee_id);
    println!(
        "Signaling: {}",
        descriptor.meeting.media_placement.signaling_url
    );
    println!("Press Ctrl+C to leave");
    tracing::info!(
        "Joining with downlink={:?} uplink={:?}",
        config.video.downlink_policy,
        config.video.uplink_policy
    );

    let session = SessionController::new(
        config.session_config(),
        descriptor,
        Arc::new(TungsteniteConnector::new()),
        Arc::new(LoopbackPeerFactory::new()),
    );
    session.add_observer(Arc::new(ConsoleObserver));
    session.set_local_video(video);
    session.mute(muted);
    session.start();

    let status = tokio::select! {
        status = session.wait_until_stopped() => status,
        result = tokio::signal::ctrl_c() => {
            result?;
            println!("\nLeaving...");
            session.stop();
            session.wait_until_stopped().await
        }
    };

    if status.is_failure() {
        anyhow::bail!("Session failed: {}", status);
    }
    Ok(())
}

/// Decode one frame and print it
fn decode_frame(hex_frame: &str) -> anyhow::Result<()> {
    let cleaned: String = hex_frame.chars().filter(|c| !c.is_whitespace()).collect();
    let bytes = hex::decode(cleaned)?;
    let frame = FrameCodec::new().decode(&bytes)?;

    println!("Type: {}", frame.frame_type().name());
    println!("Size: {} bytes", bytes.len());
    println!("{frame:#?}");
    Ok(())
}

/// Print (and optionally save) the configuration
fn show_config(config: &Config, write: bool, path: &Path) -> anyhow::Result<()> {
    print!("{}", toml::to_string_pretty(config)?);
    if write {
        config.save(path)?;
        println!("\nSaved to {}", path.display());
    }
    Ok(())
}

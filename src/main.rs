//! BannerWarp - Perspective preview for banner templates
//!
//! Serves an interactive surface where the four corners of a banner can be
//! dragged anywhere on screen. The banner is mapped onto the resulting
//! quadrilateral with a projective transform, showing how it would look hung
//! at an angle.

mod config;
mod corners;
mod debounce;
mod error;
mod handles;
mod server;
mod surface;
mod transform;
mod warp;

use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

/// BannerWarp - drag a banner's corners and preview it in perspective
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Web server host (overrides config)
    #[arg(long)]
    host: Option<String>,

    /// Web server port (overrides config)
    #[arg(short, long)]
    port: Option<u16>,

    /// Configuration file path
    #[arg(short, long, default_value = "config.toml")]
    config: PathBuf,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Initialize logging
    let log_level = if args.verbose { Level::DEBUG } else { Level::INFO };
    let _subscriber = FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_target(false)
        .compact()
        .init();

    info!("BannerWarp v{}", env!("CARGO_PKG_VERSION"));

    // Load or create configuration, with CLI args as overrides
    let mut config = config::Config::load_or_create(&args.config)?;
    if let Some(host) = args.host {
        config.server.host = host;
    }
    if let Some(port) = args.port {
        config.server.port = port;
    }

    info!(
        "Design: {} (aspect {:.3})",
        config.design.name,
        config.design.aspect_ratio()
    );
    info!(
        "Handles: {}px, hit area {}px, resize debounce {}ms",
        config.surface.handle_size,
        config.surface.handle_hit_area,
        config.surface.resize_debounce_ms
    );

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let state = Arc::new(server::AppState::new(config));

    info!("Starting web server at http://{}", addr);
    server::run_server(&addr, state).await
}

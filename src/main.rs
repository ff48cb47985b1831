use std::path::PathBuf;

use clap::{Parser, ValueEnum};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use livecast::config::AppConfig;
use livecast::render::PatternRenderer;
use livecast::server::Orchestrator;
use livecast::video::EncodedFormat;

/// Log level for the application
#[derive(Debug, Clone, Copy, Default, ValueEnum)]
enum LogLevel {
    Error,
    Warn,
    #[default]
    Info,
    Verbose,
    Debug,
    Trace,
}

/// livecast command line arguments
#[derive(Parser, Debug)]
#[command(name = "livecast")]
#[command(version, about = "Live render streaming server with remote camera control", long_about = None)]
struct CliArgs {
    /// JSON configuration file (default: $LIVECAST_CONFIG)
    #[arg(short = 'c', long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Listen address (overrides config)
    #[arg(short = 'a', long, value_name = "ADDRESS")]
    address: Option<String>,

    /// Frame streaming port (overrides config)
    #[arg(long, value_name = "PORT")]
    send_port: Option<u16>,

    /// Camera control port (overrides config)
    #[arg(long, value_name = "PORT")]
    recv_port: Option<u16>,

    /// Default render width (overrides config)
    #[arg(long, value_name = "PIXELS")]
    width: Option<u32>,

    /// Default render height (overrides config)
    #[arg(long, value_name = "PIXELS")]
    height: Option<u32>,

    /// JPEG quality 0-100 (overrides config)
    #[arg(short = 'q', long, value_name = "QUALITY")]
    jpeg_quality: Option<u32>,

    /// Stream encoding: jpeg or rgba (overrides config)
    #[arg(short = 'e', long, value_name = "FORMAT")]
    encoding: Option<EncodedFormat>,

    /// Only send each rendered frame once per client
    #[arg(long)]
    skip_duplicate_frames: bool,

    /// Log level (error, warn, info, verbose, debug, trace)
    #[arg(short = 'l', long, value_name = "LEVEL", default_value = "info")]
    log_level: LogLevel,

    /// Increase verbosity (-v for verbose, -vv for debug, -vvv for trace)
    #[arg(short = 'v', long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Emit logs as JSON lines
    #[arg(long)]
    log_json: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = CliArgs::parse();

    init_logging(args.log_level, args.verbose, args.log_json);

    tracing::info!("Starting livecast v{}", env!("CARGO_PKG_VERSION"));

    let mut config = AppConfig::load(args.config.as_deref())?;
    apply_overrides(&mut config, &args);

    let orchestrator = Orchestrator::new(config)?;
    let pipeline = orchestrator.start(PatternRenderer::new()).await?;

    let shutdown_signal = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to listen for CTRL+C: {}", e);
            std::future::pending::<()>().await;
        }
        tracing::info!("Shutdown signal received");
    };

    let frames = pipeline.run_until(shutdown_signal).await?;
    tracing::info!("Server shutdown complete ({} frames rendered)", frames);
    Ok(())
}

/// Command line values win over the file
fn apply_overrides(config: &mut AppConfig, args: &CliArgs) {
    if let Some(address) = &args.address {
        config.server.host = address.clone();
    }
    if let Some(port) = args.send_port {
        config.server.send_port = port;
    }
    if let Some(port) = args.recv_port {
        config.server.recv_port = port;
    }
    if let Some(width) = args.width {
        config.camera.width = width;
    }
    if let Some(height) = args.height {
        config.camera.height = height;
    }
    if let Some(quality) = args.jpeg_quality {
        config.stream.jpeg_quality = quality;
    }
    if let Some(encoding) = args.encoding {
        config.stream.encoding = encoding;
    }
    if args.skip_duplicate_frames {
        config.stream.skip_duplicate_frames = true;
    }
}

/// Initialize logging with tracing
fn init_logging(level: LogLevel, verbose_count: u8, json: bool) {
    // Verbose count overrides log level
    let effective_level = match verbose_count {
        0 => level,
        1 => LogLevel::Verbose,
        2 => LogLevel::Debug,
        _ => LogLevel::Trace,
    };

    let filter = match effective_level {
        LogLevel::Error => "livecast=error,tower_http=error",
        LogLevel::Warn => "livecast=warn,tower_http=warn",
        LogLevel::Info => "livecast=info,tower_http=info",
        LogLevel::Verbose => "livecast=debug,tower_http=info",
        LogLevel::Debug => "livecast=debug,tower_http=debug",
        LogLevel::Trace => "livecast=trace,tower_http=debug",
    };

    // Environment variable takes highest priority
    let env_filter =
        tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| filter.into());

    let result = if json {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(tracing_subscriber::fmt::layer().json())
            .try_init()
    } else {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(tracing_subscriber::fmt::layer())
            .try_init()
    };

    if let Err(err) = result {
        eprintln!("failed to initialize tracing: {}", err);
    }
}

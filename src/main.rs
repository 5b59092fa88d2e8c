//! Sidecar Locator - find the registry-facing interface and print the instance descriptor
//!
//! Usage:
//!   sidecar-locator [OPTIONS]
//!
//! Options:
//!   -c, --config <FILE>          Configuration file path
//!   -r, --registry <URL>         Registry service URL (repeatable)
//!   --max-attempts <N>           Give up after N attempts (0 = never)
//!   --retry-interval <DURATION>  Pause between attempts (e.g. 1s, 500ms)
//!   --pretty                     Pretty-print the descriptor JSON
//!   -l, --log-level              Log level (error, warn, info, debug, trace)
//!   -h, --help                   Print help

use std::path::PathBuf;
use std::time::Duration;

use clap::{Parser, ValueEnum};
use tokio::sync::broadcast;
use tracing::{info, warn, Level};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use sidecar_locator::config::Config;
use sidecar_locator::locator::InstanceLocator;
use sidecar_locator::net::{SystemInterfaces, SystemResolver};

/// Log level for CLI
#[derive(Debug, Clone, Copy, ValueEnum, Default)]
enum LogLevel {
    /// Only errors
    Error,
    /// Warnings and errors
    #[default]
    Warn,
    /// Informational messages
    Info,
    /// Debug messages
    Debug,
    /// Trace messages (very verbose)
    Trace,
}

impl LogLevel {
    fn to_tracing_level(self) -> Level {
        match self {
            LogLevel::Error => Level::ERROR,
            LogLevel::Warn => Level::WARN,
            LogLevel::Info => Level::INFO,
            LogLevel::Debug => Level::DEBUG,
            LogLevel::Trace => Level::TRACE,
        }
    }
}

/// Sidecar Locator - registry-facing address discovery
#[derive(Parser, Debug)]
#[command(name = "sidecar-locator")]
#[command(version)]
#[command(about = "Find the interface sharing a subnet with the registry and print the instance descriptor")]
struct Args {
    /// Configuration file path (TOML format)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Registry service URL, replaces the configured list (repeatable)
    #[arg(short, long = "registry")]
    registry: Vec<String>,

    /// Give up after this many attempts (0 = retry forever)
    #[arg(long)]
    max_attempts: Option<u32>,

    /// Pause between attempts (e.g. "1s", "500ms")
    #[arg(long, value_parser = humantime::parse_duration)]
    retry_interval: Option<Duration>,

    /// Pretty-print the descriptor JSON
    #[arg(long)]
    pretty: bool,

    /// Log level (error, warn, info, debug, trace)
    #[arg(short, long, value_enum)]
    log_level: Option<LogLevel>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    // Config file is optional, SIDECAR__* variables apply either way
    let mut config = match Config::read(args.config.as_deref()) {
        Ok(cfg) => cfg,
        Err(e) => {
            eprintln!("Error loading configuration: {}", e);
            std::process::exit(1);
        }
    };

    // CLI args override file config
    if !args.registry.is_empty() {
        config.registry.service_urls = args.registry.clone();
    }
    if let Some(max_attempts) = args.max_attempts {
        config.locator.max_attempts = max_attempts;
    }
    if let Some(interval) = args.retry_interval {
        config.locator.retry_interval = interval;
    }
    if let Err(e) = config.validate() {
        eprintln!("Invalid configuration: {}", e);
        std::process::exit(1);
    }

    // Setup logging - CLI overrides RUST_LOG, RUST_LOG overrides config,
    // config overrides default (warn)
    let filter = match args.log_level {
        Some(level) => EnvFilter::default().add_directive(level.to_tracing_level().into()),
        None => EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            let level = match config.log.level.to_lowercase().as_str() {
                "error" => LogLevel::Error,
                "warn" => LogLevel::Warn,
                "info" => LogLevel::Info,
                "debug" => LogLevel::Debug,
                "trace" => LogLevel::Trace,
                _ => LogLevel::Warn,
            };
            EnvFilter::default().add_directive(level.to_tracing_level().into())
        }),
    };

    // Logs go to stderr, stdout carries the descriptor
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_thread_ids(true)
        .with_file(false)
        .with_line_number(false)
        .compact()
        .finish();

    tracing::subscriber::set_global_default(subscriber)?;

    if let Some(path) = &args.config {
        info!("Loaded configuration from {:?}", path);
    }

    let locator = InstanceLocator::from_config(&config, SystemInterfaces, SystemResolver)?;

    info!("Starting Sidecar Locator");
    for endpoint in locator.endpoints() {
        info!("  Registry: {} ({}:{})", endpoint, endpoint.host, endpoint.port);
    }
    let policy = locator.retry_policy();
    if policy.max_attempts == 0 {
        info!("  Retry: every {:?}, unbounded", policy.interval);
    } else {
        info!(
            "  Retry: every {:?}, at most {} attempts",
            policy.interval, policy.max_attempts
        );
    }
    if config.should_register() {
        info!("  Registration: enabled");
    } else {
        info!("  Registration: disabled, descriptor marked registerWithRegistry=false");
    }

    let (shutdown_tx, shutdown_rx) = broadcast::channel(1);
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                let _ = shutdown_tx.send(());
            }
            Err(e) => {
                // Keep the sender alive, a dropped sender reads as shutdown
                warn!("Unable to listen for Ctrl+C: {}", e);
                std::future::pending::<()>().await;
            }
        }
    });

    let descriptor = match locator.locate_until(shutdown_rx).await {
        Ok(descriptor) => descriptor,
        Err(e) => {
            eprintln!("Error locating instance address: {}", e);
            std::process::exit(1);
        }
    };

    let json = if args.pretty {
        serde_json::to_string_pretty(&descriptor)?
    } else {
        serde_json::to_string(&descriptor)?
    };
    println!("{}", json);

    Ok(())
}

//! Fileserver - static files, uploads, and a rotating log

use clap::Parser;
use fileserver::logging::{self, LogFormat, RotatingFile, RotationPolicy};
use fileserver::metrics::server::MetricsServer;
use fileserver::config::{validate_log_level, Config};
use fileserver::server::Server;
use std::path::PathBuf;
use tracing::{error, info};

/// Fileserver - serve a directory and accept uploads into it
#[derive(Parser, Debug)]
#[command(name = "fileserver")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to configuration file (defaults apply when omitted)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error); overrides the config file
    #[arg(short, long)]
    log_level: Option<String>,

    /// Log file record format
    #[arg(long, value_enum, default_value_t = LogFormat::Text)]
    log_format: LogFormat,

    /// Also log to stdout
    #[arg(long)]
    console: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let config = match &args.config {
        Some(path) => Config::load(path)?,
        None => Config::default(),
    };
    if let Some(level) = &args.log_level {
        validate_log_level(level)?;
    }

    let policy = RotationPolicy::from_megabytes(
        config.logging.max_size_mb,
        config.logging.max_backups,
        config.logging.max_age_days,
    );
    let log_path = config.logging.file_path();
    let sink = match RotatingFile::open(&log_path, policy) {
        Ok(sink) => sink,
        Err(e) => {
            eprintln!("fileserver: cannot open log file: {}", e);
            std::process::exit(1);
        }
    };

    let level = args
        .log_level
        .clone()
        .unwrap_or_else(|| config.logging.level.clone());
    logging::init_subscriber(sink.clone(), &level, args.log_format, args.console)?;

    info!("Starting Fileserver v{}", fileserver::VERSION);
    match &args.config {
        Some(path) => info!("Loaded configuration from {:?}", path),
        None => info!("No configuration file given, using defaults"),
    }
    info!("Logging to {}", log_path.display());

    #[cfg(unix)]
    {
        let hangup = logging::HangupSignal::install()?;
        logging::spawn_rotation_task(sink.clone(), hangup);
    }

    let mut metrics_server = if config.metrics.enabled {
        let mut metrics_server = MetricsServer::from_config(&config.metrics);
        metrics_server.start().await?;
        Some(metrics_server)
    } else {
        None
    };

    let server = Server::bind(config).await?;
    let result = server.run().await;

    if let Some(metrics_server) = metrics_server.as_mut() {
        metrics_server.shutdown().await;
    }

    if let Err(e) = &result {
        error!("Server stopped with error: {}", e);
    }
    info!("Fileserver stopped");
    sink.flush()?;

    result.map_err(Into::into)
}

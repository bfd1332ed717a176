//! CLI entry point for the traffic API.
//!
//! Serves the HTTP API, or runs any single operation against the configured
//! reading snapshot and prints the result as JSON.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::ffi::OsStr;
use std::net::SocketAddr;
use std::path::Path;
use tracing::info;
use tracing_subscriber::{
    EnvFilter, Layer,
    filter::Directive,
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
};
use traffic_api::{
    analyzers::{
        history::{DEFAULT_HISTORY_HOURS, sensor_history},
        prediction::predict_sensor,
        route::analyze_route,
        sensors::sensors_in_view,
    },
    api::build_router,
    config::{PredictorConfig, ServiceConfig},
    context::AppContext,
    output::{append_history, print_json},
    store::ReadingSource,
};

#[derive(Parser)]
#[command(name = "traffic_api")]
#[command(about = "Traffic sensor prediction and route congestion API", long_about = None)]
struct Cli {
    /// Reading snapshot: CSV path (optionally .gz) or s3://bucket/key
    #[arg(long, global = true, value_name = "SOURCE")]
    readings: Option<String>,

    /// Linear model weights JSON
    #[arg(long, global = true)]
    model_path: Option<String>,

    /// Remote model-serving endpoint; takes precedence over --model-path
    #[arg(long, global = true)]
    predictor_url: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the HTTP API
    Serve {
        /// Address to listen on
        #[arg(short, long)]
        bind: Option<SocketAddr>,
    },
    /// Predict the next-interval speed for a sensor
    Predict {
        #[arg(value_name = "DETID")]
        detid: String,
    },
    /// Show the 10-minute averaged speed history of a sensor
    History {
        #[arg(value_name = "DETID")]
        detid: String,

        #[arg(long, default_value_t = DEFAULT_HISTORY_HOURS)]
        hours: u32,

        /// CSV file to append the intervals to
        #[arg(long)]
        csv: Option<String>,
    },
    /// Summarize congestion along an encoded polyline
    Route {
        #[arg(value_name = "POLYLINE")]
        polyline: String,
    },
    /// List sensors inside a bounding box
    Sensors {
        #[arg(long, allow_hyphen_values = true)]
        min_lon: f64,
        #[arg(long, allow_hyphen_values = true)]
        min_lat: f64,
        #[arg(long, allow_hyphen_values = true)]
        max_lon: f64,
        #[arg(long, allow_hyphen_values = true)]
        max_lat: f64,
    },
}

impl Cli {
    fn apply_overrides(&self, config: &mut ServiceConfig) -> Result<()> {
        if let Some(readings) = &self.readings {
            config.readings = ReadingSource::parse(readings)?;
        }
        if let Some(url) = &self.predictor_url {
            let (api_key, api_key_header) = match &config.predictor {
                PredictorConfig::Remote {
                    api_key,
                    api_key_header,
                    ..
                } => (api_key.clone(), api_key_header.clone()),
                _ => (
                    std::env::var("PREDICTOR_API_KEY").ok(),
                    std::env::var("PREDICTOR_API_KEY_HEADER").ok(),
                ),
            };
            config.predictor = PredictorConfig::Remote {
                url: url.clone(),
                api_key,
                api_key_header,
            };
        } else if let Some(path) = &self.model_path {
            config.predictor = PredictorConfig::Linear { path: path.clone() };
        }
        if let Commands::Serve { bind: Some(bind) } = &self.command {
            config.bind_addr = *bind;
        }
        Ok(())
    }
}

fn env_filter(var: &str, default: &str) -> Result<EnvFilter> {
    let directive: Directive = default
        .parse()
        .with_context(|| format!("invalid default log directive '{default}'"))?;
    Ok(EnvFilter::from_env(var).add_directive(directive))
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok(); // Load .env file

    // Logging setup: colored stderr + JSON rolling log file
    let log_file_path =
        std::env::var("LOG_FILE_PATH").unwrap_or_else(|_| "logs/traffic_api.log".to_string());
    let log_dir = Path::new(&log_file_path)
        .parent()
        .unwrap_or(Path::new("logs"));
    let log_file_name = Path::new(&log_file_path)
        .file_name()
        .unwrap_or(OsStr::new("traffic_api.log"));

    let file_appender = tracing_appender::rolling::daily(log_dir, log_file_name);
    let (non_blocking_file, _file_guard) = tracing_appender::non_blocking(file_appender);

    let stderr_layer = fmt::layer()
        .with_target(true)
        .with_span_events(FmtSpan::CLOSE)
        .with_ansi(true)
        .with_writer(std::io::stderr)
        .with_filter(env_filter("RUST_LOG", "info")?);

    let json_layer = fmt::layer()
        .json()
        .with_current_span(true)
        .with_span_list(true)
        .with_writer(non_blocking_file)
        .with_filter(env_filter("RUST_LOG_JSON", "debug")?);

    tracing_subscriber::registry()
        .with(stderr_layer)
        .with(json_layer)
        .init();

    let cli = Cli::parse();

    let mut config = ServiceConfig::from_env()?;
    cli.apply_overrides(&mut config)?;

    let ctx = AppContext::from_config(&config).await;

    match cli.command {
        Commands::Serve { .. } => serve(ctx, config.bind_addr).await?,
        Commands::Predict { detid } => {
            print_json(&predict_sensor(&ctx, &detid).await?)?;
        }
        Commands::History { detid, hours, csv } => {
            let history = sensor_history(&ctx, &detid, hours).await?;
            match csv {
                Some(path) => {
                    append_history(&path, &history)?;
                    info!(path = %path, intervals = history.readings.len(), "History written");
                }
                None => print_json(&history)?,
            }
        }
        Commands::Route { polyline } => {
            print_json(&analyze_route(&ctx, &polyline).await?)?;
        }
        Commands::Sensors {
            min_lon,
            min_lat,
            max_lon,
            max_lat,
        } => {
            print_json(&sensors_in_view(&ctx, min_lon, min_lat, max_lon, max_lat).await?)?;
        }
    }

    Ok(())
}

#[tracing::instrument(skip(ctx))]
async fn serve(ctx: AppContext, addr: SocketAddr) -> Result<()> {
    let app = build_router(ctx);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    info!(%addr, "Listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    use tokio::signal;

    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Shutdown signal received, starting graceful shutdown");
}

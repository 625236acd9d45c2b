mod args;
mod config;
mod replay;
mod seed;

use std::io;
use std::net::{IpAddr, SocketAddr};

use clap::Parser;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use app_api::AppContext;
use args::{Cli, Command};
use http_api::HttpState;
use ingest::TrackerClient;
use tracker_app::{AppState, ConfigSource, TrackerConfig};

const DEFAULT_FILTER: &str = "ttrack=info,tracker_app=info,http_api=info,ingest=info";
const DEBUG_FILTER: &str =
    "ttrack=debug,tracker_app=debug,tracker_db=debug,http_api=debug,ingest=debug,tower_http=debug";

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    setup_logging(cli.debug);

    let (tracker_config, source) = TrackerConfig::load(cli.config.as_deref())?;
    match &source {
        ConfigSource::File(path) => tracing::info!(path = %path.display(), "loaded tracker config"),
        ConfigSource::Defaults => tracing::info!("using default tracker config"),
    }
    let app_state = AppState::new(tracker_config)?;

    match cli.command() {
        Command::Serve { port, bind } => serve(app_state, port, bind).await,
        Command::Seed { count, hours } => {
            let written = seed::run(&app_state.services.ingest, count, hours).await?;
            println!("Seeded {written} records over the last {hours}h.");
            Ok(())
        }
        Command::Replay {
            path,
            worktree,
            log_dir,
            server,
        } => {
            let options = replay::ReplayOptions {
                path,
                worktree,
                log_dir,
            };
            let stats = match server {
                Some(url) => replay::run(TrackerClient::new(url)?, options).await?,
                None => replay::run(app_state.services.ingest.clone(), options).await?,
            };
            println!("{}", serde_json::to_string(&stats)?);
            Ok(())
        }
    }
}

fn setup_logging(debug: bool) {
    let filter = if debug {
        EnvFilter::new(DEBUG_FILTER)
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER))
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_writer(std::io::stderr),
        )
        .init();
}

async fn serve(
    app_state: AppState,
    port: Option<u16>,
    bind: Option<IpAddr>,
) -> Result<(), Box<dyn std::error::Error>> {
    let cli_config = config::load_or_create().map_err(io::Error::other)?;
    if cli_config.created {
        println!(
            "Created config at {} (default port {}).",
            cli_config.file.display(),
            cli_config.config.port
        );
    }

    let port = port.unwrap_or(cli_config.config.port);
    let bind = bind.unwrap_or(cli_config.config.bind);
    let backend = app_state.backend_name();
    let router = http_api::router(HttpState::new(AppContext::new(app_state)));

    let (listener, actual_port, used_fallback) = bind_port(bind, port).await?;
    if used_fallback {
        eprintln!("Configured port {port} was unavailable; using {actual_port} for this run.");
    }

    let addr = SocketAddr::new(bind, actual_port);
    tracing::info!(%addr, backend, "token tracker listening");
    println!("Token tracker is running at http://{addr}");
    println!("Press Ctrl+C to stop.");

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn bind_port(
    bind: IpAddr,
    port: u16,
) -> Result<(tokio::net::TcpListener, u16, bool), io::Error> {
    if port == 0 {
        let listener = tokio::net::TcpListener::bind(SocketAddr::new(bind, 0)).await?;
        let actual_port = listener.local_addr()?.port();
        return Ok((listener, actual_port, false));
    }

    match tokio::net::TcpListener::bind(SocketAddr::new(bind, port)).await {
        Ok(listener) => Ok((listener, port, false)),
        Err(_) => {
            let listener = tokio::net::TcpListener::bind(SocketAddr::new(bind, 0)).await?;
            let actual_port = listener.local_addr()?.port();
            Ok((listener, actual_port, true))
        }
    }
}

async fn shutdown_signal() {
    let _ = tokio::signal::ctrl_c().await;
    tracing::info!("shutting down");
}

//! Hotspot application binary - composition root.
//!
//! 1. Parse the CLI and load configuration from TOML
//! 2. Initialize tracing (`RUST_LOG` > --log-level > config > info)
//! 3. `serve`: open the analytics store and run the axum ingestion server
//! 4. `simulate`: drive scripted tracker sessions against an endpoint

mod cli;
mod simulate;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use hotspot_api::routes;
use hotspot_api::state::AppState;
use hotspot_core::config::HotspotConfig;
use hotspot_store::AnalyticsStore;

use cli::{CliArgs, Command, ServeArgs};

async fn serve(
    args: &ServeArgs,
    mut config: HotspotConfig,
) -> Result<(), Box<dyn std::error::Error>> {
    args.apply(&mut config);

    let store = AnalyticsStore::from_config(&config.store)?;
    tracing::info!(
        backend = store.backend_name()?,
        events = store.event_count()?,
        sessions = store.session_count()?,
        "Analytics store opened"
    );

    let state = AppState::new(config.server.clone(), store);
    routes::start_server(state).await?;
    Ok(())
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = CliArgs::parse();

    let config_file = args.resolve_config_path();
    let config = if config_file.exists() {
        HotspotConfig::load_or_default(&config_file)
    } else {
        HotspotConfig::default()
    };

    let level = args.resolve_log_level(&config.general.log_level);
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&level)),
        )
        .init();

    tracing::info!("Starting Hotspot v{}", env!("CARGO_PKG_VERSION"));
    tracing::info!(
        path = %config_file.display(),
        exists = config_file.exists(),
        "Configuration resolved"
    );

    match args.command {
        None => serve(&ServeArgs::default(), config).await,
        Some(Command::Serve(ref serve_args)) => serve(serve_args, config).await,
        Some(Command::Simulate(ref sim_args)) => {
            let report = simulate::run(sim_args, &config).await?;
            tracing::info!(
                sessions = report.sessions,
                batches = ?report.batches,
                events = ?report.events,
                "Simulation complete"
            );
            Ok(())
        }
    }
}

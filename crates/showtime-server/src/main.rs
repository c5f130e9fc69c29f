//! # Showtime Server
//!
//! Runs the HTTP API, the job workers and the cron scheduler in one process.

use showtime_config::ConfigLoader;
use showtime_core::ShowtimeResult;
use showtime_server::{startup, telemetry, Application};
use tracing::{error, info};

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        error!("Application error: {}", e);
        eprintln!("showtime-server: {e}");
        std::process::exit(1);
    }
}

async fn run() -> ShowtimeResult<()> {
    let config_loader = ConfigLoader::from_default_location()?;
    let config = config_loader.get().await;

    telemetry::init_logging(&config.observability);
    info!("Starting Showtime server...");
    info!("Version: {}", env!("CARGO_PKG_VERSION"));

    let metrics = if config.observability.metrics_enabled {
        Some(telemetry::install_metrics()?)
    } else {
        None
    };

    let app = Application::build(config.clone(), metrics).await?;
    startup::print_startup_info(&config);
    app.run().await
}

use std::path::Path;
use std::sync::Arc;

use anyhow::Context;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::prelude::*;
use tracing_subscriber::{EnvFilter, fmt};

use cycle_planner::api::{HttpPlannerApi, PlannerApi};
use cycle_planner::app::App;
use cycle_planner::config::ClientConfig;
use cycle_planner::shell::Shell;
use cycle_planner::store::{Database, LibSqlBackend};

/// Logs go to stderr (stdout belongs to the shell) and, with a log
/// directory, to a daily rolling file as well.
fn init_tracing(log_dir: Option<&Path>) -> Option<WorkerGuard> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let (file_layer, guard) = match log_dir {
        Some(dir) => {
            let appender = tracing_appender::rolling::daily(dir, "cycle-planner.log");
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let layer = fmt::layer()
                .with_writer(writer)
                .with_ansi(false)
                .with_target(false);
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr).with_target(false))
        .with(file_layer)
        .init();

    guard
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let mut config = ClientConfig::from_env().context("Invalid configuration")?;

    // The URL the app was re-entered with, e.g. after the calendar consent.
    if let Some(url) = std::env::args().nth(1) {
        config.start_url = Some(url);
    }

    let _log_guard = init_tracing(config.log_dir.as_deref());

    eprintln!("cycle-planner v{}", env!("CARGO_PKG_VERSION"));
    eprintln!("   Backend: {}", config.api_url);
    eprintln!("   Database: {}", config.db_path.display());
    eprintln!("   Type 'help' for commands, 'quit' to exit.");

    let store: Arc<dyn Database> = Arc::new(
        LibSqlBackend::new_local(&config.db_path)
            .await
            .with_context(|| format!("Failed to open database at {}", config.db_path.display()))?,
    );
    let api: Arc<dyn PlannerApi> =
        Arc::new(HttpPlannerApi::new(&config).context("Invalid backend URL")?);

    let app = Arc::new(App::start(api, store, config.start_url.as_deref()).await);

    Shell::new(app).run().await.context("Failed to read from stdin")?;

    eprintln!("Bye.");
    Ok(())
}

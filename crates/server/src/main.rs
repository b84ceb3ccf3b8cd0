//! Cohort reminder daemon
//!
//! Headless entry point: loads configuration, opens the database, starts the
//! dispatch and purge schedulers, and runs until interrupted.

use cohort_server::context::{create_purge_scheduler, create_reminder_scheduler};
use cohort_server::AppContext;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging FIRST so we can see .env loading
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    // Load environment variables from .env file
    match dotenvy::dotenv() {
        Ok(path) => info!(path = %path.display(), "Loaded .env"),
        Err(e) => warn!(error = %e, "Could not load .env file"),
    }

    let config = cohort_infra::config::load()?;
    info!(db_path = %config.database.path, "Cohort server starting");

    let context = AppContext::new_with_config(config).await?;
    context.health_check().await?;

    let mut reminder_scheduler = if context.config.scheduler.enabled {
        Some(create_reminder_scheduler(&context).await?)
    } else {
        warn!("Dispatch loop disabled by configuration");
        None
    };
    let mut purge_scheduler = create_purge_scheduler(&context).await?;

    info!("Cohort server started");

    tokio::signal::ctrl_c().await?;
    info!("Shutdown signal received");

    if let Some(scheduler) = reminder_scheduler.as_mut() {
        if let Err(e) = scheduler.stop().await {
            error!(error = %e, "Failed to stop reminder scheduler cleanly");
        }
    }
    if let Err(e) = purge_scheduler.stop().await {
        error!(error = %e, "Failed to stop purge scheduler cleanly");
    }

    info!("Cohort server stopped");
    Ok(())
}

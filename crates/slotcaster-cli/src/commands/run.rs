use std::path::PathBuf;

use slotcaster_core::{Config, Coordinator, Dispatcher, Scheduler};
use tracing::info;
use tracing_subscriber::EnvFilter;

/// Start the long-lived dispatcher: reconcile once, keep timers live, run
/// the daily reset loop, and exit on ctrl-c.
pub async fn run(store: Option<PathBuf>) -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let config = Config::from_env()?;
    if !config.enabled() {
        // Deployment-time kill switch: BOT_TOKEN/CHANNEL_ID absent or DISABLED.
        info!("delivery disabled via BOT_TOKEN/CHANNEL_ID, not starting");
        return Ok(());
    }

    let store = super::open_store(store)?;
    let dispatcher = Dispatcher::new(
        store.clone(),
        super::engine::stdout_sender(),
        config.clone(),
    );
    let coordinator = Coordinator::new(Scheduler::new(store, dispatcher, config.clone()));

    let outcome = coordinator.reconcile_now().await?;
    info!(
        users = outcome.users_processed,
        timers = outcome.timers_scheduled,
        "initial reconcile complete"
    );

    let reset_timer = coordinator.spawn_daily_reset(config.reference_tz());

    tokio::signal::ctrl_c().await?;
    info!("shutting down");
    reset_timer.cancel();
    coordinator.scheduler().lock().await.clear_all();
    Ok(())
}

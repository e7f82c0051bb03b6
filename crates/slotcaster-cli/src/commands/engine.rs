use std::path::PathBuf;
use std::sync::Arc;

use clap::Subcommand;
use slotcaster_core::{
    Config, Coordinator, DeliverySender, Dispatcher, MessageRef, PrefStore, Scheduler,
};

#[derive(Subcommand)]
pub enum EngineAction {
    /// One-shot reconcile pass; prints the structured outcome as JSON
    Reconcile,
    /// Clear everything, wait out the grace period, reconcile, report
    Restart,
    /// Apply the daily reset (clears non-auto-apply selections)
    DailyReset,
    /// Print store statistics
    Status,
}

pub async fn run(
    store: Option<PathBuf>,
    action: EngineAction,
) -> Result<(), Box<dyn std::error::Error>> {
    let store = super::open_store(store)?;
    let config = Config::from_env()?;

    match action {
        EngineAction::Reconcile => {
            let coordinator = coordinator(store, config);
            let outcome = coordinator.reconcile_now().await?;
            println!("{}", serde_json::to_string_pretty(&outcome)?);
            Ok(())
        }
        EngineAction::Restart => {
            let coordinator = coordinator(store, config);
            // Populate first so the restart actually has something to clear.
            coordinator.reconcile_now().await?;
            let outcome = coordinator.restart_all().await?;
            println!("{}", serde_json::to_string_pretty(&outcome)?);
            Ok(())
        }
        EngineAction::DailyReset => {
            let coordinator = coordinator(store, config);
            let changed = coordinator.apply_daily_reset().await?;
            println!("cleared {changed} user selection(s)");
            Ok(())
        }
        EngineAction::Status => {
            let prefs = store.load();
            let selected: usize = prefs.values().map(|p| p.selected_slots.len()).sum();
            let paused = prefs.values().filter(|p| p.paused).count();
            let auto_apply = prefs.values().filter(|p| p.auto_apply).count();
            println!("users: {}", prefs.len());
            println!("selected slots: {selected}");
            println!("paused users: {paused}");
            println!("auto-apply users: {auto_apply}");
            println!("delivery enabled: {}", config.enabled());
            println!("reference timezone: {}", config.reference_tz());
            Ok(())
        }
    }
}

fn coordinator(store: PrefStore, config: Config) -> Coordinator {
    let dispatcher = Dispatcher::new(store.clone(), stdout_sender(), config.clone());
    Coordinator::new(Scheduler::new(store, dispatcher, config))
}

/// Delivery sender that prints to stdout. One-shot engine commands never
/// live long enough for a timer to fire; this is for symmetry with `run`.
pub fn stdout_sender() -> DeliverySender {
    Arc::new(|dest: &str, text: &str| {
        println!("[{dest}] {text}");
        Ok(MessageRef(format!("stdout-{}", chrono::Utc::now().timestamp_millis())))
    })
}

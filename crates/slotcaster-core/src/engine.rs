//! Scheduling engine: clear-then-rebuild reconciliation.
//!
//! `reconcile()` derives the full set of live timers from persisted
//! preferences. It always starts by clearing the entire registry -- every
//! reconciliation begins from zero live timers, which is what makes stale
//! or duplicate timers impossible. Incremental diffing was the historical
//! source of duplicate-notification defects and is deliberately not
//! attempted.

use std::sync::Arc;

use serde::Serialize;
use tracing::{info, warn};

use crate::config::Config;
use crate::dispatch::Dispatcher;
use crate::error::Result;
use crate::prefs::UserPreference;
use crate::registry::{TimerKey, TimerRegistry};
use crate::store::PrefStore;
use crate::{slots, timer, timezone};

/// Where in the reconcile pass a per-user failure occurred.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum ReconcilePhase {
    /// The user's timezone failed to parse.
    Timezone,
    /// A stored slot id is not in the catalog.
    Slot,
}

impl std::fmt::Display for ReconcilePhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ReconcilePhase::Timezone => write!(f, "timezone"),
            ReconcilePhase::Slot => write!(f, "slot"),
        }
    }
}

/// One isolated per-user failure. Reconciliation records these and moves
/// on; one user's bad data never blocks the others.
#[derive(Debug, Clone, Serialize)]
pub struct ReconcileFailure {
    pub user_id: String,
    pub slot_id: Option<String>,
    pub phase: ReconcilePhase,
    pub message: String,
}

/// Structured result of a reconcile pass.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ReconcileOutcome {
    /// Users with a non-empty selection that were processed.
    pub users_processed: usize,
    /// Users skipped because their selection is empty.
    pub users_skipped: usize,
    /// Timers created and registered (stopped ones included).
    pub timers_scheduled: usize,
    /// Per-user failures recorded during the pass.
    pub failures: Vec<ReconcileFailure>,
}

/// Owns the timer registry and rebuilds it from the preference store.
pub struct Scheduler {
    registry: TimerRegistry,
    store: PrefStore,
    dispatcher: Dispatcher,
    config: Config,
}

impl Scheduler {
    pub fn new(store: PrefStore, dispatcher: Dispatcher, config: Config) -> Self {
        Self {
            registry: TimerRegistry::new(),
            store,
            dispatcher,
            config,
        }
    }

    /// Rebuild every timer from the store.
    ///
    /// After this returns, the set of live (non-stopped) timers is exactly
    /// the set implied by `selected_slots`/`paused` for every user at the
    /// moment the store was read. Mutations racing with the pass are
    /// picked up by the next reconcile, not this one.
    pub fn reconcile(&mut self) -> Result<ReconcileOutcome> {
        self.registry.clear_all();

        let mut prefs = self.store.load();
        let mut outcome = ReconcileOutcome::default();

        for (user_id, pref) in prefs.iter_mut() {
            if pref.selected_slots.is_empty() {
                outcome.users_skipped += 1;
                continue;
            }

            // The registry was just cleared, so the persisted cache must be
            // too -- even when the user is then skipped for a bad timezone.
            pref.active_timer_ids.clear();

            let tz = match timezone::parse_tz(&pref.timezone) {
                Ok(tz) => tz,
                Err(e) => {
                    warn!(user_id = %user_id, timezone = %pref.timezone, "skipping user with bad timezone");
                    outcome.failures.push(ReconcileFailure {
                        user_id: user_id.clone(),
                        slot_id: None,
                        phase: ReconcilePhase::Timezone,
                        message: e.to_string(),
                    });
                    continue;
                }
            };

            for slot_id in pref.selected_slots.clone() {
                let Some(slot) = slots::find(&slot_id) else {
                    warn!(user_id = %user_id, slot_id = %slot_id, "skipping unknown slot");
                    outcome.failures.push(ReconcileFailure {
                        user_id: user_id.clone(),
                        slot_id: Some(slot_id.clone()),
                        phase: ReconcilePhase::Slot,
                        message: format!("slot '{slot_id}' is not in the catalog"),
                    });
                    continue;
                };

                // The warning rule's hour:minute is evaluated directly as
                // wall-clock time in the user's zone.
                let callback = {
                    let dispatcher = self.dispatcher.clone();
                    let user = user_id.clone();
                    let slot = slot_id.clone();
                    Arc::new(move || dispatcher.fire(&user, &slot)) as timer::FireCallback
                };
                let handle = timer::spawn_daily(slot.warning_rule(), tz, callback);
                if pref.paused {
                    // The timer exists but will not fire; resume is then a
                    // plain start.
                    handle.stop();
                }

                let key = TimerKey::early_warning(user_id.clone(), slot_id.clone());
                pref.active_timer_ids.push(key.to_string());
                self.registry.register(key, handle);
                outcome.timers_scheduled += 1;
            }
            outcome.users_processed += 1;
        }

        self.store.save(&prefs)?;
        info!(
            users = outcome.users_processed,
            skipped = outcome.users_skipped,
            timers = outcome.timers_scheduled,
            failures = outcome.failures.len(),
            "reconcile complete"
        );
        Ok(outcome)
    }

    /// Read-modify-write a single user record, creating it with the
    /// deployment default timezone on first interaction.
    pub fn update_user<F>(&self, user_id: &str, mutate: F) -> Result<UserPreference>
    where
        F: FnOnce(&mut UserPreference),
    {
        let mut prefs = self.store.load();
        let pref = prefs
            .entry(user_id.to_string())
            .or_insert_with(|| UserPreference::with_timezone(self.config.reference_tz().to_string()));
        mutate(pref);
        let updated = pref.clone();
        self.store.save(&prefs)?;
        Ok(updated)
    }

    /// Cancel every live timer without rebuilding.
    pub fn clear_all(&mut self) {
        self.registry.clear_all();
    }

    pub fn registry(&self) -> &TimerRegistry {
        &self.registry
    }

    pub fn store(&self) -> &PrefStore {
        &self.store
    }

    pub fn config(&self) -> &Config {
        &self.config
    }
}

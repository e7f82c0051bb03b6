//! Lifecycle coordination: debounced reconcile, full restart, daily reset.
//!
//! All mutation of the scheduler funnels through one `Arc<Mutex<_>>`, so
//! reconciliation never runs concurrently with itself. Bursts of reconcile
//! requests coalesce: a capacity-1 channel plus a quiet-interval worker
//! means N rapid requests produce one reconcile, or two when a request
//! lands while one is already in flight -- never zero and never N.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use tokio::sync::{mpsc, Mutex};
use tokio::time::Duration;
use tracing::{error, info};

use crate::engine::{ReconcileOutcome, Scheduler};
use crate::error::Result;
use crate::prefs::UserPreference;
use crate::timer::{self, DailyRule, TimerHandle};

/// Quiet interval before a debounced reconcile actually runs.
pub const DEBOUNCE_QUIET: Duration = Duration::from_millis(100);

/// Grace period in `restart_all` letting in-flight cancellations settle.
pub const RESTART_GRACE: Duration = Duration::from_millis(200);

/// Reference-timezone wall-clock time of the daily reset.
pub const DAILY_RESET_RULE: DailyRule = DailyRule { hour: 0, minute: 1 };

/// Serializes scheduler access and coalesces reconcile requests.
#[derive(Clone)]
pub struct Coordinator {
    scheduler: Arc<Mutex<Scheduler>>,
    reconcile_tx: mpsc::Sender<()>,
    debounced_runs: Arc<AtomicUsize>,
}

impl Coordinator {
    /// Wrap a scheduler and start the debounce worker.
    ///
    /// Must be called from within a tokio runtime.
    pub fn new(scheduler: Scheduler) -> Self {
        let scheduler = Arc::new(Mutex::new(scheduler));
        let (reconcile_tx, mut rx) = mpsc::channel::<()>(1);
        let debounced_runs = Arc::new(AtomicUsize::new(0));

        let worker = Arc::clone(&scheduler);
        let runs = Arc::clone(&debounced_runs);
        tokio::spawn(async move {
            while rx.recv().await.is_some() {
                // Absorb the burst: keep waiting while requests keep coming.
                loop {
                    tokio::time::sleep(DEBOUNCE_QUIET).await;
                    if rx.try_recv().is_err() {
                        break;
                    }
                }
                if let Err(e) = worker.lock().await.reconcile() {
                    error!(error = %e, "debounced reconcile failed");
                }
                runs.fetch_add(1, Ordering::SeqCst);
            }
        });

        Self {
            scheduler,
            reconcile_tx,
            debounced_runs,
        }
    }

    /// How many debounced reconcile passes the worker has completed.
    /// Direct [`reconcile_now`](Self::reconcile_now) calls are not counted.
    pub fn debounced_runs(&self) -> usize {
        self.debounced_runs.load(Ordering::SeqCst)
    }

    /// Request a reconcile. Returns immediately; bursts collapse into at
    /// most one pending run.
    pub fn request_reconcile(&self) {
        // A full channel means a run is already pending, which is exactly
        // the coalescing we want.
        let _ = self.reconcile_tx.try_send(());
    }

    /// Run a reconcile right now, bypassing the debounce.
    pub async fn reconcile_now(&self) -> Result<ReconcileOutcome> {
        self.scheduler.lock().await.reconcile()
    }

    /// Administrative full restart: cancel everything, wait for in-flight
    /// cancellations to settle, then rebuild directly.
    pub async fn restart_all(&self) -> Result<ReconcileOutcome> {
        {
            self.scheduler.lock().await.clear_all();
        }
        tokio::time::sleep(RESTART_GRACE).await;
        let outcome = self.scheduler.lock().await.reconcile()?;
        info!(
            timers = outcome.timers_scheduled,
            "full restart complete"
        );
        Ok(outcome)
    }

    /// Daily reset: clear the selection of every user without `auto_apply`
    /// (their `paused` flag is preserved), persist when anything changed,
    /// and request a debounced reconcile.
    ///
    /// Returns the number of users whose selection was cleared.
    pub async fn apply_daily_reset(&self) -> Result<usize> {
        let changed = {
            let scheduler = self.scheduler.lock().await;
            let mut prefs = scheduler.store().load();
            let changed = prefs
                .values_mut()
                .map(|pref| pref.apply_daily_reset())
                .filter(|&changed| changed)
                .count();
            if changed > 0 {
                scheduler.store().save(&prefs)?;
            }
            changed
        };
        if changed > 0 {
            info!(users = changed, "daily reset cleared selections");
            self.request_reconcile();
        }
        Ok(changed)
    }

    /// Spawn the once-a-day reset timer at [`DAILY_RESET_RULE`], evaluated
    /// in the reference timezone.
    pub fn spawn_daily_reset(&self, reference_tz: chrono_tz::Tz) -> TimerHandle {
        let coordinator = self.clone();
        timer::spawn_daily(
            DAILY_RESET_RULE,
            reference_tz,
            Arc::new(move || {
                let coordinator = coordinator.clone();
                tokio::spawn(async move {
                    if let Err(e) = coordinator.apply_daily_reset().await {
                        error!(error = %e, "daily reset failed");
                    }
                });
            }),
        )
    }

    /// Mutate one user's record and request a debounced reconcile.
    pub async fn update_user<F>(&self, user_id: &str, mutate: F) -> Result<UserPreference>
    where
        F: FnOnce(&mut UserPreference),
    {
        let updated = self.scheduler.lock().await.update_user(user_id, mutate)?;
        self.request_reconcile();
        Ok(updated)
    }

    /// Access the underlying scheduler (status queries, tests).
    pub fn scheduler(&self) -> &Arc<Mutex<Scheduler>> {
        &self.scheduler
    }
}

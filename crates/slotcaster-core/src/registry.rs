//! Process-wide timer registry.
//!
//! Pure infrastructure plumbing for timer lifetime: a keyed collection of
//! live handles with bulk clear and per-key stop/start/cancel. Holds no
//! business data and is owned by the [`crate::engine::Scheduler`], never a
//! module-level global.

use std::collections::BTreeMap;
use std::fmt;

use tracing::{debug, info, warn};

use crate::timer::TimerHandle;

/// The notification kind a timer represents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum TimerKind {
    /// Fires 5 minutes before a slot's canonical time. The only kind
    /// currently implemented.
    EarlyWarning,
}

impl fmt::Display for TimerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TimerKind::EarlyWarning => write!(f, "early-warning"),
        }
    }
}

/// Composite registry key: `(user, slot, kind)`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct TimerKey {
    pub user_id: String,
    pub slot_id: String,
    pub kind: TimerKind,
}

impl TimerKey {
    pub fn early_warning(user_id: impl Into<String>, slot_id: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            slot_id: slot_id.into(),
            kind: TimerKind::EarlyWarning,
        }
    }
}

impl fmt::Display for TimerKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}", self.user_id, self.slot_id, self.kind)
    }
}

/// Collection of live timer handles.
#[derive(Debug, Default)]
pub struct TimerRegistry {
    entries: BTreeMap<TimerKey, TimerHandle>,
}

impl TimerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a handle under `key`. A replaced handle is cancelled first
    /// so at most one live timer ever exists per key.
    pub fn register(&mut self, key: TimerKey, handle: TimerHandle) {
        if let Some(old) = self.entries.insert(key.clone(), handle) {
            warn!(%key, "replacing existing timer, cancelling the old handle");
            old.cancel();
        }
    }

    /// Cancel and remove every entry. Each cancellation is isolated: one
    /// failing handle never prevents the rest from being cleared.
    pub fn clear_all(&mut self) {
        let entries = std::mem::take(&mut self.entries);
        let total = entries.len();
        let mut cancelled = 0usize;
        for (key, handle) in entries {
            handle.cancel();
            cancelled += 1;
            debug!(%key, "timer cancelled");
        }
        info!(total, cancelled, "timer registry cleared");
    }

    /// Stop (pause) the timer under `key` without removing it.
    pub fn stop(&self, key: &TimerKey) -> bool {
        match self.entries.get(key) {
            Some(handle) => {
                handle.stop();
                true
            }
            None => false,
        }
    }

    /// Restart a stopped timer.
    pub fn start(&self, key: &TimerKey) -> bool {
        match self.entries.get(key) {
            Some(handle) => {
                handle.start();
                true
            }
            None => false,
        }
    }

    /// Cancel and remove a single entry.
    pub fn cancel(&mut self, key: &TimerKey) -> bool {
        match self.entries.remove(key) {
            Some(handle) => {
                handle.cancel();
                true
            }
            None => false,
        }
    }

    /// Whether the timer under `key` exists and is stopped.
    pub fn is_stopped(&self, key: &TimerKey) -> Option<bool> {
        self.entries.get(key).map(|h| h.is_stopped())
    }

    pub fn contains(&self, key: &TimerKey) -> bool {
        self.entries.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn keys(&self) -> impl Iterator<Item = &TimerKey> {
        self.entries.keys()
    }

    /// All keys belonging to one user.
    pub fn keys_for_user(&self, user_id: &str) -> Vec<TimerKey> {
        self.entries
            .keys()
            .filter(|k| k.user_id == user_id)
            .cloned()
            .collect()
    }
}

impl Drop for TimerRegistry {
    fn drop(&mut self) {
        for handle in self.entries.values() {
            handle.cancel();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::timer::{spawn_daily, DailyRule};
    use chrono_tz::UTC;
    use std::sync::Arc;

    fn dummy_handle() -> TimerHandle {
        spawn_daily(DailyRule::new(0, 0), UTC, Arc::new(|| {}))
    }

    #[test]
    fn key_canonical_form() {
        let key = TimerKey::early_warning("u1", "18:00");
        assert_eq!(key.to_string(), "u1:18:00:early-warning");
    }

    #[tokio::test]
    async fn register_replaces_duplicate_key() {
        let mut registry = TimerRegistry::new();
        let key = TimerKey::early_warning("u1", "18:00");
        registry.register(key.clone(), dummy_handle());
        registry.register(key.clone(), dummy_handle());
        assert_eq!(registry.len(), 1);
    }

    #[tokio::test]
    async fn clear_all_empties_the_registry() {
        let mut registry = TimerRegistry::new();
        registry.register(TimerKey::early_warning("u1", "18:00"), dummy_handle());
        registry.register(TimerKey::early_warning("u2", "21:00"), dummy_handle());
        registry.clear_all();
        assert!(registry.is_empty());
    }

    #[tokio::test]
    async fn stop_and_start_toggle_without_removal() {
        let mut registry = TimerRegistry::new();
        let key = TimerKey::early_warning("u1", "18:00");
        registry.register(key.clone(), dummy_handle());

        assert!(registry.stop(&key));
        assert_eq!(registry.is_stopped(&key), Some(true));
        assert!(registry.contains(&key));

        assert!(registry.start(&key));
        assert_eq!(registry.is_stopped(&key), Some(false));
    }

    #[tokio::test]
    async fn operations_on_missing_keys_report_false() {
        let mut registry = TimerRegistry::new();
        let key = TimerKey::early_warning("ghost", "18:00");
        assert!(!registry.stop(&key));
        assert!(!registry.start(&key));
        assert!(!registry.cancel(&key));
        assert_eq!(registry.is_stopped(&key), None);
    }

    #[tokio::test]
    async fn keys_for_user_filters_by_user() {
        let mut registry = TimerRegistry::new();
        registry.register(TimerKey::early_warning("u1", "18:00"), dummy_handle());
        registry.register(TimerKey::early_warning("u1", "21:00"), dummy_handle());
        registry.register(TimerKey::early_warning("u2", "18:00"), dummy_handle());
        assert_eq!(registry.keys_for_user("u1").len(), 2);
        assert_eq!(registry.keys_for_user("u2").len(), 1);
        assert!(registry.keys_for_user("u3").is_empty());
    }
}

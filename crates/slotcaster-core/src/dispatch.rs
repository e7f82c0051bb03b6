//! Notification dispatch: the callback behind every fired timer.
//!
//! Dispatch never trusts the state a timer was created from. Preferences
//! are reloaded fresh at fire time so a pause or deselection that happened
//! after the timer was built still suppresses delivery. Delivery failures
//! are classified, logged per category, and swallowed: notifications are
//! advisory and at-most-once by design.

use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::config::Config;
use crate::error::DeliveryError;
use crate::prefs::UserPreference;
use crate::store::PrefStore;
use crate::{slots, timezone};

/// Opaque reference to a delivered message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageRef(pub String);

/// The external delivery capability: send `text` to `destination`.
pub type DeliverySender =
    Arc<dyn Fn(&str, &str) -> Result<MessageRef, DeliveryError> + Send + Sync>;

/// Composes and delivers slot notifications.
#[derive(Clone)]
pub struct Dispatcher {
    store: PrefStore,
    sender: DeliverySender,
    config: Config,
}

impl Dispatcher {
    pub fn new(store: PrefStore, sender: DeliverySender, config: Config) -> Self {
        Self {
            store,
            sender,
            config,
        }
    }

    /// Fire the early warning for `(user_id, slot_id)`.
    ///
    /// Invoked only from a timer task. Reloads preferences, re-checks the
    /// pause flag and the selection, converts the slot's canonical time
    /// into the user's current timezone, and hands the composed text to the
    /// delivery sender addressed at the shared broadcast destination.
    ///
    /// The reload is blocking file I/O on the timer task; if the store
    /// outgrows a single small JSON file, move the fire path onto
    /// `tokio::task::spawn_blocking`.
    pub fn fire(&self, user_id: &str, slot_id: &str) {
        let prefs = self.store.load();
        let Some(pref) = prefs.get(user_id) else {
            debug!(user_id, slot_id, "no preference record at fire time, skipping");
            return;
        };
        if pref.paused {
            debug!(user_id, slot_id, "user paused at fire time, skipping");
            return;
        }
        if !pref.selected_slots.contains(slot_id) {
            debug!(user_id, slot_id, "slot deselected at fire time, skipping");
            return;
        }
        let Some(slot) = slots::find(slot_id) else {
            warn!(user_id, slot_id, "fired timer references unknown slot");
            return;
        };
        let Some(channel) = self.config.channel_id.as_deref() else {
            warn!(user_id, slot_id, "delivery disabled, dropping notification");
            return;
        };

        let text = self.compose(user_id, pref, slot);
        match (self.sender)(channel, &text) {
            Ok(msg) => {
                info!(user_id, slot_id, message_ref = %msg.0, "notification delivered");
            }
            Err(e) => {
                // Classified, logged, never retried, never propagated.
                warn!(
                    user_id,
                    slot_id,
                    category = e.category(),
                    error = %e,
                    "notification delivery failed"
                );
            }
        }
    }

    /// Build the message text: converted slot time, the user's current
    /// local clock, and their timezone name.
    fn compose(&self, user_id: &str, pref: &UserPreference, slot: &slots::NotificationSlot) -> String {
        let reference = self.config.reference_tz();
        let user_tz = timezone::parse_tz(&pref.timezone).unwrap_or(reference);
        let today = timezone::today_in(reference);
        let (hour, minute) =
            timezone::convert(slot.hour, slot.minute, reference, user_tz, today)
                .unwrap_or((slot.hour, slot.minute));
        let now = timezone::now_in(user_tz);
        format!(
            "@{user_id} heads-up: the {label} slot starts at {hour:02}:{minute:02} your time \
             (in {offset} minutes). Your clock: {now_hm} ({tz}).",
            label = slot.label,
            offset = slots::WARNING_OFFSET_MIN,
            now_hm = now.format("%H:%M"),
            tz = user_tz,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::PrefMap;
    use std::sync::Mutex;

    /// Sender that records every (destination, text) pair.
    fn recording_sender(log: Arc<Mutex<Vec<(String, String)>>>) -> DeliverySender {
        Arc::new(move |dest: &str, text: &str| {
            log.lock().unwrap().push((dest.to_string(), text.to_string()));
            Ok(MessageRef("m1".to_string()))
        })
    }

    fn test_config() -> Config {
        Config {
            token: Some("t".to_string()),
            channel_id: Some("broadcast".to_string()),
            ..Config::default()
        }
    }

    fn store_with(user_id: &str, pref: UserPreference) -> (PrefStore, tempfile::TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let store = PrefStore::with_path(dir.path().join("prefs.json"));
        let mut map = PrefMap::new();
        map.insert(user_id.to_string(), pref);
        store.save(&map).unwrap();
        (store, dir)
    }

    #[test]
    fn fire_delivers_to_broadcast_destination() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let mut pref = UserPreference::with_timezone("UTC");
        pref.selected_slots.insert("18:00".to_string());
        let (store, _dir) = store_with("u1", pref);
        let dispatcher = Dispatcher::new(store, recording_sender(log.clone()), test_config());

        dispatcher.fire("u1", "18:00");

        let sent = log.lock().unwrap();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].0, "broadcast");
        assert!(sent[0].1.contains("@u1"));
        assert!(sent[0].1.contains("18:00"));
        // 18:00 Bangkok is 11:00 UTC.
        assert!(sent[0].1.contains("11:00"));
        assert!(sent[0].1.contains("UTC"));
    }

    #[test]
    fn fire_is_suppressed_while_paused() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let mut pref = UserPreference::default();
        pref.selected_slots.insert("18:00".to_string());
        pref.paused = true;
        let (store, _dir) = store_with("u1", pref);
        let dispatcher = Dispatcher::new(store, recording_sender(log.clone()), test_config());

        dispatcher.fire("u1", "18:00");
        assert!(log.lock().unwrap().is_empty());
    }

    #[test]
    fn fire_is_suppressed_after_deselection() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let mut pref = UserPreference::default();
        pref.selected_slots.insert("21:00".to_string());
        let (store, _dir) = store_with("u1", pref);
        let dispatcher = Dispatcher::new(store, recording_sender(log.clone()), test_config());

        // The 18:00 timer fires, but the user only has 21:00 selected now.
        dispatcher.fire("u1", "18:00");
        assert!(log.lock().unwrap().is_empty());
    }

    #[test]
    fn fire_for_unknown_user_is_a_no_op() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let (store, _dir) = store_with("u1", UserPreference::default());
        let dispatcher = Dispatcher::new(store, recording_sender(log.clone()), test_config());
        dispatcher.fire("ghost", "18:00");
        assert!(log.lock().unwrap().is_empty());
    }

    #[test]
    fn delivery_failures_are_swallowed() {
        let mut pref = UserPreference::default();
        pref.selected_slots.insert("18:00".to_string());
        let failing: DeliverySender = Arc::new(|dest: &str, _text: &str| {
            Err(DeliveryError::PermissionDenied(dest.to_string()))
        });
        let (store, _dir) = store_with("u1", pref);
        let dispatcher = Dispatcher::new(store, failing, test_config());
        // Must not panic or propagate.
        dispatcher.fire("u1", "18:00");
    }

    #[test]
    fn error_categories_are_distinct() {
        assert_eq!(
            DeliveryError::PermissionDenied("c".into()).category(),
            "permission-denied"
        );
        assert_eq!(
            DeliveryError::DestinationNotFound("c".into()).category(),
            "not-found"
        );
        assert_eq!(
            DeliveryError::AccessRevoked("c".into()).category(),
            "access-revoked"
        );
        assert_eq!(DeliveryError::Other("x".into()).category(), "other");
    }
}

//! Per-user notification preferences.
//!
//! One record per user id, created lazily on first interaction and never
//! destroyed -- bulk clears reset fields to empty instead of removing the
//! record. Interactive edits stage into `pending_slots` and only reach
//! `selected_slots` on commit.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

/// Fallback timezone for records that never chose one.
pub const DEFAULT_TIMEZONE: &str = "Asia/Bangkok";

/// A user's notification preferences.
///
/// Field names on the wire follow the persistence schema
/// (`times`, `autoApply`, `paused`, `timezone`, `scheduledJobs`,
/// `lastSetupMessageId`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct UserPreference {
    /// Slot labels the user wants notified for.
    #[serde(rename = "times")]
    pub selected_slots: BTreeSet<String>,

    /// Staging copy of the selection during interactive editing.
    /// `Some` means the user is mid-edit; absent otherwise.
    #[serde(rename = "pendingTimes", skip_serializing_if = "Option::is_none")]
    pub pending_slots: Option<BTreeSet<String>>,

    /// Whether the selection survives the daily reset.
    #[serde(rename = "autoApply")]
    pub auto_apply: bool,

    /// Suppresses delivery and stops timers without discarding the selection.
    pub paused: bool,

    /// IANA timezone identifier for display conversion and timer evaluation.
    pub timezone: String,

    /// Registry keys of this user's live timers. Derived cache, rebuilt on
    /// every reconciliation -- never a source of truth.
    #[serde(rename = "scheduledJobs")]
    pub active_timer_ids: Vec<String>,

    /// Opaque reference to the most recent interactive prompt, used to
    /// retract stale prompts.
    #[serde(rename = "lastSetupMessageId")]
    pub last_prompt_ref: Option<String>,
}

impl Default for UserPreference {
    fn default() -> Self {
        Self {
            selected_slots: BTreeSet::new(),
            pending_slots: None,
            auto_apply: false,
            paused: false,
            timezone: DEFAULT_TIMEZONE.to_string(),
            active_timer_ids: Vec::new(),
            last_prompt_ref: None,
        }
    }
}

impl UserPreference {
    /// New record with an explicit timezone (the deployment default).
    pub fn with_timezone(timezone: impl Into<String>) -> Self {
        Self {
            timezone: timezone.into(),
            ..Self::default()
        }
    }

    /// True while an interactive edit is staged.
    pub fn is_editing(&self) -> bool {
        self.pending_slots.is_some()
    }

    /// Stage a slot into the pending selection, starting an edit from the
    /// committed selection if none is in progress. Returns false if the
    /// slot was already staged.
    pub fn stage_slot(&mut self, slot_id: &str) -> bool {
        self.pending_slots
            .get_or_insert_with(|| self.selected_slots.clone())
            .insert(slot_id.to_string())
    }

    /// Remove a slot from the pending selection. Returns false if it was
    /// not staged.
    pub fn unstage_slot(&mut self, slot_id: &str) -> bool {
        self.pending_slots
            .get_or_insert_with(|| self.selected_slots.clone())
            .remove(slot_id)
    }

    /// Commit the pending selection. Returns false when no edit was staged.
    pub fn commit_pending(&mut self) -> bool {
        match self.pending_slots.take() {
            Some(pending) => {
                self.selected_slots = pending;
                true
            }
            None => false,
        }
    }

    /// Abandon a staged edit without touching the committed selection.
    pub fn discard_pending(&mut self) -> bool {
        self.pending_slots.take().is_some()
    }

    /// Flip the pause flag. Returns whether the value changed.
    pub fn set_paused(&mut self, paused: bool) -> bool {
        if self.paused == paused {
            return false;
        }
        self.paused = paused;
        true
    }

    pub fn set_timezone(&mut self, timezone: impl Into<String>) {
        self.timezone = timezone.into();
    }

    /// The stop command: clear the selection and reset the flags, keeping
    /// the record itself.
    pub fn stop(&mut self) {
        self.selected_slots.clear();
        self.pending_slots = None;
        self.auto_apply = false;
        self.paused = false;
        self.active_timer_ids.clear();
    }

    /// Daily reset: clear the selection unless `auto_apply` is set.
    /// `paused` is preserved either way. Returns whether anything changed.
    pub fn apply_daily_reset(&mut self) -> bool {
        if self.auto_apply || self.selected_slots.is_empty() {
            return false;
        }
        self.selected_slots.clear();
        self.active_timer_ids.clear();
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_record_matches_lazy_creation_contract() {
        let pref = UserPreference::default();
        assert!(pref.selected_slots.is_empty());
        assert!(!pref.auto_apply);
        assert!(!pref.paused);
        assert!(!pref.is_editing());
        assert_eq!(pref.timezone, DEFAULT_TIMEZONE);
    }

    #[test]
    fn staging_starts_from_committed_selection() {
        let mut pref = UserPreference::default();
        pref.selected_slots.insert("18:00".to_string());

        assert!(pref.stage_slot("21:00"));
        assert!(pref.is_editing());
        // Committed selection untouched until commit.
        assert_eq!(pref.selected_slots.len(), 1);

        assert!(pref.commit_pending());
        assert!(!pref.is_editing());
        assert_eq!(pref.selected_slots.len(), 2);
    }

    #[test]
    fn unstage_and_discard() {
        let mut pref = UserPreference::default();
        pref.selected_slots.insert("18:00".to_string());

        assert!(pref.unstage_slot("18:00"));
        assert!(pref.discard_pending());
        // Discard left the committed selection alone.
        assert!(pref.selected_slots.contains("18:00"));
        assert!(!pref.commit_pending());
    }

    #[test]
    fn duplicate_staging_is_a_no_op() {
        let mut pref = UserPreference::default();
        assert!(pref.stage_slot("18:00"));
        assert!(!pref.stage_slot("18:00"));
    }

    #[test]
    fn stop_clears_everything_but_keeps_timezone() {
        let mut pref = UserPreference::with_timezone("Europe/London");
        pref.selected_slots.insert("18:00".to_string());
        pref.auto_apply = true;
        pref.paused = true;
        pref.active_timer_ids.push("u:18:00:early-warning".to_string());

        pref.stop();
        assert!(pref.selected_slots.is_empty());
        assert!(!pref.auto_apply);
        assert!(!pref.paused);
        assert!(pref.active_timer_ids.is_empty());
        assert_eq!(pref.timezone, "Europe/London");
    }

    #[test]
    fn daily_reset_respects_auto_apply_and_preserves_paused() {
        let mut keeper = UserPreference::default();
        keeper.selected_slots.insert("18:00".to_string());
        keeper.auto_apply = true;
        keeper.paused = true;
        assert!(!keeper.apply_daily_reset());
        assert!(keeper.selected_slots.contains("18:00"));
        assert!(keeper.paused);

        let mut loser = UserPreference::default();
        loser.selected_slots.insert("18:00".to_string());
        loser.paused = true;
        assert!(loser.apply_daily_reset());
        assert!(loser.selected_slots.is_empty());
        assert!(loser.paused);
    }

    #[test]
    fn wire_schema_uses_camel_case_names() {
        let mut pref = UserPreference::default();
        pref.selected_slots.insert("18:00".to_string());
        pref.auto_apply = true;
        let json = serde_json::to_string(&pref).unwrap();
        assert!(json.contains("\"times\""));
        assert!(json.contains("\"autoApply\""));
        assert!(json.contains("\"scheduledJobs\""));
        assert!(json.contains("\"lastSetupMessageId\""));
        // pendingTimes is absent when not editing.
        assert!(!json.contains("pendingTimes"));

        let back: UserPreference = serde_json::from_str(&json).unwrap();
        assert_eq!(back, pref);
    }

    #[test]
    fn partial_records_deserialize_with_defaults() {
        let pref: UserPreference = serde_json::from_str(r#"{"times":["18:00"]}"#).unwrap();
        assert!(pref.selected_slots.contains("18:00"));
        assert!(!pref.paused);
        assert_eq!(pref.timezone, DEFAULT_TIMEZONE);
    }
}

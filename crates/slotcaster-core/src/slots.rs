//! Static notification-slot catalog.
//!
//! Sixteen fixed daily slots, 90 minutes apart, covering 24 hours exactly
//! once each. Slot times are canonical wall-clock times in the reference
//! timezone (see [`crate::config::Config::reference_tz`]); the early-warning
//! trigger for each slot fires a fixed 5 minutes before its canonical time.

use crate::timer::DailyRule;

/// Minutes between the early warning and the slot's canonical time.
pub const WARNING_OFFSET_MIN: u32 = 5;

/// Minutes between consecutive slots.
pub const SLOT_SPACING_MIN: u32 = 90;

/// One fixed daily notification time point.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NotificationSlot {
    /// Display label, also the slot's identifier ("18:00").
    pub label: &'static str,
    /// Canonical hour in the reference timezone.
    pub hour: u32,
    /// Canonical minute in the reference timezone.
    pub minute: u32,
}

impl NotificationSlot {
    /// Daily trigger for the early warning: 5 minutes before the canonical
    /// time, wrapping across midnight for the 00:00 slot.
    pub fn warning_rule(&self) -> DailyRule {
        let total = (self.hour * 60 + self.minute + 24 * 60 - WARNING_OFFSET_MIN) % (24 * 60);
        DailyRule::new(total / 60, total % 60)
    }

    /// The warning trigger rendered as a 5-field cron expression
    /// ("55 17 * * *" for the 18:00 slot).
    pub fn cron_rule(&self) -> String {
        self.warning_rule().cron()
    }
}

/// The immutable slot catalog.
pub const SLOTS: [NotificationSlot; 16] = [
    NotificationSlot { label: "00:00", hour: 0, minute: 0 },
    NotificationSlot { label: "01:30", hour: 1, minute: 30 },
    NotificationSlot { label: "03:00", hour: 3, minute: 0 },
    NotificationSlot { label: "04:30", hour: 4, minute: 30 },
    NotificationSlot { label: "06:00", hour: 6, minute: 0 },
    NotificationSlot { label: "07:30", hour: 7, minute: 30 },
    NotificationSlot { label: "09:00", hour: 9, minute: 0 },
    NotificationSlot { label: "10:30", hour: 10, minute: 30 },
    NotificationSlot { label: "12:00", hour: 12, minute: 0 },
    NotificationSlot { label: "13:30", hour: 13, minute: 30 },
    NotificationSlot { label: "15:00", hour: 15, minute: 0 },
    NotificationSlot { label: "16:30", hour: 16, minute: 30 },
    NotificationSlot { label: "18:00", hour: 18, minute: 0 },
    NotificationSlot { label: "19:30", hour: 19, minute: 30 },
    NotificationSlot { label: "21:00", hour: 21, minute: 0 },
    NotificationSlot { label: "22:30", hour: 22, minute: 30 },
];

/// Look up a slot by its label.
pub fn find(label: &str) -> Option<&'static NotificationSlot> {
    SLOTS.iter().find(|s| s.label == label)
}

/// All slot labels in catalog order.
pub fn labels() -> impl Iterator<Item = &'static str> {
    SLOTS.iter().map(|s| s.label)
}

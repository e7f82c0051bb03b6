//! # Slotcaster Core Library
//!
//! Core business logic for Slotcaster, a scheduled-notification dispatcher
//! for a fixed catalog of sixteen daily time slots with per-user timezone
//! translation and a pause/auto-apply lifecycle. The CLI binary is a thin
//! layer over this library.
//!
//! ## Architecture
//!
//! - **Slot catalog**: sixteen immutable slots, 90 minutes apart, with a
//!   5-minute early-warning trigger each
//! - **Preference store**: one JSON document mapping user ids to records
//! - **Scheduling engine**: clear-then-rebuild reconciliation from the
//!   store into a registry of live tokio timers
//! - **Dispatch**: fire-time pause re-check, timezone conversion, and
//!   best-effort delivery through an injected sender
//! - **Lifecycle**: debounced reconcile coalescing, full restart, and the
//!   daily selection reset
//!
//! ## Key Components
//!
//! - [`Scheduler`]: owns the timer registry and performs reconciliation
//! - [`Coordinator`]: serializes scheduler access and debounces requests
//! - [`Dispatcher`]: composes and delivers notifications
//! - [`PrefStore`]: preference persistence

pub mod config;
pub mod dispatch;
pub mod engine;
pub mod error;
pub mod lifecycle;
pub mod prefs;
pub mod registry;
pub mod slots;
pub mod store;
pub mod timer;
pub mod timezone;

pub use config::Config;
pub use dispatch::{DeliverySender, Dispatcher, MessageRef};
pub use engine::{ReconcileFailure, ReconcileOutcome, ReconcilePhase, Scheduler};
pub use error::{ConfigError, CoreError, DeliveryError, ScheduleError, StoreError};
pub use lifecycle::Coordinator;
pub use prefs::UserPreference;
pub use registry::{TimerKey, TimerKind, TimerRegistry};
pub use slots::{NotificationSlot, SLOTS};
pub use store::{PrefMap, PrefStore};
pub use timer::{DailyRule, TimerHandle};

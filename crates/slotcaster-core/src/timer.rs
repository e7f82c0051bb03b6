//! Recurring daily timer primitive.
//!
//! Each timer is one spawned tokio task that sleeps until the next
//! occurrence of its wall-clock trigger in a named timezone, fires its
//! callback, and repeats. Handles support `stop` (the task keeps running
//! but skips firing), `start`, and `cancel` (aborts the task).

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use chrono::{DateTime, Duration, TimeZone, Utc};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use tokio::task::JoinHandle;
use tracing::{debug, trace};

use crate::error::ScheduleError;

/// Callback invoked from the timer task each time the timer fires.
pub type FireCallback = Arc<dyn Fn() + Send + Sync>;

/// A daily wall-clock trigger (the `minute hour * * *` cron form).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DailyRule {
    pub hour: u32,
    pub minute: u32,
}

impl DailyRule {
    pub fn new(hour: u32, minute: u32) -> Self {
        Self { hour, minute }
    }

    /// Parse a 5-field cron expression. Only the daily form is supported:
    /// day, month and weekday must all be `*`.
    pub fn parse(expr: &str) -> Result<Self, ScheduleError> {
        let fields: Vec<&str> = expr.split_whitespace().collect();
        let [minute, hour, dom, month, dow] = fields.as_slice() else {
            return Err(ScheduleError::InvalidRule(expr.to_string()));
        };
        if *dom != "*" || *month != "*" || *dow != "*" {
            return Err(ScheduleError::InvalidRule(expr.to_string()));
        }
        let minute: u32 = minute
            .parse()
            .map_err(|_| ScheduleError::InvalidRule(expr.to_string()))?;
        let hour: u32 = hour
            .parse()
            .map_err(|_| ScheduleError::InvalidRule(expr.to_string()))?;
        if hour > 23 || minute > 59 {
            return Err(ScheduleError::InvalidRule(expr.to_string()));
        }
        Ok(Self { hour, minute })
    }

    /// Render back to the 5-field cron form.
    pub fn cron(&self) -> String {
        format!("{} {} * * *", self.minute, self.hour)
    }

    /// The next instant strictly after `after` at which this rule's
    /// wall-clock time occurs in `tz`.
    ///
    /// A wall time erased by a DST spring-forward gap is skipped to the
    /// next day it exists; an ambiguous (fall-back) time resolves to the
    /// earliest instant.
    pub fn next_occurrence(&self, tz: Tz, after: DateTime<Utc>) -> DateTime<Utc> {
        let local_date = after.with_timezone(&tz).date_naive();
        for day in 0..3 {
            let date = local_date + Duration::days(day);
            let Some(naive) = date.and_hms_opt(self.hour, self.minute, 0) else {
                continue;
            };
            if let Some(local) = tz.from_local_datetime(&naive).earliest() {
                let instant = local.with_timezone(&Utc);
                if instant > after {
                    return instant;
                }
            }
        }
        // Unreachable for a valid rule; keep the task alive regardless.
        after + Duration::days(1)
    }
}

impl std::fmt::Display for DailyRule {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "daily at {:02}:{:02}", self.hour, self.minute)
    }
}

/// Handle to a live recurring timer.
///
/// `stop()` pauses firing without destroying the task so `start()` is a
/// cheap flag flip; `cancel()` aborts the task permanently.
#[derive(Debug)]
pub struct TimerHandle {
    stopped: Arc<AtomicBool>,
    task: JoinHandle<()>,
}

impl TimerHandle {
    pub fn stop(&self) {
        self.stopped.store(true, Ordering::SeqCst);
    }

    pub fn start(&self) {
        self.stopped.store(false, Ordering::SeqCst);
    }

    pub fn is_stopped(&self) -> bool {
        self.stopped.load(Ordering::SeqCst)
    }

    /// Permanently remove the timer. Safe to call more than once.
    pub fn cancel(&self) {
        self.task.abort();
    }
}

/// Spawn a recurring timer firing at `rule`'s wall-clock time in `tz`.
///
/// The rule's hour:minute is interpreted directly as wall-clock time in
/// `tz` -- no cross-timezone conversion happens here.
pub fn spawn_daily(rule: DailyRule, tz: Tz, callback: FireCallback) -> TimerHandle {
    let stopped = Arc::new(AtomicBool::new(false));
    let flag = Arc::clone(&stopped);
    let task = tokio::spawn(async move {
        loop {
            let now = Utc::now();
            let next = rule.next_occurrence(tz, now);
            let wait = (next - now).to_std().unwrap_or_default();
            trace!(%rule, %tz, next = %next, "timer sleeping");
            tokio::time::sleep(wait).await;
            if flag.load(Ordering::SeqCst) {
                debug!(%rule, %tz, "timer stopped, skipping fire");
                continue;
            }
            callback();
        }
    });
    TimerHandle { stopped, task }
}

/// [`spawn_daily`] for callers holding the cron form of the rule.
pub fn spawn_daily_cron(
    expr: &str,
    tz: Tz,
    callback: FireCallback,
) -> Result<TimerHandle, ScheduleError> {
    Ok(spawn_daily(DailyRule::parse(expr)?, tz, callback))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Timelike;
    use chrono_tz::{America::New_York, Asia::Bangkok, UTC};

    fn utc(y: i32, mo: u32, d: u32, h: u32, mi: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, mo, d, h, mi, 0).unwrap()
    }

    #[test]
    fn parse_accepts_daily_form() {
        let rule = DailyRule::parse("55 17 * * *").unwrap();
        assert_eq!(rule, DailyRule::new(17, 55));
        assert_eq!(rule.cron(), "55 17 * * *");
    }

    #[test]
    fn parse_rejects_non_daily_and_out_of_range() {
        assert!(DailyRule::parse("0 0 1 * *").is_err());
        assert!(DailyRule::parse("0 24 * * *").is_err());
        assert!(DailyRule::parse("60 0 * * *").is_err());
        assert!(DailyRule::parse("not a rule").is_err());
    }

    #[test]
    fn next_occurrence_same_day_when_still_ahead() {
        let rule = DailyRule::new(17, 55);
        let next = rule.next_occurrence(UTC, utc(2024, 6, 1, 10, 0));
        assert_eq!(next, utc(2024, 6, 1, 17, 55));
    }

    #[test]
    fn next_occurrence_rolls_to_tomorrow_when_passed() {
        let rule = DailyRule::new(17, 55);
        let next = rule.next_occurrence(UTC, utc(2024, 6, 1, 18, 0));
        assert_eq!(next, utc(2024, 6, 2, 17, 55));
    }

    #[test]
    fn next_occurrence_is_wall_clock_in_zone() {
        // 17:55 Bangkok is UTC+7, so 10:55 UTC.
        let rule = DailyRule::new(17, 55);
        let next = rule.next_occurrence(Bangkok, utc(2024, 6, 1, 0, 0));
        assert_eq!(next, utc(2024, 6, 1, 10, 55));
    }

    #[test]
    fn next_occurrence_skips_spring_forward_gap() {
        // 2024-03-10 02:30 does not exist in America/New_York.
        let rule = DailyRule::new(2, 30);
        let after = utc(2024, 3, 10, 5, 0); // just before the 07:00 UTC gap
        let next = rule.next_occurrence(New_York, after);
        let local = next.with_timezone(&New_York);
        assert_eq!(local.date_naive().to_string(), "2024-03-11");
        assert_eq!((local.hour(), local.minute()), (2, 30));
    }

    #[test]
    fn exact_boundary_is_strictly_after() {
        let rule = DailyRule::new(12, 0);
        let next = rule.next_occurrence(UTC, utc(2024, 6, 1, 12, 0));
        assert_eq!(next, utc(2024, 6, 2, 12, 0));
    }

    #[tokio::test]
    async fn cron_entry_point_validates_the_rule() {
        let handle = spawn_daily_cron("55 17 * * *", UTC, Arc::new(|| {})).unwrap();
        handle.cancel();
        assert!(spawn_daily_cron("55 17 1 * *", UTC, Arc::new(|| {})).is_err());
    }

    #[tokio::test]
    async fn handle_stop_start_toggles_flag() {
        let handle = spawn_daily(DailyRule::new(0, 0), UTC, Arc::new(|| {}));
        assert!(!handle.is_stopped());
        handle.stop();
        assert!(handle.is_stopped());
        handle.start();
        assert!(!handle.is_stopped());
        handle.cancel();
    }
}

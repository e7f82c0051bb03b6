//! Timezone-aware wall-clock conversion.
//!
//! Conversion always constructs a concrete calendar-date-and-time in the
//! source zone and reprojects it into the target zone. Raw integer offset
//! arithmetic is never correct here: some zones sit at 30/45-minute offsets
//! and DST moves the offset mid-year.

use chrono::{DateTime, NaiveDate, TimeZone, Timelike, Utc};
use chrono_tz::Tz;

use crate::error::ScheduleError;

/// Parse an IANA timezone identifier.
pub fn parse_tz(name: &str) -> Result<Tz, ScheduleError> {
    name.parse()
        .map_err(|_| ScheduleError::InvalidTimezone(name.to_string()))
}

/// Convert `hour:minute` as wall-clock time in `from` on `reference_date`
/// into the equivalent wall-clock time in `to`.
///
/// The caller supplies `reference_date` as "today" in the reference zone at
/// the moment of conversion. That is an approximation: a slot near local
/// midnight may compute against the wrong calendar day when `to` sits far
/// ahead of or behind `from`. Deliberately left as-is.
///
/// An ambiguous local time (DST fall-back) resolves to the earliest
/// instant; a nonexistent one (spring-forward gap) is an error.
pub fn convert(
    hour: u32,
    minute: u32,
    from: Tz,
    to: Tz,
    reference_date: NaiveDate,
) -> Result<(u32, u32), ScheduleError> {
    let naive = reference_date
        .and_hms_opt(hour, minute, 0)
        .ok_or(ScheduleError::InvalidTime { hour, minute })?;
    let src = from.from_local_datetime(&naive).earliest().ok_or_else(|| {
        ScheduleError::NonexistentLocalTime {
            hour,
            minute,
            timezone: from.to_string(),
            date: reference_date,
        }
    })?;
    let dst = src.with_timezone(&to);
    Ok((dst.hour(), dst.minute()))
}

/// Today's calendar date in `tz`.
pub fn today_in(tz: Tz) -> NaiveDate {
    Utc::now().with_timezone(&tz).date_naive()
}

/// The current wall-clock time in `tz`.
pub fn now_in(tz: Tz) -> DateTime<Tz> {
    Utc::now().with_timezone(&tz)
}

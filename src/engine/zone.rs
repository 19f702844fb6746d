//! Zone-aware time arithmetic for the sweeps.
//!
//! All due-time math happens after converting to the item's zone. DST
//! handling is left to chrono-tz.

use chrono::{DateTime, Days, LocalResult, Months, NaiveDateTime, TimeDelta, TimeZone, Utc};
use chrono_tz::Tz;

use crate::model::{Frequency, Recurrence};

/// Upper bound on catch-up steps when a series is far behind.
const MAX_RECURRENCE_STEPS: u32 = 10_000;

/// Resolve an item's zone. `None` is UTC; an unknown name yields `None`.
pub fn parse_zone(name: Option<&str>) -> Option<Tz> {
    match name.map(str::trim) {
        None | Some("") => Some(Tz::UTC),
        Some(name) => name.parse::<Tz>().ok(),
    }
}

/// The local instant a reminder fires: `due_local - offset_minutes`.
pub fn reminder_trigger(due_local: DateTime<Tz>, offset_minutes: i32) -> Option<DateTime<Tz>> {
    due_local.checked_sub_signed(TimeDelta::minutes(i64::from(offset_minutes)))
}

/// Human-readable local time, e.g. `Sun, Mar 10 2024 at 8:00 AM EDT`.
pub fn format_local(at: &DateTime<Tz>) -> String {
    at.format("%a, %b %-d %Y at %-I:%M %p %Z").to_string()
}

/// First occurrence after `now` of a series whose current occurrence is
/// due at `due_at`. Steps are counted on the local wall clock from
/// `due_at`, so a 09:00 appointment stays at 09:00 across DST changes.
///
/// Returns `None` when the series has ended or the step overflows.
pub fn next_occurrence(
    due_at: DateTime<Utc>,
    tz: Tz,
    recurrence: &Recurrence,
    now: DateTime<Utc>,
) -> Option<DateTime<Utc>> {
    let base = due_at.with_timezone(&tz).naive_local();
    let interval = recurrence.interval.max(1);

    for k in 1..=MAX_RECURRENCE_STEPS {
        let naive = step(base, recurrence.frequency, k.checked_mul(interval)?)?;
        let next = localize(tz, naive)?.with_timezone(&Utc);
        if recurrence.until.is_some_and(|until| next > until) {
            return None;
        }
        if next > now {
            return Some(next);
        }
    }
    None
}

fn step(base: NaiveDateTime, frequency: Frequency, n: u32) -> Option<NaiveDateTime> {
    match frequency {
        Frequency::Daily => base.checked_add_days(Days::new(u64::from(n))),
        Frequency::Weekly => base.checked_add_days(Days::new(u64::from(n) * 7)),
        Frequency::Monthly => base.checked_add_months(Months::new(n)),
    }
}

/// Pin a wall-clock time to the zone. Ambiguous times take the earlier
/// instant; times inside a DST gap move forward one hour.
fn localize(tz: Tz, naive: NaiveDateTime) -> Option<DateTime<Tz>> {
    match tz.from_local_datetime(&naive) {
        LocalResult::Single(at) => Some(at),
        LocalResult::Ambiguous(earlier, _) => Some(earlier),
        LocalResult::None => tz
            .from_local_datetime(&(naive + TimeDelta::hours(1)))
            .earliest(),
    }
}

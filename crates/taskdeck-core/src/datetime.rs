use chrono::{
    DateTime, Days, Duration, Local, LocalResult, NaiveDate, NaiveDateTime, NaiveTime, TimeZone,
    Utc,
};

use crate::error::Error;

/// Calendar day an instant falls on in local time.
pub fn local_day(dt: DateTime<Utc>) -> NaiveDate {
    dt.with_timezone(&Local).date_naive()
}

/// Local midnight of the day `dt` falls on, as a UTC instant.
pub fn local_day_start(dt: DateTime<Utc>) -> DateTime<Utc> {
    let midnight = local_day(dt).and_time(NaiveTime::MIN);
    to_utc(midnight).unwrap_or(dt)
}

/// Parse a due date supplied at the boundary. Accepts explicit local
/// datetimes (`2026-08-07 17:30`, `2026-08-07T17:30`), a bare date meaning
/// end of that local day, and the keywords `today` / `tomorrow`.
pub fn parse_due(input: &str, now: DateTime<Utc>) -> Result<DateTime<Utc>, Error> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Err(Error::validation("due date must not be empty"));
    }

    match trimmed.to_ascii_lowercase().as_str() {
        "today" => return due_at_end_of(local_day(now), trimmed),
        "tomorrow" => {
            let day = local_day(now)
                .checked_add_days(Days::new(1))
                .unwrap_or_else(|| local_day(now));
            return due_at_end_of(day, trimmed);
        }
        _ => {}
    }

    for format in ["%Y-%m-%d %H:%M", "%Y-%m-%dT%H:%M", "%Y-%m-%d %H:%M:%S"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(trimmed, format) {
            return to_utc(naive).ok_or_else(|| nonexistent_local(trimmed));
        }
    }

    if let Ok(day) = NaiveDate::parse_from_str(trimmed, "%Y-%m-%d") {
        return due_at_end_of(day, trimmed);
    }

    Err(Error::validation(format!(
        "unrecognized due date '{trimmed}'; expected YYYY-MM-DD [HH:MM], 'today' or 'tomorrow'"
    )))
}

/// Local rendering used by the table and info views.
pub fn format_local(dt: DateTime<Utc>) -> String {
    dt.with_timezone(&Local).format("%Y-%m-%d %H:%M").to_string()
}

fn due_at_end_of(day: NaiveDate, raw: &str) -> Result<DateTime<Utc>, Error> {
    let end = day.and_time(NaiveTime::MIN) + Duration::hours(23) + Duration::minutes(59);
    to_utc(end).ok_or_else(|| nonexistent_local(raw))
}

fn to_utc(naive: NaiveDateTime) -> Option<DateTime<Utc>> {
    match Local.from_local_datetime(&naive) {
        LocalResult::Single(local) | LocalResult::Ambiguous(local, _) => {
            Some(local.with_timezone(&Utc))
        }
        // Wall-clock time skipped by a DST transition.
        LocalResult::None => None,
    }
}

fn nonexistent_local(raw: &str) -> Error {
    Error::validation(format!("due date '{raw}' does not exist in the local timezone"))
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, Timelike, Utc};

    use super::{format_local, local_day, local_day_start, parse_due};

    #[test]
    fn day_start_is_midnight_of_the_same_local_day() {
        let now = Utc::now();
        let start = local_day_start(now);
        assert_eq!(local_day(start), local_day(now));
        assert!(start <= now);
    }

    #[test]
    fn parses_explicit_datetime_and_formats_back() {
        let now = Utc::now();
        let due = parse_due("2030-05-04 09:15", now).expect("parse");
        assert_eq!(format_local(due), "2030-05-04 09:15");
    }

    #[test]
    fn bare_date_lands_at_end_of_day() {
        let now = Utc::now();
        let due = parse_due("2030-05-04", now).expect("parse");
        let local = due.with_timezone(&chrono::Local);
        assert_eq!(local.hour(), 23);
        assert_eq!(local.minute(), 59);
    }

    #[test]
    fn today_keyword_stays_on_today() {
        let now = Utc::now();
        let due = parse_due("today", now).expect("parse");
        assert_eq!(local_day(due), local_day(now));
    }

    #[test]
    fn tomorrow_keyword_lands_one_day_out() {
        let now = Utc::now();
        let due = parse_due("tomorrow", now).expect("parse");
        let gap = due - local_day_start(now);
        assert!(gap > Duration::days(1));
        assert!(gap < Duration::days(2));
    }

    #[test]
    fn rejects_garbage() {
        let now = Utc::now();
        assert!(parse_due("next thursday-ish", now).is_err());
        assert!(parse_due("", now).is_err());
    }
}

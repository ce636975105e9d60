use chrono::{FixedOffset, NaiveDate, NaiveDateTime, NaiveTime, TimeZone, Utc};

use crate::value::{DatePrecision, DateTimePrecision, TimePrecision, Value};

fn parse_date(input: &str) -> Option<(NaiveDate, DatePrecision)> {
    let s = input.trim();
    let all_digits = |part: &str| !part.is_empty() && part.chars().all(|c| c.is_ascii_digit());

    match s.len() {
        4 if all_digits(s) => {
            let date = NaiveDate::parse_from_str(&format!("{}-01-01", s), "%Y-%m-%d").ok()?;
            Some((date, DatePrecision::Year))
        }
        7 => {
            let date = NaiveDate::parse_from_str(&format!("{}-01", s), "%Y-%m-%d").ok()?;
            Some((date, DatePrecision::Month))
        }
        10 => {
            let date = NaiveDate::parse_from_str(s, "%Y-%m-%d").ok()?;
            Some((date, DatePrecision::Day))
        }
        _ => None,
    }
}

pub(crate) fn parse_date_value(input: &str) -> Option<Value> {
    let (date, precision) = parse_date(input)?;
    Some(Value::date_with_precision(date, precision))
}

pub(crate) fn parse_time_value(input: &str) -> Option<Value> {
    let s = input.trim();
    let s = s.strip_prefix('T').unwrap_or(s);
    if s.is_empty() {
        return None;
    }

    let precision = if s.contains('.') {
        TimePrecision::Millisecond
    } else if s.matches(':').count() >= 2 {
        TimePrecision::Second
    } else if s.contains(':') {
        TimePrecision::Minute
    } else {
        TimePrecision::Hour
    };

    let value = NaiveTime::parse_from_str(s, "%H:%M:%S%.f")
        .or_else(|_| NaiveTime::parse_from_str(s, "%H:%M:%S"))
        .or_else(|_| NaiveTime::parse_from_str(s, "%H:%M"))
        .ok()
        .or_else(|| {
            let hour: u32 = s.parse().ok()?;
            NaiveTime::from_hms_opt(hour, 0, 0)
        })?;

    Some(Value::time_with_precision(value, precision))
}

/// Parse a FHIR dateTime/instant. Date-only values become dateTimes with date precision.
pub(crate) fn parse_datetime_value_lenient(input: &str) -> Option<Value> {
    let raw = input.trim();
    if raw.is_empty() {
        return None;
    }

    let Some((date_part, rest)) = raw.split_once('T') else {
        let (date, date_precision) = parse_date(raw)?;
        let naive = NaiveDateTime::new(date, NaiveTime::from_hms_opt(0, 0, 0)?);
        let utc = chrono::DateTime::<Utc>::from_naive_utc_and_offset(naive, Utc);
        let precision = match date_precision {
            DatePrecision::Year => DateTimePrecision::Year,
            DatePrecision::Month => DateTimePrecision::Month,
            DatePrecision::Day => DateTimePrecision::Day,
        };
        return Some(Value::datetime_with_precision_and_offset(utc, precision, None));
    };

    let (date, _) = parse_date(date_part)?;
    let (time_part, tz_offset) = parse_timezone(rest)?;
    let (time, precision) = parse_datetime_time(time_part)?;

    let local = NaiveDateTime::new(date, time);
    let utc = match tz_offset {
        Some(offset_secs) => FixedOffset::east_opt(offset_secs)?
            .from_local_datetime(&local)
            .single()?
            .with_timezone(&Utc),
        None => chrono::DateTime::<Utc>::from_naive_utc_and_offset(local, Utc),
    };

    Some(Value::datetime_with_precision_and_offset(
        utc, precision, tz_offset,
    ))
}

fn parse_timezone(rest: &str) -> Option<(&str, Option<i32>)> {
    if let Some(stripped) = rest.strip_suffix('Z') {
        return Some((stripped, Some(0)));
    }

    if let Some(pos) = rest.rfind(['+', '-']) {
        let (time, tz) = rest.split_at(pos);
        let sign = if tz.starts_with('-') { -1 } else { 1 };
        let (hours, minutes) = match tz.len() {
            6 if tz.as_bytes()[3] == b':' => (&tz[1..3], &tz[4..6]),
            5 => (&tz[1..3], &tz[3..5]),
            _ => return None,
        };
        let hours: i32 = hours.parse().ok()?;
        let minutes: i32 = minutes.parse().ok()?;
        return Some((time, Some(sign * (hours * 3600 + minutes * 60))));
    }

    Some((rest, None))
}

fn parse_datetime_time(time_part: &str) -> Option<(NaiveTime, DateTimePrecision)> {
    let time_part = time_part.trim();
    if time_part.is_empty() {
        return Some((NaiveTime::from_hms_opt(0, 0, 0)?, DateTimePrecision::Day));
    }

    let (main, frac) = match time_part.split_once('.') {
        Some((main, frac)) => (main, Some(frac)),
        None => (time_part, None),
    };

    let parts: Vec<&str> = main.split(':').collect();
    let (hour, minute, second, precision) = match parts.as_slice() {
        [hh] => (*hh, "0", "0", DateTimePrecision::Hour),
        [hh, mm] => (*hh, *mm, "0", DateTimePrecision::Minute),
        [hh, mm, ss] if frac.is_some() => (*hh, *mm, *ss, DateTimePrecision::Millisecond),
        [hh, mm, ss] => (*hh, *mm, *ss, DateTimePrecision::Second),
        _ => return None,
    };

    let hour: u32 = hour.parse().ok()?;
    let minute: u32 = minute.parse().ok()?;
    let second: u32 = second.parse().ok()?;

    let nanos: u32 = match frac {
        Some(frac) => {
            let digits: String = frac.chars().take(3).collect();
            let millis: u32 = format!("{:0<3}", digits).parse().ok()?;
            millis * 1_000_000
        }
        None => 0,
    };

    let time = NaiveTime::from_hms_nano_opt(hour, minute, second, nanos)?;
    Some((time, precision))
}

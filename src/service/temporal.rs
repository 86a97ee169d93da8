use chrono::{Datelike, Duration, NaiveDate, NaiveDateTime, NaiveTime, Weekday};
use serde::{Deserialize, Serialize};

use crate::errors::{UnresolvableDateError, ValidationError};

/// Canonical timestamp representation: `YYYY-MM-DD HH:mm:ss`, seconds
/// always present and zero-padded. Timestamps are timezone-naive; the
/// caller supplies the reference instant already in the desired zone.
pub const CANONICAL_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

pub fn format_canonical(value: NaiveDateTime) -> String {
    value.format(CANONICAL_FORMAT).to_string()
}

pub mod canonical {
    use super::{NaiveDateTime, CANONICAL_FORMAT};
    use serde::{self, Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &NaiveDateTime, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&value.format(CANONICAL_FORMAT).to_string())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<NaiveDateTime, D::Error> {
        let raw = String::deserialize(deserializer)?;
        NaiveDateTime::parse_from_str(&raw, CANONICAL_FORMAT).map_err(serde::de::Error::custom)
    }
}

pub mod canonical_opt {
    use super::{NaiveDateTime, CANONICAL_FORMAT};
    use serde::{self, Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(
        value: &Option<NaiveDateTime>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        match value {
            Some(inner) => serializer.serialize_str(&inner.format(CANONICAL_FORMAT).to_string()),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Option<NaiveDateTime>, D::Error> {
        let raw = Option::<String>::deserialize(deserializer)?;
        raw.map(|s| {
            NaiveDateTime::parse_from_str(&s, CANONICAL_FORMAT).map_err(serde::de::Error::custom)
        })
        .transpose()
    }
}

/// A bounded, directional time range used for fetch filtering.
/// `include_all = false` restricts results to items not yet past or not
/// yet completed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TemporalWindow {
    #[serde(with = "canonical")]
    pub from: NaiveDateTime,
    #[serde(with = "canonical")]
    pub to: NaiveDateTime,
    pub include_all: bool,
}

pub fn end_of_day(value: NaiveDateTime) -> NaiveDateTime {
    value.date().and_time(NaiveTime::MIN) + Duration::seconds(86_399)
}

/// Default end for a single-instant action with no explicit end.
pub fn default_event_end(from: NaiveDateTime) -> NaiveDateTime {
    from + Duration::minutes(30)
}

/// Resolves a date expression against the reference instant.
///
/// Absolute expressions pass through after reformatting, even when they lie
/// in the past: writing an exact date is the explicit historical signal.
/// Relative expressions ("today", "this monday", "at 7pm") resolve with a
/// future bias unless `past_allowed` is set: a time-bearing result is
/// rolled forward to the first day on or after the reference instant, a
/// date-only result to the first day on or after the reference date.
pub fn normalize(
    expression: &str,
    reference: NaiveDateTime,
    past_allowed: bool,
) -> Result<NaiveDateTime, UnresolvableDateError> {
    let trimmed = expression.trim();
    if trimmed.is_empty() {
        return Err(UnresolvableDateError {
            expression: expression.to_string(),
        });
    }

    if let Some(absolute) = parse_absolute(trimmed) {
        return Ok(absolute);
    }

    let tokens = tokenize(trimmed);
    let date = scan_date(&tokens, reference);
    let time = scan_time(&tokens);

    let mut resolved = match (date, time) {
        (Some(date), Some(time)) => date.and_time(time),
        (Some(date), None) => date.and_time(NaiveTime::MIN),
        (None, Some(time)) => reference.date().and_time(time),
        (None, None) => {
            return Err(UnresolvableDateError {
                expression: expression.to_string(),
            })
        }
    };

    if !past_allowed {
        if time.is_some() {
            while resolved < reference {
                resolved += Duration::days(1);
            }
        } else {
            while resolved.date() < reference.date() {
                resolved += Duration::days(1);
            }
        }
    }

    Ok(resolved)
}

/// Builds a fetch window. A missing `from` defaults to the reference date
/// at midnight, a missing `to` to the end of `from`'s calendar day, so the
/// implicit window covers "today".
pub fn normalize_window(
    from: Option<&str>,
    to: Option<&str>,
    include_all: bool,
    reference: NaiveDateTime,
    past_allowed: bool,
) -> Result<TemporalWindow, ValidationError> {
    let from = match from {
        Some(expression) => normalize(expression, reference, true)
            .map_err(|e| ValidationError::new("from", e.to_string()))?,
        None => reference.date().and_time(NaiveTime::MIN),
    };
    let to = match to {
        Some(expression) => normalize(expression, reference, past_allowed)
            .map_err(|e| ValidationError::new("to", e.to_string()))?,
        None => end_of_day(from),
    };
    if to < from {
        return Err(ValidationError::new(
            "to",
            format!(
                "'to' ({}) precedes 'from' ({})",
                format_canonical(to),
                format_canonical(from)
            ),
        ));
    }
    Ok(TemporalWindow {
        from,
        to,
        include_all,
    })
}

fn parse_absolute(expression: &str) -> Option<NaiveDateTime> {
    for format in [CANONICAL_FORMAT, "%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M"] {
        if let Ok(parsed) = NaiveDateTime::parse_from_str(expression, format) {
            return Some(parsed);
        }
    }
    NaiveDate::parse_from_str(expression, "%Y-%m-%d")
        .ok()
        .map(|date| date.and_time(NaiveTime::MIN))
}

fn tokenize(expression: &str) -> Vec<String> {
    expression
        .to_lowercase()
        .split_whitespace()
        .map(|t| {
            t.trim_matches(|c: char| !c.is_ascii_alphanumeric() && c != ':')
                .to_string()
        })
        .filter(|t| !t.is_empty())
        .collect()
}

fn scan_date(tokens: &[String], reference: NaiveDateTime) -> Option<NaiveDate> {
    let today = reference.date();
    for (i, token) in tokens.iter().enumerate() {
        match token.as_str() {
            "today" | "tonight" => return Some(today),
            "tomorrow" => return Some(today + Duration::days(1)),
            "yesterday" => return Some(today - Duration::days(1)),
            _ => {}
        }
        if let Some(weekday) = parse_weekday(token) {
            let modifier = i.checked_sub(1).map(|p| tokens[p].as_str());
            return Some(resolve_weekday(weekday, today, modifier));
        }
    }
    None
}

fn parse_weekday(token: &str) -> Option<Weekday> {
    match token {
        "monday" | "mon" => Some(Weekday::Mon),
        "tuesday" | "tue" | "tues" => Some(Weekday::Tue),
        "wednesday" | "wed" => Some(Weekday::Wed),
        "thursday" | "thu" | "thurs" => Some(Weekday::Thu),
        "friday" | "fri" => Some(Weekday::Fri),
        "saturday" | "sat" => Some(Weekday::Sat),
        "sunday" | "sun" => Some(Weekday::Sun),
        _ => None,
    }
}

/// A bare weekday or "this <weekday>" means the next occurrence on or
/// after today. "next <weekday>" means the following week's occurrence,
/// at least seven days out. "last <weekday>" is the previous occurrence.
fn resolve_weekday(weekday: Weekday, today: NaiveDate, modifier: Option<&str>) -> NaiveDate {
    let ahead = (weekday.num_days_from_monday() + 7 - today.weekday().num_days_from_monday()) % 7;
    match modifier {
        Some("next") => today + Duration::days(i64::from(ahead) + 7),
        Some("last") => {
            let back = (today.weekday().num_days_from_monday() + 7 - weekday.num_days_from_monday()) % 7;
            let back = if back == 0 { 7 } else { back };
            today - Duration::days(i64::from(back))
        }
        _ => today + Duration::days(i64::from(ahead)),
    }
}

fn scan_time(tokens: &[String]) -> Option<NaiveTime> {
    for (i, token) in tokens.iter().enumerate() {
        match token.as_str() {
            "noon" => return NaiveTime::from_hms_opt(12, 0, 0),
            "midnight" => return Some(NaiveTime::MIN),
            _ => {}
        }
        let next = tokens.get(i + 1).map(String::as_str);
        if let Some((time, explicit)) = parse_time_token(token, next) {
            let follows_at = i > 0 && tokens[i - 1] == "at";
            if explicit || follows_at {
                return Some(time);
            }
        }
    }
    None
}

/// Parses "7pm", "19:30", "7:30pm", "07:30:15", or a bare hour with the
/// meridiem in the following token. Returns the time and whether the token
/// was explicit (colon or meridiem present); a bare number only counts as
/// an hour when it follows "at".
fn parse_time_token(token: &str, next: Option<&str>) -> Option<(NaiveTime, bool)> {
    let (body, mut meridiem) = match token {
        t if t.len() > 2 && t.ends_with("am") => (&t[..t.len() - 2], Some(false)),
        t if t.len() > 2 && t.ends_with("pm") => (&t[..t.len() - 2], Some(true)),
        t => (t, None),
    };
    if body.is_empty() || !body.chars().all(|c| c.is_ascii_digit() || c == ':') {
        return None;
    }
    if meridiem.is_none() {
        meridiem = match next {
            Some("am") => Some(false),
            Some("pm") => Some(true),
            _ => None,
        };
    }

    let mut parts = body.split(':');
    let hour: u32 = parts.next()?.parse().ok()?;
    let minute: u32 = match parts.next() {
        Some(part) => part.parse().ok()?,
        None => 0,
    };
    let second: u32 = match parts.next() {
        Some(part) => part.parse().ok()?,
        None => 0,
    };

    let hour = match meridiem {
        Some(pm) => {
            if !(1..=12).contains(&hour) {
                return None;
            }
            match (pm, hour) {
                (true, 12) => 12,
                (true, h) => h + 12,
                (false, 12) => 0,
                (false, h) => h,
            }
        }
        None => hour,
    };

    let explicit = meridiem.is_some() || body.contains(':');
    NaiveTime::from_hms_opt(hour, minute, second).map(|time| (time, explicit))
}

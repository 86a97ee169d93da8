use agendaBot::service::temporal::{
    default_event_end, end_of_day, format_canonical, normalize, normalize_window,
    CANONICAL_FORMAT,
};
use chrono::NaiveDateTime;

fn dt(raw: &str) -> NaiveDateTime {
    NaiveDateTime::parse_from_str(raw, CANONICAL_FORMAT).unwrap()
}

#[test]
fn absolute_expressions_pass_through_reformatted() {
    let reference = dt("2023-11-13 09:00:00");
    assert_eq!(
        normalize("2023-11-20 18:30:00", reference, false).unwrap(),
        dt("2023-11-20 18:30:00")
    );
    // Partial absolute forms pick up zero-padded seconds.
    assert_eq!(
        normalize("2023-11-20 18:30", reference, false).unwrap(),
        dt("2023-11-20 18:30:00")
    );
    assert_eq!(
        normalize("2023-11-20", reference, false).unwrap(),
        dt("2023-11-20 00:00:00")
    );
}

#[test]
fn absolute_past_dates_are_the_explicit_historical_signal() {
    let reference = dt("2023-11-13 09:00:00");
    assert_eq!(
        normalize("2021-01-05 10:00:00", reference, false).unwrap(),
        dt("2021-01-05 10:00:00")
    );
}

#[test]
fn today_resolves_to_reference_date_midnight() {
    let reference = dt("2023-11-13 09:00:00");
    assert_eq!(
        normalize("today", reference, false).unwrap(),
        dt("2023-11-13 00:00:00")
    );
}

#[test]
fn tomorrow_with_time() {
    let reference = dt("2023-11-13 09:00:00");
    assert_eq!(
        normalize("tomorrow at 7pm", reference, false).unwrap(),
        dt("2023-11-14 19:00:00")
    );
}

#[test]
fn weekday_resolves_to_next_occurrence_on_or_after_reference() {
    // 2023-11-11 is a Saturday.
    let reference = dt("2023-11-11 15:00:00");
    assert_eq!(
        normalize("this monday at 8pm", reference, false).unwrap(),
        dt("2023-11-13 20:00:00")
    );
    assert_eq!(
        normalize("friday", reference, false).unwrap(),
        dt("2023-11-17 00:00:00")
    );
    // A weekday naming the reference day stays on it.
    assert_eq!(
        normalize("saturday", reference, false).unwrap(),
        dt("2023-11-11 00:00:00")
    );
}

#[test]
fn next_weekday_skips_into_the_following_week() {
    let reference = dt("2023-11-11 15:00:00");
    assert_eq!(
        normalize("next monday", reference, false).unwrap(),
        dt("2023-11-20 00:00:00")
    );
}

#[test]
fn bare_time_already_past_rolls_to_the_next_day() {
    let reference = dt("2023-11-13 21:00:00");
    assert_eq!(
        normalize("at 7pm", reference, false).unwrap(),
        dt("2023-11-14 19:00:00")
    );
    // Still ahead of the reference: stays on the same day.
    let reference = dt("2023-11-13 15:00:00");
    assert_eq!(
        normalize("at 7pm", reference, false).unwrap(),
        dt("2023-11-13 19:00:00")
    );
}

#[test]
fn past_allowed_keeps_historical_resolution() {
    let reference = dt("2023-11-13 09:00:00");
    assert_eq!(
        normalize("yesterday", reference, true).unwrap(),
        dt("2023-11-12 00:00:00")
    );
    assert_eq!(
        normalize("last friday", reference, true).unwrap(),
        dt("2023-11-10 00:00:00")
    );
}

#[test]
fn clock_variants_parse() {
    let reference = dt("2023-11-13 09:00:00");
    assert_eq!(
        normalize("today at 19:30", reference, false).unwrap(),
        dt("2023-11-13 19:30:00")
    );
    assert_eq!(
        normalize("tomorrow at 12am", reference, false).unwrap(),
        dt("2023-11-14 00:00:00")
    );
    assert_eq!(
        normalize("today at noon", reference, false).unwrap(),
        dt("2023-11-13 12:00:00")
    );
    assert_eq!(
        normalize("tomorrow at 8 pm", reference, false).unwrap(),
        dt("2023-11-14 20:00:00")
    );
}

#[test]
fn anchorless_expressions_are_unresolvable() {
    let reference = dt("2023-11-13 09:00:00");
    assert!(normalize("whenever works", reference, false).is_err());
    assert!(normalize("", reference, false).is_err());
    assert!(normalize("soon", reference, false).is_err());
}

#[test]
fn default_event_end_is_thirty_minutes() {
    let from = dt("2023-11-11 19:00:00");
    assert_eq!(default_event_end(from), dt("2023-11-11 19:30:00"));
}

#[test]
fn end_of_day_is_235959() {
    assert_eq!(
        end_of_day(dt("2023-11-13 09:12:34")),
        dt("2023-11-13 23:59:59")
    );
}

#[test]
fn implicit_window_covers_the_reference_day() {
    let reference = dt("2023-11-13 09:00:00");
    let window = normalize_window(None, None, false, reference, false).unwrap();
    assert_eq!(window.from, dt("2023-11-13 00:00:00"));
    assert_eq!(window.to, dt("2023-11-13 23:59:59"));
    assert!(!window.include_all);
}

#[test]
fn missing_to_defaults_to_end_of_from_day() {
    let reference = dt("2023-11-13 09:00:00");
    let window =
        normalize_window(Some("2023-11-15 08:00:00"), None, false, reference, false).unwrap();
    assert_eq!(window.from, dt("2023-11-15 08:00:00"));
    assert_eq!(window.to, dt("2023-11-15 23:59:59"));
}

#[test]
fn inverted_window_is_a_validation_error() {
    let reference = dt("2023-11-13 09:00:00");
    let err = normalize_window(
        Some("2023-11-15 08:00:00"),
        Some("2023-11-14 08:00:00"),
        false,
        reference,
        false,
    )
    .unwrap_err();
    assert_eq!(err.path, "to");
}

#[test]
fn canonical_format_zero_pads_seconds() {
    assert_eq!(
        format_canonical(dt("2023-01-02 03:04:05")),
        "2023-01-02 03:04:05"
    );
}

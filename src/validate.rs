//! Schema validation and enrichment of the model's JSON reply.
//!
//! The model is asked for a fixed shape, but nothing guarantees it complies.
//! [`validate_extraction`] walks the raw `serde_json::Value` instead of
//! deserializing it straight into [`ExtractionResult`] so that *every* problem
//! can be reported with its field path, not just the first one serde trips
//! over.
//!
//! Three kinds of finding come out of a pass:
//!
//! * **errors**: missing/mistyped fields, malformed times, empty timetable,
//!   blocks that end before they start. Any error rejects the whole result.
//! * **warnings**: blocks outside school hours, low confidence, a supplied
//!   duration that disagrees with the times. Attached to the result.
//! * **enrichment**: `duration_minutes` is (re)computed from the times, times
//!   are zero-padded, and optional fields get their defaults.

use crate::error::FieldIssue;
use crate::model::{Day, ExtractionResult, SubjectType, TimeBlock, TimetableMetadata};
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::{Map, Value};

/// Thresholds applied by the business checks.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidationRules {
    /// Blocks starting before this many minutes after midnight get a warning. Default: 05:00.
    pub earliest_start_minutes: u32,
    /// Blocks ending after this many minutes after midnight get a warning. Default: 23:00.
    pub latest_end_minutes: u32,
    /// Confidence values below this get a warning. Default: 0.5.
    pub low_confidence_threshold: f64,
}

impl Default for ValidationRules {
    fn default() -> Self {
        Self {
            earliest_start_minutes: 5 * 60,
            latest_end_minutes: 23 * 60,
            low_confidence_threshold: 0.5,
        }
    }
}

/// A result that passed validation, plus the non-fatal findings.
#[derive(Debug, Clone, PartialEq)]
pub struct Validated {
    pub result: ExtractionResult,
    pub warnings: Vec<FieldIssue>,
}

/// Validate and enrich a candidate extraction.
///
/// Returns every hard error found when the candidate is rejected.
pub fn validate_extraction(
    candidate: &Value,
    rules: &ValidationRules,
) -> Result<Validated, Vec<FieldIssue>> {
    let Some(root) = candidate.as_object() else {
        return Err(vec![FieldIssue::new("$", "must be a JSON object")]);
    };

    let mut report = Report::default();

    let metadata = parse_metadata(root.get("metadata"), &mut report);

    let timeblocks = match root.get("timeblocks") {
        None | Some(Value::Null) => {
            report.error("timeblocks", "is required");
            Vec::new()
        }
        Some(Value::Array(items)) if items.is_empty() => {
            report.error("timeblocks", "must contain at least one time block");
            Vec::new()
        }
        Some(Value::Array(items)) => items
            .iter()
            .enumerate()
            .filter_map(|(i, item)| parse_block(i, item, rules, &mut report))
            .collect(),
        Some(_) => {
            report.error("timeblocks", "must be an array");
            Vec::new()
        }
    };

    if !report.errors.is_empty() {
        return Err(report.errors);
    }

    if metadata.extraction_confidence < rules.low_confidence_threshold {
        report.warn(
            "metadata.extraction_confidence",
            format!(
                "overall extraction confidence {:.2} is below {:.2}; review the result",
                metadata.extraction_confidence, rules.low_confidence_threshold
            ),
        );
    }

    Ok(Validated {
        result: ExtractionResult {
            metadata,
            timeblocks,
        },
        warnings: report.warnings,
    })
}

/// Parse `H:MM` / `HH:MM` into minutes since midnight.
pub fn parse_clock(s: &str) -> Option<u32> {
    let caps = RE_CLOCK.captures(s.trim())?;
    let hours: u32 = caps[1].parse().ok()?;
    let minutes: u32 = caps[2].parse().ok()?;
    Some(hours * 60 + minutes)
}

/// Render minutes since midnight as zero-padded `HH:MM`.
pub fn format_clock(minutes: u32) -> String {
    format!("{:02}:{:02}", minutes / 60, minutes % 60)
}

// ── Internals ────────────────────────────────────────────────────────────

static RE_CLOCK: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^([01]?[0-9]|2[0-3]):([0-5][0-9])$").unwrap());

#[derive(Default)]
struct Report {
    errors: Vec<FieldIssue>,
    warnings: Vec<FieldIssue>,
}

impl Report {
    fn error(&mut self, path: impl Into<String>, message: impl Into<String>) {
        self.errors.push(FieldIssue::new(path, message));
    }

    fn warn(&mut self, path: impl Into<String>, message: impl Into<String>) {
        self.warnings.push(FieldIssue::new(path, message));
    }
}

fn parse_metadata(value: Option<&Value>, report: &mut Report) -> TimetableMetadata {
    let mut metadata = TimetableMetadata::default();
    let obj = match value {
        None | Some(Value::Null) => return metadata,
        Some(Value::Object(obj)) => obj,
        Some(_) => {
            report.error("metadata", "must be an object");
            return metadata;
        }
    };

    metadata.teacher_name = optional_string(obj, "metadata", "teacher_name", report);
    metadata.class_name = optional_string(obj, "metadata", "class_name", report);
    metadata.term = optional_string(obj, "metadata", "term", report);
    metadata.school_name = optional_string(obj, "metadata", "school_name", report);
    if let Some(c) = optional_unit_interval(obj, "metadata", "extraction_confidence", report) {
        metadata.extraction_confidence = c;
    }
    metadata
}

fn parse_block(
    index: usize,
    value: &Value,
    rules: &ValidationRules,
    report: &mut Report,
) -> Option<TimeBlock> {
    let base = format!("timeblocks[{index}]");
    let Some(obj) = value.as_object() else {
        report.error(base, "must be an object");
        return None;
    };
    let errors_before = report.errors.len();

    let day = required_string(obj, &base, "day", report).and_then(|s| {
        let parsed = s.parse::<Day>().ok();
        if parsed.is_none() {
            report.error(
                format!("{base}.day"),
                format!("'{s}' is not a day of the week (Monday–Sunday)"),
            );
        }
        parsed
    });

    let start = required_clock(obj, &base, "start_time", report);
    let end = required_clock(obj, &base, "end_time", report);

    let subject = required_string(obj, &base, "subject", report).and_then(|s| {
        if s.trim().is_empty() {
            report.error(format!("{base}.subject"), "must not be empty");
            None
        } else {
            Some(s.to_string())
        }
    });

    let subject_type = match obj.get("subject_type") {
        None | Some(Value::Null) => SubjectType::default(),
        Some(Value::String(s)) => s.parse::<SubjectType>().unwrap_or_else(|_| {
            report.error(
                format!("{base}.subject_type"),
                format!("'{s}' must be one of academic, break, administrative, other"),
            );
            SubjectType::default()
        }),
        Some(_) => {
            report.error(format!("{base}.subject_type"), "must be a string");
            SubjectType::default()
        }
    };

    let notes = optional_string(obj, &base, "notes", report);
    let confidence = optional_unit_interval(obj, &base, "confidence", report).unwrap_or(1.0);

    let supplied_duration = match obj.get("duration_minutes") {
        None | Some(Value::Null) => None,
        Some(v) => match whole_minutes(v) {
            Some(d) => Some(d),
            None => {
                report.error(
                    format!("{base}.duration_minutes"),
                    "must be a non-negative integer",
                );
                None
            }
        },
    };

    if report.errors.len() > errors_before {
        return None;
    }
    let (day, start, end, subject) = (day?, start?, end?, subject?);

    if end <= start {
        report.error(
            format!("{base}.end_time"),
            format!(
                "must be after start_time ({} is not after {})",
                format_clock(end),
                format_clock(start)
            ),
        );
        return None;
    }

    if start < rules.earliest_start_minutes {
        report.warn(
            format!("{base}.start_time"),
            format!(
                "{} is unusually early (before {})",
                format_clock(start),
                format_clock(rules.earliest_start_minutes)
            ),
        );
    }
    if end > rules.latest_end_minutes {
        report.warn(
            format!("{base}.end_time"),
            format!(
                "{} is unusually late (after {})",
                format_clock(end),
                format_clock(rules.latest_end_minutes)
            ),
        );
    }

    let duration = end - start;
    if let Some(d) = supplied_duration {
        if d != u64::from(duration) {
            report.warn(
                format!("{base}.duration_minutes"),
                format!("supplied {d} does not match the times; using {duration}"),
            );
        }
    }

    if confidence < rules.low_confidence_threshold {
        report.warn(
            format!("{base}.confidence"),
            format!(
                "confidence {confidence:.2} is below {:.2}",
                rules.low_confidence_threshold
            ),
        );
    }

    Some(TimeBlock {
        day,
        start_time: format_clock(start),
        end_time: format_clock(end),
        duration_minutes: duration,
        subject,
        subject_type,
        notes,
        confidence,
    })
}

fn required_string<'a>(
    obj: &'a Map<String, Value>,
    base: &str,
    field: &str,
    report: &mut Report,
) -> Option<&'a str> {
    match obj.get(field) {
        Some(Value::String(s)) => Some(s.as_str()),
        None | Some(Value::Null) => {
            report.error(format!("{base}.{field}"), "is required");
            None
        }
        Some(_) => {
            report.error(format!("{base}.{field}"), "must be a string");
            None
        }
    }
}

fn required_clock(
    obj: &Map<String, Value>,
    base: &str,
    field: &str,
    report: &mut Report,
) -> Option<u32> {
    let s = required_string(obj, base, field, report)?;
    let parsed = parse_clock(s);
    if parsed.is_none() {
        report.error(
            format!("{base}.{field}"),
            format!("'{s}' is not a valid time (expected H:MM or HH:MM, 24-hour)"),
        );
    }
    parsed
}

fn optional_string(
    obj: &Map<String, Value>,
    base: &str,
    field: &str,
    report: &mut Report,
) -> Option<String> {
    match obj.get(field) {
        None | Some(Value::Null) => None,
        Some(Value::String(s)) => Some(s.clone()),
        Some(_) => {
            report.error(format!("{base}.{field}"), "must be a string or null");
            None
        }
    }
}

fn optional_unit_interval(
    obj: &Map<String, Value>,
    base: &str,
    field: &str,
    report: &mut Report,
) -> Option<f64> {
    match obj.get(field) {
        None | Some(Value::Null) => None,
        Some(v) => match v.as_f64() {
            Some(n) if (0.0..=1.0).contains(&n) => Some(n),
            _ => {
                report.error(
                    format!("{base}.{field}"),
                    "must be a number between 0 and 1",
                );
                None
            }
        },
    }
}

/// Non-negative whole number, whether the model wrote `30` or `30.0`.
fn whole_minutes(v: &Value) -> Option<u64> {
    if let Some(d) = v.as_u64() {
        return Some(d);
    }
    let f = v.as_f64()?;
    (f.is_finite() && f >= 0.0 && f.fract() == 0.0 && f <= u32::MAX as f64).then_some(f as u64)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn block(day: &str, start: &str, end: &str, subject: &str) -> Value {
        json!({ "day": day, "start_time": start, "end_time": end, "subject": subject })
    }

    fn run(candidate: Value) -> Result<Validated, Vec<FieldIssue>> {
        validate_extraction(&candidate, &ValidationRules::default())
    }

    fn paths(issues: &[FieldIssue]) -> Vec<&str> {
        issues.iter().map(|i| i.path.as_str()).collect()
    }

    #[test]
    fn parse_clock_accepts_short_and_padded_hours() {
        assert_eq!(parse_clock("9:00"), Some(540));
        assert_eq!(parse_clock("09:05"), Some(545));
        assert_eq!(parse_clock("23:59"), Some(23 * 60 + 59));
        assert_eq!(parse_clock("0:00"), Some(0));
    }

    #[test]
    fn parse_clock_rejects_malformed() {
        for bad in ["24:00", "9:60", "9", "9.30", "09:5", "nine", "", "12:00pm"] {
            assert_eq!(parse_clock(bad), None, "{bad:?} should be rejected");
        }
    }

    #[test]
    fn two_entry_timetable_is_enriched() {
        let out = run(json!({
            "metadata": { "teacher_name": "Ms Rivera", "extraction_confidence": 0.9 },
            "timeblocks": [
                block("Monday", "9:00", "9:30", "Maths"),
                { "day": "Monday", "start_time": "10:30", "end_time": "10:45",
                  "subject": "Break", "subject_type": "break" }
            ]
        }))
        .expect("valid");

        let blocks = &out.result.timeblocks;
        assert_eq!(blocks.len(), 2);
        assert_eq!(blocks[0].duration_minutes, 30);
        assert_eq!(blocks[0].start_time, "09:00");
        assert_eq!(blocks[0].subject_type, SubjectType::Academic);
        assert_eq!(blocks[0].confidence, 1.0);
        assert_eq!(blocks[1].duration_minutes, 15);
        assert_eq!(blocks[1].subject_type, SubjectType::Break);
        assert_eq!(out.result.metadata.teacher_name.as_deref(), Some("Ms Rivera"));
        assert!(out.warnings.is_empty(), "{:?}", out.warnings);
    }

    #[test]
    fn duration_always_matches_times() {
        let starts = ["5:00", "8:15", "12:40", "17:05"];
        let lengths = [1u32, 25, 60, 95];
        for s in starts {
            for len in lengths {
                let start = parse_clock(s).unwrap();
                let end = format_clock(start + len);
                let out = run(json!({ "timeblocks": [block("Tue", s, &end, "Science")] }))
                    .expect("valid");
                assert_eq!(out.result.timeblocks[0].duration_minutes, len);
            }
        }
    }

    #[test]
    fn mismatched_duration_is_replaced_with_warning() {
        let mut b = block("Friday", "13:00", "13:50", "History");
        b["duration_minutes"] = json!(45);
        let out = run(json!({ "timeblocks": [b] })).expect("valid");
        assert_eq!(out.result.timeblocks[0].duration_minutes, 50);
        assert_eq!(paths(&out.warnings), vec!["timeblocks[0].duration_minutes"]);
    }

    #[test]
    fn whole_float_duration_is_accepted() {
        let mut b = block("Monday", "9:00", "9:30", "Maths");
        b["duration_minutes"] = json!(30.0);
        let out = run(json!({ "timeblocks": [b] })).expect("valid");
        assert_eq!(out.result.timeblocks[0].duration_minutes, 30);
        assert!(out.warnings.is_empty(), "{:?}", out.warnings);
    }

    #[test]
    fn fractional_or_negative_duration_is_an_error() {
        for bad in [json!(30.5), json!(-5), json!("30")] {
            let mut b = block("Monday", "9:00", "9:30", "Maths");
            b["duration_minutes"] = bad;
            let errors = run(json!({ "timeblocks": [b] })).unwrap_err();
            assert_eq!(paths(&errors), vec!["timeblocks[0].duration_minutes"]);
        }
    }

    #[test]
    fn end_not_after_start_is_an_error() {
        for (start, end) in [("10:00", "10:00"), ("10:00", "9:59"), ("14:30", "08:00")] {
            let err = run(json!({ "timeblocks": [block("Monday", start, end, "Art")] }))
                .expect_err("must fail");
            assert_eq!(paths(&err), vec!["timeblocks[0].end_time"], "{start}-{end}");
        }
    }

    #[test]
    fn early_and_late_blocks_warn_but_pass() {
        let out = run(json!({
            "timeblocks": [
                block("Monday", "4:30", "5:15", "Swim squad"),
                block("Monday", "22:30", "23:30", "Night study"),
            ]
        }))
        .expect("warnings are not errors");
        assert_eq!(out.result.timeblocks.len(), 2);
        assert_eq!(
            paths(&out.warnings),
            vec!["timeblocks[0].start_time", "timeblocks[1].end_time"]
        );
    }

    #[test]
    fn empty_timeblocks_fail() {
        let err = run(json!({ "metadata": {}, "timeblocks": [] })).expect_err("empty");
        assert_eq!(paths(&err), vec!["timeblocks"]);
    }

    #[test]
    fn missing_or_mistyped_timeblocks_fail() {
        assert_eq!(paths(&run(json!({})).unwrap_err()), vec!["timeblocks"]);
        assert_eq!(
            paths(&run(json!({ "timeblocks": "Monday" })).unwrap_err()),
            vec!["timeblocks"]
        );
        assert_eq!(paths(&run(json!([1, 2])).unwrap_err()), vec!["$"]);
    }

    #[test]
    fn all_field_errors_are_collected() {
        let err = run(json!({
            "metadata": { "term": 3, "extraction_confidence": 1.5 },
            "timeblocks": [
                { "day": "Someday", "start_time": "9am", "subject": "" },
                { "day": "Monday", "start_time": "9:00", "end_time": "10:00",
                  "subject": "PE", "subject_type": "sport", "confidence": -0.1,
                  "notes": ["gym"], "duration_minutes": "sixty" },
                "not a block"
            ]
        }))
        .expect_err("many errors");

        let p = paths(&err);
        for expected in [
            "metadata.term",
            "metadata.extraction_confidence",
            "timeblocks[0].day",
            "timeblocks[0].start_time",
            "timeblocks[0].end_time",
            "timeblocks[0].subject",
            "timeblocks[1].subject_type",
            "timeblocks[1].notes",
            "timeblocks[1].confidence",
            "timeblocks[1].duration_minutes",
            "timeblocks[2]",
        ] {
            assert!(p.contains(&expected), "missing {expected} in {p:?}");
        }
    }

    #[test]
    fn subject_is_preserved_verbatim() {
        let out = run(json!({ "timeblocks": [block("Thu", "11:00", "11:45", "  Maths (Set 2) ")] }))
            .expect("valid");
        assert_eq!(out.result.timeblocks[0].subject, "  Maths (Set 2) ");
        assert_eq!(out.result.timeblocks[0].day, Day::Thursday);
    }

    #[test]
    fn low_confidence_warns() {
        let mut b = block("Monday", "9:00", "10:00", "Latin");
        b["confidence"] = json!(0.2);
        let out = run(json!({
            "metadata": { "extraction_confidence": 0.3 },
            "timeblocks": [b]
        }))
        .expect("valid");
        assert_eq!(
            paths(&out.warnings),
            vec!["timeblocks[0].confidence", "metadata.extraction_confidence"]
        );
    }

    #[test]
    fn missing_metadata_uses_defaults() {
        let out = run(json!({ "timeblocks": [block("Monday", "9:00", "10:00", "Latin")] }))
            .expect("valid");
        assert_eq!(out.result.metadata, TimetableMetadata::default());
        // default 0.5 is not below the 0.5 threshold
        assert!(out.warnings.is_empty());
    }
}

//! Reply parsing: turn the model's text into a JSON object.
//!
//! Even in JSON mode, models occasionally wrap the object in ```json fences or
//! a sentence of prose. One strategy is applied to every provider:
//!
//! 1. Normalise the text (fences, plus BOM and zero-width characters outside
//!    strings)
//! 2. Try a direct parse
//! 3. Otherwise take the first balanced `{ … }` object, string-aware, and
//!    parse that
//!
//! Anything else is a [`ExtractError::ResponseParse`].

use crate::error::ExtractError;
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;

/// Parse the model reply into a JSON object.
pub fn parse_json_reply(reply: &str) -> Result<Value, ExtractError> {
    let cleaned = normalise(reply);
    if cleaned.is_empty() {
        return Err(ExtractError::ResponseParse {
            detail: "model returned an empty response".into(),
        });
    }

    if let Ok(value @ Value::Object(_)) = serde_json::from_str::<Value>(&cleaned) {
        return Ok(value);
    }

    let Some(candidate) = first_object(&cleaned) else {
        return Err(ExtractError::ResponseParse {
            detail: format!("no JSON object found in: {}", preview(&cleaned)),
        });
    };

    serde_json::from_str::<Value>(candidate).map_err(|e| ExtractError::ResponseParse {
        detail: format!("{e} in: {}", preview(candidate)),
    })
}

static RE_FENCES: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)^```[a-zA-Z]*\s*\n(.*?)\n?```\s*$").unwrap());

const INVISIBLE: [char; 5] = ['\u{FEFF}', '\u{200B}', '\u{200C}', '\u{200D}', '\u{2060}'];

fn normalise(input: &str) -> String {
    let stripped = strip_invisible(input);
    let trimmed = stripped.trim();
    match RE_FENCES.captures(trimmed) {
        Some(caps) => caps[1].trim().to_string(),
        None => trimmed.to_string(),
    }
}

/// Drop BOMs and zero-width characters, except inside JSON strings where
/// they belong to the value.
fn strip_invisible(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    let mut in_string = false;
    let mut escaped = false;

    for ch in input.chars() {
        if in_string {
            match ch {
                _ if escaped => escaped = false,
                '\\' => escaped = true,
                '"' => in_string = false,
                _ => {}
            }
            out.push(ch);
            continue;
        }
        if INVISIBLE.contains(&ch) {
            continue;
        }
        if ch == '"' {
            in_string = true;
        }
        out.push(ch);
    }
    out
}

/// Slice of the first balanced brace-delimited object, ignoring braces that
/// appear inside JSON strings.
fn first_object(input: &str) -> Option<&str> {
    let start = input.find('{')?;
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (offset, ch) in input[start..].char_indices() {
        if in_string {
            match ch {
                _ if escaped => escaped = false,
                '\\' => escaped = true,
                '"' => in_string = false,
                _ => {}
            }
            continue;
        }
        match ch {
            '"' => in_string = true,
            '{' => depth += 1,
            '}' => {
                depth -= 1;
                if depth == 0 {
                    return Some(&input[start..start + offset + 1]);
                }
            }
            _ => {}
        }
    }
    None
}

fn preview(s: &str) -> String {
    const MAX: usize = 120;
    match s.char_indices().nth(MAX) {
        Some((idx, _)) => format!("{}…", &s[..idx]),
        None => s.to_string(),
    }
}

use std::borrow::Cow;
use std::fmt;

use serde::{Deserialize, Serialize};

/// A resolved cell value. Columns hold either numbers or text wholesale;
/// the classifier decides which and coerces numeric columns in place.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub enum Value {
    Number(f64),
    Text(String),
}

/// A cell; `None` is missing. Missing cells never participate in type
/// decisions or pattern matching.
pub type Cell = Option<Value>;

impl Value {
    pub fn as_display(&self) -> String {
        match self {
            Value::Number(n) => {
                if n.fract() == 0.0 && n.is_finite() {
                    format!("{n:.0}")
                } else {
                    n.to_string()
                }
            }
            Value::Text(s) => s.clone(),
        }
    }

    /// Textual view of the value for pattern matching.
    pub fn as_text(&self) -> Cow<'_, str> {
        match self {
            Value::Number(_) => Cow::Owned(self.as_display()),
            Value::Text(s) => Cow::Borrowed(s.as_str()),
        }
    }

    pub fn is_number(&self) -> bool {
        matches!(self, Value::Number(_))
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_display())
    }
}

/// Tokens conventionally written for absent answers in exported survey
/// files. Matched case-insensitively after trimming.
pub fn is_missing_token(raw: &str) -> bool {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return true;
    }
    let lowered = trimmed.to_ascii_lowercase();
    matches!(
        lowered.trim_start_matches('#'),
        "na" | "n/a" | "n.a." | "null" | "none" | "nan"
    )
}

/// Whether a string is a digit sequence grouped by commas in the usual
/// thousands style, e.g. `100,364` or `3945`.
///
/// Anything from the last `.` onward is ignored for grouping purposes (the
/// fractional part is validated later by the float parse, not here). A
/// single ungrouped segment may be any number of digits, while a grouped
/// first segment is capped at three; the asymmetry is long-standing and
/// load-bearing for downstream files, so it stays.
pub fn is_grouped_number(raw: &str) -> bool {
    let body = match raw.rfind('.') {
        Some(idx) => &raw[..idx],
        None => raw,
    };
    let all_digits = |s: &str| !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit());
    let parts: Vec<&str> = body.split(',').collect();
    match parts.as_slice() {
        [single] => all_digits(single),
        [first, rest @ ..] => {
            first.len() <= 3
                && all_digits(first)
                && rest.iter().all(|part| part.len() == 3 && all_digits(part))
        }
        [] => false,
    }
}

/// Strip thousands grouping ahead of a float parse.
pub fn strip_grouping(raw: &str) -> Cow<'_, str> {
    if raw.contains(',') {
        Cow::Owned(raw.replace(',', ""))
    } else {
        Cow::Borrowed(raw)
    }
}

/// Float parse with surrounding whitespace tolerated.
pub fn parse_number(raw: &str) -> Option<f64> {
    raw.trim().parse::<f64>().ok()
}

//! Shape predicates used by the column partitioner: link-shaped text,
//! date-parseable text, long text, and the column-name rules for
//! coordinates and geometries.

use std::sync::OnceLock;

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use regex::Regex;

/// Character length above which a single value counts as long free text.
pub const LONG_TEXT_LIMIT: usize = 100;

/// Distinct non-missing values above which a column is tagged long.
pub const HIGH_CARDINALITY_LIMIT: usize = 200;

static LINK_PATTERN: OnceLock<Regex> = OnceLock::new();
static COORDINATE_NAME_PATTERN: OnceLock<Regex> = OnceLock::new();

fn link_pattern() -> &'static Regex {
    LINK_PATTERN.get_or_init(|| {
        Regex::new(
            r"^(http://www\.|https://www\.|http://|https://)?[a-z0-9]+([-.][a-z0-9]+)*\.[a-z]{2,5}(:[0-9]{1,5})?(/.*)?$",
        )
        .expect("link pattern compiles")
    })
}

fn coordinate_name_pattern() -> &'static Regex {
    COORDINATE_NAME_PATTERN.get_or_init(|| {
        Regex::new(r"(?i)^(.*[^a-zA-Z0-9]+)?(lon|longitude|lat|latitude)([^a-zA-Z0-9]+.*)?$")
            .expect("coordinate name pattern compiles")
    })
}

/// Whole-string URL test. The host grammar is lowercase-only on purpose:
/// values are matched as stored, never case-folded here.
pub fn is_link(value: &str) -> bool {
    link_pattern().is_match(value)
}

const DATE_FORMATS: &[&str] = &[
    "%Y-%m-%d",
    "%m/%d/%Y",
    "%d/%m/%Y",
    "%Y/%m/%d",
    "%m-%d-%Y",
    "%d-%m-%Y",
    "%m/%d/%y",
    "%d-%b-%Y",
    "%b-%d-%Y",
];

const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M:%S",
    "%m/%d/%Y %H:%M:%S",
    "%d/%m/%Y %H:%M:%S",
    "%Y-%m-%d %H:%M",
    "%m/%d/%Y %H:%M",
    "%m/%d/%Y %I:%M %p",
];

const TIME_FORMATS: &[&str] = &["%H:%M:%S", "%H:%M", "%I:%M %p"];

/// Date test with a cheap gate: strings carrying none of `-`, `/`, `:` are
/// rejected before any parsing so plain numbers like `1.30` never pass.
pub fn is_date(value: &str) -> bool {
    if !value.contains(['-', '/', ':']) {
        return false;
    }
    let trimmed = value.trim();
    for format in DATE_FORMATS {
        if NaiveDate::parse_from_str(trimmed, format).is_ok() {
            return true;
        }
    }
    for format in DATETIME_FORMATS {
        if NaiveDateTime::parse_from_str(trimmed, format).is_ok() {
            return true;
        }
    }
    for format in TIME_FORMATS {
        if NaiveTime::parse_from_str(trimmed, format).is_ok() {
            return true;
        }
    }
    false
}

/// Per-value length test used by the name-matching side of long detection.
/// Column-level long detection counts distinct values instead; see
/// [`HIGH_CARDINALITY_LIMIT`].
pub fn is_long_text(value: &str) -> bool {
    value.chars().count() > LONG_TEXT_LIMIT
}

/// Name rule for coordinate columns: `lon`/`longitude`/`lat`/`latitude` as
/// a whole word, allowing non-alphanumeric padding on either side.
/// Case-insensitive, applied to base names of numeric columns only.
pub fn is_coordinate_name(base: &str) -> bool {
    coordinate_name_pattern().is_match(base)
}

/// Name rule for geometry columns: literal `geometry` anywhere in the base
/// name of a textual column.
pub fn is_geometry_name(base: &str) -> bool {
    base.contains("geometry")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn link_accepts_bare_and_schemed_hosts() {
        assert!(is_link("www.google.com"));
        assert!(is_link("https://www.fda.gov"));
        assert!(is_link("http://example.org/path/to?query=1"));
        assert!(is_link("sub-domain.example.co:8080/x"));
    }

    #[test]
    fn link_rejects_long_top_labels_and_uppercase() {
        assert!(!is_link("https://badurl.toolong"));
        assert!(!is_link("WWW.GOOGLE.COM"));
        assert!(!is_link("not a url"));
        assert!(!is_link("example"));
    }

    #[test]
    fn date_requires_a_separator_character() {
        assert!(is_date("09/14/1998"));
        assert!(is_date("1998-09-14"));
        assert!(is_date("14:05"));
        assert!(!is_date("1.30"));
        assert!(!is_date("1.12.13"));
        assert!(!is_date("19980914"));
    }

    #[test]
    fn date_parses_common_survey_formats() {
        assert!(is_date("31/12/2020"));
        assert!(is_date("2020-12-31 23:59:59"));
        assert!(is_date("14-Sep-1998"));
        assert!(is_date("12/31/2020 11:59 PM"));
        assert!(!is_date("13-13"));
        assert!(!is_date("A-1"));
    }

    #[test]
    fn long_text_counts_characters_not_bytes() {
        assert!(!is_long_text(&"x".repeat(100)));
        assert!(is_long_text(&"x".repeat(101)));
        assert!(!is_long_text(&"é".repeat(100)));
    }

    #[test]
    fn coordinate_name_matches_whole_words_only() {
        assert!(is_coordinate_name("lat"));
        assert!(is_coordinate_name("Longitude"));
        assert!(is_coordinate_name("start_lon"));
        assert!(is_coordinate_name("LAT (deg)"));
        assert!(!is_coordinate_name("latitude1"));
        assert!(!is_coordinate_name("plat"));
        assert!(!is_coordinate_name("population"));
    }

    #[test]
    fn geometry_name_is_case_sensitive_substring() {
        assert!(is_geometry_name("geometry"));
        assert!(is_geometry_name("parcel geometry wkt"));
        assert!(!is_geometry_name("Geometry"));
        assert!(!is_geometry_name("geo"));
    }
}

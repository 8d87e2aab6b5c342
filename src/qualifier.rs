//! Qualifier vocabulary and tagged column names.
//!
//! The visualization platform reads semantic column types out of the column
//! names themselves: a base name followed by zero or more `#`-prefixed
//! qualifier suffixes, e.g. `population#number#hidden`. The vocabulary is
//! closed; this module owns parsing and rendering of tagged names so the
//! round-trip is lossless.

use std::fmt;
use std::str::FromStr;

use anyhow::bail;
use serde::{Deserialize, Serialize};

/// Delimiter introducing each qualifier suffix inside a column name.
pub const QUALIFIER_DELIMITER: char = '#';

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Qualifier {
    Name,
    Img,
    Href,
    Number,
    Link,
    Ordinal,
    TextLocation,
    Multi,
    Info,
    Date,
    Long,
    Hidden,
    HiddenMore,
}

impl Qualifier {
    pub fn as_str(&self) -> &'static str {
        match self {
            Qualifier::Name => "name",
            Qualifier::Img => "img",
            Qualifier::Href => "href",
            Qualifier::Number => "number",
            Qualifier::Link => "link",
            Qualifier::Ordinal => "ordinal",
            Qualifier::TextLocation => "textlocation",
            Qualifier::Multi => "multi",
            Qualifier::Info => "info",
            Qualifier::Date => "date",
            Qualifier::Long => "long",
            Qualifier::Hidden => "hidden",
            Qualifier::HiddenMore => "hiddenmore",
        }
    }

    /// The suffix form as it appears inside a column name.
    pub fn suffix(&self) -> &'static str {
        match self {
            Qualifier::Name => "#name",
            Qualifier::Img => "#img",
            Qualifier::Href => "#href",
            Qualifier::Number => "#number",
            Qualifier::Link => "#link",
            Qualifier::Ordinal => "#ordinal",
            Qualifier::TextLocation => "#textlocation",
            Qualifier::Multi => "#multi",
            Qualifier::Info => "#info",
            Qualifier::Date => "#date",
            Qualifier::Long => "#long",
            Qualifier::Hidden => "#hidden",
            Qualifier::HiddenMore => "#hiddenmore",
        }
    }

    pub fn variants() -> &'static [Qualifier] {
        &[
            Qualifier::Name,
            Qualifier::Img,
            Qualifier::Href,
            Qualifier::Number,
            Qualifier::Link,
            Qualifier::Ordinal,
            Qualifier::TextLocation,
            Qualifier::Multi,
            Qualifier::Info,
            Qualifier::Date,
            Qualifier::Long,
            Qualifier::Hidden,
            Qualifier::HiddenMore,
        ]
    }

    /// Reserved qualifiers may be assigned to at most one column per table.
    pub fn is_reserved(&self) -> bool {
        matches!(self, Qualifier::Name | Qualifier::Href | Qualifier::Img)
    }

    pub fn describe(&self) -> &'static str {
        match self {
            Qualifier::Name => "row title shown in item headers",
            Qualifier::Img => "image identifier for item thumbnails",
            Qualifier::Href => "hyperlink opened from item headers",
            Qualifier::Number => "numeric variable",
            Qualifier::Link => "URL-valued variable",
            Qualifier::Ordinal => "ordered categorical variable",
            Qualifier::TextLocation => "place name for text-based locating",
            Qualifier::Multi => "multiple-response variable",
            Qualifier::Info => "informational text, excluded from facets",
            Qualifier::Date => "date-valued variable",
            Qualifier::Long => "long free text or high-cardinality variable",
            Qualifier::Hidden => "hidden from the default facet list",
            Qualifier::HiddenMore => "hidden behind the expanded facet list",
        }
    }
}

impl fmt::Display for Qualifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Qualifier {
    type Err = anyhow::Error;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let normalized = value.trim().trim_start_matches(QUALIFIER_DELIMITER);
        for qualifier in Qualifier::variants() {
            if normalized == qualifier.as_str() {
                return Ok(*qualifier);
            }
        }
        bail!("Unknown qualifier '{value}'");
    }
}

/// A column name split into its base name and qualifier suffixes.
///
/// Parsing only succeeds when every `#`-introduced segment is a vocabulary
/// entry; otherwise the whole string is treated as an untagged base name.
/// `render` reconstructs the exact original string.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QualifiedName {
    pub base: String,
    pub qualifiers: Vec<Qualifier>,
}

impl QualifiedName {
    pub fn parse(name: &str) -> Self {
        let mut segments = name.split(QUALIFIER_DELIMITER);
        let base = segments.next().unwrap_or_default().to_string();
        let mut qualifiers = Vec::new();
        for segment in segments {
            match segment.parse::<Qualifier>() {
                Ok(qualifier) => qualifiers.push(qualifier),
                Err(_) => {
                    // A stray '#' that is not a vocabulary suffix makes the
                    // whole string an untagged base name.
                    return QualifiedName {
                        base: name.to_string(),
                        qualifiers: Vec::new(),
                    };
                }
            }
        }
        QualifiedName { base, qualifiers }
    }

    pub fn render(&self) -> String {
        let mut rendered = self.base.clone();
        for qualifier in &self.qualifiers {
            rendered.push_str(qualifier.suffix());
        }
        rendered
    }

    pub fn is_tagged(&self) -> bool {
        !self.qualifiers.is_empty()
    }
}

/// Base name of a column: everything before the first delimiter.
pub fn base_name(name: &str) -> &str {
    name.split(QUALIFIER_DELIMITER)
        .next()
        .unwrap_or_default()
}

/// True when the name ends with any vocabulary suffix. Used to detect tables
/// that have already been through a classification pass.
pub fn ends_with_qualifier(name: &str) -> bool {
    Qualifier::variants()
        .iter()
        .any(|qualifier| name.ends_with(qualifier.suffix()))
}

//! Qualifier inference: the per-column type pass and the precedence-ordered
//! partition that turns value kinds and name shapes into qualifier tags.
//!
//! The partition is greedy and order-dependent on purpose: link beats date,
//! date beats geometry, geometry beats long, and coordinate-named numeric
//! columns beat plain number. Each step only sees columns no earlier step
//! claimed, so a column acquires exactly one tag set per pass.

use std::borrow::Cow;
use std::collections::{BTreeMap, HashMap};

use log::{debug, info};
use serde::{Deserialize, Serialize};

use crate::data::{Value, is_grouped_number, parse_number, strip_grouping};
use crate::frame::{Column, Frame};
use crate::patterns;
use crate::qualifier::{self, Qualifier};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ValueKind {
    Numeric,
    Textual,
}

impl ValueKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ValueKind::Numeric => "numeric",
            ValueKind::Textual => "textual",
        }
    }
}

/// Value kinds keyed by current column name. Rebuilt by every
/// classification pass and re-keyed when columns are renamed.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct TypeRegistry {
    kinds: BTreeMap<String, ValueKind>,
}

impl TypeRegistry {
    pub fn insert(&mut self, name: impl Into<String>, kind: ValueKind) {
        self.kinds.insert(name.into(), kind);
    }

    pub fn kind_of(&self, name: &str) -> Option<ValueKind> {
        self.kinds.get(name).copied()
    }

    pub fn rename(&mut self, old: &str, new: &str) {
        if let Some(kind) = self.kinds.remove(old) {
            self.kinds.insert(new.to_string(), kind);
        }
    }

    pub fn remove(&mut self, name: &str) {
        self.kinds.remove(name);
    }

    pub fn len(&self) -> usize {
        self.kinds.len()
    }

    pub fn is_empty(&self) -> bool {
        self.kinds.is_empty()
    }
}

/// Decide numeric or textual from the distinct non-missing values, without
/// touching the cells. A column with no values at all is vacuously numeric.
///
/// Comma-grouped digit strings only count as numeric when every distinct
/// value is grouped that way; the grouping is stripped before the float
/// gate so `1,629` converts while `1,3672` stays text.
pub fn decide_column_kind(column: &Column) -> ValueKind {
    let distinct = column.distinct_non_missing();
    if distinct.is_empty() {
        return ValueKind::Numeric;
    }
    let strip = distinct.iter().all(|value| is_grouped_number(value));
    let numeric = distinct.iter().all(|value| {
        let candidate = if strip {
            strip_grouping(value)
        } else {
            Cow::Borrowed(value.as_str())
        };
        parse_number(&candidate).is_some()
    });
    if numeric {
        ValueKind::Numeric
    } else {
        ValueKind::Textual
    }
}

/// Coerce every non-missing cell of a numeric-decided column to a number.
/// Cells that refuse to parse are left alone; the decision already ruled
/// that out for well-formed columns.
fn coerce_numeric(column: &mut Column) {
    for cell in &mut column.cells {
        if let Some(value) = cell {
            let parsed = {
                let text = value.as_text();
                parse_number(&strip_grouping(&text))
            };
            if let Some(number) = parsed {
                *value = Value::Number(number);
            }
        }
    }
}

/// Matcher strategy for one partition step.
#[derive(Debug, Clone, Copy)]
pub enum ColumnRule {
    /// Every distinct non-missing value satisfies the predicate.
    EveryValue(fn(&str) -> bool),
    /// Distinct non-missing count exceeds [`patterns::HIGH_CARDINALITY_LIMIT`].
    HighCardinality,
    /// Base name looks like a coordinate column.
    CoordinateName,
    /// Base name names a geometry column.
    GeometryName,
}

/// Candidate column names that satisfy a rule, in candidate order.
pub fn matching_columns(frame: &Frame, candidates: &[String], rule: ColumnRule) -> Vec<String> {
    let mut found = Vec::new();
    for name in candidates {
        let Some(column) = frame.column(name) else {
            continue;
        };
        let matched = match rule {
            ColumnRule::EveryValue(predicate) => {
                let distinct = column.distinct_non_missing();
                !distinct.is_empty() && distinct.iter().all(|value| predicate(value))
            }
            ColumnRule::HighCardinality => {
                column.distinct_non_missing().len() > patterns::HIGH_CARDINALITY_LIMIT
            }
            ColumnRule::CoordinateName => patterns::is_coordinate_name(qualifier::base_name(name)),
            ColumnRule::GeometryName => patterns::is_geometry_name(qualifier::base_name(name)),
        };
        if matched {
            found.push(name.clone());
        }
    }
    found
}

fn claim(frame: &Frame, pool: &mut Vec<String>, rule: ColumnRule) -> Vec<String> {
    let matched = matching_columns(frame, pool, rule);
    pool.retain(|name| !matched.contains(name));
    matched
}

/// Result of one classification pass.
#[derive(Debug, Clone)]
pub struct Classification {
    /// Old name to tagged name, applied to the frame in one pass.
    pub renames: HashMap<String, String>,
    /// Value kinds keyed by post-rename names.
    pub registry: TypeRegistry,
    /// True when existing tags short-circuited the pass.
    pub short_circuited: bool,
}

/// Run the full inference pass over a frame: type-coerce columns, partition
/// them into qualifier classes, and rename in place.
///
/// A table whose column names already carry qualifier suffixes has been
/// through this before; it is returned untouched (no coercion, no renames)
/// and only the registry is rebuilt from the current names.
pub fn classify_frame(frame: &mut Frame) -> Classification {
    if frame
        .columns
        .iter()
        .any(|column| qualifier::ends_with_qualifier(&column.name))
    {
        let mut registry = TypeRegistry::default();
        for column in &frame.columns {
            registry.insert(column.name.clone(), decide_column_kind(column));
        }
        info!("Column names already carry qualifiers; classification skipped");
        return Classification {
            renames: HashMap::new(),
            registry,
            short_circuited: true,
        };
    }

    let mut registry = TypeRegistry::default();
    let mut numeric: Vec<String> = Vec::new();
    let mut textual: Vec<String> = Vec::new();
    for column in &mut frame.columns {
        let kind = decide_column_kind(column);
        registry.insert(column.name.clone(), kind);
        match kind {
            ValueKind::Numeric => {
                coerce_numeric(column);
                numeric.push(column.name.clone());
            }
            ValueKind::Textual => textual.push(column.name.clone()),
        }
    }
    debug!(
        "Type pass: {} numeric, {} textual column(s)",
        numeric.len(),
        textual.len()
    );

    let link_columns = claim(frame, &mut textual, ColumnRule::EveryValue(patterns::is_link));
    let date_columns = claim(frame, &mut textual, ColumnRule::EveryValue(patterns::is_date));
    let geometry_columns = claim(frame, &mut textual, ColumnRule::GeometryName);
    let long_columns = claim(frame, &mut textual, ColumnRule::HighCardinality);
    let coordinate_columns = claim(frame, &mut numeric, ColumnRule::CoordinateName);
    let number_columns = std::mem::take(&mut numeric);

    let mut renames = HashMap::new();
    tag_columns(&mut renames, &number_columns, &[Qualifier::Number]);
    tag_columns(&mut renames, &link_columns, &[Qualifier::Link]);
    tag_columns(&mut renames, &date_columns, &[Qualifier::Date]);
    tag_columns(&mut renames, &long_columns, &[Qualifier::Long]);
    tag_columns(&mut renames, &geometry_columns, &[Qualifier::HiddenMore]);
    tag_columns(
        &mut renames,
        &coordinate_columns,
        &[Qualifier::Number, Qualifier::Hidden],
    );

    frame.rename_columns(&renames);
    for (old, new) in &renames {
        registry.rename(old, new);
    }

    info!(
        "Classified {} column(s): {} number, {} link, {} date, {} long, {} geometry, {} coordinate, {} categorical",
        frame.width(),
        number_columns.len(),
        link_columns.len(),
        date_columns.len(),
        long_columns.len(),
        geometry_columns.len(),
        coordinate_columns.len(),
        textual.len()
    );

    Classification {
        renames,
        registry,
        short_circuited: false,
    }
}

fn tag_columns(renames: &mut HashMap<String, String>, names: &[String], tags: &[Qualifier]) {
    for name in names {
        let mut tagged = name.clone();
        for tag in tags {
            tagged.push_str(tag.suffix());
        }
        renames.insert(name.clone(), tagged);
    }
}

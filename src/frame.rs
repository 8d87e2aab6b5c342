//! In-memory table model: named columns over labelled rows.
//!
//! Row labels are assigned once when a file is loaded and survive row drops
//! with holes, so drop targets stay addressable the way the user last saw
//! them. Only `export` renumbers. Column names are unique at all times;
//! loaders and the header merge de-duplicate instead of failing.

use std::collections::{HashMap, HashSet};

use itertools::Itertools;
use log::debug;
use serde::{Deserialize, Serialize};

use crate::data::{Cell, Value, is_missing_token};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Column {
    pub name: String,
    pub cells: Vec<Cell>,
}

impl Column {
    pub fn new(name: impl Into<String>, cells: Vec<Cell>) -> Self {
        Column {
            name: name.into(),
            cells,
        }
    }

    /// Distinct non-missing values in first-seen order, as text.
    pub fn distinct_non_missing(&self) -> Vec<String> {
        self.cells
            .iter()
            .flatten()
            .map(|value| value.as_text().into_owned())
            .unique()
            .collect()
    }

    pub fn is_all_missing(&self) -> bool {
        self.cells.iter().all(Option::is_none)
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Frame {
    pub columns: Vec<Column>,
    pub labels: Vec<u64>,
}

impl Frame {
    /// Build a frame from decoded records: first row is the header, missing
    /// tokens become empty cells, then fully-empty columns and rows are
    /// pruned (columns first). Labels are assigned before pruning so later
    /// row drops address what the file contained.
    pub fn from_records(headers: &[String], records: &[Vec<String>]) -> Self {
        let names = unique_column_names(headers);
        let mut columns: Vec<Column> = names
            .into_iter()
            .map(|name| Column::new(name, Vec::with_capacity(records.len())))
            .collect();
        for record in records {
            for (idx, column) in columns.iter_mut().enumerate() {
                let raw = record.get(idx).map(String::as_str).unwrap_or_default();
                if is_missing_token(raw) {
                    column.cells.push(None);
                } else {
                    column.cells.push(Some(Value::Text(raw.to_string())));
                }
            }
        }
        let mut frame = Frame {
            columns,
            labels: (0..records.len() as u64).collect(),
        };
        frame.prune_empty();
        frame
    }

    fn prune_empty(&mut self) {
        let before = self.columns.len();
        self.columns.retain(|column| !column.is_all_missing());
        if self.columns.len() < before {
            debug!("Pruned {} all-missing column(s)", before - self.columns.len());
        }
        if self.columns.is_empty() {
            self.labels.clear();
            return;
        }
        let keep: Vec<bool> = (0..self.height())
            .map(|row| self.columns.iter().any(|column| column.cells[row].is_some()))
            .collect();
        if keep.iter().all(|flag| *flag) {
            return;
        }
        debug!(
            "Pruned {} all-missing row(s)",
            keep.iter().filter(|flag| !**flag).count()
        );
        self.retain_rows(|row, _| keep[row]);
    }

    pub fn height(&self) -> usize {
        self.columns.first().map_or(0, |column| column.cells.len())
    }

    pub fn width(&self) -> usize {
        self.columns.len()
    }

    pub fn column_names(&self) -> Vec<String> {
        self.columns.iter().map(|column| column.name.clone()).collect()
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|column| column.name == name)
    }

    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|column| column.name == name)
    }

    pub fn has_label(&self, label: u64) -> bool {
        self.labels.contains(&label)
    }

    /// Rename columns through a mapping; names absent from the mapping are
    /// left alone.
    pub fn rename_columns(&mut self, mapping: &HashMap<String, String>) {
        for column in &mut self.columns {
            if let Some(new_name) = mapping.get(&column.name) {
                column.name = new_name.clone();
            }
        }
    }

    pub fn insert_column(&mut self, index: usize, column: Column) {
        self.columns.insert(index.min(self.columns.len()), column);
    }

    pub fn drop_column_at(&mut self, index: usize) {
        if index < self.columns.len() {
            self.columns.remove(index);
        }
    }

    /// Drop every row whose label falls in `lower..=upper`.
    pub fn drop_label_range(&mut self, lower: u64, upper: u64) {
        self.retain_rows(|_, label| label < lower || label > upper);
    }

    fn retain_rows(&mut self, keep: impl Fn(usize, u64) -> bool) {
        let flags: Vec<bool> = self
            .labels
            .iter()
            .enumerate()
            .map(|(row, label)| keep(row, *label))
            .collect();
        for column in &mut self.columns {
            let mut row = 0;
            column.cells.retain(|_| {
                let kept = flags[row];
                row += 1;
                kept
            });
        }
        let mut row = 0;
        self.labels.retain(|_| {
            let kept = flags[row];
            row += 1;
            kept
        });
    }

    /// Rebuild column names by merging the first `header_rows - 1` data rows
    /// into the stored names, then slice those rows off. The merge joins the
    /// stored name with each consumed cell (missing cells join as empty
    /// strings, preserving the spacing the platform expects).
    pub fn with_merged_headers(original: &Frame, header_rows: usize) -> Frame {
        let consumed = header_rows.saturating_sub(1).min(original.height());
        let names: Vec<String> = original
            .columns
            .iter()
            .map(|column| {
                let mut parts = vec![column.name.clone()];
                for row in 0..consumed {
                    let cell = &column.cells[row];
                    parts.push(cell.as_ref().map(Value::as_display).unwrap_or_default());
                }
                parts.join(" ")
            })
            .collect();
        let names = unique_column_names(&names);
        let columns = original
            .columns
            .iter()
            .zip(names)
            .map(|(column, name)| Column::new(name, column.cells[consumed..].to_vec()))
            .collect();
        Frame {
            columns,
            labels: original.labels[consumed..].to_vec(),
        }
    }

    /// Read-only window used by the preview renderer.
    pub fn window(&self, row_start: usize, col_start: usize, rows: usize, cols: usize) -> Window {
        let row_end = (row_start + rows).min(self.height());
        let col_end = (col_start + cols).min(self.width());
        let row_range = row_start.min(row_end)..row_end;
        let col_range = col_start.min(col_end)..col_end;
        let headers = self.columns[col_range.clone()]
            .iter()
            .map(|column| column.name.clone())
            .collect();
        let labels = self.labels[row_range.clone()].to_vec();
        let cells = row_range
            .map(|row| {
                self.columns[col_range.clone()]
                    .iter()
                    .map(|column| {
                        column.cells[row]
                            .as_ref()
                            .map(Value::as_display)
                            .unwrap_or_default()
                    })
                    .collect()
            })
            .collect();
        Window {
            headers,
            labels,
            cells,
        }
    }

    /// Header plus rows rendered for serialization; missing cells become
    /// empty fields and labels are left behind.
    pub fn to_records(&self) -> (Vec<String>, Vec<Vec<String>>) {
        let headers = self.column_names();
        let rows = (0..self.height())
            .map(|row| {
                self.columns
                    .iter()
                    .map(|column| {
                        column.cells[row]
                            .as_ref()
                            .map(Value::as_display)
                            .unwrap_or_default()
                    })
                    .collect()
            })
            .collect();
        (headers, rows)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Window {
    pub headers: Vec<String>,
    pub labels: Vec<u64>,
    pub cells: Vec<Vec<String>>,
}

/// Replace blank names with positional placeholders and suffix repeats so
/// the unique-name invariant holds from the moment a frame exists. Names
/// are otherwise kept verbatim, surrounding whitespace included.
pub fn unique_column_names(raw: &[String]) -> Vec<String> {
    let mut seen: HashSet<String> = HashSet::new();
    raw.iter()
        .enumerate()
        .map(|(idx, name)| {
            let base = if name.trim().is_empty() {
                format!("field_{idx}")
            } else {
                name.clone()
            };
            let mut candidate = base.clone();
            let mut suffix = 1;
            while !seen.insert(candidate.clone()) {
                candidate = format!("{base}_{suffix}");
                suffix += 1;
            }
            candidate
        })
        .collect()
}

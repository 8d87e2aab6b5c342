//! Coordinate resolution: attach latitude and longitude columns by
//! matching a location column against a lookup table.
//!
//! The lookup file is delimited text with `location`, `latitude`, and
//! `longitude` columns (header match is case-insensitive, location match
//! is exact). Locations without an entry and missing values both produce
//! missing coordinates.

use std::collections::HashMap;
use std::path::Path;

use anyhow::{Context, Result, anyhow};
use log::debug;

use crate::classify::ValueKind;
use crate::data::{Value, parse_number};
use crate::frame::{Column, Frame};
use crate::io_utils;
use crate::session::EditError;

pub const LATITUDE_COLUMN: &str = "latitude#number#hidden";
pub const LONGITUDE_COLUMN: &str = "longitude#number#hidden";

/// Suffix that marks a column as holding hidden coordinate numbers.
const COORDINATE_SUFFIX: &str = "#number#hidden";

#[derive(Debug, Default)]
pub struct CoordinateLookup {
    entries: HashMap<String, (f64, f64)>,
}

impl CoordinateLookup {
    pub fn from_path(
        path: &Path,
        delimiter: Option<u8>,
        encoding_label: Option<&str>,
    ) -> Result<Self> {
        let delimiter = io_utils::resolve_input_delimiter(path, delimiter);
        let encoding = io_utils::resolve_encoding(encoding_label)?;
        let text = io_utils::read_decoded(path, encoding)
            .with_context(|| format!("Reading lookup file {path:?}"))?;
        let (headers, rows) = io_utils::parse_table(&text, delimiter)?;

        let position = |name: &str| {
            headers
                .iter()
                .position(|header| header.trim().eq_ignore_ascii_case(name))
                .ok_or_else(|| anyhow!("Lookup file {path:?} has no '{name}' column"))
        };
        let location = position("location")?;
        let latitude = position("latitude")?;
        let longitude = position("longitude")?;

        let mut entries = HashMap::new();
        for row in &rows {
            let coords = (
                row.get(latitude).and_then(|cell| parse_number(cell)),
                row.get(longitude).and_then(|cell| parse_number(cell)),
            );
            let (Some(lat), Some(lon)) = coords else {
                debug!("Skipping lookup row without numeric coordinates: {row:?}");
                continue;
            };
            entries.insert(row[location].clone(), (lat, lon));
        }
        Ok(CoordinateLookup { entries })
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn coordinates_for(&self, location: &str) -> Option<(f64, f64)> {
        self.entries.get(location).copied()
    }
}

/// Coordinate columns may only be attached once per table.
pub fn ensure_no_coordinates(frame: &Frame) -> Result<(), EditError> {
    if frame
        .column_names()
        .iter()
        .any(|name| name.contains(COORDINATE_SUFFIX))
    {
        return Err(EditError::CoordinatesExist);
    }
    Ok(())
}

/// Build the latitude and longitude columns for `column`, in that order.
pub fn coordinate_columns(
    frame: &Frame,
    column: &str,
    lookup: &CoordinateLookup,
) -> Result<Vec<(Column, ValueKind)>> {
    ensure_no_coordinates(frame)?;
    let source = frame
        .column(column)
        .ok_or_else(|| anyhow!("Unknown column '{column}'"))?;

    let mut latitudes = Vec::with_capacity(source.cells.len());
    let mut longitudes = Vec::with_capacity(source.cells.len());
    for cell in &source.cells {
        match cell
            .as_ref()
            .and_then(|value| lookup.coordinates_for(&value.as_text()))
        {
            Some((lat, lon)) => {
                latitudes.push(Some(Value::Number(lat)));
                longitudes.push(Some(Value::Number(lon)));
            }
            None => {
                latitudes.push(None);
                longitudes.push(None);
            }
        }
    }
    Ok(vec![
        (Column::new(LATITUDE_COLUMN, latitudes), ValueKind::Numeric),
        (Column::new(LONGITUDE_COLUMN, longitudes), ValueKind::Numeric),
    ])
}

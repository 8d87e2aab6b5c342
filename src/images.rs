//! Image identifiers: derive portable slugs from a text column so the
//! platform can pair each answer with a pre-rendered image tile.

use std::path::Path;

use anyhow::{Context, Result, anyhow};
use itertools::Itertools;

use crate::data::Value;
use crate::frame::{Column, Frame};
use crate::qualifier::{Qualifier, base_name};

/// Marker identifier used where the source value is missing.
pub const MISSING_IMAGE: &str = "image_not_available";

/// Default tile variant suffix appended to every generated identifier.
const VARIANT_SUFFIX: &str = "_o";

/// Turn answer text into a filesystem-safe identifier: path and shell
/// metacharacters are removed, spaces and dots become underscores, and
/// the tile variant suffix is appended.
pub fn image_slug(text: &str) -> String {
    let mut slug = String::with_capacity(text.len() + VARIANT_SUFFIX.len());
    for ch in text.chars() {
        match ch {
            '\\' | '/' | '*' | '?' | ':' | '"' | '<' | '>' | '|' => {}
            ' ' | '.' => slug.push('_'),
            other => slug.push(other),
        }
    }
    slug.push_str(VARIANT_SUFFIX);
    slug
}

/// Build the `<base>#img` column for `column`: one slug per value, the
/// missing marker where the value is missing.
pub fn image_column(frame: &Frame, column: &str) -> Result<Column> {
    let source = frame
        .column(column)
        .ok_or_else(|| anyhow!("Unknown column '{column}'"))?;
    let name = format!("{}{}", base_name(column), Qualifier::Img.suffix());
    let cells = source
        .cells
        .iter()
        .map(|cell| {
            let slug = match cell {
                Some(value) => image_slug(&value.as_text()),
                None => MISSING_IMAGE.to_string(),
            };
            Some(Value::Text(slug))
        })
        .collect();
    Ok(Column::new(name, cells))
}

/// Distinct `(identifier, source text)` pairs in first-seen order, for the
/// external tile renderer. Missing values contribute the marker paired
/// with empty text.
pub fn image_manifest(frame: &Frame, column: &str) -> Result<Vec<(String, String)>> {
    let source = frame
        .column(column)
        .ok_or_else(|| anyhow!("Unknown column '{column}'"))?;
    Ok(source
        .cells
        .iter()
        .map(|cell| match cell {
            Some(value) => (image_slug(&value.as_text()), value.as_text().into_owned()),
            None => (MISSING_IMAGE.to_string(), String::new()),
        })
        .unique()
        .collect())
}

pub fn write_manifest(entries: &[(String, String)], path: &Path) -> Result<()> {
    let mut writer = csv::WriterBuilder::new()
        .from_path(path)
        .with_context(|| format!("Creating manifest file {path:?}"))?;
    writer.write_record(["image", "text"])?;
    for (slug, text) in entries {
        writer.write_record([slug.as_str(), text.as_str()])?;
    }
    writer.flush().context("Flushing manifest")?;
    Ok(())
}

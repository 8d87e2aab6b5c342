//! Column catalog: positions, base names, qualifier suffixes, and inferred
//! kinds for every column of a frame, rendered as a terminal table or a
//! YAML report.

use std::fs::File;
use std::path::Path;

use anyhow::{Context, Result};
use serde::Serialize;

use crate::classify::TypeRegistry;
use crate::frame::Frame;
use crate::qualifier::QualifiedName;
use crate::table::render_table;

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ColumnEntry {
    pub position: usize,
    pub name: String,
    pub base: String,
    pub qualifiers: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    pub distinct: usize,
    pub missing: usize,
}

#[derive(Debug, Serialize)]
pub struct CatalogReport {
    pub source: String,
    pub rows: usize,
    pub columns: Vec<ColumnEntry>,
}

pub fn build_catalog(frame: &Frame, registry: &TypeRegistry) -> Vec<ColumnEntry> {
    frame
        .columns
        .iter()
        .enumerate()
        .map(|(position, column)| {
            let parsed = QualifiedName::parse(&column.name);
            let missing = column.cells.iter().filter(|cell| cell.is_none()).count();
            ColumnEntry {
                position,
                name: column.name.clone(),
                base: parsed.base,
                qualifiers: parsed
                    .qualifiers
                    .iter()
                    .map(|qualifier| qualifier.suffix().to_string())
                    .collect(),
                kind: registry
                    .kind_of(&column.name)
                    .map(|kind| kind.as_str().to_string()),
                distinct: column.distinct_non_missing().len(),
                missing,
            }
        })
        .collect()
}

pub fn render_catalog(entries: &[ColumnEntry]) -> String {
    let headers: Vec<String> = ["#", "name", "base", "qualifiers", "kind", "distinct", "missing"]
        .iter()
        .map(|h| h.to_string())
        .collect();
    let rows: Vec<Vec<String>> = entries
        .iter()
        .map(|entry| {
            vec![
                entry.position.to_string(),
                entry.name.clone(),
                entry.base.clone(),
                entry.qualifiers.join(" "),
                entry.kind.clone().unwrap_or_default(),
                entry.distinct.to_string(),
                entry.missing.to_string(),
            ]
        })
        .collect();
    render_table(&headers, &rows)
}

pub fn yaml_report(report: &CatalogReport) -> Result<String> {
    serde_yaml::to_string(report).context("Serializing column report to YAML")
}

pub fn write_yaml_report(report: &CatalogReport, path: &Path) -> Result<()> {
    let file = File::create(path).with_context(|| format!("Creating report file {path:?}"))?;
    serde_yaml::to_writer(file, report).context("Writing column report YAML")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classify::classify_frame;

    fn sample_frame() -> (Frame, TypeRegistry) {
        let headers: Vec<String> = ["city", "pop"].iter().map(|h| h.to_string()).collect();
        let rows: Vec<Vec<String>> = vec![
            vec!["Lima".into(), "1,234".into()],
            vec!["".into(), "567".into()],
        ];
        let mut frame = Frame::from_records(&headers, &rows);
        let outcome = classify_frame(&mut frame);
        (frame, outcome.registry)
    }

    #[test]
    fn catalog_decomposes_names_and_counts() {
        let (frame, registry) = sample_frame();
        let entries = build_catalog(&frame, &registry);
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].name, "city");
        assert_eq!(entries[0].base, "city");
        assert!(entries[0].qualifiers.is_empty());
        assert_eq!(entries[0].kind.as_deref(), Some("textual"));
        assert_eq!(entries[0].distinct, 1);
        assert_eq!(entries[0].missing, 1);

        assert_eq!(entries[1].name, "pop#number");
        assert_eq!(entries[1].base, "pop");
        assert_eq!(entries[1].qualifiers, vec!["#number"]);
        assert_eq!(entries[1].kind.as_deref(), Some("numeric"));
        assert_eq!(entries[1].missing, 0);
    }

    #[test]
    fn yaml_report_includes_positions_and_kinds() {
        let (frame, registry) = sample_frame();
        let report = CatalogReport {
            source: "survey.csv".to_string(),
            rows: frame.height(),
            columns: build_catalog(&frame, &registry),
        };
        let yaml = yaml_report(&report).unwrap();
        assert!(yaml.contains("source: survey.csv"));
        assert!(yaml.contains("pop#number"));
        assert!(yaml.contains("kind: numeric"));
    }
}

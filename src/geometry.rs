//! GeoJSON matching: feature geometries converted to WKT and attached to
//! rows by matching a frame column against a feature property.
//!
//! Matching is case-insensitive on both sides. Features with an empty
//! geometry are skipped. Rows without a match get an empty text cell so
//! they stay distinguishable from rows whose value was missing outright.

use std::collections::HashMap;

use anyhow::{Context, Result, anyhow};
use log::debug;
use serde_json::Value as Json;

use crate::data::Value;
use crate::frame::{Column, Frame};

/// Name of the appended geometry column. Tagged at creation so the
/// platform hides the raw WKT from browsing views.
pub const GEOMETRY_COLUMN: &str = "geometry#hiddenmore";

/// WKT strings keyed by lowercased property value.
#[derive(Debug, Default)]
pub struct GeometryIndex {
    geometries: HashMap<String, String>,
}

impl GeometryIndex {
    /// Build an index from GeoJSON text, keying each feature's WKT by the
    /// given property. Features without the property, without usable
    /// coordinates, or with a null property value are skipped.
    pub fn from_geojson(text: &str, property: &str) -> Result<Self> {
        let parsed: Json = serde_json::from_str(text).context("Parsing GeoJSON")?;
        let features = parsed
            .get("features")
            .and_then(Json::as_array)
            .ok_or_else(|| anyhow!("GeoJSON input has no feature collection"))?;

        let mut geometries = HashMap::new();
        for feature in features {
            let Some(wkt) = feature.get("geometry").and_then(wkt_from_geometry) else {
                continue;
            };
            let Some(value) = feature
                .get("properties")
                .and_then(|properties| properties.get(property))
                .and_then(property_text)
            else {
                debug!("Skipping feature without usable property '{property}'");
                continue;
            };
            geometries.insert(value.to_lowercase(), wkt);
        }
        Ok(GeometryIndex { geometries })
    }

    pub fn len(&self) -> usize {
        self.geometries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.geometries.is_empty()
    }

    pub fn wkt_for(&self, value: &str) -> Option<&str> {
        self.geometries.get(&value.to_lowercase()).map(String::as_str)
    }
}

/// Property keys of the first feature, for interactive discovery.
pub fn property_names(text: &str) -> Result<Vec<String>> {
    let parsed: Json = serde_json::from_str(text).context("Parsing GeoJSON")?;
    let first = parsed
        .get("features")
        .and_then(Json::as_array)
        .and_then(|features| features.first())
        .ok_or_else(|| anyhow!("GeoJSON input has no features"))?;
    Ok(first
        .get("properties")
        .and_then(Json::as_object)
        .map(|properties| properties.keys().cloned().collect())
        .unwrap_or_default())
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatchReport {
    pub column: String,
    pub matched: usize,
    pub total: usize,
}

impl std::fmt::Display for MatchReport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} of {} values in '{}' have a geometry.",
            self.matched, self.total, self.column
        )
    }
}

/// Count how many rows of `column` have a geometry in the index. The
/// total counts every row, missing values included.
pub fn count_matches(frame: &Frame, column: &str, index: &GeometryIndex) -> Result<MatchReport> {
    let source = frame
        .column(column)
        .ok_or_else(|| anyhow!("Unknown column '{column}'"))?;
    let matched = source
        .cells
        .iter()
        .flatten()
        .filter(|value| index.wkt_for(&value.as_text()).is_some())
        .count();
    Ok(MatchReport {
        column: column.to_string(),
        matched,
        total: frame.height(),
    })
}

/// Build the geometry column for `column`: WKT for matches, an empty text
/// cell for misses, and a missing cell where the value was missing.
pub fn geometry_column(frame: &Frame, column: &str, index: &GeometryIndex) -> Result<Column> {
    let source = frame
        .column(column)
        .ok_or_else(|| anyhow!("Unknown column '{column}'"))?;
    let cells = source
        .cells
        .iter()
        .map(|cell| {
            cell.as_ref().map(|value| {
                let text = value.as_text();
                match index.wkt_for(&text) {
                    Some(wkt) => Value::Text(wkt.to_string()),
                    None => Value::Text(String::new()),
                }
            })
        })
        .collect();
    Ok(Column::new(GEOMETRY_COLUMN, cells))
}

/// Render a GeoJSON geometry as WKT. Numeric leaf arrays become
/// space-separated positions, nested arrays become parenthesized lists,
/// and a bare point position gains its outer parentheses.
fn wkt_from_geometry(geometry: &Json) -> Option<String> {
    let kind = geometry.get("type")?.as_str()?;
    if kind.eq_ignore_ascii_case("GeometryCollection") {
        let parts: Vec<String> = geometry
            .get("geometries")?
            .as_array()?
            .iter()
            .filter_map(wkt_from_geometry)
            .collect();
        if parts.is_empty() {
            return None;
        }
        return Some(format!("GEOMETRYCOLLECTION ({})", parts.join(", ")));
    }
    let body = render_node(geometry.get("coordinates")?)?;
    let body = if body.starts_with('(') {
        body
    } else {
        format!("({body})")
    };
    Some(format!("{} {}", kind.to_ascii_uppercase(), body))
}

fn render_node(node: &Json) -> Option<String> {
    let items = node.as_array()?;
    if items.is_empty() {
        return None;
    }
    if items.iter().all(Json::is_number) {
        let ordinates: Vec<String> = items.iter().map(Json::to_string).collect();
        Some(ordinates.join(" "))
    } else {
        let parts: Vec<String> = items
            .iter()
            .map(render_node)
            .collect::<Option<Vec<_>>>()?;
        Some(format!("({})", parts.join(", ")))
    }
}

fn property_text(value: &Json) -> Option<String> {
    match value {
        Json::String(text) => Some(text.clone()),
        Json::Number(number) => Some(number.to_string()),
        Json::Bool(flag) => Some(flag.to_string()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const GEOJSON: &str = r#"{
        "type": "FeatureCollection",
        "features": [
            {
                "type": "Feature",
                "properties": {"NAME": "Lima", "code": 14},
                "geometry": {"type": "Point", "coordinates": [-77.03, -12.04]}
            },
            {
                "type": "Feature",
                "properties": {"NAME": "Cusco", "code": 8},
                "geometry": {
                    "type": "Polygon",
                    "coordinates": [[[-72.0, -13.5], [-71.9, -13.5], [-71.9, -13.4], [-72.0, -13.5]]]
                }
            },
            {
                "type": "Feature",
                "properties": {"NAME": "Empty", "code": 0},
                "geometry": {"type": "LineString", "coordinates": []}
            },
            {
                "type": "Feature",
                "properties": {"NAME": null, "code": 1},
                "geometry": {"type": "Point", "coordinates": [0.0, 0.0]}
            }
        ]
    }"#;

    fn sample_frame() -> Frame {
        let headers: Vec<String> = vec!["city".to_string(), "note".to_string()];
        let rows: Vec<Vec<String>> = vec![
            vec!["LIMA".into(), "a".into()],
            vec!["Cusco".into(), "b".into()],
            vec!["Arequipa".into(), "c".into()],
            vec!["".into(), "d".into()],
        ];
        Frame::from_records(&headers, &rows)
    }

    #[test]
    fn index_skips_empty_geometries_and_null_properties() {
        let index = GeometryIndex::from_geojson(GEOJSON, "NAME").unwrap();
        assert_eq!(index.len(), 2);
        assert_eq!(index.wkt_for("lima"), Some("POINT (-77.03 -12.04)"));
        assert!(index.wkt_for("empty").is_none());
    }

    #[test]
    fn polygons_render_with_nested_rings() {
        let index = GeometryIndex::from_geojson(GEOJSON, "NAME").unwrap();
        assert_eq!(
            index.wkt_for("CUSCO"),
            Some(
                "POLYGON ((-72.0 -13.5, -71.9 -13.5, -71.9 -13.4, -72.0 -13.5))"
            )
        );
    }

    #[test]
    fn numeric_properties_match_as_text() {
        let index = GeometryIndex::from_geojson(GEOJSON, "code").unwrap();
        assert!(index.wkt_for("14").is_some());
    }

    #[test]
    fn match_report_counts_rows_not_distinct_values() {
        let frame = sample_frame();
        let index = GeometryIndex::from_geojson(GEOJSON, "NAME").unwrap();
        let report = count_matches(&frame, "city", &index).unwrap();
        assert_eq!(report.matched, 2);
        assert_eq!(report.total, 4);
        assert_eq!(
            report.to_string(),
            "2 of 4 values in 'city' have a geometry."
        );
    }

    #[test]
    fn geometry_cells_distinguish_misses_from_missing() {
        let frame = sample_frame();
        let index = GeometryIndex::from_geojson(GEOJSON, "NAME").unwrap();
        let column = geometry_column(&frame, "city", &index).unwrap();
        assert_eq!(column.name, GEOMETRY_COLUMN);
        assert_eq!(
            column.cells[0],
            Some(Value::Text("POINT (-77.03 -12.04)".to_string()))
        );
        assert_eq!(column.cells[2], Some(Value::Text(String::new())));
        assert_eq!(column.cells[3], None);
    }

    #[test]
    fn property_discovery_uses_first_feature() {
        let names = property_names(GEOJSON).unwrap();
        assert!(names.contains(&"NAME".to_string()));
        assert!(names.contains(&"code".to_string()));
    }
}

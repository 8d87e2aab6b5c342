mod common;

use std::fs;

use assert_cmd::Command;
use common::TestWorkspace;
use predicates::str::contains;

fn survey_prep() -> Command {
    Command::cargo_bin("survey-prep").expect("binary exists")
}

fn load(ws: &TestWorkspace) {
    let input = ws.survey();
    survey_prep()
        .args([
            "load",
            "-i",
            input.to_str().unwrap(),
            "-s",
            ws.session().to_str().unwrap(),
        ])
        .assert()
        .success();
}

fn qualify(ws: &TestWorkspace) {
    survey_prep()
        .args(["qualify", "-s", ws.session().to_str().unwrap()])
        .assert()
        .success();
}

fn export_string(ws: &TestWorkspace) -> String {
    let out = ws.path().join("out.csv");
    survey_prep()
        .args([
            "export",
            "-s",
            ws.session().to_str().unwrap(),
            "-o",
            out.to_str().unwrap(),
        ])
        .assert()
        .success();
    fs::read_to_string(out).expect("read export")
}

#[test]
fn load_and_qualify_tag_columns() {
    let ws = TestWorkspace::new();
    load(&ws);
    qualify(&ws);

    let output = export_string(&ws);
    let header = output.lines().next().expect("header line");
    assert_eq!(
        header,
        "\"city\",\"population#number\",\"homepage#link\",\"notes\""
    );
    // Grouped digits were coerced to plain numbers.
    assert!(output.contains("\"100364\""));
    assert!(!output.contains("100,364"));
}

#[test]
fn qualify_runs_one_shot_without_a_session() {
    let ws = TestWorkspace::new();
    let input = ws.survey();
    let output_path = ws.path().join("tagged.csv");
    survey_prep()
        .args([
            "qualify",
            "-i",
            input.to_str().unwrap(),
            "-o",
            output_path.to_str().unwrap(),
        ])
        .assert()
        .success();

    let output = fs::read_to_string(&output_path).expect("read tagged output");
    assert!(output.contains("population#number"));
    assert!(output.contains("homepage#link"));
    assert!(output.contains("\"100364\""));
}

#[test]
fn qualify_rejects_session_and_input_together() {
    let ws = TestWorkspace::new();
    load(&ws);
    let input = ws.survey();
    survey_prep()
        .args([
            "qualify",
            "-s",
            ws.session().to_str().unwrap(),
            "-i",
            input.to_str().unwrap(),
        ])
        .assert()
        .failure()
        .stderr(contains("either --session or --input"));
}

#[test]
fn headers_merge_then_undo_restores_the_question_row() {
    let ws = TestWorkspace::new();
    let input = ws.write(
        "survey.csv",
        "Q1,Q2\nWhat is your age?,Where do you live?\n34,Lima\n41,Cusco\n",
    );
    survey_prep()
        .args([
            "load",
            "-i",
            input.to_str().unwrap(),
            "-s",
            ws.session().to_str().unwrap(),
        ])
        .assert()
        .success();

    survey_prep()
        .args([
            "headers",
            "-s",
            ws.session().to_str().unwrap(),
            "--rows",
            "2",
        ])
        .assert()
        .success();
    let merged = export_string(&ws);
    assert_eq!(
        merged.lines().next().expect("header"),
        "\"Q1 What is your age?\",\"Q2 Where do you live?\""
    );
    assert_eq!(merged.lines().count(), 3);

    survey_prep()
        .args(["undo", "-s", ws.session().to_str().unwrap()])
        .assert()
        .success();
    let restored = export_string(&ws);
    assert_eq!(restored.lines().next().expect("header"), "\"Q1\",\"Q2\"");
    assert!(restored.contains("What is your age?"));
    assert_eq!(restored.lines().count(), 4);
}

#[test]
fn reserved_qualifier_tolerates_one_retry_then_errors() {
    let ws = TestWorkspace::new();
    load(&ws);
    qualify(&ws);
    let session = ws.session();

    survey_prep()
        .args([
            "assign",
            "-s",
            session.to_str().unwrap(),
            "-C",
            "city",
            "-q",
            "name",
        ])
        .assert()
        .success();
    // A repeat assignment is swallowed once as callback echo.
    survey_prep()
        .args([
            "assign",
            "-s",
            session.to_str().unwrap(),
            "-C",
            "notes",
            "-q",
            "name",
        ])
        .assert()
        .success();
    survey_prep()
        .args([
            "assign",
            "-s",
            session.to_str().unwrap(),
            "-C",
            "notes",
            "-q",
            "name",
        ])
        .assert()
        .failure()
        .stderr(contains("#name can only be assigned to a single variable."));

    let output = export_string(&ws);
    let header = output.lines().next().expect("header");
    assert!(header.contains("\"city\",\"city#name\""));
    assert!(!header.contains("notes#name"));
}

#[test]
fn reserved_qualifier_rejects_multiple_columns() {
    let ws = TestWorkspace::new();
    load(&ws);
    survey_prep()
        .args([
            "assign",
            "-s",
            ws.session().to_str().unwrap(),
            "-C",
            "city",
            "-C",
            "notes",
            "-q",
            "href",
        ])
        .assert()
        .failure()
        .stderr(contains("#href can only be assigned to a single variable."));
}

#[test]
fn assign_combines_and_clears_qualifiers() {
    let ws = TestWorkspace::new();
    load(&ws);
    qualify(&ws);
    let session = ws.session();

    survey_prep()
        .args([
            "assign",
            "-s",
            session.to_str().unwrap(),
            "-C",
            "notes",
            "-q",
            "ordinal",
            "--also",
            "hidden",
        ])
        .assert()
        .success();
    assert!(export_string(&ws).contains("notes#ordinal#hidden"));

    survey_prep()
        .args([
            "assign",
            "-s",
            session.to_str().unwrap(),
            "-C",
            "notes#ordinal#hidden",
            "--clear",
            "--rename",
            "remarks",
        ])
        .assert()
        .success();
    let header = export_string(&ws);
    let header = header.lines().next().expect("header");
    assert!(header.contains("\"remarks\""));
    assert!(!header.contains("notes"));
}

#[test]
fn drops_survive_header_changes() {
    let ws = TestWorkspace::new();
    let input = ws.write("survey.csv", "Q1,Q2,Q3\nage,city,note\n34,Lima,x\n41,Cusco,y\n");
    survey_prep()
        .args([
            "load",
            "-i",
            input.to_str().unwrap(),
            "-s",
            ws.session().to_str().unwrap(),
        ])
        .assert()
        .success();

    survey_prep()
        .args([
            "drop",
            "-s",
            ws.session().to_str().unwrap(),
            "-C",
            "Q2",
            "--rows",
            "2",
        ])
        .assert()
        .success();
    survey_prep()
        .args([
            "headers",
            "-s",
            ws.session().to_str().unwrap(),
            "--rows",
            "2",
        ])
        .assert()
        .success();

    let output = export_string(&ws);
    assert_eq!(
        output.lines().next().expect("header"),
        "\"Q1 age\",\"Q3 note\""
    );
    assert_eq!(output.lines().count(), 2);
    assert!(!output.contains("Cusco"));
}

#[test]
fn invalid_row_selections_are_ignored() {
    let ws = TestWorkspace::new();
    load(&ws);
    survey_prep()
        .args([
            "drop",
            "-s",
            ws.session().to_str().unwrap(),
            "--rows",
            "99",
        ])
        .assert()
        .success();
    survey_prep()
        .args([
            "drop",
            "-s",
            ws.session().to_str().unwrap(),
            "--rows",
            "oops",
        ])
        .assert()
        .success();
    assert_eq!(export_string(&ws).lines().count(), 4);
}

#[test]
fn columns_prints_catalog_and_writes_report() {
    let ws = TestWorkspace::new();
    load(&ws);
    qualify(&ws);
    let report = ws.path().join("columns.yaml");
    survey_prep()
        .args([
            "columns",
            "-s",
            ws.session().to_str().unwrap(),
            "--report",
            report.to_str().unwrap(),
        ])
        .assert()
        .success()
        .stdout(contains("population#number"))
        .stdout(contains("numeric"));

    let yaml = fs::read_to_string(&report).expect("read report");
    assert!(yaml.contains("qualifiers:"));
    assert!(yaml.contains("kind: numeric"));
}

const GEOJSON: &str = r#"{
    "type": "FeatureCollection",
    "features": [
        {
            "type": "Feature",
            "properties": {"NAME": "Lima"},
            "geometry": {"type": "Point", "coordinates": [-77.03, -12.04]}
        },
        {
            "type": "Feature",
            "properties": {"NAME": "Cusco"},
            "geometry": {"type": "Point", "coordinates": [-71.97, -13.53]}
        }
    ]
}"#;

#[test]
fn geometry_lists_properties_without_a_selection() {
    let ws = TestWorkspace::new();
    load(&ws);
    let geojson = ws.write("regions.geojson", GEOJSON);
    survey_prep()
        .args([
            "geometry",
            "-s",
            ws.session().to_str().unwrap(),
            "--geojson",
            geojson.to_str().unwrap(),
            "-C",
            "city",
        ])
        .assert()
        .success()
        .stdout(contains("Available properties: NAME"));
}

#[test]
fn geometry_attaches_wkt_for_matching_rows() {
    let ws = TestWorkspace::new();
    load(&ws);
    let geojson = ws.write("regions.geojson", GEOJSON);
    let session = ws.session();

    // Dry run reports without changing the table.
    survey_prep()
        .args([
            "geometry",
            "-s",
            session.to_str().unwrap(),
            "--geojson",
            geojson.to_str().unwrap(),
            "-C",
            "city",
            "--property",
            "NAME",
            "--dry-run",
        ])
        .assert()
        .success()
        .stdout(contains("2 of 3 values in 'city' have a geometry."));
    assert!(!export_string(&ws).contains("geometry#hiddenmore"));

    survey_prep()
        .args([
            "geometry",
            "-s",
            session.to_str().unwrap(),
            "--geojson",
            geojson.to_str().unwrap(),
            "-C",
            "city",
            "--property",
            "NAME",
        ])
        .assert()
        .success();
    let output = export_string(&ws);
    assert!(output.contains("geometry#hiddenmore"));
    assert!(output.contains("POINT (-77.03 -12.04)"));
}

#[test]
fn geocode_attaches_coordinates_only_once() {
    let ws = TestWorkspace::new();
    load(&ws);
    let lookup = ws.write(
        "lookup.csv",
        "location,latitude,longitude\nLima,-12.04,-77.03\nCusco,-13.53,-71.97\n",
    );
    let session = ws.session();

    survey_prep()
        .args([
            "geocode",
            "-s",
            session.to_str().unwrap(),
            "--lookup",
            lookup.to_str().unwrap(),
            "-C",
            "city",
        ])
        .assert()
        .success();
    let output = export_string(&ws);
    let header = output.lines().next().expect("header");
    assert!(header.contains("latitude#number#hidden"));
    assert!(header.contains("longitude#number#hidden"));
    assert!(output.contains("\"-12.04\""));

    survey_prep()
        .args([
            "geocode",
            "-s",
            session.to_str().unwrap(),
            "--lookup",
            lookup.to_str().unwrap(),
            "-C",
            "city",
        ])
        .assert()
        .failure()
        .stderr(contains("Coordinate columns already exist."));
}

#[test]
fn images_add_identifiers_and_manifest() {
    let ws = TestWorkspace::new();
    load(&ws);
    let manifest = ws.path().join("manifest.csv");
    survey_prep()
        .args([
            "images",
            "-s",
            ws.session().to_str().unwrap(),
            "-C",
            "city",
            "--manifest",
            manifest.to_str().unwrap(),
        ])
        .assert()
        .success();

    let output = export_string(&ws);
    assert!(output.lines().next().expect("header").contains("city#img"));
    assert!(output.contains("Lima_o"));

    let manifest = fs::read_to_string(&manifest).expect("read manifest");
    assert!(manifest.starts_with("image,text"));
    assert!(manifest.contains("Lima_o,Lima"));
}

#[test]
fn load_decodes_windows_1252_files() {
    let ws = TestWorkspace::new();
    let input = ws.path().join("latin.csv");
    fs::write(&input, b"city,note\nLima,caf\xe9\n").expect("write latin file");
    survey_prep()
        .args([
            "load",
            "-i",
            input.to_str().unwrap(),
            "-s",
            ws.session().to_str().unwrap(),
        ])
        .assert()
        .success();
    assert!(export_string(&ws).contains("café"));
}

#[test]
fn load_reports_missing_input() {
    let ws = TestWorkspace::new();
    survey_prep()
        .args([
            "load",
            "-i",
            ws.path().join("nope.csv").to_str().unwrap(),
            "-s",
            ws.session().to_str().unwrap(),
        ])
        .assert()
        .failure()
        .stderr(contains("error:"));
}

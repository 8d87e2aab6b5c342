pub mod catalog;
pub mod classify;
pub mod cli;
pub mod data;
pub mod frame;
pub mod geocode;
pub mod geometry;
pub mod images;
pub mod io_utils;
pub mod patterns;
pub mod qualifier;
pub mod session;
pub mod table;

use std::{env, sync::OnceLock};

use anyhow::{Context, Result, bail};
use clap::Parser;
use encoding_rs::UTF_8;
use log::{LevelFilter, debug, info, warn};

use crate::catalog::{CatalogReport, build_catalog, render_catalog, write_yaml_report};
use crate::classify::{ValueKind, classify_frame};
use crate::cli::{Cli, Commands};
use crate::geocode::CoordinateLookup;
use crate::geometry::GeometryIndex;
use crate::session::{AssignTarget, ChangeKind, EditorSession};

static LOGGER: OnceLock<()> = OnceLock::new();

fn init_logging() {
    LOGGER.get_or_init(|| {
        let mut builder = env_logger::Builder::from_env(env_logger::Env::default());
        if env::var("RUST_LOG").is_err() {
            builder.filter_module("survey_prep", LevelFilter::Info);
        }
        let _ = builder.format_timestamp_millis().try_init();
    });
}

pub fn run() -> Result<()> {
    init_logging();
    let cli = Cli::parse();
    match cli.command {
        Commands::Load(args) => handle_load(&args),
        Commands::Preview(args) => handle_preview(&args),
        Commands::Headers(args) => handle_headers(&args),
        Commands::Drop(args) => handle_drop(&args),
        Commands::Qualify(args) => handle_qualify(&args),
        Commands::Assign(args) => handle_assign(&args),
        Commands::Rename(args) => handle_rename(&args),
        Commands::Undo(args) => handle_undo(&args),
        Commands::Columns(args) => handle_columns(&args),
        Commands::Export(args) => handle_export(&args),
        Commands::Geometry(args) => handle_geometry(&args),
        Commands::Geocode(args) => handle_geocode(&args),
        Commands::Images(args) => handle_images(&args),
    }
}

fn handle_load(args: &cli::LoadArgs) -> Result<()> {
    let delimiter = io_utils::resolve_input_delimiter(&args.input, args.delimiter);
    info!(
        "Loading '{}' with delimiter '{}'",
        args.input.display(),
        printable_delimiter(delimiter)
    );
    let frame = io_utils::load_frame(&args.input, Some(delimiter), args.input_encoding.as_deref())
        .with_context(|| format!("Loading {:?}", args.input))?;
    info!(
        "Loaded {} row(s) across {} column(s)",
        frame.height(),
        frame.width()
    );
    let session = EditorSession::new(args.input.clone(), frame);
    session.save(&args.session)?;
    info!("Session written to {:?}", args.session);
    Ok(())
}

fn handle_preview(args: &cli::PreviewArgs) -> Result<()> {
    let session = EditorSession::load(&args.session)?;
    let frame = session.frame();
    let rows = if args.rows == 0 { frame.height() } else { args.rows };
    let cols = if args.cols == 0 { frame.width() } else { args.cols };
    let window = frame.window(args.offset, args.col_offset, rows, cols);
    print!("{}", table::render_window(&window));
    info!(
        "Showing {} of {} row(s), {} of {} column(s)",
        window.labels.len(),
        frame.height(),
        window.headers.len(),
        frame.width()
    );
    Ok(())
}

fn handle_headers(args: &cli::HeadersArgs) -> Result<()> {
    let mut session = EditorSession::load(&args.session)?;
    let changed = session.set_header_rows(args.rows)?;
    if changed {
        info!("Header now spans {} row(s)", session.header_rows());
    } else {
        info!("Header already spans {} row(s); nothing to do", args.rows);
    }
    debug!("Header history: {:?}", session.header_history());
    session.save(&args.session)?;
    Ok(())
}

fn handle_drop(args: &cli::DropArgs) -> Result<()> {
    if args.columns.is_empty() && args.rows.is_empty() {
        bail!("Nothing to drop: provide --columns and/or --rows");
    }
    let mut session = EditorSession::load(&args.session)?;
    if !args.columns.is_empty() {
        session.drop_columns(&args.columns)?;
    }
    for spec in &args.rows {
        match parse_row_selection(spec) {
            Some((lower, upper)) => {
                if !session.drop_rows(lower, upper) {
                    warn!("Ignoring row selection '{spec}': labels not present");
                }
            }
            None => warn!("Ignoring invalid row selection '{spec}'"),
        }
    }
    info!(
        "Table now has {} row(s) across {} column(s)",
        session.frame().height(),
        session.frame().width()
    );
    session.save(&args.session)?;
    Ok(())
}

fn handle_qualify(args: &cli::QualifyArgs) -> Result<()> {
    match (&args.session, &args.input) {
        (Some(_), Some(_)) => bail!("Provide either --session or --input, not both"),
        (None, None) => bail!("Provide a session with -s or an input file with -i"),
        (Some(path), None) => {
            let mut session = EditorSession::load(path)?;
            let full = session.classify();
            if full {
                info!("Classified {} column(s)", session.registry().len());
            }
            session.save(path)?;
            Ok(())
        }
        (None, Some(input)) => {
            let delimiter = io_utils::resolve_input_delimiter(input, args.delimiter);
            info!(
                "Classifying '{}' with delimiter '{}'",
                input.display(),
                printable_delimiter(delimiter)
            );
            let mut frame =
                io_utils::load_frame(input, Some(delimiter), args.input_encoding.as_deref())
                    .with_context(|| format!("Loading {input:?}"))?;
            classify_frame(&mut frame);
            let output_delimiter = io_utils::resolve_output_delimiter(
                args.output.as_deref(),
                args.output_delimiter,
                delimiter,
            );
            let encoding =
                io_utils::resolve_encoding(args.output_encoding.as_deref())?.unwrap_or(UTF_8);
            io_utils::write_frame(&frame, args.output.as_deref(), output_delimiter, encoding)?;
            if let Some(output) = &args.output {
                info!("Classified table written to {output:?}");
            }
            Ok(())
        }
    }
}

fn handle_assign(args: &cli::AssignArgs) -> Result<()> {
    if args.columns.is_empty() {
        bail!("Provide at least one column with -C");
    }
    let target = match (args.clear, args.qualifier) {
        (true, Some(_)) => bail!("--clear cannot be combined with --qualifier"),
        (true, None) => AssignTarget::Clear,
        (false, Some(qualifier)) => AssignTarget::Tag(qualifier),
        (false, None) => bail!("Provide --qualifier or --clear"),
    };
    let mut session = EditorSession::load(&args.session)?;
    let second = args.also.map(cli::ExtraQualifier::as_qualifier);
    session.reassign(&args.columns, target, second, args.rename.as_deref())?;
    session.save(&args.session)?;
    Ok(())
}

fn handle_rename(args: &cli::RenameArgs) -> Result<()> {
    let mut session = EditorSession::load(&args.session)?;
    session.rename(&args.column, &args.to)?;
    session.save(&args.session)?;
    Ok(())
}

fn handle_undo(args: &cli::UndoArgs) -> Result<()> {
    let mut session = EditorSession::load(&args.session)?;
    match session.undo() {
        ChangeKind::None => info!("Nothing to undo"),
        ChangeKind::Header => info!(
            "Rewound the header change; header now spans {} row(s)",
            session.header_rows()
        ),
        ChangeKind::Axis => info!("Restored the table before the last change"),
    }
    session.save(&args.session)?;
    Ok(())
}

fn handle_columns(args: &cli::ColumnsArgs) -> Result<()> {
    let session = EditorSession::load(&args.session)?;
    let entries = build_catalog(session.frame(), session.registry());
    print!("{}", render_catalog(&entries));
    info!(
        "{} column(s), {} row(s); header rows: {}; last change: {}",
        session.frame().width(),
        session.frame().height(),
        session.header_rows(),
        session.last_change().as_str()
    );
    if let Some(path) = &args.report {
        let report = CatalogReport {
            source: session.source().display().to_string(),
            rows: session.frame().height(),
            columns: entries,
        };
        write_yaml_report(&report, path)?;
        info!("Column report written to {path:?}");
    }
    Ok(())
}

fn handle_export(args: &cli::ExportArgs) -> Result<()> {
    let session = EditorSession::load(&args.session)?;
    let delimiter = io_utils::resolve_output_delimiter(
        args.output.as_deref(),
        args.output_delimiter,
        io_utils::DEFAULT_CSV_DELIMITER,
    );
    let encoding = io_utils::resolve_encoding(args.output_encoding.as_deref())?.unwrap_or(UTF_8);
    io_utils::write_frame(session.frame(), args.output.as_deref(), delimiter, encoding)?;
    if let Some(output) = &args.output {
        info!(
            "Exported {} row(s) to {:?}",
            session.frame().height(),
            output
        );
    }
    Ok(())
}

fn handle_geometry(args: &cli::GeometryArgs) -> Result<()> {
    let mut session = EditorSession::load(&args.session)?;
    let text = io_utils::read_decoded(&args.geojson, None)
        .with_context(|| format!("Reading GeoJSON {:?}", args.geojson))?;

    let Some(property) = &args.property else {
        let names = geometry::property_names(&text)?;
        println!("Available properties: {}", names.join(", "));
        return Ok(());
    };

    let index = GeometryIndex::from_geojson(&text, property)?;
    if index.is_empty() {
        warn!("No feature carries a usable '{property}' value");
    }
    let report = geometry::count_matches(session.frame(), &args.column, &index)?;
    println!("{report}");
    if args.dry_run {
        return Ok(());
    }

    let column = geometry::geometry_column(session.frame(), &args.column, &index)?;
    session.append_columns(vec![(column, ValueKind::Textual)])?;
    session.save(&args.session)?;
    info!("Geometry column attached");
    Ok(())
}

fn handle_geocode(args: &cli::GeocodeArgs) -> Result<()> {
    let mut session = EditorSession::load(&args.session)?;
    let lookup = CoordinateLookup::from_path(&args.lookup, None, None)?;
    info!("Lookup table has {} location(s)", lookup.len());
    let columns = geocode::coordinate_columns(session.frame(), &args.column, &lookup)?;
    let resolved = columns[0]
        .0
        .cells
        .iter()
        .filter(|cell| cell.is_some())
        .count();
    let total = session.frame().height();
    session.append_columns(columns)?;
    session.save(&args.session)?;
    info!("Resolved {resolved} of {total} location(s)");
    Ok(())
}

fn handle_images(args: &cli::ImagesArgs) -> Result<()> {
    let mut session = EditorSession::load(&args.session)?;
    let column = images::image_column(session.frame(), &args.column)?;
    if let Some(path) = &args.manifest {
        let manifest = images::image_manifest(session.frame(), &args.column)?;
        images::write_manifest(&manifest, path)?;
        info!("Manifest with {} image(s) written to {path:?}", manifest.len());
    }
    let name = column.name.clone();
    session.append_image_column(column)?;
    session.save(&args.session)?;
    info!("Image column '{name}' attached");
    Ok(())
}

/// Parse a row selection: a single label or an inclusive `low-high` range.
fn parse_row_selection(spec: &str) -> Option<(u64, u64)> {
    let spec = spec.trim();
    if let Some((low, high)) = spec.split_once('-') {
        let lower = low.trim().parse().ok()?;
        let upper = high.trim().parse().ok()?;
        Some((lower, upper))
    } else {
        let label = spec.parse().ok()?;
        Some((label, label))
    }
}

pub(crate) fn printable_delimiter(delimiter: u8) -> String {
    match delimiter {
        b',' => ",".to_string(),
        b'\t' => "\\t".to_string(),
        b'\n' => "\\n".to_string(),
        other => (other as char).to_string(),
    }
}

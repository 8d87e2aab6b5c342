use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

use crate::qualifier::Qualifier;

#[derive(Debug, Parser)]
#[command(author, version, about = "Prepare tabular survey data for publication", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Start an editing session from a delimited survey file
    Load(LoadArgs),
    /// Preview a window of the session table
    Preview(PreviewArgs),
    /// Merge leading rows into the column headers
    Headers(HeadersArgs),
    /// Drop columns or rows from the session table
    Drop(DropArgs),
    /// Infer value types and qualifier tags
    Qualify(QualifyArgs),
    /// Reassign, combine, or clear qualifier tags on columns
    Assign(AssignArgs),
    /// Rename a column while keeping its qualifier tags
    Rename(RenameArgs),
    /// Undo the most recent session change
    Undo(UndoArgs),
    /// Show the column catalog with bases, tags, and inferred kinds
    Columns(ColumnsArgs),
    /// Write the session table as a delimited file
    Export(ExportArgs),
    /// Attach WKT geometries matched from a GeoJSON file
    Geometry(GeometryArgs),
    /// Attach latitude/longitude columns from a lookup table
    Geocode(GeocodeArgs),
    /// Derive image identifiers from a text column
    Images(ImagesArgs),
}

#[derive(Debug, Args)]
pub struct LoadArgs {
    /// Input survey file (`-` reads stdin)
    #[arg(short = 'i', long = "input")]
    pub input: PathBuf,
    /// Session file to create
    #[arg(short = 's', long = "session")]
    pub session: PathBuf,
    /// Delimiter character (supports ',', 'tab', ';', '|')
    #[arg(long, value_parser = parse_delimiter)]
    pub delimiter: Option<u8>,
    /// Character encoding of the input file (auto-detected if omitted)
    #[arg(long = "input-encoding")]
    pub input_encoding: Option<String>,
}

#[derive(Debug, Args)]
pub struct PreviewArgs {
    /// Session file
    #[arg(short = 's', long = "session")]
    pub session: PathBuf,
    /// Number of rows to display
    #[arg(long, default_value_t = 10)]
    pub rows: usize,
    /// First row of the window (0-based position, not label)
    #[arg(long, default_value_t = 0)]
    pub offset: usize,
    /// Number of columns to display (0 = all)
    #[arg(long, default_value_t = 0)]
    pub cols: usize,
    /// First column of the window
    #[arg(long = "col-offset", default_value_t = 0)]
    pub col_offset: usize,
}

#[derive(Debug, Args)]
pub struct HeadersArgs {
    /// Session file
    #[arg(short = 's', long = "session")]
    pub session: PathBuf,
    /// Number of header rows to merge into column names (1-4)
    #[arg(long)]
    pub rows: usize,
}

#[derive(Debug, Args)]
pub struct DropArgs {
    /// Session file
    #[arg(short = 's', long = "session")]
    pub session: PathBuf,
    /// Columns to drop
    #[arg(short = 'C', long = "columns", action = clap::ArgAction::Append)]
    pub columns: Vec<String>,
    /// Row labels to drop, as a single label or an inclusive `low-high` range
    #[arg(long = "rows", action = clap::ArgAction::Append)]
    pub rows: Vec<String>,
}

#[derive(Debug, Args)]
pub struct QualifyArgs {
    /// Session file to classify in place
    #[arg(short = 's', long = "session")]
    pub session: Option<PathBuf>,
    /// Input survey file for one-shot classification without a session
    #[arg(short = 'i', long = "input")]
    pub input: Option<PathBuf>,
    /// Output file for one-shot classification (stdout if omitted)
    #[arg(short = 'o', long = "output")]
    pub output: Option<PathBuf>,
    /// Delimiter character for reading input
    #[arg(long, value_parser = parse_delimiter)]
    pub delimiter: Option<u8>,
    /// Delimiter to use for output (defaults to input delimiter)
    #[arg(long = "output-delimiter", value_parser = parse_delimiter)]
    pub output_delimiter: Option<u8>,
    /// Character encoding of the input file (auto-detected if omitted)
    #[arg(long = "input-encoding")]
    pub input_encoding: Option<String>,
    /// Character encoding for the output file/stdout (defaults to utf-8)
    #[arg(long = "output-encoding")]
    pub output_encoding: Option<String>,
}

#[derive(Debug, Args)]
pub struct AssignArgs {
    /// Session file
    #[arg(short = 's', long = "session")]
    pub session: PathBuf,
    /// Columns to edit
    #[arg(short = 'C', long = "columns", action = clap::ArgAction::Append)]
    pub columns: Vec<String>,
    /// Qualifier to assign (for example `number` or `#textlocation`)
    #[arg(short = 'q', long = "qualifier", value_parser = parse_qualifier)]
    pub qualifier: Option<Qualifier>,
    /// Strip all qualifier tags instead of assigning one
    #[arg(long)]
    pub clear: bool,
    /// Additional display qualifier to combine with the first
    #[arg(long = "also", value_enum)]
    pub also: Option<ExtraQualifier>,
    /// Replace the base name (single column only)
    #[arg(long = "rename")]
    pub rename: Option<String>,
}

#[derive(Debug, Clone, Copy, ValueEnum, PartialEq, Eq)]
#[value(rename_all = "kebab-case")]
pub enum ExtraQualifier {
    Hidden,
    Hiddenmore,
}

impl ExtraQualifier {
    pub fn as_qualifier(self) -> Qualifier {
        match self {
            ExtraQualifier::Hidden => Qualifier::Hidden,
            ExtraQualifier::Hiddenmore => Qualifier::HiddenMore,
        }
    }
}

#[derive(Debug, Args)]
pub struct RenameArgs {
    /// Session file
    #[arg(short = 's', long = "session")]
    pub session: PathBuf,
    /// Column to rename
    #[arg(short = 'C', long = "column")]
    pub column: String,
    /// New base name
    #[arg(long = "to")]
    pub to: String,
}

#[derive(Debug, Args)]
pub struct UndoArgs {
    /// Session file
    #[arg(short = 's', long = "session")]
    pub session: PathBuf,
}

#[derive(Debug, Args)]
pub struct ColumnsArgs {
    /// Session file
    #[arg(short = 's', long = "session")]
    pub session: PathBuf,
    /// Write the catalog as a YAML report to this path
    #[arg(long = "report")]
    pub report: Option<PathBuf>,
}

#[derive(Debug, Args)]
pub struct ExportArgs {
    /// Session file
    #[arg(short = 's', long = "session")]
    pub session: PathBuf,
    /// Output file (stdout if omitted)
    #[arg(short = 'o', long = "output")]
    pub output: Option<PathBuf>,
    /// Delimiter to use for output (defaults to the output extension)
    #[arg(long = "output-delimiter", value_parser = parse_delimiter)]
    pub output_delimiter: Option<u8>,
    /// Character encoding for the output file/stdout (defaults to utf-8)
    #[arg(long = "output-encoding")]
    pub output_encoding: Option<String>,
}

#[derive(Debug, Args)]
pub struct GeometryArgs {
    /// Session file
    #[arg(short = 's', long = "session")]
    pub session: PathBuf,
    /// GeoJSON file with the feature geometries
    #[arg(long = "geojson")]
    pub geojson: PathBuf,
    /// Column to match against the GeoJSON property
    #[arg(short = 'C', long = "column")]
    pub column: String,
    /// Feature property to match (omit to list the available properties)
    #[arg(long = "property")]
    pub property: Option<String>,
    /// Report the match count without changing the table
    #[arg(long = "dry-run")]
    pub dry_run: bool,
}

#[derive(Debug, Args)]
pub struct GeocodeArgs {
    /// Session file
    #[arg(short = 's', long = "session")]
    pub session: PathBuf,
    /// Lookup table with location, latitude, and longitude columns
    #[arg(long = "lookup")]
    pub lookup: PathBuf,
    /// Column holding the locations to resolve
    #[arg(short = 'C', long = "column")]
    pub column: String,
}

#[derive(Debug, Args)]
pub struct ImagesArgs {
    /// Session file
    #[arg(short = 's', long = "session")]
    pub session: PathBuf,
    /// Column to derive image identifiers from
    #[arg(short = 'C', long = "column")]
    pub column: String,
    /// Write the identifier-to-text manifest to this path
    #[arg(long = "manifest")]
    pub manifest: Option<PathBuf>,
}

pub fn parse_delimiter(value: &str) -> Result<u8, String> {
    match value {
        "tab" | "\t" => Ok(b'\t'),
        "comma" | "," => Ok(b','),
        "|" | "pipe" => Ok(b'|'),
        ";" | "semicolon" => Ok(b';'),
        other => {
            let mut chars = other.chars();
            let first = chars
                .next()
                .ok_or_else(|| "Delimiter cannot be empty".to_string())?;
            if chars.next().is_some() {
                return Err("Delimiter must be a single character".to_string());
            }
            if !first.is_ascii() {
                return Err("Delimiter must be ASCII".to_string());
            }
            Ok(first as u8)
        }
    }
}

pub fn parse_qualifier(value: &str) -> Result<Qualifier, String> {
    value.parse::<Qualifier>().map_err(|err| err.to_string())
}

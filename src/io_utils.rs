//! File I/O: delimiter resolution, encoding, and frame load/save.
//!
//! Input files are decoded whole before parsing. Without an explicit
//! encoding label the file is tried as UTF-8 first and re-decoded as
//! windows-1252 when that fails, which mirrors how exported survey files
//! from older tooling usually arrive. An explicit label is always strict.
//!
//! Delimiters follow the file extension (`.csv` comma, `.tsv` and `.txt`
//! tab) unless overridden, and the `-` path convention routes through
//! standard streams.

use std::{
    fs,
    io::{Read, Write},
    path::Path,
};

use anyhow::{Context, Result, anyhow};
use csv::QuoteStyle;
use encoding_rs::{Encoding, UTF_8, WINDOWS_1252};
use log::warn;

use crate::frame::Frame;

pub const DEFAULT_CSV_DELIMITER: u8 = b',';
pub const DEFAULT_TAB_DELIMITER: u8 = b'\t';

pub fn is_dash(path: &Path) -> bool {
    path == Path::new("-")
}

/// Resolve an encoding label to a concrete encoding. `None` means
/// auto-detect (UTF-8 with a windows-1252 fallback) at read time.
pub fn resolve_encoding(label: Option<&str>) -> Result<Option<&'static Encoding>> {
    match label {
        Some(value) => Encoding::for_label(value.trim().as_bytes())
            .map(Some)
            .ok_or_else(|| anyhow!("Unknown encoding '{value}'")),
        None => Ok(None),
    }
}

pub fn resolve_input_delimiter(path: &Path, provided: Option<u8>) -> u8 {
    provided.unwrap_or_else(|| match path.extension().and_then(|ext| ext.to_str()) {
        Some(ext) if ext.eq_ignore_ascii_case("tsv") || ext.eq_ignore_ascii_case("txt") => {
            DEFAULT_TAB_DELIMITER
        }
        _ => DEFAULT_CSV_DELIMITER,
    })
}

pub fn resolve_output_delimiter(path: Option<&Path>, provided: Option<u8>, fallback: u8) -> u8 {
    if let Some(delim) = provided {
        return delim;
    }
    if let Some(path) = path {
        match path.extension().and_then(|ext| ext.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("tsv") || ext.eq_ignore_ascii_case("txt") => {
                return DEFAULT_TAB_DELIMITER;
            }
            Some(ext) if ext.eq_ignore_ascii_case("csv") => return DEFAULT_CSV_DELIMITER,
            _ => {}
        }
    }
    fallback
}

fn read_raw(path: &Path) -> Result<Vec<u8>> {
    if is_dash(path) {
        let mut bytes = Vec::new();
        std::io::stdin()
            .lock()
            .read_to_end(&mut bytes)
            .context("Reading from stdin")?;
        Ok(bytes)
    } else {
        fs::read(path).with_context(|| format!("Opening input file {path:?}"))
    }
}

/// Read and decode a whole input file. With `encoding` set the decode is
/// strict; without it, invalid UTF-8 falls back to windows-1252, which
/// accepts any byte sequence.
pub fn read_decoded(path: &Path, encoding: Option<&'static Encoding>) -> Result<String> {
    let bytes = read_raw(path)?;
    match encoding {
        Some(encoding) => {
            let (text, _, had_errors) = encoding.decode(&bytes);
            if had_errors {
                Err(anyhow!(
                    "Failed to decode {path:?} with encoding {}",
                    encoding.name()
                ))
            } else {
                Ok(text.into_owned())
            }
        }
        None => {
            let (text, _, had_errors) = UTF_8.decode(&bytes);
            if !had_errors {
                return Ok(text.into_owned());
            }
            warn!("Input {path:?} is not valid UTF-8; re-decoding as windows-1252");
            let (text, _, _) = WINDOWS_1252.decode(&bytes);
            Ok(text.into_owned())
        }
    }
}

/// Parse decoded text into a header record and data records. Rows must all
/// have the header's width.
pub fn parse_table(text: &str, delimiter: u8) -> Result<(Vec<String>, Vec<Vec<String>>)> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .delimiter(delimiter)
        .double_quote(true)
        .flexible(false)
        .from_reader(text.as_bytes());

    let mut rows: Vec<Vec<String>> = Vec::new();
    for record in reader.records() {
        let record = record.context("Parsing delimited input")?;
        rows.push(record.iter().map(|field| field.to_string()).collect());
    }
    if rows.is_empty() {
        return Err(anyhow!("Input contains no header row"));
    }
    let headers = rows.remove(0);
    Ok((headers, rows))
}

/// Load a frame from disk: resolve the delimiter and encoding, decode,
/// parse, and build the frame.
pub fn load_frame(
    path: &Path,
    delimiter: Option<u8>,
    encoding_label: Option<&str>,
) -> Result<Frame> {
    let delimiter = resolve_input_delimiter(path, delimiter);
    let encoding = resolve_encoding(encoding_label)?;
    let text = read_decoded(path, encoding)?;
    let (headers, rows) = parse_table(&text, delimiter)?;
    Ok(Frame::from_records(&headers, &rows))
}

/// Write a frame as delimited text, transcoding the whole buffer when the
/// target encoding is not UTF-8. `None` writes to stdout.
pub fn write_frame(
    frame: &Frame,
    path: Option<&Path>,
    delimiter: u8,
    encoding: &'static Encoding,
) -> Result<()> {
    let (headers, rows) = frame.to_records();
    let mut writer = csv::WriterBuilder::new()
        .delimiter(delimiter)
        .quote_style(QuoteStyle::Always)
        .double_quote(true)
        .from_writer(Vec::new());
    writer.write_record(&headers)?;
    for row in &rows {
        writer.write_record(row)?;
    }
    let bytes = writer
        .into_inner()
        .map_err(|err| anyhow!("Flushing delimited output: {err}"))?;

    let payload: Vec<u8> = if encoding == UTF_8 {
        bytes
    } else {
        let text = String::from_utf8(bytes).context("Delimited output was not UTF-8")?;
        let (encoded, _, had_errors) = encoding.encode(&text);
        if had_errors {
            return Err(anyhow!(
                "Output contains characters not representable in {}",
                encoding.name()
            ));
        }
        encoded.into_owned()
    };

    match path {
        Some(path) if !is_dash(path) => {
            fs::write(path, payload).with_context(|| format!("Creating output file {path:?}"))?;
        }
        _ => {
            std::io::stdout()
                .lock()
                .write_all(&payload)
                .context("Writing to stdout")?;
        }
    }
    Ok(())
}

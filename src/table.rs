//! Fixed-width table rendering for terminal preview output.

use std::borrow::Cow;
use std::fmt::Write as _;

use crate::frame::Window;

/// Preview cells longer than this are cut with an ellipsis so a single
/// free-text answer cannot blow up the whole table.
pub const PREVIEW_CELL_LIMIT: usize = 48;

/// Render a frame window with a leading row-label gutter, truncating long
/// cells.
pub fn render_window(window: &Window) -> String {
    let mut headers = Vec::with_capacity(window.headers.len() + 1);
    headers.push("row".to_string());
    headers.extend(window.headers.iter().map(|name| truncate_cell(name)));

    let rows: Vec<Vec<String>> = window
        .labels
        .iter()
        .zip(&window.cells)
        .map(|(label, cells)| {
            let mut row = Vec::with_capacity(cells.len() + 1);
            row.push(label.to_string());
            row.extend(cells.iter().map(|cell| truncate_cell(cell)));
            row
        })
        .collect();
    render_table(&headers, &rows)
}

pub fn render_table(headers: &[String], rows: &[Vec<String>]) -> String {
    let column_count = headers.len();
    let mut widths: Vec<usize> = headers
        .iter()
        .map(|header| display_width(header).max(1))
        .collect();
    for row in rows {
        for (idx, cell) in row.iter().enumerate().take(column_count) {
            widths[idx] = widths[idx].max(display_width(cell));
        }
    }

    let mut output = String::new();
    let _ = writeln!(output, "{}", format_row(headers, &widths));

    let separator: Vec<String> = widths.iter().map(|w| "-".repeat((*w).max(3))).collect();
    let separator_widths: Vec<usize> = widths.iter().map(|w| (*w).max(3)).collect();
    let _ = writeln!(output, "{}", format_row(&separator, &separator_widths));

    for row in rows {
        let _ = writeln!(output, "{}", format_row(row, &widths));
    }
    output
}

pub fn print_table(headers: &[String], rows: &[Vec<String>]) {
    print!("{}", render_table(headers, rows));
}

fn truncate_cell(value: &str) -> String {
    if value.chars().count() > PREVIEW_CELL_LIMIT {
        let cut: String = value.chars().take(PREVIEW_CELL_LIMIT).collect();
        format!("{cut}…")
    } else {
        value.to_string()
    }
}

fn format_row(values: &[String], widths: &[usize]) -> String {
    let mut cells = Vec::with_capacity(values.len());
    for (value, width) in values.iter().zip(widths) {
        let sanitized = sanitize_cell(value);
        let padding = width.saturating_sub(display_width(sanitized.as_ref()));
        let mut cell = sanitized.into_owned();
        cell.push_str(&" ".repeat(padding));
        cells.push(cell);
    }
    let mut line = cells.join("  ");
    while line.ends_with(' ') {
        line.pop();
    }
    line
}

fn display_width(value: &str) -> usize {
    value.chars().count()
}

/// Control characters would break column alignment; flatten them to
/// spaces. Multiline survey answers are the usual offender.
fn sanitize_cell(value: &str) -> Cow<'_, str> {
    if value.contains(['\n', '\r', '\t']) {
        Cow::Owned(
            value
                .chars()
                .map(|ch| if matches!(ch, '\n' | '\r' | '\t') { ' ' } else { ch })
                .collect(),
        )
    } else {
        Cow::Borrowed(value)
    }
}

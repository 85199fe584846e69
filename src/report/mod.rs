//! One-shot report tools sharing the monitor's source seam.
//!
//! Both tools print fixed-width text to stdout: `stat` a vmstat-style
//! stream of counter groups, `info` a set of sizing and index-health
//! tables. Neither keeps state between runs beyond the previous sample
//! held while streaming.

pub mod info;
pub mod stat;

use std::error::Error;
use std::fmt;
use std::io;

use crate::catalog::CellFormat;
use crate::collector::CollectError;
use crate::engine::Cell;

/// Width of the horizontal rules framing report sections.
pub const REPORT_WIDTH: usize = 110;

#[derive(Debug)]
pub enum ReportError {
    Collect(CollectError),
    Io(io::Error),
}

impl fmt::Display for ReportError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReportError::Collect(e) => write!(f, "{e}"),
            ReportError::Io(e) => write!(f, "write failed: {e}"),
        }
    }
}

impl Error for ReportError {}

impl From<CollectError> for ReportError {
    fn from(e: CollectError) -> Self {
        ReportError::Collect(e)
    }
}

impl From<io::Error> for ReportError {
    fn from(e: io::Error) -> Self {
        ReportError::Io(e)
    }
}

/// How a report cell is printed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnRender {
    Str,
    Int,
    /// Integer with a trailing percent sign.
    Percent,
}

/// One column of a report table. Width 0 means the column is fetched (it
/// usually drives the ORDER BY) but never printed.
#[derive(Debug, Clone)]
pub struct ReportColumn {
    pub title: &'static str,
    pub width: usize,
    pub render: ColumnRender,
}

pub const fn rcol(title: &'static str, width: usize, render: ColumnRender) -> ReportColumn {
    ReportColumn {
        title,
        width,
        render,
    }
}

/// Wire formats for fetching a report table's rows.
pub fn wire_formats(columns: &[ReportColumn]) -> Vec<CellFormat> {
    columns
        .iter()
        .map(|c| match c.render {
            ColumnRender::Str => CellFormat::Text,
            _ => CellFormat::Int,
        })
        .collect()
}

fn cell_string(cell: Option<&Cell>, render: ColumnRender) -> String {
    match cell {
        Some(Cell::Text(s)) => s.clone(),
        Some(Cell::Num(v)) => match render {
            ColumnRender::Percent => format!("{}%", v.round() as i64),
            _ => format!("{}", v.round() as i64),
        },
        None => String::new(),
    }
}

fn clip(s: &str, width: usize) -> String {
    if s.chars().count() <= width {
        return s.to_string();
    }
    let kept: String = s.chars().take(width.saturating_sub(3)).collect();
    format!("{kept}...")
}

/// Renders one report table: a rule, uppercased right-justified headers,
/// then up to `limit` rows with an `...` row when more were fetched.
/// `limit` 0 prints everything.
pub fn render_table(columns: &[ReportColumn], rows: &[Vec<Cell>], limit: usize) -> String {
    let mut out = String::new();
    out.push_str(&"-".repeat(REPORT_WIDTH));
    out.push('\n');

    let visible: Vec<(usize, &ReportColumn)> = columns
        .iter()
        .enumerate()
        .filter(|(_, c)| c.width > 0)
        .collect();

    let header: Vec<String> = visible
        .iter()
        .map(|(_, c)| format!("{:>w$}", c.title.to_uppercase(), w = c.width))
        .collect();
    out.push_str(&header.join(" "));
    out.push('\n');

    for (i, row) in rows.iter().enumerate() {
        if limit > 0 && i == limit {
            let more: Vec<String> = visible
                .iter()
                .map(|(_, c)| format!("{:>w$}", "...", w = c.width))
                .collect();
            out.push_str(&more.join(" "));
            out.push('\n');
            break;
        }
        let cells: Vec<String> = visible
            .iter()
            .map(|(n, c)| {
                let raw = cell_string(row.get(*n), c.render);
                format!("{:>w$}", clip(&raw, c.width), w = c.width)
            })
            .collect();
        out.push_str(&cells.join(" "));
        out.push('\n');
    }
    out.push('\n');
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    const COLS: &[ReportColumn] = &[
        rcol("table", 10, ColumnRender::Str),
        rcol("sort_key", 0, ColumnRender::Int),
        rcol("rows", 6, ColumnRender::Int),
        rcol("share", 6, ColumnRender::Percent),
    ];

    fn row(name: &str, key: f64, rows: f64, share: f64) -> Vec<Cell> {
        vec![
            Cell::Text(name.to_string()),
            Cell::Num(key),
            Cell::Num(rows),
            Cell::Num(share),
        ]
    }

    #[test]
    fn headers_are_uppercased_and_right_justified() {
        let out = render_table(COLS, &[], 0);
        assert!(out.contains("     TABLE   ROWS  SHARE"));
    }

    #[test]
    fn hidden_columns_never_print() {
        let out = render_table(COLS, &[row("users", 42.0, 7.0, 12.0)], 0);
        assert!(!out.contains("SORT_KEY"));
        assert!(!out.contains("42"));
    }

    #[test]
    fn percent_cells_get_a_suffix() {
        let out = render_table(COLS, &[row("users", 0.0, 7.0, 12.0)], 0);
        assert!(out.contains("   12%"));
    }

    #[test]
    fn long_values_clip_with_dots() {
        let out = render_table(COLS, &[row("very_long_table_name", 0.0, 1.0, 0.0)], 0);
        assert!(out.contains("very_lo..."));
    }

    #[test]
    fn limit_cuts_and_marks_overflow() {
        let rows: Vec<Vec<Cell>> = (0..5).map(|i| row(&format!("t{i}"), 0.0, 0.0, 0.0)).collect();
        let out = render_table(COLS, &rows, 2);
        assert!(out.contains("t0"));
        assert!(out.contains("t1"));
        assert!(!out.contains("t2"));
        assert!(out.contains("..."));
    }

    #[test]
    fn zero_limit_prints_everything() {
        let rows: Vec<Vec<Cell>> = (0..5).map(|i| row(&format!("t{i}"), 0.0, 0.0, 0.0)).collect();
        let out = render_table(COLS, &rows, 0);
        assert!(out.contains("t4"));
        assert!(!out.contains("..."));
    }

    #[test]
    fn missing_cells_render_blank() {
        let out = render_table(COLS, &[vec![Cell::Text("short".to_string())]], 0);
        assert!(out.contains("short"));
    }
}

//! Stateless draw pass for the live monitor.
//!
//! Every frame is rebuilt from scratch against the `Surface` contract:
//! title, key legend, a rule, column headers, units, a rule, then as many
//! data rows as fit. Excess rows are dropped, never scrolled.

use crate::catalog::{Catalog, CellFormat, ColumnSpec};
use crate::engine::{Cell, Row};
use crate::fmt;
use crate::view::ViewState;

use super::surface::Surface;

const LEGEND: &str = "q quit | \u{2190}/\u{2192} sort column | p pause | space resume";

/// First grid row that holds table data.
pub const DATA_ROW: u16 = 6;

/// Resolved column widths for the given terminal width. The fill column
/// takes whatever is left after the fixed columns and their separators,
/// but never shrinks below 8.
fn column_widths(catalog: &Catalog, total: usize) -> Vec<usize> {
    let fixed: usize = catalog
        .cols()
        .iter()
        .map(|c| if c.width > 0 { c.width + 1 } else { 0 })
        .sum();
    catalog
        .cols()
        .iter()
        .map(|c| {
            if c.width > 0 {
                c.width
            } else {
                total.saturating_sub(fixed).max(8)
            }
        })
        .collect()
}

fn clamp(s: &str, width: usize) -> String {
    s.chars().take(width).collect()
}

fn align(spec: &ColumnSpec, text: &str, width: usize) -> String {
    let text = clamp(text, width);
    if spec.format == CellFormat::Text {
        format!("{text:<width$}")
    } else {
        format!("{text:>width$}")
    }
}

fn title_line(state: &ViewState) -> String {
    let stamp = match &state.last_update {
        Some(t) => t.format("%Y-%m-%d %H:%M:%S").to_string(),
        None => "waiting for data".to_string(),
    };
    match &state.last_error {
        Some(e) => format!("rpgtop  {stamp}  [{e}]"),
        None => format!("rpgtop  {stamp}"),
    }
}

fn header_line(catalog: &Catalog, widths: &[usize], sorted_col: usize) -> String {
    let cells: Vec<String> = catalog
        .cols()
        .iter()
        .zip(widths)
        .enumerate()
        .map(|(i, (c, w))| {
            let name = if i == sorted_col {
                format!("*{}", c.name)
            } else {
                c.name.to_string()
            };
            align(c, &name, *w)
        })
        .collect();
    cells.join(" ")
}

fn units_line(catalog: &Catalog, widths: &[usize], absolute: bool) -> String {
    let cells: Vec<String> = catalog
        .cols()
        .iter()
        .zip(widths)
        .map(|(c, w)| {
            let unit = if absolute {
                c.unit.strip_suffix("/s").unwrap_or(c.unit)
            } else {
                c.unit
            };
            align(c, unit, *w)
        })
        .collect();
    cells.join(" ")
}

fn data_line(row: &Row, catalog: &Catalog, widths: &[usize]) -> String {
    let cells: Vec<String> = catalog
        .cols()
        .iter()
        .zip(widths)
        .enumerate()
        .map(|(i, (c, w))| match row.cells.get(i) {
            Some(Cell::Text(s)) => fmt::cell_text(s, *w),
            Some(Cell::Num(v)) => match c.format {
                CellFormat::Float => fmt::cell_float(*v, *w),
                _ => fmt::cell_int(*v, *w),
            },
            None => " ".repeat(*w),
        })
        .collect();
    cells.join(" ")
}

/// Draws one full frame. `view` is `None` until the second snapshot makes
/// the first derived row set available.
pub fn draw(surface: &mut dyn Surface, catalog: &Catalog, state: &ViewState, view: Option<&[Row]>) {
    let (h, w) = surface.size();
    let width = w as usize;
    surface.clear();
    surface.write_at(0, 0, &title_line(state));
    if state.paused {
        surface.write_at(0, w.saturating_sub(8), " PAUSED ");
    }
    surface.write_at(1, 0, LEGEND);
    surface.write_at(2, 0, &"=".repeat(width));
    let widths = column_widths(catalog, width);
    surface.write_at(3, 0, &header_line(catalog, &widths, state.sorted_col));
    surface.write_at(4, 0, &units_line(catalog, &widths, state.absolute));
    surface.write_at(5, 0, &"-".repeat(width));
    match view {
        Some(rows) => {
            let budget = (h as usize).saturating_sub(DATA_ROW as usize);
            for (i, row) in rows.iter().take(budget).enumerate() {
                surface.write_at(DATA_ROW + i as u16, 0, &data_line(row, catalog, &widths));
            }
        }
        None => surface.write_at(DATA_ROW, 0, "collecting first snapshot..."),
    }
    surface.refresh();
}

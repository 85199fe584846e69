//! Row ordering and shared view state for the monitor.

use std::cmp::Ordering;

use chrono::{DateTime, Local};

use crate::catalog::Catalog;
use crate::engine::{Cell, Row};

/// Sort key types for table columns.
#[derive(Debug, Clone, PartialEq)]
pub enum SortKey {
    Float(f64),
    String(String),
}

impl PartialOrd for SortKey {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        match (self, other) {
            (SortKey::Float(a), SortKey::Float(b)) => a.partial_cmp(b),
            (SortKey::String(a), SortKey::String(b)) => a.partial_cmp(b),
            _ => None,
        }
    }
}

fn sort_key(row: &Row, col: usize) -> SortKey {
    match row.cells.get(col) {
        Some(Cell::Num(v)) => SortKey::Float(*v),
        Some(Cell::Text(s)) => SortKey::String(s.clone()),
        None => SortKey::Float(0.0),
    }
}

fn cmp_col(a: &Row, b: &Row, col: usize) -> Ordering {
    sort_key(a, col)
        .partial_cmp(&sort_key(b, col))
        .unwrap_or(Ordering::Equal)
}

/// Orders rows descending by the selected column, falling back to the fixed
/// `Write` and `Reltuples` columns so heavy writers stay near the top no
/// matter what is sorted on. The sort is stable; ties beyond the third key
/// keep snapshot order.
pub fn sort_rows(rows: &mut [Row], catalog: &Catalog, sorted_col: usize) {
    let write = catalog.write_col();
    let reltuples = catalog.reltuples_col();
    rows.sort_by(|a, b| {
        cmp_col(a, b, sorted_col)
            .then_with(|| cmp_col(a, b, write))
            .then_with(|| cmp_col(a, b, reltuples))
            .reverse()
    });
}

/// Mutable view state shared between the refresh and input loops. Always
/// accessed under the monitor's cycle lock.
#[derive(Debug)]
pub struct ViewState {
    pub sorted_col: usize,
    pub paused: bool,
    /// Raw per-interval deltas instead of per-second rates.
    pub absolute: bool,
    /// Message from the last failed fetch, cleared by the next good cycle.
    pub last_error: Option<String>,
    pub last_update: Option<DateTime<Local>>,
}

impl ViewState {
    pub fn new(sorted_col: usize, absolute: bool) -> Self {
        Self {
            sorted_col,
            paused: false,
            absolute,
            last_error: None,
            last_update: None,
        }
    }

    /// Moves the sorted column left or right, wrapping at both ends.
    pub fn shift_sorted(&mut self, delta: i32, ncols: usize) {
        if ncols == 0 {
            return;
        }
        let n = ncols as i64;
        self.sorted_col = (self.sorted_col as i64 + i64::from(delta)).rem_euclid(n) as usize;
    }
}

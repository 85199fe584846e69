//! Snapshot bookkeeping and per-cycle metric derivation.
//!
//! The engine keeps exactly two snapshots. Each cycle the fresh snapshot is
//! derived against the previous one, then replaces it wholesale; nothing is
//! ever mutated in place, so the only write point is the swap at the end of
//! `update`.

use std::collections::HashMap;
use std::time::Instant;

use crate::catalog::{Catalog, CellFormat, ValueKind};

/// Key of the synthetic aggregate entity.
pub const TOTAL_KEY: &str = "Total";

/// One table cell, raw or derived.
#[derive(Debug, Clone, PartialEq)]
pub enum Cell {
    Text(String),
    Num(f64),
}

/// One fetched entity: stable identity plus catalog-aligned cells.
#[derive(Debug, Clone)]
pub struct RawRow {
    pub key: String,
    pub cells: Vec<Cell>,
}

/// All rows captured from the sources at one instant, in fetch order.
#[derive(Debug, Clone, Default)]
pub struct Snapshot {
    pub rows: Vec<RawRow>,
}

/// One derived display row.
#[derive(Debug, Clone)]
pub struct Row {
    pub key: String,
    pub cells: Vec<Cell>,
}

fn num_of(cell: Option<&Cell>) -> f64 {
    match cell {
        Some(Cell::Num(v)) => *v,
        _ => 0.0,
    }
}

fn text_of(cell: Option<&Cell>) -> String {
    match cell {
        Some(Cell::Text(s)) => s.clone(),
        _ => String::new(),
    }
}

/// Synthetic row summing every numeric column across `rows`.
fn total_row(catalog: &Catalog, rows: &[RawRow]) -> RawRow {
    let cells = catalog
        .cols()
        .iter()
        .enumerate()
        .map(|(i, col)| match col.kind {
            ValueKind::String => {
                if i == catalog.key_col() {
                    Cell::Text(TOTAL_KEY.to_string())
                } else {
                    Cell::Text(String::new())
                }
            }
            _ => Cell::Num(rows.iter().map(|r| num_of(r.cells.get(i))).sum()),
        })
        .collect();
    RawRow {
        key: TOTAL_KEY.to_string(),
        cells,
    }
}

/// Derives display rows from snapshot pairs.
pub struct MetricEngine {
    prev: Option<Snapshot>,
    prev_at: Option<Instant>,
    /// When set, rate columns show the raw per-interval delta instead of a
    /// per-second rate.
    absolute: bool,
}

impl MetricEngine {
    pub fn new(absolute: bool) -> Self {
        Self {
            prev: None,
            prev_at: None,
            absolute,
        }
    }

    /// Runs one derivation cycle.
    ///
    /// The Total row is injected before anything else so it rides through
    /// delta computation like a real entity. Returns `None` on the first
    /// cycle, when no previous snapshot exists to compute rates against;
    /// the snapshot is still recorded as the new baseline.
    pub fn update(
        &mut self,
        catalog: &Catalog,
        mut current: Snapshot,
        now: Instant,
    ) -> Option<Vec<Row>> {
        current.rows.insert(0, total_row(catalog, &current.rows));

        let derived = match (&self.prev, self.prev_at) {
            (Some(prev), Some(prev_at)) => {
                let elapsed = now.duration_since(prev_at).as_secs_f64();
                Some(self.derive(catalog, &current, prev, elapsed))
            }
            _ => None,
        };

        self.prev = Some(current);
        self.prev_at = Some(now);
        derived
    }

    fn derive(
        &self,
        catalog: &Catalog,
        current: &Snapshot,
        prev: &Snapshot,
        elapsed: f64,
    ) -> Vec<Row> {
        let prev_index: HashMap<&str, &RawRow> = prev
            .rows
            .iter()
            .map(|r| (r.key.as_str(), r))
            .collect();

        current
            .rows
            .iter()
            .map(|row| {
                // Entities without a previous row (just created) start from a
                // zero baseline; entities that vanished are simply not here.
                let prev_row = prev_index.get(row.key.as_str());
                let cells = catalog
                    .cols()
                    .iter()
                    .enumerate()
                    .map(|(i, col)| match col.kind {
                        ValueKind::String => Cell::Text(text_of(row.cells.get(i))),
                        ValueKind::Absolute => Cell::Num(num_of(row.cells.get(i))),
                        ValueKind::Rate => {
                            let cur = num_of(row.cells.get(i));
                            let base = prev_row.map_or(0.0, |p| num_of(p.cells.get(i)));
                            let mut v = cur - base;
                            if !self.absolute && elapsed > 0.0 {
                                v /= elapsed;
                            }
                            if col.format == CellFormat::Int {
                                v = v.round();
                            }
                            Cell::Num(v)
                        }
                    })
                    .collect();
                Row {
                    key: row.key.clone(),
                    cells,
                }
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn catalog() -> Catalog {
        Catalog::new(1)
    }

    /// Raw row for the single-source catalog: ten numeric columns
    /// (Write, Ins, Upd, Del, UpdIdx, IdxScan, SeqScan, SeqRows, Locks,
    /// Reltuples) followed by the table name.
    fn table(name: &str, vals: [f64; 10]) -> RawRow {
        let mut cells: Vec<Cell> = vals.iter().map(|v| Cell::Num(*v)).collect();
        cells.push(Cell::Text(name.to_string()));
        RawRow {
            key: name.to_string(),
            cells,
        }
    }

    fn snap(rows: Vec<RawRow>) -> Snapshot {
        Snapshot { rows }
    }

    fn num(row: &Row, col: usize) -> f64 {
        match &row.cells[col] {
            Cell::Num(v) => *v,
            Cell::Text(s) => panic!("expected number, got {s:?}"),
        }
    }

    fn find<'a>(rows: &'a [Row], key: &str) -> &'a Row {
        rows.iter().find(|r| r.key == key).expect("row present")
    }

    #[test]
    fn first_cycle_returns_none() {
        let cat = catalog();
        let mut engine = MetricEngine::new(false);
        let out = engine.update(
            &cat,
            snap(vec![table("a", [1.0; 10])]),
            Instant::now(),
        );
        assert!(out.is_none());
    }

    #[test]
    fn insert_rate_normalized_by_elapsed() {
        let cat = catalog();
        let ins = cat.index_of("Ins").unwrap();
        let mut engine = MetricEngine::new(false);
        let t0 = Instant::now();

        let mut base = [0.0; 10];
        base[1] = 100.0; // Ins
        engine.update(&cat, snap(vec![table("a", base)]), t0);

        let mut next = base;
        next[1] = 120.0;
        let rows = engine
            .update(&cat, snap(vec![table("a", next)]), t0 + Duration::from_secs(2))
            .unwrap();

        assert_eq!(num(find(&rows, "a"), ins), 10.0);
    }

    #[test]
    fn total_sums_numeric_columns() {
        let cat = catalog();
        let relt = cat.reltuples_col();
        let write = cat.write_col();
        let mut engine = MetricEngine::new(false);
        let t0 = Instant::now();

        let a = |w: f64, r: f64| {
            let mut v = [0.0; 10];
            v[0] = w;
            v[9] = r;
            v
        };
        engine.update(
            &cat,
            snap(vec![table("a", a(10.0, 500.0)), table("b", a(30.0, 700.0))]),
            t0,
        );
        let rows = engine
            .update(
                &cat,
                snap(vec![table("a", a(12.0, 500.0)), table("b", a(34.0, 700.0))]),
                t0 + Duration::from_secs(1),
            )
            .unwrap();

        let total = find(&rows, TOTAL_KEY);
        assert_eq!(num(total, relt), 1200.0);
        // Rates are linear, so the Total rate equals the sum of rates.
        assert_eq!(
            num(total, write),
            num(find(&rows, "a"), write) + num(find(&rows, "b"), write)
        );
        // Total is prepended, ahead of any real entity.
        assert_eq!(rows[0].key, TOTAL_KEY);
    }

    #[test]
    fn dropped_entity_is_omitted() {
        let cat = catalog();
        let mut engine = MetricEngine::new(false);
        let t0 = Instant::now();
        engine.update(
            &cat,
            snap(vec![table("keep", [1.0; 10]), table("gone", [1.0; 10])]),
            t0,
        );
        let rows = engine
            .update(
                &cat,
                snap(vec![table("keep", [2.0; 10])]),
                t0 + Duration::from_secs(1),
            )
            .unwrap();
        assert!(rows.iter().all(|r| r.key != "gone"));
        assert!(rows.iter().any(|r| r.key == "keep"));
    }

    #[test]
    fn new_entity_rates_from_zero_baseline() {
        let cat = catalog();
        let ins = cat.index_of("Ins").unwrap();
        let mut engine = MetricEngine::new(false);
        let t0 = Instant::now();
        engine.update(&cat, snap(vec![table("old", [0.0; 10])]), t0);

        let mut v = [0.0; 10];
        v[1] = 50.0;
        let rows = engine
            .update(
                &cat,
                snap(vec![table("old", [0.0; 10]), table("fresh", v)]),
                t0 + Duration::from_secs(2),
            )
            .unwrap();
        assert_eq!(num(find(&rows, "fresh"), ins), 25.0);
    }

    #[test]
    fn zero_elapsed_falls_back_to_raw_delta() {
        let cat = catalog();
        let ins = cat.index_of("Ins").unwrap();
        let mut engine = MetricEngine::new(false);
        let t0 = Instant::now();

        let mut base = [0.0; 10];
        engine.update(&cat, snap(vec![table("a", base)]), t0);
        base[1] = 20.0;
        let rows = engine.update(&cat, snap(vec![table("a", base)]), t0).unwrap();
        assert_eq!(num(find(&rows, "a"), ins), 20.0);
    }

    #[test]
    fn negative_delta_passes_through() {
        // A table dropped and recreated under the same name restarts its
        // counters; the one odd negative cycle is shown, not clamped.
        let cat = catalog();
        let ins = cat.index_of("Ins").unwrap();
        let mut engine = MetricEngine::new(false);
        let t0 = Instant::now();

        let mut v = [0.0; 10];
        v[1] = 100.0;
        engine.update(&cat, snap(vec![table("a", v)]), t0);
        v[1] = 10.0;
        let rows = engine
            .update(&cat, snap(vec![table("a", v)]), t0 + Duration::from_secs(1))
            .unwrap();
        assert_eq!(num(find(&rows, "a"), ins), -90.0);
    }

    #[test]
    fn absolute_toggle_shows_raw_deltas() {
        let cat = catalog();
        let ins = cat.index_of("Ins").unwrap();
        let mut engine = MetricEngine::new(true);
        let t0 = Instant::now();

        let mut v = [0.0; 10];
        engine.update(&cat, snap(vec![table("a", v)]), t0);
        v[1] = 20.0;
        let rows = engine
            .update(&cat, snap(vec![table("a", v)]), t0 + Duration::from_secs(4))
            .unwrap();
        assert_eq!(num(find(&rows, "a"), ins), 20.0);
    }

    #[test]
    fn int_rates_rounded_float_rates_kept() {
        let cat = catalog();
        let ins = cat.index_of("Ins").unwrap();
        let updidx = cat.index_of("UpdIdx").unwrap();
        let mut engine = MetricEngine::new(false);
        let t0 = Instant::now();

        let mut v = [0.0; 10];
        engine.update(&cat, snap(vec![table("a", v)]), t0);
        v[1] = 3.0; // Ins
        v[4] = 3.0; // UpdIdx
        let rows = engine
            .update(&cat, snap(vec![table("a", v)]), t0 + Duration::from_secs(2))
            .unwrap();
        assert_eq!(num(find(&rows, "a"), ins), 2.0);
        assert_eq!(num(find(&rows, "a"), updidx), 1.5);
    }

    #[test]
    fn absolute_column_passes_current_value() {
        let cat = catalog();
        let locks = cat.index_of("Locks").unwrap();
        let mut engine = MetricEngine::new(false);
        let t0 = Instant::now();

        let mut v = [0.0; 10];
        v[8] = 3.0; // Locks
        engine.update(&cat, snap(vec![table("a", v)]), t0);
        v[8] = 7.0;
        let rows = engine
            .update(&cat, snap(vec![table("a", v)]), t0 + Duration::from_secs(5))
            .unwrap();
        assert_eq!(num(find(&rows, "a"), locks), 7.0);
    }

    #[test]
    fn previous_snapshot_replaced_wholesale() {
        let cat = catalog();
        let ins = cat.index_of("Ins").unwrap();
        let mut engine = MetricEngine::new(false);
        let t0 = Instant::now();

        let mut v = [0.0; 10];
        engine.update(&cat, snap(vec![table("a", v)]), t0);
        v[1] = 10.0;
        engine.update(&cat, snap(vec![table("a", v)]), t0 + Duration::from_secs(2));
        v[1] = 30.0;
        let rows = engine
            .update(&cat, snap(vec![table("a", v)]), t0 + Duration::from_secs(4))
            .unwrap();
        assert_eq!(num(find(&rows, "a"), ins), 10.0);
    }

    #[test]
    fn total_key_cell_named() {
        let cat = catalog();
        let mut engine = MetricEngine::new(false);
        let t0 = Instant::now();
        engine.update(&cat, snap(vec![table("a", [1.0; 10])]), t0);
        let rows = engine
            .update(
                &cat,
                snap(vec![table("a", [1.0; 10])]),
                t0 + Duration::from_secs(1),
            )
            .unwrap();
        let total = find(&rows, TOTAL_KEY);
        assert_eq!(
            total.cells[cat.key_col()],
            Cell::Text(TOTAL_KEY.to_string())
        );
    }
}

//! Streaming cluster-level counters, vmstat-style.
//!
//! Each poll takes one `StatSample` of raw cumulative values; the printed
//! row derives a per-counter display value against the previous sample.
//! Counters are declared once in `build_groups`, which also decides what
//! the connected server generation supports.

use std::io::Write;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::{Duration, Instant};

use tracing::debug;

use crate::catalog::CellFormat;
use crate::collector::{CollectError, SourceConnection, queries};
use crate::engine::Cell;
use crate::fmt;

use super::ReportError;

/// Raw cumulative values from one acquisition pass.
#[derive(Debug, Clone, Default)]
pub struct StatSample {
    pub db_size_kb: f64,
    pub commits: f64,
    pub rollbacks: f64,
    pub blks_read: f64,
    pub blks_hit: f64,
    pub deadlocks: f64,
    pub blk_read_ms: f64,
    pub blk_write_ms: f64,
    pub ins: f64,
    pub upd: f64,
    pub del: f64,
    pub idx_scan: f64,
    pub seq_scan: f64,
    pub seq_rows: f64,
    pub lock_waits: f64,
    pub idle_in_txn: f64,
    pub live_procs: f64,
}

/// How a counter's display value is derived from two samples.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Derive {
    /// Current value as-is.
    Absolute,
    /// Delta divided by elapsed seconds.
    Rate,
    /// Share of sequential scans in all scans, deltas clamped at zero so a
    /// stats reset cannot produce a negative share.
    SeqShare,
    /// Share of wall time spent in a cumulative millisecond counter.
    TimeShare,
}

#[derive(Debug, Clone, Copy)]
pub enum RateFmt {
    /// One decimal below 100, none above.
    Adaptive,
    OneDecimal,
    ZeroDecimal,
    Whole,
}

pub struct CounterSpec {
    pub title: &'static str,
    pub metric: &'static str,
    pub min_width: usize,
    pub derive: Derive,
    pub fmt: RateFmt,
    pub value: fn(&StatSample) -> f64,
    pub help: &'static str,
}

pub struct Group {
    pub title: String,
    pub counters: Vec<&'static CounterSpec>,
}

const DB_SIZE: CounterSpec = CounterSpec {
    title: "DBSize",
    metric: "KB",
    min_width: 8,
    derive: Derive::Rate,
    fmt: RateFmt::Adaptive,
    value: |s: &StatSample| s.db_size_kb,
    help: "size of the database in kilobytes [pg_database_size]",
};

const INS: CounterSpec = CounterSpec {
    title: "INS",
    metric: "rows",
    min_width: 5,
    derive: Derive::Rate,
    fmt: RateFmt::OneDecimal,
    value: |s: &StatSample| s.ins,
    help: "rows inserted into user tables [pg_stat_user_tables.n_tup_ins]",
};

const UPD: CounterSpec = CounterSpec {
    title: "UPD",
    metric: "rows",
    min_width: 5,
    derive: Derive::Rate,
    fmt: RateFmt::OneDecimal,
    value: |s: &StatSample| s.upd,
    help: "rows updated in user tables [pg_stat_user_tables.n_tup_upd]",
};

const DEL: CounterSpec = CounterSpec {
    title: "DEL",
    metric: "rows",
    min_width: 5,
    derive: Derive::Rate,
    fmt: RateFmt::OneDecimal,
    value: |s: &StatSample| s.del,
    help: "rows deleted from user tables [pg_stat_user_tables.n_tup_del]",
};

const IDX: CounterSpec = CounterSpec {
    title: "IDX",
    metric: "scan",
    min_width: 5,
    derive: Derive::Rate,
    fmt: RateFmt::Adaptive,
    value: |s: &StatSample| s.idx_scan,
    help: "index scans over the threshold tables [pg_stat_user_tables.idx_scan]",
};

const SEQ: CounterSpec = CounterSpec {
    title: "SEQ",
    metric: "scan",
    min_width: 5,
    derive: Derive::Rate,
    fmt: RateFmt::Adaptive,
    value: |s: &StatSample| s.seq_scan,
    help: "sequential scans over the threshold tables [pg_stat_user_tables.seq_scan]",
};

const SEQ_SHARE: CounterSpec = CounterSpec {
    title: "SEQ%",
    metric: "scan%",
    min_width: 5,
    derive: Derive::SeqShare,
    fmt: RateFmt::Adaptive,
    value: |s: &StatSample| s.seq_scan,
    help: "share of sequential scans in all scans [100 * seq / (idx + seq)]",
};

const SEQ_ROWS: CounterSpec = CounterSpec {
    title: "SEQ_ROWS",
    metric: "rows",
    min_width: 5,
    derive: Derive::Rate,
    fmt: RateFmt::ZeroDecimal,
    value: |s: &StatSample| s.seq_rows,
    help: "rows fetched by sequential scans [pg_stat_user_tables.seq_tup_read]",
};

const HIT: CounterSpec = CounterSpec {
    title: "HIT",
    metric: "blk",
    min_width: 6,
    derive: Derive::Rate,
    fmt: RateFmt::Adaptive,
    value: |s: &StatSample| s.blks_hit,
    help: "shared buffer hits [pg_stat_database.blks_hit]",
};

const MISS: CounterSpec = CounterSpec {
    title: "MISS",
    metric: "blk",
    min_width: 5,
    derive: Derive::Rate,
    fmt: RateFmt::Adaptive,
    value: |s: &StatSample| s.blks_read,
    help: "block reads that had to leave the buffer cache [pg_stat_database.blks_read]",
};

const LOCK: CounterSpec = CounterSpec {
    title: "LOCK",
    metric: "cnt",
    min_width: 5,
    derive: Derive::Absolute,
    fmt: RateFmt::Whole,
    value: |s: &StatSample| s.lock_waits,
    help: "processes waiting for a lock [pg_locks WHERE NOT granted]",
};

const DEADLOCK: CounterSpec = CounterSpec {
    title: "DEADLOCK",
    metric: "cnt",
    min_width: 5,
    derive: Derive::Rate,
    fmt: RateFmt::Adaptive,
    value: |s: &StatSample| s.deadlocks,
    help: "deadlocks detected [pg_stat_database.deadlocks] (>= 9.2)",
};

const COMMIT: CounterSpec = CounterSpec {
    title: "COMMIT",
    metric: "txn",
    min_width: 5,
    derive: Derive::Rate,
    fmt: RateFmt::Adaptive,
    value: |s: &StatSample| s.commits,
    help: "committed transactions [pg_stat_database.xact_commit]",
};

const ROLLBACK: CounterSpec = CounterSpec {
    title: "RLLBCK",
    metric: "txn",
    min_width: 5,
    derive: Derive::Rate,
    fmt: RateFmt::Adaptive,
    value: |s: &StatSample| s.rollbacks,
    help: "rolled back transactions [pg_stat_database.xact_rollback]",
};

const PROC_IDLE_TXN: CounterSpec = CounterSpec {
    title: "PROC",
    metric: "idltxn",
    min_width: 5,
    derive: Derive::Absolute,
    fmt: RateFmt::Whole,
    value: |s: &StatSample| s.idle_in_txn,
    help: "backends sitting idle inside a transaction",
};

const PROC_LIVE: CounterSpec = CounterSpec {
    title: "PROC",
    metric: "live",
    min_width: 3,
    derive: Derive::Absolute,
    fmt: RateFmt::Whole,
    value: |s: &StatSample| s.live_procs,
    help: "backends doing work",
};

const READ_WAIT: CounterSpec = CounterSpec {
    title: "READWA",
    metric: "wait%",
    min_width: 5,
    derive: Derive::TimeShare,
    fmt: RateFmt::Adaptive,
    value: |s: &StatSample| s.blk_read_ms,
    help: "share of wall time spent waiting for block reads [pg_stat_database.blk_read_time] (>= 9.2)",
};

const WRITE_WAIT: CounterSpec = CounterSpec {
    title: "WRITEWA",
    metric: "wait%",
    min_width: 5,
    derive: Derive::TimeShare,
    fmt: RateFmt::Adaptive,
    value: |s: &StatSample| s.blk_write_ms,
    help: "share of wall time spent waiting for block writes [pg_stat_database.blk_write_time] (>= 9.2)",
};

/// Counter groups for the connected server. Pre-9.2 servers have no
/// deadlock or block-timing statistics, so those counters are dropped.
pub fn build_groups(version_num: i32, scan_threshold: i64) -> Vec<Group> {
    let ge_92 = version_num >= 90200;
    let mut lock_counters: Vec<&'static CounterSpec> = vec![&LOCK];
    if ge_92 {
        lock_counters.push(&DEADLOCK);
    }
    let mut groups = vec![
        Group {
            title: "DataBase".to_string(),
            counters: vec![&DB_SIZE],
        },
        Group {
            title: "Write Ops".to_string(),
            counters: vec![&INS, &UPD, &DEL],
        },
        Group {
            title: format!("Scan (tables with >{}K rows)", scan_threshold / 1000),
            counters: vec![&IDX, &SEQ, &SEQ_SHARE, &SEQ_ROWS],
        },
        Group {
            title: "CacheRead".to_string(),
            counters: vec![&HIT, &MISS],
        },
        Group {
            title: "Locks".to_string(),
            counters: lock_counters,
        },
        Group {
            title: "Transactions".to_string(),
            counters: vec![&COMMIT, &ROLLBACK],
        },
        Group {
            title: "Proc".to_string(),
            counters: vec![&PROC_IDLE_TXN, &PROC_LIVE],
        },
    ];
    if ge_92 {
        groups.push(Group {
            title: "Disk Wait".to_string(),
            counters: vec![&READ_WAIT, &WRITE_WAIT],
        });
    }
    groups
}

/// Counter descriptions for the CLI help epilog, all generations included.
pub fn help_epilog() -> String {
    let mut out = String::from("Counters description:\n");
    for g in build_groups(i32::MAX, 5000) {
        for c in g.counters {
            out.push_str(&format!(
                "{:>18} - {}\n",
                format!("{} ({})", c.title, c.metric),
                c.help
            ));
        }
    }
    out
}

fn is_absolute(derive: Derive) -> bool {
    matches!(derive, Derive::Absolute | Derive::SeqShare)
}

fn seq_share(cur: &StatSample, prev: &StatSample) -> f64 {
    let d_idx = (cur.idx_scan - prev.idx_scan).max(0.0);
    let d_seq = (cur.seq_scan - prev.seq_scan).max(0.0);
    let total = d_idx + d_seq;
    if total > 0.0 { 100.0 * d_seq / total } else { 0.0 }
}

struct CounterState {
    spec: &'static CounterSpec,
    width: usize,
}

struct GroupState {
    title: String,
    counters: Vec<CounterState>,
}

/// Formats the grouped counter table: a five-line header and one row per
/// poll, every counter right-justified in its resolved width.
pub struct StatTable {
    groups: Vec<GroupState>,
    abs_mode: bool,
}

impl StatTable {
    pub fn new(groups: Vec<Group>, abs_mode: bool) -> Self {
        let groups = groups
            .into_iter()
            .map(|g| GroupState {
                title: g.title,
                counters: g
                    .counters
                    .into_iter()
                    .map(|spec| {
                        let mut metric_len = spec.metric.len();
                        if !is_absolute(spec.derive) {
                            metric_len += 2;
                        }
                        CounterState {
                            spec,
                            width: spec.min_width.max(spec.title.len()).max(metric_len),
                        }
                    })
                    .collect(),
            })
            .collect();
        Self { groups, abs_mode }
    }

    fn layout(&self, cell: impl Fn(&CounterState) -> String) -> String {
        let mut out = String::new();
        for g in &self.groups {
            for c in &g.counters {
                out.push(' ');
                out.push_str(&format!("{:>w$}", cell(c), w = c.width));
            }
            out.push_str(" |");
        }
        out
    }

    fn titles_line(&self) -> String {
        let mut out = String::new();
        for g in &self.groups {
            let span: usize = g.counters.iter().map(|c| c.width + 1).sum::<usize>() - 1;
            out.push(' ');
            out.push_str(&format!("{:>span$}", g.title));
            out.push_str(" |");
        }
        out
    }

    /// The banner printed once: rule, group titles, counter titles, units,
    /// closing rule.
    pub fn header(&self) -> String {
        let titles = self.titles_line();
        let rule_len = titles.chars().count();
        let counters = self.layout(|c| c.spec.title.to_string());
        let units = self.layout(|c| {
            if self.abs_mode || is_absolute(c.spec.derive) {
                c.spec.metric.to_string()
            } else {
                format!("{}/s", c.spec.metric)
            }
        });
        format!(
            "{}\n{}\n{}\n{}\n{}",
            "=".repeat(rule_len),
            titles,
            counters,
            units,
            "+".repeat(rule_len)
        )
    }

    fn display(&self, c: &CounterState, cur: &StatSample, prev: &StatSample, initial: &StatSample, dt: f64) -> String {
        let value = c.spec.value;
        if self.abs_mode {
            let v = match c.spec.derive {
                Derive::Absolute => value(cur),
                Derive::SeqShare => seq_share(cur, prev),
                _ => value(cur) - value(initial),
            };
            return format!("{}", v as i64);
        }
        let r = match c.spec.derive {
            Derive::Absolute => value(cur),
            Derive::SeqShare => seq_share(cur, prev),
            Derive::Rate => {
                if dt > 0.0 {
                    (value(cur) - value(prev)) / dt
                } else {
                    0.0
                }
            }
            Derive::TimeShare => {
                if dt > 0.0 {
                    100.0 * (value(cur) - value(prev)) / (dt * 1000.0)
                } else {
                    0.0
                }
            }
        };
        match c.spec.fmt {
            RateFmt::Adaptive => fmt::adaptive(r),
            RateFmt::OneDecimal => format!("{r:.1}"),
            RateFmt::ZeroDecimal => format!("{r:.0}"),
            RateFmt::Whole => format!("{}", r as i64),
        }
    }

    /// One printed row derived from the current and previous samples.
    pub fn row(&self, cur: &StatSample, prev: &StatSample, initial: &StatSample, dt: f64) -> String {
        self.layout(|c| self.display(c, cur, prev, initial, dt))
    }
}

fn num(cells: &[Cell], i: usize) -> f64 {
    match cells.get(i) {
        Some(Cell::Num(v)) => *v,
        _ => 0.0,
    }
}

/// Takes one `StatSample` from a source with the per-query formats the
/// server generation supports.
pub struct StatSampler {
    ge_92: bool,
    scan_threshold: i64,
}

impl StatSampler {
    pub fn new(version_num: i32, scan_threshold: i64) -> Self {
        Self {
            ge_92: version_num >= 90200,
            scan_threshold,
        }
    }

    pub fn sample(&self, source: &mut dyn SourceConnection) -> Result<StatSample, CollectError> {
        let mut s = StatSample::default();

        let mut db_formats = vec![CellFormat::Int; 4];
        if self.ge_92 {
            db_formats.extend([CellFormat::Int, CellFormat::Float, CellFormat::Float]);
        }
        let db = source.fetch_rows(&queries::db_totals_query(self.ge_92), &db_formats)?;
        if let Some(row) = db.first() {
            s.commits = num(row, 0);
            s.rollbacks = num(row, 1);
            s.blks_read = num(row, 2);
            s.blks_hit = num(row, 3);
            if self.ge_92 {
                s.deadlocks = num(row, 4);
                s.blk_read_ms = num(row, 5);
                s.blk_write_ms = num(row, 6);
            }
        }

        let writes = source.fetch_rows(&queries::write_totals_query(), &[CellFormat::Int; 3])?;
        if let Some(row) = writes.first() {
            s.ins = num(row, 0);
            s.upd = num(row, 1);
            s.del = num(row, 2);
        }

        let scans = source.fetch_rows(
            &queries::scan_totals_query(self.scan_threshold),
            &[CellFormat::Int; 3],
        )?;
        if let Some(row) = scans.first() {
            s.idx_scan = num(row, 0);
            s.seq_scan = num(row, 1);
            s.seq_rows = num(row, 2);
        }

        let locks = source.fetch_rows(&queries::lock_waits_query(), &[CellFormat::Int])?;
        if let Some(row) = locks.first() {
            s.lock_waits = num(row, 0);
        }

        let procs = source.fetch_rows(
            &queries::activity_query(self.ge_92),
            &[CellFormat::Text, CellFormat::Int],
        )?;
        let (idle, live) = fold_activity(&procs, self.ge_92);
        s.idle_in_txn = idle;
        s.live_procs = live;

        let size = source.fetch_rows(&queries::db_size_query(), &[CellFormat::Int])?;
        if let Some(row) = size.first() {
            s.db_size_kb = (num(row, 0) / 1024.0).floor();
        }

        Ok(s)
    }
}

/// Splits grouped backend counts into idle-in-transaction and live
/// workers. Modern servers group by `state`; pre-9.2 by the query text,
/// where idle backends report `<IDLE>` markers and our own probe must be
/// skipped.
pub fn fold_activity(rows: &[Vec<Cell>], ge_92: bool) -> (f64, f64) {
    let mut idle_in_txn = 0.0;
    let mut live = 0.0;
    for row in rows {
        let key = match row.first() {
            Some(Cell::Text(s)) => s.as_str(),
            _ => continue,
        };
        let count = num(row, 1);
        if ge_92 {
            if key == "idle in transaction" {
                idle_in_txn += count;
            } else if !key.is_empty() && !key.starts_with("idle") {
                live += count;
            }
        } else {
            if key.contains("pg_stat_activity") {
                continue;
            }
            if key == "<IDLE> in transaction" {
                idle_in_txn += count;
            } else if !key.starts_with("<IDLE>") {
                live += count;
            }
        }
    }
    (idle_in_txn, live)
}

/// Runtime options resolved by the CLI.
pub struct StatOptions {
    pub delay: Duration,
    /// Rows to print before exiting; 0 streams forever.
    pub count: u64,
    pub absolute: bool,
    pub scan_threshold: i64,
}

fn sleep_unless(stop: &AtomicBool, total: Duration) {
    let slice = Duration::from_millis(100);
    let mut remaining = total;
    while !stop.load(Ordering::Relaxed) && remaining > Duration::ZERO {
        let nap = remaining.min(slice);
        thread::sleep(nap);
        remaining = remaining.saturating_sub(nap);
    }
}

/// Prints the header, takes a baseline sample, then streams one derived
/// row per delay until the count is reached or `stop` is raised.
pub fn run(
    source: &mut dyn SourceConnection,
    version_num: i32,
    opts: &StatOptions,
    stop: &AtomicBool,
    out: &mut dyn Write,
) -> Result<(), ReportError> {
    let sampler = StatSampler::new(version_num, opts.scan_threshold);
    let table = StatTable::new(
        build_groups(version_num, opts.scan_threshold),
        opts.absolute,
    );
    writeln!(out, "{}", table.header())?;

    let initial = sampler.sample(source)?;
    let mut prev = initial.clone();
    let mut prev_at = Instant::now();
    let mut printed = 0u64;

    while !stop.load(Ordering::Relaxed) {
        sleep_unless(stop, opts.delay);
        if stop.load(Ordering::Relaxed) {
            break;
        }
        let cur = sampler.sample(source)?;
        let now = Instant::now();
        let dt = now.duration_since(prev_at).as_secs_f64();
        writeln!(out, "{}", table.row(&cur, &prev, &initial, dt))?;
        prev = cur;
        prev_at = now;
        printed += 1;
        if opts.count > 0 && printed >= opts.count {
            break;
        }
    }
    debug!("stat stream stopped after {printed} rows");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collector::mock::MockSource;

    fn table(abs_mode: bool) -> StatTable {
        StatTable::new(build_groups(90200, 5000), abs_mode)
    }

    fn sample(ins: f64, idx: f64, seq: f64) -> StatSample {
        StatSample {
            ins,
            idx_scan: idx,
            seq_scan: seq,
            ..StatSample::default()
        }
    }

    #[test]
    fn widths_fit_title_and_rate_suffix() {
        let t = table(false);
        let widths: Vec<(String, usize)> = t
            .groups
            .iter()
            .flat_map(|g| g.counters.iter().map(|c| (c.spec.title.to_string(), c.width)))
            .collect();
        let of = |name: &str| widths.iter().find(|(t, _)| t == name).unwrap().1;
        assert_eq!(of("INS"), 6);
        assert_eq!(of("SEQ_ROWS"), 8);
        assert_eq!(of("HIT"), 6);
        assert_eq!(of("SEQ%"), 5);
        assert_eq!(of("DEADLOCK"), 8);
    }

    #[test]
    fn header_carries_groups_units_and_rules() {
        let h = table(false).header();
        let lines: Vec<&str> = h.lines().collect();
        assert_eq!(lines.len(), 5);
        assert!(lines[0].chars().all(|c| c == '='));
        assert!(lines[1].contains("Write Ops"));
        assert!(lines[1].contains("Disk Wait"));
        assert!(lines[2].contains("SEQ_ROWS"));
        assert!(lines[3].contains("KB/s"));
        assert!(lines[3].contains("scan%"));
        assert!(!lines[3].contains("scan%/s"));
        assert!(lines[4].chars().all(|c| c == '+'));
        assert_eq!(lines[0].len(), lines[4].len());
    }

    #[test]
    fn absolute_mode_drops_all_rate_suffixes() {
        let h = table(true).header();
        assert!(h.contains(" KB "));
        assert!(!h.contains("KB/s"));
    }

    #[test]
    fn rates_normalize_by_elapsed_seconds() {
        let t = table(false);
        let prev = sample(100.0, 0.0, 0.0);
        let cur = sample(120.0, 0.0, 0.0);
        let row = t.row(&cur, &prev, &prev, 2.0);
        assert!(row.contains("10.0"), "{row}");
    }

    #[test]
    fn adaptive_format_loses_decimals_at_100() {
        let t = table(false);
        let prev = StatSample::default();
        let cur = StatSample {
            commits: 500.0,
            ..StatSample::default()
        };
        let row = t.row(&cur, &prev, &prev, 2.0);
        assert!(row.contains("250"), "{row}");
        assert!(!row.contains("250.0"), "{row}");
    }

    #[test]
    fn seq_share_clamps_counter_resets() {
        let prev = sample(0.0, 100.0, 10.0);
        // idx went backwards (stats reset), seq moved forward
        let cur = sample(0.0, 40.0, 40.0);
        assert_eq!(seq_share(&cur, &prev), 100.0);
    }

    #[test]
    fn seq_share_with_no_scans_is_zero() {
        let s = sample(0.0, 5.0, 5.0);
        assert_eq!(seq_share(&s, &s), 0.0);
    }

    #[test]
    fn time_share_is_a_percentage_of_wall_time() {
        let t = table(false);
        let prev = StatSample::default();
        let cur = StatSample {
            blk_read_ms: 500.0,
            ..StatSample::default()
        };
        // 500ms of wait over 2s of wall time
        let row = t.row(&cur, &prev, &prev, 2.0);
        assert!(row.contains("25.0"), "{row}");
    }

    #[test]
    fn absolute_mode_counts_from_the_initial_sample() {
        let t = table(true);
        let initial = sample(1000.0, 0.0, 0.0);
        let prev = sample(1040.0, 0.0, 0.0);
        let cur = sample(1100.0, 0.0, 0.0);
        let row = t.row(&cur, &prev, &initial, 2.0);
        assert!(row.contains("100"), "{row}");
    }

    #[test]
    fn zero_elapsed_yields_zero_rates() {
        let t = table(false);
        let prev = sample(0.0, 0.0, 0.0);
        let cur = sample(50.0, 0.0, 0.0);
        let row = t.row(&cur, &prev, &prev, 0.0);
        assert!(row.contains("0.0"), "{row}");
        assert!(!row.contains("50"), "{row}");
    }

    #[test]
    fn old_servers_lose_gated_counters() {
        let old = build_groups(90100, 5000);
        assert!(old.iter().all(|g| g.title != "Disk Wait"));
        let titles: Vec<&str> = old
            .iter()
            .flat_map(|g| g.counters.iter().map(|c| c.title))
            .collect();
        assert!(!titles.contains(&"DEADLOCK"));
        let new = build_groups(90200, 5000);
        assert!(new.iter().any(|g| g.title == "Disk Wait"));
    }

    #[test]
    fn scan_group_title_shows_the_threshold() {
        let groups = build_groups(90200, 5000);
        assert!(groups.iter().any(|g| g.title == "Scan (tables with >5K rows)"));
    }

    #[test]
    fn activity_fold_on_state_keys() {
        let rows = vec![
            vec![Cell::Text("active".to_string()), Cell::Num(3.0)],
            vec![Cell::Text("idle".to_string()), Cell::Num(7.0)],
            vec![Cell::Text("idle in transaction".to_string()), Cell::Num(2.0)],
            vec![Cell::Text(String::new()), Cell::Num(4.0)],
        ];
        assert_eq!(fold_activity(&rows, true), (2.0, 3.0));
    }

    #[test]
    fn activity_fold_on_legacy_query_text() {
        let rows = vec![
            vec![Cell::Text("<IDLE>".to_string()), Cell::Num(5.0)],
            vec![
                Cell::Text("<IDLE> in transaction".to_string()),
                Cell::Num(1.0),
            ],
            vec![
                Cell::Text("SELECT * FROM pg_stat_activity".to_string()),
                Cell::Num(1.0),
            ],
            vec![Cell::Text("UPDATE orders SET ...".to_string()), Cell::Num(2.0)],
        ];
        assert_eq!(fold_activity(&rows, false), (1.0, 2.0));
    }

    #[test]
    fn sampler_maps_each_probe_into_the_sample() {
        let mut source = MockSource::new("db");
        source.set_rows(vec![vec![
            Cell::Num(10.0),
            Cell::Num(20.0),
            Cell::Num(30.0),
            Cell::Num(40.0),
            Cell::Num(50.0),
            Cell::Num(60.0),
            Cell::Num(70.0),
        ]]);
        let s = StatSampler::new(90200, 5000).sample(&mut source).unwrap();
        assert_eq!(source.fetch_count(), 6);
        assert_eq!(s.commits, 10.0);
        assert_eq!(s.rollbacks, 20.0);
        assert_eq!(s.blks_read, 30.0);
        assert_eq!(s.blks_hit, 40.0);
        assert_eq!(s.deadlocks, 50.0);
        assert_eq!(s.blk_write_ms, 70.0);
        assert_eq!(s.ins, 10.0);
        assert_eq!(s.idx_scan, 10.0);
        assert_eq!(s.lock_waits, 10.0);
        // 10 bytes is not even a kilobyte
        assert_eq!(s.db_size_kb, 0.0);
    }

    #[test]
    fn run_prints_the_header_then_one_row_per_poll() {
        let mut source = MockSource::new("db");
        source.set_rows(vec![vec![Cell::Num(0.0); 7]]);
        let opts = StatOptions {
            delay: Duration::from_millis(1),
            count: 2,
            absolute: false,
            scan_threshold: 5000,
        };
        let stop = AtomicBool::new(false);
        let mut out = Vec::new();
        run(&mut source, 90200, &opts, &stop, &mut out).unwrap();
        let text = String::from_utf8(out).unwrap();
        assert!(text.starts_with('='));
        assert_eq!(text.lines().count(), 7);
        // baseline plus two printed polls, six probes each
        assert_eq!(source.fetch_count(), 18);
    }

    #[test]
    fn raised_stop_flag_halts_after_the_baseline() {
        let mut source = MockSource::new("db");
        source.set_rows(vec![vec![Cell::Num(0.0); 7]]);
        let opts = StatOptions {
            delay: Duration::from_millis(1),
            count: 0,
            absolute: false,
            scan_threshold: 5000,
        };
        let stop = AtomicBool::new(true);
        let mut out = Vec::new();
        run(&mut source, 90200, &opts, &stop, &mut out).unwrap();
        let text = String::from_utf8(out).unwrap();
        assert_eq!(text.lines().count(), 5);
        assert_eq!(source.fetch_count(), 6);
    }

    #[test]
    fn epilog_describes_every_counter() {
        let e = help_epilog();
        for title in ["DBSize", "SEQ%", "DEADLOCK", "READWA", "PROC"] {
            assert!(e.contains(title), "{title}");
        }
        assert!(e.contains("pg_locks WHERE NOT granted"));
    }
}

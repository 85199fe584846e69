//! One-shot storage and access-pattern report.
//!
//! Prints the server version followed by five fixed sections: schema
//! sizes, table sizes, missing-index candidates, rarely used indexes and
//! the most written-to tables. Every section is a header rule, a title
//! and a `render_table` block, with a HINT footer where the numbers need
//! interpreting.

use std::io::Write;

use crate::catalog::CellFormat;
use crate::collector::{SourceConnection, queries};
use crate::engine::Cell;

use super::{
    ColumnRender, REPORT_WIDTH, ReportColumn, ReportError, rcol, render_table, wire_formats,
};

/// Runtime options resolved by the CLI.
pub struct InfoOptions {
    /// Rows to print per section before the ellipsis row.
    pub lines: usize,
    /// Smallest table considered by the missing-index section, in bytes.
    /// Zero inspects every table.
    pub min_tab_size: i64,
    /// Print each section's SQL above its table.
    pub show_sql: bool,
}

impl Default for InfoOptions {
    fn default() -> Self {
        Self {
            lines: 20,
            min_tab_size: 32 * 1024,
            show_sql: false,
        }
    }
}

const SCHEMA_COLUMNS: [ReportColumn; 5] = [
    rcol("schema", 32, ColumnRender::Str),
    rcol("*total_sz", 11, ColumnRender::Str),
    rcol("data_sz", 11, ColumnRender::Str),
    rcol("index_sz", 11, ColumnRender::Str),
    rcol("index_sz%", 9, ColumnRender::Percent),
];

const TABLE_COLUMNS: [ReportColumn; 10] = [
    rcol("table", 32, ColumnRender::Str),
    rcol("total_bytes", 0, ColumnRender::Int),
    rcol("*total_sz", 11, ColumnRender::Str),
    rcol("data_sz", 11, ColumnRender::Str),
    rcol("index_sz", 11, ColumnRender::Str),
    rcol("index_sz%", 9, ColumnRender::Percent),
    rcol("rows", 11, ColumnRender::Int),
    rcol("columns", 7, ColumnRender::Int),
    rcol("indexes", 7, ColumnRender::Int),
    rcol("idx%", 4, ColumnRender::Int),
];

const MISSING_COLUMNS: [ReportColumn; 6] = [
    rcol("table", 32, ColumnRender::Str),
    rcol("*too_much_seq", 14, ColumnRender::Int),
    rcol("case", 15, ColumnRender::Str),
    rcol("rel_size", 10, ColumnRender::Int),
    rcol("seq_scan", 10, ColumnRender::Int),
    rcol("idx_scan", 10, ColumnRender::Int),
];

const DEAD_COLUMNS: [ReportColumn; 7] = [
    rcol("table", 32, ColumnRender::Str),
    rcol("index", 40, ColumnRender::Str),
    rcol("*idx_size", 10, ColumnRender::Str),
    rcol("idx_size_bytes", 0, ColumnRender::Int),
    rcol("*idx_scan", 9, ColumnRender::Int),
    rcol("tup_read", 9, ColumnRender::Int),
    rcol("tup_fetch", 9, ColumnRender::Int),
];

const WRITABLE_COLUMNS: [ReportColumn; 8] = [
    rcol("table", 32, ColumnRender::Str),
    rcol("tsize", 10, ColumnRender::Str),
    rcol("*writes", 11, ColumnRender::Int),
    rcol("reads", 11, ColumnRender::Int),
    rcol("write%", 10, ColumnRender::Percent),
    rcol("ins", 10, ColumnRender::Int),
    rcol("upd", 10, ColumnRender::Int),
    rcol("del", 10, ColumnRender::Int),
];

const TABLES_HINT: &str =
    "  HINT: The bigger a table's TOTAL_SZ, the slower every operation on that table gets";

const MISSING_HINT: &str = "  HINT: The higher TOO_MUCH_SEQ, the more often the table was read by sequential scan\n        instead of an index";

const DEAD_HINT: &str = "  HINT: The bigger IDX_SIZE, the more space the index occupies. An index with\n        IDX_SCAN == 0 is never used and can be dropped to speed up INSERT/UPDATE";

const WRITABLE_HINT: &str =
    "  HINT: Tables with a significant amount of WRITEs can reveal bad application design";

fn section(
    source: &mut dyn SourceConnection,
    out: &mut dyn Write,
    opts: &InfoOptions,
    title: &str,
    query: &str,
    columns: &[ReportColumn],
    hint: Option<&str>,
) -> Result<(), ReportError> {
    writeln!(out, "{}", "=".repeat(REPORT_WIDTH))?;
    writeln!(out, "{title}")?;
    if opts.show_sql {
        writeln!(out, "{}", "-".repeat(REPORT_WIDTH))?;
        writeln!(out, "{query}")?;
    }
    let rows = source.fetch_rows(query, &wire_formats(columns))?;
    write!(out, "{}", render_table(columns, &rows, opts.lines))?;
    if let Some(hint) = hint {
        writeln!(out, "{hint}")?;
        writeln!(out)?;
    }
    Ok(())
}

/// Prints the whole report to `out`.
pub fn run(
    source: &mut dyn SourceConnection,
    opts: &InfoOptions,
    out: &mut dyn Write,
) -> Result<(), ReportError> {
    let version = source.fetch_rows(&queries::version_query(), &[CellFormat::Text])?;
    if let Some(Cell::Text(v)) = version.first().and_then(|row| row.first()) {
        writeln!(out, "{v}")?;
    }
    writeln!(out)?;

    section(
        source,
        out,
        opts,
        "All schemas sorted by TOTAL_SZ size on disk",
        &queries::schema_sizes_query(),
        &SCHEMA_COLUMNS,
        None,
    )?;
    section(
        source,
        out,
        opts,
        "All tables sorted by TOTAL_SZ size on disk",
        &queries::table_sizes_query(),
        &TABLE_COLUMNS,
        Some(TABLES_HINT),
    )?;
    let missing_title = if opts.min_tab_size > 0 {
        format!(
            "Tables with size > {}KB and missing indexes (lots of sequential scans)",
            opts.min_tab_size / 1024
        )
    } else {
        "All tables with missing indexes".to_string()
    };
    section(
        source,
        out,
        opts,
        &missing_title,
        &queries::missing_indexes_query(opts.min_tab_size),
        &MISSING_COLUMNS,
        Some(MISSING_HINT),
    )?;
    section(
        source,
        out,
        opts,
        "Less frequently accessed indexes ordered by IDX_SIZE",
        &queries::dead_indexes_query(),
        &DEAD_COLUMNS,
        Some(DEAD_HINT),
    )?;
    section(
        source,
        out,
        opts,
        "Most frequently modified tables",
        &queries::writable_tables_query(),
        &WRITABLE_COLUMNS,
        Some(WRITABLE_HINT),
    )?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collector::mock::MockSource;

    fn report(opts: &InfoOptions) -> String {
        let mut source = MockSource::new("db");
        source.set_rows(vec![vec![Cell::Text(
            "PostgreSQL 9.6.24 on x86_64-pc-linux-gnu".to_string(),
        )]]);
        let mut out = Vec::new();
        run(&mut source, opts, &mut out).unwrap();
        String::from_utf8(out).unwrap()
    }

    #[test]
    fn version_banner_leads_the_report() {
        let text = report(&InfoOptions::default());
        assert!(text.starts_with("PostgreSQL 9.6.24"));
    }

    #[test]
    fn every_section_header_and_hint_is_printed() {
        let text = report(&InfoOptions::default());
        for title in [
            "All schemas sorted by TOTAL_SZ size on disk",
            "All tables sorted by TOTAL_SZ size on disk",
            "Tables with size > 32KB and missing indexes (lots of sequential scans)",
            "Less frequently accessed indexes ordered by IDX_SIZE",
            "Most frequently modified tables",
        ] {
            assert!(text.contains(title), "{title}");
        }
        assert_eq!(text.matches("  HINT:").count(), 4);
        assert_eq!(text.matches(&"=".repeat(REPORT_WIDTH)).count(), 5);
    }

    #[test]
    fn zero_threshold_widens_the_missing_index_section() {
        let text = report(&InfoOptions {
            min_tab_size: 0,
            ..InfoOptions::default()
        });
        assert!(text.contains("All tables with missing indexes"));
        assert!(!text.contains("missing indexes (lots of sequential scans)"));
    }

    #[test]
    fn show_sql_prints_each_query_above_its_table() {
        let quiet = report(&InfoOptions::default());
        assert!(!quiet.contains("FROM pg_tables"));
        let text = report(&InfoOptions {
            show_sql: true,
            ..InfoOptions::default()
        });
        assert!(text.contains("FROM pg_tables"));
        assert!(text.contains("FROM pg_stat_user_indexes"));
        assert!(text.contains(&"-".repeat(REPORT_WIDTH)));
    }
}

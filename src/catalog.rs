//! Declarative column catalog for the live monitor.
//!
//! Every displayed column is one `ColumnSpec` entry: adding a metric means
//! adding a row to `CATALOG`, not writing code. The catalog drives the SQL
//! select list, row parsing, rate derivation, sorting and rendering.

/// How a column's value relates to time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueKind {
    /// Raw text, passed through (entity name, database name).
    String,
    /// Raw current value, never delta'd.
    Absolute,
    /// Delta against the previous snapshot, normalized by elapsed seconds.
    Rate,
}

/// How a cell is parsed from the wire and printed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CellFormat {
    Text,
    Int,
    Float,
}

/// One column definition.
#[derive(Debug, Clone)]
pub struct ColumnSpec {
    pub name: &'static str,
    /// Display width in characters. 0 marks the fill column whose width is
    /// derived from the terminal at draw time.
    pub width: usize,
    pub kind: ValueKind,
    pub format: CellFormat,
    /// Field name in the metric query's select list.
    pub source: &'static str,
    pub unit: &'static str,
    pub help: &'static str,
}

const fn col(
    name: &'static str,
    width: usize,
    kind: ValueKind,
    format: CellFormat,
    source: &'static str,
    unit: &'static str,
    help: &'static str,
) -> ColumnSpec {
    ColumnSpec {
        name,
        width,
        kind,
        format,
        source,
        unit,
        help,
    }
}

/// Full column set, in display order. The `Db` column is dropped when a
/// single database is monitored; the entity-name column is last so the one
/// wide string column absorbs the remaining terminal width.
const CATALOG: &[ColumnSpec] = &[
    col(
        "Db",
        8,
        ValueKind::String,
        CellFormat::Text,
        "dbname",
        "name",
        "database the row was collected from",
    ),
    col(
        "Write",
        8,
        ValueKind::Rate,
        CellFormat::Int,
        "writes",
        "row/s",
        "rows written: inserted + updated + deleted [pg_stat_user_tables]",
    ),
    col(
        "Ins",
        8,
        ValueKind::Rate,
        CellFormat::Int,
        "n_tup_ins",
        "row/s",
        "rows inserted [pg_stat_user_tables.n_tup_ins]",
    ),
    col(
        "Upd",
        8,
        ValueKind::Rate,
        CellFormat::Int,
        "n_tup_upd",
        "row/s",
        "rows updated [pg_stat_user_tables.n_tup_upd]",
    ),
    col(
        "Del",
        8,
        ValueKind::Rate,
        CellFormat::Int,
        "n_tup_del",
        "row/s",
        "rows deleted [pg_stat_user_tables.n_tup_del]",
    ),
    col(
        "UpdIdx",
        8,
        ValueKind::Rate,
        CellFormat::Float,
        "n_tup_idx_upd",
        "row/s",
        "updates that had to touch indexes, i.e. not HOT [n_tup_upd - n_tup_hot_upd]",
    ),
    col(
        "IdxScan",
        8,
        ValueKind::Rate,
        CellFormat::Int,
        "idx_scan",
        "scan/s",
        "index scans on the table [pg_stat_user_tables.idx_scan]",
    ),
    col(
        "SeqScan",
        8,
        ValueKind::Rate,
        CellFormat::Int,
        "seq_scan",
        "scan/s",
        "sequential scans on the table [pg_stat_user_tables.seq_scan]",
    ),
    col(
        "SeqRows",
        8,
        ValueKind::Rate,
        CellFormat::Int,
        "seq_tup_read",
        "row/s",
        "rows read by sequential scans [pg_stat_user_tables.seq_tup_read]",
    ),
    col(
        "Locks",
        5,
        ValueKind::Absolute,
        CellFormat::Int,
        "lock_waits",
        "count",
        "ungranted locks on the table [pg_locks WHERE NOT granted]",
    ),
    col(
        "Reltuples",
        10,
        ValueKind::Absolute,
        CellFormat::Int,
        "reltuples",
        "count",
        "estimated row count [pg_class.reltuples]",
    ),
    col(
        "Table",
        0,
        ValueKind::String,
        CellFormat::Text,
        "tablename",
        "name",
        "table name, schema-qualified unless in public",
    ),
];

/// Resolved catalog for one monitor session.
#[derive(Debug, Clone)]
pub struct Catalog {
    cols: Vec<ColumnSpec>,
    write_col: usize,
    reltuples_col: usize,
    key_col: usize,
}

impl Catalog {
    /// Builds the catalog for `source_count` configured databases.
    pub fn new(source_count: usize) -> Self {
        let cols: Vec<ColumnSpec> = CATALOG
            .iter()
            .filter(|c| source_count > 1 || c.name != "Db")
            .cloned()
            .collect();
        let index = |name: &str| {
            cols.iter()
                .position(|c| c.name == name)
                .unwrap_or_default()
        };
        let write_col = index("Write");
        let reltuples_col = index("Reltuples");
        let key_col = index("Table");
        Self {
            cols,
            write_col,
            reltuples_col,
            key_col,
        }
    }

    pub fn cols(&self) -> &[ColumnSpec] {
        &self.cols
    }

    pub fn len(&self) -> usize {
        self.cols.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cols.is_empty()
    }

    /// Index of the column with the given display name.
    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.cols.iter().position(|c| c.name == name)
    }

    /// Display names, for CLI validation messages.
    pub fn names(&self) -> Vec<&'static str> {
        self.cols.iter().map(|c| c.name).collect()
    }

    /// Per-column wire formats, aligned with the select list.
    pub fn formats(&self) -> Vec<CellFormat> {
        self.cols.iter().map(|c| c.format).collect()
    }

    /// First fallback sort column.
    pub fn write_col(&self) -> usize {
        self.write_col
    }

    /// Second fallback sort column.
    pub fn reltuples_col(&self) -> usize {
        self.reltuples_col
    }

    /// Column holding the entity name.
    pub fn key_col(&self) -> usize {
        self.key_col
    }

    pub fn default_sort(&self) -> usize {
        self.write_col
    }

    /// Column descriptions for the CLI help epilog.
    pub fn help_epilog(&self) -> String {
        let mut out = String::from("Columns:\n");
        for c in &self.cols {
            out.push_str(&format!(
                "{:>18} - {}\n",
                format!("{} ({})", c.name, c.unit),
                c.help
            ));
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn db_column_hidden_for_single_source() {
        let c = Catalog::new(1);
        assert!(c.index_of("Db").is_none());
        assert_eq!(c.len(), CATALOG.len() - 1);
    }

    #[test]
    fn db_column_shown_for_two_sources() {
        let c = Catalog::new(2);
        assert_eq!(c.index_of("Db"), Some(0));
        assert_eq!(c.len(), CATALOG.len());
    }

    #[test]
    fn fallback_and_key_columns_resolve() {
        for sources in [1, 2] {
            let c = Catalog::new(sources);
            assert_eq!(c.cols()[c.write_col()].name, "Write");
            assert_eq!(c.cols()[c.reltuples_col()].name, "Reltuples");
            assert_eq!(c.cols()[c.key_col()].name, "Table");
            assert_eq!(c.key_col(), c.len() - 1, "entity column must be last");
        }
    }

    #[test]
    fn default_sort_is_write() {
        let c = Catalog::new(1);
        assert_eq!(c.cols()[c.default_sort()].name, "Write");
    }

    #[test]
    fn formats_align_with_columns() {
        let c = Catalog::new(2);
        assert_eq!(c.formats().len(), c.len());
        assert_eq!(c.formats()[0], CellFormat::Text);
    }

    #[test]
    fn help_epilog_lists_every_column() {
        let c = Catalog::new(2);
        let help = c.help_epilog();
        for name in c.names() {
            assert!(help.contains(name), "missing {name} in epilog");
        }
    }
}

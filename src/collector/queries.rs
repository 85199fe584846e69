//! SQL text for every statistic the tools collect.
//!
//! The monitor's select list is generated from the column catalog, so the
//! wire layout always matches the parser. The report queries cast every
//! numeric output to `bigint` or `double precision` and every name-like
//! output to `text`: aggregates over bigint columns come back as `numeric`
//! and `regclass` stays `regclass`, neither of which the row parser accepts.

use crate::catalog::Catalog;

/// Doubles single quotes so user-supplied identifiers can be embedded in a
/// literal.
pub fn escape_literal(s: &str) -> String {
    s.replace('\'', "''")
}

fn select_expr(source: &str) -> String {
    match source {
        "dbname" => "current_database()::text".to_string(),
        "tablename" => "CASE WHEN u.schemaname = 'public' THEN u.relname::text \
                        ELSE u.schemaname || '.' || u.relname END"
            .to_string(),
        "writes" => "(COALESCE(u.n_tup_ins, 0) + COALESCE(u.n_tup_upd, 0) \
                     + COALESCE(u.n_tup_del, 0))::bigint"
            .to_string(),
        "n_tup_idx_upd" => {
            "(COALESCE(u.n_tup_upd, 0) - COALESCE(u.n_tup_hot_upd, 0))::double precision"
                .to_string()
        }
        "lock_waits" => "COALESCE(l.waiting, 0)::bigint".to_string(),
        "reltuples" => "c.reltuples::bigint".to_string(),
        other => format!("COALESCE(u.{other}, 0)::bigint"),
    }
}

/// Per-table activity query for the live monitor. One output column per
/// catalog column, in catalog order. Lock waits are joined in from
/// `pg_locks` grouped by relation; `schema` narrows the scan to one schema.
pub fn table_activity_query(catalog: &Catalog, schema: Option<&str>) -> String {
    let select: Vec<String> = catalog.cols().iter().map(|c| select_expr(c.source)).collect();
    let mut q = format!(
        "SELECT {} FROM pg_stat_user_tables u \
         JOIN pg_class c ON c.oid = u.relid \
         LEFT JOIN (SELECT relation, COUNT(*) AS waiting FROM pg_locks \
                    WHERE NOT granted GROUP BY relation) l ON l.relation = u.relid",
        select.join(", ")
    );
    if let Some(s) = schema {
        q.push_str(&format!(" WHERE u.schemaname = '{}'", escape_literal(s)));
    }
    q
}

/// Cluster-wide totals from `pg_stat_database`. The deadlock and block I/O
/// timing columns only exist on 9.2 and later.
pub fn db_totals_query(ge_92: bool) -> String {
    let mut cols = vec![
        "COALESCE(SUM(xact_commit), 0)::bigint",
        "COALESCE(SUM(xact_rollback), 0)::bigint",
        "COALESCE(SUM(blks_read), 0)::bigint",
        "COALESCE(SUM(blks_hit), 0)::bigint",
    ];
    if ge_92 {
        cols.push("COALESCE(SUM(deadlocks), 0)::bigint");
        cols.push("COALESCE(SUM(blk_read_time), 0)::double precision");
        cols.push("COALESCE(SUM(blk_write_time), 0)::double precision");
    }
    format!("SELECT {} FROM pg_stat_database", cols.join(", "))
}

/// Write totals over the connected database's user tables.
pub fn write_totals_query() -> String {
    "SELECT COALESCE(SUM(n_tup_ins), 0)::bigint, \
            COALESCE(SUM(n_tup_upd), 0)::bigint, \
            COALESCE(SUM(n_tup_del), 0)::bigint \
     FROM pg_stat_user_tables"
        .to_string()
}

/// Scan totals restricted to tables above the row-count threshold, so a
/// swarm of tiny lookup tables cannot drown out the interesting scans.
pub fn scan_totals_query(threshold: i64) -> String {
    format!(
        "SELECT COALESCE(SUM(p.idx_scan), 0)::bigint, \
                COALESCE(SUM(p.seq_scan), 0)::bigint, \
                COALESCE(SUM(p.seq_tup_read), 0)::bigint \
         FROM pg_stat_user_tables p \
         JOIN pg_class c ON c.oid = p.relid \
         WHERE c.reltuples > {threshold}"
    )
}

/// Ungranted locks across the whole cluster.
pub fn lock_waits_query() -> String {
    "SELECT COUNT(*)::bigint FROM pg_locks WHERE NOT granted".to_string()
}

/// Backend counts grouped by what each process is doing. 9.2 renamed
/// `current_query` to `query` and split the process state into its own
/// column, so the two forms need different grouping keys.
pub fn activity_query(ge_92: bool) -> String {
    if ge_92 {
        "SELECT COALESCE(state, '')::text, COUNT(*)::bigint \
         FROM pg_stat_activity \
         WHERE datname = current_database() AND pid <> pg_backend_pid() \
         GROUP BY state"
            .to_string()
    } else {
        "SELECT COALESCE(current_query, '')::text, COUNT(*)::bigint \
         FROM pg_stat_activity \
         WHERE datname = current_database() \
         GROUP BY current_query"
            .to_string()
    }
}

/// Size of the connected database in bytes.
pub fn db_size_query() -> String {
    "SELECT pg_database_size(current_database())::bigint".to_string()
}

/// Server banner for the report headers.
pub fn version_query() -> String {
    "SELECT version()".to_string()
}

/// Per-schema on-disk footprint, biggest first.
pub fn schema_sizes_query() -> String {
    "SELECT
    schema::text,
    pg_size_pretty(total),
    pg_size_pretty(relation),
    pg_size_pretty(indexes),
    (CASE WHEN total > 0 THEN 100 * indexes / total ELSE 0 END)::bigint
FROM (
    SELECT
        schema,
        SUM(pg_total_relation_size(qual_table))::bigint AS total,
        SUM(pg_relation_size(qual_table))::bigint AS relation,
        SUM(pg_indexes_size(qual_table))::bigint AS indexes
    FROM (
        SELECT
            schemaname AS schema,
            ('\"' || schemaname || '\".\"' || tablename || '\"')::regclass AS qual_table
        FROM pg_tables
        WHERE schemaname NOT LIKE 'pg_%'
    ) t
    GROUP BY schema
    ORDER BY total DESC
) s"
        .to_string()
}

/// Per-table on-disk footprint with column and index counts, biggest first.
pub fn table_sizes_query() -> String {
    "SELECT
    c.relname::text,
    pg_total_relation_size(c.oid) AS total_bytes,
    pg_size_pretty(pg_total_relation_size(c.oid)),
    pg_size_pretty(pg_relation_size(c.oid)),
    pg_size_pretty(pg_indexes_size(c.oid)),
    CASE WHEN pg_indexes_size(c.oid) > 0
        THEN 100 * pg_indexes_size(c.oid) / pg_total_relation_size(c.oid)
        ELSE 0 END,
    c.reltuples::bigint,
    COALESCE(s.columns, 0),
    COALESCE(i.indexes, 0),
    CASE WHEN COALESCE(s.columns, 0) > 0
        THEN 100 * COALESCE(i.indexes, 0) / s.columns
        ELSE 0 END
FROM pg_class c
    LEFT JOIN pg_namespace n ON n.oid = c.relnamespace
    LEFT JOIN (
        SELECT table_name, COUNT(*) AS columns
        FROM information_schema.columns
        GROUP BY table_name
    ) s ON s.table_name = c.relname
    LEFT JOIN (
        SELECT tablename, COUNT(tablename) AS indexes
        FROM pg_indexes
        GROUP BY tablename
    ) i ON i.tablename = c.relname
WHERE n.nspname NOT IN ('pg_catalog', 'information_schema') AND c.relkind = 'r'
ORDER BY total_bytes DESC"
        .to_string()
}

/// Tables in `public` above the size threshold where sequential scans
/// outnumber index scans.
pub fn missing_indexes_query(min_size_bytes: i64) -> String {
    format!(
        "SELECT
    relname::text,
    COALESCE(seq_scan - idx_scan, seq_scan) AS too_much_seq,
    CASE WHEN COALESCE(seq_scan - idx_scan, seq_scan) > 0
        THEN 'Missing Index?'
        ELSE 'OK' END,
    pg_relation_size(relid) AS rel_size,
    seq_scan,
    COALESCE(idx_scan, 0)
FROM pg_stat_all_tables
WHERE schemaname = 'public' AND pg_relation_size(relid) >= {min_size_bytes}
ORDER BY too_much_seq DESC"
    )
}

/// Non-unique indexes that are rarely scanned, large ones first.
pub fn dead_indexes_query() -> String {
    "SELECT
    relid::regclass::text,
    indexrelid::regclass::text,
    pg_size_pretty(pg_relation_size(indexrelid)),
    pg_relation_size(indexrelid) AS index_size_bytes,
    idx_scan,
    idx_tup_read,
    idx_tup_fetch
FROM pg_stat_user_indexes
    JOIN pg_index USING (indexrelid)
WHERE indisunique IS FALSE
ORDER BY idx_scan ASC, index_size_bytes DESC"
        .to_string()
}

/// Tables ranked by write traffic, with the write share of all activity.
pub fn writable_tables_query() -> String {
    "SELECT
    relname::text,
    pg_size_pretty(pg_relation_size(relid)),
    n_tup_upd + n_tup_ins + n_tup_del AS writes,
    COALESCE(seq_scan, 0) + COALESCE(idx_scan, 0) AS reads,
    CASE WHEN COALESCE(seq_scan, 0) + COALESCE(idx_scan, 0) > 0
        THEN 100 * (n_tup_upd + n_tup_ins + n_tup_del)
             / (n_tup_upd + n_tup_ins + n_tup_del
                + COALESCE(seq_scan, 0) + COALESCE(idx_scan, 0))
        ELSE 0 END,
    n_tup_ins,
    n_tup_upd,
    n_tup_del
FROM pg_stat_user_tables
ORDER BY n_tup_upd + n_tup_ins + n_tup_del DESC"
        .to_string()
}

//! Data acquisition from PostgreSQL sources.
//!
//! The monitor talks to every database through the `SourceConnection` trait,
//! so tests can swap in the in-memory mock. The production implementation
//! wraps a synchronous `postgres::Client` and runs each fetch inside a short
//! transaction that is committed before rows are returned; the monitored
//! server never sits on an open read transaction between polls.

pub mod mock;
pub mod queries;

use std::error::Error;
use std::fmt;

use postgres::{Client, NoTls};
use tracing::debug;

use crate::catalog::{Catalog, CellFormat};
use crate::engine::{Cell, RawRow, Snapshot};

#[derive(Debug)]
pub enum CollectError {
    /// A source could not be reached or dropped the session.
    Connection(String),
    /// The metric query itself failed.
    Query(String),
}

impl fmt::Display for CollectError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CollectError::Connection(msg) => write!(f, "connection failed: {msg}"),
            CollectError::Query(msg) => write!(f, "query failed: {msg}"),
        }
    }
}

impl Error for CollectError {}

/// Connection parameters shared by all binaries. CLI flags win; `PG*`
/// environment variables fill the gaps.
#[derive(Debug, Clone)]
pub struct ConnectConfig {
    pub host: String,
    pub port: u16,
    pub user: String,
    pub password: String,
}

fn env_or(name: &str, default: &str) -> String {
    std::env::var(name).unwrap_or_else(|_| default.to_string())
}

impl ConnectConfig {
    pub fn resolve(
        host: Option<String>,
        port: Option<u16>,
        user: Option<String>,
        password: Option<String>,
    ) -> Self {
        let port = port
            .or_else(|| std::env::var("PGPORT").ok().and_then(|p| p.parse().ok()))
            .unwrap_or(5432);
        let user = user.unwrap_or_else(|| {
            env_or("PGUSER", &env_or("USER", "postgres"))
        });
        Self {
            host: host.unwrap_or_else(|| env_or("PGHOST", "localhost")),
            port,
            user,
            password: password.unwrap_or_else(|| env_or("PGPASSWORD", "")),
        }
    }

    /// Databases to monitor: explicit names, else `$PGDATABASE`, else
    /// `postgres`.
    pub fn resolve_dbnames(names: Vec<String>) -> Vec<String> {
        if names.is_empty() {
            vec![env_or("PGDATABASE", "postgres")]
        } else {
            names
        }
    }

    pub fn connection_string(&self, dbname: &str) -> String {
        let mut s = format!(
            "host={} port={} user={} dbname={}",
            self.host, self.port, self.user, dbname
        );
        if !self.password.is_empty() {
            s.push_str(&format!(" password={}", self.password));
        }
        s
    }
}

/// One live connection to a monitored database.
pub trait SourceConnection: Send {
    /// Identity shown in the `Db` column and used to prefix entity keys.
    fn source_name(&self) -> &str;

    /// Runs `query`, parsing each result row with the given per-column
    /// formats. Implementations commit before returning.
    fn fetch_rows(
        &mut self,
        query: &str,
        formats: &[CellFormat],
    ) -> Result<Vec<Vec<Cell>>, CollectError>;
}

/// `SourceConnection` backed by a real server.
pub struct PgConnection {
    name: String,
    client: Client,
}

impl PgConnection {
    pub fn connect(cfg: &ConnectConfig, dbname: &str) -> Result<Self, CollectError> {
        let conn_str = cfg.connection_string(dbname);
        debug!("connecting to {}:{} db {}", cfg.host, cfg.port, dbname);
        let client = Client::connect(&conn_str, NoTls)
            .map_err(|e| CollectError::Connection(format!("{dbname}: {e}")))?;
        Ok(Self {
            name: dbname.to_string(),
            client,
        })
    }

    /// Server version as reported by `server_version_num`, e.g. 90200.
    pub fn server_version_num(&mut self) -> Result<i32, CollectError> {
        let row = self
            .client
            .query_one("SHOW server_version_num", &[])
            .map_err(|e| CollectError::Query(e.to_string()))?;
        let raw: String = row
            .try_get(0)
            .map_err(|e| CollectError::Query(e.to_string()))?;
        raw.trim()
            .parse()
            .map_err(|e| CollectError::Query(format!("bad server_version_num {raw:?}: {e}")))
    }
}

fn parse_row(row: &postgres::Row, formats: &[CellFormat]) -> Vec<Cell> {
    formats
        .iter()
        .enumerate()
        .map(|(i, f)| match f {
            CellFormat::Text => Cell::Text(row.try_get::<_, String>(i).unwrap_or_default()),
            CellFormat::Int => Cell::Num(row.try_get::<_, i64>(i).unwrap_or(0) as f64),
            CellFormat::Float => Cell::Num(row.try_get::<_, f64>(i).unwrap_or(0.0)),
        })
        .collect()
}

impl SourceConnection for PgConnection {
    fn source_name(&self) -> &str {
        &self.name
    }

    fn fetch_rows(
        &mut self,
        query: &str,
        formats: &[CellFormat],
    ) -> Result<Vec<Vec<Cell>>, CollectError> {
        debug!("{query}");
        let mut tx = self
            .client
            .transaction()
            .map_err(|e| CollectError::Connection(format!("{}: {e}", self.name)))?;
        let rows = tx
            .query(query, &[])
            .map_err(|e| CollectError::Query(format!("{}: {e}", self.name)))?;
        tx.commit()
            .map_err(|e| CollectError::Connection(format!("{}: {e}", self.name)))?;
        Ok(rows.iter().map(|r| parse_row(r, formats)).collect())
    }
}

/// Fans the metric query out over every configured source and concatenates
/// the results into one snapshot.
pub struct DataSource {
    sources: Vec<Box<dyn SourceConnection>>,
    query: String,
    formats: Vec<CellFormat>,
}

impl DataSource {
    pub fn new(
        sources: Vec<Box<dyn SourceConnection>>,
        catalog: &Catalog,
        schema: Option<&str>,
    ) -> Self {
        Self {
            sources,
            query: queries::table_activity_query(catalog, schema),
            formats: catalog.formats(),
        }
    }

    pub fn source_count(&self) -> usize {
        self.sources.len()
    }

    /// One acquisition pass. Any source failing abandons the whole cycle;
    /// zero sources is an empty snapshot, not an error.
    pub fn fetch(&mut self, catalog: &Catalog) -> Result<Snapshot, CollectError> {
        let prefixed = self.sources.len() > 1;
        let mut rows = Vec::new();
        for src in &mut self.sources {
            let fetched = src.fetch_rows(&self.query, &self.formats)?;
            for cells in fetched {
                let key = entity_key(src.source_name(), &cells, catalog, prefixed);
                rows.push(RawRow { key, cells });
            }
        }
        Ok(Snapshot { rows })
    }
}

/// Stable identity for one entity. With several sources the table name is
/// qualified with the source, so same-named tables in two databases never
/// share a baseline.
fn entity_key(source: &str, cells: &[Cell], catalog: &Catalog, prefixed: bool) -> String {
    let table = match cells.get(catalog.key_col()) {
        Some(Cell::Text(s)) => s.as_str(),
        _ => "",
    };
    if prefixed {
        format!("{source}:{table}")
    } else {
        table.to_string()
    }
}

//! rpgtop - live per-table PostgreSQL activity monitor.
//!
//! Polls the statistics collector on a fixed interval and renders a
//! full-screen table of per-second rates, sortable from the keyboard.
//!
//! Usage:
//!   rpgtop                      # monitor $PGDATABASE with 2s polls
//!   rpgtop -D app -D billing    # monitor two databases side by side
//!   rpgtop -d 5 -s IdxScan      # 5s polls, sorted by index scans
//!   rpgtop -S audit             # only tables in the audit schema

use std::process::exit;
use std::time::Duration;

use clap::{CommandFactory, FromArgMatches, Parser};
use tracing::warn;

use rpgtop::catalog::Catalog;
use rpgtop::collector::{ConnectConfig, DataSource, PgConnection, SourceConnection};
use rpgtop::logging::init_tui_logging;
use rpgtop::tui;

/// Live per-table PostgreSQL activity monitor.
#[derive(Parser)]
#[command(name = "rpgtop", about = "Live per-table PostgreSQL activity monitor", version)]
struct Args {
    /// Database host. Falls back to $PGHOST, then localhost.
    #[arg(long, value_name = "HOST")]
    db_host: Option<String>,

    /// Database port. Falls back to $PGPORT, then 5432.
    #[arg(long, value_name = "PORT")]
    db_port: Option<u16>,

    /// Database user. Falls back to $PGUSER, then $USER, then postgres.
    #[arg(long, value_name = "USER")]
    db_user: Option<String>,

    /// Database password. Falls back to $PGPASSWORD.
    #[arg(long, value_name = "PASS")]
    db_pass: Option<String>,

    /// Database to monitor. Repeat to monitor several databases at once.
    /// Default: $PGDATABASE, then postgres.
    #[arg(short = 'D', long = "dbname", value_name = "NAME")]
    dbname: Vec<String>,

    /// Delay between database polls in seconds.
    #[arg(short, long, default_value = "2", value_parser = clap::value_parser!(u64).range(1..))]
    delay: u64,

    /// Column the table starts sorted by.
    #[arg(short, long, default_value = "Write", value_name = "COLUMN")]
    sort: String,

    /// Restrict the table list to one schema.
    #[arg(short = 'S', long, value_name = "SCHEMA")]
    schema: Option<String>,

    /// Show raw per-interval deltas instead of per-second rates.
    #[arg(short = 'a', long = "abs")]
    absolute: bool,

    /// Increase logging verbosity (-v for debug, -vv for trace).
    /// Debug level logs every SQL statement sent.
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Quiet mode, only show errors.
    #[arg(short, long)]
    quiet: bool,
}

fn main() {
    let epilog = Catalog::new(2).help_epilog();
    let matches = Args::command().after_help(epilog).get_matches();
    let args = match Args::from_arg_matches(&matches) {
        Ok(args) => args,
        Err(e) => e.exit(),
    };

    // The screen belongs to the monitor, so logging goes to a buffer that
    // is replayed on stderr after the terminal is restored.
    let log_buffer = init_tui_logging(args.verbose, args.quiet);

    let cfg = ConnectConfig::resolve(args.db_host, args.db_port, args.db_user, args.db_pass);
    let dbnames = ConnectConfig::resolve_dbnames(args.dbname);

    let mut sources: Vec<Box<dyn SourceConnection>> = Vec::new();
    for name in &dbnames {
        match PgConnection::connect(&cfg, name) {
            Ok(conn) => sources.push(Box::new(conn)),
            Err(e) => warn!("skipping {name}: {e}"),
        }
    }
    if sources.is_empty() {
        log_buffer.dump_to_stderr();
        eprintln!(
            "error: no connection to {} at {}:{}",
            dbnames.join(", "),
            cfg.host,
            cfg.port
        );
        exit(1);
    }

    let catalog = Catalog::new(sources.len());
    let Some(sorted_col) = catalog.index_of(&args.sort) else {
        eprintln!(
            "error: unknown sort column '{}', expected one of: {}",
            args.sort,
            catalog.names().join(", ")
        );
        exit(1);
    };

    let data = DataSource::new(sources, &catalog, args.schema.as_deref());
    let result = tui::run(
        catalog,
        data,
        sorted_col,
        args.absolute,
        Duration::from_secs(args.delay),
    );
    log_buffer.dump_to_stderr();
    if let Err(e) = result {
        eprintln!("error: {e}");
        exit(1);
    }
}

//! rpgstat - streaming cluster activity counters.
//!
//! Prints one row of derived counters per poll, vmstat-style, until
//! interrupted or the requested row count is reached.
//!
//! Usage:
//!   rpgstat                 # rates every 2 seconds, forever
//!   rpgstat -d 10 -n 6      # six rows, one per 10 seconds
//!   rpgstat -a              # totals since startup instead of rates

use std::io;
use std::process::exit;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use clap::{CommandFactory, FromArgMatches, Parser};
use tracing::{error, warn};

use rpgtop::collector::{ConnectConfig, PgConnection};
use rpgtop::logging::init_logging;
use rpgtop::report::stat::{self, StatOptions};

/// Streaming PostgreSQL activity counters.
#[derive(Parser)]
#[command(name = "rpgstat", about = "Streaming PostgreSQL activity counters", version)]
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

    /// Database to sample. Default: $PGDATABASE, then postgres.
    #[arg(short = 'D', long = "dbname", value_name = "NAME")]
    dbname: Option<String>,

    /// Delay between database polls in seconds.
    #[arg(short, long, default_value = "2", value_parser = clap::value_parser!(u64).range(1..))]
    delay: u64,

    /// Exit after printing this many rows. 0 streams forever.
    #[arg(short = 'n', long, default_value = "0")]
    count: u64,

    /// Show totals accumulated since startup instead of rates.
    #[arg(short = 'a', long = "abs")]
    absolute: bool,

    /// Ignore tables with fewer rows in the IDX and SEQ scan counters.
    #[arg(short = 'r', long, default_value = "5000", value_name = "ROWS")]
    scan_threshold: i64,

    /// Increase logging verbosity (-v for debug, -vv for trace).
    /// Debug level logs every SQL statement sent.
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Quiet mode, only show errors.
    #[arg(short, long)]
    quiet: bool,
}

fn main() {
    let matches = Args::command().after_help(stat::help_epilog()).get_matches();
    let args = match Args::from_arg_matches(&matches) {
        Ok(args) => args,
        Err(e) => e.exit(),
    };

    init_logging(args.verbose, args.quiet);

    let cfg = ConnectConfig::resolve(args.db_host, args.db_port, args.db_user, args.db_pass);
    let dbname = ConnectConfig::resolve_dbnames(args.dbname.into_iter().collect()).remove(0);

    println!(
        "Connecting to {}@{}:{} db {} ...",
        cfg.user, cfg.host, cfg.port, dbname
    );
    let mut source = match PgConnection::connect(&cfg, &dbname) {
        Ok(conn) => conn,
        Err(e) => {
            error!("{e}");
            exit(1);
        }
    };
    let version_num = match source.server_version_num() {
        Ok(v) => v,
        Err(e) => {
            error!("{e}");
            exit(1);
        }
    };

    let stop = Arc::new(AtomicBool::new(false));
    {
        let stop = stop.clone();
        if let Err(e) = ctrlc::set_handler(move || stop.store(true, Ordering::Relaxed)) {
            warn!("failed to install interrupt handler: {e}");
        }
    }

    let opts = StatOptions {
        delay: Duration::from_secs(args.delay),
        count: args.count,
        absolute: args.absolute,
        scan_threshold: args.scan_threshold,
    };
    if let Err(e) = stat::run(&mut source, version_num, &opts, &stop, &mut io::stdout()) {
        error!("{e}");
        exit(1);
    }
}

//! rpginfo - one-shot storage and access-pattern report.
//!
//! Prints schema and table sizes, missing-index candidates, rarely used
//! indexes and the most written-to tables, then exits.
//!
//! Usage:
//!   rpginfo                     # report on $PGDATABASE
//!   rpginfo -l 50               # up to 50 rows per section
//!   rpginfo --min-tab-size 0    # missing-index check on every table
//!   rpginfo -s                  # include the SQL behind each section

use std::io;
use std::process::exit;

use clap::Parser;
use tracing::error;

use rpgtop::collector::{ConnectConfig, PgConnection};
use rpgtop::logging::init_logging;
use rpgtop::report::info::{self, InfoOptions};

/// One-shot PostgreSQL storage and access-pattern report.
#[derive(Parser)]
#[command(name = "rpginfo", about = "One-shot PostgreSQL storage report", version)]
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

    /// Database to report on. Default: $PGDATABASE, then postgres.
    #[arg(short = 'D', long = "dbname", value_name = "NAME")]
    dbname: Option<String>,

    /// Rows to print per section.
    #[arg(short, long, default_value = "20")]
    lines: usize,

    /// Smallest table considered by the missing-index section, in bytes.
    /// 0 inspects every table.
    #[arg(long, default_value = "32768", value_name = "BYTES")]
    min_tab_size: i64,

    /// Print the SQL behind each section.
    #[arg(short = 's', long = "sql")]
    show_sql: bool,

    /// Increase logging verbosity (-v for debug, -vv for trace).
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Quiet mode, only show errors.
    #[arg(short, long)]
    quiet: bool,
}

fn main() {
    let args = Args::parse();

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

    let opts = InfoOptions {
        lines: args.lines,
        min_tab_size: args.min_tab_size,
        show_sql: args.show_sql,
    };
    if let Err(e) = info::run(&mut source, &opts, &mut io::stdout()) {
        error!("{e}");
        exit(1);
    }
}

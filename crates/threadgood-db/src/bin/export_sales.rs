//! # Sales CSV Export
//!
//! ## Usage
//! ```bash
//! # Write March's sales to sales_2024-03-01_to_2024-03-31.csv
//! cargo run -p threadgood-db --bin export-sales -- --from 2024-03-01 --to 2024-03-31
//!
//! # Write to stdout
//! cargo run -p threadgood-db --bin export-sales -- --from 2024-03-01 --to 2024-03-31 --out -
//! ```

use anyhow::{bail, Context};
use chrono::NaiveDate;
use std::env;
use std::io;
use std::path::PathBuf;

use threadgood_core::DateRange;
use threadgood_db::service::export::{export_file_name, export_sales_to_path};
use threadgood_db::{export_sales_csv, init_tracing, AppConfig, Database, ExportError};

fn print_help() {
    println!("Threadgood Sales Export");
    println!();
    println!("Usage: export-sales --from <YYYY-MM-DD> --to <YYYY-MM-DD> [OPTIONS]");
    println!();
    println!("Options:");
    println!("  -o, --out <PATH>   Output file, `-` for stdout");
    println!("                     (default: sales_<from>_to_<to>.csv)");
    println!("  -d, --db <PATH>    Database file path (default: from threadgood.toml)");
    println!("  -h, --help         Show this help message");
}

fn parse_date(flag: &str, value: Option<&String>) -> anyhow::Result<NaiveDate> {
    let Some(value) = value else {
        bail!("{flag} needs a date");
    };
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .with_context(|| format!("{flag} expects YYYY-MM-DD, got '{value}'"))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();

    let args: Vec<String> = env::args().collect();
    let mut from = None;
    let mut to = None;
    let mut out: Option<String> = None;
    let mut db_path: Option<PathBuf> = None;

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--from" | "-f" => {
                from = Some(parse_date("--from", args.get(i + 1))?);
                i += 1;
            }
            "--to" | "-t" => {
                to = Some(parse_date("--to", args.get(i + 1))?);
                i += 1;
            }
            "--out" | "-o" => {
                out = args.get(i + 1).cloned();
                i += 1;
            }
            "--db" | "-d" => {
                db_path = args.get(i + 1).map(PathBuf::from);
                i += 1;
            }
            "--help" | "-h" => {
                print_help();
                return Ok(());
            }
            other => bail!("Unknown argument: {other}"),
        }
        i += 1;
    }

    let (Some(from), Some(to)) = (from, to) else {
        print_help();
        bail!("both --from and --to are required");
    };
    let range = DateRange::new(from, to)?;

    let mut config = AppConfig::load(None).context("loading configuration")?;
    if let Some(path) = db_path {
        config.database.path = path;
    }
    let db = Database::new(config.db_config())
        .await
        .context("opening database")?;

    let result = match out.as_deref() {
        Some("-") => export_sales_csv(&db, &range, io::stdout().lock()).await,
        target => {
            let path = target
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from(export_file_name(&range)));
            let written = export_sales_to_path(&db, &range, &path).await;
            if written.is_ok() {
                eprintln!("✓ Wrote {}", path.display());
            }
            written
        }
    };

    match result {
        Ok(rows) => {
            eprintln!("✓ Exported {rows} sales");
            Ok(())
        }
        Err(ExportError::NoSales { from, to }) => {
            bail!("No sales found between {from} and {to}")
        }
        Err(e) => Err(e.into()),
    }
}

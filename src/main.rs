mod cli;

use anyhow::{Context, Result};
use chrono::Local;
use clap::Parser;
use control_economico::config::{ServeConfig, app_paths, resolve_database};
use control_economico::dashboard::{self, PeriodFilter};
use control_economico::db::Db;
use control_economico::month::{MonthInput, parse_month};
use control_economico::report::{self, format_euro};
use control_economico::{import, ledger, web};

use crate::cli::{Cli, Command, PeriodArgs};

fn main() {
    if let Err(err) = run() {
        eprintln!("{err:#}");
        std::process::exit(1);
    }
}

fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "control_economico=info,tower_http=info".into()),
        )
        .with_writer(std::io::stderr)
        .init();
}

fn run() -> Result<()> {
    let cli = Cli::parse();
    init_tracing();

    let paths = app_paths(cli.home.clone())?;
    let location = resolve_database(cli.database_url.as_deref(), &paths)?;
    let db = Db::open(&location).with_context(|| format!("Failed to open database {location:?}"))?;

    match cli.command {
        Command::Serve(args) => {
            let config = ServeConfig {
                host: args.host,
                port: args.port,
                secret_key: args.secret_key,
            };
            let runtime = tokio::runtime::Runtime::new().context("Failed to start runtime")?;
            runtime.block_on(web::serve(&config, db))?;
            Ok(())
        }
        Command::InitDb => {
            println!("Database ready at {location:?}");
            Ok(())
        }
        Command::Import(args) => {
            let report = import::run(&db, &args.path, &args.sheet)
                .with_context(|| format!("Import from {} failed", args.path.display()))?;
            println!(
                "records\tinserted={}\tupdated={}",
                report.records_inserted, report.records_updated
            );
            println!(
                "evolucion\tinserted={}\tupdated={}",
                report.evolucion_inserted, report.evolucion_updated
            );
            println!("skipped\t{}", report.skipped);
            Ok(())
        }
        Command::Summary(args) => {
            let filter = filter_from(&args.period);
            let data = db.transact(|s| dashboard::load(s, filter))?;
            let s = data.summary;
            if args.json {
                println!("{}", serde_json::to_string_pretty(&s)?);
                return Ok(());
            }
            println!(
                "period\t{}\t{}",
                data.filter.desde,
                if data.filter.hasta.is_empty() {
                    "actualidad"
                } else {
                    data.filter.hasta.as_str()
                }
            );
            println!("months\t{}", data.records.len());
            for (label, value) in [
                ("total_forecast", s.total_forecast),
                ("total_facturado", s.total_billed),
                ("total_pendiente", s.total_pending),
                ("wip", s.wip),
                ("total_prepagado", s.total_prepaid),
                ("wip_total", s.wip_total),
                ("wip_calculado", s.wip_calculated),
            ] {
                println!("{label}\t{value}\t{}", format_euro(value));
            }
            Ok(())
        }
        Command::Report(args) => {
            let filter = filter_from(&args.period);
            let now = Local::now().naive_local();
            let report = db.transact(|s| report::generate(s, filter, now))?;
            let out = args.out.unwrap_or_else(|| report.filename.clone().into());
            std::fs::write(&out, &report.bytes)
                .with_context(|| format!("Failed to write {}", out.display()))?;
            println!("Wrote report to {}", out.display());
            Ok(())
        }
        Command::RebuildLedger(args) => {
            let from = match args.from.as_deref() {
                Some(raw) => Some(parse_month(MonthInput::Text(raw)).require(Some(raw))?),
                None => None,
            };
            let changed = db.transact(|s| ledger::rebuild_from(s, from))?;
            println!("Recomputed {changed} evolucion entries.");
            Ok(())
        }
    }
}

fn filter_from(period: &PeriodArgs) -> PeriodFilter {
    PeriodFilter::from_query(period.desde.as_deref(), period.hasta.as_deref())
}

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(name = "control-economico")]
#[command(about = "Project economic control dashboard", long_about = None)]
pub struct Cli {
    /// Override the data directory (the default database lives in <home>/data).
    #[arg(long, env = "CONTROL_ECONOMICO_HOME", global = true)]
    pub home: Option<PathBuf>,

    /// SQLite database: a file path, sqlite:///abs/path.db or sqlite::memory:.
    #[arg(long, env = "DATABASE_URL", global = true)]
    pub database_url: Option<String>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Run the web dashboard.
    Serve(ServeArgs),
    /// Create the tables if they do not exist.
    InitDb,
    /// Import the monthly table and the bolsa ledger from a workbook.
    Import(ImportArgs),
    /// Print the dashboard totals for a period.
    Summary(SummaryArgs),
    /// Write the PDF report to a file.
    Report(ReportArgs),
    /// Recompute accumulated balances of the bolsa ledger.
    RebuildLedger(RebuildArgs),
}

#[derive(Debug, Args)]
pub struct ServeArgs {
    #[arg(long, env = "HOST", default_value = "0.0.0.0")]
    pub host: String,

    #[arg(long, env = "PORT", default_value_t = control_economico::config::DEFAULT_PORT)]
    pub port: u16,

    /// Key used to sign flash cookies.
    #[arg(long, env = "SECRET_KEY", default_value = control_economico::config::DEFAULT_SECRET_KEY, hide_env_values = true)]
    pub secret_key: String,
}

#[derive(Debug, Args)]
pub struct ImportArgs {
    #[arg(long, env = "XLSX_PATH", default_value = control_economico::config::DEFAULT_XLSX_PATH)]
    pub path: PathBuf,

    #[arg(long, env = "XLSX_SHEET", default_value = control_economico::config::DEFAULT_XLSX_SHEET)]
    pub sheet: String,
}

#[derive(Debug, Args, Clone)]
pub struct PeriodArgs {
    /// First month (YYYY-MM). Defaults to 2025-04.
    #[arg(long)]
    pub desde: Option<String>,

    /// Last month (YYYY-MM). Open when omitted.
    #[arg(long)]
    pub hasta: Option<String>,
}

#[derive(Debug, Args)]
pub struct SummaryArgs {
    #[command(flatten)]
    pub period: PeriodArgs,

    /// Print the totals as a JSON object instead of tab-separated lines.
    #[arg(long)]
    pub json: bool,
}

#[derive(Debug, Args)]
pub struct ReportArgs {
    #[command(flatten)]
    pub period: PeriodArgs,

    /// Output file; defaults to informe_economico_<timestamp>.pdf in the current directory.
    #[arg(long)]
    pub out: Option<PathBuf>,
}

#[derive(Debug, Args)]
pub struct RebuildArgs {
    /// First month to recompute; all entries when omitted.
    #[arg(long)]
    pub from: Option<String>,
}

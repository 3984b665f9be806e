// lmatch - invoice detail vs. general ledger reconciliation (headless)

mod exit_codes;
mod progress;

use std::fs::File;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Mutex;

use chrono::{Local, NaiveDate};
use clap::Parser;
use ledgermatch_io::{run_match, run_preprocess, IoError};
use ledgermatch_recon::{DateRange, MatchStats, NoopSink, RunContext, RunSink, Settings};
use tracing_subscriber::fmt::time::ChronoLocal;
use tracing_subscriber::EnvFilter;

use exit_codes::{io_exit_code, recon_exit_code, EXIT_IO, EXIT_SUCCESS, EXIT_USAGE};
use progress::StderrProgress;

const DATE_FORMATS: [&str; 2] = ["%Y/%m/%d", "%Y-%m-%d"];

#[derive(Parser, Debug)]
#[command(name = "lmatch")]
#[command(about = "Match invoice detail against general-ledger receivables")]
#[command(long_version = long_version())]
#[command(version)]
#[command(after_help = "\
Examples:
  lmatch -i 發票明細.xls -l 總帳.xlsx
  lmatch -i invoices.xlsx -l ledger.xlsx -o External_Sales.xlsx -b 2021/03/01 -e 2021/03/31
  lmatch -i invoices.xlsx -l ledger.xlsx -c close.toml --json")]
struct Cli {
    /// Invoice detail workbook (.xls or .xlsx); annotated in place
    #[arg(short = 'i', long)]
    invoice: PathBuf,

    /// General ledger export (.xls or .xlsx)
    #[arg(short = 'l', long)]
    ledger: PathBuf,

    /// External sales workbook to create [default: External_Sales.xlsx]
    #[arg(short = 'o', long)]
    output: Option<PathBuf>,

    /// First invoice date (YYYY/MM/DD or YYYY-MM-DD)
    #[arg(short = 'b', long, value_parser = parse_date)]
    begin: Option<NaiveDate>,

    /// Last invoice date (YYYY/MM/DD or YYYY-MM-DD)
    #[arg(short = 'e', long, value_parser = parse_date)]
    end: Option<NaiveDate>,

    /// TOML settings file (markers, tolerance, column layouts)
    #[arg(short = 'c', long)]
    config: Option<PathBuf>,

    /// Audit log path, truncated at start [default: excel_lookup.log]
    #[arg(long)]
    log_file: Option<PathBuf>,

    /// Suppress progress output on stderr
    #[arg(short = 'q', long)]
    quiet: bool,

    /// Print match statistics as JSON on stdout
    #[arg(long)]
    json: bool,
}

fn long_version() -> &'static str {
    concat!(
        env!("CARGO_PKG_VERSION"),
        " (", env!("GIT_COMMIT_HASH"), ")",
        "\nengine:  ledgermatch-recon ", env!("CARGO_PKG_VERSION"),
        "\ntarget:  ", env!("TARGET"),
    )
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    match run(cli) {
        Ok(()) => ExitCode::from(EXIT_SUCCESS),
        Err(CliError { code, message, hint }) => {
            if !message.is_empty() {
                eprintln!("error: {}", message);
            }
            if let Some(hint) = hint {
                eprintln!("hint:  {}", hint);
            }
            ExitCode::from(code)
        }
    }
}

#[derive(Debug)]
pub struct CliError {
    pub code: u8,
    pub message: String,
    pub hint: Option<String>,
}

impl CliError {
    pub fn usage(msg: impl Into<String>) -> Self {
        Self { code: EXIT_USAGE, message: msg.into(), hint: None }
    }

    pub fn io(msg: impl Into<String>) -> Self {
        Self { code: EXIT_IO, message: msg.into(), hint: None }
    }

    /// Add a hint to an existing error.
    pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.hint = Some(hint.into());
        self
    }
}

impl From<IoError> for CliError {
    fn from(err: IoError) -> Self {
        let hint = match &err {
            IoError::MissingSheet { .. } => Some("the invoice sheet name is set by [output] invoice_sheet".to_string()),
            IoError::Write { .. } => Some("close the workbook if it is open in Excel".to_string()),
            IoError::Recon(_) => Some("no documents were modified; fix the cell and run again".to_string()),
            _ => None,
        };
        Self { code: io_exit_code(&err), message: err.to_string(), hint }
    }
}

fn parse_date(s: &str) -> Result<NaiveDate, String> {
    let s = s.trim();
    DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(s, fmt).ok())
        .ok_or_else(|| format!("invalid date '{s}' (expected YYYY/MM/DD or YYYY-MM-DD)"))
}

fn load_settings(path: Option<&Path>) -> Result<Settings, CliError> {
    let Some(path) = path else {
        return Ok(Settings::default());
    };
    let text = std::fs::read_to_string(path)
        .map_err(|e| CliError::io(format!("cannot read config '{}': {}", path.display(), e)))?;
    Settings::from_toml(&text).map_err(|e| CliError {
        code: recon_exit_code(&e),
        message: format!("{}: {}", path.display(), e),
        hint: Some("sections: [markers] [matching] [invoice_columns] [ledger_columns] [output]".into()),
    })
}

fn run(cli: Cli) -> Result<(), CliError> {
    let settings = load_settings(cli.config.as_deref())?;
    let range = DateRange::resolve(cli.begin, cli.end, Local::now().date_naive())
        .map_err(|e| {
            CliError::usage(e.to_string())
                .with_hint("with only -b the range ends today; with only -e it starts on the 1st of that month")
        })?;

    let log_path = cli
        .log_file
        .clone()
        .unwrap_or_else(|| PathBuf::from(&settings.output.log_file));
    let log_file = File::create(&log_path)
        .map_err(|e| CliError::io(format!("cannot create log file '{}': {}", log_path.display(), e)))?;

    let stats = tracing::subscriber::with_default(audit_subscriber(log_file), || {
        reconcile_files(&cli, &settings, range)
    })?;

    report(&stats, cli.json)
}

/// Audit log subscriber for one run. `RUST_LOG` overrides the `info` default.
fn audit_subscriber(file: File) -> impl tracing::Subscriber + Send + Sync {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_timer(ChronoLocal::new("%Y-%m-%d %H:%M:%S".to_string()))
        .with_ansi(false)
        .with_target(false)
        .with_env_filter(filter)
        .with_writer(Mutex::new(file))
        .finish()
}

fn reconcile_files(cli: &Cli, settings: &Settings, range: Option<DateRange>) -> Result<MatchStats, CliError> {
    let es_path = cli
        .output
        .clone()
        .unwrap_or_else(|| PathBuf::from(&settings.output.external_sales));

    tracing::info!("invoice detail: {}", cli.invoice.display());
    tracing::info!("general ledger: {}", cli.ledger.display());
    tracing::info!("external sales: {}", es_path.display());
    if let Some(r) = range {
        tracing::info!("date range: {} - {}", r.begin.format("%Y/%m/%d"), r.end.format("%Y/%m/%d"));
    }
    tracing::info!("threshold ratio: {}", settings.matching.threshold_ratio);

    let mut quiet = NoopSink;
    let mut bar = StderrProgress::default();
    let sink: &mut dyn RunSink = if cli.quiet { &mut quiet } else { &mut bar };
    let mut ctx = RunContext::new(settings, sink).with_date_range(range);

    let result = run_preprocess(&cli.ledger, &es_path, &mut ctx)
        .and_then(|_| run_match(&cli.invoice, &es_path, &mut ctx));
    match result {
        Ok(output) => Ok(output.stats),
        Err(err) => {
            tracing::error!("{err}");
            Err(err.into())
        }
    }
}

fn report(stats: &MatchStats, json: bool) -> Result<(), CliError> {
    if json {
        let out = serde_json::to_string_pretty(stats)
            .map_err(|e| CliError::io(format!("cannot serialize statistics: {e}")))?;
        println!("{out}");
        return Ok(());
    }
    println!("invoices scanned: {}", stats.invoices_scanned);
    println!("  void:           {}", stats.void);
    println!("  matched:        {}", stats.matched_invoices);
    println!("  unmatched:      {}", stats.unmatched);
    println!(
        "ledger hits:      {} ({} eligible rows)",
        stats.match_count, stats.eligible_ledger_rows
    );
    Ok(())
}

// Only compile UI module when TUI feature is enabled
#[cfg(feature = "tui")]
mod ui;

use anyhow::{Context, Result};
use capital_ledger::{
    export::format_grouped, export_to_dir, export_to_path, load_form_rows, seed_ledger, Config,
    EntryForm, ExportFormat, GroupMode, IncomeBasis, Ledger, SummaryRow, Totals,
};
use chrono::Local;
use clap::{ArgAction, Parser, Subcommand};
use serde::Serialize;
use std::fs::File;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "capital-ledger", version, about = "Daily capital, expense and production ledger")]
struct Cli {
    /// JSON config file (branding, currency, export directory, ...)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Income figure net income is derived from: production | gross-income
    #[arg(long, global = true)]
    basis: Option<IncomeBasis>,

    /// Write logs to this file (the TUI logs nowhere otherwise)
    #[arg(long, global = true)]
    log_file: Option<PathBuf>,

    /// -v info, -vv debug, -vvv trace
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Interactive ledger (default)
    Tui {
        /// Seed the session with form rows from a CSV file
        #[arg(long)]
        load: Option<PathBuf>,
    },
    /// Derive net income and capital remaining for one set of figures
    Derive {
        #[arg(long)]
        capital: Option<String>,
        #[arg(long)]
        production: Option<String>,
        #[arg(long)]
        gross_income: Option<String>,
        #[arg(long)]
        factory: Option<String>,
        #[arg(long)]
        personal: Option<String>,
        #[arg(long)]
        loans: Option<String>,
        #[arg(long)]
        rejects: Option<String>,
    },
    /// Print daily or monthly summary rows and totals for a CSV of form rows
    Summary {
        #[arg(short, long)]
        input: PathBuf,
        #[arg(short, long, default_value = "daily")]
        mode: GroupMode,
        /// Emit JSON instead of a text table
        #[arg(long)]
        json: bool,
    },
    /// Export a CSV of form rows as CSV or spreadsheet markup
    Export {
        #[arg(short, long)]
        input: PathBuf,
        /// csv | xls
        #[arg(short, long, default_value = "csv")]
        format: ExportFormat,
        /// Output file (default: timestamped name in the export directory)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let interactive = matches!(cli.command, None | Some(Command::Tui { .. }));
    init_logging(cli.verbose, cli.log_file.as_deref(), interactive)?;

    let mut config = Config::load_or_default(cli.config.as_deref())
        .with_context(|| format!("Failed to load config {:?}", cli.config))?;
    if let Some(basis) = cli.basis {
        config.income_basis = basis;
    }

    match cli.command {
        None => run_ui_mode(&config, None),
        Some(Command::Tui { load }) => run_ui_mode(&config, load.as_deref()),
        Some(Command::Derive {
            capital,
            production,
            gross_income,
            factory,
            personal,
            loans,
            rejects,
        }) => {
            let form = EntryForm {
                date: String::new(),
                capital: capital.unwrap_or_default(),
                factory_expenses: factory.unwrap_or_default(),
                personal_expenses: personal.unwrap_or_default(),
                loans: loans.unwrap_or_default(),
                rejects: rejects.unwrap_or_default(),
                production: production.unwrap_or_default(),
                gross_income: gross_income.unwrap_or_default(),
            };
            run_derive(&config, &form);
            Ok(())
        }
        Some(Command::Summary { input, mode, json }) => run_summary(&config, &input, mode, json),
        Some(Command::Export { input, format, output }) => {
            run_export(&config, &input, format, output.as_deref())
        }
    }
}

fn init_logging(verbose: u8, log_file: Option<&Path>, interactive: bool) -> Result<()> {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    match log_file {
        Some(path) => {
            let file = File::create(path)
                .with_context(|| format!("Failed to create log file {}", path.display()))?;
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_ansi(false)
                .with_writer(Mutex::new(file))
                .init();
        }
        // stderr would draw over the alternate screen
        None if interactive => {}
        None => {
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_writer(std::io::stderr)
                .init();
        }
    }

    Ok(())
}

fn load_ledger(config: &Config, input: &Path) -> Result<Ledger> {
    let inputs = load_form_rows(input)
        .with_context(|| format!("Failed to load form rows from {}", input.display()))?;
    let mut ledger = Ledger::new(config.income_basis);
    seed_ledger(&mut ledger, &inputs);
    Ok(ledger)
}

fn run_derive(config: &Config, form: &EntryForm) {
    let input = form.coerce(capital_ledger::entry::today());
    let derived = capital_ledger::derive(&input, config.income_basis);

    println!("Income basis:      {}", config.income_basis);
    println!("Total expenses:    {}", format_grouped(input.total_expenses()));
    println!("Net income:        {}", format_grouped(derived.net_income));
    println!("Capital remaining: {}", format_grouped(derived.capital_remaining));
}

#[derive(Serialize)]
struct SummaryReport {
    mode: GroupMode,
    income_basis: IncomeBasis,
    rows: Vec<SummaryRow>,
    totals: Totals,
}

fn run_summary(config: &Config, input: &Path, mode: GroupMode, json: bool) -> Result<()> {
    let ledger = load_ledger(config, input)?;
    let report = SummaryReport {
        mode,
        income_basis: config.income_basis,
        rows: ledger.summary(mode),
        totals: ledger.totals(),
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    println!("📊 {} summary - {} entries", mode.title(), ledger.len());
    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    println!(
        "{:<12} {:>6} {:>16} {:>16} {:>16} {:>18}",
        "Period", "Count", "Gross Income", "Expenses", "Net Income", "Capital Remaining"
    );
    for row in &report.rows {
        println!(
            "{:<12} {:>6} {:>16} {:>16} {:>16} {:>18}",
            row.key,
            row.entry_count,
            format_grouped(row.gross_income),
            format_grouped(row.total_expenses),
            format_grouped(row.net_income),
            format_grouped(row.capital_remaining),
        );
    }

    let t = &report.totals;
    let symbol = &config.currency_symbol;
    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    println!("Total Capital:           {}{}", symbol, format_grouped(t.total_capital));
    println!("Total Gross Income:      {}{}", symbol, format_grouped(t.total_gross_income));
    println!("Total Production:        {}", format_grouped(t.total_production));
    println!("Total Expenses:          {}{}", symbol, format_grouped(t.total_expenses()));
    println!("Total Net Income:        {}{}", symbol, format_grouped(t.total_net_income));
    println!("Final Capital Remaining: {}{}", symbol, format_grouped(t.final_capital_remaining));

    Ok(())
}

fn run_export(config: &Config, input: &Path, format: ExportFormat, output: Option<&Path>) -> Result<()> {
    let ledger = load_ledger(config, input)?;
    let now = Local::now().naive_local();

    let path = match output {
        Some(path) => {
            export_to_path(path, format, ledger.entries(), config, now)
                .with_context(|| format!("Failed to write {}", path.display()))?;
            path.to_path_buf()
        }
        None => export_to_dir(format, ledger.entries(), config, now)
            .with_context(|| format!("Failed to export into {}", config.export_dir.display()))?,
    };

    println!("✓ Exported {} entries to {}", ledger.len(), path.display());
    Ok(())
}

#[cfg(feature = "tui")]
fn run_ui_mode(config: &Config, load: Option<&Path>) -> Result<()> {
    let ledger = match load {
        Some(path) => load_ledger(config, path)?,
        None => Ledger::new(config.income_basis),
    };

    let mut app = ui::App::new(ledger, config.clone());
    ui::run_ui(&mut app)?;

    println!("✅ Session closed - {} entries (nothing is saved; export to keep them)", app.ledger.len());
    Ok(())
}

#[cfg(not(feature = "tui"))]
fn run_ui_mode(_config: &Config, _load: Option<&Path>) -> Result<()> {
    eprintln!("❌ TUI mode not available!");
    eprintln!("   Rebuild with: cargo build --features tui");
    eprintln!("   Or use: capital-ledger summary / export");
    std::process::exit(1);
}

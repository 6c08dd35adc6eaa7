mod commands;
mod input;
mod output;

use clap::{Parser, Subcommand, ValueEnum};
use colored::Colorize;
use std::process;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use commands::analysis::AnalyzeArgs;
use commands::funding::FundingArgs;
use commands::hedging::HedgeArgs;
use commands::valuation::{BondArgs, ValueArgs};

/// Pension liability hedging and funding analytics
#[derive(Parser)]
#[command(
    name = "ldi",
    version,
    about = "Pension liability hedging and funding analytics",
    long_about = "A CLI for liability-driven investment calculations with decimal \
                  precision. Values liability cash flows, prices hedging bonds, sizes \
                  DV01 hedges, tracks hedge ratios along rate paths, and projects \
                  time to full funding."
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Output format
    #[arg(long, default_value = "json", global = true)]
    output: OutputFormat,

    /// Enable debug logging on stderr
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Present value, DV01 and modified duration of a cash-flow schedule
    Value(ValueArgs),
    /// Price and sensitivity of an annual-coupon bond
    Bond(BondArgs),
    /// Size a DV01 hedge of liabilities with one bond
    Hedge(HedgeArgs),
    /// Years to full funding and growth-rate sweeps
    Funding(FundingArgs),
    /// Full liability hedging analysis across candidate bonds
    Analyze(AnalyzeArgs),
    /// Print version information
    Version,
}

#[derive(Debug, Clone, ValueEnum)]
pub enum OutputFormat {
    Json,
    Table,
    Csv,
    Minimal,
}

fn init_logging(verbose: bool) {
    let filter = if verbose {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("ldi_core=debug,ldi=debug"))
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("ldi_core=warn,ldi=warn"))
    };

    // stdout carries the command result
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let result: Result<serde_json::Value, Box<dyn std::error::Error>> = match cli.command {
        Commands::Value(args) => commands::valuation::run_value(args),
        Commands::Bond(args) => commands::valuation::run_bond(args),
        Commands::Hedge(args) => commands::hedging::run_hedge(args),
        Commands::Funding(args) => commands::funding::run_funding(args),
        Commands::Analyze(args) => commands::analysis::run_analyze(args),
        Commands::Version => {
            println!("ldi {}", env!("CARGO_PKG_VERSION"));
            return;
        }
    };

    match result {
        Ok(value) => {
            output::format_output(&cli.output, &value);
            process::exit(0);
        }
        Err(e) => {
            tracing::debug!(error = %e, "command failed");
            eprintln!("{}: {}", "error".red().bold(), e);
            process::exit(1);
        }
    }
}

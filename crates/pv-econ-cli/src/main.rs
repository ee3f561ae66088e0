mod commands;
mod input;
mod output;

use clap::{Parser, Subcommand, ValueEnum};
use colored::Colorize;
use std::process;
use tracing::Level;

use commands::evaluate::EvaluateArgs;
use commands::loan::LoanArgs;
use commands::stage::StageArgs;
use commands::stakeholder::StakeholderArgs;
use commands::tornado::TornadoArgs;

/// Photovoltaic project economics
#[derive(Parser)]
#[command(
    name = "pvecon",
    version,
    about = "Photovoltaic project economics with decimal precision",
    long_about = "Evaluates rooftop photovoltaic projects: initial investment, annual yield, \
                  income and expense, net and discounted cash flow, NPV/IRR and payback. \
                  Also builds per-stakeholder ledgers with rent and loan repayment, and ranks \
                  inputs by sensitivity across logged runs."
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Output format
    #[arg(long, default_value = "json", global = true)]
    output: OutputFormat,

    /// Log diagnostics at debug level to stderr
    #[arg(long, short, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the full evaluation and append the run to the sensitivity log
    Evaluate(EvaluateArgs),
    /// Re-run one stage against an existing results document
    Stage(StageArgs),
    /// Build stakeholder ledgers from a results document
    Stakeholder(StakeholderArgs),
    /// Loan repayment schedule
    Loan(LoanArgs),
    /// Rank inputs by correlation with an output across logged runs
    Tornado(TornadoArgs),
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

fn init_tracing(verbose: bool) {
    let level = if verbose { Level::DEBUG } else { Level::WARN };
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let result: Result<serde_json::Value, Box<dyn std::error::Error>> = match cli.command {
        Commands::Evaluate(args) => commands::evaluate::run_evaluate(args),
        Commands::Stage(args) => commands::stage::run_stage(args),
        Commands::Stakeholder(args) => commands::stakeholder::run_stakeholder(args),
        Commands::Loan(args) => commands::loan::run_loan(args),
        Commands::Tornado(args) => commands::tornado::run_tornado(args),
        Commands::Version => {
            println!("pvecon {}", env!("CARGO_PKG_VERSION"));
            return;
        }
    };

    match result {
        Ok(value) => {
            output::format_output(&cli.output, &value);
            process::exit(0);
        }
        Err(e) => {
            eprintln!("{}: {}", "error".red().bold(), e);
            process::exit(1);
        }
    }
}

mod commands;
mod config;
mod input;
mod output;

use clap::{Parser, Subcommand, ValueEnum};
use colored::Colorize;
use std::process;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use commands::history::HistoryArgs;
use commands::stress::{StressArgs, StressCustomArgs, StressSuiteArgs};
use commands::var::{BacktestArgs, VarArgs, VarScenariosArgs};

/// Portfolio risk analytics: VaR, backtesting and stress testing
#[derive(Parser)]
#[command(
    name = "prisk",
    version,
    about = "Portfolio risk analytics: VaR, backtesting and stress testing",
    long_about = "A CLI for portfolio market-risk analytics with decimal money amounts. \
                  Supports historical, parametric, Monte Carlo and hybrid VaR, Kupiec \
                  backtesting, predefined and custom stress scenarios, and a local \
                  result history."
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Output format
    #[arg(long, default_value = "json", global = true)]
    output: OutputFormat,

    /// Engine configuration file (TOML)
    #[arg(short, long, global = true)]
    config: Option<String>,

    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,
}

#[derive(Subcommand)]
enum Commands {
    /// Compute Value at Risk for a portfolio
    Var(VarArgs),
    /// Compute VaR for every method across confidence levels and horizons
    VarScenarios(VarScenariosArgs),
    /// Backtest a freshly computed VaR against realised returns (Kupiec POF)
    Backtest(BacktestArgs),
    /// Apply a predefined stress scenario
    Stress(StressArgs),
    /// Apply a custom stress scenario from a JSON file
    StressCustom(StressCustomArgs),
    /// Run every predefined scenario and summarise
    StressSuite(StressSuiteArgs),
    /// List predefined scenarios and severity levels
    Scenarios,
    /// Read stored results back from a history file
    History(HistoryArgs),
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

fn init_tracing(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level)))
        .init();
}

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let engine = match config::build_engine(cli.config.as_deref()) {
        Ok(engine) => engine,
        Err(e) => {
            eprintln!("{}: {}", "error".red().bold(), e);
            process::exit(1);
        }
    };

    let result: Result<serde_json::Value, Box<dyn std::error::Error>> = match cli.command {
        Commands::Var(args) => commands::var::run_var(&engine, args),
        Commands::VarScenarios(args) => commands::var::run_var_scenarios(&engine, args),
        Commands::Backtest(args) => commands::var::run_backtest(&engine, args),
        Commands::Stress(args) => commands::stress::run_stress(&engine, args),
        Commands::StressCustom(args) => commands::stress::run_stress_custom(&engine, args),
        Commands::StressSuite(args) => commands::stress::run_stress_suite(&engine, args),
        Commands::Scenarios => commands::stress::run_list_scenarios(&engine),
        Commands::History(args) => commands::history::run_history(args),
        Commands::Version => {
            println!("prisk {}", env!("CARGO_PKG_VERSION"));
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

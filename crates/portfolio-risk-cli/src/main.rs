mod commands;
mod input;
mod output;

use clap::{Parser, Subcommand, ValueEnum};
use colored::Colorize;
use std::process;

use commands::optimize::OptimizeArgs;
use commands::returns::ReturnsArgs;
use commands::risk::{AnalyzeArgs, RiskArgs};
use commands::simulate::SimulateArgs;

/// Portfolio risk metrics, allocation optimization and Monte Carlo simulation
#[derive(Parser)]
#[command(
    name = "prisk",
    version,
    about = "Portfolio risk metrics, allocation optimization and Monte Carlo simulation",
    long_about = "A CLI for analysing equity portfolios from daily price history: \
                  returns and covariance estimation, Sharpe / drawdown / VaR metrics, \
                  constrained allocation optimization and correlated Monte Carlo \
                  simulation. Inputs are JSON files or JSON on stdin."
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Output format
    #[arg(long, default_value = "json", global = true)]
    output: OutputFormat,

    /// Engine configuration file (JSON, or YAML with a .yaml/.yml extension)
    #[arg(long, global = true)]
    config: Option<String>,

    /// Override the annual risk-free rate (decimal, e.g. 0.04)
    #[arg(long, global = true)]
    risk_free_rate: Option<f64>,

    /// Override the number of trading days per year
    #[arg(long, global = true)]
    trading_days: Option<f64>,

    /// Log solver and builder progress to stderr
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Build daily returns, mean returns and covariance from price history
    Returns(ReturnsArgs),
    /// Historical risk metrics for a weighted portfolio (Sharpe, drawdown, VaR)
    Risk(RiskArgs),
    /// Value holdings and report their historical risk
    Analyze(AnalyzeArgs),
    /// Optimize an allocation and compare it with the current holdings
    Optimize(OptimizeArgs),
    /// Correlated Monte Carlo simulation of portfolio returns
    Simulate(SimulateArgs),
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
    let default = if verbose { "debug" } else { "warn" };
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let config = match input::config::load_config(
        cli.config.as_deref(),
        cli.risk_free_rate,
        cli.trading_days,
    ) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("{}: {}", "error".red().bold(), e);
            process::exit(1);
        }
    };

    let result: Result<serde_json::Value, Box<dyn std::error::Error>> = match cli.command {
        Commands::Returns(args) => commands::returns::run_returns(args, &config),
        Commands::Risk(args) => commands::risk::run_risk(args, &config),
        Commands::Analyze(args) => commands::risk::run_analyze(args, &config),
        Commands::Optimize(args) => commands::optimize::run_optimize(args, &config),
        Commands::Simulate(args) => commands::simulate::run_simulate(args, &config),
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

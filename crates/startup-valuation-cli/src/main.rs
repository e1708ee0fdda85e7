mod commands;
mod config;
mod input;
mod output;
mod store;

use std::path::PathBuf;
use std::process;

use clap::{Parser, Subcommand, ValueEnum};
use colored::Colorize;
use tracing_subscriber::EnvFilter;

use commands::assess::AssessArgs;
use commands::benchmarks::BenchmarksArgs;
use commands::scoring::{ResolveArgs, ScoreArgs};
use commands::valuation::{NormalizeArgs, ValuationArgs};
use commands::Context;

/// Startup valuation and health scoring
#[derive(Parser)]
#[command(
    name = "sval",
    version,
    about = "Startup valuation and health scoring",
    long_about = "Values an early-stage company with five weighted methods \
                  (Scorecard, Checklist, Venture Capital, DCF-Growth, DCF-Multiple) \
                  and scores its health against benchmarks from questionnaire answers."
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Output format
    #[arg(long, default_value = "json", global = true)]
    output: OutputFormat,

    /// Engine configuration file (YAML or JSON)
    #[arg(long, global = true)]
    config: Option<String>,

    /// Directory holding saved valuations, scores and benchmarks
    #[arg(long, default_value = ".sval", global = true)]
    store_dir: PathBuf,

    /// Log engine decisions to stderr
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the five valuation methods and blend them by stage weights
    Valuation(ValuationArgs),
    /// Clamp outlying method values around their median
    Normalize(NormalizeArgs),
    /// Score a company against benchmarks
    Score(ScoreArgs),
    /// Resolve questionnaire answers into scoring facts
    Resolve(ResolveArgs),
    /// Value, write back and score a company in one pass
    Assess(AssessArgs),
    /// Inspect or change the benchmark table
    Benchmarks(BenchmarksArgs),
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
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_env("SVAL_LOG").unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

fn run(command: Commands, ctx: &Context) -> Result<serde_json::Value, Box<dyn std::error::Error>> {
    match command {
        Commands::Valuation(args) => commands::valuation::run_valuation(args, ctx),
        Commands::Normalize(args) => commands::valuation::run_normalize(args, ctx),
        Commands::Score(args) => commands::scoring::run_score(args, ctx),
        Commands::Resolve(args) => commands::scoring::run_resolve(args, ctx),
        Commands::Assess(args) => commands::assess::run_assess(args, ctx),
        Commands::Benchmarks(args) => commands::benchmarks::run_benchmarks(args, ctx),
        Commands::Version => Ok(serde_json::json!({ "version": env!("CARGO_PKG_VERSION") })),
    }
}

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    if matches!(cli.command, Commands::Version) {
        println!("sval {}", env!("CARGO_PKG_VERSION"));
        return;
    }

    let result = config::load_config(cli.config.as_deref()).and_then(|config| {
        let ctx = Context {
            config,
            store_dir: cli.store_dir,
        };
        run(cli.command, &ctx)
    });

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

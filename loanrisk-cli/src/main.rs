use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use loanrisk::data::Table;
use loanrisk::pipeline::{ClassifierFamily, LoanDefaultPipeline, PipelineConfig, PipelineOutcome, Subset};
use tracing::info;
use tracing_subscriber::EnvFilter;

/// LoanRisk - stratified loan-default modeling with feature selection and classifier reports
#[derive(Parser, Debug)]
#[command(name = "loanrisk")]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Log at debug level (RUST_LOG overrides)
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run the pipeline on a headered CSV of loans
    Run {
        /// Input CSV path
        #[arg(short, long)]
        input: PathBuf,

        /// JSON pipeline configuration; omitted fields keep their defaults
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Write the full outcome (split sizes, selections, reports) as JSON
        #[arg(long)]
        json_out: Option<PathBuf>,
    },

    /// Run the pipeline on generated synthetic loans
    Demo {
        /// Number of loans to generate
        #[arg(long, default_value = "1000")]
        rows: usize,

        /// Share of loans that defaulted
        #[arg(long, default_value = "0.1")]
        positive_rate: f64,

        /// Generator seed
        #[arg(long, default_value = "123")]
        seed: u64,

        /// Also save the generated dataset as CSV
        #[arg(long)]
        csv_out: Option<PathBuf>,

        /// Write the full outcome as JSON
        #[arg(long)]
        json_out: Option<PathBuf>,
    },
}

fn init_logging(verbose: bool) {
    let default = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn load_config(path: Option<&PathBuf>) -> Result<PipelineConfig> {
    match path {
        Some(path) => loanrisk::io::read_json(path)
            .with_context(|| format!("failed to read config {}", path.display())),
        None => Ok(PipelineConfig::default()),
    }
}

fn execute(data: &Table, config: PipelineConfig, json_out: Option<&PathBuf>) -> Result<()> {
    let pipeline = LoanDefaultPipeline::new(config).context("invalid pipeline configuration")?;
    let outcome = pipeline.run(data).context("pipeline failed")?;
    print_outcome(&outcome);

    if let Some(path) = json_out {
        loanrisk::io::write_json(&outcome, path)
            .with_context(|| format!("failed to write {}", path.display()))?;
        info!(path = %path.display(), "wrote outcome");
    }
    Ok(())
}

fn heading(family: ClassifierFamily, subset: Subset) -> String {
    format!("{} / {}", family, subset)
}

fn print_outcome(outcome: &PipelineOutcome) {
    let sizes = &outcome.split_sizes;
    println!(
        "split: train {}, validate {}, test {}\n",
        sizes.train, sizes.validate, sizes.test
    );
    println!("SelectKBest (f_regression): {}", outcome.selections.univariate.join(", "));
    println!("RFE (linear regression):    {}\n", outcome.selections.rfe.join(", "));

    for evaluation in &outcome.evaluations {
        println!("{}", heading(evaluation.family, evaluation.subset));
        println!("{}", evaluation.report);
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match cli.command {
        Commands::Run {
            input,
            config,
            json_out,
        } => {
            let config = load_config(config.as_ref())?;
            let data = loanrisk::io::read_table(&input)
                .with_context(|| format!("failed to load {}", input.display()))?;
            execute(&data, config, json_out.as_ref())
        }
        Commands::Demo {
            rows,
            positive_rate,
            seed,
            csv_out,
            json_out,
        } => {
            let data = loanrisk::datasets::make_loans(rows, positive_rate, seed)
                .context("failed to generate synthetic loans")?;
            info!(rows, positive_rate, seed, "generated synthetic loans");
            if let Some(path) = &csv_out {
                loanrisk::io::write_table(&data, path)
                    .with_context(|| format!("failed to write {}", path.display()))?;
            }
            execute(&data, PipelineConfig::default(), json_out.as_ref())
        }
    }
}

//! jobsift CLI - job-posting structure and field extraction
//!
//! Usage: jobsift <COMMAND>
//!
//! Commands:
//!   analyze   Analyze one posting and print the result as JSON
//!   baseline  Capture a regression baseline over a corpus
//!   regress   Check the pipeline against a stored baseline

use std::io::Read;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};

use jobsift::config;
use jobsift::pipeline::oracle::OllamaOracle;
use jobsift::regression::{capture_and_store, load_corpus, run_regression, SqliteBaselineStore};
use jobsift::{Pipeline, PipelineConfig, Platform, RawDocument};

/// jobsift - structure, field extraction and fidelity validation for job postings
#[derive(Parser, Debug)]
#[command(name = "jobsift")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Pipeline configuration file (JSON). Defaults to $JOBSIFT_CONFIG, then built-ins.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Analyze one posting and print the result as JSON
    Analyze {
        /// Posting text file (reads stdin when omitted)
        file: Option<PathBuf>,

        /// Source platform hint (linkedin, indeed, glassdoor, company, other)
        #[arg(long)]
        platform: Option<Platform>,

        /// Posting URL; infers the platform when --platform is not given
        #[arg(long)]
        url: Option<String>,

        /// Refine weak fields with the configured Ollama model
        #[arg(long)]
        oracle: bool,
    },

    /// Capture a regression baseline over a corpus
    Baseline {
        /// Corpus JSON file or directory of case files
        #[arg(short, long)]
        corpus: PathBuf,

        /// Baseline database (defaults to the app data directory)
        #[arg(long)]
        db: Option<PathBuf>,

        /// Version label for the baseline (defaults to the pipeline version)
        #[arg(long)]
        label: Option<String>,
    },

    /// Check the pipeline against a stored baseline
    Regress {
        /// Corpus JSON file or directory of case files
        #[arg(short, long)]
        corpus: PathBuf,

        /// Baseline database (defaults to the app data directory)
        #[arg(long)]
        db: Option<PathBuf>,

        /// Baseline version to compare against (defaults to the latest)
        #[arg(long)]
        baseline: Option<String>,
    },
}

fn main() -> Result<()> {
    jobsift::init_tracing();
    let cli = Cli::parse();
    let config = load_config(cli.config.as_deref())?;

    match cli.command {
        Commands::Analyze {
            file,
            platform,
            url,
            oracle,
        } => cmd_analyze(config, file.as_deref(), platform, url, oracle),
        Commands::Baseline { corpus, db, label } => {
            cmd_baseline(config, &corpus, db, label.as_deref())
        }
        Commands::Regress {
            corpus,
            db,
            baseline,
        } => cmd_regress(config, &corpus, db, baseline.as_deref()),
    }
}

fn load_config(path: Option<&Path>) -> Result<PipelineConfig> {
    match path {
        Some(p) => PipelineConfig::load(p)
            .with_context(|| format!("Failed to load configuration from {}", p.display())),
        None => PipelineConfig::from_env().context("Failed to load configuration"),
    }
}

fn cmd_analyze(
    config: PipelineConfig,
    file: Option<&Path>,
    platform: Option<Platform>,
    url: Option<String>,
    oracle: bool,
) -> Result<()> {
    let text = match file {
        Some(path) => std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?,
        None => {
            let mut buf = String::new();
            std::io::stdin()
                .read_to_string(&mut buf)
                .context("Failed to read stdin")?;
            buf
        }
    };

    let mut raw = RawDocument::new(text);
    if let Some(p) = platform {
        raw = raw.with_platform(p);
    }
    if let Some(u) = url {
        raw = raw.with_source_url(u);
    }

    let mut pipeline = Pipeline::new(config);
    if oracle {
        let client = OllamaOracle::from_config(&pipeline.config().oracle)
            .context("Failed to create oracle client")?;
        pipeline = pipeline.with_oracle(Box::new(client));
    }

    let result = pipeline.analyze(&raw);
    println!("{}", serde_json::to_string_pretty(&result)?);
    Ok(())
}

fn open_store(db: Option<PathBuf>) -> Result<SqliteBaselineStore> {
    let path = db.unwrap_or_else(config::baseline_db_path);
    SqliteBaselineStore::open(&path)
        .with_context(|| format!("Failed to open baseline store {}", path.display()))
}

fn cmd_baseline(
    config: PipelineConfig,
    corpus: &Path,
    db: Option<PathBuf>,
    label: Option<&str>,
) -> Result<()> {
    let cases = load_corpus(corpus).context("Failed to load corpus")?;
    let store = open_store(db)?;
    let pipeline = Pipeline::new(config);
    let baseline = capture_and_store(&pipeline, &store, &cases, label)?;
    println!(
        "{}",
        serde_json::json!({
            "version": baseline.pipeline_version,
            "id": baseline.id,
            "cases": baseline.cases.len(),
            "aggregate": baseline.aggregate(),
        })
    );
    Ok(())
}

fn cmd_regress(
    config: PipelineConfig,
    corpus: &Path,
    db: Option<PathBuf>,
    baseline: Option<&str>,
) -> Result<()> {
    let cases = load_corpus(corpus).context("Failed to load corpus")?;
    let store = open_store(db)?;
    let pipeline = Pipeline::new(config);
    let report = run_regression(&pipeline, &store, &cases, baseline)?;
    println!("{}", serde_json::to_string_pretty(&report)?);
    if report.detected {
        std::process::exit(1);
    }
    Ok(())
}

//! vakya - Sanskrit sentence analyzer CLI
//!
//! Subcommands map one-to-one onto the orchestrator operations: analyze a
//! sentence, record a human resolution, search the corpus, and report
//! corpus statistics. Output is JSON on stdout.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use vakya_common::AnalysisMode;
use vakya_core::{Analyzer, Config};

#[derive(Parser, Debug)]
#[command(name = "vakya")]
#[command(about = "Ensemble Sanskrit sentence analyzer")]
#[command(version)]
struct Args {
    /// Configuration file (TOML)
    #[arg(short, long, env = "VAKYA_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Analyze a sentence (Devanagari, IAST, or SLP1)
    Analyze {
        text: String,

        /// Analysis mode: production, educational, or academic
        #[arg(short, long, default_value = "production")]
        mode: AnalysisMode,

        /// Surrounding context to aid disambiguation
        #[arg(long)]
        context: Option<String>,

        /// Comma-separated engine subset (grammar,morphology,lexicon)
        #[arg(long, value_delimiter = ',')]
        engines: Option<Vec<String>>,

        /// Skip cache lookup (the result is still stored)
        #[arg(long)]
        bypass_cache: bool,
    },

    /// Record a human reviewer's parse selection
    Resolve {
        sentence_id: String,

        /// Index into the stored candidate forest
        index: usize,
    },

    /// Full-text search over analyzed sentences
    Search {
        query: String,

        #[arg(short, long, default_value = "10")]
        limit: u32,
    },

    /// Corpus statistics
    Stats,

    /// Probe engine availability
    Health,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "vakya=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let args = Args::parse();

    let config = Config::load(args.config.as_deref()).context("Failed to load configuration")?;
    let analyzer = Analyzer::new(config)
        .await
        .context("Failed to initialize analyzer")?;
    info!("Analyzer initialized");

    match args.command {
        Command::Analyze { text, mode, context, engines, bypass_cache } => {
            let mut request = vakya_common::AnalysisRequest::new(text).with_mode(mode);
            if let Some(context) = context {
                request = request.with_context(context);
            }
            if let Some(engines) = engines {
                request = request.with_engines(engines);
            }
            if bypass_cache {
                request = request.bypassing_cache();
            }
            let result = analyzer.analyze(request).await?;
            println!("{}", serde_json::to_string_pretty(&result)?);
        }
        Command::Resolve { sentence_id, index } => {
            let result = analyzer.resolve(&sentence_id, index).await?;
            println!("{}", serde_json::to_string_pretty(&result)?);
        }
        Command::Search { query, limit } => {
            let hits = analyzer.search(&query, limit).await?;
            println!("{}", serde_json::to_string_pretty(&hits)?);
        }
        Command::Stats => {
            let stats = analyzer.corpus_stats().await?;
            println!("{}", serde_json::to_string_pretty(&stats)?);
        }
        Command::Health => {
            let status = analyzer.health_check().await;
            println!("{}", serde_json::to_string_pretty(&status)?);
        }
    }

    Ok(())
}

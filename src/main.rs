use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use log::{error, info, warn};

use page_sequencer::assemble::write_reordered_pdf;
use page_sequencer::config::{AppConfig, EmbeddingProvider};
use page_sequencer::embedding::embedder_from_config;
use page_sequencer::extract::extract_pages;
use page_sequencer::oracle::oracle_from_config;
use page_sequencer::report::{summarize, OrderingReport};
use page_sequencer::toc::build_table_of_contents;
use page_sequencer::PageOrderingEngine;

/// Restore the reading order of a PDF whose pages were scanned out of sequence.
#[derive(Parser)]
#[command(version, about)]
struct Args {
    #[arg(short, long)]
    input: PathBuf,
    #[arg(short, long)]
    output: PathBuf,
    /// Write a JSON report of the ordering decision here.
    #[arg(short, long)]
    report: Option<PathBuf>,
    /// JSON configuration file; flags below override it.
    #[arg(short, long)]
    config: Option<PathBuf>,
    #[arg(long)]
    oracle_url: Option<String>,
    #[arg(long)]
    oracle_model: Option<String>,
    /// Skip the oracle and order from transition scores alone.
    #[arg(long)]
    no_oracle: bool,
    /// Use an OpenAI-compatible embeddings endpoint instead of the offline embedder.
    #[arg(long)]
    embedding_url: Option<String>,
    #[arg(long)]
    embedding_model: Option<String>,
    /// Do not add a bookmark outline to the output.
    #[arg(long)]
    no_toc: bool,
}

fn load_config(args: &Args) -> Result<AppConfig> {
    let mut config = match &args.config {
        Some(path) => AppConfig::from_file(path)
            .with_context(|| format!("Failed to load config {}", path.display()))?,
        None => AppConfig::default(),
    };

    if let Some(url) = &args.oracle_url {
        config.oracle.base_url = url.clone();
    }
    if let Some(model) = &args.oracle_model {
        config.oracle.model = model.clone();
    }
    if args.no_oracle {
        config.oracle.enabled = false;
    }
    if let Some(url) = &args.embedding_url {
        config.embedding.provider = EmbeddingProvider::Http;
        config.embedding.base_url = url.clone();
    }
    if let Some(model) = &args.embedding_model {
        config.embedding.model = model.clone();
    }

    config.validate()?;
    Ok(config)
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();
    let config = load_config(&args)?;

    let pages = extract_pages(&args.input)
        .with_context(|| format!("Failed to process {}", args.input.display()))?;

    let embedder = embedder_from_config(&config.embedding).context("Failed to set up embedder")?;
    let oracle = oracle_from_config(&config.oracle).context("Failed to set up oracle")?;
    let engine = PageOrderingEngine::new(config.ordering.clone(), embedder, oracle);

    let result = engine.determine_page_order(&pages);
    if !result.success {
        error!(
            "Ordering failed ({}); keeping input order",
            result.error.as_deref().unwrap_or("unknown error")
        );
    }

    let toc = (!args.no_toc).then(|| build_table_of_contents(&result.ordered_pages));
    write_reordered_pdf(&args.input, &args.output, &result.page_order, toc.as_ref())
        .with_context(|| format!("Failed to reorder {}", args.input.display()))?;

    if let Some(report_path) = &args.report {
        let report = OrderingReport::new(&args.input, &args.output, &result, toc);
        std::fs::write(report_path, serde_json::to_string_pretty(&report)?)
            .with_context(|| format!("Failed to write report {}", report_path.display()))?;
        info!("Report written to {}", report_path.display());
    }

    if result.order_changed() {
        info!("{}", summarize(&result));
    } else {
        warn!("{}", summarize(&result));
    }
    println!("Successfully processed {}", args.input.display());
    Ok(())
}

//! ncv: checks character backstories against the novels they are set in.
//!
//! `ncv index` chunks and embeds a directory of novels into a vector index,
//! `ncv check` runs a batch CSV of backstories through the pipeline and writes
//! binary predictions with rationales.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{bail, Context};
use clap::{Args, Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use ncv_ai::embeddings::Embedder;
use ncv_ai::evidence::{build_index, ChunkParams, IndexHandle, VectorIndex};
use ncv_ai::pipeline::{decomposer_from_config, Capabilities, ConsistencyChecker};
use ncv_core::config::AppConfig;
use ncv_core::domain::Prediction;
use ncv_core::ingest::batch_csv::read_batch_csv;
use ncv_core::ingest::corpus::load_corpus_dir;
use ncv_core::report::write_predictions_csv;

#[derive(Debug, Parser)]
#[command(name = "ncv", version, about = "Narrative consistency checker for character backstories")]
struct Cli {
    /// TOML config file. `NCV_*` environment variables override it.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Debug logging (ignored when RUST_LOG is set).
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Chunk and embed every `.txt` novel in a directory into an index file.
    Index {
        #[arg(long)]
        novels: PathBuf,
        #[arg(long)]
        out: PathBuf,
    },
    /// Check a batch CSV of backstories and write predictions.
    Check(CheckArgs),
    /// Print the claims a backstory decomposes into.
    Claims { backstory: String },
    /// Print a saved index's status as JSON.
    Status {
        #[arg(long)]
        index: PathBuf,
    },
    /// Verify the local Ollama endpoint responds.
    Health,
}

#[derive(Debug, Args)]
struct CheckArgs {
    /// Batch CSV with id, backstory and novel columns.
    #[arg(long)]
    input: PathBuf,
    /// Prebuilt index from `ncv index`.
    #[arg(long, conflicts_with = "novels")]
    index: Option<PathBuf>,
    /// Build the index in memory from this directory instead.
    #[arg(long)]
    novels: Option<PathBuf>,
    /// Predictions CSV (story_id, prediction, rationale).
    #[arg(long)]
    output: PathBuf,
    /// Also dump per-claim analyses as JSON.
    #[arg(long)]
    analysis_out: Option<PathBuf>,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();

    let config = AppConfig::load(cli.config.as_deref()).context("loading configuration")?;

    match cli.command {
        Commands::Index { novels, out } => handle_index(&config, &novels, &out),
        Commands::Check(args) => handle_check(&config, args),
        Commands::Claims { backstory } => handle_claims(&config, &backstory),
        Commands::Status { index } => {
            let index = VectorIndex::load(&index)?;
            println!("{}", serde_json::to_string_pretty(&index.status())?);
            Ok(())
        }
        Commands::Health => {
            let client = ncv_ai::ollama::OllamaClient::new(
                &config.llm.base_url,
                std::time::Duration::from_secs(config.llm.timeout_secs),
            )?;
            client.health_check()?;
            println!("ollama ok at {}", client.base_url());
            Ok(())
        }
    }
}

fn chunk_params(config: &AppConfig) -> anyhow::Result<ChunkParams> {
    Ok(ChunkParams::new(config.chunking.max_chars, config.chunking.overlap)?)
}

fn index_novels(config: &AppConfig, caps: &Capabilities, novels: &Path) -> anyhow::Result<VectorIndex> {
    let documents = load_corpus_dir(novels)?;
    if documents.is_empty() {
        bail!("no .txt novels found in {}", novels.display());
    }
    let index = build_index(&documents, caps.embedder.as_ref(), chunk_params(config)?)
        .with_context(|| format!("indexing {}", novels.display()))?;
    Ok(index)
}

fn handle_index(config: &AppConfig, novels: &Path, out: &Path) -> anyhow::Result<()> {
    let caps = Capabilities::from_config(config)?;
    let index = index_novels(config, &caps, novels)?;
    index.save(out)?;

    let st = index.status();
    println!(
        "Indexed {} novels into {} chunks ({} dims) -> {}",
        st.document_count,
        st.chunk_count,
        st.dims,
        out.display()
    );
    Ok(())
}

fn handle_check(config: &AppConfig, args: CheckArgs) -> anyhow::Result<()> {
    let caps = Capabilities::from_config(config)?;

    let index = match (&args.index, &args.novels) {
        (Some(path), _) => Some(VectorIndex::load(path)?),
        (None, Some(dir)) => Some(index_novels(config, &caps, dir)?),
        (None, None) if config.retrieval.remote_url.is_some() => None,
        (None, None) => bail!("pass --index or --novels, or configure retrieval.remote_url"),
    };
    if let Some(ix) = &index {
        if let Some(model) = ix.status().embedding_model {
            if model != caps.embedder.model_id() {
                tracing::warn!(
                    index_model = %model,
                    embedder = caps.embedder.model_id(),
                    "index was built with a different embedding model"
                );
            }
        }
    }
    let handle = index.map(|ix| Arc::new(IndexHandle::new(ix)));
    let checker = ConsistencyChecker::from_config(config, &caps, handle)?;

    let batch = read_batch_csv(&args.input, &config.batch)?;
    for w in &batch.warnings {
        tracing::warn!(code = %w.code, details = w.details.as_deref().unwrap_or(""), "{}", w.message);
    }
    tracing::info!(records = batch.records.len(), skipped = batch.skipped, "loaded batch");

    let outcome = checker.run_batch(&batch.records);
    for w in &outcome.warnings {
        tracing::warn!(code = %w.code, details = w.details.as_deref().unwrap_or(""), "{}", w.message);
    }
    let rows = outcome.results.iter().map(|r| r.to_row()).collect::<Vec<_>>();
    write_predictions_csv(&args.output, &rows)?;

    if let Some(path) = &args.analysis_out {
        let json = serde_json::to_string_pretty(&outcome).context("encoding analyses")?;
        fs::write(path, json).with_context(|| format!("writing {}", path.display()))?;
    }

    let inconsistent = rows
        .iter()
        .filter(|r| r.prediction == Prediction::Inconsistent)
        .count();
    println!(
        "Checked {} stories: {} consistent, {} inconsistent, {} failed, {} rows skipped -> {}",
        rows.len(),
        rows.len() - inconsistent,
        inconsistent,
        outcome.failed,
        batch.skipped,
        args.output.display()
    );
    Ok(())
}

fn handle_claims(config: &AppConfig, backstory: &str) -> anyhow::Result<()> {
    let caps = Capabilities::from_config(config)?;
    let decomposer = decomposer_from_config(config, &caps)?;
    for claim in decomposer.decompose(backstory) {
        println!("{}. {}", claim.ordinal + 1, claim.text);
    }
    Ok(())
}

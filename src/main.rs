//! CLI entry point for the article retriever.

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use retriever_core::storage::{DEFAULT_OUTPUT_DIR, HistoryEntry, rename_pdfs};
use retriever_core::{
    DEFAULT_CONCURRENCY, HttpTimeouts, JsonFileHistory, Provider, RetrievalRequest, Retriever,
    RetrieverSettings, RetryPolicy, SearchHistory, SearchTerm, StorageLayout,
};
use serde_json::json;
use tracing::{debug, info, warn};

mod app_config;
mod cli;

use app_config::FileConfig;
use cli::{Args, Command, HistoryArgs, ListArgs, RenameArgs, SearchArgs};

/// History file name under the output directory.
const HISTORY_FILE_NAME: &str = "recent_searches.json";

#[tokio::main]
async fn main() -> Result<()> {
    // Parse CLI arguments first (before tracing, so --help works without logs)
    let args = Args::parse();

    // Priority: RUST_LOG env var > quiet flag > verbose flag > default (info)
    let default_level = if args.quiet {
        "error"
    } else {
        match args.verbose {
            0 => "info",
            1 => "debug",
            _ => "trace",
        }
    };

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level));

    // stdout carries JSON results only
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    debug!(?args, "CLI arguments parsed");

    let config = app_config::load_default_file_config()?;

    match args.command {
        Command::Search(search) => run_search(search, &config).await,
        Command::Rename(rename) => run_rename(&rename, &config).await,
        Command::List(list) => run_list(&list, &config),
        Command::History(history) => run_history(&history, &config),
    }
}

fn resolve_output_dir(cli_value: Option<&Path>, config: &FileConfig) -> PathBuf {
    cli_value
        .map(Path::to_path_buf)
        .or_else(|| config.output_dir.clone())
        .unwrap_or_else(|| PathBuf::from(DEFAULT_OUTPUT_DIR))
}

fn resolve_history_path(output_dir: &Path, config: &FileConfig) -> PathBuf {
    config
        .history_file
        .clone()
        .unwrap_or_else(|| output_dir.join(HISTORY_FILE_NAME))
}

fn build_settings(
    args: &SearchArgs,
    config: &FileConfig,
    output_dir: PathBuf,
) -> RetrieverSettings {
    let mut settings = RetrieverSettings {
        output_dir,
        serpapi_key: args
            .serpapi_key
            .clone()
            .filter(|k| !k.trim().is_empty())
            .or_else(|| config.serpapi_key.clone())
            .or_else(app_config::serpapi_key_from_env),
        concurrency: args
            .concurrency
            .or(config.concurrency)
            .map_or(DEFAULT_CONCURRENCY, usize::from),
        ..RetrieverSettings::default()
    };

    if let Some(ms) = args.page_delay_ms.or(config.page_delay_ms) {
        settings.page_delay = Duration::from_millis(ms);
    }
    if let Some(attempts) = args.max_retries.or(config.max_retries) {
        settings.retry_policy = RetryPolicy::with_max_attempts(u32::from(attempts));
    }
    if let Some(secs) = config.request_timeout_secs {
        settings.timeouts = HttpTimeouts::uniform(secs);
    }
    settings
}

async fn run_search(args: SearchArgs, config: &FileConfig) -> Result<()> {
    let output_dir = resolve_output_dir(args.output_dir.as_deref(), config);
    let history_path = resolve_history_path(&output_dir, config);
    let settings = build_settings(&args, config, output_dir);

    if settings.serpapi_key.is_none() && args.source.providers().contains(&Provider::Scholar) {
        warn!("No SerpAPI key configured; Google Scholar searches will fail");
    }

    let retriever = Retriever::new(settings).context("Failed to initialize retriever")?;
    let request = RetrievalRequest::new(
        args.terms.clone(),
        args.source,
        usize::from(args.max_results),
    );

    info!(terms = request.terms.len(), source = %request.source, "Starting retrieval");
    let summary = retriever.retrieve(&request).await?;

    println!("{}", serde_json::to_string_pretty(&summary)?);

    if !args.no_history {
        let entry = HistoryEntry::now(
            request.terms,
            request.source,
            request.max_results,
            summary.stored_count(),
        );
        if let Err(e) = JsonFileHistory::new(&history_path).save(entry) {
            warn!(error = %e, "Failed to record search history");
        }
    }

    info!(
        stored = summary.stored_count(),
        output_dir = %retriever.layout().root().display(),
        "Retrieval finished"
    );
    Ok(())
}

async fn run_rename(args: &RenameArgs, config: &FileConfig) -> Result<()> {
    let layout = StorageLayout::new(resolve_output_dir(args.output_dir.as_deref(), config));
    let term = SearchTerm::new(args.term.trim());

    let mut reports = Vec::new();
    for (provider, dir) in layout.term_directories(args.source, &term) {
        let task_term = term.clone();
        let task_dir = dir.clone();
        let report = tokio::task::spawn_blocking(move || rename_pdfs(&task_dir, &task_term))
            .await
            .context("Rename task failed")?;
        info!(
            provider = %provider,
            renamed = report.renamed.len(),
            skipped = report.skipped.len(),
            "Rename pass complete"
        );
        reports.push(json!({
            "source": provider.response_key(),
            "directory": dir,
            "report": report,
        }));
    }

    println!("{}", serde_json::to_string_pretty(&reports)?);
    Ok(())
}

fn run_list(args: &ListArgs, config: &FileConfig) -> Result<()> {
    let layout = StorageLayout::new(resolve_output_dir(args.output_dir.as_deref(), config));
    let files = layout
        .list_stored_files()
        .with_context(|| format!("Failed to list '{}'", layout.root().display()))?;
    for file in &files {
        println!("{}", file.display());
    }
    debug!(count = files.len(), "Listed stored PDFs");
    Ok(())
}

fn run_history(args: &HistoryArgs, config: &FileConfig) -> Result<()> {
    let output_dir = resolve_output_dir(args.output_dir.as_deref(), config);
    let history = JsonFileHistory::new(resolve_history_path(&output_dir, config));
    let entries = history.load()?;
    println!("{}", serde_json::to_string_pretty(&entries)?);
    Ok(())
}

//! CLI argument definitions using clap derive macros.

use std::path::PathBuf;

use clap::{Args as ClapArgs, Parser, Subcommand};

use retriever_core::SourceSelection;

/// Search Google Scholar and PubMed Central and download article PDFs.
///
/// PDFs are filed under `<output-dir>/<source>/<term>/` and renamed into a
/// `<term>1.pdf`, `<term>2.pdf`, ... sequence.
#[derive(Parser, Debug)]
#[command(name = "article-retriever")]
#[command(author, version, about)]
pub struct Args {
    /// Increase output verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    #[command(subcommand)]
    pub command: Command,
}

/// Subcommands.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Search, download, and rename PDFs; prints a JSON summary
    Search(SearchArgs),
    /// Re-run the sequential rename pass for a term
    Rename(RenameArgs),
    /// List stored PDFs relative to the output directory
    List(ListArgs),
    /// Print recent searches as JSON
    History(HistoryArgs),
}

/// Arguments for `search`.
#[derive(ClapArgs, Debug)]
pub struct SearchArgs {
    /// Search terms (quote multi-word terms)
    #[arg(required = true)]
    pub terms: Vec<String>,

    /// Source to search: scholar, pubmed, or both
    #[arg(short, long, default_value = "both")]
    pub source: SourceSelection,

    /// Total number of results across sources (1-100)
    #[arg(short = 'n', long, default_value_t = 10, value_parser = clap::value_parser!(u16).range(1..=100))]
    pub max_results: u16,

    /// Storage root (default: config value or ./download)
    #[arg(short, long)]
    pub output_dir: Option<PathBuf>,

    /// Maximum concurrent downloads (1-16)
    #[arg(short, long, value_parser = clap::value_parser!(u8).range(1..=16))]
    pub concurrency: Option<u8>,

    /// Delay between result page requests in milliseconds (0-60000)
    #[arg(long, value_parser = clap::value_parser!(u64).range(0..=60000))]
    pub page_delay_ms: Option<u64>,

    /// Attempts per request, including the first (1-10)
    #[arg(short = 'r', long, value_parser = clap::value_parser!(u8).range(1..=10))]
    pub max_retries: Option<u8>,

    /// SerpAPI key (overrides the config file and SERP_API_KEY)
    #[arg(long)]
    pub serpapi_key: Option<String>,

    /// Do not record this search in the history file
    #[arg(long)]
    pub no_history: bool,
}

/// Arguments for `rename`.
#[derive(ClapArgs, Debug)]
pub struct RenameArgs {
    /// Term whose directories are renamed
    pub term: String,

    /// Source tree: scholar, pubmed, or both
    #[arg(short, long, default_value = "both")]
    pub source: SourceSelection,

    /// Storage root (default: config value or ./download)
    #[arg(short, long)]
    pub output_dir: Option<PathBuf>,
}

/// Arguments for `list`.
#[derive(ClapArgs, Debug)]
pub struct ListArgs {
    /// Storage root (default: config value or ./download)
    #[arg(short, long)]
    pub output_dir: Option<PathBuf>,
}

/// Arguments for `history`.
#[derive(ClapArgs, Debug)]
pub struct HistoryArgs {
    /// Storage root whose history file is read (default: config value or ./download)
    #[arg(short, long)]
    pub output_dir: Option<PathBuf>,
}

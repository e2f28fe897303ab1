//! deltaseek command line tool
//!
//! ```text
//! deltaseek-cli build corpus.txt index.snap        # one document per line
//! deltaseek-cli search index.snap hello world -n 5 --phrase --snippets
//! deltaseek-cli info index.snap
//! ```

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::info;

use deltaseek::{EngineConfig, SearchEngine, SearchQuery};

#[derive(Parser)]
#[command(name = "deltaseek-cli")]
#[command(about = "Build and query deltaseek snapshots")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Index a text file (one document per line) into a snapshot
    Build {
        /// Input corpus
        input: PathBuf,
        /// Output snapshot path
        output: PathBuf,
        /// Engine config as JSON
        #[arg(short, long)]
        config: Option<PathBuf>,
        /// Override the skip span
        #[arg(long)]
        skip_span: Option<usize>,
    },
    /// Run one query against a snapshot and print JSON results
    Search {
        snapshot: PathBuf,
        /// Query terms, all required
        #[arg(required = true)]
        terms: Vec<String>,
        /// Number of results
        #[arg(short = 'n', long)]
        n_results: Option<usize>,
        /// Terms must appear adjacent and in order
        #[arg(long)]
        phrase: bool,
        /// Include highlight offsets
        #[arg(long)]
        snippets: bool,
    },
    /// Print snapshot statistics as JSON
    Info { snapshot: PathBuf },
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("deltaseek=info".parse()?),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Build {
            input,
            output,
            config,
            skip_span,
        } => build(input, output, config, skip_span),
        Commands::Search {
            snapshot,
            terms,
            n_results,
            phrase,
            snippets,
        } => search(snapshot, terms, n_results, phrase, snippets),
        Commands::Info { snapshot } => show_info(snapshot),
    }
}

fn build(
    input: PathBuf,
    output: PathBuf,
    config: Option<PathBuf>,
    skip_span: Option<usize>,
) -> Result<()> {
    let mut config = match config {
        Some(path) => EngineConfig::from_json_file(&path)
            .with_context(|| format!("Failed to load config {}", path.display()))?,
        None => EngineConfig::default(),
    };
    if let Some(span) = skip_span {
        config = config.with_skip_span(span);
    }

    let mut engine = SearchEngine::new(config)?;

    let file = File::open(&input).with_context(|| format!("Failed to open {}", input.display()))?;
    let mut count = 0usize;
    for line in BufReader::new(file).lines() {
        let line = line?;
        engine.add_document(&line)?;
        count += 1;
        if count % 100_000 == 0 {
            info!("Indexed {} documents", count);
        }
    }

    let size = engine.save(&output)?;
    info!(
        "Built {} from {} documents ({} terms, {} bytes)",
        output.display(),
        count,
        engine.term_count(),
        size
    );
    Ok(())
}

fn search(
    snapshot: PathBuf,
    terms: Vec<String>,
    n_results: Option<usize>,
    phrase: bool,
    snippets: bool,
) -> Result<()> {
    let engine = SearchEngine::load(&snapshot)
        .with_context(|| format!("Failed to load snapshot {}", snapshot.display()))?;

    let mut query =
        SearchQuery::new(terms).with_n_results(n_results.unwrap_or(engine.config().default_n_results));
    if phrase {
        query = query.phrase();
    }
    if snippets {
        query = query.with_snippets();
    }

    let result = engine.search(&query)?;
    println!("{}", serde_json::to_string_pretty(&result)?);
    Ok(())
}

fn show_info(snapshot: PathBuf) -> Result<()> {
    let engine = SearchEngine::load(&snapshot)
        .with_context(|| format!("Failed to load snapshot {}", snapshot.display()))?;

    println!("{}", serde_json::to_string_pretty(&engine.stats())?);
    println!("{}", engine.config().to_json_string()?);
    Ok(())
}

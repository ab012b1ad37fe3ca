use anyhow::{bail, Context};
use clap::Parser;
use serde::Serialize;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use tipfinder::knowledge::{CorpusSource, FileCorpus, KnowledgeStore};
use tipfinder::{Entry, RetrieverConfig};

mod cli;

#[derive(Serialize)]
struct ScoredTip<'a> {
    score: f32,
    #[serde(flatten)]
    tip: &'a Entry,
}

fn init_tracing(verbosity: u8) {
    let level = match verbosity {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();
}

fn load_store(config: &RetrieverConfig) -> anyhow::Result<KnowledgeStore> {
    let corpus = FileCorpus::new(config.corpus_file());
    let raw = corpus.read()?;
    KnowledgeStore::load(&raw)
        .with_context(|| format!("failed to parse {}", corpus.describe()))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = cli::Args::parse();
    init_tracing(args.verbose);

    let base_path = match args.base_path {
        Some(path) => path,
        None => RetrieverConfig::default_base_path()?,
    };
    let mut config = RetrieverConfig::load_with(&base_path).context("failed to load config")?;
    // --corpus is relative to where the command runs
    if let Some(corpus) = args.corpus {
        config.corpus_path = std::env::current_dir()
            .context("failed to read working directory")?
            .join(corpus);
    }
    tracing::debug!(
        base_path = %base_path.display(),
        corpus = %config.corpus_file().display(),
        model = %config.model,
        "config loaded"
    );

    match args.command {
        cli::Command::Query {
            text,
            top_n,
            scores,
        } => {
            let retriever = config.build_retriever();
            retriever.initialize().await;

            if !retriever.is_initialized() {
                bail!(
                    "retriever failed to initialize: {}",
                    retriever.failure_reason().unwrap_or_default()
                );
            }

            let top_n = top_n.unwrap_or(config.default_top_n);
            let results = retriever.find_relevant_tips_scored(&text, top_n).await?;

            if scores {
                let scored: Vec<ScoredTip> = results
                    .iter()
                    .map(|(tip, score)| ScoredTip { score: *score, tip })
                    .collect();
                println!("{}", serde_json::to_string_pretty(&scored)?);
            } else {
                let tips: Vec<&Entry> = results.iter().map(|(tip, _)| tip).collect();
                println!("{}", serde_json::to_string_pretty(&tips)?);
            }
        }

        cli::Command::List => {
            let store = load_store(&config)?;
            println!("{}", serde_json::to_string_pretty(store.entries())?);
        }

        cli::Command::Check => {
            let store = load_store(&config)?;
            println!(
                "{}: {} tips, sha256 {}",
                config.corpus_file().display(),
                store.len(),
                store.digest_hex()
            );
        }
    }

    Ok(())
}

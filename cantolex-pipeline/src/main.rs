//! cantolex - lyric vocabulary consolidation pipeline
//!
//! Consolidates word-occurrence evidence extracted from song lyrics into a
//! ranked, deduplicated, annotated vocabulary dataset. Each stage is a
//! standalone batch subcommand over explicit artifact paths; `run` executes
//! the whole pipeline or any suffix of it.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use cantolex_common::config::PipelineConfig;
use cantolex_pipeline::services::{HttpLemmatizer, HttpTranslator};
use cantolex_pipeline::Pipeline;
use clap::{Parser, Subcommand};
use tracing::info;

#[derive(Parser)]
#[command(name = "cantolex", version, about = "Lyric vocabulary consolidation pipeline")]
struct Cli {
    /// Config file path (falls back to CANTOLEX_CONFIG, ./cantolex.toml,
    /// then the platform config dir)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Fold elided spellings into canonical forms, emitting an audit table
    MergeElisions {
        /// Evidence input (JSON Lines)
        #[arg(long)]
        input: Option<PathBuf>,
        /// Merged evidence output
        #[arg(long)]
        output: Option<PathBuf>,
        /// Audit artifact output
        #[arg(long)]
        audit: Option<PathBuf>,
    },
    /// Group evidence by (word, lemma) via the external analyzer
    AggregateLemmas {
        #[arg(long)]
        input: Option<PathBuf>,
        #[arg(long)]
        output: Option<PathBuf>,
    },
    /// Build draft vocabulary entries (flags + cache-only translations)
    BuildVocabulary {
        #[arg(long)]
        input: Option<PathBuf>,
        #[arg(long)]
        output: Option<PathBuf>,
        /// Prior-run vocabulary used as the curated-flag/translation cache
        #[arg(long)]
        cache: Option<PathBuf>,
    },
    /// Resolve remaining translation gaps through the live service
    FillGaps {
        #[arg(long)]
        vocabulary: Option<PathBuf>,
    },
    /// Repair spurious multi-lemma splits
    DedupLemmas {
        #[arg(long)]
        vocabulary: Option<PathBuf>,
    },
    /// Recompute transparent-cognate flags from scratch
    FlagCognates {
        #[arg(long)]
        vocabulary: Option<PathBuf>,
    },
    /// Compute the final deterministic ordering
    Rerank {
        #[arg(long)]
        vocabulary: Option<PathBuf>,
    },
    /// Run the whole pipeline, or a suffix of it
    Run {
        /// First stage to run (earlier artifacts must already exist)
        #[arg(long)]
        from: Option<String>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    info!(
        "Starting cantolex v{} [{}] built {} ({})",
        env!("CARGO_PKG_VERSION"),
        env!("GIT_HASH"),
        env!("BUILD_TIMESTAMP"),
        env!("BUILD_PROFILE")
    );

    let cli = Cli::parse();
    let mut config = PipelineConfig::load(cli.config.as_deref())?;

    let lemmatizer = Arc::new(HttpLemmatizer::new(&config.services.lemmatizer_url)?);
    let translator = Arc::new(HttpTranslator::new(
        &config.services.translator_url,
        &config.services.source_language,
        &config.services.target_language,
        config.services.translator_min_interval_ms,
    )?);
    let pipeline = Pipeline::standard(lemmatizer, translator);

    match cli.command {
        Command::MergeElisions { input, output, audit } => {
            apply_path(&mut config.paths.evidence, input);
            apply_path(&mut config.paths.merged_evidence, output);
            apply_path(&mut config.paths.elision_audit, audit);
            pipeline.run_stage("merge-elisions", &config).await?;
        }
        Command::AggregateLemmas { input, output } => {
            apply_path(&mut config.paths.merged_evidence, input);
            apply_path(&mut config.paths.lemma_groups, output);
            pipeline.run_stage("aggregate-lemmas", &config).await?;
        }
        Command::BuildVocabulary { input, output, cache } => {
            apply_path(&mut config.paths.lemma_groups, input);
            apply_path(&mut config.paths.vocabulary, output);
            if cache.is_some() {
                config.paths.cache_snapshot = cache;
            }
            pipeline.run_stage("build-vocabulary", &config).await?;
        }
        Command::FillGaps { vocabulary } => {
            apply_path(&mut config.paths.vocabulary, vocabulary);
            pipeline.run_stage("fill-gaps", &config).await?;
        }
        Command::DedupLemmas { vocabulary } => {
            apply_path(&mut config.paths.vocabulary, vocabulary);
            pipeline.run_stage("dedup-lemmas", &config).await?;
        }
        Command::FlagCognates { vocabulary } => {
            apply_path(&mut config.paths.vocabulary, vocabulary);
            pipeline.run_stage("flag-cognates", &config).await?;
        }
        Command::Rerank { vocabulary } => {
            apply_path(&mut config.paths.vocabulary, vocabulary);
            pipeline.run_stage("rerank", &config).await?;
        }
        Command::Run { from } => {
            let reports = pipeline.run_from(from.as_deref(), &config).await?;
            info!(stages = reports.len(), "Pipeline run complete");
        }
    }

    Ok(())
}

fn apply_path(slot: &mut PathBuf, value: Option<PathBuf>) {
    if let Some(path) = value {
        *slot = path;
    }
}

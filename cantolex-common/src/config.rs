//! Configuration loading and resolution
//!
//! Resolution priority, highest first:
//! 1. Command-line `--config` argument
//! 2. `CANTOLEX_CONFIG` environment variable
//! 3. `./cantolex.toml` in the working directory
//! 4. `~/.config/cantolex/config.toml` (platform config dir)
//! 5. Compiled defaults
//!
//! The TOML file may be partial; every section and field falls back to its
//! default independently.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::{Error, Result};

/// Environment variable naming an explicit config file.
pub const CONFIG_ENV_VAR: &str = "CANTOLEX_CONFIG";

/// Artifact and reference-data locations.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ArtifactPaths {
    /// Initial evidence from the frequency counter (JSON Lines).
    pub evidence: PathBuf,
    /// Elision-merged evidence.
    pub merged_evidence: PathBuf,
    /// Elision merge audit artifact.
    pub elision_audit: PathBuf,
    /// Aggregated lemma groups.
    pub lemma_groups: PathBuf,
    /// The vocabulary artifact, rewritten by every stage from the draft
    /// build onward.
    pub vocabulary: PathBuf,
    /// Prior-run vocabulary used for curated flags and cached translations.
    /// Absent means a cold run: every cache lookup misses.
    pub cache_snapshot: Option<PathBuf>,
    /// English reference-corpus frequencies (JSON map, word -> relative freq).
    pub english_frequencies: PathBuf,
    /// Spanish reference-corpus frequencies (JSON map, word -> relative freq).
    pub spanish_frequencies: PathBuf,
    /// General Spanish vocabulary list (prior artifact format) used for the
    /// dedup base-form set and the rerank reference ranks.
    pub reference_vocabulary: PathBuf,
}

impl Default for ArtifactPaths {
    fn default() -> Self {
        let data = PathBuf::from("data");
        Self {
            evidence: data.join("1_evidence.jsonl"),
            merged_evidence: data.join("2_evidence_merged.json"),
            elision_audit: data.join("2_elision_audit.json"),
            lemma_groups: data.join("3_lemma_groups.json"),
            vocabulary: data.join("vocabulary.json"),
            cache_snapshot: None,
            english_frequencies: data.join("lexicon").join("english_frequencies.json"),
            spanish_frequencies: data.join("lexicon").join("spanish_frequencies.json"),
            reference_vocabulary: data.join("lexicon").join("spanish_vocabulary.json"),
        }
    }
}

/// External service endpoints.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceConfig {
    /// Morphological analyzer endpoint; POST a line, get aligned tokens.
    pub lemmatizer_url: String,
    /// Translation service endpoint.
    pub translator_url: String,
    pub source_language: String,
    pub target_language: String,
    /// Minimum interval between translation calls, per the service's
    /// published rate limit.
    pub translator_min_interval_ms: u64,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            lemmatizer_url: "http://127.0.0.1:8090/analyze".to_string(),
            translator_url: "http://127.0.0.1:8091/translate".to_string(),
            source_language: "es".to_string(),
            target_language: "en".to_string(),
            translator_min_interval_ms: 250,
        }
    }
}

/// Caps applied while building artifacts.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LimitConfig {
    /// Example diversity cap per word (one per source document is enforced
    /// separately and always).
    pub max_examples_per_word: usize,
    /// Examples carried into each meaning of a vocabulary entry.
    pub max_examples_per_meaning: usize,
    /// Gap-fill persists the artifact after this many resolved translations.
    pub translation_checkpoint: usize,
}

impl Default for LimitConfig {
    fn default() -> Self {
        Self {
            max_examples_per_word: 10,
            max_examples_per_meaning: 1,
            translation_checkpoint: 100,
        }
    }
}

/// Classification thresholds.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ThresholdConfig {
    /// en/(en+es) ratio at or above which a word is flagged English.
    /// High on purpose: Spanish/English homographs must survive.
    pub english_ratio: f64,
    /// Character-similarity ratio for the cognate fuzzy fallback.
    pub cognate_similarity: f64,
}

impl Default for ThresholdConfig {
    fn default() -> Self {
        Self {
            english_ratio: 0.85,
            cognate_similarity: 0.85,
        }
    }
}

/// Full pipeline configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub paths: ArtifactPaths,
    pub services: ServiceConfig,
    pub limits: LimitConfig,
    pub thresholds: ThresholdConfig,
}

impl PipelineConfig {
    /// Load configuration following the documented resolution priority.
    pub fn load(cli_path: Option<&Path>) -> Result<Self> {
        if let Some(path) = cli_path {
            return Self::from_file(path);
        }
        if let Ok(path) = std::env::var(CONFIG_ENV_VAR) {
            return Self::from_file(Path::new(&path));
        }

        let cwd_config = Path::new("cantolex.toml");
        if cwd_config.exists() {
            return Self::from_file(cwd_config);
        }

        if let Some(dir) = dirs::config_dir() {
            let user_config = dir.join("cantolex").join("config.toml");
            if user_config.exists() {
                return Self::from_file(&user_config);
            }
        }

        info!("No config file found, using compiled defaults");
        Ok(Self::default())
    }

    fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("{}: {}", path.display(), e)))?;
        let config = toml::from_str(&content)
            .map_err(|e| Error::Config(format!("{}: {}", path.display(), e)))?;
        info!(config = %path.display(), "Loaded configuration");
        Ok(config)
    }
}

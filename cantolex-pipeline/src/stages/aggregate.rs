//! Lemma aggregation stage
//!
//! For each merged evidence entry, runs the example lines through the
//! external analyzer and groups the aligned tokens by lemma, producing one
//! [`LemmaGroup`] per `(word, lemma)` pairing with a POS histogram and
//! traceable matches.
//!
//! Elided display forms are substituted with the canonical spelling before
//! the analyzer sees the line ("tú ere' mala" -> "tú eres mala"), so the
//! model lemmatizes well-formed text. Matching is case-folded and
//! diacritic-insensitive. A word that never aligns gets a fallback match
//! with POS `X` so the word is never silently lost.

use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;

use async_trait::async_trait;
use cantolex_common::config::PipelineConfig;
use cantolex_common::models::{EvidenceEntry, LemmaGroup, TokenMatch};
use cantolex_common::text::{normalize_for_match, normalize_lemma, substitute_token};
use cantolex_common::{artifact, Result};
use tracing::{info, warn};

use super::lemma_repair::repair_lemma;
use super::{PipelineStage, StageReport};
use crate::services::{FrequencyLexicon, Lemmatizer};

/// Aggregate one evidence entry into its lemma groups.
async fn aggregate_entry(
    entry: &EvidenceEntry,
    lemmatizer: &dyn Lemmatizer,
    english: &FrequencyLexicon,
    spanish: &FrequencyLexicon,
) -> Vec<LemmaGroup> {
    let word_norm = normalize_for_match(&entry.word);
    // Lemma fallback keeps diacritics; only matching is diacritic-insensitive.
    let word_as_lemma = normalize_lemma(&entry.word);
    let display = entry.display();
    let mut match_forms: HashSet<String> = HashSet::new();
    match_forms.insert(word_norm.clone());
    match_forms.insert(normalize_for_match(display));

    let substitute = display != entry.word;

    // lemma -> (POS histogram, matches); BTreeMap keeps output deterministic.
    let mut grouped: BTreeMap<String, (BTreeMap<String, u32>, Vec<TokenMatch>)> = BTreeMap::new();

    for example in &entry.examples {
        let line = if substitute {
            substitute_token(&example.line, display, &entry.word)
        } else {
            example.line.clone()
        };

        let tokens = match lemmatizer.lemmatize(&line).await {
            Ok(tokens) => tokens,
            Err(e) => {
                warn!(
                    word = %entry.word,
                    example = %example.id,
                    error = %e,
                    "Lemmatizer call failed, skipping line"
                );
                continue;
            }
        };

        for token in tokens {
            let token_norm = normalize_for_match(&token.text);
            if !match_forms.contains(&token_norm) {
                continue;
            }

            let mut lemma = normalize_lemma(&token.lemma);
            if lemma.is_empty() {
                lemma = word_as_lemma.clone();
            }
            let lemma = repair_lemma(&entry.word, &word_as_lemma, lemma, english, spanish);
            let pos = if token.pos.is_empty() {
                "X".to_string()
            } else {
                token.pos.clone()
            };

            let (pos_counts, matches) = grouped.entry(lemma.clone()).or_default();
            *pos_counts.entry(pos.clone()).or_insert(0) += 1;
            matches.push(TokenMatch {
                example_id: example.id.clone(),
                source_title: example.title.clone(),
                token_text: token.text,
                lemma,
                pos,
            });
        }
    }

    // Never drop a word: record an unknown-POS fallback when nothing aligned.
    if grouped.is_empty() {
        let first = entry.examples.first();
        let (pos_counts, matches) = grouped.entry(word_as_lemma.clone()).or_default();
        *pos_counts.entry("X".to_string()).or_insert(0) += 1;
        matches.push(TokenMatch {
            example_id: first.map(|ex| ex.id.clone()).unwrap_or_default(),
            source_title: first.map(|ex| ex.title.clone()).unwrap_or_default(),
            token_text: entry.word.clone(),
            lemma: word_as_lemma.clone(),
            pos: "X".to_string(),
        });
    }

    grouped
        .into_iter()
        .map(|(lemma, (pos_counts, matches))| LemmaGroup {
            key: format!("{}|{}", entry.word, lemma),
            word: entry.word.clone(),
            lemma,
            display_form: entry.display_form.clone(),
            corpus_count: entry.corpus_count,
            occurrences_ppm: entry.occurrences_ppm,
            pos_counts,
            matches,
            examples: entry.examples.clone(),
        })
        .collect()
}

/// Aggregate the full evidence artifact.
pub async fn aggregate_entries(
    entries: &[EvidenceEntry],
    lemmatizer: &dyn Lemmatizer,
    english: &FrequencyLexicon,
    spanish: &FrequencyLexicon,
) -> Vec<LemmaGroup> {
    let mut groups = Vec::new();
    for entry in entries {
        groups.extend(aggregate_entry(entry, lemmatizer, english, spanish).await);
    }
    groups
}

/// Stage wrapper: merged evidence in, lemma groups out.
pub struct LemmaAggregator {
    lemmatizer: Arc<dyn Lemmatizer>,
}

impl LemmaAggregator {
    pub fn new(lemmatizer: Arc<dyn Lemmatizer>) -> Self {
        Self { lemmatizer }
    }
}

#[async_trait]
impl PipelineStage for LemmaAggregator {
    fn name(&self) -> &'static str {
        "aggregate-lemmas"
    }

    async fn run(&self, config: &PipelineConfig) -> Result<StageReport> {
        let entries: Vec<EvidenceEntry> = artifact::read_json(&config.paths.merged_evidence)?;
        let english = FrequencyLexicon::load(&config.paths.english_frequencies)?;
        let spanish = FrequencyLexicon::load(&config.paths.spanish_frequencies)?;

        let groups =
            aggregate_entries(&entries, self.lemmatizer.as_ref(), &english, &spanish).await;

        artifact::write_json(&config.paths.lemma_groups, &groups)?;
        info!(
            words = entries.len(),
            groups = groups.len(),
            "Lemma aggregation complete"
        );
        Ok(StageReport {
            stage: self.name(),
            entries_in: entries.len(),
            entries_out: groups.len(),
            detail: String::new(),
        })
    }
}

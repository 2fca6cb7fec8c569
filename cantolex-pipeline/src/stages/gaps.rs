//! Translation gap-fill stage
//!
//! Scans the vocabulary for empty translation placeholders (word-level and
//! per-example) left by the cache-only build, resolves each through the
//! external translation service, and persists the whole artifact after every
//! fixed batch of resolutions so an interruption loses at most one partial
//! batch. On restart the scan finds whatever is still empty, making the
//! operation safely repeatable. Service failures leave the placeholder
//! empty for the next invocation; retries are at-least-once.
//!
//! Entries flagged English, interjection, or proper noun are skipped
//! entirely.

use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use cantolex_common::config::PipelineConfig;
use cantolex_common::models::VocabularyEntry;
use cantolex_common::{artifact, Result};
use tracing::{info, warn};

use super::{PipelineStage, StageReport};
use crate::services::Translator;

/// Count unresolved word and example translations on translatable entries.
pub fn count_gaps(entries: &[VocabularyEntry]) -> (usize, usize) {
    let mut word_gaps = 0;
    let mut example_gaps = 0;
    for entry in entries.iter().filter(|e| e.needs_translation()) {
        for meaning in &entry.meanings {
            if meaning.translation.is_empty() {
                word_gaps += 1;
            }
            example_gaps += meaning
                .examples
                .iter()
                .filter(|ex| ex.english_text.is_empty())
                .count();
        }
    }
    (word_gaps, example_gaps)
}

/// Stage wrapper: rewrites the vocabulary artifact in place.
pub struct GapFiller {
    translator: Arc<dyn Translator>,
}

impl GapFiller {
    pub fn new(translator: Arc<dyn Translator>) -> Self {
        Self { translator }
    }

    /// Translate with an in-run memo so repeated texts cost one call.
    async fn translate_memo(
        &self,
        memo: &mut HashMap<String, String>,
        text: &str,
    ) -> Option<String> {
        if let Some(hit) = memo.get(text) {
            return Some(hit.clone());
        }
        match self.translator.translate(text).await {
            Ok(translation) => {
                memo.insert(text.to_string(), translation.clone());
                Some(translation)
            }
            Err(e) => {
                warn!(text, error = %e, "Translation failed, leaving gap for retry");
                None
            }
        }
    }

    async fn fill(
        &self,
        entries: &mut Vec<VocabularyEntry>,
        vocabulary_path: &Path,
        checkpoint_every: usize,
    ) -> Result<(usize, usize)> {
        let mut memo: HashMap<String, String> = HashMap::new();
        let mut resolved = 0usize;
        let mut failures = 0usize;

        for i in 0..entries.len() {
            if !entries[i].needs_translation() {
                continue;
            }
            let word = entries[i].word.clone();

            for j in 0..entries[i].meanings.len() {
                if entries[i].meanings[j].translation.is_empty() {
                    match self.translate_memo(&mut memo, &word).await {
                        Some(translation) => {
                            entries[i].meanings[j].translation = translation;
                            resolved += 1;
                            if resolved % checkpoint_every == 0 {
                                artifact::write_json(vocabulary_path, entries)?;
                                info!(resolved, "Checkpoint saved");
                            }
                        }
                        None => failures += 1,
                    }
                }

                for k in 0..entries[i].meanings[j].examples.len() {
                    if !entries[i].meanings[j].examples[k].english_text.is_empty() {
                        continue;
                    }
                    let target = entries[i].meanings[j].examples[k].target_text.clone();
                    match self.translate_memo(&mut memo, &target).await {
                        Some(translation) => {
                            entries[i].meanings[j].examples[k].english_text = translation;
                            resolved += 1;
                            if resolved % checkpoint_every == 0 {
                                artifact::write_json(vocabulary_path, entries)?;
                                info!(resolved, "Checkpoint saved");
                            }
                        }
                        None => failures += 1,
                    }
                }
            }
        }
        Ok((resolved, failures))
    }
}

#[async_trait]
impl PipelineStage for GapFiller {
    fn name(&self) -> &'static str {
        "fill-gaps"
    }

    async fn run(&self, config: &PipelineConfig) -> Result<StageReport> {
        let mut entries: Vec<VocabularyEntry> = artifact::read_json(&config.paths.vocabulary)?;
        let entries_in = entries.len();

        let (word_gaps, example_gaps) = count_gaps(&entries);
        if word_gaps + example_gaps == 0 {
            info!("No translation gaps, nothing to do");
            return Ok(StageReport {
                stage: self.name(),
                entries_in,
                entries_out: entries_in,
                detail: "no gaps".to_string(),
            });
        }
        info!(word_gaps, example_gaps, "Filling translation gaps");

        let (resolved, failures) = self
            .fill(
                &mut entries,
                &config.paths.vocabulary,
                config.limits.translation_checkpoint,
            )
            .await?;

        artifact::write_json(&config.paths.vocabulary, &entries)?;
        let (remaining_words, remaining_examples) = count_gaps(&entries);
        info!(
            resolved,
            failures,
            remaining_words,
            remaining_examples,
            "Gap fill complete"
        );
        Ok(StageReport {
            stage: self.name(),
            entries_in,
            entries_out: entries.len(),
            detail: format!(
                "{} resolved, {} failures, {} gaps remaining",
                resolved,
                failures,
                remaining_words + remaining_examples
            ),
        })
    }
}

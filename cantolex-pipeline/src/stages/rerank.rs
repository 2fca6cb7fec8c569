//! Rerank stage
//!
//! Deterministic total order over the vocabulary. Corpus frequency leads;
//! ties break on the general-reference rank (more common Spanish first),
//! then on how many distinct source documents attest the word (more
//! generalizable first), then non-cognates before cognates (cognates are
//! "free" vocabulary and can wait), then word length as the final
//! deterministic tie-break.
//!
//! The prior rank is preserved as `original_rank` before reassignment, so a
//! rank diff between runs is always reconstructible from the artifact.

use std::cmp::Reverse;

use async_trait::async_trait;
use cantolex_common::config::PipelineConfig;
use cantolex_common::models::VocabularyEntry;
use cantolex_common::{artifact, Result};
use tracing::info;

use super::{PipelineStage, StageReport};
use crate::services::{ReferenceVocabulary, UNRANKED};

type SortKey = (Reverse<u64>, u32, Reverse<usize>, bool, usize);

fn sort_key(entry: &VocabularyEntry, reference: &ReferenceVocabulary) -> SortKey {
    (
        Reverse(entry.corpus_count),
        reference.rank_for(&entry.word, &entry.lemma),
        Reverse(entry.distinct_source_count()),
        entry.is_transparent_cognate,
        entry.word.chars().count(),
    )
}

/// Sort and assign contiguous 1-based ranks, keeping the prior rank.
pub fn rerank(entries: &mut Vec<VocabularyEntry>, reference: &ReferenceVocabulary) {
    entries.sort_by_cached_key(|entry| sort_key(entry, reference));
    for (i, entry) in entries.iter_mut().enumerate() {
        entry.original_rank = Some(entry.rank);
        entry.rank = (i + 1) as u32;
    }
}

/// Stage wrapper: rewrites the vocabulary artifact in place.
pub struct Reranker;

#[async_trait]
impl PipelineStage for Reranker {
    fn name(&self) -> &'static str {
        "rerank"
    }

    async fn run(&self, config: &PipelineConfig) -> Result<StageReport> {
        let mut entries: Vec<VocabularyEntry> = artifact::read_json(&config.paths.vocabulary)?;
        let reference = ReferenceVocabulary::load(&config.paths.reference_vocabulary)?;
        let entries_in = entries.len();

        let matched = entries
            .iter()
            .filter(|e| reference.rank_for(&e.word, &e.lemma) < UNRANKED)
            .count();

        rerank(&mut entries, &reference);

        artifact::write_json(&config.paths.vocabulary, &entries)?;
        info!(
            entries = entries_in,
            reference_matched = matched,
            "Rerank complete"
        );
        Ok(StageReport {
            stage: self.name(),
            entries_in,
            entries_out: entries_in,
            detail: format!("{} entries matched in reference vocabulary", matched),
        })
    }
}

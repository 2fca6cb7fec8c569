//! Lemma dedup stage
//!
//! The external analyzer occasionally invents an implausible base form for
//! informal vocabulary, leaving two or more entries for the same surface
//! word under different lemmas. This stage repairs the split: the most
//! plausible lemma's entry survives and absorbs all evidence from the
//! losers.
//!
//! Plausibility, in priority order:
//! 1. the lemma equals the surface word itself (uninflected form);
//! 2. the lemma is attested in the reference vocabulary of known base forms;
//! 3. lexicographically smallest, as a final deterministic tie-break.
//!
//! Re-running on an already-resolved dataset is a no-op.

use std::collections::{HashMap, HashSet};

use async_trait::async_trait;
use cantolex_common::config::PipelineConfig;
use cantolex_common::models::VocabularyEntry;
use cantolex_common::text::normalize_for_match;
use cantolex_common::{artifact, Result};
use tracing::{debug, info};

use super::{PipelineStage, StageReport};
use crate::services::ReferenceVocabulary;

/// Pick the most plausible lemma among the group's candidates.
fn winning_lemma<'a>(
    word: &str,
    candidates: impl Iterator<Item = &'a str>,
    reference: &ReferenceVocabulary,
) -> String {
    let word_norm = normalize_for_match(word);
    let mut ranked: Vec<&str> = candidates.collect();
    ranked.sort_by_key(|lemma| {
        (
            // false sorts first, so negate the desirable properties
            normalize_for_match(lemma) != word_norm,
            !reference.contains_base_form(lemma),
            lemma.to_string(),
        )
    });
    ranked.first().copied().unwrap_or_default().to_string()
}

/// Merge a group of same-word entries into the winner.
fn merge_group(
    mut group: Vec<VocabularyEntry>,
    reference: &ReferenceVocabulary,
) -> VocabularyEntry {
    let word = group[0].word.clone();
    let winner_lemma = winning_lemma(&word, group.iter().map(|e| e.lemma.as_str()), reference);
    let winner_index = group
        .iter()
        .position(|e| e.lemma == winner_lemma)
        .unwrap_or(0);

    let mut merged = group.swap_remove(winner_index);
    let mut seen_pos: HashSet<String> =
        merged.meanings.iter().map(|m| m.pos.clone()).collect();

    // swap_remove disturbed the order; restore it so the merge is
    // deterministic regardless of which entry won.
    group.sort_by_key(|e| e.rank);

    for loser in group {
        merged.corpus_count += loser.corpus_count;
        for meaning in loser.meanings {
            if seen_pos.insert(meaning.pos.clone()) {
                merged.meanings.push(meaning);
            }
        }
        merged.is_english |= loser.is_english;
        merged.is_interjection |= loser.is_interjection;
        merged.is_propernoun |= loser.is_propernoun;
        merged.is_transparent_cognate |= loser.is_transparent_cognate;
        if merged.display_form.is_none() {
            merged.display_form = loser.display_form;
        }
    }
    merged.most_frequent_lemma_instance = true;
    merged
}

/// Resolve all spurious multi-lemma splits. Deterministic and idempotent.
pub fn resolve(
    entries: Vec<VocabularyEntry>,
    reference: &ReferenceVocabulary,
) -> (Vec<VocabularyEntry>, usize) {
    // Group by word, preserving first-seen order.
    let mut order: Vec<String> = Vec::new();
    let mut groups: HashMap<String, Vec<VocabularyEntry>> = HashMap::new();
    for entry in entries {
        if !groups.contains_key(&entry.word) {
            order.push(entry.word.clone());
        }
        groups.entry(entry.word.clone()).or_default().push(entry);
    }

    let mut out = Vec::with_capacity(order.len());
    let mut merges = 0usize;
    for word in order {
        let group = groups.remove(&word).expect("grouped entry");
        if group.len() == 1 {
            out.extend(group);
            continue;
        }
        let lemmas: Vec<String> = group.iter().map(|e| e.lemma.clone()).collect();
        let merged = merge_group(group, reference);
        debug!(
            word = %merged.word,
            kept = %merged.lemma,
            dropped = ?lemmas.iter().filter(|l| **l != merged.lemma).collect::<Vec<_>>(),
            "Merged duplicate lemma split"
        );
        out.push(merged);
        merges += 1;
    }

    // Compact ranks, preserving prior order.
    out.sort_by_key(|e| e.rank);
    for (i, entry) in out.iter_mut().enumerate() {
        entry.rank = (i + 1) as u32;
    }
    (out, merges)
}

/// Stage wrapper: rewrites the vocabulary artifact in place.
pub struct LemmaDedupResolver;

#[async_trait]
impl PipelineStage for LemmaDedupResolver {
    fn name(&self) -> &'static str {
        "dedup-lemmas"
    }

    async fn run(&self, config: &PipelineConfig) -> Result<StageReport> {
        let entries: Vec<VocabularyEntry> = artifact::read_json(&config.paths.vocabulary)?;
        let reference = ReferenceVocabulary::load(&config.paths.reference_vocabulary)?;
        let entries_in = entries.len();

        let (resolved, merges) = resolve(entries, &reference);
        let entries_out = resolved.len();

        artifact::write_json(&config.paths.vocabulary, &resolved)?;
        info!(entries_in, entries_out, merges, "Lemma dedup complete");
        Ok(StageReport {
            stage: self.name(),
            entries_in,
            entries_out,
            detail: format!("{} duplicate groups merged", merges),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cantolex_common::models::{Meaning, MeaningExample};

    fn entry(rank: u32, word: &str, lemma: &str, pos: &str, count: u64) -> VocabularyEntry {
        VocabularyEntry {
            rank,
            original_rank: None,
            word: word.to_string(),
            lemma: lemma.to_string(),
            display_form: None,
            meanings: vec![Meaning {
                pos: pos.to_string(),
                translation: String::new(),
                frequency: "1.00".to_string(),
                examples: vec![MeaningExample {
                    source: format!("{}", rank),
                    source_title: String::new(),
                    target_text: format!("línea {}", rank),
                    english_text: String::new(),
                }],
            }],
            most_frequent_lemma_instance: false,
            is_english: false,
            is_interjection: false,
            is_propernoun: false,
            is_transparent_cognate: false,
            corpus_count: count,
            occurrences_ppm: 10.0,
        }
    }

    #[test]
    fn attested_base_form_beats_invented_lemma() {
        let reference = ReferenceVocabulary::from_ranked([("loco", "loco", 7)]);
        let entries = vec![
            entry(1, "loca", "locar", "VERB", 5),
            entry(2, "loca", "loco", "ADJ", 3),
        ];
        let (resolved, merges) = resolve(entries, &reference);

        assert_eq!(merges, 1);
        assert_eq!(resolved.len(), 1);
        let winner = &resolved[0];
        assert_eq!(winner.lemma, "loco");
        // All evidence merged: counts summed, both meanings pooled
        assert_eq!(winner.corpus_count, 8);
        assert_eq!(winner.meanings.len(), 2);
        assert!(winner.most_frequent_lemma_instance);
    }

    #[test]
    fn surface_word_lemma_is_always_most_plausible() {
        let reference = ReferenceVocabulary::from_ranked([("cantar", "cantar", 30)]);
        let entries = vec![
            entry(1, "perreo", "cantar", "VERB", 2),
            entry(2, "perreo", "perreo", "NOUN", 6),
        ];
        let (resolved, _) = resolve(entries, &reference);
        assert_eq!(resolved[0].lemma, "perreo");
        assert_eq!(resolved[0].corpus_count, 8);
    }

    #[test]
    fn lexicographic_tie_break_is_deterministic() {
        let reference = ReferenceVocabulary::default();
        let entries = vec![
            entry(1, "guayando", "guayar", "VERB", 1),
            entry(2, "guayando", "guayer", "VERB", 1),
        ];
        let (resolved, _) = resolve(entries, &reference);
        assert_eq!(resolved[0].lemma, "guayar");
    }

    #[test]
    fn resolved_dataset_is_a_fixed_point() {
        let reference = ReferenceVocabulary::from_ranked([("loco", "loco", 7)]);
        let entries = vec![
            entry(1, "loca", "locar", "VERB", 5),
            entry(2, "loca", "loco", "ADJ", 3),
            entry(3, "vida", "vida", "NOUN", 9),
        ];
        let (first, _) = resolve(entries, &reference);
        let (second, merges) = resolve(first.clone(), &reference);

        assert_eq!(merges, 0);
        assert_eq!(first.len(), second.len());
        for (a, b) in first.iter().zip(second.iter()) {
            assert_eq!(a.rank, b.rank);
            assert_eq!(a.word, b.word);
            assert_eq!(a.lemma, b.lemma);
            assert_eq!(a.corpus_count, b.corpus_count);
        }
    }

    #[test]
    fn ranks_are_compacted_after_merge() {
        let reference = ReferenceVocabulary::default();
        let entries = vec![
            entry(1, "vida", "vida", "NOUN", 9),
            entry(2, "loca", "locar", "VERB", 5),
            entry(3, "loca", "loca", "ADJ", 3),
            entry(4, "calle", "calle", "NOUN", 2),
        ];
        let (resolved, _) = resolve(entries, &reference);
        let ranks: Vec<u32> = resolved.iter().map(|e| e.rank).collect();
        assert_eq!(ranks, vec![1, 2, 3]);
        assert_eq!(resolved[1].word, "loca");
        assert_eq!(resolved[1].lemma, "loca");
    }

    #[test]
    fn flags_and_display_form_carry_forward() {
        let reference = ReferenceVocabulary::default();
        let mut a = entry(1, "to'", "to'", "DET", 4);
        a.display_form = None;
        let mut b = entry(2, "to'", "tocar", "VERB", 1);
        b.is_interjection = true;
        b.display_form = Some("to'".to_string());

        let (resolved, _) = resolve(vec![a, b], &reference);
        assert!(resolved[0].is_interjection);
        assert_eq!(resolved[0].display_form.as_deref(), Some("to'"));
    }
}

//! Reference lexicons
//!
//! Two kinds of read-only reference data back the classification stages:
//!
//! - [`FrequencyLexicon`]: one per reference corpus (English, Spanish),
//!   a JSON map of word to relative frequency. Absent words read as zero.
//! - [`ReferenceVocabulary`]: the general Spanish vocabulary list (prior
//!   artifact format) providing the known-base-form set for lemma dedup and
//!   the rank index for reranking.

use std::collections::HashMap;
use std::path::Path;

use cantolex_common::models::VocabularyEntry;
use cantolex_common::{artifact, Result};
use tracing::info;

/// Rank assigned to words absent from the reference vocabulary.
/// Larger than any real rank so unmatched words sort after all matched ones.
pub const UNRANKED: u32 = 999_999;

/// Word-frequency lexicon for one reference corpus.
#[derive(Debug, Default)]
pub struct FrequencyLexicon {
    frequencies: HashMap<String, f64>,
}

impl FrequencyLexicon {
    pub fn load(path: &Path) -> Result<Self> {
        let frequencies: HashMap<String, f64> = artifact::read_json(path)?;
        info!(
            lexicon = %path.display(),
            words = frequencies.len(),
            "Loaded frequency lexicon"
        );
        Ok(Self { frequencies })
    }

    pub fn from_map(frequencies: HashMap<String, f64>) -> Self {
        Self { frequencies }
    }

    /// Relative frequency of a word; zero when unknown to the corpus.
    ///
    /// Lookup is case-folded but keeps diacritics: `está` and `esta` are
    /// different Spanish words with different frequencies.
    pub fn frequency(&self, word: &str) -> f64 {
        self.frequencies
            .get(&word.trim().to_lowercase())
            .copied()
            .unwrap_or(0.0)
    }

    pub fn contains(&self, word: &str) -> bool {
        self.frequency(word) > 0.0
    }
}

/// Rank and base-form index over the general Spanish vocabulary list.
#[derive(Debug, Default)]
pub struct ReferenceVocabulary {
    word_ranks: HashMap<String, u32>,
    lemma_ranks: HashMap<String, u32>,
}

impl ReferenceVocabulary {
    pub fn load(path: &Path) -> Result<Self> {
        let entries: Vec<VocabularyEntry> = artifact::read_json(path)?;
        let vocabulary = Self::from_entries(&entries);
        info!(
            reference = %path.display(),
            words = vocabulary.word_ranks.len(),
            lemmas = vocabulary.lemma_ranks.len(),
            "Loaded reference vocabulary"
        );
        Ok(vocabulary)
    }

    /// First-seen entry wins per word and per lemma, matching the reference
    /// list's own rank order.
    pub fn from_entries(entries: &[VocabularyEntry]) -> Self {
        let mut vocabulary = Self::default();
        for entry in entries {
            let word = entry.word.trim().to_lowercase();
            let lemma = entry.lemma.trim().to_lowercase();
            if !word.is_empty() {
                vocabulary.word_ranks.entry(word).or_insert(entry.rank);
            }
            if !lemma.is_empty() {
                vocabulary.lemma_ranks.entry(lemma).or_insert(entry.rank);
            }
        }
        vocabulary
    }

    /// Test-double constructor: `(word, lemma, rank)` triples.
    pub fn from_ranked<I, S>(ranked: I) -> Self
    where
        I: IntoIterator<Item = (S, S, u32)>,
        S: Into<String>,
    {
        let mut vocabulary = Self::default();
        for (word, lemma, rank) in ranked {
            vocabulary
                .word_ranks
                .entry(word.into().to_lowercase())
                .or_insert(rank);
            vocabulary
                .lemma_ranks
                .entry(lemma.into().to_lowercase())
                .or_insert(rank);
        }
        vocabulary
    }

    /// Reference rank for an entry, trying word then lemma against the word
    /// index, then both against the lemma index. [`UNRANKED`] when absent.
    pub fn rank_for(&self, word: &str, lemma: &str) -> u32 {
        let word = word.trim().to_lowercase();
        let lemma = lemma.trim().to_lowercase();

        if let Some(rank) = self.word_ranks.get(&word) {
            return *rank;
        }
        if !lemma.is_empty() {
            if let Some(rank) = self.word_ranks.get(&lemma) {
                return *rank;
            }
            if let Some(rank) = self.lemma_ranks.get(&lemma) {
                return *rank;
            }
        }
        if let Some(rank) = self.lemma_ranks.get(&word) {
            return *rank;
        }
        UNRANKED
    }

    /// Whether the reference list attests this form as a known base form.
    pub fn contains_base_form(&self, form: &str) -> bool {
        let form = form.trim().to_lowercase();
        self.word_ranks.contains_key(&form) || self.lemma_ranks.contains_key(&form)
    }
}

//! Artifact data models for the vocabulary pipeline
//!
//! Every handoff between stages is one of these shapes serialized to disk:
//! evidence entries (counter output, elision-merged), lemma groups
//! (aggregator output), and vocabulary entries (every stage from the draft
//! build onward). The prior-run artifact is wrapped in [`CacheSnapshot`],
//! which is read-only and exposes explicit lookups instead of raw entries.

use std::collections::{BTreeMap, HashMap};
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::text::normalize_for_match;
use crate::Result;

/// One example citation attached to evidence.
///
/// `id` is `"<sourceId>:<lineNumber>"` and is unique across the corpus.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExampleCitation {
    pub id: String,
    /// The lyric line exactly as it appears in the source.
    pub line: String,
    /// Title of the source song.
    #[serde(default)]
    pub title: String,
}

impl ExampleCitation {
    /// Source document id (the part of `id` before the colon).
    pub fn source_id(&self) -> &str {
        self.id.split(':').next().unwrap_or("")
    }
}

/// Per-word occurrence evidence from the frequency counter.
///
/// Examples are capped to one per source document per word; the cap on the
/// total is configured (`limits.max_examples_per_word`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvidenceEntry {
    pub word: String,
    #[serde(default)]
    pub corpus_count: u64,
    #[serde(default)]
    pub occurrences_ppm: f64,
    #[serde(default)]
    pub examples: Vec<ExampleCitation>,
    /// Original lyric spelling when it differs from the canonical `word`
    /// (set by the elision merger).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_form: Option<String>,
}

impl EvidenceEntry {
    /// Learner-facing spelling: the display form when present, else the word.
    pub fn display(&self) -> &str {
        self.display_form.as_deref().unwrap_or(&self.word)
    }
}

/// One lemmatizer token that matched the target word in an example line.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenMatch {
    pub example_id: String,
    #[serde(default)]
    pub source_title: String,
    pub token_text: String,
    pub lemma: String,
    pub pos: String,
}

/// Aggregated evidence for one `(word, lemma)` pairing.
///
/// Invariant: every match's normalized token equals the group's word (or its
/// elided display form) after elision substitution in the example line.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LemmaGroup {
    /// `"<word>|<lemma>"`, unique per artifact.
    pub key: String,
    pub word: String,
    pub lemma: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_form: Option<String>,
    #[serde(default)]
    pub corpus_count: u64,
    #[serde(default)]
    pub occurrences_ppm: f64,
    /// Part-of-speech histogram over the matches. BTreeMap so serialization
    /// order is deterministic.
    #[serde(default)]
    pub pos_counts: BTreeMap<String, u32>,
    #[serde(default)]
    pub matches: Vec<TokenMatch>,
    /// Evidence examples carried through unchanged.
    #[serde(default)]
    pub examples: Vec<ExampleCitation>,
}

impl LemmaGroup {
    pub fn match_count(&self) -> u32 {
        self.pos_counts.values().sum()
    }
}

/// One translated example under a meaning.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MeaningExample {
    /// Source document id.
    pub source: String,
    #[serde(default)]
    pub source_title: String,
    /// The lyric line in the target language (Spanish).
    pub target_text: String,
    /// English translation; empty string until resolved.
    #[serde(default)]
    pub english_text: String,
}

/// One sense of a vocabulary entry. POS stands in for the sense for now.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Meaning {
    pub pos: String,
    /// English translation; empty string until resolved.
    #[serde(default)]
    pub translation: String,
    /// Share of this POS in the group histogram, formatted to two decimals
    /// (the flashcard app consumes the string directly).
    pub frequency: String,
    #[serde(default)]
    pub examples: Vec<MeaningExample>,
}

/// Linguistic flags carried by a vocabulary entry.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EntryFlags {
    pub is_english: bool,
    pub is_interjection: bool,
    pub is_propernoun: bool,
    pub is_transparent_cognate: bool,
}

/// Final unit of the vocabulary artifact: one entry per canonical word after
/// dedup, meanings ordered by descending POS frequency.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VocabularyEntry {
    pub rank: u32,
    /// Rank from the run immediately prior to the last rerank.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub original_rank: Option<u32>,
    pub word: String,
    pub lemma: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_form: Option<String>,
    pub meanings: Vec<Meaning>,
    #[serde(default)]
    pub most_frequent_lemma_instance: bool,
    #[serde(default)]
    pub is_english: bool,
    #[serde(default)]
    pub is_interjection: bool,
    #[serde(default)]
    pub is_propernoun: bool,
    #[serde(default)]
    pub is_transparent_cognate: bool,
    #[serde(default)]
    pub corpus_count: u64,
    #[serde(default)]
    pub occurrences_ppm: f64,
}

impl VocabularyEntry {
    pub fn flags(&self) -> EntryFlags {
        EntryFlags {
            is_english: self.is_english,
            is_interjection: self.is_interjection,
            is_propernoun: self.is_propernoun,
            is_transparent_cognate: self.is_transparent_cognate,
        }
    }

    /// English, interjection, and proper-noun entries are never translated;
    /// an English word's translation is defined as itself.
    pub fn needs_translation(&self) -> bool {
        !(self.is_english || self.is_interjection || self.is_propernoun)
    }

    /// Distinct source documents across all meanings' examples.
    pub fn distinct_source_count(&self) -> usize {
        let mut sources: Vec<&str> = self
            .meanings
            .iter()
            .flat_map(|m| m.examples.iter())
            .map(|ex| ex.source.as_str())
            .filter(|s| !s.is_empty())
            .collect();
        sources.sort_unstable();
        sources.dedup();
        sources.len()
    }
}

/// What the elision merger did with one elided token.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ElisionAction {
    /// Folded into an existing canonical entry.
    MergedIntoExisting,
    /// No canonical entry existed; the elided entry stands as canonical
    /// under its own spelling.
    Promoted,
    /// Matched neither the exception table nor the regular pattern.
    LeftUnmerged,
}

/// Which rule produced the canonical form.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ElisionRule {
    Exception,
    Regular,
    None,
}

/// One line of the elision audit artifact.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ElisionAuditRecord {
    pub elided: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub canonical: Option<String>,
    pub rule: ElisionRule,
    pub action: ElisionAction,
}

/// Audit artifact emitted beside the merged evidence.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ElisionAudit {
    pub generated_at: chrono::DateTime<chrono::Utc>,
    pub records: Vec<ElisionAuditRecord>,
}

/// A full prior-run vocabulary artifact, read-only.
///
/// Used exclusively as a source of curated flags and already-resolved
/// translations. Lookups key on the normalized word; the first entry seen per
/// word wins, matching the prior artifact's rank order.
#[derive(Debug, Default)]
pub struct CacheSnapshot {
    entry_count: usize,
    flags: HashMap<String, EntryFlags>,
    word_translations: HashMap<String, String>,
    pos_translations: HashMap<(String, String), String>,
    line_translations: HashMap<String, String>,
}

impl CacheSnapshot {
    /// Snapshot with no prior run behind it; every lookup misses.
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn load(path: &Path) -> Result<Self> {
        let entries: Vec<VocabularyEntry> = crate::artifact::read_json(path)?;
        Ok(Self::from_entries(&entries))
    }

    pub fn from_entries(entries: &[VocabularyEntry]) -> Self {
        let mut snapshot = Self {
            entry_count: entries.len(),
            ..Self::default()
        };
        for entry in entries {
            let key = normalize_for_match(&entry.word);
            snapshot.flags.entry(key.clone()).or_insert_with(|| entry.flags());
            for meaning in &entry.meanings {
                if !meaning.translation.is_empty() {
                    snapshot
                        .word_translations
                        .entry(key.clone())
                        .or_insert_with(|| meaning.translation.clone());
                    snapshot
                        .pos_translations
                        .entry((key.clone(), meaning.pos.clone()))
                        .or_insert_with(|| meaning.translation.clone());
                }
                for example in &meaning.examples {
                    if !example.target_text.is_empty() && !example.english_text.is_empty() {
                        snapshot
                            .line_translations
                            .entry(example.target_text.clone())
                            .or_insert_with(|| example.english_text.clone());
                    }
                }
            }
        }
        snapshot
    }

    pub fn is_empty(&self) -> bool {
        self.entry_count == 0
    }

    pub fn entry_count(&self) -> usize {
        self.entry_count
    }

    /// Curated flags for a word, if the prior run knew it.
    pub fn flags(&self, word: &str) -> Option<EntryFlags> {
        self.flags.get(&normalize_for_match(word)).copied()
    }

    /// Cached word-level translation, preferring a meaning with the same POS.
    pub fn word_translation(&self, word: &str, pos: Option<&str>) -> Option<&str> {
        let key = normalize_for_match(word);
        if let Some(pos) = pos {
            if let Some(t) = self.pos_translations.get(&(key.clone(), pos.to_string())) {
                return Some(t.as_str());
            }
        }
        self.word_translations.get(&key).map(String::as_str)
    }

    /// Cached translation for an exact source line.
    pub fn line_translation(&self, line: &str) -> Option<&str> {
        self.line_translations.get(line).map(String::as_str)
    }
}

//! Transparent-cognate detection stage
//!
//! A transparent cognate is "free" vocabulary: its English gloss is close
//! enough in form that a learner infers the meaning without study
//! (información/information). The detector is authoritative and idempotent:
//! every run first resets the flag on all entries, discarding prior values,
//! then recomputes from scratch.
//!
//! A gloss qualifies via, in order: exact normalized match; plural-stripped
//! match (checked against both the original and de-pluraled English form;
//! the stripper over-strips English adjectives ending in -ous); the ordered
//! suffix-substitution table; a fuzzy character-similarity fallback for
//! near-identical pairs no rule covers (espectacular/spectacular).

use async_trait::async_trait;
use cantolex_common::config::PipelineConfig;
use cantolex_common::models::VocabularyEntry;
use cantolex_common::text::strip_diacritics;
use cantolex_common::{artifact, Result};
use tracing::info;

use super::{PipelineStage, StageReport};

/// Forms shorter than this never qualify; short words collide too easily.
const MIN_COGNATE_LEN: usize = 4;

/// Spanish->English suffix substitutions, more specific suffixes first.
const SUFFIX_RULES: &[(&str, &str)] = &[
    ("cion", "tion"),
    ("sion", "sion"),
    ("ancia", "ance"),
    ("encia", "ence"),
    ("mente", "ly"),
    ("ismo", "ism"),
    ("ista", "ist"),
    ("ivo", "ive"),
    ("iva", "ive"),
    ("oso", "ous"),
    ("osa", "ous"),
    ("ico", "ic"),
    ("ica", "ic"),
    ("idad", "ity"),
    ("dad", "ty"),
    ("ente", "ent"),
    ("ante", "ant"),
    ("ia", "y"),
    ("ario", "ary"),
    ("aria", "ary"),
    ("ura", "ure"),
    ("or", "or"),
    ("al", "al"),
    ("ble", "ble"),
];

fn normalize(s: &str) -> String {
    strip_diacritics(&s.to_lowercase()).trim().to_string()
}

/// Remove common plural suffixes (Spanish and English).
fn strip_plural(w: &str) -> String {
    let len = w.chars().count();
    // Spanish -ces -> -z (voces->voz, veces->vez)
    if len >= 4 && w.ends_with("ces") {
        let mut out = w[..w.len() - 3].to_string();
        out.push('z');
        return out;
    }
    if len >= 5 && w.ends_with("es") {
        return w[..w.len() - 2].to_string();
    }
    if len >= 4 && w.ends_with('s') {
        return w[..w.len() - 1].to_string();
    }
    w.to_string()
}

fn apply_suffix(w: &str, src: &str, dst: &str) -> Option<String> {
    let stem = w.strip_suffix(src)?;
    if stem.is_empty() {
        return None;
    }
    Some(format!("{}{}", stem, dst))
}

/// Extract candidate English glosses from a translation string: parenthetical
/// notes stripped, split on comma and slash, the full multi-word phrase first
/// and then its individual tokens.
pub fn split_glosses(translation: &str) -> Vec<String> {
    if translation.is_empty() {
        return Vec::new();
    }

    // Drop parenthetical notes like "(informal)"
    let mut cleaned = String::with_capacity(translation.len());
    let mut depth = 0usize;
    for ch in translation.to_lowercase().chars() {
        match ch {
            '(' => depth += 1,
            ')' => depth = depth.saturating_sub(1),
            _ if depth == 0 => cleaned.push(ch),
            _ => {}
        }
    }

    let mut out: Vec<String> = Vec::new();
    for part in cleaned.split(|c| c == ',' || c == '/') {
        let tokens: Vec<&str> = part
            .split_whitespace()
            .filter(|tok| tok.chars().all(char::is_alphabetic))
            .collect();
        if tokens.is_empty() {
            continue;
        }
        let phrase = tokens.join(" ");
        if !out.contains(&phrase) {
            out.push(phrase);
        }
        for token in tokens {
            let token = token.to_string();
            if !out.contains(&token) {
                out.push(token);
            }
        }
    }
    out
}

/// Whether one Spanish form and one English gloss are transparently cognate.
pub fn is_transparent_cognate(spanish: &str, english: &str, similarity_threshold: f64) -> bool {
    let s = normalize(spanish);
    let e = normalize(english);

    if s.chars().count() < MIN_COGNATE_LEN || e.chars().count() < MIN_COGNATE_LEN {
        return false;
    }

    // Rule 1: exact match after normalization
    if s == e {
        return true;
    }

    let s0 = strip_plural(&s);
    let e0 = strip_plural(&e);

    // Rule 2: plural-stripped match. Both English forms must be checked:
    // strip_plural("famous") yields "famou", which would miss famoso->famous.
    if s0 == e || s0 == e0 {
        return true;
    }

    // Rule 3: ordered suffix substitutions
    for (src, dst) in SUFFIX_RULES {
        if let Some(candidate) = apply_suffix(&s0, src, dst) {
            if candidate == e || candidate == e0 {
                return true;
            }
        }
    }

    // Rule 4: fuzzy fallback for near-identical pairs
    strsim::normalized_levenshtein(&s, &e) >= similarity_threshold
}

/// Reset and recompute the cognate flag across the dataset.
///
/// Returns the number of entries flagged.
pub fn detect(entries: &mut [VocabularyEntry], similarity_threshold: f64) -> usize {
    let mut flagged = 0usize;
    for entry in entries.iter_mut() {
        entry.is_transparent_cognate = false;

        let mut candidates = vec![entry.word.as_str()];
        if entry.lemma != entry.word && !entry.lemma.is_empty() {
            candidates.push(entry.lemma.as_str());
        }

        'outer: for meaning in &entry.meanings {
            for gloss in split_glosses(&meaning.translation) {
                for candidate in &candidates {
                    if is_transparent_cognate(candidate, &gloss, similarity_threshold) {
                        entry.is_transparent_cognate = true;
                        break 'outer;
                    }
                }
            }
        }
        if entry.is_transparent_cognate {
            flagged += 1;
        }
    }
    flagged
}

/// Stage wrapper: rewrites the vocabulary artifact in place.
pub struct CognateDetector;

#[async_trait]
impl PipelineStage for CognateDetector {
    fn name(&self) -> &'static str {
        "flag-cognates"
    }

    async fn run(&self, config: &PipelineConfig) -> Result<StageReport> {
        let mut entries: Vec<VocabularyEntry> = artifact::read_json(&config.paths.vocabulary)?;
        let entries_in = entries.len();
        let was_flagged = entries.iter().filter(|e| e.is_transparent_cognate).count();

        let flagged = detect(&mut entries, config.thresholds.cognate_similarity);

        artifact::write_json(&config.paths.vocabulary, &entries)?;
        info!(entries = entries_in, flagged, was_flagged, "Cognate detection complete");
        Ok(StageReport {
            stage: self.name(),
            entries_in,
            entries_out: entries_in,
            detail: format!("{} cognates flagged (was {})", flagged, was_flagged),
        })
    }
}

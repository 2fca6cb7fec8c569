//! Linguistic flag computation and reconciliation
//!
//! Flags come from two independent sources combined with logical OR: freshly
//! computed signals and the curated values in the prior-run snapshot. The
//! merge is a pure function; conflicts resolve by the OR rule, never by
//! failing the run.
//!
//! `is_transparent_cognate` is deliberately NOT reconciled here: the cognate
//! detector is authoritative and recomputes it from scratch later, so this
//! stage carries whatever the cache provided (absent means false).

use std::collections::BTreeMap;

use cantolex_common::models::EntryFlags;
use cantolex_common::text::has_spanish_diacritic;

use crate::services::FrequencyLexicon;

/// POS tags whose histogram share drives the interjection/proper-noun flags.
const INTERJECTION_POS: &str = "INTJ";
const PROPER_NOUN_POS: &str = "PROPN";

/// English classification by reference-corpus frequency ratio.
///
/// - Any Spanish diacritic forces false regardless of ratio: orthography is
///   a stronger signal than frequency data.
/// - A word absent from both corpora defaults to false (unknown means
///   assumed native; novel slang and elisions land here).
/// - Otherwise English when `en/(en+es)` reaches the threshold. The
///   threshold is high on purpose so Spanish/English homographs survive.
pub fn classify_english(
    word: &str,
    english: &FrequencyLexicon,
    spanish: &FrequencyLexicon,
    ratio_threshold: f64,
) -> bool {
    if has_spanish_diacritic(word) {
        return false;
    }
    let en_freq = english.frequency(word);
    let es_freq = spanish.frequency(word);
    if en_freq == 0.0 && es_freq == 0.0 {
        return false;
    }
    en_freq / (en_freq + es_freq) >= ratio_threshold
}

/// True when `pos` holds a strict majority of the histogram.
pub fn pos_share_majority(pos_counts: &BTreeMap<String, u32>, pos: &str) -> bool {
    let total: u32 = pos_counts.values().sum();
    if total == 0 {
        return false;
    }
    let count = pos_counts.get(pos).copied().unwrap_or(0);
    f64::from(count) / f64::from(total) > 0.5
}

/// Freshly computed flags for one lemma group.
pub fn fresh_flags(
    word: &str,
    pos_counts: &BTreeMap<String, u32>,
    english: &FrequencyLexicon,
    spanish: &FrequencyLexicon,
    ratio_threshold: f64,
) -> EntryFlags {
    EntryFlags {
        is_english: classify_english(word, english, spanish, ratio_threshold),
        is_interjection: pos_share_majority(pos_counts, INTERJECTION_POS),
        is_propernoun: pos_share_majority(pos_counts, PROPER_NOUN_POS),
        // Authoritatively recomputed by the cognate detector.
        is_transparent_cognate: false,
    }
}

/// Pure merge of fresh flags with the cached snapshot values.
pub fn reconcile_flags(fresh: EntryFlags, cached: Option<EntryFlags>) -> EntryFlags {
    match cached {
        None => fresh,
        Some(cached) => EntryFlags {
            is_english: fresh.is_english || cached.is_english,
            is_interjection: fresh.is_interjection || cached.is_interjection,
            is_propernoun: fresh.is_propernoun || cached.is_propernoun,
            // Carried from the cache verbatim, not OR'd with anything fresh.
            is_transparent_cognate: cached.is_transparent_cognate,
        },
    }
}

//! Lemma repair for external analyzer output
//!
//! The analyzer model is trained on news text and misbehaves on lyric
//! vocabulary in three known ways, each repaired here:
//!
//! 1. Future/conditional stems of the irregular verbs (pondr-, podr-,
//!    tendr- …) get invented infinitives like "pondrar". These stems are
//!    suppletive and need a hard lookup.
//! 2. Slang and novel forms get invented lemmas with zero attestation in
//!    either reference corpus. A lemma unknown to both corpora falls back to
//!    the surface form.
//! 3. Verb forms with attached pronoun clitics (ponerla, darte, verte) get
//!    mangled; when the lemma still equals the surface form, stripping a
//!    clitic and checking the base against the Spanish corpus recovers the
//!    real verb.

use cantolex_common::text::strip_diacritics;

use crate::services::FrequencyLexicon;

/// Surface stems that uniquely identify an irregular verb's
/// future/conditional forms, mapped to the infinitive.
const IRREGULAR_FUTURE_STEMS: &[(&str, &str)] = &[
    ("pondr", "poner"),
    ("podr", "poder"),
    ("saldr", "salir"),
    ("tendr", "tener"),
    ("vendr", "venir"),
    ("valdr", "valer"),
    ("querr", "querer"),
    ("cabr", "caber"),
    ("sabr", "saber"),
    ("habr", "haber"),
    ("har", "hacer"),
    ("dir", "decir"),
];

/// Future/conditional personal suffixes, accent-stripped to match the
/// normalized surface form.
const FUTURE_COND_SUFFIXES: &[&str] = &[
    "e", "as", "a", "emos", "eis", "an", // future
    "ia", "ias", "iamos", "iais", "ian", // conditional
];

/// Pronoun clitics, longest first so compounds (melo, telo) are tried before
/// their single-clitic suffixes.
const CLITICS: &[&str] = &[
    "melo", "telo", "sela", "selo", "nos", "les", "las", "los", "me", "te", "se", "le", "la",
    "lo", "os",
];

const VERB_ENDINGS: &[&str] = &["ar", "er", "ir", "ár", "ér", "ír"];

/// Words whose suffix accidentally matches a verb+clitic pattern
/// ("parte" -> base "par" would wrongly pass the corpus check).
const CLITIC_NOUN_EXCEPTIONS: &[&str] = &[
    "muerte", "suerte", "parte", "marte", "arte", "fuerte", "frente", "gente", "mente", "madre",
    "padre", "libre", "sobre", "nombre", "entre", "siempre", "antes", "lunes", "martes",
];

/// Minimum attestation in the Spanish corpus for a recovered clitic base.
const CLITIC_BASE_MIN_FREQUENCY: f64 = 1e-6;

/// Override the analyzer's lemma for irregular future/conditional forms.
pub fn correct_irregular_future(word: &str, lemma: &str) -> String {
    let w = strip_diacritics(&word.to_lowercase());
    for (stem, infinitive) in IRREGULAR_FUTURE_STEMS {
        if let Some(suffix) = w.strip_prefix(stem) {
            if FUTURE_COND_SUFFIXES.contains(&suffix) {
                return (*infinitive).to_string();
            }
        }
    }
    lemma.to_string()
}

/// Recover the base verb from an infinitive/gerund/imperative + clitic form.
///
/// Returns `None` when the word doesn't look like verb+clitic or the
/// candidate base is unattested in the Spanish corpus.
pub fn strip_clitic(word: &str, spanish: &FrequencyLexicon) -> Option<String> {
    let w = word.trim().to_lowercase();
    if CLITIC_NOUN_EXCEPTIONS.contains(&w.as_str()) {
        return None;
    }
    for clitic in CLITICS {
        let Some(base) = w.strip_suffix(clitic) else {
            continue;
        };
        if base.chars().count() < 3 {
            continue;
        }
        if !VERB_ENDINGS.iter().any(|ending| base.ends_with(ending)) {
            continue;
        }
        if spanish.frequency(base) >= CLITIC_BASE_MIN_FREQUENCY {
            return Some(base.to_string());
        }
    }
    None
}

/// Apply the three repair passes in order to one accepted lemma.
///
/// `word` is the raw surface spelling, `word_as_lemma` its lemma-normalized
/// form (the fallback when the analyzer's lemma is judged invented).
pub fn repair_lemma(
    word: &str,
    word_as_lemma: &str,
    lemma: String,
    english: &FrequencyLexicon,
    spanish: &FrequencyLexicon,
) -> String {
    // Pass 1 must run before the quality gate: an invented future-stem lemma
    // can still have nonzero corpus frequency by accident.
    let lemma = correct_irregular_future(word, &lemma);

    // Pass 2: a lemma unknown to both corpora is invented.
    let lemma = if !english.contains(&lemma) && !spanish.contains(&lemma) {
        word_as_lemma.to_string()
    } else {
        lemma
    };

    // Pass 3: self-lemma may hide a verb+clitic form.
    if lemma == word_as_lemma {
        if let Some(base) = strip_clitic(word, spanish) {
            return base;
        }
    }
    lemma
}

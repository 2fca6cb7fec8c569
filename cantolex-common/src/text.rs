//! Text normalization shared by the pipeline stages
//!
//! All cross-stage matching (evidence word ↔ lemmatizer token, vocabulary
//! word ↔ cache entry, Spanish word ↔ English gloss) goes through the
//! normalization in this module so the stages agree on what "the same word"
//! means: case-folded, diacritic-insensitive, with internal apostrophes kept
//! because elided lyric spellings carry them (pa', vamo').

use unicode_normalization::char::is_combining_mark;
use unicode_normalization::UnicodeNormalization;

/// Characters treated as apostrophes in lyric text.
const APOSTROPHES: [char; 3] = ['\'', '\u{2019}', '`'];

/// Remove combining marks after NFD decomposition (café -> cafe, señor -> senor).
pub fn strip_diacritics(s: &str) -> String {
    s.nfd().filter(|c| !is_combining_mark(*c)).collect()
}

/// Learner-oriented match normalization:
/// lowercase, diacritics stripped, letters and internal apostrophes only,
/// curly apostrophes folded to straight, runs collapsed, edges trimmed.
pub fn normalize_for_match(s: &str) -> String {
    let lowered = s.to_lowercase();
    let mut out = String::with_capacity(lowered.len());
    let mut last_apostrophe = false;
    for ch in strip_diacritics(&lowered).chars() {
        if ch.is_alphabetic() {
            out.push(ch);
            last_apostrophe = false;
        } else if APOSTROPHES.contains(&ch) {
            if !last_apostrophe {
                out.push('\'');
                last_apostrophe = true;
            }
        }
    }
    out.trim_matches('\'').to_string()
}

/// Lemma-field normalization: case-folded and stripped to letters and
/// internal apostrophes, but diacritics kept: `canción` stays `canción`.
/// Diacritic-insensitivity belongs to matching, not to stored lemmas.
pub fn normalize_lemma(s: &str) -> String {
    let lowered = s.to_lowercase();
    let mut out = String::with_capacity(lowered.len());
    let mut last_apostrophe = false;
    for ch in lowered.chars() {
        if ch.is_alphabetic() {
            out.push(ch);
            last_apostrophe = false;
        } else if APOSTROPHES.contains(&ch) {
            if !last_apostrophe {
                out.push('\'');
                last_apostrophe = true;
            }
        }
    }
    out.trim_matches('\'').to_string()
}

/// True when the word carries a Spanish-specific diacritic.
///
/// Used as a hard veto in English classification: frequency ratios never
/// override an orthographic Spanish signal.
pub fn has_spanish_diacritic(s: &str) -> bool {
    s.to_lowercase()
        .chars()
        .any(|c| matches!(c, 'á' | 'é' | 'í' | 'ó' | 'ú' | 'ü' | 'ñ'))
}

/// Replace every token of `line` matching `target` (after normalization) with
/// `replacement`, preserving all surrounding text.
///
/// Tokens are maximal runs of alphabetic characters and apostrophes, the same
/// shape the evidence tokenizer produces, so an elided display form like
/// `ere'` is replaced as a whole word and never inside another word.
pub fn substitute_token(line: &str, target: &str, replacement: &str) -> String {
    let target_norm = normalize_for_match(target);
    if target_norm.is_empty() {
        return line.to_string();
    }

    let mut out = String::with_capacity(line.len());
    let mut token = String::new();
    for ch in line.chars() {
        if ch.is_alphabetic() || APOSTROPHES.contains(&ch) {
            token.push(ch);
        } else {
            flush_token(&mut out, &mut token, &target_norm, replacement);
            out.push(ch);
        }
    }
    flush_token(&mut out, &mut token, &target_norm, replacement);
    out
}

fn flush_token(out: &mut String, token: &mut String, target_norm: &str, replacement: &str) {
    if token.is_empty() {
        return;
    }
    if normalize_for_match(token) == target_norm {
        out.push_str(replacement);
    } else {
        out.push_str(token);
    }
    token.clear();
}

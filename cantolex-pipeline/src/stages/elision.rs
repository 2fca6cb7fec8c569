//! Elision merge stage
//!
//! Caribbean Spanish lyrics drop a final consonant and mark it with a
//! trailing apostrophe: `vamo'` for `vamos`, `ere'` for `eres`. The merger
//! folds those spellings into their canonical form so downstream matching
//! works on one entry per word, while the elided spelling survives as the
//! learner-facing display form.
//!
//! Two patterns are recognized:
//! - a small exception table for tokens whose canonical word is unrelated to
//!   the regular rule (`pa'` is `para`, not an s-elision of `pas`);
//! - the regular rule: trailing apostrophe after a vowel marks an elided `s`.
//!
//! Anything else with a trailing apostrophe (English `-in'` gerunds, stray
//! quoting) matches neither pattern and is left unmerged, surfaced in the
//! audit artifact rather than guessed at.

use std::collections::{HashMap, HashSet};

use async_trait::async_trait;
use cantolex_common::config::PipelineConfig;
use cantolex_common::models::{
    ElisionAction, ElisionAudit, ElisionAuditRecord, ElisionRule, EvidenceEntry, ExampleCitation,
};
use cantolex_common::{artifact, Result};
use once_cell::sync::Lazy;
use tracing::{debug, info};

use super::{PipelineStage, StageReport};

/// Elided tokens whose canonical form does not follow the regular rule.
/// Checked before the regular rule and takes priority.
static ELISION_EXCEPTIONS: Lazy<HashMap<&'static str, &'static str>> = Lazy::new(|| {
    HashMap::from([("pa'", "para"), ("na'", "nada"), ("to'", "todo")])
});

/// The consonant restored by the regular rule.
const ELIDED_CONSONANT: char = 's';

fn is_spanish_vowel(c: char) -> bool {
    matches!(c, 'a' | 'e' | 'i' | 'o' | 'u' | 'á' | 'é' | 'í' | 'ó' | 'ú')
}

/// Candidate canonical form for an elided token, with the rule that produced
/// it. `None` when the token matches neither pattern.
pub fn canonical_candidate(word: &str) -> Option<(String, ElisionRule)> {
    if let Some(canonical) = ELISION_EXCEPTIONS.get(word) {
        return Some(((*canonical).to_string(), ElisionRule::Exception));
    }
    let stem = word.strip_suffix('\'')?;
    let last = stem.chars().last()?;
    if is_spanish_vowel(last) {
        let mut canonical = stem.to_string();
        canonical.push(ELIDED_CONSONANT);
        return Some((canonical, ElisionRule::Regular));
    }
    None
}

/// Merge elided evidence entries into their canonical counterparts.
///
/// Returns the merged entries (sorted by descending frequency) and the audit
/// records for every elided token encountered.
pub fn merge_evidence(
    entries: Vec<EvidenceEntry>,
    max_examples_per_word: usize,
) -> (Vec<EvidenceEntry>, Vec<ElisionAuditRecord>) {
    let word_set: HashSet<String> = entries.iter().map(|e| e.word.clone()).collect();

    // Accumulate by target word, preserving first-encounter order.
    let mut order: Vec<String> = Vec::new();
    let mut merged: HashMap<String, EvidenceEntry> = HashMap::new();
    let mut audit = Vec::new();

    for entry in entries {
        let mut display_override = None;
        let target = if entry.word.ends_with('\'') {
            match canonical_candidate(&entry.word) {
                Some((canonical, rule)) if word_set.contains(&canonical) => {
                    audit.push(ElisionAuditRecord {
                        elided: entry.word.clone(),
                        canonical: Some(canonical.clone()),
                        rule,
                        action: ElisionAction::MergedIntoExisting,
                    });
                    display_override = Some(entry.word.clone());
                    canonical
                }
                Some((canonical, rule)) => {
                    // No canonical entry to merge into: the elided entry
                    // stands as canonical under its own spelling.
                    audit.push(ElisionAuditRecord {
                        elided: entry.word.clone(),
                        canonical: Some(canonical),
                        rule,
                        action: ElisionAction::Promoted,
                    });
                    display_override = Some(entry.word.clone());
                    entry.word.clone()
                }
                None => {
                    audit.push(ElisionAuditRecord {
                        elided: entry.word.clone(),
                        canonical: None,
                        rule: ElisionRule::None,
                        action: ElisionAction::LeftUnmerged,
                    });
                    entry.word.clone()
                }
            }
        } else {
            entry.word.clone()
        };

        let slot = merged.entry(target.clone()).or_insert_with(|| {
            order.push(target.clone());
            EvidenceEntry {
                word: target.clone(),
                corpus_count: 0,
                occurrences_ppm: 0.0,
                examples: Vec::new(),
                display_form: None,
            }
        });
        slot.corpus_count += entry.corpus_count;
        slot.occurrences_ppm += entry.occurrences_ppm;
        slot.examples.extend(entry.examples);
        if display_override.is_some() {
            slot.display_form = display_override;
        }
    }

    let mut out: Vec<EvidenceEntry> = order
        .into_iter()
        .map(|word| {
            let mut entry = merged.remove(&word).expect("accumulated entry");
            entry.examples = dedup_examples(entry.examples, max_examples_per_word);
            // A display form identical to the word carries no information.
            if entry.display_form.as_deref() == Some(entry.word.as_str()) {
                debug!(word = %entry.word, "Promoted elided entry keeps its own spelling");
            }
            entry
        })
        .collect();

    // Frequency order, word as deterministic tie-break.
    out.sort_by(|a, b| {
        b.occurrences_ppm
            .total_cmp(&a.occurrences_ppm)
            .then_with(|| a.word.cmp(&b.word))
    });

    (out, audit)
}

/// One example per source document, capped to the configured total.
fn dedup_examples(examples: Vec<ExampleCitation>, cap: usize) -> Vec<ExampleCitation> {
    let mut seen_sources = HashSet::new();
    let mut out = Vec::new();
    for example in examples {
        let source = example.source_id().to_string();
        if source.is_empty() || seen_sources.contains(&source) {
            continue;
        }
        seen_sources.insert(source);
        out.push(example);
        if out.len() >= cap {
            break;
        }
    }
    out
}

/// Stage wrapper: evidence JSONL in, merged evidence + audit artifact out.
pub struct ElisionMerger;

#[async_trait]
impl PipelineStage for ElisionMerger {
    fn name(&self) -> &'static str {
        "merge-elisions"
    }

    async fn run(&self, config: &PipelineConfig) -> Result<StageReport> {
        let report = artifact::read_jsonl::<EvidenceEntry>(&config.paths.evidence)?;
        if report.skipped > 0 {
            info!(skipped = report.skipped, "Malformed evidence lines skipped");
        }
        let entries_in = report.entries.len();

        let (merged, audit_records) =
            merge_evidence(report.entries, config.limits.max_examples_per_word);
        let entries_out = merged.len();
        let merges = audit_records
            .iter()
            .filter(|r| r.action == ElisionAction::MergedIntoExisting)
            .count();

        artifact::write_json(&config.paths.merged_evidence, &merged)?;
        artifact::write_json(
            &config.paths.elision_audit,
            &ElisionAudit {
                generated_at: chrono::Utc::now(),
                records: audit_records,
            },
        )?;

        info!(
            entries_in,
            entries_out,
            merges,
            skipped_lines = report.skipped,
            "Elision merge complete"
        );
        Ok(StageReport {
            stage: self.name(),
            entries_in,
            entries_out,
            detail: format!("{} merges, {} malformed lines skipped", merges, report.skipped),
        })
    }
}

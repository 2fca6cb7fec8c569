//! End-to-end pipeline test over a small fixture corpus
//!
//! Runs all seven stages against deterministic service doubles and checks
//! the documented properties of the final artifact: elision merging, lemma
//! dedup, cognate classification, flag computation, translation resolution,
//! and the final ordering.

use std::collections::HashMap;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use cantolex_common::artifact;
use cantolex_common::config::PipelineConfig;
use cantolex_common::models::{ElisionAudit, Meaning, MeaningExample, VocabularyEntry};
use cantolex_pipeline::services::{
    Lemmatizer, LemmatizerError, TokenAnnotation, Translator, TranslatorError,
};
use cantolex_pipeline::Pipeline;

/// Analyzer double keyed on the exact (post-substitution) line.
struct LineTableLemmatizer {
    lines: HashMap<String, Vec<TokenAnnotation>>,
}

impl LineTableLemmatizer {
    fn new(rows: &[(&str, &[(&str, &str, &str)])]) -> Self {
        Self {
            lines: rows
                .iter()
                .map(|(line, tokens)| {
                    (
                        line.to_string(),
                        tokens
                            .iter()
                            .map(|(text, lemma, pos)| TokenAnnotation {
                                text: text.to_string(),
                                lemma: lemma.to_string(),
                                pos: pos.to_string(),
                            })
                            .collect(),
                    )
                })
                .collect(),
        }
    }
}

#[async_trait]
impl Lemmatizer for LineTableLemmatizer {
    async fn lemmatize(&self, line: &str) -> Result<Vec<TokenAnnotation>, LemmatizerError> {
        Ok(self.lines.get(line).cloned().unwrap_or_default())
    }
}

/// Translator double with a fixed table and a call counter.
struct CountingTranslator {
    table: HashMap<String, String>,
    calls: AtomicUsize,
}

impl CountingTranslator {
    fn new(rows: &[(&str, &str)]) -> Self {
        Self {
            table: rows
                .iter()
                .map(|(a, b)| (a.to_string(), b.to_string()))
                .collect(),
            calls: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl Translator for CountingTranslator {
    async fn translate(&self, text: &str) -> Result<String, TranslatorError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.table
            .get(text)
            .cloned()
            .ok_or(TranslatorError::Empty)
    }
}

fn write_evidence(path: &Path) {
    let lines = [
        r#"{"word":"que","corpus_count":30,"occurrences_ppm":300.0,"examples":[{"id":"100:2","line":"la vida es una fiesta que termina","title":"La Fiesta"}]}"#,
        r#"{"word":"eres","corpus_count":10,"occurrences_ppm":100.0,"examples":[{"id":"101:5","line":"eres mala conmigo","title":"Mala"}]}"#,
        r#"{"word":"ere'","corpus_count":4,"occurrences_ppm":40.0,"examples":[{"id":"102:7","line":"ere' la luz","title":"La Luz"}]}"#,
        r#"{"word":"loca","corpus_count":5,"occurrences_ppm":50.0,"examples":[{"id":"104:2","line":"ella anda loca conmigo","title":"Conmigo"},{"id":"105:3","line":"una loca en la fiesta","title":"Fiesta"}]}"#,
        r#"{"word":"baby","corpus_count":8,"occurrences_ppm":80.0,"examples":[{"id":"106:1","line":"baby yo te quiero","title":"Querer"}]}"#,
        r#"{"word":"información","corpus_count":3,"occurrences_ppm":30.0,"examples":[{"id":"103:1","line":"toda la información llegó","title":"Llegó"}]}"#,
        r#"{"word":"wepa","corpus_count":2,"occurrences_ppm":20.0,"examples":[{"id":"107:4","line":"wepa wepa llegó la noche","title":"La Noche"}]}"#,
        r#"{"word":"runnin'","corpus_count":1,"occurrences_ppm":10.0,"examples":[{"id":"108:9","line":"keep it runnin' all night","title":"Night"}]}"#,
        "this line is not json and must be skipped",
    ];
    std::fs::write(path, lines.join("\n")).unwrap();
}

fn lemmatizer() -> Arc<LineTableLemmatizer> {
    Arc::new(LineTableLemmatizer::new(&[
        (
            "la vida es una fiesta que termina",
            &[
                ("la", "el", "DET"),
                ("vida", "vida", "NOUN"),
                ("es", "ser", "AUX"),
                ("una", "uno", "DET"),
                ("fiesta", "fiesta", "NOUN"),
                ("que", "que", "SCONJ"),
                ("termina", "terminar", "VERB"),
            ],
        ),
        (
            "eres mala conmigo",
            &[("eres", "ser", "AUX"), ("mala", "malo", "ADJ")],
        ),
        // The elided line reaches the analyzer with the canonical spelling
        (
            "eres la luz",
            &[("eres", "ser", "AUX"), ("la", "el", "DET"), ("luz", "luz", "NOUN")],
        ),
        // Same surface word, two different lemmas across lines: the
        // second one is the analyzer inventing "locar"
        (
            "ella anda loca conmigo",
            &[("ella", "él", "PRON"), ("loca", "locar", "VERB")],
        ),
        (
            "una loca en la fiesta",
            &[("una", "uno", "DET"), ("loca", "loco", "ADJ")],
        ),
        ("baby yo te quiero", &[("baby", "baby", "NOUN")]),
        (
            "toda la información llegó",
            &[("información", "información", "NOUN")],
        ),
        (
            "wepa wepa llegó la noche",
            &[("wepa", "wepa", "INTJ"), ("wepa", "wepa", "INTJ")],
        ),
        // No entry for the runnin' line: the aggregator records the fallback
    ]))
}

fn write_lexicons(config: &PipelineConfig) {
    let english: HashMap<String, f64> = HashMap::from([
        ("baby".to_string(), 9e-4),
        ("running".to_string(), 2e-4),
        ("que".to_string(), 1e-6),
    ]);
    let spanish: HashMap<String, f64> = HashMap::from([
        ("que".to_string(), 1e-2),
        ("ser".to_string(), 5e-3),
        ("eres".to_string(), 1e-3),
        ("loco".to_string(), 1e-4),
        ("loca".to_string(), 1e-4),
        ("locar".to_string(), 1e-7), // rare enough to exist, still attested
        ("información".to_string(), 2e-4),
        ("baby".to_string(), 1e-5),
    ]);
    artifact::write_json(&config.paths.english_frequencies, &english).unwrap();
    artifact::write_json(&config.paths.spanish_frequencies, &spanish).unwrap();

    let reference: Vec<VocabularyEntry> = [
        (1u32, "que", "que"),
        (5, "ser", "ser"),
        (7, "loco", "loco"),
        (40, "información", "información"),
    ]
    .iter()
    .map(|(rank, word, lemma)| VocabularyEntry {
        rank: *rank,
        original_rank: None,
        word: (*word).to_string(),
        lemma: (*lemma).to_string(),
        display_form: None,
        meanings: Vec::new(),
        most_frequent_lemma_instance: true,
        is_english: false,
        is_interjection: false,
        is_propernoun: false,
        is_transparent_cognate: false,
        corpus_count: 0,
        occurrences_ppm: 0.0,
    })
    .collect();
    artifact::write_json(&config.paths.reference_vocabulary, &reference).unwrap();
}

fn write_cache_snapshot(path: &Path) {
    // Prior run: knows "que" with a resolved translation and example, and
    // curates the interjection flag for "wepa".
    let entries = vec![
        VocabularyEntry {
            rank: 1,
            original_rank: None,
            word: "que".to_string(),
            lemma: "que".to_string(),
            display_form: None,
            meanings: vec![Meaning {
                pos: "SCONJ".to_string(),
                translation: "that".to_string(),
                frequency: "1.00".to_string(),
                examples: vec![MeaningExample {
                    source: "100".to_string(),
                    source_title: "La Fiesta".to_string(),
                    target_text: "la vida es una fiesta que termina".to_string(),
                    english_text: "life is a party that ends".to_string(),
                }],
            }],
            most_frequent_lemma_instance: true,
            is_english: false,
            is_interjection: false,
            is_propernoun: false,
            is_transparent_cognate: false,
            corpus_count: 28,
            occurrences_ppm: 280.0,
        },
        VocabularyEntry {
            rank: 2,
            original_rank: None,
            word: "wepa".to_string(),
            lemma: "wepa".to_string(),
            display_form: None,
            meanings: Vec::new(),
            most_frequent_lemma_instance: true,
            is_english: false,
            is_interjection: true,
            is_propernoun: false,
            is_transparent_cognate: false,
            corpus_count: 2,
            occurrences_ppm: 20.0,
        },
    ];
    artifact::write_json(path, &entries).unwrap();
}

fn translator() -> Arc<CountingTranslator> {
    Arc::new(CountingTranslator::new(&[
        ("eres", "you are"),
        ("eres mala conmigo", "you are mean to me"),
        ("ere' la luz", "you are the light"),
        ("loca", "crazy"),
        ("ella anda loca conmigo", "she goes crazy with me"),
        ("una loca en la fiesta", "a crazy girl at the party"),
        ("información", "information"),
        ("toda la información llegó", "all the information arrived"),
        ("runnin'", "runnin'"),
        ("keep it runnin' all night", "keep it runnin' all night"),
    ]))
}

fn config_for(dir: &Path) -> PipelineConfig {
    let mut config = PipelineConfig::default();
    config.paths.evidence = dir.join("1_evidence.jsonl");
    config.paths.merged_evidence = dir.join("2_evidence_merged.json");
    config.paths.elision_audit = dir.join("2_elision_audit.json");
    config.paths.lemma_groups = dir.join("3_lemma_groups.json");
    config.paths.vocabulary = dir.join("vocabulary.json");
    config.paths.cache_snapshot = Some(dir.join("prior_vocabulary.json"));
    config.paths.english_frequencies = dir.join("english_frequencies.json");
    config.paths.spanish_frequencies = dir.join("spanish_frequencies.json");
    config.paths.reference_vocabulary = dir.join("spanish_vocabulary.json");
    config
}

#[tokio::test]
async fn full_pipeline_produces_consolidated_vocabulary() {
    let dir = tempfile::tempdir().unwrap();
    let config = config_for(dir.path());

    write_evidence(&config.paths.evidence);
    write_lexicons(&config);
    write_cache_snapshot(config.paths.cache_snapshot.as_ref().unwrap());

    let translator = translator();
    let pipeline = Pipeline::standard(lemmatizer(), translator.clone());
    let reports = pipeline.run_from(None, &config).await.unwrap();
    assert_eq!(reports.len(), 7);

    let vocabulary: Vec<VocabularyEntry> =
        artifact::read_json(&config.paths.vocabulary).unwrap();

    // One entry per canonical word
    let words: Vec<&str> = vocabulary.iter().map(|e| e.word.as_str()).collect();
    let mut deduped = words.clone();
    deduped.sort_unstable();
    deduped.dedup();
    assert_eq!(deduped.len(), words.len());

    // Elision merge: counts summed, elided spelling kept for display
    let eres = vocabulary.iter().find(|e| e.word == "eres").unwrap();
    assert_eq!(eres.corpus_count, 14);
    assert_eq!(eres.display_form.as_deref(), Some("ere'"));

    // Lemma dedup: the invented "locar" lost to the attested "loco",
    // evidence counts summed across the split
    let loca = vocabulary.iter().find(|e| e.word == "loca").unwrap();
    assert_eq!(loca.lemma, "loco");
    assert_eq!(loca.corpus_count, 10);
    assert!(loca.most_frequent_lemma_instance);

    // Cognate detection: suffix rule fires, unrelated pairs stay false
    let informacion = vocabulary.iter().find(|e| e.word == "información").unwrap();
    assert!(informacion.is_transparent_cognate);
    assert_eq!(informacion.meanings[0].translation, "information");
    assert!(!loca.is_transparent_cognate);

    // English classification and self-translation
    let baby = vocabulary.iter().find(|e| e.word == "baby").unwrap();
    assert!(baby.is_english);
    assert_eq!(baby.meanings[0].translation, "baby");

    // Curated flag merged from the prior snapshot (and fresh POS majority)
    let wepa = vocabulary.iter().find(|e| e.word == "wepa").unwrap();
    assert!(wepa.is_interjection);
    assert!(wepa.meanings[0].translation.is_empty());

    // Cached translations resolved without calling the service
    let que = vocabulary.iter().find(|e| e.word == "que").unwrap();
    assert_eq!(que.meanings[0].translation, "that");
    assert_eq!(
        que.meanings[0].examples[0].english_text,
        "life is a party that ends"
    );

    // The ambiguous elision survived unmerged, with the unknown-POS fallback
    let runnin = vocabulary.iter().find(|e| e.word == "runnin'").unwrap();
    assert_eq!(runnin.meanings[0].pos, "X");

    // Audit artifact records the unmerged token
    let audit: ElisionAudit = artifact::read_json(&config.paths.elision_audit).unwrap();
    assert!(audit
        .records
        .iter()
        .any(|r| r.elided == "runnin'" && r.canonical.is_none()));

    // Final ordering: contiguous 1-based ranks, corpus_count dominant,
    // prior rank preserved
    let ranks: Vec<u32> = vocabulary.iter().map(|e| e.rank).collect();
    assert_eq!(ranks, (1..=vocabulary.len() as u32).collect::<Vec<_>>());
    assert_eq!(vocabulary[0].word, "que");
    assert_eq!(vocabulary[1].word, "eres");
    assert!(vocabulary.iter().all(|e| e.original_rank.is_some()));

    // Flagged entries never hit the translator; everything else did at most
    // once per distinct text
    let calls = translator.calls.load(Ordering::SeqCst);
    assert!(calls > 0);
    assert!(!translator.table.contains_key("baby"));
}

#[tokio::test]
async fn rerun_of_consolidation_suffix_is_idempotent() {
    let dir = tempfile::tempdir().unwrap();
    let config = config_for(dir.path());

    write_evidence(&config.paths.evidence);
    write_lexicons(&config);
    write_cache_snapshot(config.paths.cache_snapshot.as_ref().unwrap());

    let pipeline = Pipeline::standard(lemmatizer(), translator());
    pipeline.run_from(None, &config).await.unwrap();
    let first: Vec<VocabularyEntry> = artifact::read_json(&config.paths.vocabulary).unwrap();

    // Re-run the consolidation suffix over its own output
    pipeline
        .run_from(Some("dedup-lemmas"), &config)
        .await
        .unwrap();
    let second: Vec<VocabularyEntry> = artifact::read_json(&config.paths.vocabulary).unwrap();

    assert_eq!(first.len(), second.len());
    for (a, b) in first.iter().zip(second.iter()) {
        assert_eq!(a.word, b.word);
        assert_eq!(a.lemma, b.lemma);
        assert_eq!(a.rank, b.rank);
        assert_eq!(a.corpus_count, b.corpus_count);
        assert_eq!(a.is_transparent_cognate, b.is_transparent_cognate);
    }
}

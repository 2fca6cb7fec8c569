//! # cantolex Pipeline
//!
//! The vocabulary consolidation pipeline: seven sequential, file-checkpointed
//! batch stages that turn raw word-occurrence evidence from song lyrics into
//! a ranked, deduplicated, annotated vocabulary dataset for flashcards.
//!
//! Stage order:
//! 1. `merge-elisions`: fold dialectal elided spellings into canonical forms
//! 2. `aggregate-lemmas`: group evidence by (word, lemma) via the analyzer
//! 3. `build-vocabulary`: draft entries with reconciled flags and cache-only
//!    translations
//! 4. `fill-gaps`: resolve remaining translations through the live service
//! 5. `dedup-lemmas`: repair spurious multi-lemma splits
//! 6. `flag-cognates`: authoritative transparent-cognate classification
//! 7. `rerank`: final deterministic ordering
//!
//! Each arrow between stages is a file handoff, not an in-memory call chain,
//! so any suffix of the pipeline can be re-run independently.

pub mod services;
pub mod stages;

pub use stages::{Pipeline, PipelineStage, StageReport};

//! Pipeline stages and orchestration
//!
//! Each stage is a standalone batch operation: explicit input artifact(s) in,
//! one atomically-written output artifact out. The orchestrator runs the
//! stages strictly sequentially and can start from any point, since every
//! stage consumes only the checkpointed output of its predecessor.

use std::sync::Arc;

use async_trait::async_trait;
use cantolex_common::config::PipelineConfig;
use cantolex_common::{Error, Result};
use tracing::info;

pub mod aggregate;
pub mod cognates;
pub mod dedup;
pub mod elision;
pub mod flags;
pub mod gaps;
pub mod lemma_repair;
pub mod rerank;
pub mod vocabulary;

use crate::services::{Lemmatizer, Translator};

/// Summary of a completed stage, for logging and CLI output.
#[derive(Debug)]
pub struct StageReport {
    pub stage: &'static str,
    pub entries_in: usize,
    pub entries_out: usize,
    pub detail: String,
}

/// One batch operation over the artifact chain.
#[async_trait]
pub trait PipelineStage: Send + Sync {
    fn name(&self) -> &'static str;
    async fn run(&self, config: &PipelineConfig) -> Result<StageReport>;
}

/// The full stage sequence, in execution order.
pub struct Pipeline {
    stages: Vec<Box<dyn PipelineStage>>,
}

impl Pipeline {
    /// The standard seven-stage pipeline.
    pub fn standard(lemmatizer: Arc<dyn Lemmatizer>, translator: Arc<dyn Translator>) -> Self {
        Self {
            stages: vec![
                Box::new(elision::ElisionMerger),
                Box::new(aggregate::LemmaAggregator::new(lemmatizer)),
                Box::new(vocabulary::VocabularyBuilder),
                Box::new(gaps::GapFiller::new(translator)),
                Box::new(dedup::LemmaDedupResolver),
                Box::new(cognates::CognateDetector),
                Box::new(rerank::Reranker),
            ],
        }
    }

    pub fn stage_names(&self) -> Vec<&'static str> {
        self.stages.iter().map(|s| s.name()).collect()
    }

    /// Run a single stage by name.
    pub async fn run_stage(&self, name: &str, config: &PipelineConfig) -> Result<StageReport> {
        let stage = self
            .stages
            .iter()
            .find(|s| s.name() == name)
            .ok_or_else(|| Error::NotFound(format!("unknown stage: {}", name)))?;
        info!(stage = name, "Running stage");
        stage.run(config).await
    }

    /// Run the pipeline suffix starting at `from` (the whole pipeline when
    /// `from` is `None`).
    pub async fn run_from(
        &self,
        from: Option<&str>,
        config: &PipelineConfig,
    ) -> Result<Vec<StageReport>> {
        let start = match from {
            None => 0,
            Some(name) => self
                .stages
                .iter()
                .position(|s| s.name() == name)
                .ok_or_else(|| Error::NotFound(format!("unknown stage: {}", name)))?,
        };

        let mut reports = Vec::new();
        for stage in &self.stages[start..] {
            info!(stage = stage.name(), "Running stage");
            let report = stage.run(config).await?;
            info!(
                stage = report.stage,
                entries_in = report.entries_in,
                entries_out = report.entries_out,
                detail = %report.detail,
                "Stage complete"
            );
            reports.push(report);
        }
        Ok(reports)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::{LemmatizerError, TokenAnnotation, TranslatorError};

    struct NullLemmatizer;

    #[async_trait]
    impl Lemmatizer for NullLemmatizer {
        async fn lemmatize(
            &self,
            _line: &str,
        ) -> std::result::Result<Vec<TokenAnnotation>, LemmatizerError> {
            Ok(Vec::new())
        }
    }

    struct NullTranslator;

    #[async_trait]
    impl Translator for NullTranslator {
        async fn translate(&self, _text: &str) -> std::result::Result<String, TranslatorError> {
            Err(TranslatorError::Empty)
        }
    }

    #[test]
    fn standard_pipeline_order() {
        let pipeline = Pipeline::standard(Arc::new(NullLemmatizer), Arc::new(NullTranslator));
        assert_eq!(
            pipeline.stage_names(),
            vec![
                "merge-elisions",
                "aggregate-lemmas",
                "build-vocabulary",
                "fill-gaps",
                "dedup-lemmas",
                "flag-cognates",
                "rerank",
            ]
        );
    }

    #[tokio::test]
    async fn unknown_stage_is_an_error() {
        let pipeline = Pipeline::standard(Arc::new(NullLemmatizer), Arc::new(NullTranslator));
        let config = PipelineConfig::default();
        assert!(pipeline.run_stage("polish-chrome", &config).await.is_err());
        assert!(pipeline.run_from(Some("polish-chrome"), &config).await.is_err());
    }
}

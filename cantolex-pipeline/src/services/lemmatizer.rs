//! External lemmatizer interface
//!
//! The morphological analyzer is an external model behind an HTTP endpoint:
//! input one line of normalized text, output the ordered token analyses
//! aligned to it. There is no guaranteed match for any given target word;
//! the aggregator records a typed fallback when nothing aligns.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

const REQUEST_TIMEOUT_SECS: u64 = 30;
const USER_AGENT: &str = concat!("cantolex/", env!("CARGO_PKG_VERSION"));

/// Lemmatizer client errors
#[derive(Debug, Error)]
pub enum LemmatizerError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("API error {0}: {1}")]
    Api(u16, String),

    #[error("Parse error: {0}")]
    Parse(String),
}

/// One analyzed token, aligned to the input line.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenAnnotation {
    pub text: String,
    pub lemma: String,
    /// Universal POS tag; `X` means unknown.
    pub pos: String,
}

/// Narrow capability: lemmatize one line.
///
/// A deterministic test double replaces the HTTP implementation in the test
/// suite; no stage depends on anything beyond this trait.
#[async_trait]
pub trait Lemmatizer: Send + Sync {
    async fn lemmatize(&self, line: &str) -> Result<Vec<TokenAnnotation>, LemmatizerError>;
}

#[derive(Serialize)]
struct AnalyzeRequest<'a> {
    text: &'a str,
}

#[derive(Deserialize)]
struct AnalyzeResponse {
    tokens: Vec<TokenAnnotation>,
}

/// HTTP client for the analyzer endpoint.
pub struct HttpLemmatizer {
    http_client: reqwest::Client,
    endpoint: String,
}

impl HttpLemmatizer {
    pub fn new(endpoint: &str) -> Result<Self, LemmatizerError> {
        let http_client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .map_err(|e| LemmatizerError::Network(e.to_string()))?;
        Ok(Self {
            http_client,
            endpoint: endpoint.to_string(),
        })
    }
}

#[async_trait]
impl Lemmatizer for HttpLemmatizer {
    async fn lemmatize(&self, line: &str) -> Result<Vec<TokenAnnotation>, LemmatizerError> {
        let response = self
            .http_client
            .post(&self.endpoint)
            .json(&AnalyzeRequest { text: line })
            .send()
            .await
            .map_err(|e| LemmatizerError::Network(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(LemmatizerError::Api(status.as_u16(), body));
        }

        let parsed: AnalyzeResponse = response
            .json()
            .await
            .map_err(|e| LemmatizerError::Parse(e.to_string()))?;
        Ok(parsed.tokens)
    }
}

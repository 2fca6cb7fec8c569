//! External translation service interface
//!
//! The translator may fail or rate-limit. Failures must never corrupt state:
//! the caller leaves the field unresolved and retries on the next invocation.

use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::Mutex;

const REQUEST_TIMEOUT_SECS: u64 = 30;
const USER_AGENT: &str = concat!("cantolex/", env!("CARGO_PKG_VERSION"));

/// Translator client errors
#[derive(Debug, Error)]
pub enum TranslatorError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("API error {0}: {1}")]
    Api(u16, String),

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Empty translation returned")]
    Empty,
}

/// Narrow capability: translate one text in the configured language pair.
#[async_trait]
pub trait Translator: Send + Sync {
    async fn translate(&self, text: &str) -> Result<String, TranslatorError>;
}

/// Minimum-interval rate limiter for the translation endpoint.
struct RateLimiter {
    last_request: Mutex<Option<Instant>>,
    min_interval: Duration,
}

impl RateLimiter {
    fn new(min_interval_ms: u64) -> Self {
        Self {
            last_request: Mutex::new(None),
            min_interval: Duration::from_millis(min_interval_ms),
        }
    }

    async fn wait(&self) {
        let mut last = self.last_request.lock().await;

        if let Some(last_time) = *last {
            let elapsed = last_time.elapsed();
            if elapsed < self.min_interval {
                let wait_time = self.min_interval - elapsed;
                tracing::debug!("Translator rate limiting: waiting {:?}", wait_time);
                tokio::time::sleep(wait_time).await;
            }
        }

        *last = Some(Instant::now());
    }
}

#[derive(Serialize)]
struct TranslateRequest<'a> {
    q: &'a str,
    source: &'a str,
    target: &'a str,
}

#[derive(Deserialize)]
struct TranslateResponse {
    translation: String,
}

/// HTTP client for the translation endpoint.
pub struct HttpTranslator {
    http_client: reqwest::Client,
    rate_limiter: Arc<RateLimiter>,
    endpoint: String,
    source_language: String,
    target_language: String,
}

impl HttpTranslator {
    pub fn new(
        endpoint: &str,
        source_language: &str,
        target_language: &str,
        min_interval_ms: u64,
    ) -> Result<Self, TranslatorError> {
        let http_client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .map_err(|e| TranslatorError::Network(e.to_string()))?;
        Ok(Self {
            http_client,
            rate_limiter: Arc::new(RateLimiter::new(min_interval_ms)),
            endpoint: endpoint.to_string(),
            source_language: source_language.to_string(),
            target_language: target_language.to_string(),
        })
    }
}

#[async_trait]
impl Translator for HttpTranslator {
    async fn translate(&self, text: &str) -> Result<String, TranslatorError> {
        self.rate_limiter.wait().await;

        let request = TranslateRequest {
            q: text,
            source: &self.source_language,
            target: &self.target_language,
        };

        let response = self
            .http_client
            .post(&self.endpoint)
            .json(&request)
            .send()
            .await
            .map_err(|e| TranslatorError::Network(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(TranslatorError::Api(status.as_u16(), body));
        }

        let parsed: TranslateResponse = response
            .json()
            .await
            .map_err(|e| TranslatorError::Parse(e.to_string()))?;

        let translation = parsed.translation.trim().to_string();
        if translation.is_empty() {
            return Err(TranslatorError::Empty);
        }
        Ok(translation)
    }
}

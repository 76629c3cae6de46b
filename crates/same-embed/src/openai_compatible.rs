//! OpenAI-compatible embedder adapter (`POST {base_url}/v1/embeddings`).
//!
//! Sends `X-Title`/`HTTP-Referer` headers to aid attribution on proxy
//! services (OpenRouter and similar); both are configurable rather than
//! hard-coded, since only the operator knows what a given proxy expects.

use crate::retry::{self, MAX_ATTEMPTS};
use crate::{truncate_to_byte_cap, validate_embedding, EmbedError, EmbeddingProvider, Purpose};
use async_trait::async_trait;
use same_core::error::EmbedErrorReason;
use same_core::model::Vector;
use serde::{Deserialize, Serialize};

/// text-embedding-3-* models cap at 8191 tokens; this byte budget stays
/// comfortably under that without needing a tokenizer in this crate.
const MAX_INPUT_BYTES: usize = 32_000;

#[derive(Debug, Clone, Default)]
pub struct ProxyAttribution {
    pub title: Option<String>,
    pub referer: Option<String>,
}

pub struct OpenAiCompatibleProvider {
    client: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
    model: String,
    dimensions: usize,
    attribution: ProxyAttribution,
}

#[derive(Serialize)]
struct EmbedRequest<'a> {
    model: &'a str,
    input: &'a str,
}

#[derive(Deserialize)]
struct EmbedResponse {
    data: Vec<EmbedDatum>,
}

#[derive(Deserialize)]
struct EmbedDatum {
    embedding: Vec<f32>,
}

impl OpenAiCompatibleProvider {
    pub fn new(
        base_url: String,
        api_key: Option<String>,
        model: String,
        dimensions: usize,
        attribution: ProxyAttribution,
    ) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url,
            api_key,
            model,
            dimensions,
            attribution,
        }
    }
}

#[async_trait]
impl EmbeddingProvider for OpenAiCompatibleProvider {
    async fn embed(&self, text: &str, _purpose: Purpose) -> Result<Vector, EmbedError> {
        let url = format!("{}/v1/embeddings", self.base_url.trim_end_matches('/'));
        let capped = truncate_to_byte_cap(text, MAX_INPUT_BYTES);
        let mut input_chars = capped.chars().count();
        let mut body: String = capped.chars().take(input_chars.max(1)).collect();

        for attempt in 1..=MAX_ATTEMPTS {
            if attempt > 1 {
                tokio::time::sleep(retry::backoff_for_attempt(attempt)).await;
            }

            let mut request = self.client.post(&url).json(&EmbedRequest {
                model: &self.model,
                input: &body,
            });
            if let Some(key) = &self.api_key {
                request = request.bearer_auth(key);
            }
            if let Some(title) = &self.attribution.title {
                request = request.header("X-Title", title);
            }
            if let Some(referer) = &self.attribution.referer {
                request = request.header("HTTP-Referer", referer);
            }

            match request.send().await {
                Ok(response) => {
                    let status = response.status().as_u16();
                    if response.status().is_success() {
                        let parsed: EmbedResponse = response
                            .json()
                            .await
                            .map_err(|e| EmbedError::MalformedResponse(e.to_string()))?;
                        let embedding = parsed
                            .data
                            .into_iter()
                            .next()
                            .ok_or_else(|| {
                                EmbedError::MalformedResponse("empty data array".to_string())
                            })?
                            .embedding;
                        return validate_embedding(Vector(embedding), self.dimensions);
                    }

                    if retry::should_halve_input(status, input_chars) && attempt < MAX_ATTEMPTS {
                        input_chars /= 2;
                        body = body.chars().take(input_chars).collect();
                        continue;
                    }

                    if !retry::status_is_retryable(status) || attempt == MAX_ATTEMPTS {
                        return Err(EmbedError::Backend {
                            reason: retry::reason_for_status(status),
                            message: format!("HTTP {status}"),
                        });
                    }
                }
                Err(e) => {
                    let reason = classify_transport_error(&e);
                    if !reason.is_retryable() || attempt == MAX_ATTEMPTS {
                        return Err(EmbedError::Backend {
                            reason,
                            message: same_core::error::redact_secrets(&e.to_string()),
                        });
                    }
                }
            }
        }

        unreachable!("loop always returns on the final attempt")
    }

    fn name(&self) -> &str {
        "openai_compatible"
    }

    fn model(&self) -> &str {
        &self.model
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }
}

fn classify_transport_error(err: &reqwest::Error) -> EmbedErrorReason {
    if err.is_timeout() {
        EmbedErrorReason::Timeout
    } else if err.is_connect() {
        EmbedErrorReason::ConnectionRefused
    } else {
        EmbedErrorReason::NetworkError
    }
}

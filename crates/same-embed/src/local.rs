//! Local HTTP embedder adapter (Ollama-shaped: `POST {base_url}/api/embeddings`).

use crate::retry::{self, MAX_ATTEMPTS};
use crate::{
    is_local_host, truncate_to_byte_cap, validate_embedding, EmbedError, EmbeddingProvider, Purpose,
};
use async_trait::async_trait;
use same_core::error::EmbedErrorReason;
use same_core::model::Vector;
use serde::{Deserialize, Serialize};

/// Ollama's default context window comfortably fits this many input bytes;
/// a real overflow still gets the halving-and-retry path on a 500.
const MAX_INPUT_BYTES: usize = 8_192;

pub struct LocalEmbeddingProvider {
    client: reqwest::Client,
    base_url: String,
    model: String,
    dimensions: usize,
}

#[derive(Serialize)]
struct EmbedRequest<'a> {
    model: &'a str,
    prompt: &'a str,
}

#[derive(Deserialize)]
struct EmbedResponse {
    embedding: Vec<f32>,
}

impl LocalEmbeddingProvider {
    /// Construct against `base_url`. Errors if `base_url`'s host is not
    /// `localhost`, `127.0.0.1`, or `::1` — the local-only provider contract.
    pub fn new(base_url: String, model: String, dimensions: usize) -> Result<Self, EmbedError> {
        let parsed = reqwest::Url::parse(&base_url)
            .map_err(|e| EmbedError::NonLocalHost(format!("{base_url} ({e})")))?;
        let host = parsed
            .host_str()
            .ok_or_else(|| EmbedError::NonLocalHost(base_url.clone()))?;
        if !is_local_host(host) {
            return Err(EmbedError::NonLocalHost(base_url));
        }
        Ok(Self {
            client: reqwest::Client::new(),
            base_url,
            model,
            dimensions,
        })
    }

    /// Ollama's embedding endpoint has no document/query prefix convention,
    /// so `purpose` is accepted for interface parity and otherwise ignored.
    fn prepare(&self, text: &str, _purpose: Purpose, cap: usize) -> String {
        text.chars().take(cap).collect()
    }
}

#[async_trait]
impl EmbeddingProvider for LocalEmbeddingProvider {
    async fn embed(&self, text: &str, purpose: Purpose) -> Result<Vector, EmbedError> {
        let url = format!("{}/api/embeddings", self.base_url.trim_end_matches('/'));
        let capped = truncate_to_byte_cap(text, MAX_INPUT_BYTES);
        let mut input_chars = capped.chars().count();
        let mut body = self.prepare(capped, purpose, input_chars.max(1));

        for attempt in 1..=MAX_ATTEMPTS {
            if attempt > 1 {
                tokio::time::sleep(retry::backoff_for_attempt(attempt)).await;
            }

            let result = self
                .client
                .post(&url)
                .json(&EmbedRequest {
                    model: &self.model,
                    prompt: &body,
                })
                .send()
                .await;

            match result {
                Ok(response) => {
                    let status = response.status().as_u16();
                    if response.status().is_success() {
                        let parsed: EmbedResponse = response
                            .json()
                            .await
                            .map_err(|e| EmbedError::MalformedResponse(e.to_string()))?;
                        return validate_embedding(Vector(parsed.embedding), self.dimensions);
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
        "local"
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

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn construction_rejects_non_local_host() {
        let err = LocalEmbeddingProvider::new(
            "http://example.com:11434".to_string(),
            "nomic-embed-text".to_string(),
            768,
        )
        .unwrap_err();
        assert!(matches!(err, EmbedError::NonLocalHost(_)));
    }

    #[test]
    fn construction_accepts_localhost_and_loopback() {
        for url in ["http://localhost:11434", "http://127.0.0.1:11434", "http://[::1]:11434"] {
            LocalEmbeddingProvider::new(url.to_string(), "m".to_string(), 768)
                .unwrap_or_else(|_| panic!("{url} should be accepted"));
        }
    }

    #[test]
    fn exposes_model_and_dimensions() {
        let provider = LocalEmbeddingProvider::new(
            "http://localhost:11434".to_string(),
            "nomic-embed-text".to_string(),
            768,
        )
        .unwrap();
        assert_eq!(provider.name(), "local");
        assert_eq!(provider.model(), "nomic-embed-text");
        assert_eq!(provider.dimensions(), 768);
    }
}

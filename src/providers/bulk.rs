use async_trait::async_trait;
use log::debug;
use reqwest::Client;
use std::time::Duration;

use crate::errors::ProviderError;
use crate::language_utils;
use crate::providers::Provider;

/// The bulk endpoint rejects overlong single requests; texts above this
/// length are split on sentence boundaries and rejoined after
/// translation.
pub const MAX_REQUEST_CHARS: usize = 4000;

const DEFAULT_ENDPOINT: &str = "https://translate.googleapis.com/translate_a/single";

/// Client for the free bulk translation endpoint
#[derive(Debug)]
pub struct BulkClient {
    /// HTTP client for API requests
    client: Client,
    /// Endpoint URL (overridable for tests and mirrors)
    endpoint: String,
}

impl BulkClient {
    /// Create a new client against the public endpoint
    pub fn new() -> Self {
        Self::with_endpoint(DEFAULT_ENDPOINT)
    }

    /// Create a client against a custom endpoint
    pub fn with_endpoint(endpoint: impl Into<String>) -> Self {
        Self {
            client: Client::builder()
                .timeout(Duration::from_secs(60))
                .build()
                .unwrap_or_default(),
            endpoint: endpoint.into(),
        }
    }

    /// Split a long text on `". "` sentence boundaries into chunks below
    /// `MAX_REQUEST_CHARS`. A single sentence longer than the limit
    /// becomes its own oversized chunk; the endpoint decides its fate.
    pub fn split_sentences(text: &str) -> Vec<String> {
        if text.chars().count() <= MAX_REQUEST_CHARS {
            return vec![text.to_string()];
        }

        let mut chunks = Vec::new();
        let mut current = String::new();

        for sentence in text.split(". ") {
            if current.chars().count() + sentence.chars().count() < MAX_REQUEST_CHARS {
                current.push_str(sentence);
                current.push_str(". ");
            } else {
                if !current.is_empty() {
                    chunks.push(current.trim().to_string());
                }
                current = format!("{}. ", sentence);
            }
        }

        if !current.is_empty() {
            chunks.push(current.trim().to_string());
        }

        chunks
    }

    async fn request_one(
        &self,
        text: &str,
        source: &str,
        target: &str,
    ) -> Result<String, ProviderError> {
        let response = self
            .client
            .get(&self.endpoint)
            .query(&[
                ("client", "gtx"),
                ("sl", source),
                ("tl", target),
                ("dt", "t"),
                ("q", text),
            ])
            .send()
            .await
            .map_err(|e| ProviderError::RequestFailed(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_else(|_| "no response body".to_string());
            return Err(ProviderError::ApiError { status_code: status.as_u16(), message });
        }

        // The endpoint answers with a nested array; the translation is
        // the concatenation of segment[0] over result[0].
        let value: serde_json::Value = response
            .json()
            .await
            .map_err(|e| ProviderError::ParseError(e.to_string()))?;

        let segments = value
            .get(0)
            .and_then(|v| v.as_array())
            .ok_or_else(|| ProviderError::ParseError("missing translation array".to_string()))?;

        let mut translated = String::new();
        for segment in segments {
            if let Some(part) = segment.get(0).and_then(|v| v.as_str()) {
                translated.push_str(part);
            }
        }

        Ok(translated)
    }
}

impl Default for BulkClient {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Provider for BulkClient {
    fn name(&self) -> &str {
        "bulk"
    }

    async fn translate(
        &self,
        text: &str,
        source_lang: &str,
        target_lang: &str,
    ) -> Result<String, ProviderError> {
        if text.trim().is_empty() {
            return Ok(text.to_string());
        }

        // The bulk endpoint detects the source itself
        let source = if source_lang == "auto" {
            "auto".to_string()
        } else {
            language_utils::bulk_lang_code(source_lang)
        };
        let target = language_utils::bulk_lang_code(target_lang);

        let chunks = Self::split_sentences(text);
        if chunks.len() == 1 {
            return self.request_one(&chunks[0], &source, &target).await;
        }

        debug!("Bulk request split into {} chunks", chunks.len());

        let mut translated_chunks = Vec::with_capacity(chunks.len());
        for chunk in &chunks {
            let translated = self.request_one(chunk, &source, &target).await?;
            translated_chunks.push(translated);
        }

        Ok(translated_chunks.join(". "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_short_text_is_a_single_chunk() {
        let chunks = BulkClient::split_sentences("Hello world. How are you?");
        assert_eq!(chunks.len(), 1);
    }

    #[test]
    fn test_long_text_splits_below_limit() {
        let sentence = "word ".repeat(100).trim().to_string();
        let text = (0..20).map(|_| sentence.clone()).collect::<Vec<_>>().join(". ");
        assert!(text.chars().count() > MAX_REQUEST_CHARS);

        let chunks = BulkClient::split_sentences(&text);
        assert!(chunks.len() > 1);
        for chunk in &chunks {
            assert!(chunk.chars().count() <= MAX_REQUEST_CHARS);
        }
    }

    #[test]
    fn test_chunks_preserve_sentence_text() {
        let sentence = "abcdefghij ".repeat(50).trim().to_string();
        let text = (0..12).map(|_| sentence.clone()).collect::<Vec<_>>().join(". ");
        let chunks = BulkClient::split_sentences(&text);

        let rejoined = chunks.join(" ").replace(". ", " ").replace('.', "");
        assert!(rejoined.contains("abcdefghij"));
    }
}

/*!
 * Translation backend: one provider selected by configuration, shared
 * token accounting, and the failure policy the providers themselves do
 * not implement.
 *
 * The backend owns the per-task usage counters. Token estimates are
 * recorded under the single shared lock, so concurrent workers never
 * lose increments. Credential failures degrade to the original text
 * with a high-visibility diagnostic; transport failures propagate to
 * the caller's retry policy.
 */

use log::debug;
use parking_lot::Mutex;
use std::sync::Arc;

use crate::app_config::TranslationProvider;
use crate::errors::ProviderError;
use crate::events::{EventLogLevel, TaskHandle};
use crate::pricing::{self, UsageCounters};
use crate::providers::bulk::BulkClient;
use crate::providers::chat::ChatClient;
use crate::providers::Provider;
use crate::translation::clean::clean_text;

/// Translation backend bound to one provider and one task's counters
pub struct TranslationBackend {
    /// Selected provider kind, used for pricing and diagnostics
    kind: TranslationProvider,

    /// Provider implementation
    provider: Arc<dyn Provider>,

    /// Shared accumulators; the same lock also serializes the
    /// scheduler's completed counter
    usage: Arc<Mutex<UsageCounters>>,
}

impl TranslationBackend {
    /// Create a backend for the configured provider. This is the single
    /// dispatch point from the configuration enum to an implementation.
    pub fn new(kind: TranslationProvider, api_key: Option<&str>) -> Self {
        let key = api_key.unwrap_or_default();
        let provider: Arc<dyn Provider> = match kind {
            TranslationProvider::Bulk => Arc::new(BulkClient::new()),
            TranslationProvider::DeepSeek => Arc::new(ChatClient::deepseek(key)),
            TranslationProvider::Zhipu => Arc::new(ChatClient::zhipu(key)),
            TranslationProvider::OpenRouter => Arc::new(ChatClient::openrouter(key)),
            TranslationProvider::Kimi => Arc::new(ChatClient::kimi(key)),
            TranslationProvider::Gpt => Arc::new(ChatClient::gpt(key)),
        };

        Self::with_provider(kind, provider)
    }

    /// Create a backend around an explicit provider implementation.
    /// Used by tests to inject mocks.
    pub fn with_provider(kind: TranslationProvider, provider: Arc<dyn Provider>) -> Self {
        Self { kind, provider, usage: Arc::new(Mutex::new(UsageCounters::default())) }
    }

    /// The configured provider kind
    pub fn kind(&self) -> TranslationProvider {
        self.kind
    }

    /// Provider identifier for logs
    pub fn provider_name(&self) -> &str {
        self.provider.name()
    }

    /// The shared usage lock. The scheduler uses the same lock for its
    /// completed counter so progress snapshots stay consistent.
    pub fn usage(&self) -> Arc<Mutex<UsageCounters>> {
        Arc::clone(&self.usage)
    }

    /// Snapshot of the accumulated usage
    pub fn usage_snapshot(&self) -> UsageCounters {
        *self.usage.lock()
    }

    /// Cumulative estimated cost in USD
    pub fn estimated_cost(&self) -> f64 {
        self.usage_snapshot().cost(self.kind)
    }

    /// Translate one text, recording token usage.
    ///
    /// The text is cleaned before submission. Credential failures are
    /// logged with a fallback suggestion and degrade to the original
    /// text; other provider errors propagate so the scheduler can retry.
    pub async fn translate(
        &self,
        text: &str,
        source_lang: &str,
        target_lang: &str,
        handle: &TaskHandle,
    ) -> Result<String, ProviderError> {
        if text.trim().is_empty() {
            return Ok(text.to_string());
        }

        let cleaned = clean_text(text);
        let input_tokens = pricing::estimate_tokens(&cleaned);

        let first_call = {
            let mut usage = self.usage.lock();
            usage.input_tokens += input_tokens;
            usage.input_tokens == input_tokens
        };

        if first_call {
            handle.log(
                EventLogLevel::Info,
                format!(
                    "Starting translation, text length: {} chars, input tokens: {}",
                    cleaned.chars().count(),
                    input_tokens
                ),
            );
        }

        match self.provider.translate(&cleaned, source_lang, target_lang).await {
            Ok(translated) => {
                let output_tokens = pricing::estimate_tokens(&translated);
                self.usage.lock().output_tokens += output_tokens;
                Ok(translated)
            }
            Err(e) if e.is_auth_failure() => {
                handle.log(
                    EventLogLevel::Error,
                    format!(
                        "{} API key rejected - check the credential settings",
                        self.provider.name()
                    ),
                );
                handle.log(
                    EventLogLevel::Info,
                    "Hint: the free bulk backend needs no API key".to_string(),
                );
                debug!("Auth failure from {}: {}", self.provider.name(), e);
                Ok(cleaned)
            }
            Err(e) => Err(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events;
    use crate::providers::mock::MockProvider;

    fn backend_with(provider: MockProvider) -> TranslationBackend {
        TranslationBackend::with_provider(TranslationProvider::Bulk, Arc::new(provider))
    }

    #[tokio::test]
    async fn test_tokens_accumulate_across_calls() {
        let backend = backend_with(MockProvider::uppercase());
        let (handle, _stream) = events::channel("t");

        backend.translate("abcdefgh", "en", "fr", &handle).await.unwrap();
        backend.translate("abcdefgh", "en", "fr", &handle).await.unwrap();

        let usage = backend.usage_snapshot();
        assert_eq!(usage.input_tokens, 4);
        assert_eq!(usage.output_tokens, 4);
    }

    #[tokio::test]
    async fn test_empty_text_is_returned_untouched() {
        let backend = backend_with(MockProvider::failing());
        let (handle, _stream) = events::channel("t");

        let result = backend.translate("   ", "en", "fr", &handle).await.unwrap();
        assert_eq!(result, "   ");
        assert_eq!(backend.usage_snapshot().input_tokens, 0);
    }

    #[tokio::test]
    async fn test_auth_failure_degrades_to_original_with_diagnostic() {
        let backend = backend_with(MockProvider::auth_failing());
        let (handle, mut stream) = events::channel("t");

        let result = backend.translate("hello world", "en", "fr", &handle).await.unwrap();
        assert_eq!(result, "hello world");
        drop(handle);

        let mut saw_error_log = false;
        let mut saw_hint = false;
        while let Some(event) = stream.next_event().await {
            if let crate::events::Event::Log { message, level } = event {
                if level == EventLogLevel::Error && message.contains("API key") {
                    saw_error_log = true;
                }
                if message.contains("free bulk backend") {
                    saw_hint = true;
                }
            }
        }
        assert!(saw_error_log);
        assert!(saw_hint);
    }

    #[tokio::test]
    async fn test_transport_failure_propagates() {
        let backend = backend_with(MockProvider::failing());
        let (handle, _stream) = events::channel("t");

        let result = backend.translate("hello", "en", "fr", &handle).await;
        assert!(result.is_err());
    }
}

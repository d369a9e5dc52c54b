/*!
 * Provider implementations for different translation services.
 *
 * This module contains client implementations for the supported
 * translation backends:
 * - Bulk: free bulk translation endpoint, no credential required
 * - Chat: chat-completion style providers (DeepSeek, Zhipu, OpenRouter,
 *   Kimi, GPT)
 * - Mock: deterministic in-process provider for tests
 */

use async_trait::async_trait;
use std::fmt::Debug;

use crate::errors::ProviderError;

/// Common capability for all translation providers.
///
/// Implementations normalize language codes to their own accepted set
/// (unmapped codes pass through unchanged) and surface transport/API
/// failures as `ProviderError` for the caller's retry policy.
#[async_trait]
pub trait Provider: Send + Sync + Debug {
    /// Short identifier used in logs and diagnostics
    fn name(&self) -> &str;

    /// Translate a single text between the given languages
    ///
    /// # Arguments
    /// * `text` - The text to translate (already cleaned by the caller)
    /// * `source_lang` - ISO source code, or "auto"
    /// * `target_lang` - ISO target code
    ///
    /// # Returns
    /// * `Result<String, ProviderError>` - The translated text or an error
    async fn translate(
        &self,
        text: &str,
        source_lang: &str,
        target_lang: &str,
    ) -> Result<String, ProviderError>;
}

pub mod bulk;
pub mod chat;
pub mod mock;

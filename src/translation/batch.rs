/*!
 * Wide fast path for raw string lists.
 *
 * This path serves "translate this list of strings" callers (the
 * plain-text extraction flow): up to `BATCH_CONCURRENCY` calls issued
 * directly against the backend, no page context, no retry loop, and
 * failures degrade to the original string immediately. Segment
 * translation with retry and progress goes through the scheduler
 * instead.
 */

use futures::stream::{self, StreamExt};
use log::debug;
use std::sync::Arc;
use std::time::Instant;

use crate::events::{Event, EventLogLevel, TaskHandle};
use crate::translation::backend::TranslationBackend;

/// Concurrent in-flight calls on the fast path
pub const BATCH_CONCURRENCY: usize = 10;

/// Translate a list of strings, preserving input order in the result.
///
/// Empty or whitespace-only inputs yield `None`; failures yield the
/// original string. The result vector always has the input's length.
pub async fn translate_texts(
    backend: &TranslationBackend,
    texts: &[String],
    source_lang: &str,
    target_lang: &str,
    handle: &TaskHandle,
) -> Vec<Option<String>> {
    let total = texts.len();
    let started = Instant::now();
    let usage = backend.usage();

    let results = stream::iter(texts.iter().cloned().enumerate())
        .map(|(index, text)| {
            let handle = handle.clone();
            let usage = Arc::clone(&usage);
            async move {
                if text.trim().is_empty() {
                    return (index, None);
                }

                let outcome = match backend.translate(&text, source_lang, target_lang, &handle).await
                {
                    Ok(translated) => Some(translated),
                    Err(e) => {
                        debug!("Batch translation failed for item {}: {}", index, e);
                        handle.log(
                            EventLogLevel::Warn,
                            format!("Chunk {}/{} failed ({}), keeping original", index + 1, total, e),
                        );
                        Some(text)
                    }
                };

                {
                    let mut counters = usage.lock();
                    counters.completed += 1;
                    let current = counters.completed;
                    let snapshot = *counters;
                    let elapsed = started.elapsed().as_secs_f64();
                    handle.emit(Event::Progress {
                        current,
                        total,
                        percentage: if total > 0 { (current * 100 / total) as u8 } else { 0 },
                        message: format!("Translated {}/{} text chunks...", current, total),
                        input_tokens: snapshot.input_tokens,
                        output_tokens: snapshot.output_tokens,
                        estimated_cost: snapshot.cost(backend.kind()),
                        elapsed_secs: elapsed,
                        estimated_remaining_secs: if current > 0 && current < total {
                            elapsed / current as f64 * (total - current) as f64
                        } else {
                            0.0
                        },
                    });
                }

                (index, outcome)
            }
        })
        .buffer_unordered(BATCH_CONCURRENCY)
        .collect::<Vec<_>>()
        .await;

    let mut ordered: Vec<Option<String>> = vec![None; total];
    for (index, translated) in results {
        ordered[index] = translated;
    }
    ordered
}

/// Split a text into chunks of at most `chunk_chars` characters,
/// breaking on character boundaries.
pub fn chunk_by_chars(text: &str, chunk_chars: usize) -> Vec<String> {
    let mut chunks = Vec::new();
    let mut current = String::new();
    let mut count = 0usize;

    for c in text.chars() {
        current.push(c);
        count += 1;
        if count == chunk_chars {
            chunks.push(std::mem::take(&mut current));
            count = 0;
        }
    }

    if !current.is_empty() {
        chunks.push(current);
    }

    chunks
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app_config::TranslationProvider;
    use crate::events;
    use crate::providers::mock::MockProvider;
    use std::sync::Arc;

    fn backend_with(provider: MockProvider) -> TranslationBackend {
        TranslationBackend::with_provider(TranslationProvider::Bulk, Arc::new(provider))
    }

    #[test]
    fn test_chunk_by_chars_splits_9000_into_three() {
        let text = "a".repeat(9000);
        let chunks = chunk_by_chars(&text, 4000);
        assert_eq!(chunks.len(), 3);
        assert_eq!(chunks[0].chars().count(), 4000);
        assert_eq!(chunks[1].chars().count(), 4000);
        assert_eq!(chunks[2].chars().count(), 1000);
    }

    #[test]
    fn test_chunk_by_chars_respects_multibyte_boundaries() {
        let text = "中".repeat(10);
        let chunks = chunk_by_chars(&text, 4);
        assert_eq!(chunks.len(), 3);
        assert_eq!(chunks[0], "中中中中");
    }

    #[tokio::test]
    async fn test_results_keep_input_order() {
        let backend = backend_with(MockProvider::uppercase());
        let (handle, _stream) = events::channel("t");
        let texts: Vec<String> = (0..25).map(|i| format!("item {}", i)).collect();

        let results = translate_texts(&backend, &texts, "en", "fr", &handle).await;

        assert_eq!(results.len(), 25);
        for (i, result) in results.iter().enumerate() {
            assert_eq!(result.as_deref(), Some(format!("ITEM {}", i).as_str()));
        }
    }

    #[tokio::test]
    async fn test_empty_items_yield_none() {
        let backend = backend_with(MockProvider::uppercase());
        let (handle, _stream) = events::channel("t");
        let texts = vec!["hello".to_string(), "   ".to_string(), "world".to_string()];

        let results = translate_texts(&backend, &texts, "en", "fr", &handle).await;

        assert_eq!(results[0].as_deref(), Some("HELLO"));
        assert!(results[1].is_none());
        assert_eq!(results[2].as_deref(), Some("WORLD"));
    }

    #[tokio::test]
    async fn test_failures_degrade_to_original() {
        let backend = backend_with(MockProvider::failing());
        let (handle, _stream) = events::channel("t");
        let texts = vec!["keep me".to_string()];

        let results = translate_texts(&backend, &texts, "en", "fr", &handle).await;
        assert_eq!(results[0].as_deref(), Some("keep me"));
    }
}

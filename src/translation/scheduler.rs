/*!
 * Concurrent segment-translation scheduler.
 *
 * Translates a batch of segments using a fixed number of concurrently
 * active workers, with per-segment failure isolation, bounded retry,
 * cooperative cancellation, and progress reporting through the task's
 * event channel.
 */

use futures::stream::{self, StreamExt};
use log::debug;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Semaphore;

use crate::events::{self, Event, EventLogLevel, TaskHandle};
use crate::translation::backend::TranslationBackend;
use crate::translation::Segment;

/// Total attempts per segment before degrading to the original text
pub const MAX_ATTEMPTS: usize = 3;

/// Fixed delay between attempts
pub const RETRY_DELAY: Duration = Duration::from_millis(500);

/// One translated segment. Written exactly once by whichever worker
/// processed the segment.
#[derive(Debug, Clone)]
pub struct TranslationOutcome {
    /// The source segment
    pub segment: Segment,

    /// Translated text, or the original text after exhausted retries
    pub translated_text: String,

    /// Whether the outcome fell back to the original text
    pub degraded: bool,
}

/// Outcome mapping keyed by (page index, segment index). Keys are
/// unique; no ordering guarantee beyond lookup.
pub type OutcomeMap = HashMap<(usize, usize), TranslationOutcome>;

/// Result of a scheduler run
#[derive(Debug)]
pub struct SchedulerOutput {
    /// One entry per segment that completed (success or fallback).
    /// Segments never started because cancellation was observed first
    /// are absent.
    pub outcomes: OutcomeMap,

    /// Whether cancellation was observed during the run. When set, the
    /// caller must surface a single Cancelled terminal and must not use
    /// the outcomes for reconstruction.
    pub cancelled: bool,
}

/// Translate all segments with exactly `concurrency` simultaneously
/// active workers. Excess submissions queue on the semaphore.
///
/// Completion order is unspecified; the outcome mapping contains
/// exactly one entry per submitted segment unless cancellation cut the
/// run short.
pub async fn translate_segments(
    backend: &TranslationBackend,
    segments: &[Segment],
    source_lang: &str,
    target_lang: &str,
    concurrency: usize,
    handle: &TaskHandle,
) -> SchedulerOutput {
    let total = segments.len();
    let started = Instant::now();
    let concurrency = concurrency.max(1);
    let semaphore = Arc::new(Semaphore::new(concurrency));
    let usage = backend.usage();

    let results = stream::iter(segments.iter().cloned())
        .map(|segment| {
            let semaphore = Arc::clone(&semaphore);
            let usage = Arc::clone(&usage);
            let handle = handle.clone();
            async move {
                let _permit = semaphore.acquire().await.unwrap();

                translate_one(backend, segment, source_lang, target_lang, &handle, &usage, total, started)
                    .await
            }
        })
        .buffer_unordered(concurrency)
        .collect::<Vec<_>>()
        .await;

    let mut outcomes = OutcomeMap::with_capacity(total);
    for outcome in results.into_iter().flatten() {
        outcomes.insert(outcome.segment.key(), outcome);
    }

    SchedulerOutput { outcomes, cancelled: handle.is_cancelled() }
}

/// Translate a single segment with the bounded retry policy.
/// Returns `None` when cancellation was observed at a dispatch
/// checkpoint before the segment produced an outcome.
#[allow(clippy::too_many_arguments)]
async fn translate_one(
    backend: &TranslationBackend,
    segment: Segment,
    source_lang: &str,
    target_lang: &str,
    handle: &TaskHandle,
    usage: &parking_lot::Mutex<crate::pricing::UsageCounters>,
    total: usize,
    started: Instant,
) -> Option<TranslationOutcome> {
    let attempt_started = Instant::now();
    let mut attempt = 0;

    loop {
        attempt += 1;

        // Dispatch checkpoint: once cancellation is observed this
        // segment is abandoned without an outcome.
        if handle.is_cancelled() {
            return None;
        }

        if attempt == 1 {
            handle.log(
                EventLogLevel::Info,
                format!(
                    "[page {}|block {}] source: {}",
                    segment.page_index + 1,
                    segment.segment_index + 1,
                    events::preview(&segment.text)
                ),
            );
        }

        match backend.translate(&segment.text, source_lang, target_lang, handle).await {
            Ok(translated) => {
                record_completed(
                    backend, handle, usage, total, started,
                    &translated, attempt_started, &segment,
                );
                return Some(TranslationOutcome { segment, translated_text: translated, degraded: false });
            }
            Err(e) if attempt >= MAX_ATTEMPTS => {
                handle.log(
                    EventLogLevel::Warn,
                    format!(
                        "[page {}|block {}] failed after {} attempts ({}), keeping original text",
                        segment.page_index + 1,
                        segment.segment_index + 1,
                        attempt,
                        e
                    ),
                );
                let original = segment.text.clone();
                record_completed(
                    backend, handle, usage, total, started,
                    &original, attempt_started, &segment,
                );
                return Some(TranslationOutcome { segment, translated_text: original, degraded: true });
            }
            Err(e) => {
                debug!(
                    "Translation attempt {} for ({}, {}) failed: {}",
                    attempt, segment.page_index, segment.segment_index, e
                );
                tokio::time::sleep(RETRY_DELAY).await;
            }
        }
    }
}

/// Bump the completed counter and emit the translated-text log line and
/// a progress snapshot. Everything happens under the shared usage lock
/// so interleaved workers can never deliver a regressing percentage.
#[allow(clippy::too_many_arguments)]
fn record_completed(
    backend: &TranslationBackend,
    handle: &TaskHandle,
    usage: &parking_lot::Mutex<crate::pricing::UsageCounters>,
    total: usize,
    started: Instant,
    translated: &str,
    attempt_started: Instant,
    segment: &Segment,
) {
    let mut counters = usage.lock();
    counters.completed += 1;
    let current = counters.completed;
    let snapshot = *counters;

    handle.log(
        EventLogLevel::Success,
        format!(
            "[page {}|block {}] translated {}/{}: {} ({:.1}s)",
            segment.page_index + 1,
            segment.segment_index + 1,
            current,
            total,
            events::preview(translated),
            attempt_started.elapsed().as_secs_f64()
        ),
    );

    let elapsed = started.elapsed().as_secs_f64();
    let remaining = if current > 0 && current < total {
        elapsed / current as f64 * (total - current) as f64
    } else {
        0.0
    };

    handle.emit(Event::Progress {
        current,
        total,
        percentage: if total > 0 { (current * 100 / total) as u8 } else { 0 },
        message: format!("Translated {}/{} text blocks...", current, total),
        input_tokens: snapshot.input_tokens,
        output_tokens: snapshot.output_tokens,
        estimated_cost: snapshot.cost(backend.kind()),
        elapsed_secs: elapsed,
        estimated_remaining_secs: remaining,
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app_config::TranslationProvider;
    use crate::pdf::Rect;
    use crate::providers::mock::MockProvider;

    fn segments(n: usize) -> Vec<Segment> {
        (0..n)
            .map(|i| Segment {
                page_index: i / 4,
                segment_index: i % 4,
                text: format!("text block {}", i),
                bbox: Rect::new(0.0, 0.0, 100.0, 20.0),
            })
            .collect()
    }

    fn backend_with(provider: MockProvider) -> TranslationBackend {
        TranslationBackend::with_provider(TranslationProvider::Bulk, Arc::new(provider))
    }

    #[tokio::test]
    async fn test_outcome_map_is_complete_for_every_concurrency() {
        for concurrency in [1usize, 2, 7, 16] {
            let backend = backend_with(MockProvider::uppercase());
            let (handle, _stream) = events::channel("t");
            let segs = segments(16);

            let output =
                translate_segments(&backend, &segs, "en", "fr", concurrency, &handle).await;

            assert!(!output.cancelled);
            assert_eq!(output.outcomes.len(), 16, "concurrency {}", concurrency);
            for seg in &segs {
                assert!(output.outcomes.contains_key(&seg.key()));
            }
        }
    }

    #[tokio::test]
    async fn test_always_failing_backend_degrades_after_three_attempts() {
        let provider = MockProvider::failing();
        let counter = provider.call_counter();
        let backend = backend_with(provider);
        let (handle, _stream) = events::channel("t");
        let segs = segments(1);

        let output = translate_segments(&backend, &segs, "en", "fr", 1, &handle).await;

        let outcome = output.outcomes.get(&(0, 0)).unwrap();
        assert_eq!(outcome.translated_text, "text block 0");
        assert!(outcome.degraded);
        assert_eq!(counter.load(std::sync::atomic::Ordering::SeqCst), MAX_ATTEMPTS);
    }

    #[tokio::test]
    async fn test_transient_failure_recovers_within_retry_budget() {
        let backend = backend_with(MockProvider::fail_first(2));
        let (handle, _stream) = events::channel("t");
        let segs = segments(1);

        let output = translate_segments(&backend, &segs, "en", "fr", 1, &handle).await;

        let outcome = output.outcomes.get(&(0, 0)).unwrap();
        assert_eq!(outcome.translated_text, "TEXT BLOCK 0");
        assert!(!outcome.degraded);
    }

    #[tokio::test]
    async fn test_cancel_before_start_yields_zero_outcomes() {
        let backend = backend_with(MockProvider::uppercase());
        let (handle, _stream) = events::channel("t");
        handle.request_cancel();

        let output = translate_segments(&backend, &segments(8), "en", "fr", 2, &handle).await;

        assert!(output.cancelled);
        assert!(output.outcomes.is_empty());
    }

    #[tokio::test]
    async fn test_token_totals_match_per_segment_estimates() {
        let backend = backend_with(MockProvider::uppercase());
        let (handle, _stream) = events::channel("t");
        let segs = segments(10);

        let expected_input: u64 =
            segs.iter().map(|s| crate::pricing::estimate_tokens(&s.text)).sum();

        let output = translate_segments(&backend, &segs, "en", "fr", 4, &handle).await;
        assert_eq!(output.outcomes.len(), 10);

        let usage = backend.usage_snapshot();
        assert_eq!(usage.input_tokens, expected_input);
        // Uppercasing preserves length, so output estimates match input
        assert_eq!(usage.output_tokens, expected_input);
        assert_eq!(usage.completed, 10);
    }

    #[tokio::test]
    async fn test_progress_percentages_never_regress() {
        let backend = backend_with(MockProvider::uppercase());
        let (handle, mut stream) = events::channel("t");
        let segs = segments(12);

        let output = translate_segments(&backend, &segs, "en", "fr", 4, &handle).await;
        assert_eq!(output.outcomes.len(), 12);
        drop(handle);

        let mut last = 0u8;
        while let Some(event) = stream.next_event().await {
            if let Event::Progress { percentage, .. } = event {
                assert!(percentage >= last);
                last = percentage;
            }
        }
        assert_eq!(last, 100);
    }
}

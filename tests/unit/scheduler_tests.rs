use std::sync::Arc;

use pdflingo::app_config::TranslationProvider;
use pdflingo::events;
use pdflingo::pdf::Rect;
use pdflingo::providers::mock::MockProvider;
use pdflingo::translation::scheduler::translate_segments;
use pdflingo::translation::{Segment, TranslationBackend};

use crate::common::CancelOnNth;

fn segments(n: usize) -> Vec<Segment> {
    (0..n)
        .map(|i| Segment {
            page_index: i,
            segment_index: 0,
            text: format!("block {}", i),
            bbox: Rect::new(72.0, 700.0, 300.0, 712.0),
        })
        .collect()
}

#[tokio::test]
async fn test_cancel_mid_run_keeps_completed_outcomes() {
    let (handle, _stream) = events::channel("cancel-mid");

    // The provider cancels its own task during the second call, so the
    // first two segments complete and later dispatches are skipped.
    let provider = CancelOnNth::new(handle.clone(), 2);
    let backend = TranslationBackend::with_provider(TranslationProvider::Bulk, Arc::new(provider));

    let segs = segments(6);
    let output = translate_segments(&backend, &segs, "en", "fr", 1, &handle).await;

    assert!(output.cancelled);
    assert!(output.outcomes.len() >= 2, "completed segments stay recorded");
    assert!(output.outcomes.len() < 6, "later segments were never started");
    assert_eq!(output.outcomes.get(&(0, 0)).unwrap().translated_text, "BLOCK 0");
}

#[tokio::test]
async fn test_degraded_outcomes_still_fill_the_map() {
    // Half the calls fail permanently; with 3 attempts each, every
    // segment still ends up in the map, degraded ones keeping their
    // original text.
    let backend = TranslationBackend::with_provider(
        TranslationProvider::Bulk,
        Arc::new(MockProvider::failing()),
    );
    let (handle, _stream) = events::channel("degraded");

    let segs = segments(5);
    let output = translate_segments(&backend, &segs, "en", "fr", 3, &handle).await;

    assert!(!output.cancelled);
    assert_eq!(output.outcomes.len(), 5);
    for seg in &segs {
        let outcome = output.outcomes.get(&seg.key()).unwrap();
        assert!(outcome.degraded);
        assert_eq!(outcome.translated_text, seg.text);
    }
}

#[tokio::test]
async fn test_concurrency_larger_than_batch_is_fine() {
    let backend = TranslationBackend::with_provider(
        TranslationProvider::Bulk,
        Arc::new(MockProvider::uppercase()),
    );
    let (handle, _stream) = events::channel("wide");

    let segs = segments(3);
    let output = translate_segments(&backend, &segs, "en", "fr", 64, &handle).await;

    assert_eq!(output.outcomes.len(), 3);
}

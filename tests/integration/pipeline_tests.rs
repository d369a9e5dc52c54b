use std::sync::Arc;

use pdflingo::app_config::{TranslateRequest, TranslationProvider};
use pdflingo::app_controller::{Controller, OutputMode};
use pdflingo::events::{self, Event};
use pdflingo::pdf::{self, SourceDocument};
use pdflingo::providers::mock::MockProvider;
use pdflingo::translation::{translate_segments, TranslationBackend};

use tokio_test::assert_ok;

use crate::common::{init_test_logging, write_sample_pdf};

fn request() -> TranslateRequest {
    TranslateRequest {
        provider: TranslationProvider::Bulk,
        api_key: None,
        source_lang: "en".to_string(),
        target_lang: "en".to_string(),
        task_id: "pipeline-test".to_string(),
        concurrency: Some(2),
        font_candidates: Vec::new(),
    }
}

fn mock_backend() -> TranslationBackend {
    TranslationBackend::with_provider(TranslationProvider::Bulk, Arc::new(MockProvider::uppercase()))
}

#[tokio::test]
async fn test_three_page_outcome_keys_are_page_block_pairs() {
    let input = write_sample_pdf(&["hello world", "second page", "third page"]);
    let source = SourceDocument::open(input.path()).unwrap();

    let (segments, images) = pdf::extract_segments(&source).unwrap();
    assert_eq!(segments.len(), 3);
    assert!(images.iter().all(|page| page.is_empty()));

    let backend = mock_backend();
    let (handle, _stream) = events::channel("keys");
    let output = translate_segments(&backend, &segments, "en", "en", 2, &handle).await;

    let mut keys: Vec<_> = output.outcomes.keys().copied().collect();
    keys.sort();
    assert_eq!(keys, vec![(0, 0), (1, 0), (2, 0)]);
    assert_eq!(output.outcomes.get(&(0, 0)).unwrap().translated_text, "HELLO WORLD");
}

#[tokio::test]
async fn test_uppercase_end_to_end_preserves_pages_and_boxes() {
    init_test_logging();
    let input = write_sample_pdf(&["hello world", "second page", "third page"]);
    let output_dir = tempfile::tempdir().unwrap();
    let output_path = output_dir.path().join("translated_out.pdf");

    let source = SourceDocument::open(input.path()).unwrap();
    let (source_segments, _) = pdf::extract_segments(&source).unwrap();
    drop(source);

    let controller = Controller::new().unwrap();
    let backend = mock_backend();
    let (handle, _stream) = events::channel("e2e");

    let req = request();
    let run = controller.translate_pdf(input.path(), &output_path, &req, &backend, &handle);
    tokio_test::assert_ok!(run.await);

    assert!(output_path.is_file());

    let rebuilt = SourceDocument::open(&output_path).unwrap();
    assert_eq!(rebuilt.page_count(), 3);

    let (rebuilt_segments, _) = pdf::extract_segments(&rebuilt).unwrap();
    assert_eq!(rebuilt_segments.len(), 3);

    let expected = ["HELLO WORLD", "SECOND PAGE", "THIRD PAGE"];
    for (segment, expected_text) in rebuilt_segments.iter().zip(expected.iter()) {
        assert_eq!(segment.text, *expected_text);

        // Inserted into the original bounding region
        let original = source_segments
            .iter()
            .find(|s| s.page_index == segment.page_index)
            .unwrap();
        assert!((segment.bbox.x0 - original.bbox.x0).abs() < 1.5);
        assert!(segment.bbox.y1 <= original.bbox.y1 + 1.5);
        assert!(segment.bbox.y0 >= original.bbox.y0 - 1.5);
    }
}

#[tokio::test]
async fn test_pre_cancelled_task_emits_single_cancelled_terminal() {
    let input = write_sample_pdf(&["some text"]);
    let output_dir = tempfile::tempdir().unwrap();
    let output_path = output_dir.path().join("translated_out.pdf");

    let controller = Controller::new().unwrap();
    let (handle, mut stream) = events::channel("pre-cancel");
    handle.request_cancel();

    controller
        .run_task(input.path(), &output_path, &request(), OutputMode::Pdf, &handle)
        .await;
    drop(handle);

    let mut terminals = Vec::new();
    while let Some(event) = stream.next_event().await {
        if event.is_terminal() {
            terminals.push(event);
        }
    }

    assert_eq!(terminals.len(), 1);
    assert!(matches!(terminals[0], Event::Cancelled));
    assert!(!output_path.exists());
}

#[tokio::test]
async fn test_unreadable_source_emits_error_terminal() {
    let output_dir = tempfile::tempdir().unwrap();
    let missing = output_dir.path().join("does_not_exist.pdf");
    let output_path = output_dir.path().join("translated_out.pdf");

    let controller = Controller::new().unwrap();
    let (handle, mut stream) = events::channel("fatal");

    controller
        .run_task(&missing, &output_path, &request(), OutputMode::Pdf, &handle)
        .await;
    drop(handle);

    let mut saw_error_terminal = false;
    let mut saw_error_log = false;
    while let Some(event) = stream.next_event().await {
        match event {
            Event::Error { .. } => saw_error_terminal = true,
            Event::Log { level, .. } if level == pdflingo::events::EventLogLevel::Error => {
                saw_error_log = true
            }
            _ => {}
        }
    }

    // The failure is surfaced as a log line before the terminal event
    assert!(saw_error_terminal);
    assert!(saw_error_log);
}

#[tokio::test]
async fn test_analysis_reports_counts_and_language() {
    let input = write_sample_pdf(&["the quick brown fox", "jumps over the lazy dog"]);
    let controller = Controller::new().unwrap();

    let analysis = controller.analyze(input.path()).unwrap();
    assert_eq!(analysis.total_pages, 2);
    assert_eq!(analysis.word_count, 8);
    assert!(analysis.char_count > 0);
    assert_eq!(analysis.detected.code, "en");
    assert!(analysis.total_tokens > 0);
    assert!(analysis.estimated_minutes >= 1.0);
}

use std::sync::Arc;

use pdflingo::app_config::{TranslateRequest, TranslationProvider};
use pdflingo::app_controller::{Controller, TEXT_CHUNK_CHARS};
use pdflingo::events;
use pdflingo::providers::mock::MockProvider;
use pdflingo::translation::{batch, TranslationBackend};

use crate::common::write_sample_pdf;

fn request() -> TranslateRequest {
    TranslateRequest {
        provider: TranslationProvider::Bulk,
        api_key: None,
        source_lang: "en".to_string(),
        target_lang: "en".to_string(),
        task_id: "text-flow-test".to_string(),
        concurrency: None,
        font_candidates: Vec::new(),
    }
}

fn mock_backend() -> TranslationBackend {
    TranslationBackend::with_provider(TranslationProvider::Bulk, Arc::new(MockProvider::uppercase()))
}

#[tokio::test]
async fn test_9000_chars_make_three_chunks_rejoined_in_order() {
    // Three visibly distinct regions so ordering mistakes would show
    let text = format!("{}{}{}", "a".repeat(4000), "b".repeat(4000), "c".repeat(1000));
    let chunks = batch::chunk_by_chars(&text, TEXT_CHUNK_CHARS);
    assert_eq!(chunks.len(), 3);

    let backend = mock_backend();
    let (handle, _stream) = events::channel("chunks");
    let results = batch::translate_texts(&backend, &chunks, "en", "en", &handle).await;

    let rejoined: Vec<String> = results
        .into_iter()
        .zip(chunks.into_iter())
        .map(|(r, original)| r.unwrap_or(original))
        .collect();
    let output = rejoined.join("\n\n");

    let expected =
        format!("{}\n\n{}\n\n{}", "A".repeat(4000), "B".repeat(4000), "C".repeat(1000));
    assert_eq!(output, expected);
}

#[tokio::test]
async fn test_slow_workers_do_not_reorder_chunks() {
    // Random-ish delays let later chunks finish first; output order
    // must still follow input order.
    let backend = TranslationBackend::with_provider(
        TranslationProvider::Bulk,
        Arc::new(MockProvider::slow(5)),
    );
    let (handle, _stream) = events::channel("slow");

    let texts: Vec<String> = (0..12).map(|i| format!("chunk number {}", i)).collect();
    let results = batch::translate_texts(&backend, &texts, "en", "en", &handle).await;

    for (i, result) in results.iter().enumerate() {
        assert_eq!(result.as_deref(), Some(format!("CHUNK NUMBER {}", i).to_uppercase().as_str()));
    }
}

#[tokio::test]
async fn test_to_text_flow_writes_translated_txt() {
    let input = write_sample_pdf(&["hello world", "second page"]);
    let output_dir = tempfile::tempdir().unwrap();
    let output_path = output_dir.path().join("translated_out.txt");

    let controller = Controller::new().unwrap();
    let backend = mock_backend();
    let (handle, _stream) = events::channel("to-text");

    controller
        .translate_pdf_to_text(input.path(), &output_path, &request(), &backend, &handle)
        .await
        .unwrap();

    let content = std::fs::read_to_string(&output_path).unwrap();
    assert!(content.contains("HELLO WORLD"));
    assert!(content.contains("SECOND PAGE"));
}

#[tokio::test]
async fn test_to_text_flow_honors_cancellation() {
    let input = write_sample_pdf(&["hello world"]);
    let output_dir = tempfile::tempdir().unwrap();
    let output_path = output_dir.path().join("translated_out.txt");

    let controller = Controller::new().unwrap();
    let backend = mock_backend();
    let (handle, _stream) = events::channel("to-text-cancel");
    handle.request_cancel();

    let result = controller
        .translate_pdf_to_text(input.path(), &output_path, &request(), &backend, &handle)
        .await;

    assert!(result.unwrap_err().is_cancellation());
    assert!(!output_path.exists());
}

#[tokio::test]
async fn test_spawned_text_task_streams_to_completed_terminal() {
    let input = write_sample_pdf(&["hello world"]);
    let output_dir = tempfile::tempdir().unwrap();
    let output_path = output_dir.path().join("translated_out.txt");

    // Drive run_task against a registry-created handle, exactly as the
    // spawn path wires it, and consume the stream like an external
    // observer would.
    let registry = pdflingo::TaskRegistry::new();
    let handle = registry.create("spawned-text");
    let mut stream = registry.take_stream("spawned-text").unwrap();

    let controller = Controller::new().unwrap();
    let backend = mock_backend();
    let request = request();
    let run = controller.translate_pdf_to_text(
        input.path(),
        &output_path,
        &request,
        &backend,
        &handle,
    );

    let result = run.await;
    assert!(result.is_ok());
    handle.emit(pdflingo::Event::Completed {
        output_file: "translated_out.txt".to_string(),
    });
    drop(handle);

    let mut saw_completed = false;
    while let Some(event) = stream.next_event().await {
        if let pdflingo::Event::Completed { output_file } = event {
            assert_eq!(output_file, "translated_out.txt");
            saw_completed = true;
        }
    }
    assert!(saw_completed);
    registry.remove("spawned-text");

    // Output artifacts keep the source stem behind a fixed prefix so
    // repeat downloads stay addressable
    assert_eq!(
        pdflingo::file_utils::FileManager::output_filename("report.pdf", "txt"),
        "translated_report.txt"
    );
}

/*!
 * Application controller: task lifecycle orchestration.
 *
 * Ties the pipeline together for one translation request: extraction,
 * concurrent translation, document reconstruction, and the terminal
 * event that ends the task's stream. Segment- and page-level problems
 * degrade and continue; only resource acquisition and serialization
 * failures abort a task.
 */

use anyhow::Result;
use log::{error, info};
use std::path::{Path, PathBuf};
use std::time::Instant;
use uuid::Uuid;

use crate::app_config::{Config, TranslateRequest};
use crate::errors::{AppError, TaskError};
use crate::events::{Event, EventLogLevel, TaskHandle};
use crate::file_utils::FileManager;
use crate::pdf::{self, DocumentBuilder, PdfAnalysis, SourceDocument};
use crate::registry::TaskRegistry;
use crate::translation::{batch, translate_segments, TranslationBackend};

/// Character budget per chunk on the plain-text path
pub const TEXT_CHUNK_CHARS: usize = 4000;

/// What artifact a spawned task produces
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputMode {
    /// Layout-preserving translated PDF
    Pdf,
    /// Plain-text translation of the extracted text
    PlainText,
}

/// Main application controller
#[derive(Clone)]
pub struct Controller {
    /// Application configuration
    pub config: Config,
}

impl Controller {
    /// Create a new controller with default configuration
    pub fn new() -> Result<Self> {
        Ok(Self { config: Config::default() })
    }

    /// Create a new controller with the given configuration
    pub fn with_config(config: Config) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    /// Pre-flight analysis: page count, character/word counts, dominant
    /// language, token estimate, projected duration.
    pub fn analyze<P: AsRef<Path>>(&self, input: P) -> Result<PdfAnalysis, AppError> {
        let source = SourceDocument::open(input)?;
        Ok(pdf::analyze(&source))
    }

    /// Register a task and run it in the background. Returns the task
    /// id; progress flows through the registry's event stream.
    pub fn spawn_translation(
        &self,
        registry: &'static TaskRegistry,
        input: PathBuf,
        output: PathBuf,
        request: TranslateRequest,
        mode: OutputMode,
    ) -> String {
        let task_id = if request.task_id.is_empty() {
            Uuid::new_v4().to_string()
        } else {
            request.task_id.clone()
        };

        let handle = registry.create(&task_id);
        let controller = self.clone();

        tokio::spawn(async move {
            controller.run_task(&input, &output, &request, mode, &handle).await;
        });

        task_id
    }

    /// Run one task to its terminal event
    pub async fn run_task(
        &self,
        input: &Path,
        output: &Path,
        request: &TranslateRequest,
        mode: OutputMode,
        handle: &TaskHandle,
    ) {
        let backend = TranslationBackend::new(request.provider, request.api_key.as_deref());
        let result = match mode {
            OutputMode::Pdf => self.translate_pdf(input, output, request, &backend, handle).await,
            OutputMode::PlainText => {
                self.translate_pdf_to_text(input, output, request, &backend, handle).await
            }
        };

        let output_file =
            output.file_name().map(|n| n.to_string_lossy().to_string()).unwrap_or_default();

        match result {
            Ok(()) => {
                info!("Translation completed: {:?}", output);
                handle.emit(Event::Completed { output_file });
            }
            Err(e) if e.is_cancellation() => {
                info!("Translation cancelled: {}", handle.task_id());
                handle.emit(Event::Cancelled);
            }
            Err(e) => {
                error!("Translation failed: {}", e);
                handle.log(EventLogLevel::Error, format!("Translation failed: {}", e));
                handle.emit(Event::Error { error: e.to_string() });
            }
        }
    }

    /// Translate a PDF into a layout-preserving PDF
    pub async fn translate_pdf(
        &self,
        input: &Path,
        output: &Path,
        request: &TranslateRequest,
        backend: &TranslationBackend,
        handle: &TaskHandle,
    ) -> Result<(), AppError> {
        let concurrency = request.concurrency_or_default();
        let started = Instant::now();

        handle.log(EventLogLevel::Info, "========== Translation task started ==========");
        handle.log(
            EventLogLevel::Success,
            format!("Block-level concurrent translation with {} workers", concurrency),
        );
        handle.log(EventLogLevel::Info, format!("Input file: {:?}", input));
        handle.log(EventLogLevel::Info, format!("Output file: {:?}", output));

        if let Ok(size) = FileManager::file_size(input) {
            handle.log(
                EventLogLevel::Info,
                format!("File size: {}", FileManager::format_size(size)),
            );
        }

        handle.log(EventLogLevel::Info, "Opening PDF...");
        let source = SourceDocument::open(input)?;
        let total_pages = source.page_count();
        handle.log(
            EventLogLevel::Success,
            format!("PDF opened: {} pages ({:.2}s)", total_pages, started.elapsed().as_secs_f64()),
        );

        let (segments, page_images) = pdf::extract_segments(&source)?;
        handle.log(EventLogLevel::Info, format!("Extracted {} text blocks", segments.len()));

        if handle.is_cancelled() {
            return Err(TaskError::Cancelled.into());
        }

        handle.log(
            EventLogLevel::Info,
            format!("Translating with provider '{}'...", backend.provider_name()),
        );

        let scheduled = translate_segments(
            backend,
            &segments,
            &request.source_lang,
            &request.target_lang,
            concurrency,
            handle,
        )
        .await;

        if scheduled.cancelled {
            return Err(TaskError::Cancelled.into());
        }
        handle.log(EventLogLevel::Success, "All text blocks translated");

        handle.log(
            EventLogLevel::Info,
            "Rebuilding document: removing source text, keeping images and layout...",
        );
        let fonts = pdf::pick_fonts(&request.font_candidates);
        let mut builder = DocumentBuilder::new(fonts);

        for page_index in 0..total_pages {
            if handle.is_cancelled() {
                return Err(TaskError::Cancelled.into());
            }

            let geometry = source.page_geometry(page_index)?;
            let images = page_images.get(page_index).map(Vec::as_slice).unwrap_or(&[]);

            let mut texts = Vec::new();
            for segment in segments.iter().filter(|s| s.page_index == page_index) {
                match scheduled.outcomes.get(&segment.key()) {
                    Some(outcome) => {
                        texts.push((segment.bbox, outcome.translated_text.clone()))
                    }
                    None => handle.log(
                        EventLogLevel::Error,
                        format!(
                            "Page {} block {} translation result missing",
                            page_index + 1,
                            segment.segment_index + 1
                        ),
                    ),
                }
            }

            let stats = builder.add_page(page_index, &geometry, images, &texts, handle);
            handle.log(
                EventLogLevel::Success,
                format!(
                    "Page {} done: {}/{} text blocks written",
                    page_index + 1,
                    stats.written,
                    stats.attempted
                ),
            );

            let elapsed = started.elapsed().as_secs_f64();
            handle.emit(Event::Progress {
                current: page_index + 1,
                total: total_pages,
                percentage: if total_pages > 0 {
                    ((page_index + 1) * 100 / total_pages) as u8
                } else {
                    0
                },
                message: format!("Wrote {}/{} pages", page_index + 1, total_pages),
                input_tokens: backend.usage_snapshot().input_tokens,
                output_tokens: backend.usage_snapshot().output_tokens,
                estimated_cost: backend.estimated_cost(),
                elapsed_secs: elapsed,
                estimated_remaining_secs: 0.0,
            });
        }

        handle.log(
            EventLogLevel::Success,
            format!("Wrote {} text blocks into the output PDF", builder.total_written()),
        );
        if builder.total_written() == 0 {
            handle.log(
                EventLogLevel::Error,
                "Warning: no text was written at all - check the log above",
            );
        }

        handle.log(EventLogLevel::Info, format!("Saving translated PDF to {:?}", output));
        builder.save(output)?;
        drop(source);

        match FileManager::file_size(output) {
            Ok(size) => handle.log(
                EventLogLevel::Success,
                format!("File saved: {}", FileManager::format_size(size)),
            ),
            Err(_) => handle.log(EventLogLevel::Error, "File save failed: output missing"),
        }

        let usage = backend.usage_snapshot();
        handle.log(EventLogLevel::Success, "========== Translation finished ==========");
        handle.log(EventLogLevel::Info, format!("Input tokens: {}", usage.input_tokens));
        handle.log(EventLogLevel::Info, format!("Output tokens: {}", usage.output_tokens));
        handle.log(
            EventLogLevel::Info,
            format!("Estimated cost: ${:.4} USD", backend.estimated_cost()),
        );

        Ok(())
    }

    /// Extract the document's text, translate it, and write a plain
    /// text artifact
    pub async fn translate_pdf_to_text(
        &self,
        input: &Path,
        output: &Path,
        request: &TranslateRequest,
        backend: &TranslationBackend,
        handle: &TaskHandle,
    ) -> Result<(), AppError> {
        let started = Instant::now();

        handle.log(EventLogLevel::Info, "========== Text translation task started ==========");
        handle.log(EventLogLevel::Info, format!("Input file: {:?}", input));
        handle.log(EventLogLevel::Info, format!("Output file: {:?}", output));
        handle.log(EventLogLevel::Info, format!("Source language: {}", request.source_lang));
        handle.log(EventLogLevel::Info, format!("Target language: {}", request.target_lang));

        handle.log(EventLogLevel::Info, "Extracting PDF text...");
        let source = SourceDocument::open(input)?;

        let mut page_texts = Vec::new();
        let mut total_chars = 0usize;
        for page_index in 0..source.page_count() {
            if handle.is_cancelled() {
                return Err(TaskError::Cancelled.into());
            }
            match pdf::page_plain_text(&source, page_index) {
                Ok(text) if !text.trim().is_empty() => {
                    total_chars += text.chars().count();
                    page_texts.push(text.trim().to_string());
                }
                Ok(_) => {}
                Err(e) => handle.log(
                    EventLogLevel::Warn,
                    format!("Skipping unreadable page {}: {}", page_index + 1, e),
                ),
            }
        }
        drop(source);

        handle.log(
            EventLogLevel::Info,
            format!(
                "Extracted {} pages of text, {} characters ({:.1}s)",
                page_texts.len(),
                total_chars,
                started.elapsed().as_secs_f64()
            ),
        );

        let full_text = page_texts.join("\n\n");
        let chunks = batch::chunk_by_chars(&full_text, TEXT_CHUNK_CHARS);
        handle.log(
            EventLogLevel::Info,
            format!(
                "Split into {} chunks of up to {} characters",
                chunks.len(),
                TEXT_CHUNK_CHARS
            ),
        );

        if handle.is_cancelled() {
            return Err(TaskError::Cancelled.into());
        }

        handle.log(EventLogLevel::Info, "Starting translation...");

        let results = batch::translate_texts(
            backend,
            &chunks,
            &request.source_lang,
            &request.target_lang,
            handle,
        )
        .await;

        if handle.is_cancelled() {
            return Err(TaskError::Cancelled.into());
        }
        handle.log(EventLogLevel::Success, "All text chunks translated");

        // Rejoin in input order regardless of completion order
        let translated: Vec<String> = results
            .into_iter()
            .zip(chunks.into_iter())
            .map(|(result, original)| result.unwrap_or(original))
            .collect();
        let translated_text = translated.join("\n\n");

        handle.log(EventLogLevel::Info, format!("Saving translated text to {:?}", output));
        FileManager::write_to_file(output, &translated_text)
            .map_err(|e| AppError::File(e.to_string()))?;

        let usage = backend.usage_snapshot();
        handle.log(EventLogLevel::Success, "Text translation finished");
        handle.log(
            EventLogLevel::Info,
            format!("Total time: {:.1}s", started.elapsed().as_secs_f64()),
        );
        handle.log(EventLogLevel::Info, format!("Input tokens: {}", usage.input_tokens));
        handle.log(EventLogLevel::Info, format!("Output tokens: {}", usage.output_tokens));
        handle.log(
            EventLogLevel::Info,
            format!("Estimated cost: ${:.4} USD", backend.estimated_cost()),
        );

        Ok(())
    }
}

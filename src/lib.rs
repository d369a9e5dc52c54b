/*!
 * # pdflingo
 *
 * A Rust library for translating PDF documents while preserving their
 * visual layout.
 *
 * ## Features
 *
 * - Extract positioned text segments and images from PDF pages
 * - Translate segments concurrently through pluggable providers:
 *   - Free bulk translation endpoint (no credential)
 *   - Chat-completion providers (DeepSeek, Zhipu, OpenRouter, Kimi, GPT)
 * - Rebuild the document with the original geometry, images, and
 *   bounding boxes, with a CJK-capable font fallback chain
 * - Live progress and log events over an ordered channel with
 *   heartbeat support, plus mid-flight cancellation
 * - Token and cost estimation per provider
 *
 * ## Architecture
 *
 * The library is organized in these main modules:
 * - `app_config`: Configuration management
 * - `pdf`: Document reading, extraction, and reconstruction:
 *   - `pdf::extract`: positioned text blocks, images, analysis
 *   - `pdf::rebuild`: output document builder
 *   - `pdf::fonts`: font fallback chain
 * - `translation`: concurrent translation pipeline:
 *   - `translation::backend`: provider selection and token accounting
 *   - `translation::scheduler`: bounded worker pool with retry and
 *     cancellation
 *   - `translation::batch`: wide fast path for raw string lists
 * - `providers`: client implementations for translation backends
 * - `events`: typed progress/event channel and SSE encoding
 * - `registry`: process-wide task registry
 * - `pricing`: token estimation and cost accounting
 * - `app_controller`: task lifecycle orchestration
 * - `language_utils`: ISO language code utilities and detection
 * - `file_utils`: output naming and file system helpers
 * - `errors`: custom error types for the application
 *
 * ## License
 *
 * This project is licensed under the MIT License
 */

// Global lints configuration
// These lints will be allowed but not auto-fixed
#![allow(clippy::uninlined_format_args)]
#![allow(clippy::redundant_closure_for_method_calls)]

// Public modules
pub mod app_config;
pub mod app_controller;
pub mod errors;
pub mod events;
pub mod file_utils;
pub mod language_utils;
pub mod pdf;
pub mod pricing;
pub mod providers;
pub mod registry;
pub mod translation;

// Re-export main types for easier usage
pub use app_config::{Config, TranslateRequest, TranslationProvider};
pub use app_controller::{Controller, OutputMode};
pub use errors::{AppError, PdfError, ProviderError, TaskError};
pub use events::{Event, EventLogLevel, EventStream, TaskHandle};
pub use registry::TaskRegistry;
pub use translation::{Segment, TranslationBackend, TranslationOutcome};

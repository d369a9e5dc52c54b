/*!
 * Concurrent translation pipeline.
 *
 * This module contains the translation core, split into several
 * submodules:
 *
 * - `backend`: provider selection and shared token accounting
 * - `clean`: Unicode scrubbing before provider submission
 * - `scheduler`: bounded worker pool over positioned segments with
 *   retry, cancellation, and progress emission
 * - `batch`: specialized wide fast path for raw string lists
 */

use crate::pdf::Rect;

// Re-export main types for easier usage
pub use self::backend::TranslationBackend;
pub use self::scheduler::{translate_segments, OutcomeMap, SchedulerOutput, TranslationOutcome};

// Submodules
pub mod backend;
pub mod batch;
pub mod clean;
pub mod scheduler;

/// A positioned unit of extractable text: one non-empty text block on
/// one page, with the bounding box its translation must be rendered
/// into. Immutable once extracted.
#[derive(Debug, Clone, PartialEq)]
pub struct Segment {
    /// Zero-based page index
    pub page_index: usize,

    /// Zero-based block index within the page
    pub segment_index: usize,

    /// Decoded text content
    pub text: String,

    /// Bounding box in PDF user space
    pub bbox: Rect,
}

impl Segment {
    /// Key into the outcome mapping
    pub fn key(&self) -> (usize, usize) {
        (self.page_index, self.segment_index)
    }
}

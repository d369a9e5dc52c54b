/*!
 * Error types for the pdflingo application.
 *
 * This module contains custom error types for different parts of the application,
 * using the thiserror crate for ergonomic error definitions.
 */

use thiserror::Error;

/// Errors that can occur when working with provider APIs
#[derive(Error, Debug)]
pub enum ProviderError {
    /// Error when making an API request fails
    #[error("API request failed: {0}")]
    RequestFailed(String),

    /// Error when parsing an API response fails
    #[error("Failed to parse API response: {0}")]
    ParseError(String),

    /// Error returned by the API itself
    #[error("API responded with error: {status_code} - {message}")]
    ApiError {
        /// HTTP status code
        status_code: u16,
        /// Error message from the API
        message: String,
    },

    /// Error with authentication
    #[error("Authentication error: {0}")]
    AuthenticationError(String),
}

impl ProviderError {
    /// Whether this error looks like a credential problem rather than a
    /// transient transport failure. Matches on the 401 status and the
    /// keyword heuristics the providers are known to return.
    pub fn is_auth_failure(&self) -> bool {
        match self {
            Self::AuthenticationError(_) => true,
            Self::ApiError { status_code: 401, .. } => true,
            Self::ApiError { message, .. }
            | Self::RequestFailed(message)
            | Self::ParseError(message) => {
                let lower = message.to_lowercase();
                lower.contains("401")
                    || lower.contains("auth")
                    || lower.contains("invalid")
                    || lower.contains("cookie")
            }
        }
    }
}

/// Errors that can occur while reading or writing PDF documents
#[derive(Error, Debug)]
pub enum PdfError {
    /// The source document could not be opened or parsed
    #[error("Failed to open PDF: {0}")]
    Open(String),

    /// A page object was missing or malformed
    #[error("Invalid page {page}: {message}")]
    Page {
        /// Zero-based page index
        page: usize,
        /// What was wrong with it
        message: String,
    },

    /// No candidate font could render the text
    #[error("No usable font for text insertion: {0}")]
    FontUnavailable(String),

    /// The text did not fit into its bounding box with the given font
    #[error("Text does not fit bounding box ({width:.1} x {height:.1})")]
    TextOverflow {
        /// Box width in points
        width: f32,
        /// Box height in points
        height: f32,
    },

    /// The output document could not be serialized
    #[error("Failed to save PDF: {0}")]
    Save(String),
}

/// Errors related to task lifecycle and the task registry
#[derive(Error, Debug)]
pub enum TaskError {
    /// The requested task id is not registered
    #[error("Task not found: {0}")]
    NotFound(String),

    /// The task was cancelled by an external request
    #[error("Translation cancelled by user")]
    Cancelled,
}

/// Main application error type that wraps all other errors
#[derive(Error, Debug)]
pub enum AppError {
    /// Error from a file operation
    #[error("File error: {0}")]
    File(String),

    /// Error from a provider
    #[error("Provider error: {0}")]
    Provider(#[from] ProviderError),

    /// Error from PDF processing
    #[error("PDF error: {0}")]
    Pdf(#[from] PdfError),

    /// Error from the task lifecycle
    #[error("Task error: {0}")]
    Task(#[from] TaskError),

    /// Any other error
    #[error("Unknown error: {0}")]
    Unknown(String),
}

impl AppError {
    /// Whether this error represents a cooperative cancellation rather
    /// than a genuine failure.
    pub fn is_cancellation(&self) -> bool {
        matches!(self, Self::Task(TaskError::Cancelled))
    }
}

// Utility functions for error conversion
impl From<anyhow::Error> for AppError {
    fn from(error: anyhow::Error) -> Self {
        Self::Unknown(error.to_string())
    }
}

impl From<std::io::Error> for AppError {
    fn from(error: std::io::Error) -> Self {
        Self::File(error.to_string())
    }
}

impl From<lopdf::Error> for PdfError {
    fn from(error: lopdf::Error) -> Self {
        Self::Open(error.to_string())
    }
}

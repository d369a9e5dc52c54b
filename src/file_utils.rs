use anyhow::{Context, Result};
use std::fs;
use std::path::{Path, PathBuf};

// @module: File and output-artifact utilities

// @struct: File operations utility
pub struct FileManager;

impl FileManager {
    // @checks: File existence
    pub fn file_exists<P: AsRef<Path>>(path: P) -> bool {
        path.as_ref().exists() && path.as_ref().is_file()
    }

    // @creates: Directory and parents if needed
    pub fn ensure_dir<P: AsRef<Path>>(path: P) -> Result<()> {
        let path = path.as_ref();
        if !path.exists() {
            fs::create_dir_all(path)?;
        }
        Ok(())
    }

    // @generates: Output filename for a translated artifact
    // The input stem is kept and prefixed so repeated runs are addressable
    // and the original is never overwritten.
    pub fn output_filename<P: AsRef<Path>>(input_file: P, extension: &str) -> String {
        let input_file = input_file.as_ref();
        let stem = input_file.file_stem().unwrap_or_default().to_string_lossy();
        format!("translated_{}.{}", stem, extension)
    }

    // @generates: Output path next to the requested directory
    pub fn output_path<P1: AsRef<Path>, P2: AsRef<Path>>(
        input_file: P1,
        output_dir: P2,
        extension: &str,
    ) -> PathBuf {
        output_dir.as_ref().join(Self::output_filename(input_file, extension))
    }

    /// Content type for download, decided by file extension
    pub fn content_type_for<P: AsRef<Path>>(path: P) -> &'static str {
        match path.as_ref().extension().and_then(|e| e.to_str()) {
            Some("txt") => "text/plain; charset=utf-8",
            _ => "application/pdf",
        }
    }

    /// File size in bytes
    pub fn file_size<P: AsRef<Path>>(path: P) -> Result<u64> {
        let metadata = fs::metadata(&path)
            .with_context(|| format!("Failed to stat file: {:?}", path.as_ref()))?;
        Ok(metadata.len())
    }

    /// Human-readable size, used in log lines
    pub fn format_size(bytes: u64) -> String {
        const MB: f64 = 1024.0 * 1024.0;
        const KB: f64 = 1024.0;
        let bytes = bytes as f64;
        if bytes >= MB {
            format!("{:.2} MB", bytes / MB)
        } else if bytes >= KB {
            format!("{:.2} KB", bytes / KB)
        } else {
            format!("{} B", bytes as u64)
        }
    }

    /// Read a file to a string
    pub fn read_to_string<P: AsRef<Path>>(path: P) -> Result<String> {
        fs::read_to_string(&path)
            .with_context(|| format!("Failed to read file: {:?}", path.as_ref()))
    }

    /// Write a string to a file
    pub fn write_to_file<P: AsRef<Path>>(path: P, content: &str) -> Result<()> {
        if let Some(parent) = path.as_ref().parent() {
            Self::ensure_dir(parent)?;
        }

        fs::write(&path, content)
            .with_context(|| format!("Failed to write to file: {:?}", path.as_ref()))?;

        Ok(())
    }
}

/*!
 * Common test utilities: in-memory sample documents and special-purpose
 * mock providers.
 */

use async_trait::async_trait;
use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Document, Object, Stream};
use std::sync::atomic::{AtomicUsize, Ordering};
use tempfile::NamedTempFile;

use pdflingo::errors::ProviderError;
use pdflingo::events::TaskHandle;
use pdflingo::providers::Provider;

/// Initialize logging for a test; respects RUST_LOG, safe to call from
/// every test
pub fn init_test_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// Build a simple PDF document with one Helvetica text block per page
pub fn sample_pdf(pages: &[&str]) -> Document {
    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();
    let font_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Helvetica",
        "Encoding" => "WinAnsiEncoding",
    });

    let mut kids: Vec<Object> = Vec::new();
    for text in pages {
        let content = Content {
            operations: vec![
                Operation::new("BT", vec![]),
                Operation::new("Tf", vec![Object::Name(b"F1".to_vec()), 12.into()]),
                Operation::new("Td", vec![72.into(), 700.into()]),
                Operation::new("Tj", vec![Object::string_literal(*text)]),
                Operation::new("ET", vec![]),
            ],
        };
        let content_id =
            doc.add_object(Stream::new(dictionary! {}, content.encode().unwrap()));
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "MediaBox" => vec![0.into(), 0.into(), 612.into(), 792.into()],
            "Contents" => content_id,
            "Resources" => dictionary! {
                "Font" => dictionary! { "F1" => font_id },
            },
        });
        kids.push(page_id.into());
    }

    let count = pages.len() as i64;
    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => kids,
            "Count" => count,
        }),
    );
    let catalog_id = doc.add_object(dictionary! { "Type" => "Catalog", "Pages" => pages_id });
    doc.trailer.set("Root", catalog_id);
    doc
}

/// Write a sample document to a temp file. The file lives as long as
/// the returned guard.
pub fn write_sample_pdf(pages: &[&str]) -> NamedTempFile {
    let mut doc = sample_pdf(pages);
    let file = NamedTempFile::new().expect("temp file");
    doc.save(file.path()).expect("save sample pdf");
    file
}

/// Provider that requests cancellation of its task during the nth call,
/// then finishes that call normally. Later dispatches observe the flag.
#[derive(Debug)]
pub struct CancelOnNth {
    handle: TaskHandle,
    nth: usize,
    count: AtomicUsize,
}

impl CancelOnNth {
    pub fn new(handle: TaskHandle, nth: usize) -> Self {
        Self { handle, nth, count: AtomicUsize::new(0) }
    }
}

#[async_trait]
impl Provider for CancelOnNth {
    fn name(&self) -> &str {
        "cancel-on-nth"
    }

    async fn translate(
        &self,
        text: &str,
        _source_lang: &str,
        _target_lang: &str,
    ) -> Result<String, ProviderError> {
        let call = self.count.fetch_add(1, Ordering::SeqCst) + 1;
        if call == self.nth {
            self.handle.request_cancel();
        }
        Ok(text.to_uppercase())
    }
}

/*!
 * Output document reconstruction.
 *
 * Builds the translated document page by page: identical geometry, an
 * opaque white background, every captured image re-drawn at its
 * original placement, and translated text inserted into the original
 * bounding boxes through the font fallback chain. A block that no
 * candidate font can place is logged as a page-level write failure and
 * skipped; a failed image is logged and skipped. Neither aborts the
 * page.
 */

use log::debug;
use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Dictionary, Document, Object, ObjectId};
use std::path::Path;

use crate::errors::PdfError;
use crate::events::{EventLogLevel, TaskHandle};
use crate::pdf::document::PageGeometry;
use crate::pdf::extract::PageImage;
use crate::pdf::fonts::PdfFont;
use crate::pdf::Rect;

/// Font size used for inserted text
pub const TEXT_SIZE: f32 = 11.0;

/// Per-page reconstruction counters
#[derive(Debug, Clone, Copy, Default)]
pub struct PageWriteStats {
    /// Text blocks attempted on this page
    pub attempted: usize,
    /// Text blocks successfully written
    pub written: usize,
}

/// Builder for the translated output document
pub struct DocumentBuilder {
    doc: Document,
    pages_id: ObjectId,
    page_ids: Vec<ObjectId>,
    fonts: Vec<PdfFont>,
    font_ids: Vec<ObjectId>,
    total_written: usize,
}

impl DocumentBuilder {
    /// Create a builder with the given font fallback chain. The chain
    /// must be non-empty; `pick_fonts` guarantees that.
    pub fn new(fonts: Vec<PdfFont>) -> Self {
        let mut doc = Document::with_version("1.5");
        let pages_id = doc.new_object_id();
        let font_ids = fonts.iter().map(|_| doc.new_object_id()).collect();

        Self { doc, pages_id, page_ids: Vec::new(), fonts, font_ids, total_written: 0 }
    }

    /// Total text blocks written so far across all pages
    pub fn total_written(&self) -> usize {
        self.total_written
    }

    /// Append one page: same geometry as the source page, white
    /// background, original images, translated text in the original
    /// boxes.
    pub fn add_page(
        &mut self,
        page_index: usize,
        geometry: &PageGeometry,
        images: &[PageImage],
        texts: &[(Rect, String)],
        handle: &TaskHandle,
    ) -> PageWriteStats {
        let mut operations = Vec::new();
        let mut xobjects = Dictionary::new();

        // Opaque background so no source content shows through
        operations.push(Operation::new("rg", vec![1.into(), 1.into(), 1.into()]));
        operations.push(Operation::new(
            "re",
            vec![
                0.into(),
                0.into(),
                Object::Real(geometry.width),
                Object::Real(geometry.height),
            ],
        ));
        operations.push(Operation::new("f", vec![]));

        for (image_index, image) in images.iter().enumerate() {
            if image.rect.width() <= 0.0 || image.rect.height() <= 0.0 {
                debug!(
                    "Skipping degenerate image {} on page {}",
                    image_index,
                    page_index + 1
                );
                continue;
            }

            let image_id = self.doc.add_object(Object::Stream(image.stream.clone()));
            let name = format!("Im{}", image_index);
            xobjects.set(name.as_bytes().to_vec(), image_id);

            operations.push(Operation::new("q", vec![]));
            operations.push(Operation::new(
                "cm",
                vec![
                    Object::Real(image.rect.width()),
                    Object::Real(0.0),
                    Object::Real(0.0),
                    Object::Real(image.rect.height()),
                    Object::Real(image.rect.x0),
                    Object::Real(image.rect.y0),
                ],
            ));
            operations.push(Operation::new("Do", vec![Object::Name(name.into_bytes())]));
            operations.push(Operation::new("Q", vec![]));
        }

        // Text in black
        operations.push(Operation::new("rg", vec![0.into(), 0.into(), 0.into()]));

        let mut stats = PageWriteStats { attempted: texts.len(), written: 0 };
        for (block_index, (rect, text)) in texts.iter().enumerate() {
            match self.insert_textbox(rect, text) {
                Ok(mut text_ops) => {
                    operations.append(&mut text_ops);
                    stats.written += 1;
                    self.total_written += 1;
                }
                Err(e) => {
                    handle.log(
                        EventLogLevel::Warn,
                        format!(
                            "Page {} block {} write failure: {}",
                            page_index + 1,
                            block_index + 1,
                            e
                        ),
                    );
                }
            }
        }

        self.finish_page(geometry, operations, xobjects);
        stats
    }

    /// Try the fallback chain until one font places the whole block
    fn insert_textbox(&self, rect: &Rect, text: &str) -> Result<Vec<Operation>, PdfError> {
        let mut last_error =
            PdfError::FontUnavailable("empty font fallback chain".to_string());

        for (font_index, font) in self.fonts.iter().enumerate() {
            match layout_textbox(font, font_index, rect, text) {
                Ok(ops) => return Ok(ops),
                Err(e) => {
                    debug!("Font {} rejected block: {}", font.name(), e);
                    last_error = e;
                }
            }
        }

        Err(last_error)
    }

    fn finish_page(
        &mut self,
        geometry: &PageGeometry,
        operations: Vec<Operation>,
        xobjects: Dictionary,
    ) {
        let content = Content { operations };
        let encoded = content.encode().unwrap_or_default();
        let content_id = self.doc.add_object(lopdf::Stream::new(dictionary! {}, encoded));

        let mut font_dict = Dictionary::new();
        for (index, font_id) in self.font_ids.iter().enumerate() {
            font_dict.set(format!("F{}", index).into_bytes(), *font_id);
        }

        let mut resources = dictionary! { "Font" => font_dict };
        if !xobjects.is_empty() {
            resources.set("XObject", xobjects);
        }

        let page_id = self.doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => self.pages_id,
            "MediaBox" => vec![0.into(), 0.into(), Object::Real(geometry.width), Object::Real(geometry.height)],
            "Rotate" => geometry.rotation,
            "Contents" => content_id,
            "Resources" => resources,
        });
        self.page_ids.push(page_id);
    }

    /// Finalize and serialize the document
    pub fn save<P: AsRef<Path>>(mut self, path: P) -> Result<(), PdfError> {
        for (font, font_id) in self.fonts.iter().zip(self.font_ids.iter()) {
            font.register(&mut self.doc, *font_id);
        }

        let kids: Vec<Object> = self.page_ids.iter().map(|id| (*id).into()).collect();
        let count = self.page_ids.len() as i64;
        self.doc.objects.insert(
            self.pages_id,
            Object::Dictionary(dictionary! {
                "Type" => "Pages",
                "Kids" => kids,
                "Count" => count,
            }),
        );

        let catalog_id = self.doc.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => self.pages_id,
        });
        self.doc.trailer.set("Root", catalog_id);
        self.doc.compress();

        self.doc
            .save(path.as_ref())
            .map_err(|e| PdfError::Save(format!("{:?}: {}", path.as_ref(), e)))?;
        Ok(())
    }
}

/// Wrap the text into the box width, honoring hard newlines, breaking
/// at spaces where possible and anywhere otherwise (CJK has no spaces).
fn wrap_lines(
    font: &PdfFont,
    text: &str,
    size: f32,
    max_width: f32,
) -> Result<Vec<String>, PdfError> {
    let widths = font.try_layout(text, size)?;

    let mut lines = Vec::new();
    let mut current = String::new();
    let mut current_width = 0.0f32;
    let mut last_space: Option<(usize, f32)> = None; // byte offset, width before space

    for (c, w) in widths {
        if c == '\n' {
            lines.push(std::mem::take(&mut current).trim_end().to_string());
            current_width = 0.0;
            last_space = None;
            continue;
        }

        if current_width + w > max_width && !current.is_empty() {
            match last_space {
                Some((offset, _)) if offset > 0 => {
                    let rest = current.split_off(offset);
                    lines.push(current.trim_end().to_string());
                    current = rest.trim_start().to_string();
                    current_width = font
                        .try_layout(&current, size)?
                        .iter()
                        .map(|(_, w)| w)
                        .sum();
                }
                _ => {
                    lines.push(std::mem::take(&mut current));
                    current_width = 0.0;
                }
            }
            last_space = None;
        }

        if c == ' ' {
            last_space = Some((current.len(), current_width));
        }
        current.push(c);
        current_width += w;
    }

    if !current.trim().is_empty() {
        lines.push(current.trim_end().to_string());
    }

    Ok(lines)
}

/// Produce the operations for one text block, or fail if this font
/// cannot encode it or the wrapped text exceeds the box height.
fn layout_textbox(
    font: &PdfFont,
    font_index: usize,
    rect: &Rect,
    text: &str,
) -> Result<Vec<Operation>, PdfError> {
    let lines = wrap_lines(font, text, TEXT_SIZE, rect.width().max(1.0))?;
    if lines.is_empty() {
        return Ok(Vec::new());
    }

    let line_height = font.line_height(TEXT_SIZE);
    let needed = (lines.len() - 1) as f32 * line_height + TEXT_SIZE;
    if needed > rect.height() + 0.6 {
        return Err(PdfError::TextOverflow { width: rect.width(), height: rect.height() });
    }

    let mut operations = Vec::with_capacity(lines.len() * 3 + 2);
    operations.push(Operation::new("BT", vec![]));
    operations.push(Operation::new(
        "Tf",
        vec![Object::Name(format!("F{}", font_index).into_bytes()), Object::Real(TEXT_SIZE)],
    ));

    let mut baseline = rect.y1 - 0.85 * TEXT_SIZE;
    for line in &lines {
        operations.push(Operation::new(
            "Tm",
            vec![
                1.into(),
                0.into(),
                0.into(),
                1.into(),
                Object::Real(rect.x0),
                Object::Real(baseline),
            ],
        ));
        operations.push(Operation::new("Tj", vec![font.encode_line(line)]));
        baseline -= line_height;
    }

    operations.push(Operation::new("ET", vec![]));
    Ok(operations)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wrap_short_line_stays_single() {
        let font = PdfFont::builtin();
        let lines = wrap_lines(&font, "short text", TEXT_SIZE, 500.0).unwrap();
        assert_eq!(lines, vec!["short text"]);
    }

    #[test]
    fn test_wrap_breaks_at_spaces() {
        let font = PdfFont::builtin();
        // 0.5 em per char at size 11 -> 5.5 pt per char; 60 pt fits ~10 chars
        let lines = wrap_lines(&font, "alpha beta gamma", TEXT_SIZE, 60.0).unwrap();
        assert!(lines.len() >= 2);
        assert!(lines.iter().all(|l| !l.starts_with(' ')));
    }

    #[test]
    fn test_wrap_honors_hard_newlines() {
        let font = PdfFont::builtin();
        let lines = wrap_lines(&font, "one\ntwo", TEXT_SIZE, 500.0).unwrap();
        assert_eq!(lines, vec!["one", "two"]);
    }

    #[test]
    fn test_single_line_fits_box_of_its_own_height() {
        let font = PdfFont::builtin();
        let rect = Rect::new(0.0, 0.0, 300.0, 12.0);
        let result = layout_textbox(&font, 0, &rect, "fits fine");
        assert!(result.is_ok());
    }

    #[test]
    fn test_overflowing_text_is_rejected() {
        let font = PdfFont::builtin();
        let rect = Rect::new(0.0, 0.0, 40.0, 12.0);
        let long = "a long sentence that cannot possibly fit in one short line".to_string();
        let result = layout_textbox(&font, 0, &rect, &long);
        assert!(matches!(result, Err(PdfError::TextOverflow { .. })));
    }

    #[test]
    fn test_non_latin_text_rejected_by_builtin_font() {
        let font = PdfFont::builtin();
        let rect = Rect::new(0.0, 0.0, 300.0, 50.0);
        let result = layout_textbox(&font, 0, &rect, "中文文本");
        assert!(matches!(result, Err(PdfError::FontUnavailable(_))));
    }
}

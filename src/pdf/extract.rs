/*!
 * Positioned text and image extraction.
 *
 * Walks each page's content stream tracking the graphics and text
 * state. Text-showing operations become spans, spans are grouped into
 * lines and blocks in (top, left) reading order, and image XObject
 * invocations are captured with their placement rectangle. Extraction
 * problems on a single block or image are logged and skipped; they
 * never abort the page.
 */

use log::{debug, warn};
use lopdf::content::Content;
use lopdf::{Dictionary, Document, Object, ObjectId};
use std::collections::BTreeMap;

use crate::errors::PdfError;
use crate::language_utils::{self, DetectedLanguage};
use crate::pdf::document::{number, SourceDocument};
use crate::pdf::Rect;
use crate::pricing;
use crate::translation::Segment;

/// One positioned text block on a page
#[derive(Debug, Clone, PartialEq)]
pub struct TextBlock {
    /// Decoded text, lines joined with newlines
    pub text: String,
    /// Bounding box in PDF user space
    pub bbox: Rect,
}

/// One captured image with its placement rectangle
#[derive(Debug, Clone)]
pub struct PageImage {
    /// Copy of the image XObject stream, dictionary sanitized so it can
    /// be inserted into a fresh document
    pub stream: lopdf::Stream,
    /// Placement rectangle (unit square under the CTM at `Do` time)
    pub rect: Rect,
}

/// Pre-flight analysis of a document
#[derive(Debug, Clone)]
pub struct PdfAnalysis {
    /// Number of pages
    pub total_pages: usize,
    /// Characters of extracted text (trimmed)
    pub char_count: usize,
    /// Whitespace-separated words
    pub word_count: usize,
    /// Heuristically detected dominant language
    pub detected: DetectedLanguage,
    /// Estimated token count of the full text
    pub total_tokens: u64,
    /// Projected translation duration in minutes (floor of one)
    pub estimated_minutes: f64,
}

impl PdfAnalysis {
    /// Human-readable projected duration
    pub fn estimated_time_display(&self) -> String {
        let minutes = self.estimated_minutes;
        if minutes < 60.0 {
            format!("{} min", minutes.ceil() as u64)
        } else {
            let hours = (minutes / 60.0).floor() as u64;
            let rest = (minutes % 60.0).round() as u64;
            format!("{} h {} min", hours, rest)
        }
    }
}

/// 2D affine matrix [a b c d e f], row-vector convention
type Matrix = [f32; 6];

const IDENTITY: Matrix = [1.0, 0.0, 0.0, 1.0, 0.0, 0.0];

fn multiply(m1: Matrix, m2: Matrix) -> Matrix {
    [
        m1[0] * m2[0] + m1[1] * m2[2],
        m1[0] * m2[1] + m1[1] * m2[3],
        m1[2] * m2[0] + m1[3] * m2[2],
        m1[2] * m2[1] + m1[3] * m2[3],
        m1[4] * m2[0] + m1[5] * m2[2] + m2[4],
        m1[4] * m2[1] + m1[5] * m2[3] + m2[5],
    ]
}

fn translation(tx: f32, ty: f32) -> Matrix {
    [1.0, 0.0, 0.0, 1.0, tx, ty]
}

fn apply(m: Matrix, x: f32, y: f32) -> (f32, f32) {
    (m[0] * x + m[2] * y + m[4], m[1] * x + m[3] * y + m[5])
}

/// One decoded text-showing operation in user space
#[derive(Debug, Clone)]
struct TextSpan {
    text: String,
    /// Baseline start in user space
    x: f32,
    y: f32,
    /// Baseline end x in user space
    end_x: f32,
    /// Effective (device) font size
    size: f32,
}

impl TextSpan {
    fn bbox(&self) -> Rect {
        Rect::new(self.x, self.y - 0.2 * self.size, self.end_x, self.y + 0.8 * self.size)
    }
}

struct Interpreter<'a> {
    doc: &'a Document,
    fonts: BTreeMap<Vec<u8>, &'a Dictionary>,
    xobjects: Option<Dictionary>,
    ctm_stack: Vec<Matrix>,
    ctm: Matrix,
    tm: Matrix,
    tlm: Matrix,
    font_key: Option<Vec<u8>>,
    font_size: f32,
    leading: f32,
    char_spacing: f32,
    word_spacing: f32,
    spans: Vec<TextSpan>,
    images: Vec<PageImage>,
}

impl<'a> Interpreter<'a> {
    fn new(
        doc: &'a Document,
        fonts: BTreeMap<Vec<u8>, &'a Dictionary>,
        xobjects: Option<Dictionary>,
    ) -> Self {
        Self {
            doc,
            fonts,
            xobjects,
            ctm_stack: Vec::new(),
            ctm: IDENTITY,
            tm: IDENTITY,
            tlm: IDENTITY,
            font_key: None,
            font_size: 0.0,
            leading: 0.0,
            char_spacing: 0.0,
            word_spacing: 0.0,
            spans: Vec::new(),
            images: Vec::new(),
        }
    }

    fn run(&mut self, content: &Content) {
        for operation in &content.operations {
            let operands = &operation.operands;
            match operation.operator.as_str() {
                "q" => self.ctm_stack.push(self.ctm),
                "Q" => {
                    if let Some(saved) = self.ctm_stack.pop() {
                        self.ctm = saved;
                    }
                }
                "cm" => {
                    if let Some(m) = operand_matrix(operands) {
                        self.ctm = multiply(m, self.ctm);
                    }
                }
                "BT" => {
                    self.tm = IDENTITY;
                    self.tlm = IDENTITY;
                }
                "ET" => {}
                "Tf" => {
                    if let (Some(Object::Name(name)), Some(size)) =
                        (operands.first(), operands.get(1).and_then(number))
                    {
                        self.font_key = Some(name.clone());
                        self.font_size = size;
                    }
                }
                "TL" => {
                    if let Some(value) = operands.first().and_then(number) {
                        self.leading = value;
                    }
                }
                "Tc" => {
                    if let Some(value) = operands.first().and_then(number) {
                        self.char_spacing = value;
                    }
                }
                "Tw" => {
                    if let Some(value) = operands.first().and_then(number) {
                        self.word_spacing = value;
                    }
                }
                "Td" => {
                    if let (Some(tx), Some(ty)) =
                        (operands.first().and_then(number), operands.get(1).and_then(number))
                    {
                        self.text_move(tx, ty);
                    }
                }
                "TD" => {
                    if let (Some(tx), Some(ty)) =
                        (operands.first().and_then(number), operands.get(1).and_then(number))
                    {
                        self.leading = -ty;
                        self.text_move(tx, ty);
                    }
                }
                "Tm" => {
                    if let Some(m) = operand_matrix(operands) {
                        self.tm = m;
                        self.tlm = m;
                    }
                }
                "T*" => self.next_line(),
                "Tj" => {
                    if let Some(Object::String(bytes, _)) = operands.first() {
                        self.show_text(bytes);
                    }
                }
                "'" => {
                    self.next_line();
                    if let Some(Object::String(bytes, _)) = operands.first() {
                        self.show_text(bytes);
                    }
                }
                "\"" => {
                    if let (Some(aw), Some(ac)) =
                        (operands.first().and_then(number), operands.get(1).and_then(number))
                    {
                        self.word_spacing = aw;
                        self.char_spacing = ac;
                    }
                    self.next_line();
                    if let Some(Object::String(bytes, _)) = operands.get(2) {
                        self.show_text(bytes);
                    }
                }
                "TJ" => {
                    if let Some(Object::Array(items)) = operands.first() {
                        for item in items {
                            match item {
                                Object::String(bytes, _) => self.show_text(bytes),
                                other => {
                                    // Negative adjustments large enough to
                                    // read as a gap become a space
                                    if let Some(adjust) = number(other) {
                                        self.advance(-adjust / 1000.0 * self.font_size);
                                        if adjust < -180.0 {
                                            if let Some(last) = self.spans.last_mut() {
                                                if !last.text.ends_with(' ') {
                                                    last.text.push(' ');
                                                }
                                            }
                                        }
                                    }
                                }
                            }
                        }
                    }
                }
                "Do" => {
                    if let Some(Object::Name(name)) = operands.first() {
                        self.capture_image(name.clone());
                    }
                }
                _ => {}
            }
        }
    }

    fn text_move(&mut self, tx: f32, ty: f32) {
        self.tlm = multiply(translation(tx, ty), self.tlm);
        self.tm = self.tlm;
    }

    fn next_line(&mut self) {
        let leading = self.leading;
        self.text_move(0.0, -leading);
    }

    fn advance(&mut self, text_space_dx: f32) {
        self.tm = multiply(translation(text_space_dx, 0.0), self.tm);
    }

    fn effective_size(&self, combined: Matrix) -> f32 {
        // Magnitude of the transformed vertical unit vector
        (combined[2] * combined[2] + combined[3] * combined[3]).sqrt() * self.font_size
    }

    fn show_text(&mut self, bytes: &[u8]) {
        let decoded = self.decode(bytes);
        if decoded.is_empty() {
            return;
        }

        let combined = multiply(self.tm, self.ctm);
        let (x, y) = apply(combined, 0.0, 0.0);

        // Advance estimate in text space: half an em for narrow glyphs,
        // a full em for CJK, plus the spacing parameters
        let mut width = 0.0f32;
        for c in decoded.chars() {
            let glyph = if pricing::is_cjk(c) { 1.0 } else { 0.5 };
            width += glyph * self.font_size + self.char_spacing;
            if c == ' ' {
                width += self.word_spacing;
            }
        }

        let (end_x, _) = apply(combined, width, 0.0);
        let size = self.effective_size(combined);

        self.spans.push(TextSpan { text: decoded, x, y, end_x, size });
        self.advance(width);
    }

    fn decode(&self, bytes: &[u8]) -> String {
        let encoding = self
            .font_key
            .as_ref()
            .and_then(|key| self.fonts.get(key))
            .map(|font| font.get_font_encoding());

        Document::decode_text(encoding, bytes)
    }

    fn capture_image(&mut self, name: Vec<u8>) {
        let Some(xobjects) = &self.xobjects else { return };

        let stream = match xobjects.get(&name) {
            Ok(Object::Reference(id)) => match self.doc.get_object(*id).and_then(|o| o.as_stream())
            {
                Ok(stream) => stream.clone(),
                Err(e) => {
                    debug!("Unresolvable XObject {:?}: {}", String::from_utf8_lossy(&name), e);
                    return;
                }
            },
            Ok(Object::Stream(stream)) => stream.clone(),
            _ => return,
        };

        let is_image = stream
            .dict
            .get(b"Subtype")
            .and_then(|o| o.as_name())
            .map(|n| n == b"Image")
            .unwrap_or(false);
        if !is_image {
            return;
        }

        let corners = [
            apply(self.ctm, 0.0, 0.0),
            apply(self.ctm, 1.0, 0.0),
            apply(self.ctm, 0.0, 1.0),
            apply(self.ctm, 1.0, 1.0),
        ];
        let xs: Vec<f32> = corners.iter().map(|(x, _)| *x).collect();
        let ys: Vec<f32> = corners.iter().map(|(_, y)| *y).collect();
        let rect = Rect::new(
            xs.iter().cloned().fold(f32::INFINITY, f32::min),
            ys.iter().cloned().fold(f32::INFINITY, f32::min),
            xs.iter().cloned().fold(f32::NEG_INFINITY, f32::max),
            ys.iter().cloned().fold(f32::NEG_INFINITY, f32::max),
        );

        let stream = self.sanitize_image(stream);
        self.images.push(PageImage { stream, rect });
    }

    /// Make the image stream self-contained so it survives insertion
    /// into a fresh document: inline simple referenced entries, drop
    /// the ones that cannot be carried over.
    fn sanitize_image(&self, mut stream: lopdf::Stream) -> lopdf::Stream {
        if let Ok(Object::Reference(id)) = stream.dict.get(b"ColorSpace") {
            let resolved = self.doc.get_object(*id).ok().cloned();
            match resolved {
                Some(Object::Name(name)) => {
                    stream.dict.set("ColorSpace", Object::Name(name));
                }
                _ => {
                    // ICC profiles and indexed palettes would dangle;
                    // approximate with a device space
                    stream.dict.set("ColorSpace", Object::Name(b"DeviceRGB".to_vec()));
                }
            }
        }
        if let Ok(Object::Reference(_)) = stream.dict.get(b"SMask") {
            debug!("Dropping referenced SMask from copied image");
            stream.dict.remove(b"SMask");
        }
        stream
    }
}

fn operand_matrix(operands: &[Object]) -> Option<Matrix> {
    if operands.len() != 6 {
        return None;
    }
    let mut m = [0f32; 6];
    for (slot, operand) in m.iter_mut().zip(operands.iter()) {
        *slot = number(operand)?;
    }
    Some(m)
}

/// Run the interpreter over one page and return raw spans and images
fn interpret_page(
    source: &SourceDocument,
    page_index: usize,
) -> Result<(Vec<TextSpan>, Vec<PageImage>), PdfError> {
    let page_id = source.page_id(page_index)?;
    let doc = source.raw();

    let data = doc.get_page_content(page_id).map_err(|e| PdfError::Page {
        page: page_index,
        message: format!("unreadable content stream: {}", e),
    })?;
    let content = Content::decode(&data).map_err(|e| PdfError::Page {
        page: page_index,
        message: format!("undecodable content stream: {}", e),
    })?;

    let fonts = doc.get_page_fonts(page_id);
    let xobjects = page_xobjects(doc, page_id);

    let mut interpreter = Interpreter::new(doc, fonts, xobjects);
    interpreter.run(&content);

    Ok((interpreter.spans, interpreter.images))
}

fn page_xobjects(doc: &Document, page_id: ObjectId) -> Option<Dictionary> {
    let (resources, resource_ids) = doc.get_page_resources(page_id);

    let resources: Option<Dictionary> = match resources {
        Some(dict) => Some(dict.clone()),
        None => resource_ids
            .first()
            .and_then(|id| doc.get_object(*id).ok())
            .and_then(|obj| obj.as_dict().ok())
            .cloned(),
    };

    let resources = resources?;
    let xobject = match resources.get(b"XObject") {
        Ok(Object::Reference(id)) => doc.get_object(*id).ok()?.as_dict().ok()?.clone(),
        Ok(Object::Dictionary(dict)) => dict.clone(),
        _ => return None,
    };
    Some(xobject)
}

/// Group raw spans into lines, lines into blocks, blocks into reading
/// order
fn group_blocks(mut spans: Vec<TextSpan>) -> Vec<TextBlock> {
    if spans.is_empty() {
        return Vec::new();
    }

    // Lines: spans sharing a baseline, left to right
    spans.sort_by(|a, b| {
        b.y.partial_cmp(&a.y)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then(a.x.partial_cmp(&b.x).unwrap_or(std::cmp::Ordering::Equal))
    });

    struct Line {
        text: String,
        bbox: Rect,
        baseline: f32,
        size: f32,
        end_x: f32,
    }

    let mut lines: Vec<Line> = Vec::new();
    for span in spans {
        let tolerance = 0.3 * span.size.max(1.0);
        let joined = lines.last_mut().filter(|line| (line.baseline - span.y).abs() <= tolerance);

        match joined {
            Some(line) => {
                let gap = span.x - line.end_x;
                if gap > 0.25 * span.size && !line.text.ends_with(' ') {
                    line.text.push(' ');
                }
                line.text.push_str(&span.text);
                line.bbox = line.bbox.union(&span.bbox());
                line.end_x = line.end_x.max(span.end_x);
                line.size = line.size.max(span.size);
            }
            None => {
                let bbox = span.bbox();
                lines.push(Line {
                    text: span.text.clone(),
                    bbox,
                    baseline: span.y,
                    size: span.size,
                    end_x: span.end_x,
                });
            }
        }
    }

    // Blocks: vertically adjacent lines
    let mut blocks: Vec<TextBlock> = Vec::new();
    let mut current: Option<(TextBlock, f32, f32)> = None; // block, last baseline, last size

    for line in lines {
        match current.take() {
            Some((mut block, last_baseline, last_size)) => {
                let gap = last_baseline - line.baseline;
                if gap <= 1.7 * last_size.max(line.size) {
                    block.text.push('\n');
                    block.text.push_str(&line.text);
                    block.bbox = block.bbox.union(&line.bbox);
                    current = Some((block, line.baseline, line.size));
                } else {
                    blocks.push(block);
                    current = Some((
                        TextBlock { text: line.text, bbox: line.bbox },
                        line.baseline,
                        line.size,
                    ));
                }
            }
            None => {
                current = Some((
                    TextBlock { text: line.text, bbox: line.bbox },
                    line.baseline,
                    line.size,
                ));
            }
        }
    }
    if let Some((block, _, _)) = current {
        blocks.push(block);
    }

    // Reading order: top-down, then left-right
    blocks.sort_by(|a, b| {
        b.bbox
            .y1
            .partial_cmp(&a.bbox.y1)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then(a.bbox.x0.partial_cmp(&b.bbox.x0).unwrap_or(std::cmp::Ordering::Equal))
    });

    blocks
}

/// Extract the positioned text blocks and images of one page
pub fn extract_page(
    source: &SourceDocument,
    page_index: usize,
) -> Result<(Vec<TextBlock>, Vec<PageImage>), PdfError> {
    let (spans, images) = interpret_page(source, page_index)?;
    Ok((group_blocks(spans), images))
}

/// Extract every page's segments and images.
///
/// Segments skip empty and whitespace-only blocks. Order is page-major
/// reading order; irrelevant to correctness but kept for deterministic
/// logging. A page that fails to parse contributes nothing and is
/// logged, matching the skip-don't-abort policy.
pub fn extract_segments(
    source: &SourceDocument,
) -> Result<(Vec<Segment>, Vec<Vec<PageImage>>), PdfError> {
    let mut segments = Vec::new();
    let mut images_per_page = Vec::with_capacity(source.page_count());

    for page_index in 0..source.page_count() {
        match extract_page(source, page_index) {
            Ok((blocks, images)) => {
                for (segment_index, block) in blocks.into_iter().enumerate() {
                    if block.text.trim().is_empty() {
                        continue;
                    }
                    segments.push(Segment {
                        page_index,
                        segment_index,
                        text: block.text,
                        bbox: block.bbox,
                    });
                }
                images_per_page.push(images);
            }
            Err(e) => {
                warn!("Skipping unreadable page {}: {}", page_index + 1, e);
                images_per_page.push(Vec::new());
            }
        }
    }

    Ok((segments, images_per_page))
}

/// Full plain text of one page, blocks separated by newlines
pub fn page_plain_text(source: &SourceDocument, page_index: usize) -> Result<String, PdfError> {
    let (blocks, _) = extract_page(source, page_index)?;
    Ok(blocks.into_iter().map(|b| b.text).collect::<Vec<_>>().join("\n"))
}

/// Pre-flight analysis: counts, dominant language, token estimate, and
/// a projected duration at a conservative pages-per-minute rate.
pub fn analyze(source: &SourceDocument) -> PdfAnalysis {
    let mut all_text = String::new();
    for page_index in 0..source.page_count() {
        match page_plain_text(source, page_index) {
            Ok(text) => {
                all_text.push_str(&text);
                all_text.push(' ');
            }
            Err(e) => debug!("Analysis skipping page {}: {}", page_index + 1, e),
        }
    }

    let total_pages = source.page_count();
    PdfAnalysis {
        total_pages,
        char_count: all_text.trim().chars().count(),
        word_count: all_text.split_whitespace().count(),
        detected: language_utils::detect_dominant_language(&all_text),
        total_tokens: pricing::estimate_tokens(&all_text),
        estimated_minutes: (total_pages as f64 / 30.0).max(1.0),
    }
}

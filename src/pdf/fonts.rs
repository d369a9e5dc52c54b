/*!
 * Font candidates for output text.
 *
 * The reconstructor works through an ordered fallback chain: file-based
 * TrueType/OpenType candidates first (the CJK-capable one leading),
 * then the builtin Helvetica, which only covers WinAnsi-encodable text.
 * Embedded fonts go into the output as CIDFontType2 with Identity-H
 * encoding, text encoded as big-endian glyph ids; glyph advances are
 * collected while encoding so the W array can be written at save time.
 */

use log::{debug, warn};
use lopdf::{dictionary, Document, Object, ObjectId, Stream, StringFormat};
use parking_lot::Mutex;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use crate::errors::PdfError;

/// Line spacing factor applied on top of the font size
pub const LINE_SPACING: f32 = 1.2;

struct EmbeddedFont {
    data: Vec<u8>,
    face_index: u32,
    ps_name: String,
    units_per_em: f32,
    ascent: f32,
    descent: f32,
    cap_height: f32,
    bbox: [f32; 4],
    /// Glyph id to advance (font units), filled while encoding
    used: Mutex<BTreeMap<u16, u16>>,
}

enum FontKind {
    Builtin { base: &'static str },
    Embedded(Box<EmbeddedFont>),
}

/// One font in the fallback chain
pub struct PdfFont {
    kind: FontKind,
}

impl PdfFont {
    /// Load a file-based candidate. Collections use their first face.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, PdfError> {
        let path = path.as_ref();
        let data = std::fs::read(path)
            .map_err(|e| PdfError::FontUnavailable(format!("{:?}: {}", path, e)))?;

        let face_index = 0u32;
        let face = ttf_parser::Face::parse(&data, face_index)
            .map_err(|e| PdfError::FontUnavailable(format!("{:?}: {}", path, e)))?;

        let units_per_em = face.units_per_em() as f32;
        let scale = 1000.0 / units_per_em;
        let ps_name = face
            .names()
            .into_iter()
            .find(|name| name.name_id == ttf_parser::name_id::POST_SCRIPT_NAME)
            .and_then(|name| name.to_string())
            .unwrap_or_else(|| {
                path.file_stem().map(|s| s.to_string_lossy().to_string()).unwrap_or_default()
            });

        let global_bbox = face.global_bounding_box();
        let embedded = EmbeddedFont {
            ascent: face.ascender() as f32 * scale,
            descent: face.descender() as f32 * scale,
            cap_height: face.capital_height().unwrap_or(face.ascender()) as f32 * scale,
            bbox: [
                global_bbox.x_min as f32 * scale,
                global_bbox.y_min as f32 * scale,
                global_bbox.x_max as f32 * scale,
                global_bbox.y_max as f32 * scale,
            ],
            units_per_em,
            ps_name,
            face_index,
            data,
            used: Mutex::new(BTreeMap::new()),
        };

        Ok(Self { kind: FontKind::Embedded(Box::new(embedded)) })
    }

    /// The builtin terminal fallback
    pub fn builtin() -> Self {
        Self { kind: FontKind::Builtin { base: "Helvetica" } }
    }

    /// Identifier for log lines
    pub fn name(&self) -> String {
        match &self.kind {
            FontKind::Builtin { base } => (*base).to_string(),
            FontKind::Embedded(font) => font.ps_name.clone(),
        }
    }

    /// Whether output strings use 2-byte glyph ids
    pub fn is_multibyte(&self) -> bool {
        matches!(self.kind, FontKind::Embedded(_))
    }

    /// Line height for a font size
    pub fn line_height(&self, size: f32) -> f32 {
        size * LINE_SPACING
    }

    /// Per-character advance widths in points. Fails when any character
    /// has no glyph in this font, which triggers fallthrough to the
    /// next candidate.
    pub fn try_layout(&self, text: &str, size: f32) -> Result<Vec<(char, f32)>, PdfError> {
        match &self.kind {
            FontKind::Builtin { .. } => {
                let mut widths = Vec::with_capacity(text.chars().count());
                for c in text.chars() {
                    if c != '\n' && !is_winansi(c) {
                        return Err(PdfError::FontUnavailable(format!(
                            "Helvetica cannot encode {:?}",
                            c
                        )));
                    }
                    widths.push((c, 0.5 * size));
                }
                Ok(widths)
            }
            FontKind::Embedded(font) => {
                let face = ttf_parser::Face::parse(&font.data, font.face_index)
                    .map_err(|e| PdfError::FontUnavailable(e.to_string()))?;

                let mut widths = Vec::with_capacity(text.chars().count());
                for c in text.chars() {
                    if c == '\n' {
                        widths.push((c, 0.0));
                        continue;
                    }
                    let glyph = face.glyph_index(c).ok_or_else(|| {
                        PdfError::FontUnavailable(format!(
                            "{} has no glyph for {:?}",
                            font.ps_name, c
                        ))
                    })?;
                    let advance = face.glyph_hor_advance(glyph).unwrap_or(0) as f32;
                    widths.push((c, advance / font.units_per_em * size));
                }
                Ok(widths)
            }
        }
    }

    /// Encode a line for a Tj operand, recording glyph usage for the
    /// eventual W array
    pub fn encode_line(&self, text: &str) -> Object {
        match &self.kind {
            FontKind::Builtin { .. } => {
                let bytes: Vec<u8> =
                    text.chars().map(|c| if (c as u32) <= 0xff { c as u32 as u8 } else { b'?' }).collect();
                Object::String(bytes, StringFormat::Literal)
            }
            FontKind::Embedded(font) => {
                let mut bytes = Vec::with_capacity(text.len() * 2);
                if let Ok(face) = ttf_parser::Face::parse(&font.data, font.face_index) {
                    let mut used = font.used.lock();
                    for c in text.chars() {
                        let glyph = face.glyph_index(c).map(|g| g.0).unwrap_or(0);
                        let advance = face
                            .glyph_index(c)
                            .and_then(|g| face.glyph_hor_advance(g))
                            .unwrap_or(0);
                        used.entry(glyph).or_insert(advance);
                        bytes.extend_from_slice(&glyph.to_be_bytes());
                    }
                }
                Object::String(bytes, StringFormat::Hexadecimal)
            }
        }
    }

    /// Write this font's object graph into the output document at the
    /// reserved id
    pub fn register(&self, doc: &mut Document, font_id: ObjectId) {
        match &self.kind {
            FontKind::Builtin { base } => {
                doc.objects.insert(
                    font_id,
                    Object::Dictionary(dictionary! {
                        "Type" => "Font",
                        "Subtype" => "Type1",
                        "BaseFont" => *base,
                        "Encoding" => "WinAnsiEncoding",
                    }),
                );
            }
            FontKind::Embedded(font) => {
                let file_id = doc.add_object(Stream::new(
                    dictionary! { "Length1" => font.data.len() as i64 },
                    font.data.clone(),
                ));

                let descriptor_id = doc.add_object(dictionary! {
                    "Type" => "FontDescriptor",
                    "FontName" => font.ps_name.as_str(),
                    "Flags" => 4,
                    "FontBBox" => font.bbox.iter().map(|v| (*v as i64).into()).collect::<Vec<Object>>(),
                    "ItalicAngle" => 0,
                    "Ascent" => font.ascent as i64,
                    "Descent" => font.descent as i64,
                    "CapHeight" => font.cap_height as i64,
                    "StemV" => 80,
                    "FontFile2" => file_id,
                });

                let scale = 1000.0 / font.units_per_em;
                let mut widths: Vec<Object> = Vec::new();
                for (glyph, advance) in font.used.lock().iter() {
                    widths.push((*glyph as i64).into());
                    widths.push(Object::Array(vec![((*advance as f32 * scale) as i64).into()]));
                }

                let descendant_id = doc.add_object(dictionary! {
                    "Type" => "Font",
                    "Subtype" => "CIDFontType2",
                    "BaseFont" => font.ps_name.as_str(),
                    "CIDSystemInfo" => dictionary! {
                        "Registry" => Object::string_literal("Adobe"),
                        "Ordering" => Object::string_literal("Identity"),
                        "Supplement" => 0,
                    },
                    "FontDescriptor" => descriptor_id,
                    "DW" => 1000,
                    "W" => widths,
                    "CIDToGIDMap" => "Identity",
                });

                doc.objects.insert(
                    font_id,
                    Object::Dictionary(dictionary! {
                        "Type" => "Font",
                        "Subtype" => "Type0",
                        "BaseFont" => font.ps_name.as_str(),
                        "Encoding" => "Identity-H",
                        "DescendantFonts" => vec![descendant_id.into()],
                    }),
                );
            }
        }
    }
}

/// Approximate WinAnsi coverage: ASCII plus Latin-1
fn is_winansi(c: char) -> bool {
    let code = c as u32;
    code == 0x09 || code == 0x0a || code == 0x0d || (0x20..=0xff).contains(&code)
}

/// Build the fallback chain from the configured candidates. Unloadable
/// candidates are logged and skipped; the builtin terminal fallback is
/// always appended, so the chain is never empty.
pub fn pick_fonts(candidates: &[PathBuf]) -> Vec<PdfFont> {
    let mut fonts = Vec::new();

    for candidate in candidates {
        match PdfFont::load(candidate) {
            Ok(font) => {
                debug!("Loaded font candidate {:?} as {}", candidate, font.name());
                fonts.push(font);
            }
            Err(e) => {
                if candidate.exists() {
                    warn!("Unusable font candidate {:?}: {}", candidate, e);
                } else {
                    debug!("Font candidate {:?} not present", candidate);
                }
            }
        }
    }

    fonts.push(PdfFont::builtin());
    fonts
}

use lopdf::{Dictionary, Document, Object, ObjectId};
use std::path::Path;

use crate::errors::PdfError;

/// Geometry of one page as needed for reconstruction
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PageGeometry {
    /// Page width in points
    pub width: f32,
    /// Page height in points
    pub height: f32,
    /// Page rotation in degrees (0, 90, 180, 270)
    pub rotation: i64,
}

/// Read-side handle over a source PDF document
pub struct SourceDocument {
    doc: Document,
    pages: Vec<ObjectId>,
}

impl SourceDocument {
    /// Open and parse a PDF file
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, PdfError> {
        let doc = Document::load(path.as_ref())
            .map_err(|e| PdfError::Open(format!("{:?}: {}", path.as_ref(), e)))?;
        let pages = doc.get_pages().into_values().collect();
        Ok(Self { doc, pages })
    }

    /// Wrap an already-parsed document (used by tests)
    pub fn from_document(doc: Document) -> Self {
        let pages = doc.get_pages().into_values().collect();
        Self { doc, pages }
    }

    /// Number of pages
    pub fn page_count(&self) -> usize {
        self.pages.len()
    }

    /// Object id of a page by zero-based index
    pub fn page_id(&self, index: usize) -> Result<ObjectId, PdfError> {
        self.pages.get(index).copied().ok_or_else(|| PdfError::Page {
            page: index,
            message: "page index out of range".to_string(),
        })
    }

    /// Width, height, and rotation of a page. MediaBox and Rotate may be
    /// inherited from an ancestor Pages node.
    pub fn page_geometry(&self, index: usize) -> Result<PageGeometry, PdfError> {
        let page_id = self.page_id(index)?;

        let media_box = self
            .inherited_entry(page_id, b"MediaBox")
            .and_then(|obj| self.as_rect_array(&obj))
            .ok_or_else(|| PdfError::Page {
                page: index,
                message: "missing or malformed MediaBox".to_string(),
            })?;

        let rotation = self
            .inherited_entry(page_id, b"Rotate")
            .and_then(|obj| obj.as_i64().ok())
            .unwrap_or(0);

        Ok(PageGeometry {
            width: media_box[2] - media_box[0],
            height: media_box[3] - media_box[1],
            rotation,
        })
    }

    /// Access to the underlying lopdf document for content extraction
    pub(crate) fn raw(&self) -> &Document {
        &self.doc
    }

    /// Resolve a reference chain down to a concrete object
    pub(crate) fn resolve<'a>(&'a self, object: &'a Object) -> &'a Object {
        let mut current = object;
        // Bounded walk; reference cycles in broken files must not hang us
        for _ in 0..16 {
            match current {
                Object::Reference(id) => match self.doc.get_object(*id) {
                    Ok(next) => current = next,
                    Err(_) => return current,
                },
                other => return other,
            }
        }
        current
    }

    /// Look up a page-tree entry on the page itself or any ancestor
    fn inherited_entry(&self, page_id: ObjectId, key: &[u8]) -> Option<Object> {
        let mut dict_id = page_id;
        for _ in 0..32 {
            let dict: &Dictionary = self.doc.get_object(dict_id).ok()?.as_dict().ok()?;
            if let Ok(value) = dict.get(key) {
                return Some(self.resolve(value).clone());
            }
            match dict.get(b"Parent") {
                Ok(Object::Reference(parent)) => dict_id = *parent,
                _ => return None,
            }
        }
        None
    }

    fn as_rect_array(&self, object: &Object) -> Option<[f32; 4]> {
        let array = object.as_array().ok()?;
        if array.len() != 4 {
            return None;
        }
        let mut values = [0f32; 4];
        for (slot, item) in values.iter_mut().zip(array.iter()) {
            *slot = number(self.resolve(item))?;
        }
        Some(values)
    }
}

/// Numeric value of an Integer or Real object
pub(crate) fn number(object: &Object) -> Option<f32> {
    match object {
        Object::Integer(value) => Some(*value as f32),
        Object::Real(value) => Some(*value),
        _ => None,
    }
}

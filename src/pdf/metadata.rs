//! PDF metadata extraction

use std::collections::HashSet;
use std::path::Path;

use lopdf::{Dictionary, Document, Object, ObjectId};

use crate::error::{Error, Result};

/// US Letter in points, used when a page declares no MediaBox anywhere in its tree
const DEFAULT_MEDIA_BOX: [f32; 4] = [0.0, 0.0, 612.0, 792.0];

/// Count pages by reading the Count field from the Pages dictionary
/// This is more reliable than get_pages() which doesn't handle nested page trees
pub fn count_pages_from_catalog(doc: &Document) -> Result<usize> {
    let catalog_id = doc
        .trailer
        .get(b"Root")
        .and_then(Object::as_reference)
        .map_err(|_| Error::General("No Root reference in trailer".to_string()))?;

    let catalog = doc
        .get_object(catalog_id)?
        .as_dict()
        .map_err(|_| Error::General("Catalog is not a dictionary".to_string()))?;

    let pages_id = catalog
        .get(b"Pages")
        .and_then(Object::as_reference)
        .map_err(|_| Error::General("No Pages reference in catalog".to_string()))?;

    let pages_dict = doc
        .get_object(pages_id)?
        .as_dict()
        .map_err(|_| Error::General("Pages is not a dictionary".to_string()))?;

    match pages_dict.get(b"Count") {
        Ok(Object::Integer(n)) if *n >= 0 => Ok(*n as usize),
        Ok(_) => Err(Error::General("Count is not a page count".to_string())),
        Err(_) => Err(Error::General("No Count in Pages".to_string())),
    }
}

/// PDF metadata
#[derive(Debug, Clone)]
pub struct PdfMetadata {
    /// Number of pages in the PDF
    pub page_count: usize,
    /// Document title (if present)
    pub title: Option<String>,
    /// Document author (if present)
    pub author: Option<String>,
}

/// Extract metadata from a PDF file
pub fn extract_metadata(path: &Path) -> Result<PdfMetadata> {
    if !path.exists() {
        return Err(Error::FileNotFound(path.to_path_buf()));
    }

    let doc = Document::load(path)?;
    let page_count = count_pages_from_catalog(&doc)?;

    if page_count == 0 {
        return Err(Error::InvalidDocument(format!("{} has no pages", path.display())));
    }

    let info = doc
        .trailer
        .get(b"Info")
        .and_then(Object::as_reference)
        .and_then(|id| doc.get_object(id))
        .and_then(Object::as_dict)
        .ok();

    Ok(PdfMetadata {
        page_count,
        title: info.and_then(|dict| info_string(dict, b"Title")),
        author: info.and_then(|dict| info_string(dict, b"Author")),
    })
}

fn info_string(info: &Dictionary, key: &[u8]) -> Option<String> {
    let bytes = info.get(key).and_then(Object::as_str).ok()?;
    String::from_utf8(bytes.to_vec()).ok()
}

/// Count the number of pages in a PDF file
///
/// This is a quick operation that reads the Count field from the Pages dictionary.
pub fn count_pages(path: &Path) -> Result<usize> {
    if !path.exists() {
        return Err(Error::FileNotFound(path.to_path_buf()));
    }

    let doc = Document::load(path)?;
    let page_count = count_pages_from_catalog(&doc)?;

    if page_count == 0 {
        return Err(Error::InvalidDocument(format!("{} has no pages", path.display())));
    }

    Ok(page_count)
}

/// MediaBox of a page as `[x0, y0, x1, y1]`, following page tree inheritance
pub fn page_media_box(doc: &Document, page_id: ObjectId) -> Result<[f32; 4]> {
    match inherited_attribute(doc, page_id, b"MediaBox")? {
        Some(Object::Array(values)) => parse_rectangle(doc, values),
        Some(_) => Err(Error::General("MediaBox is not an array".to_string())),
        None => Ok(DEFAULT_MEDIA_BOX),
    }
}

/// Page rotation in degrees, normalized to `0`, `90`, `180` or `270`
pub fn page_rotation(doc: &Document, page_id: ObjectId) -> Result<i64> {
    match inherited_attribute(doc, page_id, b"Rotate")? {
        Some(Object::Integer(degrees)) => Ok(degrees.rem_euclid(360) / 90 * 90),
        Some(_) => Err(Error::General("Rotate is not an integer".to_string())),
        None => Ok(0),
    }
}

/// Value of an inheritable page attribute, with references resolved
fn inherited_attribute<'a>(
    doc: &'a Document,
    page_id: ObjectId,
    key: &[u8],
) -> Result<Option<&'a Object>> {
    let mut node_id = Some(page_id);
    let mut visited = HashSet::new();

    while let Some(id) = node_id {
        if !visited.insert(id) {
            break;
        }
        let node = doc.get_object(id)?.as_dict()?;
        if let Ok(value) = node.get(key) {
            let (_, value) = doc.dereference(value)?;
            return Ok(Some(value));
        }
        node_id = node.get(b"Parent").and_then(Object::as_reference).ok();
    }

    Ok(None)
}

fn parse_rectangle(doc: &Document, values: &[Object]) -> Result<[f32; 4]> {
    if values.len() != 4 {
        return Err(Error::General(format!(
            "MediaBox has {} entries, expected 4",
            values.len()
        )));
    }
    let mut rect = [0.0f32; 4];
    for (slot, value) in rect.iter_mut().zip(values) {
        *slot = match doc.dereference(value)?.1 {
            Object::Integer(n) => *n as f32,
            Object::Real(r) => *r as f32,
            _ => return Err(Error::General("MediaBox entry is not a number".to_string())),
        };
    }
    Ok(rect)
}

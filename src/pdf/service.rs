//! lopdf-backed document service

use lopdf::{Document, ObjectId};
use tracing::debug;

use super::merge::compose_documents;
use super::metadata::{page_media_box, page_rotation};
use super::{DocumentService, PageSource, Viewport};
use crate::error::{Error, Result};

/// Document service for real PDF files
#[derive(Debug, Clone, Copy, Default)]
pub struct LopdfService;

impl DocumentService for LopdfService {
    type Document = Document;

    fn load(&self, bytes: &[u8]) -> Result<Document> {
        let doc = Document::load_mem(bytes).map_err(|e| Error::Parse(e.to_string()))?;
        debug!(bytes = bytes.len(), pages = doc.get_pages().len(), "document loaded");
        Ok(doc)
    }

    fn page_count(&self, document: &Document) -> usize {
        document.get_pages().len()
    }

    fn render_viewport(&self, document: &Document, page_index: usize, scale: f32) -> Result<Viewport> {
        let pages = document.get_pages();
        let page_id = *pages.values().nth(page_index).ok_or(Error::OutOfRange {
            position: page_index,
            len: pages.len(),
        })?;
        viewport_of(document, page_id, scale)
    }

    fn render_viewports(&self, document: &Document, pages: &[usize], scale: f32) -> Result<Vec<Viewport>> {
        let page_ids: Vec<ObjectId> = document.get_pages().into_values().collect();
        pages
            .iter()
            .map(|&index| {
                let page_id = *page_ids.get(index).ok_or(Error::OutOfRange {
                    position: index,
                    len: page_ids.len(),
                })?;
                viewport_of(document, page_id, scale)
            })
            .collect()
    }

    fn compose(&self, sources: &[PageSource<'_, Document>]) -> Result<Document> {
        compose_documents(sources)
    }

    fn serialize(&self, document: &Document) -> Result<Vec<u8>> {
        let mut doc = document.clone();
        doc.compress();
        let mut bytes = Vec::new();
        doc.save_to(&mut bytes)?;
        Ok(bytes)
    }
}

/// Scaled page box as displayed, with quarter-turn rotations applied
fn viewport_of(document: &Document, page_id: ObjectId, scale: f32) -> Result<Viewport> {
    let [x0, y0, x1, y1] = page_media_box(document, page_id)?;
    let (width, height) = ((x1 - x0).abs() * scale, (y1 - y0).abs() * scale);
    Ok(match page_rotation(document, page_id)? {
        90 | 270 => Viewport { width: height, height: width },
        _ => Viewport { width, height },
    })
}

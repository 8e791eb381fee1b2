//! PDF manipulation module
//!
//! [`DocumentService`] is the seam between the reorder core and whatever
//! actually parses and writes documents. [`LopdfService`] is the default.

pub mod merge;
pub mod metadata;
pub mod service;

use crate::error::Result;

// Re-export commonly used items
pub use merge::compose_documents;
pub use metadata::{count_pages, extract_metadata, PdfMetadata};
pub use service::LopdfService;

/// Pages to take, in order, from one source document
#[derive(Debug)]
pub struct PageSource<'a, D> {
    pub document: &'a D,
    /// 0-based page indices
    pub pages: Vec<usize>,
}

impl<'a, D> PageSource<'a, D> {
    /// Every page of `document`, in document order
    pub fn all(document: &'a D, page_count: usize) -> Self {
        Self {
            document,
            pages: (0..page_count).collect(),
        }
    }
}

/// Size of a rendered page in pixels at a given scale
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Viewport {
    pub width: f32,
    pub height: f32,
}

/// Loads, composes and serializes documents
pub trait DocumentService {
    type Document;

    /// Parse a document. Malformed input is [`Error::Parse`](crate::Error::Parse).
    fn load(&self, bytes: &[u8]) -> Result<Self::Document>;

    fn page_count(&self, document: &Self::Document) -> usize;

    /// Geometry of page `page_index` rendered at `scale`
    fn render_viewport(
        &self,
        document: &Self::Document,
        page_index: usize,
        scale: f32,
    ) -> Result<Viewport>;

    /// Geometry of several pages at once, in the order given
    fn render_viewports(
        &self,
        document: &Self::Document,
        pages: &[usize],
        scale: f32,
    ) -> Result<Vec<Viewport>> {
        pages
            .iter()
            .map(|&page| self.render_viewport(document, page, scale))
            .collect()
    }

    /// Build a new document from pages drawn, in order, from the sources
    fn compose(&self, sources: &[PageSource<'_, Self::Document>]) -> Result<Self::Document>;

    fn serialize(&self, document: &Self::Document) -> Result<Vec<u8>>;
}

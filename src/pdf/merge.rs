//! PDF composition using lopdf

use std::collections::{BTreeMap, HashSet};

use lopdf::{Dictionary, Document, Object, ObjectId};

use super::PageSource;
use crate::error::{Error, Result};

/// Page attributes a page may inherit from its ancestors in the page tree
const INHERITABLE: [&[u8]; 4] = [b"Resources", b"MediaBox", b"CropBox", b"Rotate"];

/// Compose a new document from selected pages of one or more documents
///
/// Based on the lopdf merge example:
/// https://github.com/J-F-Liu/lopdf/blob/main/examples/merge.rs
///
/// Pages are taken in the order given, source by source. Objects no longer
/// reachable from the new catalog (unselected pages, old page trees) are
/// dropped and the remaining objects renumbered.
///
/// # Example
///
/// ```no_run
/// use lopdf::Document;
/// use pdf_reorder::pdf::{compose_documents, PageSource};
///
/// let doc = Document::load("input.pdf").unwrap();
/// // Reverse a three page document
/// let reversed = compose_documents(&[PageSource { document: &doc, pages: vec![2, 1, 0] }])
///     .expect("Failed to compose");
/// ```
pub fn compose_documents(sources: &[PageSource<'_, Document>]) -> Result<Document> {
    if sources.is_empty() {
        return Err(Error::PageSelection("no source documents".to_string()));
    }

    // Define a starting max_id for the composed document
    let mut max_id = 1;
    let mut page_ids: Vec<ObjectId> = Vec::new();
    let mut objects: BTreeMap<ObjectId, Object> = BTreeMap::new();

    for (source_index, source) in sources.iter().enumerate() {
        let mut doc = source.document.clone();

        // Renumber objects in this document to avoid conflicts
        doc.renumber_objects_with(max_id);
        max_id = doc.max_id + 1;

        let available: Vec<ObjectId> = doc.get_pages().into_values().collect();
        let mut seen = HashSet::new();
        for &index in &source.pages {
            let page_id = *available.get(index).ok_or_else(|| {
                Error::PageSelection(format!(
                    "page {index} requested from source {source_index}, which has {} pages",
                    available.len()
                ))
            })?;
            if !seen.insert(index) {
                return Err(Error::PageSelection(format!(
                    "page {index} requested twice from source {source_index}"
                )));
            }
            // The page leaves its old tree, so it must carry what it inherited
            inherit_page_attributes(&mut doc, page_id)?;
            page_ids.push(page_id);
        }

        objects.extend(doc.objects);
    }

    if page_ids.is_empty() {
        return Err(Error::PageSelection("no pages selected".to_string()));
    }

    let mut composed = Document::with_version("1.5");

    // Add all collected objects FIRST
    composed.objects.extend(objects);

    // new_object_id() must hand out IDs above everything just added
    composed.max_id = max_id - 1;

    let pages_id = composed.new_object_id();

    let kids: Vec<Object> = page_ids.iter().map(|&id| Object::Reference(id)).collect();

    let mut pages_object = Dictionary::new();
    pages_object.set("Type", Object::Name(b"Pages".to_vec()));
    pages_object.set("Count", Object::Integer(page_ids.len() as i64));
    pages_object.set("Kids", Object::Array(kids));

    let catalog_id = composed.new_object_id();
    let mut catalog = Dictionary::new();
    catalog.set("Type", Object::Name(b"Catalog".to_vec()));
    catalog.set("Pages", Object::Reference(pages_id));

    composed.objects.insert(catalog_id, Object::Dictionary(catalog));
    composed.objects.insert(pages_id, Object::Dictionary(pages_object));
    composed.trailer.set("Root", Object::Reference(catalog_id));

    for &page_id in &page_ids {
        if let Ok(Object::Dictionary(dict)) = composed.get_object_mut(page_id) {
            dict.set("Parent", Object::Reference(pages_id));
        }
    }

    composed.prune_objects();
    composed.renumber_objects();

    Ok(composed)
}

/// Copy inherited page attributes from the page's ancestors onto the page itself
fn inherit_page_attributes(doc: &mut Document, page_id: ObjectId) -> Result<()> {
    let mut inherited: Vec<(&[u8], Object)> = Vec::new();
    {
        let page = doc.get_object(page_id)?.as_dict()?;
        let mut missing: Vec<&[u8]> = INHERITABLE
            .iter()
            .copied()
            .filter(|key| !page.has(key))
            .collect();

        let mut parent = page.get(b"Parent").and_then(Object::as_reference).ok();
        let mut visited = HashSet::new();
        while let Some(parent_id) = parent {
            if missing.is_empty() || !visited.insert(parent_id) {
                break;
            }
            let Ok(node) = doc.get_object(parent_id).and_then(Object::as_dict) else {
                break;
            };
            missing.retain(|key| match node.get(key) {
                Ok(value) => {
                    inherited.push((*key, value.clone()));
                    false
                }
                Err(_) => true,
            });
            parent = node.get(b"Parent").and_then(Object::as_reference).ok();
        }
    }

    if inherited.is_empty() {
        return Ok(());
    }
    if let Object::Dictionary(page) = doc.get_object_mut(page_id)? {
        for (key, value) in inherited {
            page.set(key.to_vec(), value);
        }
    }
    Ok(())
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use lopdf::Stream;

    /// Build a document whose pages carry a `Tag` entry naming them.
    ///
    /// The MediaBox lives on the page tree root so composition has to copy it down.
    pub(crate) fn tagged_document(prefix: &str, pages: usize) -> Document {
        let mut doc = Document::with_version("1.5");
        let pages_id = doc.new_object_id();
        let mut kids = Vec::new();
        for i in 0..pages {
            let content_id = doc.add_object(Stream::new(
                Dictionary::new(),
                format!("BT /F1 12 Tf 72 720 Td ({prefix}-{i}) Tj ET").into_bytes(),
            ));
            let mut page = Dictionary::new();
            page.set("Type", Object::Name(b"Page".to_vec()));
            page.set("Parent", Object::Reference(pages_id));
            page.set("Contents", Object::Reference(content_id));
            page.set("Tag", Object::string_literal(format!("{prefix}-{i}")));
            kids.push(Object::Reference(doc.add_object(page)));
        }
        let mut tree = Dictionary::new();
        tree.set("Type", Object::Name(b"Pages".to_vec()));
        tree.set("Count", Object::Integer(pages as i64));
        tree.set("Kids", Object::Array(kids));
        tree.set(
            "MediaBox",
            Object::Array(vec![
                Object::Integer(0),
                Object::Integer(0),
                Object::Integer(612),
                Object::Integer(792),
            ]),
        );
        doc.objects.insert(pages_id, Object::Dictionary(tree));

        let mut catalog = Dictionary::new();
        catalog.set("Type", Object::Name(b"Catalog".to_vec()));
        catalog.set("Pages", Object::Reference(pages_id));
        let catalog_id = doc.add_object(catalog);
        doc.trailer.set("Root", Object::Reference(catalog_id));
        doc
    }

    pub(crate) fn page_tags(doc: &Document) -> Vec<String> {
        doc.get_pages()
            .values()
            .map(|&id| {
                let page = doc.get_object(id).unwrap().as_dict().unwrap();
                String::from_utf8(page.get(b"Tag").unwrap().as_str().unwrap().to_vec()).unwrap()
            })
            .collect()
    }

    #[test]
    fn test_compose_reorders_single_source() {
        let doc = tagged_document("a", 3);
        let composed = compose_documents(&[PageSource { document: &doc, pages: vec![2, 0, 1] }]).unwrap();
        assert_eq!(page_tags(&composed), vec!["a-2", "a-0", "a-1"]);
    }

    #[test]
    fn test_compose_merges_sources_in_order() {
        let first = tagged_document("a", 2);
        let second = tagged_document("b", 3);
        let composed = compose_documents(&[
            PageSource::all(&first, 2),
            PageSource { document: &second, pages: vec![1] },
        ])
        .unwrap();
        assert_eq!(page_tags(&composed), vec!["a-0", "a-1", "b-1"]);
    }

    #[test]
    fn test_compose_copies_inherited_media_box() {
        let doc = tagged_document("a", 2);
        let composed = compose_documents(&[PageSource::all(&doc, 2)]).unwrap();
        for id in composed.get_pages().into_values() {
            let page = composed.get_object(id).unwrap().as_dict().unwrap();
            assert!(page.has(b"MediaBox"));
        }
    }

    #[test]
    fn test_compose_drops_unselected_pages() {
        let doc = tagged_document("a", 4);
        let composed = compose_documents(&[PageSource { document: &doc, pages: vec![3] }]).unwrap();
        assert_eq!(composed.get_pages().len(), 1);
        let tags: usize = composed
            .objects
            .values()
            .filter(|obj| obj.as_dict().map(|d| d.has(b"Tag")).unwrap_or(false))
            .count();
        assert_eq!(tags, 1);
    }

    #[test]
    fn test_compose_rejects_bad_selection() {
        let doc = tagged_document("a", 2);
        assert!(matches!(
            compose_documents(&[PageSource { document: &doc, pages: vec![0, 2] }]),
            Err(Error::PageSelection(_))
        ));
        assert!(matches!(
            compose_documents(&[PageSource { document: &doc, pages: vec![1, 1] }]),
            Err(Error::PageSelection(_))
        ));
        assert!(matches!(compose_documents(&[]), Err(Error::PageSelection(_))));
        assert!(matches!(
            compose_documents(&[PageSource { document: &doc, pages: vec![] }]),
            Err(Error::PageSelection(_))
        ));
    }
}

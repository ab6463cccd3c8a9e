//! PDF page-set operations: subset, merge, split.
//!
//! These work directly on the lopdf object graph: pages to keep are
//! collected as object ids, a fresh Pages node adopts them in the requested
//! order, the catalog is re-rooted, and everything unreachable is pruned.
//! Inheritable page attributes (Resources, MediaBox, ...) are materialized
//! onto each page before reparenting, since the old parent chain goes away.

use std::collections::BTreeMap;
use std::path::Path;

use lopdf::{dictionary, Document, Object, ObjectId};

use morphd_core::{Error, Result};

use super::range::parse_page_range;

/// Page-tree attributes a page may inherit from its ancestors.
const INHERITED_PAGE_KEYS: &[&[u8]] = &[b"Resources", b"MediaBox", b"CropBox", b"Rotate"];

/// Load a PDF document from disk.
pub fn load_document(path: &Path) -> Result<Document> {
    Document::load(path)
        .map_err(|e| Error::document(format!("{} is not a valid PDF: {e}", path.display())))
}

/// Compress and write a document to disk.
pub fn save_document(doc: &mut Document, path: &Path) -> Result<()> {
    doc.compress();
    doc.save(path)
        .map_err(|e| Error::document(format!("failed to write {}: {e}", path.display())))?;
    Ok(())
}

/// Number of pages in a document.
pub fn page_count(doc: &Document) -> u32 {
    doc.get_pages().len() as u32
}

/// Copy the given 1-based pages, in the order given, into a new document.
///
/// An empty page list copies all pages in original order. Page numbers out
/// of range fail with a document error; callers normally clamp via
/// [`parse_page_range`] first, so this is a defensive check.
pub fn subset(source: &Document, pages: &[u32]) -> Result<Document> {
    let mut doc = source.clone();
    let page_map = doc.get_pages();
    if page_map.is_empty() {
        return Err(Error::document("document has no pages"));
    }

    let order: Vec<u32> = if pages.is_empty() {
        page_map.keys().copied().collect()
    } else {
        pages.to_vec()
    };

    let mut kids = Vec::with_capacity(order.len());
    for &number in &order {
        let id = page_map.get(&number).ok_or_else(|| {
            Error::document(format!(
                "page {number} out of range (document has {} pages)",
                page_map.len()
            ))
        })?;
        kids.push(*id);
    }

    rebuild_page_tree(&mut doc, &kids)?;
    Ok(doc)
}

/// Concatenate the pages of each input document, in input order, preserving
/// each document's internal page order.
pub fn merge(sources: &[Document]) -> Result<Document> {
    if sources.is_empty() {
        return Err(Error::document("no documents to merge"));
    }

    let mut merged = Document::with_version("1.5");
    let mut kids: Vec<ObjectId> = Vec::new();
    let mut offset = 1u32;

    for source in sources {
        let mut doc = source.clone();
        doc.renumber_objects_with(offset);
        offset = doc.max_id + 1;

        let page_map = doc.get_pages();
        if page_map.is_empty() {
            return Err(Error::document("cannot merge: an input document has no pages"));
        }
        // BTreeMap is keyed by page number, so values come out in page order.
        kids.extend(page_map.into_values());
        merged.objects.append(&mut doc.objects);
    }

    merged.max_id = offset - 1;
    rebuild_page_tree(&mut merged, &kids)?;
    Ok(merged)
}

/// Resolve each range spec against the source's page count and produce one
/// subset document per non-empty resolution. Specs resolving to no pages
/// are skipped; output order matches the order of non-skipped specs.
pub fn split(source: &Document, range_specs: &[String]) -> Result<Vec<Document>> {
    let total = page_count(source);
    let mut parts = Vec::new();

    for spec in range_specs {
        let pages = parse_page_range(spec, Some(total));
        if pages.is_empty() {
            tracing::debug!("Range {:?} selects no pages of {} total, skipping", spec, total);
            continue;
        }
        parts.push(subset(source, &pages)?);
    }

    Ok(parts)
}

/// Point the document at a fresh page tree containing exactly `kids`, in
/// order. Old Pages/Catalog nodes become unreachable and are pruned.
fn rebuild_page_tree(doc: &mut Document, kids: &[ObjectId]) -> Result<()> {
    // Collect inherited attributes each kept page is missing, walking the
    // old parent chain before it is rewritten.
    let mut inherited: BTreeMap<ObjectId, Vec<(Vec<u8>, Object)>> = BTreeMap::new();
    for &kid in kids {
        if inherited.contains_key(&kid) {
            continue;
        }
        let page = doc
            .get_object(kid)
            .and_then(Object::as_dict)
            .map_err(|e| Error::document(format!("invalid page object: {e}")))?;

        let mut missing: Vec<Vec<u8>> = INHERITED_PAGE_KEYS
            .iter()
            .filter(|key| !page.has(key))
            .map(|key| key.to_vec())
            .collect();

        let mut found: Vec<(Vec<u8>, Object)> = Vec::new();
        let mut parent = page.get(b"Parent").ok().cloned();
        while let Some(Object::Reference(parent_id)) = parent {
            if missing.is_empty() {
                break;
            }
            let Ok(node) = doc.get_object(parent_id).and_then(Object::as_dict) else {
                break;
            };
            missing.retain(|key| {
                if let Ok(value) = node.get(key) {
                    found.push((key.clone(), value.clone()));
                    false
                } else {
                    true
                }
            });
            parent = node.get(b"Parent").ok().cloned();
        }

        inherited.insert(kid, found);
    }

    let pages_id = doc.new_object_id();

    for (&kid, attrs) in &inherited {
        let page = doc
            .get_object_mut(kid)
            .and_then(Object::as_dict_mut)
            .map_err(|e| Error::document(format!("invalid page object: {e}")))?;
        for (key, value) in attrs {
            page.set(key.clone(), value.clone());
        }
        page.set("Parent", Object::Reference(pages_id));
    }

    let pages_dict = dictionary! {
        "Type" => "Pages",
        "Count" => kids.len() as i64,
        "Kids" => kids.iter().map(|&id| Object::Reference(id)).collect::<Vec<_>>(),
    };
    doc.objects.insert(pages_id, Object::Dictionary(pages_dict));

    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);
    doc.trailer.remove(b"Encrypt");

    doc.prune_objects();
    doc.renumber_objects();
    Ok(())
}

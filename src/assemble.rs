use std::path::Path;

use anyhow::{anyhow, bail, Context, Result};
use log::{debug, info};
use lopdf::{Bookmark, Document, Object, ObjectId};

use crate::is_permutation;
use crate::toc::TableOfContents;

/// Page attributes a page may inherit from its ancestors in the page tree.
const INHERITABLE: [&[u8]; 4] = [b"Resources", b"MediaBox", b"CropBox", b"Rotate"];

/// Rewrites `input` with its pages in `page_order` (1-based page numbers of
/// the input) and, when given, a bookmark outline built from `toc`.
pub fn write_reordered_pdf(
    input: &Path,
    output: &Path,
    page_order: &[u32],
    toc: Option<&TableOfContents>,
) -> Result<()> {
    let mut doc = Document::load(input)
        .with_context(|| format!("Failed to load {}", input.display()))?;
    reorder_pages(&mut doc, page_order)?;

    if let Some(toc) = toc.filter(|t| !t.is_empty()) {
        add_outline(&mut doc, toc)?;
    }

    doc.save(output)
        .with_context(|| format!("Failed to write {}", output.display()))?;
    info!("Wrote {} pages to {}", page_order.len(), output.display());
    Ok(())
}

/// Replaces the page tree with a single flat node listing pages in `page_order`.
pub fn reorder_pages(doc: &mut Document, page_order: &[u32]) -> Result<()> {
    let pages = doc.get_pages();
    let zero_based: Vec<usize> = page_order
        .iter()
        .map(|&n| (n as usize).wrapping_sub(1))
        .collect();
    if !is_permutation(&zero_based, pages.len()) {
        bail!(
            "page order {:?} is not a permutation of pages 1..={}",
            page_order,
            pages.len()
        );
    }

    let page_ids: Vec<ObjectId> = page_order
        .iter()
        .map(|n| pages.get(n).copied().ok_or_else(|| anyhow!("page {} not found", n)))
        .collect::<Result<_>>()?;

    let root_id = doc.trailer.get(b"Root")?.as_reference()?;
    let tree_id = doc.get_dictionary(root_id)?.get(b"Pages")?.as_reference()?;

    for &page_id in &page_ids {
        let inherited = inherited_attributes(doc, page_id);
        let page = doc.get_object_mut(page_id)?.as_dict_mut()?;
        for (key, value) in inherited {
            page.set(key, value);
        }
        page.set("Parent", Object::Reference(tree_id));
    }

    let tree = doc.get_object_mut(tree_id)?.as_dict_mut()?;
    tree.set(
        "Kids",
        Object::Array(page_ids.iter().map(|&id| Object::Reference(id)).collect()),
    );
    tree.set("Count", Object::Integer(page_ids.len() as i64));

    let pruned = doc.prune_objects();
    debug!("Flattened page tree, pruned {} unreachable objects", pruned.len());
    Ok(())
}

/// Attributes missing on the page itself but set on one of its ancestors.
fn inherited_attributes(doc: &Document, page_id: ObjectId) -> Vec<(Vec<u8>, Object)> {
    let Ok(page) = doc.get_dictionary(page_id) else {
        return Vec::new();
    };

    let mut found = Vec::new();
    for key in INHERITABLE {
        if page.has(key) {
            continue;
        }
        let mut parent = page.get(b"Parent").and_then(Object::as_reference).ok();
        // Bounded in case of a cyclic tree.
        for _ in 0..32 {
            let Some(node) = parent.and_then(|id| doc.get_dictionary(id).ok()) else {
                break;
            };
            if let Ok(value) = node.get(key) {
                found.push((key.to_vec(), value.clone()));
                break;
            }
            parent = node.get(b"Parent").and_then(Object::as_reference).ok();
        }
    }
    found
}

/// H1 entries become top-level bookmarks; deeper entries nest under the
/// preceding H1.
fn add_outline(doc: &mut Document, toc: &TableOfContents) -> Result<()> {
    let pages: Vec<ObjectId> = doc.get_pages().values().copied().collect();
    let mut current_top: Option<u32> = None;

    for entry in &toc.entries {
        let Some(&page_id) = entry.page.checked_sub(1).and_then(|i| pages.get(i)) else {
            debug!("Skipping bookmark '{}' for missing page {}", entry.text, entry.page);
            continue;
        };
        let bookmark = Bookmark::new(entry.text.clone(), [0.0, 0.0, 0.0], 0, page_id);
        if entry.depth() == 1 {
            current_top = Some(doc.add_bookmark(bookmark, None));
        } else {
            doc.add_bookmark(bookmark, current_top);
        }
    }

    if let Some(outline_id) = doc.build_outline() {
        let root_id = doc.trailer.get(b"Root")?.as_reference()?;
        let catalog = doc.get_object_mut(root_id)?.as_dict_mut()?;
        catalog.set("Outlines", Object::Reference(outline_id));
        catalog.set("PageMode", Object::Name(b"UseOutlines".to_vec()));
        debug!("Added {} bookmarks", toc.entries.len());
    }
    Ok(())
}

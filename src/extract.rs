use std::path::Path;

use anyhow::{Context, Result};
use log::{debug, info, warn};
use lopdf::{content::Content, Document, ObjectId};

use crate::PageRecord;

pub const TEXT_CONFIDENCE: f32 = 0.95;

/// Operators that paint something visible without showing text:
/// XObjects, inline images, shadings and path painting.
const PAINTING_OPERATORS: [&str; 12] = [
    "Do", "BI", "sh", "S", "s", "f", "F", "f*", "B", "B*", "b", "b*",
];

/// Reads every page of `pdf_path` into a [`PageRecord`], in file order.
pub fn extract_pages(pdf_path: &Path) -> Result<Vec<PageRecord>> {
    let bytes = std::fs::read(pdf_path)
        .with_context(|| format!("Failed to read {}", pdf_path.display()))?;
    let doc = Document::load_mem(&bytes)
        .with_context(|| format!("Failed to parse {}", pdf_path.display()))?;

    let pages = doc.get_pages();
    info!("Extracting text from {} pages of {}", pages.len(), pdf_path.display());

    let whole_document = split_document_text(&bytes, pages.len());
    if whole_document.is_none() {
        debug!("Falling back to per-page lopdf text extraction");
    }

    let mut records = Vec::with_capacity(pages.len());
    for (index, (&page_number, &page_id)) in pages.iter().enumerate() {
        let text = match &whole_document {
            Some(texts) => texts[index].clone(),
            None => page_text(&doc, page_number),
        };
        let graphics = has_graphics(&doc, page_id);
        records.push(page_record(page_number, text, graphics));
    }

    let empty = records.iter().filter(|r| r.is_empty).count();
    info!("Extracted {} pages ({} empty)", records.len(), empty);
    Ok(records)
}

/// Splits pdf-extract's whole-document text on form feeds. Only trusted when
/// it yields exactly one chunk per page.
fn split_document_text(bytes: &[u8], page_count: usize) -> Option<Vec<String>> {
    let text = match pdf_extract::extract_text_from_mem(bytes) {
        Ok(text) => text,
        Err(e) => {
            warn!("pdf-extract failed: {}", e);
            return None;
        }
    };
    if !text.contains('\x0C') {
        return None;
    }

    let mut chunks: Vec<String> = text.split('\x0C').map(|chunk| chunk.trim().to_string()).collect();
    if chunks.len() == page_count + 1 && chunks.last().map_or(false, |c| c.is_empty()) {
        chunks.pop();
    }
    (chunks.len() == page_count).then_some(chunks)
}

fn page_text(doc: &Document, page_number: u32) -> String {
    match doc.extract_text(&[page_number]) {
        Ok(text) => text.trim().to_string(),
        Err(e) => {
            warn!("Could not extract text from page {}: {}", page_number, e);
            String::new()
        }
    }
}

/// True when the page's content stream paints images, forms or vector paths.
pub fn has_graphics(doc: &Document, page_id: ObjectId) -> bool {
    let Ok(data) = doc.get_page_content(page_id) else {
        return false;
    };
    match Content::decode(&data) {
        Ok(content) => paints_graphics(&content),
        Err(e) => {
            warn!("Could not decode content stream of object {:?}: {}", page_id, e);
            false
        }
    }
}

pub fn paints_graphics(content: &Content) -> bool {
    content
        .operations
        .iter()
        .any(|op| PAINTING_OPERATORS.contains(&op.operator.as_str()))
}

/// A page is empty only when it has neither text nor painted graphics.
pub fn page_record(page_number: u32, text: String, has_graphics: bool) -> PageRecord {
    let has_text = !text.trim().is_empty();
    PageRecord {
        page_number,
        text,
        is_empty: !has_text && !has_graphics,
        confidence: if has_text { TEXT_CONFIDENCE } else { 0.0 },
    }
}

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::engine::OrderingResult;
use crate::reconcile::OrderSource;
use crate::toc::TableOfContents;
use crate::head;

const PREVIEW_CHARS: usize = 500;
const REASONING_CHARS: usize = 200;

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct PagePreview {
    pub page_number: u32,
    pub original_index: Option<usize>,
    pub text: String,
    pub is_empty: bool,
    pub confidence: f32,
}

/// JSON sidecar written next to the reordered PDF.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct OrderingReport {
    pub original_file: String,
    pub reordered_file: String,
    pub success: bool,
    pub source: OrderSource,
    pub original_order: Vec<u32>,
    pub reordered_order: Vec<u32>,
    pub confidence_scores: Vec<f32>,
    pub average_confidence: f32,
    pub reasoning: String,
    pub summary: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub pages: Vec<PagePreview>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub table_of_contents: Option<TableOfContents>,
}

impl OrderingReport {
    pub fn new(
        original_file: &Path,
        reordered_file: &Path,
        result: &OrderingResult,
        toc: Option<TableOfContents>,
    ) -> Self {
        let pages = result
            .ordered_pages
            .iter()
            .enumerate()
            .map(|(i, page)| PagePreview {
                page_number: page.page_number(),
                original_index: page.original_index,
                text: head(&page.record.text, PREVIEW_CHARS).to_string(),
                is_empty: page.is_empty(),
                confidence: result.confidence_scores.get(i).copied().unwrap_or(0.5),
            })
            .collect();

        OrderingReport {
            original_file: original_file.display().to_string(),
            reordered_file: reordered_file.display().to_string(),
            success: result.success,
            source: result.source,
            original_order: result.original_order.clone(),
            reordered_order: result.page_order.clone(),
            confidence_scores: result.confidence_scores.clone(),
            average_confidence: result.average_confidence(),
            reasoning: result.reasoning.clone(),
            summary: summarize(result),
            error: result.error.clone(),
            pages,
            table_of_contents: toc,
        }
    }
}

/// One-paragraph human summary of what the ordering did.
pub fn summarize(result: &OrderingResult) -> String {
    if result.original_order.is_empty() || result.page_order.is_empty() {
        return "Page ordering completed".to_string();
    }
    if !result.order_changed() {
        return "Pages were already in correct order. No reordering needed.".to_string();
    }

    let reasoning = head(&result.reasoning, REASONING_CHARS);
    let ellipsis = if reasoning.len() < result.reasoning.len() { "..." } else { "" };
    format!(
        "Pages reordered successfully.\n   Original order: {:?}\n   New order: {:?}\n   Average confidence: {:.2}%\n   Reasoning: {}{}",
        result.original_order,
        result.page_order,
        result.average_confidence() * 100.0,
        reasoning,
        ellipsis
    )
}

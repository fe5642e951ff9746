//! Restores the reading order of a PDF whose pages were scanned out of sequence.
//!
//! The ordering engine blends semantic similarity between pages with textual
//! flow cues (article numerals, clause enumerations, heading progressions),
//! asks an external reasoning oracle for a proposed order, reconciles that
//! proposal against the transition scores, and finally re-interleaves blank
//! pages at positions consistent with where they were scanned.

use serde::{Deserialize, Serialize};

pub mod assemble;
pub mod config;
pub mod confidence;
pub mod embedding;
pub mod engine;
pub mod extract;
pub mod flow;
pub mod heuristic;
pub mod oracle;
pub mod reconcile;
pub mod reinsert;
pub mod report;
pub mod response;
pub mod toc;
pub mod transition;

pub use config::{AppConfig, OrderingConfig};
pub use engine::{OrderError, OrderingResult, PageOrderingEngine};

/// One page as produced by text extraction, in as-scanned order.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct PageRecord {
    /// 1-based position of the page in the scanned file.
    pub page_number: u32,
    pub text: String,
    pub is_empty: bool,
    pub confidence: f32,
}

impl PageRecord {
    pub fn new(page_number: u32, text: impl Into<String>) -> Self {
        let text = text.into();
        let is_empty = text.trim().is_empty();
        PageRecord {
            page_number,
            confidence: if is_empty { 0.0 } else { 0.95 },
            text,
            is_empty,
        }
    }

    pub fn empty(page_number: u32) -> Self {
        PageRecord {
            page_number,
            text: String::new(),
            is_empty: true,
            confidence: 0.0,
        }
    }
}

/// A page placed in the output sequence.
///
/// `original_index` is the page's position within the non-empty subsequence
/// that was handed to the ordering stages; blank pages carry `None`.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct OrderedPage {
    #[serde(flatten)]
    pub record: PageRecord,
    pub original_index: Option<usize>,
}

impl OrderedPage {
    pub fn indexed(record: PageRecord, original_index: usize) -> Self {
        OrderedPage {
            record,
            original_index: Some(original_index),
        }
    }

    pub fn passenger(record: PageRecord) -> Self {
        OrderedPage {
            record,
            original_index: None,
        }
    }

    pub fn page_number(&self) -> u32 {
        self.record.page_number
    }

    pub fn is_empty(&self) -> bool {
        self.record.is_empty
    }
}

/// A proposed full order of the non-empty pages plus its justification.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct CandidateOrder {
    pub order: Vec<usize>,
    pub reasoning: String,
}

impl CandidateOrder {
    pub fn new(order: Vec<usize>, reasoning: impl Into<String>) -> Self {
        CandidateOrder {
            order,
            reasoning: reasoning.into(),
        }
    }

    pub fn identity(n: usize, reasoning: impl Into<String>) -> Self {
        CandidateOrder::new((0..n).collect(), reasoning)
    }

    pub fn is_identity(&self) -> bool {
        self.order.iter().enumerate().all(|(i, &idx)| i == idx)
    }

    /// True when `order` holds every index in `0..n` exactly once.
    pub fn is_permutation_of(&self, n: usize) -> bool {
        is_permutation(&self.order, n)
    }
}

pub fn is_permutation(order: &[usize], n: usize) -> bool {
    if order.len() != n {
        return false;
    }
    let mut seen = vec![false; n];
    for &idx in order {
        if idx >= n || seen[idx] {
            return false;
        }
        seen[idx] = true;
    }
    true
}

/// Returns at most `max_chars` characters from the start of `text`.
pub(crate) fn head(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((byte_idx, _)) => &text[..byte_idx],
        None => text,
    }
}

use log::{debug, error, info, warn};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::confidence::estimate_confidence;
use crate::config::OrderingConfig;
use crate::embedding::{similarity_matrix, Embedder, EmbeddingError};
use crate::oracle::{Oracle, OrderRequester};
use crate::reconcile::{reconcile, OrderSource};
use crate::reinsert::{reinsert, EmptySlot};
use crate::transition::TransitionMatrix;
use crate::{head, OrderedPage, PageRecord};

pub const INSUFFICIENT_PAGES_REASONING: &str = "Not enough pages to reorder";

#[derive(Debug, Error)]
pub enum OrderError {
    #[error("embedding failed: {0}")]
    Embedding(#[from] EmbeddingError),
    #[error("internal ordering fault: {0}")]
    Internal(String),
}

/// Everything the caller needs to rebuild the document and report on it.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct OrderingResult {
    pub success: bool,
    pub ordered_pages: Vec<OrderedPage>,
    /// 1-based scanned page numbers in reading order.
    pub page_order: Vec<u32>,
    pub confidence_scores: Vec<f32>,
    pub reasoning: String,
    pub original_order: Vec<u32>,
    pub reordered_indices: Vec<Option<usize>>,
    /// What the oracle literally proposed, before validation.
    pub oracle_order: Vec<i64>,
    pub source: OrderSource,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl OrderingResult {
    fn in_input_order(pages: &[PageRecord], confidence: f32, reasoning: String, source: OrderSource) -> Self {
        let ordered_pages = as_input_order(pages);
        let page_order: Vec<u32> = pages.iter().map(|p| p.page_number).collect();
        OrderingResult {
            success: true,
            reordered_indices: ordered_pages.iter().map(|p| p.original_index).collect(),
            confidence_scores: vec![confidence; pages.len()],
            original_order: page_order.clone(),
            page_order,
            ordered_pages,
            reasoning,
            oracle_order: Vec::new(),
            source,
            error: None,
        }
    }

    pub fn insufficient(pages: &[PageRecord]) -> Self {
        OrderingResult::in_input_order(
            pages,
            1.0,
            INSUFFICIENT_PAGES_REASONING.to_string(),
            OrderSource::Insufficient,
        )
    }

    /// Failure result: input order, neutral confidence, error attached.
    pub fn failed(pages: &[PageRecord], err: &OrderError) -> Self {
        let mut result = OrderingResult::in_input_order(
            pages,
            0.5,
            format!("Ordering failed: {}", err),
            OrderSource::Identity,
        );
        result.success = false;
        result.error = Some(err.to_string());
        result
    }

    pub fn average_confidence(&self) -> f32 {
        if self.confidence_scores.is_empty() {
            return 0.0;
        }
        self.confidence_scores.iter().sum::<f32>() / self.confidence_scores.len() as f32
    }

    pub fn order_changed(&self) -> bool {
        self.page_order != self.original_order
    }
}

fn as_input_order(pages: &[PageRecord]) -> Vec<OrderedPage> {
    let mut next_index = 0;
    pages
        .iter()
        .map(|page| {
            if page.is_empty {
                OrderedPage::passenger(page.clone())
            } else {
                next_index += 1;
                OrderedPage::indexed(page.clone(), next_index - 1)
            }
        })
        .collect()
}

/// Orders the pages of one document. Holds no per-document state, so one
/// engine can serve many documents, from many threads.
pub struct PageOrderingEngine {
    config: OrderingConfig,
    embedder: Box<dyn Embedder>,
    oracle: Box<dyn Oracle>,
}

impl PageOrderingEngine {
    pub fn new(config: OrderingConfig, embedder: Box<dyn Embedder>, oracle: Box<dyn Oracle>) -> Self {
        PageOrderingEngine {
            config,
            embedder,
            oracle,
        }
    }

    pub fn config(&self) -> &OrderingConfig {
        &self.config
    }

    /// Always returns a full-length sequence; failures come back with
    /// `success == false` and the pages in their input order.
    pub fn determine_page_order(&self, pages: &[PageRecord]) -> OrderingResult {
        match self.order_pages(pages) {
            Ok(result) => result,
            Err(e) => {
                error!("Page ordering failed: {}", e);
                OrderingResult::failed(pages, &e)
            }
        }
    }

    fn order_pages(&self, pages: &[PageRecord]) -> Result<OrderingResult, OrderError> {
        let mut content = Vec::with_capacity(pages.len());
        let mut empties = Vec::new();
        for (position, page) in pages.iter().enumerate() {
            if page.is_empty {
                empties.push(EmptySlot {
                    position,
                    record: page.clone(),
                });
            } else {
                content.push(page.clone());
            }
        }
        info!(
            "Ordering {} pages ({} with content, {} empty)",
            pages.len(),
            content.len(),
            empties.len()
        );

        if content.len() < 2 {
            info!("Fewer than two content pages, keeping input order");
            return Ok(OrderingResult::insufficient(pages));
        }

        let transitions = self.build_transitions(&content)?;

        let outcome = OrderRequester::new(self.oracle.as_ref(), &self.config).request_order(&content, &transitions);
        let reconciled = reconcile(
            &content,
            outcome.candidate,
            outcome.source,
            &transitions,
            self.config.min_transition_score,
        );
        info!("Resolved content order {:?} from {:?}", reconciled.indices, reconciled.source);

        let ordered_pages = reinsert(reconciled.pages, empties, self.config.reinsertion);
        if ordered_pages.len() != pages.len() {
            return Err(OrderError::Internal(format!(
                "ordered {} pages but received {}",
                ordered_pages.len(),
                pages.len()
            )));
        }

        let confidence_scores = estimate_confidence(&ordered_pages, &transitions);
        let page_order: Vec<u32> = ordered_pages.iter().map(OrderedPage::page_number).collect();
        let original_order: Vec<u32> = pages.iter().map(|p| p.page_number).collect();

        info!("Original order: {:?}", original_order);
        info!("Final order:    {:?}", page_order);
        if page_order == original_order {
            warn!("Final order is identical to the input order");
        }

        Ok(OrderingResult {
            success: true,
            reordered_indices: ordered_pages.iter().map(|p| p.original_index).collect(),
            ordered_pages,
            page_order,
            confidence_scores,
            reasoning: reconciled.reasoning,
            original_order,
            oracle_order: outcome.proposed,
            source: reconciled.source,
            error: None,
        })
    }

    fn build_transitions(&self, content: &[PageRecord]) -> Result<TransitionMatrix, OrderError> {
        let excerpts: Vec<&str> = content
            .iter()
            .map(|page| head(&page.text, self.config.embedding_chars))
            .collect();
        let vectors = self.embedder.embed(&excerpts)?;
        if vectors.len() != excerpts.len() {
            return Err(EmbeddingError::CountMismatch {
                expected: excerpts.len(),
                actual: vectors.len(),
            }
            .into());
        }
        debug!("Embedded {} pages", vectors.len());

        let similarity = similarity_matrix(&vectors);
        let texts: Vec<&str> = content.iter().map(|page| page.text.as_str()).collect();
        Ok(TransitionMatrix::build(&texts, &similarity, &self.config))
    }
}

use log::{info, warn};
use serde::{Deserialize, Serialize};

use crate::heuristic::title_page_order;
use crate::transition::TransitionMatrix;
use crate::{is_permutation, CandidateOrder, OrderedPage, PageRecord};

/// Which producer the final order came from.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum OrderSource {
    Oracle,
    Heuristic,
    TransitionPath,
    Identity,
    Insufficient,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Reconciled {
    pub pages: Vec<OrderedPage>,
    pub indices: Vec<usize>,
    pub source: OrderSource,
    pub reasoning: String,
}

/// Settles on one order for the non-empty `pages`.
///
/// An identity candidate is distrusted and replaced by the title-page
/// heuristic when that disagrees with it. Any other candidate has repeated
/// and out-of-range indices dropped; if what is left does not cover every
/// page, the greedy transition path is used instead.
pub fn reconcile(
    pages: &[PageRecord],
    candidate: CandidateOrder,
    source: OrderSource,
    transitions: &TransitionMatrix,
    min_score: f32,
) -> Reconciled {
    let n = pages.len();
    let CandidateOrder { order, mut reasoning } = candidate;

    let is_identity = order.len() == n && order.iter().enumerate().all(|(i, &idx)| i == idx);

    let (indices, source) = if n > 0 && is_identity {
        warn!("Candidate order is identical to the input order, trying title-page heuristic");
        let heuristic = title_page_order(pages, transitions, min_score);
        if heuristic.iter().enumerate().any(|(i, &idx)| i != idx) {
            info!("Title-page heuristic proposes {:?}", heuristic);
            reasoning = format!("{} (input order distrusted; title-page heuristic applied)", reasoning);
            (heuristic, OrderSource::Heuristic)
        } else {
            warn!("Title-page heuristic also kept the input order");
            (order, OrderSource::Identity)
        }
    } else {
        let deduped = dedupe(&order, n);
        if is_permutation(&deduped, n) {
            (deduped, source)
        } else {
            warn!(
                "Candidate covers {} of {} pages, rebuilding from transition scores",
                deduped.len(),
                n
            );
            let start = transitions.best_start().unwrap_or(0);
            reasoning = format!("{} (candidate incomplete; greedy transition path used)", reasoning);
            (transitions.greedy_path(start, None), OrderSource::TransitionPath)
        }
    };

    let resolved = indices
        .iter()
        .map(|&idx| OrderedPage::indexed(pages[idx].clone(), idx))
        .collect();

    Reconciled {
        pages: resolved,
        indices,
        source,
        reasoning,
    }
}

/// Keeps the first occurrence of each in-range index.
fn dedupe(order: &[usize], n: usize) -> Vec<usize> {
    let mut seen = vec![false; n];
    let mut kept = Vec::with_capacity(n);
    for &idx in order {
        if idx >= n {
            warn!("Dropping out-of-range page index {}", idx);
            continue;
        }
        if seen[idx] {
            warn!("Dropping repeated page index {}", idx);
            continue;
        }
        seen[idx] = true;
        kept.push(idx);
    }
    kept
}

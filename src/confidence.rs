use crate::transition::TransitionMatrix;
use crate::OrderedPage;

pub const EMPTY_PAGE_CONFIDENCE: f32 = 0.5;
pub const FIRST_PAGE_CONFIDENCE: f32 = 0.7;
pub const EMPTY_NEIGHBOUR_CONFIDENCE: f32 = 0.6;
pub const TRANSITION_BONUS: f32 = 0.2;
const UNKNOWN_TRANSITION_CONFIDENCE: f32 = 0.5;

/// One confidence value per position of the final sequence.
pub fn estimate_confidence(pages: &[OrderedPage], transitions: &TransitionMatrix) -> Vec<f32> {
    pages
        .iter()
        .enumerate()
        .map(|(position, page)| {
            if page.is_empty() {
                return EMPTY_PAGE_CONFIDENCE;
            }
            if position == 0 {
                return FIRST_PAGE_CONFIDENCE;
            }

            let previous = &pages[position - 1];
            let next_is_empty = pages.get(position + 1).map_or(false, OrderedPage::is_empty);
            if previous.is_empty() || next_is_empty {
                return EMPTY_NEIGHBOUR_CONFIDENCE;
            }

            match (previous.original_index, page.original_index) {
                (Some(from), Some(to)) => transitions
                    .get(from, to)
                    .map(|score| (score + TRANSITION_BONUS).min(1.0))
                    .unwrap_or(UNKNOWN_TRANSITION_CONFIDENCE),
                _ => UNKNOWN_TRANSITION_CONFIDENCE,
            }
        })
        .collect()
}

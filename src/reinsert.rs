use log::debug;

use crate::config::ReinsertionStrategy;
use crate::{OrderedPage, PageRecord};

/// A blank page together with its position in the full as-scanned list.
#[derive(Debug, Clone, PartialEq)]
pub struct EmptySlot {
    pub position: usize,
    pub record: PageRecord,
}

/// Puts blank pages back among the ordered content pages.
///
/// The relative order of `ordered` is never changed; blank pages are only
/// inserted between its elements.
pub fn reinsert(ordered: Vec<OrderedPage>, mut empties: Vec<EmptySlot>, strategy: ReinsertionStrategy) -> Vec<OrderedPage> {
    if empties.is_empty() {
        return ordered;
    }

    empties.sort_by_key(|slot| slot.position);
    let mut result = ordered;
    result.reserve(empties.len());

    for slot in empties {
        let at = match strategy {
            ReinsertionStrategy::PositionRelative => result
                .iter()
                .position(|page| page.page_number() > slot.record.page_number)
                .unwrap_or(result.len()),
            ReinsertionStrategy::StableSort => slot.position.min(result.len()),
        };
        debug!("Reinserting empty page {} at position {}", slot.record.page_number, at);
        result.insert(at, OrderedPage::passenger(slot.record));
    }

    result
}

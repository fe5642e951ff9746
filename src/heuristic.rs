use log::{debug, info};
use once_cell::sync::Lazy;
use regex::Regex;

use crate::transition::TransitionMatrix;
use crate::{head, PageRecord};

pub static FIRST_ARTICLE: Lazy<Regex> = Lazy::new(||
    Regex::new(r"\bARTICLE\s*[-–]?\s*(?:I|1|ONE)\b").unwrap());

const CONTINUATION_MARKERS: [&str; 2] = ["CONTINUED", "CONTINUATION"];
const BACK_REFERENCES: [&str; 3] = ["AS SET FORTH", "AS PROVIDED", "PURSUANT TO"];

/// How strongly a page looks like the opening page of a document.
///
/// Title phrases and "... BETWEEN ... AND ..." party lines add to the score;
/// pages that open mid-sentence or refer back to earlier text lose points.
pub fn title_page_score(text: &str) -> i32 {
    let upper = text.to_uppercase();
    let trimmed = upper.trim_start();
    let mut score = 0;

    if upper.contains("LOAN AGREEMENT") && upper.contains("BETWEEN") {
        score += 20;
    }
    if upper.contains("LOAN AGREEMENT") {
        score += 15;
    }
    if FIRST_ARTICLE.is_match(head(&upper, 100)) {
        score += 12;
    }
    if upper.contains("DEFINITIONS") {
        score += 10;
    }
    if trimmed.starts_with("LOAN AGREEMENT") {
        score += 15;
    }

    for line in upper.lines().take(3) {
        let line = line.trim();
        if line.contains("AGREEMENT") && line.len() < 100 {
            score += 8;
        }
        if line.contains("BETWEEN") && line.contains("AND") {
            score += 8;
        }
    }

    if trimmed.starts_with('-') || trimmed.starts_with("...") || trimmed.starts_with('…') {
        score -= 5;
    }

    let opening = head(&upper, 200);
    if CONTINUATION_MARKERS.iter().any(|m| opening.contains(m)) {
        score -= 3;
    }
    if BACK_REFERENCES.iter().any(|m| opening.contains(m)) {
        score -= 2;
    }

    score
}

/// Picks the most title-like page as the start (lowest index on ties), then
/// follows the strongest transitions while they exceed `min_score`.
pub fn title_page_order(pages: &[PageRecord], transitions: &TransitionMatrix, min_score: f32) -> Vec<usize> {
    if pages.is_empty() {
        return Vec::new();
    }

    let mut start = 0;
    let mut best = i32::MIN;
    for (index, page) in pages.iter().enumerate() {
        let score = title_page_score(&page.text);
        debug!("Page {} title score: {}", page.page_number, score);
        if score > best {
            best = score;
            start = index;
        }
    }
    info!(
        "Title heuristic starts at index {} (page {}, score {})",
        start, pages[start].page_number, best
    );

    transitions.greedy_path(start, Some(min_score))
}

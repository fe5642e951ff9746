use std::collections::HashSet;

use log::debug;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::OrderedPage;

pub static NUMBERED_HEADING: Lazy<Regex> = Lazy::new(||
    // "1.", "1.2.", "1 Introduction", "IV. Scope", "A. Background", "b) Goals"
    Regex::new(r"^\s*(?:((?:\d+\.)+\d*|\d+)[\.)]?\s+.+|[A-Za-z]{1,2}[\.)]\s+.+|[IVXLCDM]+[\.)]?\s+.+)").unwrap());
pub static DIVISION_HEADING: Lazy<Regex> = Lazy::new(||
    Regex::new(r"^\s*(?i:article|chapter|section|part)\s+([A-Z0-9]+|[ivxlcdm]+)\b").unwrap());
pub static APPENDIX_HEADING: Lazy<Regex> = Lazy::new(||
    Regex::new(r"^\s*(?i:appendix|schedule|exhibit)\s+([A-Z0-9]+)\b").unwrap());
static TRAILING_PAGE_NUMBER: Lazy<Regex> = Lazy::new(||
    Regex::new(r"\s+\d{1,3}$").unwrap());
static DOTTED_LEADER: Lazy<Regex> = Lazy::new(||
    Regex::new(r"\s*\.{3,}\s*\d*$").unwrap());

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct TocEntry {
    /// "H1" to "H4".
    pub level: String,
    pub text: String,
    /// 1-based page in the reordered document.
    pub page: usize,
}

impl TocEntry {
    /// Nesting depth, 1 for H1.
    pub fn depth(&self) -> usize {
        self.level
            .trim_start_matches('H')
            .parse::<usize>()
            .unwrap_or(1)
            .clamp(1, 4)
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Default)]
pub struct TableOfContents {
    pub title: String,
    pub entries: Vec<TocEntry>,
}

impl TableOfContents {
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Detects headings on each page of the reordered document.
pub fn build_table_of_contents(pages: &[OrderedPage]) -> TableOfContents {
    let mut title = String::new();
    let mut headings = Vec::new();

    for (position, page) in pages.iter().enumerate() {
        if page.is_empty() {
            continue;
        }
        let current_page = position + 1;
        let lines: Vec<&str> = page.record.text.lines().map(str::trim).collect();

        if title.is_empty() {
            title = document_title(&lines);
        }

        for (i, line) in lines.iter().enumerate() {
            if line.is_empty() {
                continue;
            }
            if let Some(heading) = detect_heading(line, i, &lines, current_page) {
                if !headings.iter().any(|h: &TocEntry| h.text == heading.text && h.page == heading.page) {
                    headings.push(heading);
                }
            }
        }
    }

    let entries = dedupe_headings(headings);
    debug!("Detected {} table of contents entries", entries.len());

    TableOfContents {
        title: if title.is_empty() {
            "Untitled Document".to_string()
        } else {
            title
        },
        entries,
    }
}

/// Picks the most title-like line among the first twenty of the opening page.
pub fn document_title(lines: &[&str]) -> String {
    let mut candidates: Vec<(String, i32)> = Vec::new();

    for (i, line) in lines.iter().filter(|l| !l.is_empty()).take(20).enumerate() {
        if line.len() < 5 || line.len() > 200 {
            continue;
        }
        let lower = line.to_lowercase();
        if line.starts_with("Page ")
            || lower.contains("http")
            || lower.contains("www.")
            || line.contains('@')
            || lower.contains("table of contents")
        {
            continue;
        }

        let mut score = (20 - i as i32) / 2;
        if line.len() >= 10 && line.len() <= 100 {
            score += 15;
        }

        let words: Vec<&str> = line.split_whitespace().collect();
        let capitalized = words
            .iter()
            .filter(|w| w.chars().next().map_or(false, char::is_uppercase))
            .count();
        if words.len() >= 2 && capitalized > words.len() / 2 {
            score += 20;
        }
        if *line == line.to_uppercase() && line.len() <= 80 {
            score += 10;
        }

        const TITLE_WORDS: [&str; 10] = [
            "agreement", "contract", "report", "proposal", "plan",
            "policy", "specification", "guide", "manual", "memorandum",
        ];
        score += 10 * TITLE_WORDS.iter().filter(|w| lower.contains(*w)).count() as i32;

        if line.ends_with('.') && words.len() > 8 {
            score -= 10;
        }
        if score > 0 {
            candidates.push((clean_heading_text(line), score));
        }
    }

    // Stable: earlier lines win ties.
    candidates.sort_by(|a, b| b.1.cmp(&a.1));
    candidates.into_iter().next().map(|(title, _)| title).unwrap_or_default()
}

fn detect_heading(line: &str, line_index: usize, all_lines: &[&str], page: usize) -> Option<TocEntry> {
    if line.len() < 3 || line.len() > 150 {
        return None;
    }

    let entry = |level: &str| TocEntry {
        level: level.to_string(),
        text: clean_heading_text(line),
        page,
    };

    if DIVISION_HEADING.is_match(line) || APPENDIX_HEADING.is_match(line) {
        return Some(entry("H1"));
    }

    if is_excluded_text(line) {
        return None;
    }

    if NUMBERED_HEADING.is_match(line) && line.split_whitespace().count() <= 12 && !line.ends_with('.') {
        return Some(entry(&numbered_level(line)));
    }

    let words: Vec<&str> = line.split_whitespace().collect();
    if *line == line.to_uppercase()
        && line.len() > 5
        && line.chars().any(char::is_alphabetic)
        && (2..=8).contains(&words.len())
        && is_line_isolated(line_index, all_lines)
    {
        return Some(entry("H1"));
    }

    if line.ends_with(':')
        && !line.ends_with("::")
        && (2..=10).contains(&words.len())
        && (8..=80).contains(&line.len())
        && (is_line_isolated(line_index, all_lines) || has_following_content(line_index, all_lines))
    {
        return Some(entry("H2"));
    }

    if (2..=8).contains(&words.len()) {
        let capitalized = words
            .iter()
            .filter(|w| w.chars().next().map_or(false, char::is_uppercase))
            .count();
        if capitalized >= 2
            && capitalized + 1 >= words.len()
            && (10..=80).contains(&line.len())
            && is_line_isolated(line_index, all_lines)
            && has_meaningful_words(&words)
        {
            return Some(entry(level_by_content(line)));
        }
    }

    None
}

fn is_line_isolated(line_index: usize, all_lines: &[&str]) -> bool {
    let blank_before = line_index == 0
        || all_lines
            .get(line_index - 1)
            .map_or(true, |l| l.trim().is_empty());
    let blank_after = all_lines
        .get(line_index + 1)
        .map_or(true, |l| l.trim().is_empty());
    blank_before && blank_after
}

fn has_following_content(line_index: usize, all_lines: &[&str]) -> bool {
    all_lines.get(line_index + 1).map_or(false, |next| {
        let next = next.trim();
        next.len() > 20 && next.chars().next().map_or(false, char::is_lowercase)
    })
}

fn has_meaningful_words(words: &[&str]) -> bool {
    const FILLER: [&str; 9] = ["The", "And", "For", "With", "From", "That", "This", "Into", "Upon"];
    let meaningful = words
        .iter()
        .filter(|w| w.len() > 3 && !FILLER.contains(*w))
        .count();
    meaningful * 2 >= words.len()
}

fn level_by_content(line: &str) -> &'static str {
    const TOP_LEVEL: [&str; 10] = [
        "introduction", "overview", "summary", "conclusion", "background",
        "recitals", "definitions", "general provisions", "miscellaneous", "signatures",
    ];
    let lower = line.to_lowercase();
    if TOP_LEVEL.iter().any(|w| lower.contains(w)) {
        "H1"
    } else {
        "H2"
    }
}

fn is_excluded_text(line: &str) -> bool {
    let lower = line.to_lowercase();

    const EXCLUSIONS: [&str; 10] = [
        "www.", "http", "@", "©", "copyright", "page ",
        "table of contents", "bibliography", "acknowledgments", "acknowledgements",
    ];
    if EXCLUSIONS.iter().any(|e| lower.contains(e)) {
        return true;
    }

    let total = line.chars().count();
    let non_letters = line.chars().filter(|c| !c.is_alphabetic()).count();
    if total == 0 || non_letters * 10 > total * 7 {
        return true;
    }

    if (line.contains('$') || line.contains('€') || line.contains('£'))
        && line.matches(char::is_numeric).count() > 2
    {
        return true;
    }

    const PROSE: [&str; 9] = [
        "the following", "as mentioned", "according to", "it should be noted",
        "please refer", "see section", "as shown in", "in this document", "the purpose of",
    ];
    if PROSE.iter().any(|p| lower.contains(p)) {
        return true;
    }

    const DANGLING: [&str; 9] = [",", " and", " or", " the", " of", " in", " to", " for", " with"];
    if DANGLING.iter().any(|d| lower.ends_with(d)) {
        return true;
    }

    line.chars().next().map_or(false, char::is_lowercase)
        && !line.starts_with('(')
        && !line.starts_with('[')
}

/// "9" and "9." are H1, "9.1" H2, "9.1.1" H3, deeper H4.
fn numbered_level(line: &str) -> String {
    let numbering = line.split_whitespace().next().unwrap_or("");
    let dots = numbering.matches('.').count();
    let level = match dots {
        0 => 1,
        1 if numbering.ends_with('.') => 1,
        1 => 2,
        2 if numbering.ends_with('.') => 2,
        2 => 3,
        _ => 4,
    };
    format!("H{}", level)
}

pub fn clean_heading_text(text: &str) -> String {
    let text = text.trim();
    let text = text.strip_suffix(':').map(str::trim).unwrap_or(text);
    let cleaned = DOTTED_LEADER.replace(text, "");
    // "ARTICLE 2" ends in its own number, not a page number.
    let ends_in_own_number = DIVISION_HEADING
        .find(&cleaned)
        .or_else(|| APPENDIX_HEADING.find(&cleaned))
        .map_or(false, |m| m.end() == cleaned.trim_end().len());
    let cleaned = if ends_in_own_number {
        cleaned.into_owned()
    } else {
        TRAILING_PAGE_NUMBER.replace(&cleaned, "").into_owned()
    };
    cleaned.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Drops headings whose text matches an earlier one ignoring case and
/// colons, then sorts by page.
fn dedupe_headings(headings: Vec<TocEntry>) -> Vec<TocEntry> {
    let mut seen: HashSet<String> = HashSet::new();
    let mut unique = Vec::new();

    for heading in headings {
        let key: String = heading
            .text
            .chars()
            .filter(|c| *c != ':')
            .collect::<String>()
            .trim()
            .to_lowercase();
        if key.len() > 5 && !seen.insert(key) {
            continue;
        }
        unique.push(heading);
    }

    unique.sort_by_key(|h| h.page);
    unique
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::PageRecord;

    fn ordered(texts: &[&str]) -> Vec<OrderedPage> {
        texts
            .iter()
            .enumerate()
            .map(|(i, t)| OrderedPage::indexed(PageRecord::new(i as u32 + 1, *t), i))
            .collect()
    }

    #[test]
    fn toc_uses_reordered_positions() {
        let pages = ordered(&[
            "LOAN AGREEMENT\n\nThis agreement is made between the parties.",
            "ARTICLE I\nDefinitions used herein",
            "ARTICLE II\nThe Loan amount shall be",
        ]);
        let toc = build_table_of_contents(&pages);
        assert_eq!(toc.title, "LOAN AGREEMENT");
        let article_two = toc.entries.iter().find(|e| e.text == "ARTICLE II").unwrap();
        assert_eq!(article_two.page, 3);
        assert_eq!(article_two.level, "H1");
        assert!(toc.entries.iter().any(|e| e.text == "ARTICLE I" && e.page == 2));
    }

    #[test]
    fn empty_pages_contribute_nothing_but_count_for_position() {
        let mut pages = ordered(&["Section 1 Scope"]);
        pages.insert(0, OrderedPage::passenger(PageRecord::empty(9)));
        let toc = build_table_of_contents(&pages);
        assert_eq!(toc.entries.len(), 1);
        assert_eq!(toc.entries[0].page, 2);
    }

    #[test]
    fn numbered_levels() {
        assert_eq!(numbered_level("3 Scope"), "H1");
        assert_eq!(numbered_level("3. Scope"), "H1");
        assert_eq!(numbered_level("3.1 Terms"), "H2");
        assert_eq!(numbered_level("3.1.2 Notice"), "H3");
        assert_eq!(numbered_level("3.1.2.4 Detail"), "H4");
    }

    #[test]
    fn heading_text_is_cleaned() {
        assert_eq!(clean_heading_text("Repayment Terms ........ 12"), "Repayment Terms");
        assert_eq!(clean_heading_text("  Events of   Default: "), "Events of Default");
        assert_eq!(clean_heading_text("Covenants 7"), "Covenants");
    }

    #[test]
    fn arabic_numbered_articles_each_get_an_entry() {
        let pages = ordered(&[
            "ARTICLE 1\nDefinitions apply throughout.",
            "ARTICLE 2\nThe lender shall advance the loan.",
            "ARTICLE 3\nThe borrower shall repay the loan.",
        ]);
        let toc = build_table_of_contents(&pages);
        let articles: Vec<(&str, usize)> = toc
            .entries
            .iter()
            .filter(|e| e.text.starts_with("ARTICLE"))
            .map(|e| (e.text.as_str(), e.page))
            .collect();
        assert_eq!(articles, vec![("ARTICLE 1", 1), ("ARTICLE 2", 2), ("ARTICLE 3", 3)]);
        assert_eq!(clean_heading_text("Schedule 4"), "Schedule 4");
        assert_eq!(clean_heading_text("ARTICLE 2 Repayment 14"), "ARTICLE 2 Repayment");
        assert_eq!(clean_heading_text("ARTICLE 5 ........ 9"), "ARTICLE 5");
    }

    #[test]
    fn prose_is_not_a_heading() {
        let lines = ["the borrower shall repay the loan in full,"];
        assert!(detect_heading(lines[0], 0, &lines, 1).is_none());
    }

    #[test]
    fn repeated_running_headers_are_deduplicated() {
        let pages = ordered(&["CONFIDENTIAL LOAN TERMS\n", "CONFIDENTIAL LOAN TERMS\n"]);
        let toc = build_table_of_contents(&pages);
        assert_eq!(toc.entries.iter().filter(|e| e.text == "CONFIDENTIAL LOAN TERMS").count(), 1);
    }

    #[test]
    fn untitled_when_nothing_qualifies() {
        let toc = build_table_of_contents(&[]);
        assert_eq!(toc.title, "Untitled Document");
        assert!(toc.is_empty());
        let entry = TocEntry { level: "H3".to_string(), text: "x".to_string(), page: 1 };
        assert_eq!(entry.depth(), 3);
    }
}

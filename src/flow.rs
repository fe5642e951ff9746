use once_cell::sync::Lazy;
use regex::Regex;

use crate::head;

pub static DIVISION_NUMERAL: Lazy<Regex> = Lazy::new(||
    Regex::new(r"(?i)\b(?:article|part|chapter)(?:\s+|\s*[-–:]\s*)([ivxlcdm]+)\b").unwrap());
pub static CLAUSE_NUMBER: Lazy<Regex> = Lazy::new(||
    Regex::new(r"(?i)\b([ivxlcdm]+)\)|\b(\d+)\)").unwrap());
pub static BARE_INTEGER: Lazy<Regex> = Lazy::new(||
    Regex::new(r"\b(\d+)\b").unwrap());

/// Heading pairs that usually appear on consecutive pages, in that order.
const HEADING_PAIRS: [(&str, &str); 9] = [
    ("executive summary", "problem statement"),
    ("introduction", "methodology"),
    ("problem statement", "solution"),
    ("abstract", "introduction"),
    ("section 1", "section 2"),
    ("part i", "part ii"),
    ("chapter 1", "chapter 2"),
    ("conclusion", "references"),
    ("summary", "references"),
];

static HEADING_PAIR_PATTERNS: Lazy<Vec<(Regex, Regex)>> = Lazy::new(|| {
    let phrase = |text: &str| Regex::new(&format!(r"(?i)\b{}\b", regex::escape(text))).unwrap();
    HEADING_PAIRS
        .iter()
        .map(|(first, second)| (phrase(first), phrase(second)))
        .collect()
});

pub const HEADING_PAIR_SCORE: f32 = 0.8;
pub const ROMAN_CLAUSE_SCORE: f32 = 0.75;
pub const DIVISION_SCORE: f32 = 0.7;
pub const ARABIC_CLAUSE_SCORE: f32 = 0.7;
pub const INTEGER_SEQUENCE_SCORE: f32 = 0.6;
pub const NEUTRAL_SCORE: f32 = 0.3;

const FLOW_WINDOW: usize = 500;
const DIVISION_WINDOW: usize = 200;
const CLAUSE_WINDOW: usize = 300;
const INTEGER_WINDOW: usize = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ClauseNumber {
    Roman(u32),
    Arabic(u64),
}

/// Scores how plausibly `text_after` continues directly from `text_before`.
///
/// Checks run in a fixed order and the first one that fires decides the
/// score. Pages without any cue get a neutral 0.3 rather than zero so the
/// semantic half of the transition score still has something to lean on.
/// Blank input scores 0. Only the first 500 characters of each page are read.
pub fn flow_score(text_before: &str, text_after: &str) -> f32 {
    let text_before = head(text_before, FLOW_WINDOW);
    let text_after = head(text_after, FLOW_WINDOW);
    if text_before.trim().is_empty() || text_after.trim().is_empty() {
        return 0.0;
    }

    if heading_pair_follows(text_before, text_after) {
        return HEADING_PAIR_SCORE;
    }

    if division_numeral_follows(text_before, text_after) {
        return DIVISION_SCORE;
    }

    if let Some(score) = clause_follows(text_before, text_after) {
        return score;
    }

    if integer_follows(text_before, text_after) {
        return INTEGER_SEQUENCE_SCORE;
    }

    NEUTRAL_SCORE
}

/// Pairs match as whole phrases, so "part i" is not found inside "part iii".
fn heading_pair_follows(text_before: &str, text_after: &str) -> bool {
    HEADING_PAIR_PATTERNS
        .iter()
        .any(|(first, second)| first.is_match(text_before) && second.is_match(text_after))
}

fn division_numeral_follows(text_before: &str, text_after: &str) -> bool {
    let last_before = DIVISION_NUMERAL
        .captures_iter(head(text_before, DIVISION_WINDOW))
        .last()
        .and_then(|caps| caps.get(1))
        .and_then(|m| parse_roman(m.as_str()));
    let first_after = DIVISION_NUMERAL
        .captures(head(text_after, DIVISION_WINDOW))
        .and_then(|caps| caps.get(1))
        .and_then(|m| parse_roman(m.as_str()));

    matches!((last_before, first_after), (Some(b), Some(a)) if a == b + 1)
}

fn clause_follows(text_before: &str, text_after: &str) -> Option<f32> {
    let last_before = clause_numbers(head(text_before, CLAUSE_WINDOW)).last().copied()?;
    let first_after = clause_numbers(head(text_after, CLAUSE_WINDOW)).first().copied()?;

    match (last_before, first_after) {
        (ClauseNumber::Roman(b), ClauseNumber::Roman(a)) if a == b + 1 => Some(ROMAN_CLAUSE_SCORE),
        (ClauseNumber::Arabic(b), ClauseNumber::Arabic(a)) if b.checked_add(1) == Some(a) => {
            Some(ARABIC_CLAUSE_SCORE)
        }
        _ => None,
    }
}

fn clause_numbers(text: &str) -> Vec<ClauseNumber> {
    CLAUSE_NUMBER
        .captures_iter(text)
        .filter_map(|caps| {
            if let Some(roman) = caps.get(1) {
                parse_roman(roman.as_str()).map(ClauseNumber::Roman)
            } else {
                caps.get(2)
                    .and_then(|digits| digits.as_str().parse::<u64>().ok())
                    .map(ClauseNumber::Arabic)
            }
        })
        .collect()
}

fn integer_follows(text_before: &str, text_after: &str) -> bool {
    let last_before = BARE_INTEGER
        .captures_iter(head(text_before, INTEGER_WINDOW))
        .last()
        .and_then(|caps| caps[1].parse::<u64>().ok());
    let first_after = BARE_INTEGER
        .captures(head(text_after, INTEGER_WINDOW))
        .and_then(|caps| caps[1].parse::<u64>().ok());

    matches!((last_before, first_after), (Some(b), Some(a)) if b.checked_add(1) == Some(a))
}

/// Parses a canonical Roman numeral. Non-canonical forms such as `iiii` or `vx` give `None`.
pub fn parse_roman(numeral: &str) -> Option<u32> {
    let lower = numeral.trim().to_ascii_lowercase();
    if lower.is_empty() {
        return None;
    }

    let mut total: u32 = 0;
    let mut previous: u32 = 0;
    for c in lower.chars().rev() {
        let value = match c {
            'i' => 1,
            'v' => 5,
            'x' => 10,
            'l' => 50,
            'c' => 100,
            'd' => 500,
            'm' => 1000,
            _ => return None,
        };
        if value < previous {
            total = total.checked_sub(value)?;
        } else {
            total = total.checked_add(value)?;
            previous = value;
        }
    }

    if total == 0 || to_roman(total) != lower {
        return None;
    }
    Some(total)
}

fn to_roman(mut value: u32) -> String {
    const TABLE: [(u32, &str); 13] = [
        (1000, "m"), (900, "cm"), (500, "d"), (400, "cd"),
        (100, "c"), (90, "xc"), (50, "l"), (40, "xl"),
        (10, "x"), (9, "ix"), (5, "v"), (4, "iv"), (1, "i"),
    ];

    let mut out = String::new();
    for (amount, symbol) in TABLE {
        while value >= amount {
            out.push_str(symbol);
            value -= amount;
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn heading_pair_wins_first() {
        let score = flow_score(
            "EXECUTIVE SUMMARY\nThis report covers",
            "PROBLEM STATEMENT\nArticle II applies",
        );
        assert_eq!(score, HEADING_PAIR_SCORE);
    }

    #[test]
    fn backward_heading_pairs_are_not_rewarded() {
        assert_eq!(flow_score("PART I\nRecitals", "PART II\nCovenants"), HEADING_PAIR_SCORE);
        assert!(flow_score("PART III\nRemedies", "PART II\nCovenants") < HEADING_PAIR_SCORE);
        assert!(flow_score("Chapter 12\nend", "Chapter 2\nstart") < HEADING_PAIR_SCORE);
        assert_eq!(flow_score("Chapter 1\nbegin", "Chapter 2\nstart"), HEADING_PAIR_SCORE);
    }

    #[test]
    fn heading_pairs_past_the_window_are_ignored() {
        let before = format!("{}Introduction", "filler ".repeat(80));
        assert_eq!(flow_score(&before, "Methodology\nWe sampled"), NEUTRAL_SCORE);
        assert_eq!(flow_score("Introduction", "Methodology\nWe sampled"), HEADING_PAIR_SCORE);
    }

    #[test]
    fn consecutive_article_numerals() {
        assert_eq!(
            flow_score("ARTICLE I\nDefinitions of terms", "ARTICLE II\nThe Loan"),
            DIVISION_SCORE
        );
        assert_eq!(
            flow_score("Chapter - iv\nwhere it ends", "CHAPTER V: a new start"),
            DIVISION_SCORE
        );
    }

    #[test]
    fn last_numeral_before_is_compared_with_first_after() {
        let before = "ARTICLE I\nstuff\nARTICLE II\nmore stuff";
        assert_eq!(flow_score(before, "ARTICLE III\nRepayment"), DIVISION_SCORE);
        assert_ne!(flow_score(before, "ARTICLE II\nRepayment"), DIVISION_SCORE);
    }

    #[test]
    fn clause_enumerations() {
        assert_eq!(flow_score("terms: i) the borrower", "ii) the lender shall"), ROMAN_CLAUSE_SCORE);
        assert_eq!(flow_score("conditions 3) interest", "4) repayment schedule"), ARABIC_CLAUSE_SCORE);
        assert_eq!(flow_score("conditions 3) interest", "ii) repayment"), NEUTRAL_SCORE);
    }

    #[test]
    fn bare_integer_sequence() {
        assert_eq!(flow_score("page 11", "12 and onwards"), INTEGER_SEQUENCE_SCORE);
        assert_eq!(flow_score("page 11", "14 and onwards"), NEUTRAL_SCORE);
    }

    #[test]
    fn oversized_integers_do_not_panic() {
        let huge = "99999999999999999999999999 end";
        assert_eq!(flow_score(huge, "100000000000000000000000000 start"), NEUTRAL_SCORE);
    }

    #[test]
    fn neutral_default_and_blank_input() {
        assert_eq!(flow_score("some prose here", "other prose there"), NEUTRAL_SCORE);
        assert_eq!(flow_score("", "anything"), 0.0);
        assert_eq!(flow_score("anything", "   "), 0.0);
    }

    #[test]
    fn roman_parsing() {
        assert_eq!(parse_roman("iv"), Some(4));
        assert_eq!(parse_roman("XIV"), Some(14));
        assert_eq!(parse_roman("mcmxc"), Some(1990));
        assert_eq!(parse_roman("iiii"), None);
        assert_eq!(parse_roman("vx"), None);
        assert_eq!(parse_roman("abc"), None);
        assert_eq!(parse_roman(""), None);
    }

    #[test]
    fn cues_past_the_window_are_ignored() {
        let before = format!("{}ARTICLE I", "x ".repeat(150));
        assert_eq!(flow_score(&before, "ARTICLE II"), NEUTRAL_SCORE);
    }
}

//! Defensive parsing of the oracle's free-text answer.
//!
//! The oracle is asked for `{"order": [...], "reasoning": "..."}` but often
//! wraps it in prose, uses single quotes, or answers with a bare list.
//! Each strategy below looks for the order in one shape and is tried in
//! sequence; reasoning is pulled out independently.

use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;

pub static STRICT_ORDER_OBJECT: Lazy<Regex> = Lazy::new(||
    Regex::new(r#"(?i)\{[^{}]*"order"\s*:\s*\[[^\]]+\][^{}]*\}"#).unwrap());
pub static LOOSE_ORDER_OBJECT: Lazy<Regex> = Lazy::new(||
    Regex::new(r#"(?is)\{.*?"order"\s*:\s*\[.*?\].*?\}"#).unwrap());
pub static ANY_OBJECT: Lazy<Regex> = Lazy::new(||
    Regex::new(r"(?s)\{.*?\}").unwrap());
pub static LABELLED_ARRAY: Lazy<Regex> = Lazy::new(||
    Regex::new(r"(?i)order\s*[:=]\s*(\[[\s\d,]+\])").unwrap());
pub static BARE_ARRAY: Lazy<Regex> = Lazy::new(||
    Regex::new(r"\[[\s\d,]+\]").unwrap());
pub static REASONING_FIELD: Lazy<Regex> = Lazy::new(||
    Regex::new(r#"(?i)reasoning["']?\s*[:=]\s*["']?([^"']+)["']?"#).unwrap());

pub const DEFAULT_REASONING: &str = "Ordering based on logical flow";

/// One way of finding the proposed order in a response.
pub struct ParseStrategy {
    pub name: &'static str,
    pub parse: fn(&str, usize) -> Option<Vec<i64>>,
}

/// Strategies in the order they are tried.
pub const STRATEGIES: [ParseStrategy; 3] = [
    ParseStrategy { name: "json_object", parse: json_object_order },
    ParseStrategy { name: "labelled_array", parse: labelled_array },
    ParseStrategy { name: "bare_array", parse: bare_array },
];

/// What could be recovered from a response.
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedResponse {
    pub order: Option<Vec<i64>>,
    pub strategy: Option<&'static str>,
    pub reasoning: String,
}

pub fn parse_response(response: &str, expected_len: usize) -> ParsedResponse {
    let mut parsed = ParsedResponse {
        order: None,
        strategy: None,
        reasoning: extract_reasoning(response).unwrap_or_else(|| DEFAULT_REASONING.to_string()),
    };

    for strategy in STRATEGIES.iter() {
        if let Some(order) = (strategy.parse)(response, expected_len) {
            parsed.order = Some(order);
            parsed.strategy = Some(strategy.name);
            break;
        }
    }

    parsed
}

/// A JSON object carrying a non-empty `order` array.
pub fn json_object_order(response: &str, _expected_len: usize) -> Option<Vec<i64>> {
    for pattern in [&*STRICT_ORDER_OBJECT, &*LOOSE_ORDER_OBJECT, &*ANY_OBJECT] {
        let Some(found) = pattern.find(response) else {
            continue;
        };
        let Ok(value) = serde_json::from_str::<Value>(found.as_str()) else {
            continue;
        };
        if let Some(order) = value.get("order").and_then(integer_array) {
            if !order.is_empty() {
                return Some(order);
            }
        }
    }
    None
}

/// `order: [..]` or `order = [..]` outside of valid JSON.
pub fn labelled_array(response: &str, _expected_len: usize) -> Option<Vec<i64>> {
    LABELLED_ARRAY
        .captures(response)
        .and_then(|caps| caps.get(1))
        .and_then(|m| serde_json::from_str::<Value>(m.as_str()).ok())
        .and_then(|value| integer_array(&value))
        .filter(|order| !order.is_empty())
}

/// The first bare `[n, n, ...]` list with one entry per page.
pub fn bare_array(response: &str, expected_len: usize) -> Option<Vec<i64>> {
    BARE_ARRAY
        .find_iter(response)
        .filter_map(|m| serde_json::from_str::<Value>(m.as_str()).ok())
        .filter_map(|value| integer_array(&value))
        .find(|order| order.len() == expected_len)
}

pub fn extract_reasoning(response: &str) -> Option<String> {
    let from_json = [&*STRICT_ORDER_OBJECT, &*LOOSE_ORDER_OBJECT, &*ANY_OBJECT]
        .iter()
        .filter_map(|pattern| pattern.find(response))
        .filter_map(|m| serde_json::from_str::<Value>(m.as_str()).ok())
        .find_map(|value| {
            value
                .get("reasoning")
                .and_then(Value::as_str)
                .map(|s| s.trim().to_string())
        })
        .filter(|s| !s.is_empty());
    if from_json.is_some() {
        return from_json;
    }

    REASONING_FIELD
        .captures(response)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().trim().to_string())
        .filter(|s| !s.is_empty())
}

/// Accepts integers and integral floats/strings; anything else rejects the whole array.
fn integer_array(value: &Value) -> Option<Vec<i64>> {
    value.as_array()?.iter().map(as_integer).collect()
}

fn as_integer(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n
            .as_i64()
            .or_else(|| n.as_f64().filter(|f| f.fract() == 0.0).map(|f| f as i64)),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// Converts a parsed order into page indices if it is a permutation of `0..n`.
pub fn validate_order(order: &[i64], n: usize) -> Option<Vec<usize>> {
    let indices: Vec<usize> = order
        .iter()
        .map(|&i| usize::try_from(i).ok())
        .collect::<Option<Vec<_>>>()?;
    crate::is_permutation(&indices, n).then_some(indices)
}

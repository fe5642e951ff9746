use std::time::Duration;

use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config::{api_key_from_env, OracleConfig, OrderingConfig};
use crate::heuristic::title_page_order;
use crate::reconcile::OrderSource;
use crate::response::{parse_response, validate_order};
use crate::transition::TransitionMatrix;
use crate::{head, CandidateOrder, PageRecord};

#[derive(Debug, Error, Clone, PartialEq)]
pub enum OracleError {
    #[error("oracle unavailable: {0}")]
    Unavailable(String),
    #[error("oracle request timed out")]
    Timeout,
    #[error("network error reaching oracle: {0}")]
    Network(String),
    #[error("oracle returned HTTP status {0}")]
    HttpStatus(u16),
    #[error("failed to deserialize oracle response: {0}")]
    Deserialization(String),
    #[error("oracle returned an empty completion")]
    EmptyResponse,
}

impl From<reqwest::Error> for OracleError {
    fn from(error: reqwest::Error) -> Self {
        if error.is_timeout() {
            return OracleError::Timeout;
        }
        if let Some(status) = error.status() {
            return OracleError::HttpStatus(status.as_u16());
        }
        if error.is_decode() {
            return OracleError::Deserialization(error.to_string());
        }
        OracleError::Network(error.to_string())
    }
}

/// An external text-completion service. One stateless call per document.
pub trait Oracle: Send + Sync {
    fn complete(&self, prompt: &str) -> Result<String, OracleError>;
}

/// Stands in when no oracle is configured; every call fails as unavailable.
#[derive(Debug, Clone, Default)]
pub struct OfflineOracle;

impl Oracle for OfflineOracle {
    fn complete(&self, _prompt: &str) -> Result<String, OracleError> {
        Err(OracleError::Unavailable("oracle disabled".to_string()))
    }
}

#[derive(Serialize, Deserialize, Debug, Clone)]
struct ChatMessage {
    role: String,
    content: String,
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage>,
    temperature: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

/// Client for an OpenAI-compatible `/chat/completions` endpoint such as Ollama's.
#[derive(Debug, Clone)]
pub struct ChatCompletionOracle {
    client: reqwest::blocking::Client,
    url: String,
    model: String,
    temperature: f32,
    max_tokens: Option<u32>,
    api_key: Option<String>,
}

impl ChatCompletionOracle {
    pub fn new(config: &OracleConfig) -> Result<Self, OracleError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        info!("Oracle configured with model {} at {}", config.model, config.base_url);
        Ok(ChatCompletionOracle {
            client,
            url: format!("{}/chat/completions", config.base_url.trim_end_matches('/')),
            model: config.model.clone(),
            temperature: config.temperature,
            max_tokens: config.max_tokens,
            api_key: api_key_from_env(config.api_key_env.as_deref()),
        })
    }
}

impl Oracle for ChatCompletionOracle {
    fn complete(&self, prompt: &str) -> Result<String, OracleError> {
        let body = ChatRequest {
            model: &self.model,
            messages: vec![ChatMessage {
                role: "user".to_string(),
                content: prompt.to_string(),
            }],
            temperature: self.temperature,
            max_tokens: self.max_tokens,
        };

        let mut request = self.client.post(&self.url).json(&body);
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }

        let response = request.send()?.error_for_status()?;
        let text = response.text()?;
        let parsed: ChatResponse = serde_json::from_str(&text)
            .map_err(|e| OracleError::Deserialization(e.to_string()))?;

        parsed
            .choices
            .into_iter()
            .next()
            .map(|choice| choice.message.content)
            .filter(|content| !content.trim().is_empty())
            .ok_or(OracleError::EmptyResponse)
    }
}

/// Builds the oracle from configuration, or an [`OfflineOracle`] when disabled.
pub fn oracle_from_config(config: &OracleConfig) -> Result<Box<dyn Oracle>, OracleError> {
    if !config.enabled {
        info!("Oracle disabled; ordering will rely on transition scores");
        return Ok(Box::new(OfflineOracle));
    }
    Ok(Box::new(ChatCompletionOracle::new(config)?))
}

/// Result of asking the oracle, kept alongside what it literally proposed.
#[derive(Debug, Clone, PartialEq)]
pub struct OracleOutcome {
    pub candidate: CandidateOrder,
    /// Who actually produced `candidate`.
    pub source: OrderSource,
    /// Indices the oracle proposed, valid or not; empty when nothing was parsed.
    pub proposed: Vec<i64>,
}

/// Formats page excerpts into a prompt and turns the answer into a [`CandidateOrder`].
pub struct OrderRequester<'a> {
    oracle: &'a dyn Oracle,
    config: &'a OrderingConfig,
}

impl<'a> OrderRequester<'a> {
    pub fn new(oracle: &'a dyn Oracle, config: &'a OrderingConfig) -> Self {
        OrderRequester { oracle, config }
    }

    /// Never fails: transport errors yield the input order, unusable answers
    /// yield the title-page heuristic order. Both say so in `reasoning`.
    pub fn request_order(&self, pages: &[PageRecord], transitions: &TransitionMatrix) -> OracleOutcome {
        let n = pages.len();
        let prompt = build_prompt(pages, self.config);
        debug!("Oracle prompt is {} chars for {} pages", prompt.len(), n);

        let response = match self.oracle.complete(&prompt) {
            Ok(response) => response,
            Err(e) => {
                warn!("Oracle query failed: {}", e);
                return OracleOutcome {
                    candidate: CandidateOrder::identity(
                        n,
                        format!("Oracle query failed ({}), using original order", e),
                    ),
                    source: OrderSource::Identity,
                    proposed: Vec::new(),
                };
            }
        };
        debug!("Oracle raw response: {}...", head(&response, 500));

        let parsed = parse_response(&response, n);
        let proposed = parsed.order.clone().unwrap_or_default();

        if let Some(order) = parsed.order.as_deref().and_then(|o| validate_order(o, n)) {
            info!(
                "Parsed oracle order {:?} via {}",
                order,
                parsed.strategy.unwrap_or("unknown")
            );
            return OracleOutcome {
                candidate: CandidateOrder::new(order, parsed.reasoning),
                source: OrderSource::Oracle,
                proposed,
            };
        }

        warn!("Could not use oracle response (parsed {:?}), using title-page heuristic", parsed.order);
        let order = title_page_order(pages, transitions, self.config.min_transition_score);
        OracleOutcome {
            candidate: CandidateOrder::new(
                order,
                "Oracle response unparseable, using embedding similarity analysis",
            ),
            source: OrderSource::Heuristic,
            proposed,
        }
    }
}

fn excerpt(text: &str, max_chars: usize, max_lines: usize) -> String {
    let clipped = head(text, max_chars);
    let mut preview = clipped.lines().take(max_lines).collect::<Vec<_>>().join("\n");
    if clipped.len() < text.len() || clipped.lines().count() > max_lines {
        preview.push_str("...");
    }
    preview
}

pub fn build_prompt(pages: &[PageRecord], config: &OrderingConfig) -> String {
    let mut prompt = String::from(
        "You are an AI assistant that reorders JUMBLED PDF pages.\n\
         IMPORTANT: The pages below are OUT OF ORDER and need to be reordered.\n\
         Do NOT assume they are already in the correct order - analyze the content carefully.\n\n\
         Analyze the following pages and determine their correct logical order.\n\
         Consider:\n\
         - Title pages and table of contents typically come first\n\
         - Introduction/Executive Summary comes before main content\n\
         - Sections should follow a logical sequence (Article I, Article II, etc.)\n\
         - Sequential numbering or references indicate order\n\
         - Conclusion/Summary comes at the end\n\
         - References/Appendices come last\n\n\
         Pages to reorder (these are CURRENTLY OUT OF ORDER):\n",
    );

    for (index, page) in pages.iter().enumerate() {
        prompt.push_str(&format!(
            "\n[Index {}] Page {}:\n{}\n---\n",
            index,
            page.page_number,
            excerpt(&page.text, config.prompt_excerpt_chars, config.prompt_excerpt_lines)
        ));
    }

    let rule = "=".repeat(80);
    let last = pages.len().saturating_sub(1);
    prompt.push_str(&format!(
        "\n\n{rule}\nCRITICAL INSTRUCTIONS:\n{rule}\n\
         These pages are DEFINITELY JUMBLED and OUT OF ORDER.\n\
         You MUST analyze the CONTENT of each page to determine the correct order.\n\
         DO NOT assume pages are in order just because their indices are sequential.\n\
         DO NOT return [0, 1, 2, 3...] - that would mean no reordering is needed.\n\n\
         Look for title/header text, section numbers (Article I before Article II),\n\
         page numbers printed in the text, and the logical flow from introduction to conclusion.\n\n\
         You must respond with ONLY valid JSON in this exact format:\n\
         {{\"order\": [0, 2, 1, 3], \"reasoning\": \"Explanation here\"}}\n\
         Where 'order' is an array of page indices (0-based) in the correct sequence.\n\
         The 'order' array must contain ALL page indices from 0 to {last} exactly once.\n\
         Do not include any text before or after the JSON object.\n\
         Response:\n"
    ));

    prompt
}

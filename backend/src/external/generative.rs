//! Text enrichment
//!
//! `Enricher` is the seam to the text-generation service. `Recommender` wraps
//! any enricher and always produces a value: generated text when the service
//! answers, canned text when it fails or returns nothing.

use std::sync::Arc;

use reqwest::Client;
use serde::{Deserialize, Serialize};

use super::{error_body, http_client};
use crate::config::GenerativeConfig;
use crate::error::{AppError, AppResult};

/// One prompt for the text service
#[derive(Debug, Clone)]
pub struct EnrichmentRequest {
    /// Short tag used in logs ("leaf", "cultivation", "chat", ...)
    pub purpose: &'static str,
    pub prompt: String,
}

impl EnrichmentRequest {
    pub fn new(purpose: &'static str, prompt: impl Into<String>) -> Self {
        Self {
            purpose,
            prompt: prompt.into(),
        }
    }
}

#[axum::async_trait]
pub trait Enricher: Send + Sync {
    async fn enrich(&self, request: &EnrichmentRequest) -> AppResult<String>;
}

// ============================================================================
// Gemini REST client
// ============================================================================

#[derive(Clone)]
pub struct GeminiClient {
    base_url: String,
    model: String,
    api_key: String,
    http_client: Client,
}

#[derive(Serialize)]
struct GenerateRequest<'a> {
    contents: Vec<Content<'a>>,
}

#[derive(Serialize)]
struct Content<'a> {
    role: &'static str,
    parts: Vec<Part<'a>>,
}

#[derive(Serialize)]
struct Part<'a> {
    text: &'a str,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<CandidatePart>,
}

#[derive(Debug, Deserialize)]
struct CandidatePart {
    text: Option<String>,
}

impl GenerateResponse {
    /// Concatenated text of the first candidate
    fn text(self) -> Option<String> {
        let content = self.candidates.into_iter().next()?.content?;
        let text: String = content.parts.into_iter().filter_map(|p| p.text).collect();
        let text = text.trim();
        (!text.is_empty()).then(|| text.to_string())
    }
}

impl GeminiClient {
    /// Build a client when an API key is configured
    pub fn from_config(config: &GenerativeConfig) -> AppResult<Option<Self>> {
        let Some(api_key) = config.api_key.clone().filter(|k| !k.is_empty()) else {
            return Ok(None);
        };

        Ok(Some(Self {
            base_url: config.endpoint.trim_end_matches('/').to_string(),
            model: config.model.clone(),
            api_key,
            http_client: http_client(config.timeout_secs)?,
        }))
    }
}

#[axum::async_trait]
impl Enricher for GeminiClient {
    async fn enrich(&self, request: &EnrichmentRequest) -> AppResult<String> {
        let url = format!("{}/models/{}:generateContent", self.base_url, self.model);
        let body = GenerateRequest {
            contents: vec![Content {
                role: "user",
                parts: vec![Part {
                    text: &request.prompt,
                }],
            }],
        };

        let response = self
            .http_client
            .post(&url)
            .query(&[("key", self.api_key.as_str())])
            .json(&body)
            .send()
            .await
            .map_err(|e| AppError::GenerativeError(format!("Request failed: {}", e)))?;

        if !response.status().is_success() {
            return Err(AppError::GenerativeError(error_body(response).await));
        }

        let result: GenerateResponse = response
            .json()
            .await
            .map_err(|e| AppError::GenerativeError(format!("Failed to parse response: {}", e)))?;

        result
            .text()
            .ok_or_else(|| AppError::GenerativeError("Empty response".to_string()))
    }
}

// ============================================================================
// Recommender
// ============================================================================

/// Canned lines returned instead of generated ones
#[derive(Debug, Clone, Copy, Default)]
pub struct CannedText {
    /// Service missing or failed
    pub unavailable: Option<&'static str>,
    /// Service answered with no text
    pub empty: Option<&'static str>,
    /// Text came back but no line could be parsed
    pub unparsed: Option<&'static str>,
}

fn canned(line: Option<&'static str>) -> Vec<String> {
    line.map(|l| vec![l.to_string()]).unwrap_or_default()
}

/// Which list markers count as a recommendation line
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BulletStyle {
    /// `-`, `•` and `*`
    Marked,
    /// Marked lines plus lines starting with a digit
    MarkedOrNumbered,
}

/// Extract list items from generated text
pub fn parse_bullets(text: &str, style: BulletStyle) -> Vec<String> {
    text.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .filter_map(|line| {
            let marked = line.starts_with(['-', '•', '*']);
            let numbered = line.starts_with(|c: char| c.is_ascii_digit());
            let keep = marked || (style == BulletStyle::MarkedOrNumbered && numbered);
            if !keep {
                return None;
            }
            let strip: &[char] = match style {
                BulletStyle::Marked => &['-', '•', '*', ' '],
                BulletStyle::MarkedOrNumbered => {
                    &['-', '•', '*', ' ', '.', ')', '0', '1', '2', '3', '4', '5', '6', '7', '8', '9']
                }
            };
            let item = line.trim_start_matches(strip).trim();
            (!item.is_empty()).then(|| item.to_string())
        })
        .collect()
}

/// Extract "1. ...", "2) ..." items, dropping an "Approach N:" prefix
pub fn parse_numbered(text: &str) -> Vec<String> {
    text.lines()
        .map(str::trim)
        .filter_map(|line| {
            let mut chars = line.chars();
            let first = chars.next()?;
            let second = chars.next()?;
            if !first.is_ascii_digit() || !matches!(second, '.' | ')' | ':') || line.len() <= 2 {
                return None;
            }
            let mut item = chars.as_str().trim();
            if item.starts_with("Approach") {
                item = item.split_once(':').map(|(_, rest)| rest.trim()).unwrap_or(item);
            }
            (!item.is_empty()).then(|| item.to_string())
        })
        .collect()
}

/// Split "ACTION:" lines out of a chat reply
pub fn extract_actions(text: &str) -> (String, Vec<String>) {
    let mut actions = Vec::new();
    let mut kept = Vec::new();
    for line in text.lines() {
        match line.trim().strip_prefix("ACTION:") {
            Some(action) => {
                let action = action.trim();
                if !action.is_empty() {
                    actions.push(action.to_string());
                }
            }
            None => kept.push(line),
        }
    }
    (kept.join("\n").trim().to_string(), actions)
}

/// Fallback-aware front of an optional enricher
#[derive(Clone, Default)]
pub struct Recommender {
    enricher: Option<Arc<dyn Enricher>>,
}

impl Recommender {
    pub fn new(enricher: Arc<dyn Enricher>) -> Self {
        Self {
            enricher: Some(enricher),
        }
    }

    /// Recommender that always answers with canned text
    pub fn disabled() -> Self {
        Self { enricher: None }
    }

    /// Raw generated text; `Ok(None)` when the service answered with nothing
    async fn generate(&self, request: &EnrichmentRequest) -> AppResult<Option<String>> {
        let Some(enricher) = &self.enricher else {
            return Err(AppError::GenerativeError("Text service not configured".to_string()));
        };
        let text = enricher.enrich(request).await?;
        let text = text.trim();
        Ok((!text.is_empty()).then(|| text.to_string()))
    }

    /// Free text, `None` on failure or empty output
    pub async fn text(&self, request: EnrichmentRequest) -> Option<String> {
        match self.generate(&request).await {
            Ok(text) => text,
            Err(e) => {
                tracing::warn!("{} enrichment unavailable: {}", request.purpose, e);
                None
            }
        }
    }

    /// List items parsed from generated text, canned lines otherwise
    pub async fn bullets(
        &self,
        request: EnrichmentRequest,
        style: BulletStyle,
        limit: Option<usize>,
        fallback: CannedText,
    ) -> Vec<String> {
        let text = match self.generate(&request).await {
            Ok(Some(text)) => text,
            Ok(None) => return canned(fallback.empty),
            Err(e) => {
                tracing::warn!("{} enrichment unavailable: {}", request.purpose, e);
                return canned(fallback.unavailable);
            }
        };

        let mut items = parse_bullets(&text, style);
        if let Some(limit) = limit {
            items.truncate(limit);
        }
        if items.is_empty() {
            canned(fallback.unparsed)
        } else {
            items
        }
    }

    /// Numbered items, empty on failure
    pub async fn numbered(&self, request: EnrichmentRequest, limit: usize) -> Vec<String> {
        match self.text(request).await {
            Some(text) => {
                let mut items = parse_numbered(&text);
                items.truncate(limit);
                items
            }
            None => Vec::new(),
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    /// Enricher returning a fixed reply or failing
    pub struct StubEnricher(pub Option<&'static str>);

    #[axum::async_trait]
    impl Enricher for StubEnricher {
        async fn enrich(&self, _request: &EnrichmentRequest) -> AppResult<String> {
            self.0
                .map(str::to_string)
                .ok_or_else(|| AppError::GenerativeError("stub offline".to_string()))
        }
    }

    pub fn stub(reply: Option<&'static str>) -> Recommender {
        Recommender::new(Arc::new(StubEnricher(reply)))
    }

    const FALLBACK: CannedText = CannedText {
        unavailable: Some("service unavailable"),
        empty: Some("nothing returned"),
        unparsed: Some("keep monitoring"),
    };

    #[test]
    fn test_parse_marked_bullets() {
        let text = "Here you go:\n- Prune affected shoots\n• Improve drainage\n* Scout weekly\n1. ignored";
        assert_eq!(
            parse_bullets(text, BulletStyle::Marked),
            vec!["Prune affected shoots", "Improve drainage", "Scout weekly"]
        );
    }

    #[test]
    fn test_parse_numbered_bullets() {
        let text = "1. Irrigate in the morning\n2) Mulch rows\n- Check pH";
        assert_eq!(
            parse_bullets(text, BulletStyle::MarkedOrNumbered),
            vec!["Irrigate in the morning", "Mulch rows", "Check pH"]
        );
    }

    #[test]
    fn test_parse_numbered_approaches() {
        let text = "Three approaches:\n1. Approach 1: Copper fungicide every 10 days.\n2) Neem oil spray.\n3: Integrated pest management.\nNote";
        assert_eq!(
            parse_numbered(text),
            vec![
                "Copper fungicide every 10 days.",
                "Neem oil spray.",
                "Integrated pest management."
            ]
        );
    }

    #[test]
    fn test_extract_actions() {
        let (reply, actions) =
            extract_actions("Soil moisture is 48%.\nACTION: Irrigate today\nACTION:  \nACTION: Recheck tomorrow");
        assert_eq!(reply, "Soil moisture is 48%.");
        assert_eq!(actions, vec!["Irrigate today", "Recheck tomorrow"]);
    }

    #[test]
    fn test_gemini_response_text() {
        let parsed: GenerateResponse = serde_json::from_str(
            r#"{"candidates":[{"content":{"parts":[{"text":" Hello "},{"text":"world"}]}}]}"#,
        )
        .unwrap();
        assert_eq!(parsed.text().as_deref(), Some("Hello world"));

        let empty: GenerateResponse = serde_json::from_str(r#"{"candidates":[]}"#).unwrap();
        assert_eq!(empty.text(), None);
    }

    #[test]
    fn test_recommender_fallbacks() {
        tokio_test::block_on(async {
            let request = || EnrichmentRequest::new("test", "prompt");

            let items = stub(Some("- one\n- two\n- three"))
                .bullets(request(), BulletStyle::Marked, Some(2), FALLBACK)
                .await;
            assert_eq!(items, vec!["one", "two"]);

            let items = stub(None)
                .bullets(request(), BulletStyle::Marked, None, FALLBACK)
                .await;
            assert_eq!(items, vec!["service unavailable"]);

            let items = stub(Some("   "))
                .bullets(request(), BulletStyle::Marked, None, FALLBACK)
                .await;
            assert_eq!(items, vec!["nothing returned"]);

            let items = stub(Some("Just prose."))
                .bullets(request(), BulletStyle::Marked, None, FALLBACK)
                .await;
            assert_eq!(items, vec!["keep monitoring"]);

            let items = Recommender::disabled()
                .bullets(request(), BulletStyle::Marked, None, CannedText::default())
                .await;
            assert!(items.is_empty());

            assert_eq!(stub(None).text(request()).await, None);
            assert_eq!(stub(Some(" ok ")).text(request()).await.as_deref(), Some("ok"));
        });
    }
}

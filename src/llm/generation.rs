//! Provider-neutral view of a text generation.
//!
//! Each client normalises its wire format into [`Generation`]; the answer
//! assembler decides what a given completion state means for the user.

use crate::error::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Why the model stopped producing tokens.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum FinishReason {
    /// Natural end of the answer.
    Stop,
    /// Output budget exhausted; the text is truncated but usable.
    MaxTokens,
    Safety,
    Recitation,
    Blocklist,
    ProhibitedContent,
    /// Sensitive personally identifiable information.
    Spii,
    /// The model declined explicitly.
    Refusal,
    /// Any provider code this crate does not know.
    Other(String),
}

impl FinishReason {
    /// Map a provider finish code (Gemini or OpenAI spelling).
    pub fn from_code(code: &str) -> Self {
        match code.to_ascii_uppercase().as_str() {
            "STOP" | "END_TURN" => FinishReason::Stop,
            "MAX_TOKENS" | "LENGTH" => FinishReason::MaxTokens,
            "SAFETY" | "CONTENT_FILTER" => FinishReason::Safety,
            "RECITATION" => FinishReason::Recitation,
            "BLOCKLIST" => FinishReason::Blocklist,
            "PROHIBITED_CONTENT" => FinishReason::ProhibitedContent,
            "SPII" => FinishReason::Spii,
            "REFUSAL" => FinishReason::Refusal,
            _ => FinishReason::Other(code.to_string()),
        }
    }

    /// Whether the candidate text can be shown as an answer.
    pub fn is_normal(&self) -> bool {
        matches!(self, FinishReason::Stop | FinishReason::MaxTokens)
    }
}

impl fmt::Display for FinishReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let code = match self {
            FinishReason::Stop => "STOP",
            FinishReason::MaxTokens => "MAX_TOKENS",
            FinishReason::Safety => "SAFETY",
            FinishReason::Recitation => "RECITATION",
            FinishReason::Blocklist => "BLOCKLIST",
            FinishReason::ProhibitedContent => "PROHIBITED_CONTENT",
            FinishReason::Spii => "SPII",
            FinishReason::Refusal => "REFUSAL",
            FinishReason::Other(code) => code.as_str(),
        };
        f.write_str(code)
    }
}

/// A provider's safety classification for one harm category.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SafetyRating {
    pub category: String,
    pub probability: String,
    #[serde(default)]
    pub blocked: bool,
}

/// The first (and only requested) completion.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Candidate {
    pub text: String,
    pub finish_reason: Option<FinishReason>,
    pub safety_ratings: Vec<SafetyRating>,
}

/// Feedback about the prompt itself, present when the prompt was blocked.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct PromptFeedback {
    pub block_reason: Option<String>,
    pub safety_ratings: Vec<SafetyRating>,
}

/// Normalised provider response.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Generation {
    pub candidate: Option<Candidate>,
    pub prompt_feedback: Option<PromptFeedback>,
}

impl Generation {
    /// A normal completion with `text`.
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            candidate: Some(Candidate {
                text: text.into(),
                finish_reason: Some(FinishReason::Stop),
                safety_ratings: Vec::new(),
            }),
            prompt_feedback: None,
        }
    }
}

/// A text generation service.
#[async_trait]
pub trait GenerativeProvider: Send + Sync {
    /// Generate a completion for a single-turn prompt.
    async fn generate(&self, prompt: &str) -> Result<Generation>;

    /// Model identifier, for logs and reports.
    fn model(&self) -> &str;
}

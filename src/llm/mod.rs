//! LLM integration module.
//!
//! Provides the Gemini and OpenAI-compatible clients behind the
//! [`GenerativeProvider`] trait, and the grounded-answer prompt.

mod client;
mod gemini;
mod generation;
mod prompts;

pub use client::{LlmClient, Message, Role};
pub use gemini::GeminiClient;
pub use generation::{
    Candidate, FinishReason, Generation, GenerativeProvider, PromptFeedback, SafetyRating,
};
pub use prompts::Prompts;

use crate::config::{LlmConfig, LlmProvider};
use crate::error::Result;
use std::sync::Arc;

/// Build the generator selected in `config`.
pub fn from_config(config: &LlmConfig) -> Result<Arc<dyn GenerativeProvider>> {
    match config.provider {
        LlmProvider::Gemini => Ok(Arc::new(GeminiClient::new(config.clone())?)),
        LlmProvider::OpenAi => Ok(Arc::new(LlmClient::new(config.clone())?)),
    }
}

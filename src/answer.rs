//! Grounded answer assembly.
//!
//! Builds the grounding prompt from ranked passages, calls the generator once and
//! folds whatever came back into a single [`AnswerOutcome`].

use crate::language::Language;
use crate::llm::{FinishReason, Generation, GenerativeProvider, Prompts, SafetyRating};
use crate::retrieval::RetrievedPassage;
use serde::{Deserialize, Serialize};
use std::fmt;

/// What the user gets back for one question.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum AnswerOutcome {
    Answered {
        text: String,
    },
    /// The provider declined to answer or blocked the prompt.
    Refused {
        reason: String,
        safety_ratings: Vec<SafetyRating>,
    },
    /// Retrieval found nothing; the generator was not called.
    NoContext,
    ProviderError {
        detail: String,
    },
}

impl AnswerOutcome {
    /// Short label used in reports.
    pub fn kind(&self) -> OutcomeKind {
        match self {
            AnswerOutcome::Answered { .. } => OutcomeKind::Answered,
            AnswerOutcome::Refused { .. } => OutcomeKind::Refused,
            AnswerOutcome::NoContext => OutcomeKind::NoContext,
            AnswerOutcome::ProviderError { .. } => OutcomeKind::ProviderError,
        }
    }

    /// Generated text, only for answered requests.
    pub fn answer_text(&self) -> Option<&str> {
        match self {
            AnswerOutcome::Answered { text } => Some(text),
            _ => None,
        }
    }

    /// Text shown to an end user for any outcome.
    pub fn display_text(&self, language: Language) -> String {
        match (self, language) {
            (AnswerOutcome::Answered { text }, _) => text.clone(),
            (AnswerOutcome::Refused { reason, .. }, Language::Spanish) => {
                format!("El modelo no generó una respuesta (motivo: {}).", reason)
            }
            (AnswerOutcome::Refused { reason, .. }, Language::English) => {
                format!("The model declined to answer (reason: {}).", reason)
            }
            (AnswerOutcome::NoContext, Language::Spanish) => {
                "No se encontraron documentos relevantes para la consulta.".to_string()
            }
            (AnswerOutcome::NoContext, Language::English) => {
                "No relevant documents were found for the query.".to_string()
            }
            (AnswerOutcome::ProviderError { detail }, Language::Spanish) => {
                format!("Error al generar la respuesta: {}", detail)
            }
            (AnswerOutcome::ProviderError { detail }, Language::English) => {
                format!("Error while generating the answer: {}", detail)
            }
        }
    }
}

/// Outcome label carried by evaluation records. `Error` marks pairs that never
/// reached answer assembly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutcomeKind {
    Answered,
    Refused,
    NoContext,
    ProviderError,
    Error,
}

impl OutcomeKind {
    pub const ALL: [OutcomeKind; 5] = [
        OutcomeKind::Answered,
        OutcomeKind::Refused,
        OutcomeKind::NoContext,
        OutcomeKind::ProviderError,
        OutcomeKind::Error,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            OutcomeKind::Answered => "answered",
            OutcomeKind::Refused => "refused",
            OutcomeKind::NoContext => "no_context",
            OutcomeKind::ProviderError => "provider_error",
            OutcomeKind::Error => "error",
        }
    }
}

impl fmt::Display for OutcomeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Join passage contents in rank order, separated by a blank line.
pub fn build_context(passages: &[RetrievedPassage]) -> String {
    passages
        .iter()
        .map(|p| p.content.as_str())
        .collect::<Vec<_>>()
        .join("\n\n")
}

/// Answer `query` from `passages` only.
pub async fn assemble(
    generator: &dyn GenerativeProvider,
    language: Language,
    query: &str,
    passages: &[RetrievedPassage],
) -> AnswerOutcome {
    if passages.is_empty() {
        return AnswerOutcome::NoContext;
    }

    let prompt = Prompts::render_grounded_answer(language, &build_context(passages), query);

    match generator.generate(&prompt).await {
        Ok(generation) => interpret(generation),
        Err(err) => {
            tracing::warn!(model = generator.model(), error = %err, "generation failed");
            AnswerOutcome::ProviderError {
                detail: err.to_string(),
            }
        }
    }
}

/// Fold a provider response into an outcome.
pub fn interpret(generation: Generation) -> AnswerOutcome {
    let Some(candidate) = generation.candidate else {
        return match generation.prompt_feedback {
            Some(feedback) => AnswerOutcome::Refused {
                reason: feedback
                    .block_reason
                    .unwrap_or_else(|| "BLOCKED".to_string()),
                safety_ratings: feedback.safety_ratings,
            },
            None => AnswerOutcome::ProviderError {
                detail: "provider returned no candidate".to_string(),
            },
        };
    };

    // A missing finish reason with text is treated as a normal stop.
    let reason = candidate.finish_reason.unwrap_or(FinishReason::Stop);
    if reason.is_normal() {
        let text = candidate.text.trim();
        if text.is_empty() {
            return AnswerOutcome::ProviderError {
                detail: format!("empty completion (finish reason {})", reason),
            };
        }
        return AnswerOutcome::Answered {
            text: text.to_string(),
        };
    }

    AnswerOutcome::Refused {
        reason: reason.to_string(),
        safety_ratings: candidate.safety_ratings,
    }
}

//! LLM prompts for grounded answering.

use crate::language::Language;

/// Collection of prompts used by the answer assembler.
pub struct Prompts;

impl Prompts {
    /// Prompt that confines the model to the retrieved context.
    ///
    /// Placeholders: `{context}`, `{query}`, `{fallback}`.
    pub fn grounded_answer(language: Language) -> &'static str {
        match language {
            Language::Spanish => {
                r#"Eres un asistente que responde preguntas usando únicamente el contexto proporcionado.

Instrucciones:
- Responde solo con información que aparezca en el contexto. No uses conocimiento externo.
- Si el contexto no permite responder la pregunta, responde exactamente: "{fallback}"
- Responde en español, de forma clara y concisa.

Contexto:
{context}

Pregunta: {query}

Respuesta:"#
            }
            Language::English => {
                r#"You are an assistant that answers questions using only the provided context.

Instructions:
- Answer only with information that appears in the context. Do not use outside knowledge.
- If the context does not allow you to answer the question, reply exactly: "{fallback}"
- Answer in English, clearly and concisely.

Context:
{context}

Question: {query}

Answer:"#
            }
        }
    }

    /// Fill the grounded-answer template.
    pub fn render_grounded_answer(language: Language, context: &str, query: &str) -> String {
        render(
            Self::grounded_answer(language),
            &[
                ("fallback", language.insufficient_information()),
                ("context", context),
                ("query", query),
            ],
        )
    }
}

/// Fill `{name}` placeholders in one pass; substituted text is never rescanned.
fn render(template: &str, values: &[(&str, &str)]) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;

    while let Some(open) = rest.find('{') {
        out.push_str(&rest[..open]);
        let tail = &rest[open + 1..];
        let value = tail.find('}').and_then(|close| {
            values
                .iter()
                .find(|(name, _)| *name == &tail[..close])
                .map(|(_, value)| (*value, close))
        });
        match value {
            Some((value, close)) => {
                out.push_str(value);
                rest = &tail[close + 1..];
            }
            None => {
                out.push('{');
                rest = tail;
            }
        }
    }
    out.push_str(rest);
    out
}

//! Corpus working language.
//!
//! The language drives sentence segmentation (abbreviations), the stemmer used by
//! ROUGE-L, and the language the generator is asked to answer in.

use crate::error::{RagError, Result};
use rust_stemmers::Algorithm;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Supported corpus languages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Language {
    #[default]
    #[serde(rename = "es", alias = "spanish")]
    Spanish,
    #[serde(rename = "en", alias = "english")]
    English,
}

const SPANISH_ABBREVIATIONS: &[&str] = &[
    "sr", "sra", "srta", "sres", "dr", "dra", "lic", "ing", "arq", "prof", "ud", "uds", "vd",
    "vds", "etc", "ej", "pág", "págs", "pag", "núm", "num", "art", "arts", "av", "avda",
    "cap", "cía", "dpto", "admón", "aprox", "gral", "cnel", "tte", "cmte", "mons", "sto",
    "sta", "vol", "fig", "tel", "vs", "ee", "uu", "ss",
];

const ENGLISH_ABBREVIATIONS: &[&str] = &[
    "mr", "mrs", "ms", "dr", "prof", "sr", "jr", "st", "vs", "etc", "e.g", "i.e", "fig",
    "vol", "approx", "dept", "inc", "ltd", "co", "corp", "gen", "col", "u.s",
];

const SPANISH_NAME_LEADS: &[&str] = &[
    "por", "de", "del", "y", "e", "a", "al", "con", "según", "para", "señor", "señora", "don",
    "doña", "firmado", "firmada",
];

const ENGLISH_NAME_LEADS: &[&str] = &["by", "and", "of", "to", "with", "from", "for", "signed"];

impl Language {
    /// ISO 639-1 code.
    pub fn code(&self) -> &'static str {
        match self {
            Language::Spanish => "es",
            Language::English => "en",
        }
    }

    /// Name of the language written in the language itself, used in prompts.
    pub fn native_name(&self) -> &'static str {
        match self {
            Language::Spanish => "español",
            Language::English => "English",
        }
    }

    /// Snowball stemmer for this language.
    pub fn stemmer_algorithm(&self) -> Algorithm {
        match self {
            Language::Spanish => Algorithm::Spanish,
            Language::English => Algorithm::English,
        }
    }

    /// Lowercase abbreviations (without the trailing period) that never end a sentence.
    pub fn abbreviations(&self) -> &'static [&'static str] {
        match self {
            Language::Spanish => SPANISH_ABBREVIATIONS,
            Language::English => ENGLISH_ABBREVIATIONS,
        }
    }

    /// Lowercase words after which a capital letter and period read as a name initial.
    pub fn name_leads(&self) -> &'static [&'static str] {
        match self {
            Language::Spanish => SPANISH_NAME_LEADS,
            Language::English => ENGLISH_NAME_LEADS,
        }
    }

    /// The sentence the generator must emit when the context cannot answer the question.
    pub fn insufficient_information(&self) -> &'static str {
        match self {
            Language::Spanish => {
                "No tengo información suficiente en el contexto para responder a esta pregunta."
            }
            Language::English => {
                "I do not have enough information in the context to answer this question."
            }
        }
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl FromStr for Language {
    type Err = RagError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "es" | "spanish" | "español" => Ok(Language::Spanish),
            "en" | "english" => Ok(Language::English),
            other => Err(RagError::Config(format!(
                "Unsupported corpus language '{}'. Use 'es' or 'en'.",
                other
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_language() {
        assert_eq!("es".parse::<Language>().unwrap(), Language::Spanish);
        assert_eq!("English".parse::<Language>().unwrap(), Language::English);
        assert!("fr".parse::<Language>().is_err());
    }

    #[test]
    fn test_default_is_spanish() {
        assert_eq!(Language::default(), Language::Spanish);
        assert_eq!(Language::default().code(), "es");
    }

    #[test]
    fn test_serde_codes() {
        let json = serde_json::to_string(&Language::English).unwrap();
        assert_eq!(json, "\"en\"");
        let parsed: Language = serde_json::from_str("\"spanish\"").unwrap();
        assert_eq!(parsed, Language::Spanish);
    }
}

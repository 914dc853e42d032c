//! Language-aware sentence boundary detection.
//!
//! Rules, applied to whitespace-normalised paragraphs:
//! - a run of `.`, `!`, `?` or `…` (plus closing quotes/brackets) ends a sentence when it
//!   is followed by a space and then an uppercase letter, a digit, an inverted `¿`/`¡`
//!   or an opening quote/bracket;
//! - a single `.` after a known abbreviation never ends one, nor does one after a
//!   capital-letter initial in name position (see `introduces_initial`);
//! - a blank line always ends one.

use crate::language::Language;

const TERMINATORS: &[char] = &['.', '!', '?', '…'];
const CLOSERS: &[char] = &['"', '\'', '»', '”', '’', ')', ']'];
const OPENERS: &[char] = &['¿', '¡', '"', '“', '«', '(', '[', '\'', '‘', '-', '—'];

/// Splits raw text into sentences.
#[derive(Debug, Clone, Copy)]
pub struct SentenceSplitter {
    language: Language,
}

impl SentenceSplitter {
    /// Create a splitter for the given language.
    pub fn new(language: Language) -> Self {
        Self { language }
    }

    /// Split `text` into trimmed, whitespace-collapsed sentences.
    pub fn split(&self, text: &str) -> Vec<String> {
        paragraphs(text)
            .iter()
            .flat_map(|p| self.split_paragraph(p))
            .collect()
    }

    fn split_paragraph(&self, paragraph: &str) -> Vec<String> {
        let chars: Vec<char> = paragraph.chars().collect();
        let mut sentences = Vec::new();
        let mut start = 0;
        let mut i = 0;

        while i < chars.len() {
            if !TERMINATORS.contains(&chars[i]) {
                i += 1;
                continue;
            }

            let run_start = i;
            let mut end = i;
            while end < chars.len() && TERMINATORS.contains(&chars[end]) {
                end += 1;
            }
            while end < chars.len() && CLOSERS.contains(&chars[end]) {
                end += 1;
            }

            let boundary = end + 1 < chars.len()
                && chars[end] == ' '
                && starts_sentence(chars[end + 1])
                && !self.is_abbreviation(&chars[start..run_start], &chars[run_start..end]);

            if boundary {
                push_sentence(&mut sentences, &chars[start..end]);
                start = end + 1;
            }
            i = end.max(i + 1);
        }

        if start < chars.len() {
            push_sentence(&mut sentences, &chars[start..]);
        }

        sentences
    }

    /// True when a lone period closes an abbreviation or an initial rather than a sentence.
    fn is_abbreviation(&self, before: &[char], terminators: &[char]) -> bool {
        let periods_only = terminators
            .iter()
            .filter(|c| TERMINATORS.contains(c))
            .all(|c| *c == '.');
        let period_count = terminators.iter().filter(|c| **c == '.').count();
        if !periods_only || period_count != 1 {
            return false;
        }

        let mut words = before.split(|c| *c == ' ').filter(|w| !w.is_empty()).rev();
        let word: String = match words.next() {
            Some(w) => w.iter().skip_while(|c| OPENERS.contains(c)).collect(),
            None => return false,
        };

        let mut letters = word.chars();
        if let (Some(letter), None) = (letters.next(), letters.next()) {
            if letter.is_alphabetic() {
                return letter.is_uppercase() && self.introduces_initial(words.next());
            }
        }

        let word = word.to_lowercase();
        self.language.abbreviations().contains(&word.as_str())
    }

    /// A capital letter reads as an initial at the start of a sentence or clause, after
    /// a capitalised word or another initial, or after a word that introduces a name.
    /// Elsewhere ("vitamina C.", "plan B.") the period ends the sentence.
    fn introduces_initial(&self, previous: Option<&[char]>) -> bool {
        let Some(previous) = previous else {
            return true;
        };
        let word: String = previous
            .iter()
            .filter(|c| !OPENERS.contains(c) && !CLOSERS.contains(c))
            .collect();
        if word.ends_with(':') || word.chars().next().is_some_and(char::is_uppercase) {
            return true;
        }
        let word = word.trim_end_matches([',', ';']).to_lowercase();
        self.language.name_leads().contains(&word.as_str())
    }
}

fn starts_sentence(c: char) -> bool {
    c.is_uppercase() || c.is_ascii_digit() || OPENERS.contains(&c)
}

fn push_sentence(sentences: &mut Vec<String>, chars: &[char]) {
    let sentence: String = chars.iter().collect();
    let sentence = sentence.trim();
    if !sentence.is_empty() {
        sentences.push(sentence.to_string());
    }
}

/// Split on blank lines and collapse all whitespace inside each paragraph.
fn paragraphs(text: &str) -> Vec<String> {
    let mut out = Vec::new();
    let mut current: Vec<&str> = Vec::new();

    for line in text.lines() {
        if line.trim().is_empty() {
            if !current.is_empty() {
                out.push(collapse(&current));
                current.clear();
            }
        } else {
            current.push(line);
        }
    }
    if !current.is_empty() {
        out.push(collapse(&current));
    }

    out
}

fn collapse(lines: &[&str]) -> String {
    lines
        .iter()
        .flat_map(|l| l.split_whitespace())
        .collect::<Vec<_>>()
        .join(" ")
}

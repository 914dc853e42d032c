//! Ranking and answer-quality metrics.
//!
//! Recall@k and MRR@k compare retrieved chunk ids against the labelled relevant set.
//! ROUGE-L F1 compares the generated answer with the ideal one over stemmed tokens.

use crate::language::Language;
use rust_stemmers::Stemmer;
use std::collections::HashSet;

/// Tokens up to this many characters are not stemmed.
const MIN_STEM_LEN: usize = 3;

/// `|set(retrieved[:k]) ∩ relevant| / |relevant|`, or 0.0 when nothing is relevant.
pub fn recall_at_k(retrieved: &[String], relevant: &[String], k: usize) -> f64 {
    let relevant: HashSet<&str> = relevant.iter().map(String::as_str).collect();
    if relevant.is_empty() {
        return 0.0;
    }

    let top: HashSet<&str> = retrieved.iter().take(k).map(String::as_str).collect();
    let hits = top.intersection(&relevant).count();
    hits as f64 / relevant.len() as f64
}

/// Reciprocal rank of the first relevant id within the top `k`, or 0.0.
pub fn mrr_at_k(retrieved: &[String], relevant: &[String], k: usize) -> f64 {
    let relevant: HashSet<&str> = relevant.iter().map(String::as_str).collect();
    if relevant.is_empty() {
        return 0.0;
    }

    retrieved
        .iter()
        .take(k)
        .position(|id| relevant.contains(id.as_str()))
        .map(|index| 1.0 / (index as f64 + 1.0))
        .unwrap_or(0.0)
}

/// ROUGE-L scorer with a language-specific Snowball stemmer.
pub struct RougeScorer {
    stemmer: Stemmer,
}

impl RougeScorer {
    pub fn new(language: Language) -> Self {
        Self {
            stemmer: Stemmer::create(language.stemmer_algorithm()),
        }
    }

    /// Lowercased alphanumeric runs, stemmed when longer than three characters.
    pub fn tokenize(&self, text: &str) -> Vec<String> {
        text.to_lowercase()
            .split(|c: char| !c.is_alphanumeric())
            .filter(|t| !t.is_empty())
            .map(|t| {
                if t.chars().count() > MIN_STEM_LEN {
                    self.stemmer.stem(t).into_owned()
                } else {
                    t.to_string()
                }
            })
            .collect()
    }

    /// LCS-based F1 between `candidate` and `reference`; 0.0 if either has no tokens.
    pub fn rouge_l_f1(&self, candidate: &str, reference: &str) -> f64 {
        let candidate = self.tokenize(candidate);
        let reference = self.tokenize(reference);
        if candidate.is_empty() || reference.is_empty() {
            return 0.0;
        }

        let lcs = lcs_length(&candidate, &reference) as f64;
        if lcs == 0.0 {
            return 0.0;
        }
        let precision = lcs / candidate.len() as f64;
        let recall = lcs / reference.len() as f64;
        2.0 * precision * recall / (precision + recall)
    }
}

/// Longest common subsequence length, two-row dynamic programming.
fn lcs_length(a: &[String], b: &[String]) -> usize {
    let mut previous = vec![0usize; b.len() + 1];
    let mut current = vec![0usize; b.len() + 1];

    for x in a {
        for (j, y) in b.iter().enumerate() {
            current[j + 1] = if x == y {
                previous[j] + 1
            } else {
                current[j].max(previous[j + 1])
            };
        }
        std::mem::swap(&mut previous, &mut current);
    }

    previous[b.len()]
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn ids(values: &[&str]) -> Vec<String> {
        values.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_recall_and_mrr_example() {
        let retrieved = ids(&["c3", "c1", "c9"]);
        let relevant = ids(&["c1", "c2"]);
        assert!((recall_at_k(&retrieved, &relevant, 3) - 0.5).abs() < 1e-9);
        assert!((mrr_at_k(&retrieved, &relevant, 3) - 0.5).abs() < 1e-9);
    }

    #[test]
    fn test_cutoff_applies() {
        let retrieved = ids(&["c3", "c9", "c1"]);
        let relevant = ids(&["c1"]);
        assert_eq!(recall_at_k(&retrieved, &relevant, 2), 0.0);
        assert_eq!(mrr_at_k(&retrieved, &relevant, 2), 0.0);
        assert!((mrr_at_k(&retrieved, &relevant, 3) - 1.0 / 3.0).abs() < 1e-9);
    }

    #[test]
    fn test_empty_relevant_scores_zero() {
        let retrieved = ids(&["c1"]);
        assert_eq!(recall_at_k(&retrieved, &[], 5), 0.0);
        assert_eq!(mrr_at_k(&retrieved, &[], 5), 0.0);
    }

    #[test]
    fn test_duplicate_labels_do_not_inflate_recall() {
        let retrieved = ids(&["c1"]);
        let relevant = ids(&["c1", "c1", "c2"]);
        assert!((recall_at_k(&retrieved, &relevant, 5) - 0.5).abs() < 1e-9);
    }

    #[test]
    fn test_rouge_identical_and_disjoint() {
        let scorer = RougeScorer::new(Language::Spanish);
        assert!((scorer.rouge_l_f1("El tratado se firmó.", "el tratado se firmó") - 1.0).abs() < 1e-9);
        assert_eq!(scorer.rouge_l_f1("uno dos", "tres cuatro"), 0.0);
        assert_eq!(scorer.rouge_l_f1("", "algo"), 0.0);
        assert_eq!(scorer.rouge_l_f1("¿?", "algo"), 0.0);
    }

    #[test]
    fn test_rouge_stems_spanish_inflections() {
        let scorer = RougeScorer::new(Language::Spanish);
        assert_eq!(scorer.tokenize("las canciones"), vec!["las", "cancion"]);
        assert_eq!(scorer.tokenize("la canción"), vec!["la", "cancion"]);

        // Only the stem matches: LCS = 1, P = R = 1/2.
        let score = scorer.rouge_l_f1("las canciones", "la canción");
        assert!((score - 0.5).abs() < 1e-9, "score was {}", score);
    }

    #[test]
    fn test_rouge_partial_overlap() {
        let scorer = RougeScorer::new(Language::English);
        // LCS = "the cat on mat" (4); P = 4/6, R = 4/5.
        let score = scorer.rouge_l_f1("the cat sat on the mat", "the cat lay on mat");
        let p = 4.0 / 6.0;
        let r = 4.0 / 5.0;
        assert!((score - 2.0 * p * r / (p + r)).abs() < 1e-9);
    }

    #[test]
    fn test_tokenize_keeps_accents_and_digits() {
        let scorer = RougeScorer::new(Language::Spanish);
        assert_eq!(scorer.tokenize("Año 1990, ¡sí!"), vec!["año", "1990", "sí"]);
    }

    proptest! {
        #[test]
        fn prop_recall_monotone_in_k(
            retrieved in prop::collection::vec(0u8..20, 0..15),
            relevant in prop::collection::vec(0u8..20, 0..6),
            k in 1usize..15,
        ) {
            let retrieved: Vec<String> = retrieved.iter().map(|i| format!("c{}", i)).collect();
            let relevant: Vec<String> = relevant.iter().map(|i| format!("c{}", i)).collect();
            let smaller = recall_at_k(&retrieved, &relevant, k);
            let larger = recall_at_k(&retrieved, &relevant, k + 1);
            prop_assert!(smaller <= larger);
            prop_assert!((0.0..=1.0).contains(&larger));
        }

        #[test]
        fn prop_mrr_is_reciprocal_rank(
            retrieved in prop::collection::vec(0u8..20, 0..15),
            relevant in prop::collection::vec(0u8..20, 0..6),
            k in 1usize..15,
        ) {
            let retrieved: Vec<String> = retrieved.iter().map(|i| format!("c{}", i)).collect();
            let relevant: Vec<String> = relevant.iter().map(|i| format!("c{}", i)).collect();
            let mrr = mrr_at_k(&retrieved, &relevant, k);
            let allowed = mrr == 0.0 || (1..=k).any(|r| (mrr - 1.0 / r as f64).abs() < 1e-12);
            prop_assert!(allowed, "mrr {} not in the allowed set for k={}", mrr, k);
        }

        #[test]
        fn prop_rouge_in_unit_interval(a in "[a-zñ ]{0,40}", b in "[a-zñ ]{0,40}") {
            let scorer = RougeScorer::new(Language::Spanish);
            let score = scorer.rouge_l_f1(&a, &b);
            prop_assert!((0.0..=1.0 + 1e-9).contains(&score));
        }
    }
}

use std::sync::LazyLock;

use regex::Regex;
use unicode_segmentation::UnicodeSegmentation;

use crate::error::VerifyError;
use crate::types::Claim;

/// Verbs that mark a sentence as stating a checkable fact.
static FACTUAL_VERB_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)\b(is|was|are|were|won|died|born|founded|established|announced|reported|has|have|had)\b",
    )
    .expect("factual verb pattern")
});

/// Leading words of imperative or hortative sentences.
const IMPERATIVE_OPENERS: &[&str] = &[
    "please", "consider", "remember", "note", "imagine", "let", "do", "don't",
];

pub type SentencePredicate = Box<dyn Fn(&str) -> bool + Send + Sync>;

/// A conjunction of predicates a sentence must pass to count as a claim.
///
/// The predicate set is the swap point for alternate extraction strategies;
/// retrieval and scoring never see rejected sentences.
pub struct ClaimFilter {
    predicates: Vec<SentencePredicate>,
}

impl ClaimFilter {
    pub fn new(predicates: Vec<SentencePredicate>) -> Self {
        Self { predicates }
    }

    /// The default filter: long enough, declarative, and carrying a factual
    /// indicator (a stative/reporting verb or a digit).
    pub fn declarative_factual(min_chars: usize) -> Self {
        Self::new(vec![
            Box::new(move |s: &str| s.len() >= min_chars),
            Box::new(|s: &str| s.unicode_words().count() >= 4),
            Box::new(|s: &str| !s.trim_end().ends_with('?')),
            Box::new(|s: &str| {
                s.unicode_words()
                    .next()
                    .map(|w| !IMPERATIVE_OPENERS.contains(&w.to_lowercase().as_str()))
                    .unwrap_or(false)
            }),
            Box::new(|s: &str| {
                FACTUAL_VERB_RE.is_match(s) || s.chars().any(|c| c.is_ascii_digit())
            }),
        ])
    }

    pub fn accept(&self, sentence: &str) -> bool {
        self.predicates.iter().all(|p| p(sentence))
    }
}

/// Splits `text` into sentences and keeps the first `max_claims` that pass
/// `filter`, in source order.
///
/// Finding no claims is not an error; the caller short-circuits to a neutral
/// verdict. Errors only signal a non-text payload.
pub fn extract_claims(
    text: &str,
    max_claims: usize,
    filter: &ClaimFilter,
) -> Result<Vec<Claim>, VerifyError> {
    if text
        .chars()
        .any(|c| c.is_control() && !matches!(c, '\n' | '\r' | '\t'))
    {
        return Err(VerifyError::ClaimExtraction(
            "input contains non-text control characters".into(),
        ));
    }

    let mut claims = Vec::new();
    for (position, sentence) in text.unicode_sentences().enumerate() {
        let s = sentence.trim();
        if s.is_empty() || !filter.accept(s) {
            continue;
        }
        claims.push(Claim {
            text: s.to_string(),
            position,
        });
        if claims.len() == max_claims {
            break;
        }
    }
    Ok(claims)
}

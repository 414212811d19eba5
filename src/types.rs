use serde::{Deserialize, Serialize};

/// Discrete verdict for a claim or for the whole input.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Label {
    True,
    False,
    Neutral,
}

/// A short factual statement extracted from the input text.
///
/// `position` is the sentence ordinal in the source text, so verdicts can be
/// mapped back to the passage they came from.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claim {
    pub text: String,
    pub position: usize,
}

/// A unit of trusted reference text with a known source and its embedding.
///
/// Snippets are immutable once the index artifact is built; `vector` is
/// L2-normalized so inner product equals cosine similarity.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvidenceSnippet {
    pub text: String,
    pub source_id: String,
    pub vector: Vec<f32>,
}

/// One nearest-neighbor hit for a claim.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrievedEvidence {
    pub snippet: EvidenceSnippet,
    /// Cosine similarity between claim and snippet vectors; higher is closer.
    pub retrieval_score: f32,
}

/// Entailment score for one (claim, evidence) pair.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EntailmentResult {
    pub evidence: RetrievedEvidence,
    /// Probability mass the NLI model puts on "evidence entails claim".
    pub support_score: f32,
}

/// Verdict for a single claim.
///
/// `best_evidence` carries the maximum support score among all results
/// computed for the claim; it is `None` only when retrieval produced
/// nothing, in which case the label is `Neutral` with confidence 0.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClaimVerdict {
    pub claim: Claim,
    pub label: Label,
    pub confidence: f32,
    pub best_evidence: Option<EntailmentResult>,
}

/// Terminal output of the pipeline.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OverallVerdict {
    pub label: Label,
    pub confidence: f32,
    pub claim_verdicts: Vec<ClaimVerdict>,
}

impl OverallVerdict {
    /// Verdict for input that yielded no claims.
    pub fn empty() -> Self {
        Self {
            label: Label::Neutral,
            confidence: 0.0,
            claim_verdicts: Vec::new(),
        }
    }
}

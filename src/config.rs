use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::error::VerifyError;

/// Weights applied to per-claim labels in the overall vote.
///
/// Defaults give full weight to definite labels and half weight to neutral
/// ones; ties between labels resolve in the fixed order false > true >
/// neutral (see [`crate::classify::overall_verdict`]).
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct VoteWeights {
    pub true_vote: f32,
    pub false_vote: f32,
    pub neutral_vote: f32,
}

impl Default for VoteWeights {
    fn default() -> Self {
        Self {
            true_vote: 1.0,
            false_vote: 1.0,
            neutral_vote: 0.5,
        }
    }
}

/// Tunables of the verification pipeline.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VerifierConfig {
    /// Best support score at or above this labels a claim `true`.
    pub truth_threshold: f32,
    /// Best support score below this labels a claim `false`.
    pub falsehood_threshold: f32,
    /// Evidence snippets retrieved per claim.
    pub top_k_proofs: usize,
    /// Cap on claims extracted from one input, in source order.
    pub max_claims: usize,
    /// Sentences shorter than this are not considered claims.
    pub min_claim_chars: usize,
    /// Claims scored concurrently within one request.
    pub claim_concurrency: usize,
    pub vote: VoteWeights,
}

impl Default for VerifierConfig {
    fn default() -> Self {
        Self {
            truth_threshold: 0.85,
            falsehood_threshold: 0.4,
            top_k_proofs: 6,
            max_claims: 8,
            min_claim_chars: 30,
            claim_concurrency: 4,
            vote: VoteWeights::default(),
        }
    }
}

impl VerifierConfig {
    /// Rejects configurations the pipeline cannot run with. Called once at
    /// startup; an invalid config must block the service from starting.
    pub fn validate(&self) -> Result<(), VerifyError> {
        if !(0.0..=1.0).contains(&self.truth_threshold)
            || !(0.0..=1.0).contains(&self.falsehood_threshold)
        {
            return Err(VerifyError::Config(
                "thresholds must lie in [0, 1]".into(),
            ));
        }
        if self.truth_threshold <= self.falsehood_threshold {
            return Err(VerifyError::Config(format!(
                "truth_threshold ({}) must be greater than falsehood_threshold ({})",
                self.truth_threshold, self.falsehood_threshold
            )));
        }
        if self.top_k_proofs == 0 {
            return Err(VerifyError::Config("top_k_proofs must be at least 1".into()));
        }
        if self.max_claims == 0 {
            return Err(VerifyError::Config("max_claims must be at least 1".into()));
        }
        if self.claim_concurrency == 0 {
            return Err(VerifyError::Config(
                "claim_concurrency must be at least 1".into(),
            ));
        }
        Ok(())
    }
}

/// Logit positions in the NLI model output.
///
/// Defaults match the roberta-large-mnli head: [contradiction, neutral,
/// entailment].
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct NliLabelLayout {
    pub contradiction: usize,
    pub neutral: usize,
    pub entailment: usize,
}

impl Default for NliLabelLayout {
    fn default() -> Self {
        Self {
            contradiction: 0,
            neutral: 1,
            entailment: 2,
        }
    }
}

/// File locations and inference settings for the ONNX-backed services.
#[derive(Debug, Clone)]
pub struct ModelConfig {
    pub embedding_model: PathBuf,
    pub embedding_tokenizer: PathBuf,
    pub nli_model: PathBuf,
    pub nli_tokenizer: PathBuf,
    pub index_path: PathBuf,
    /// Maximum sequence length for tokenization.
    pub max_length: usize,
    pub nli_labels: NliLabelLayout,
    /// Intra-op threads per session; 0 lets the runtime decide.
    pub num_threads: usize,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            embedding_model: PathBuf::from("models/embedding/model.onnx"),
            embedding_tokenizer: PathBuf::from("models/embedding/tokenizer.json"),
            nli_model: PathBuf::from("models/nli/model.onnx"),
            nli_tokenizer: PathBuf::from("models/nli/tokenizer.json"),
            index_path: PathBuf::from("data/evidence_index.json"),
            max_length: 256,
            nli_labels: NliLabelLayout::default(),
            num_threads: 0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        assert!(VerifierConfig::default().validate().is_ok());
    }

    #[test]
    fn rejects_inverted_thresholds() {
        let cfg = VerifierConfig {
            truth_threshold: 0.3,
            falsehood_threshold: 0.4,
            ..Default::default()
        };
        assert!(matches!(cfg.validate(), Err(VerifyError::Config(_))));
    }

    #[test]
    fn rejects_equal_thresholds() {
        let cfg = VerifierConfig {
            truth_threshold: 0.5,
            falsehood_threshold: 0.5,
            ..Default::default()
        };
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn rejects_out_of_range_thresholds() {
        let cfg = VerifierConfig {
            truth_threshold: 1.2,
            ..Default::default()
        };
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn rejects_zero_top_k() {
        let cfg = VerifierConfig {
            top_k_proofs: 0,
            ..Default::default()
        };
        assert!(cfg.validate().is_err());
    }
}

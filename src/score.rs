use std::sync::Arc;

use crate::error::VerifyError;
use crate::models::EntailmentModel;
use crate::types::{Claim, EntailmentResult, RetrievedEvidence};

/// Scores every (claim, evidence) pair through the entailment model.
///
/// Evidence is the premise, the claim is the hypothesis; the support score
/// is the probability mass on entailment. A failure for any pair aborts the
/// claim's processing rather than dropping the pair.
pub struct EntailmentScorer {
    model: Arc<dyn EntailmentModel>,
}

impl EntailmentScorer {
    pub fn new(model: Arc<dyn EntailmentModel>) -> Self {
        Self { model }
    }

    /// One result per retrieved snippet, in input order.
    pub async fn score(
        &self,
        claim: &Claim,
        evidence: Vec<RetrievedEvidence>,
    ) -> Result<Vec<EntailmentResult>, VerifyError> {
        if evidence.is_empty() {
            return Ok(Vec::new());
        }

        let pairs: Vec<(String, String)> = evidence
            .iter()
            .map(|ev| (ev.snippet.text.clone(), claim.text.clone()))
            .collect();
        let scores = self
            .model
            .entail(pairs)
            .await
            .map_err(|e| VerifyError::EntailmentScoring(e.to_string()))?;
        if scores.len() != evidence.len() {
            return Err(VerifyError::EntailmentScoring(format!(
                "model returned {} scores for {} pairs",
                scores.len(),
                evidence.len()
            )));
        }

        Ok(evidence
            .into_iter()
            .zip(scores)
            .map(|(ev, s)| EntailmentResult {
                evidence: ev,
                support_score: s.entailment,
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::NliScores;
    use crate::types::EvidenceSnippet;
    use async_trait::async_trait;

    struct KeywordNli;
    #[async_trait]
    impl EntailmentModel for KeywordNli {
        async fn entail(&self, pairs: Vec<(String, String)>) -> anyhow::Result<Vec<NliScores>> {
            Ok(pairs
                .iter()
                .map(|(premise, _)| {
                    let entailment = if premise.contains("1879") { 0.95 } else { 0.2 };
                    NliScores {
                        entailment,
                        neutral: (1.0 - entailment) / 2.0,
                        contradiction: (1.0 - entailment) / 2.0,
                    }
                })
                .collect())
        }
    }

    struct BrokenNli;
    #[async_trait]
    impl EntailmentModel for BrokenNli {
        async fn entail(&self, _pairs: Vec<(String, String)>) -> anyhow::Result<Vec<NliScores>> {
            anyhow::bail!("model crashed")
        }
    }

    fn hit(text: &str, retrieval_score: f32) -> RetrievedEvidence {
        RetrievedEvidence {
            snippet: EvidenceSnippet {
                text: text.into(),
                source_id: "kb:test".into(),
                vector: vec![1.0],
            },
            retrieval_score,
        }
    }

    fn claim() -> Claim {
        Claim {
            text: "Einstein was born in 1879.".into(),
            position: 0,
        }
    }

    #[tokio::test]
    async fn scores_preserve_evidence_order() {
        let scorer = EntailmentScorer::new(Arc::new(KeywordNli));
        let results = scorer
            .score(
                &claim(),
                vec![hit("Born in 1879 in Ulm.", 0.9), hit("Unrelated text.", 0.5)],
            )
            .await
            .unwrap();
        assert_eq!(results.len(), 2);
        assert!((results[0].support_score - 0.95).abs() < 1e-6);
        assert!((results[1].support_score - 0.2).abs() < 1e-6);
        assert!((results[0].evidence.retrieval_score - 0.9).abs() < 1e-6);
    }

    #[tokio::test]
    async fn no_evidence_yields_no_results() {
        let scorer = EntailmentScorer::new(Arc::new(KeywordNli));
        assert!(scorer.score(&claim(), Vec::new()).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn model_failure_aborts_the_claim() {
        let scorer = EntailmentScorer::new(Arc::new(BrokenNli));
        let err = scorer
            .score(&claim(), vec![hit("anything", 0.1)])
            .await
            .unwrap_err();
        assert!(matches!(err, VerifyError::EntailmentScoring(_)));
    }
}

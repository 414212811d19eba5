//! Verdict aggregation and the end-to-end pipeline.
//!
//! Per-claim rule: the best evidence is the entailment result with the
//! maximum support score (ties broken by higher retrieval score, then input
//! order); the label follows the two thresholds. Overall rule: a weighted
//! vote over claim labels where definite labels carry full weight and
//! neutral carries half, ties resolving false > true > neutral.

use std::sync::Arc;

use futures::{stream, StreamExt};
use tracing::debug;

use crate::config::{VerifierConfig, VoteWeights};
use crate::error::VerifyError;
use crate::extract::{extract_claims, ClaimFilter};
use crate::registry::ModelRegistry;
use crate::retrieve::EvidenceRetriever;
use crate::score::EntailmentScorer;
use crate::types::{Claim, ClaimVerdict, EntailmentResult, Label, OverallVerdict};

/// Tie order of the overall vote: when weights are equal, assume the worse
/// outcome.
const TIE_ORDER: [Label; 3] = [Label::False, Label::True, Label::Neutral];

/// Judges one claim from its entailment results.
pub fn judge_claim(
    claim: Claim,
    results: Vec<EntailmentResult>,
    cfg: &VerifierConfig,
) -> ClaimVerdict {
    let Some(best) = best_evidence(&results).cloned() else {
        // Retrieval produced nothing to weigh the claim against.
        return ClaimVerdict {
            claim,
            label: Label::Neutral,
            confidence: 0.0,
            best_evidence: None,
        };
    };

    let support = best.support_score;
    let (label, confidence) = if support >= cfg.truth_threshold {
        (Label::True, support)
    } else if support < cfg.falsehood_threshold {
        (Label::False, 1.0 - support)
    } else {
        (Label::Neutral, support)
    };

    ClaimVerdict {
        claim,
        label,
        confidence,
        best_evidence: Some(best),
    }
}

/// The result with the maximum support score; ties broken by higher
/// retrieval score, then by input order.
fn best_evidence(results: &[EntailmentResult]) -> Option<&EntailmentResult> {
    results.iter().reduce(|best, r| {
        if r.support_score > best.support_score
            || (r.support_score == best.support_score
                && r.evidence.retrieval_score > best.evidence.retrieval_score)
        {
            r
        } else {
            best
        }
    })
}

/// Aggregates claim verdicts into the overall verdict via the weighted vote.
pub fn overall_verdict(claim_verdicts: Vec<ClaimVerdict>, weights: &VoteWeights) -> OverallVerdict {
    if claim_verdicts.is_empty() {
        return OverallVerdict::empty();
    }

    let weight_of = |label: Label| match label {
        Label::True => weights.true_vote,
        Label::False => weights.false_vote,
        Label::Neutral => weights.neutral_vote,
    };

    let mut winner = Label::Neutral;
    let mut best_weight = f32::NEG_INFINITY;
    for label in TIE_ORDER {
        let total: f32 = claim_verdicts
            .iter()
            .filter(|v| v.label == label)
            .map(|_| weight_of(label))
            .sum();
        // Strict comparison: on equal weight the earlier tie-order label wins.
        if total > best_weight {
            best_weight = total;
            winner = label;
        }
    }

    let contributing: Vec<f32> = claim_verdicts
        .iter()
        .filter(|v| v.label == winner)
        .map(|v| v.confidence)
        .collect();
    let confidence = if contributing.is_empty() {
        0.0
    } else {
        contributing.iter().sum::<f32>() / contributing.len() as f32
    };

    OverallVerdict {
        label: winner,
        confidence,
        claim_verdicts,
    }
}

/// The verification pipeline: extraction → retrieval → scoring → verdict.
///
/// Holds no per-request state; one instance serves any number of concurrent
/// `classify` calls against the read-only registry resources.
pub struct Pipeline {
    registry: Arc<ModelRegistry>,
    config: VerifierConfig,
    filter: ClaimFilter,
}

impl Pipeline {
    pub fn new(registry: Arc<ModelRegistry>, config: VerifierConfig) -> Result<Self, VerifyError> {
        config.validate()?;
        let filter = ClaimFilter::declarative_factual(config.min_claim_chars);
        Ok(Self {
            registry,
            config,
            filter,
        })
    }

    pub fn config(&self) -> &VerifierConfig {
        &self.config
    }

    pub fn registry(&self) -> &Arc<ModelRegistry> {
        &self.registry
    }

    /// Classifies `text`, returning a verdict per claim and overall.
    ///
    /// Any extraction, retrieval, or scoring failure aborts the whole call;
    /// partial results are never returned as if complete.
    pub async fn classify(&self, text: &str) -> Result<OverallVerdict, VerifyError> {
        let embedder = self.registry.embedder()?;
        let entailment = self.registry.entailment()?;
        let index = self.registry.index()?;

        let claims = extract_claims(text, self.config.max_claims, &self.filter)?;
        if claims.is_empty() {
            debug!("no claims extracted; returning neutral verdict");
            return Ok(OverallVerdict::empty());
        }
        debug!(claims = claims.len(), "extracted claims");

        let retriever = EvidenceRetriever::new(embedder, index, self.config.top_k_proofs);
        let scorer = EntailmentScorer::new(entailment);

        let tasks = claims.into_iter().enumerate().map(|(idx, claim)| {
            let retriever = &retriever;
            let scorer = &scorer;
            let config = &self.config;
            async move {
                let evidence = retriever.retrieve(&claim).await?;
                let results = scorer.score(&claim, evidence).await?;
                Ok::<_, VerifyError>((idx, judge_claim(claim, results, config)))
            }
        });

        let mut judged = stream::iter(tasks)
            .buffer_unordered(self.config.claim_concurrency)
            .collect::<Vec<_>>()
            .await;
        judged.sort_by_key(|r| r.as_ref().map(|(i, _)| *i).unwrap_or(usize::MAX));

        let mut verdicts = Vec::with_capacity(judged.len());
        for r in judged {
            let (_, verdict) = r?;
            verdicts.push(verdict);
        }

        Ok(overall_verdict(verdicts, &self.config.vote))
    }
}

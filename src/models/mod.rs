//! Trait seams for the two model invocations the pipeline makes.
//!
//! Model outputs are normalized here into fixed shapes; nothing downstream
//! inspects runtime-specific response formats.

pub mod onnx;

use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Probability distribution over the three NLI relations, summing to ~1.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct NliScores {
    pub entailment: f32,
    pub neutral: f32,
    pub contradiction: f32,
}

/// Produces fixed-size vectors in the same space as the evidence index.
#[async_trait]
pub trait Embedder: Send + Sync {
    /// Embed a batch of texts. Output preserves input order.
    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>>;

    async fn embed_one(&self, text: &str) -> Result<Vec<f32>> {
        let mut vectors = self.embed(&[text.to_string()]).await?;
        vectors
            .pop()
            .ok_or_else(|| anyhow::anyhow!("embedder returned no vector"))
    }
}

/// Scores whether a premise entails, contradicts, or is neutral toward a
/// hypothesis.
#[async_trait]
pub trait EntailmentModel: Send + Sync {
    /// Score each `(premise, hypothesis)` pair. Output preserves input
    /// order; implementations may batch internally as long as per-pair
    /// results are unaffected.
    async fn entail(&self, pairs: Vec<(String, String)>) -> Result<Vec<NliScores>>;
}

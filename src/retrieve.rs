use std::sync::Arc;

use tracing::debug;

use crate::error::VerifyError;
use crate::index::EvidenceIndex;
use crate::models::Embedder;
use crate::types::{Claim, RetrievedEvidence};

/// Embeds a claim and finds its top-K nearest evidence snippets.
pub struct EvidenceRetriever {
    embedder: Arc<dyn Embedder>,
    index: Arc<EvidenceIndex>,
    top_k: usize,
}

impl EvidenceRetriever {
    pub fn new(embedder: Arc<dyn Embedder>, index: Arc<EvidenceIndex>, top_k: usize) -> Self {
        Self {
            embedder,
            index,
            top_k,
        }
    }

    /// Returns min(K, corpus size) hits sorted by descending similarity.
    pub async fn retrieve(&self, claim: &Claim) -> Result<Vec<RetrievedEvidence>, VerifyError> {
        if self.index.is_empty() {
            return Err(VerifyError::Retrieval("evidence index is empty".into()));
        }

        let vector = self
            .embedder
            .embed_one(&claim.text)
            .await
            .map_err(|e| VerifyError::Retrieval(format!("embedding failed: {e}")))?;
        if vector.len() != self.index.dim() {
            return Err(VerifyError::Retrieval(format!(
                "claim embedding has dimension {}, index has {}",
                vector.len(),
                self.index.dim()
            )));
        }

        let hits = self.index.search(&vector, self.top_k);
        debug!(claim = %claim.text, hits = hits.len(), "retrieved evidence");
        Ok(hits)
    }
}

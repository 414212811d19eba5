//! In-memory evidence index with exact nearest-neighbor search.
//!
//! The index is a pre-built, read-only artifact: a JSON array of
//! [`EvidenceSnippet`]s whose vectors were L2-normalized at build time, so
//! cosine similarity reduces to an inner product. At the corpus scale this
//! service targets (tens to low hundreds of thousands of snippets) a
//! brute-force scan satisfies the top-K-by-distance contract.

use std::cmp::Ordering;
use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::models::Embedder;
use crate::types::{EvidenceSnippet, RetrievedEvidence};

/// A corpus document before embedding; input to [`build_artifact`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawDocument {
    pub text: String,
    pub source_id: String,
}

pub struct EvidenceIndex {
    snippets: Vec<EvidenceSnippet>,
    dim: usize,
}

impl EvidenceIndex {
    /// Builds an index over `snippets`, re-normalizing vectors so the
    /// inner-product-equals-cosine invariant holds regardless of how the
    /// artifact was produced.
    pub fn from_snippets(mut snippets: Vec<EvidenceSnippet>) -> Result<Self> {
        let dim = snippets.first().map(|s| s.vector.len()).unwrap_or(0);
        for (i, snippet) in snippets.iter_mut().enumerate() {
            if snippet.vector.len() != dim {
                anyhow::bail!(
                    "snippet {i} has vector dimension {}, expected {dim}",
                    snippet.vector.len()
                );
            }
            normalize_in_place(&mut snippet.vector);
        }
        Ok(Self { snippets, dim })
    }

    pub fn load(path: &Path) -> Result<Self> {
        let raw = fs::read_to_string(path)
            .with_context(|| format!("reading evidence index artifact {}", path.display()))?;
        let snippets: Vec<EvidenceSnippet> = serde_json::from_str(&raw)
            .with_context(|| format!("parsing evidence index artifact {}", path.display()))?;
        let index = Self::from_snippets(snippets)?;
        info!(
            snippets = index.len(),
            dim = index.dim(),
            "loaded evidence index"
        );
        Ok(index)
    }

    pub fn len(&self) -> usize {
        self.snippets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.snippets.is_empty()
    }

    /// Vector dimensionality; 0 for an empty index.
    pub fn dim(&self) -> usize {
        self.dim
    }

    /// Exact top-`k` snippets by cosine similarity to `query`, descending.
    /// Equal scores resolve to the earlier snippet in insertion order.
    /// Returns min(k, corpus size) results.
    pub fn search(&self, query: &[f32], k: usize) -> Vec<RetrievedEvidence> {
        let mut query = query.to_vec();
        normalize_in_place(&mut query);

        let mut scored: Vec<(usize, f32)> = self
            .snippets
            .iter()
            .enumerate()
            .map(|(i, s)| (i, dot(&query, &s.vector)))
            .collect();
        scored.sort_by(|a, b| {
            b.1.partial_cmp(&a.1)
                .unwrap_or(Ordering::Equal)
                .then(a.0.cmp(&b.0))
        });
        scored.truncate(k);

        scored
            .into_iter()
            .map(|(i, score)| RetrievedEvidence {
                snippet: self.snippets[i].clone(),
                retrieval_score: score,
            })
            .collect()
    }
}

/// Embeds `docs` and writes the index artifact to `out_path`. Returns the
/// number of snippets written.
pub async fn build_artifact(
    embedder: &dyn Embedder,
    docs: Vec<RawDocument>,
    out_path: &Path,
) -> Result<usize> {
    anyhow::ensure!(!docs.is_empty(), "corpus file contains no documents");

    let mut snippets = Vec::with_capacity(docs.len());
    for batch in docs.chunks(32) {
        let texts: Vec<String> = batch.iter().map(|d| d.text.clone()).collect();
        let vectors = embedder.embed(&texts).await?;
        for (doc, mut vector) in batch.iter().zip(vectors) {
            normalize_in_place(&mut vector);
            snippets.push(EvidenceSnippet {
                text: doc.text.clone(),
                source_id: doc.source_id.clone(),
                vector,
            });
        }
    }

    if let Some(parent) = out_path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("creating artifact directory {}", parent.display()))?;
    }
    let json = serde_json::to_string_pretty(&snippets)?;
    fs::write(out_path, json)
        .with_context(|| format!("writing evidence index artifact {}", out_path.display()))?;
    info!(snippets = snippets.len(), path = %out_path.display(), "wrote evidence index artifact");
    Ok(snippets.len())
}

fn normalize_in_place(v: &mut [f32]) {
    let norm: f32 = v.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm > 0.0 {
        for x in v.iter_mut() {
            *x /= norm;
        }
    }
}

fn dot(a: &[f32], b: &[f32]) -> f32 {
    a.iter().zip(b).map(|(x, y)| x * y).sum()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snippet(text: &str, vector: Vec<f32>) -> EvidenceSnippet {
        EvidenceSnippet {
            text: text.into(),
            source_id: format!("src:{text}"),
            vector,
        }
    }

    fn axis_index() -> EvidenceIndex {
        EvidenceIndex::from_snippets(vec![
            snippet("a", vec![1.0, 0.0, 0.0]),
            snippet("b", vec![0.0, 1.0, 0.0]),
            snippet("c", vec![0.0, 0.0, 1.0]),
        ])
        .unwrap()
    }

    #[test]
    fn search_orders_by_descending_similarity() {
        let index = axis_index();
        let hits = index.search(&[0.9, 0.4, 0.0], 3);
        assert_eq!(hits.len(), 3);
        assert_eq!(hits[0].snippet.text, "a");
        assert_eq!(hits[1].snippet.text, "b");
        assert!(hits[0].retrieval_score > hits[1].retrieval_score);
        assert!(hits[1].retrieval_score > hits[2].retrieval_score);
    }

    #[test]
    fn search_returns_at_most_corpus_size() {
        let index = axis_index();
        assert_eq!(index.search(&[1.0, 0.0, 0.0], 10).len(), 3);
        assert_eq!(index.search(&[1.0, 0.0, 0.0], 2).len(), 2);
    }

    #[test]
    fn equal_scores_resolve_to_insertion_order() {
        let index = EvidenceIndex::from_snippets(vec![
            snippet("first", vec![1.0, 0.0]),
            snippet("second", vec![1.0, 0.0]),
        ])
        .unwrap();
        let hits = index.search(&[1.0, 0.0], 2);
        assert_eq!(hits[0].snippet.text, "first");
        assert_eq!(hits[1].snippet.text, "second");
    }

    #[test]
    fn vectors_are_normalized_on_load() {
        let index = EvidenceIndex::from_snippets(vec![snippet("long", vec![10.0, 0.0])]).unwrap();
        let hits = index.search(&[2.0, 0.0], 1);
        assert!((hits[0].retrieval_score - 1.0).abs() < 1e-6);
    }

    #[test]
    fn rejects_mixed_dimensions() {
        let result = EvidenceIndex::from_snippets(vec![
            snippet("a", vec![1.0, 0.0]),
            snippet("b", vec![1.0, 0.0, 0.0]),
        ]);
        assert!(result.is_err());
    }

    #[test]
    fn empty_index_reports_empty() {
        let index = EvidenceIndex::from_snippets(Vec::new()).unwrap();
        assert!(index.is_empty());
        assert_eq!(index.dim(), 0);
        assert!(index.search(&[1.0], 5).is_empty());
    }
}

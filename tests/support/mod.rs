#![allow(dead_code)]

//! Shared fakes for integration tests: deterministic embedder and NLI
//! backends plus a loader that feeds them into the registry.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;

use veracity::index::EvidenceIndex;
use veracity::models::{Embedder, EntailmentModel, NliScores};
use veracity::registry::{ModelLoader, ModelRegistry};
use veracity::types::EvidenceSnippet;

pub type EmbedFn = Box<dyn Fn(&str) -> Vec<f32> + Send + Sync>;

pub struct FakeEmbedder {
    pub handler: EmbedFn,
    pub calls: Arc<AtomicUsize>,
}

impl FakeEmbedder {
    pub fn new(handler: EmbedFn) -> Self {
        Self {
            handler,
            calls: Arc::new(AtomicUsize::new(0)),
        }
    }
}

#[async_trait]
impl Embedder for FakeEmbedder {
    async fn embed(&self, texts: &[String]) -> anyhow::Result<Vec<Vec<f32>>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(texts.iter().map(|t| (self.handler)(t)).collect())
    }
}

pub type NliFn = Box<dyn Fn(&str, &str) -> f32 + Send + Sync>;

/// Maps each (premise, hypothesis) pair to an entailment probability; the
/// remaining mass is split between neutral and contradiction.
pub struct FakeNli {
    pub handler: NliFn,
}

impl FakeNli {
    pub fn new(handler: NliFn) -> Self {
        Self { handler }
    }
}

#[async_trait]
impl EntailmentModel for FakeNli {
    async fn entail(&self, pairs: Vec<(String, String)>) -> anyhow::Result<Vec<NliScores>> {
        Ok(pairs
            .iter()
            .map(|(premise, hypothesis)| {
                let entailment = (self.handler)(premise, hypothesis);
                NliScores {
                    entailment,
                    neutral: (1.0 - entailment) / 2.0,
                    contradiction: (1.0 - entailment) / 2.0,
                }
            })
            .collect())
    }
}

pub struct FailingNli;

#[async_trait]
impl EntailmentModel for FailingNli {
    async fn entail(&self, _pairs: Vec<(String, String)>) -> anyhow::Result<Vec<NliScores>> {
        anyhow::bail!("nli backend crashed")
    }
}

pub struct FakeLoader {
    pub embedder: Arc<dyn Embedder>,
    pub entailment: Arc<dyn EntailmentModel>,
    pub index: Arc<EvidenceIndex>,
}

#[async_trait]
impl ModelLoader for FakeLoader {
    async fn load_embedder(&self) -> anyhow::Result<Arc<dyn Embedder>> {
        Ok(self.embedder.clone())
    }
    async fn load_entailment(&self) -> anyhow::Result<Arc<dyn EntailmentModel>> {
        Ok(self.entailment.clone())
    }
    async fn load_index(&self) -> anyhow::Result<Arc<EvidenceIndex>> {
        Ok(self.index.clone())
    }
}

pub fn snippet(text: &str, source_id: &str, vector: Vec<f32>) -> EvidenceSnippet {
    EvidenceSnippet {
        text: text.into(),
        source_id: source_id.into(),
        vector,
    }
}

/// A three-snippet knowledge base on orthogonal axes.
pub fn small_kb() -> Arc<EvidenceIndex> {
    Arc::new(
        EvidenceIndex::from_snippets(vec![
            snippet(
                "Albert Einstein was born in Ulm, Germany, in 1879.",
                "kb:einstein",
                vec![1.0, 0.0, 0.0],
            ),
            snippet(
                "The Moon is Earth's only natural satellite, a rocky body.",
                "kb:moon",
                vec![0.0, 1.0, 0.0],
            ),
            snippet(
                "Paris is the capital of France.",
                "kb:paris",
                vec![0.0, 0.0, 1.0],
            ),
        ])
        .unwrap(),
    )
}

/// Routes claim texts onto the axes of [`small_kb`].
pub fn topic_embedder() -> EmbedFn {
    Box::new(|text: &str| {
        if text.contains("Einstein") {
            vec![1.0, 0.0, 0.0]
        } else if text.contains("Moon") {
            vec![0.0, 1.0, 0.0]
        } else if text.contains("Paris") {
            vec![0.0, 0.0, 1.0]
        } else {
            vec![0.6, 0.6, 0.6]
        }
    })
}

/// Keyword-driven entailment scores for the scenarios: the 1879 birth claim
/// is supported, the cheese-Moon claim contradicted, the Paris claim
/// ambiguous, and unrelated pairs score low.
pub fn keyword_nli() -> NliFn {
    Box::new(|premise: &str, hypothesis: &str| {
        if premise.contains("1879") && hypothesis.contains("1879") {
            0.97
        } else if premise.contains("Moon") && hypothesis.contains("cheese") {
            0.05
        } else if premise.contains("capital of France") && hypothesis.contains("capital of France")
        {
            0.6
        } else {
            0.1
        }
    })
}

pub async fn ready_registry(
    embedder: Arc<dyn Embedder>,
    entailment: Arc<dyn EntailmentModel>,
    index: Arc<EvidenceIndex>,
) -> Arc<ModelRegistry> {
    let registry = Arc::new(ModelRegistry::new());
    let loader = FakeLoader {
        embedder,
        entailment,
        index,
    };
    registry.initialize(&loader).await.unwrap();
    registry
}

/// A registry over the small KB with the scenario embedder and NLI.
pub async fn scenario_registry() -> Arc<ModelRegistry> {
    ready_registry(
        Arc::new(FakeEmbedder::new(topic_embedder())),
        Arc::new(FakeNli::new(keyword_nli())),
        small_kb(),
    )
    .await
}

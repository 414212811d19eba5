//! Verifies free-text factual claims against a local evidence corpus.
//!
//! The pipeline: raw text is segmented into candidate claims, each claim is
//! embedded and matched against a pre-built vector index of evidence
//! snippets, every (claim, evidence) pair is scored by an NLI entailment
//! model, and the per-claim support scores are aggregated into a verdict of
//! `true`, `false`, or `neutral` for each claim and for the whole input.
//!
//! Module overview:
//! - [`types`] - shared pipeline data types (`Claim`, `EvidenceSnippet`, verdicts)
//! - [`config`] - thresholds, vote weights, and model paths
//! - [`error`] - the `VerifyError` taxonomy
//! - [`models`] - `Embedder` / `EntailmentModel` trait seams and ONNX-backed impls
//! - [`index`] - in-memory evidence index with exact top-K cosine search
//! - [`registry`] - `ModelRegistry` lifecycle for the three model resources
//! - [`extract`] - sentence segmentation and heuristic claim filtering
//! - [`retrieve`] - per-claim evidence retrieval
//! - [`score`] - per-pair entailment scoring
//! - [`classify`] - verdict aggregation and the `Pipeline` entry point
//! - [`cache`] - TTL response cache keyed by a content hash
//! - [`server`] - axum HTTP surface

pub mod cache;
pub mod classify;
pub mod config;
pub mod error;
pub mod extract;
pub mod index;
pub mod models;
pub mod registry;
pub mod retrieve;
pub mod score;
pub mod server;
pub mod types;

pub use classify::Pipeline;
pub use config::VerifierConfig;
pub use error::VerifyError;
pub use registry::ModelRegistry;
pub use types::{Label, OverallVerdict};

//! ONNX-backed implementations of [`Embedder`] and [`EntailmentModel`].
//!
//! Both services share one loading path: a `tokenizers` tokenizer plus an
//! `ort` session. Inference is CPU-bound, so the async trait impls hop onto
//! the blocking pool; sessions are safe for concurrent `run` calls and are
//! shared read-only behind `Arc`.

use std::path::Path;
use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use ndarray::{Array2, ArrayView1};
use ort::session::builder::GraphOptimizationLevel;
use ort::session::Session;
use thiserror::Error;
use tokenizers::{Encoding, Tokenizer};
use tracing::{debug, info};

use crate::config::{ModelConfig, NliLabelLayout};
use crate::index::EvidenceIndex;
use crate::models::{Embedder, EntailmentModel, NliScores};
use crate::registry::ModelLoader;

#[derive(Debug, Error)]
pub enum OnnxError {
    #[error("failed to load model: {0}")]
    ModelLoad(String),

    #[error("failed to load tokenizer: {0}")]
    TokenizerLoad(String),

    #[error("tokenization failed: {0}")]
    Tokenization(String),

    #[error("inference failed: {0}")]
    Inference(String),

    #[error("invalid input: {0}")]
    InvalidInput(String),
}

/// A loaded tokenizer/session pair.
#[derive(Debug)]
struct SessionBundle {
    session: Session,
    tokenizer: Tokenizer,
    max_length: usize,
}

impl SessionBundle {
    fn load(
        model_path: &Path,
        tokenizer_path: &Path,
        max_length: usize,
        num_threads: usize,
    ) -> Result<Self, OnnxError> {
        if !model_path.exists() {
            return Err(OnnxError::ModelLoad(format!(
                "model file not found: {}",
                model_path.display()
            )));
        }
        if !tokenizer_path.exists() {
            return Err(OnnxError::TokenizerLoad(format!(
                "tokenizer file not found: {}",
                tokenizer_path.display()
            )));
        }

        let tokenizer = Tokenizer::from_file(tokenizer_path)
            .map_err(|e| OnnxError::TokenizerLoad(e.to_string()))?;

        let mut builder = Session::builder()
            .map_err(|e| OnnxError::ModelLoad(e.to_string()))?
            .with_optimization_level(GraphOptimizationLevel::Level3)
            .map_err(|e| OnnxError::ModelLoad(e.to_string()))?;
        if num_threads > 0 {
            builder = builder
                .with_intra_threads(num_threads)
                .map_err(|e| OnnxError::ModelLoad(e.to_string()))?;
        }
        let session = builder
            .commit_from_file(model_path)
            .map_err(|e| OnnxError::ModelLoad(e.to_string()))?;

        info!(model = %model_path.display(), "loaded ONNX session");

        Ok(Self {
            session,
            tokenizer,
            max_length,
        })
    }

    /// Pad or truncate encodings to `max_length` and lay them out as
    /// `[batch, max_length]` id and mask tensors.
    fn padded_inputs(&self, encodings: &[Encoding]) -> Result<(Array2<i64>, Array2<i64>), OnnxError> {
        let batch_size = encodings.len();
        let max_len = self.max_length;

        let mut input_ids: Vec<i64> = Vec::with_capacity(batch_size * max_len);
        let mut attention_mask: Vec<i64> = Vec::with_capacity(batch_size * max_len);

        for encoding in encodings {
            let ids = encoding.get_ids();
            let mask = encoding.get_attention_mask();
            for i in 0..max_len {
                if i < ids.len() {
                    input_ids.push(ids[i] as i64);
                    attention_mask.push(mask[i] as i64);
                } else {
                    input_ids.push(0);
                    attention_mask.push(0);
                }
            }
        }

        let input_ids = Array2::from_shape_vec((batch_size, max_len), input_ids)
            .map_err(|e| OnnxError::Inference(format!("failed to shape input_ids: {e}")))?;
        let attention_mask = Array2::from_shape_vec((batch_size, max_len), attention_mask)
            .map_err(|e| OnnxError::Inference(format!("failed to shape attention_mask: {e}")))?;

        Ok((input_ids, attention_mask))
    }
}

/// Sentence embedder backed by an ONNX sentence-transformer export.
pub struct OnnxEmbedder {
    bundle: Arc<SessionBundle>,
}

impl OnnxEmbedder {
    pub fn load(cfg: &ModelConfig) -> Result<Self, OnnxError> {
        let bundle = SessionBundle::load(
            &cfg.embedding_model,
            &cfg.embedding_tokenizer,
            cfg.max_length,
            cfg.num_threads,
        )?;
        Ok(Self {
            bundle: Arc::new(bundle),
        })
    }

    fn embed_blocking(bundle: &SessionBundle, texts: &[String]) -> Result<Vec<Vec<f32>>, OnnxError> {
        if texts.is_empty() {
            return Err(OnnxError::InvalidInput("empty input".into()));
        }
        debug!("embedding {} texts", texts.len());

        let encodings = bundle
            .tokenizer
            .encode_batch(texts.to_vec(), true)
            .map_err(|e| OnnxError::Tokenization(e.to_string()))?;
        let batch_size = encodings.len();
        let (input_ids, attention_mask) = bundle.padded_inputs(&encodings)?;
        let mask_for_pooling = attention_mask.clone();

        let outputs = bundle
            .session
            .run(
                ort::inputs! {
                    "input_ids" => input_ids,
                    "attention_mask" => attention_mask,
                }
                .map_err(|e| OnnxError::Inference(e.to_string()))?,
            )
            .map_err(|e| OnnxError::Inference(e.to_string()))?;

        let embeddings = outputs
            .get("sentence_embedding")
            .or_else(|| outputs.get("last_hidden_state"))
            .ok_or_else(|| OnnxError::Inference("no embedding output found".into()))?;
        let embeddings: ndarray::ArrayViewD<f32> = embeddings
            .try_extract_tensor()
            .map_err(|e| OnnxError::Inference(e.to_string()))?;

        let shape = embeddings.shape();
        let mut result = Vec::with_capacity(batch_size);
        if shape.len() == 2 {
            // [batch, hidden]: already pooled sentence embeddings
            for i in 0..batch_size {
                let row: Vec<f32> = embeddings.slice(ndarray::s![i, ..]).iter().copied().collect();
                result.push(l2_normalize(&row));
            }
        } else if shape.len() == 3 {
            // [batch, seq, hidden]: pool token embeddings under the mask
            for i in 0..batch_size {
                let tokens: ndarray::ArrayView2<f32> = embeddings
                    .slice(ndarray::s![i, .., ..])
                    .into_dimensionality()
                    .map_err(|e| OnnxError::Inference(e.to_string()))?;
                let pooled = mean_pool(tokens, &mask_for_pooling.slice(ndarray::s![i, ..]));
                result.push(l2_normalize(&pooled));
            }
        } else {
            return Err(OnnxError::Inference(format!(
                "unexpected embedding output shape: {shape:?}"
            )));
        }

        Ok(result)
    }
}

#[async_trait]
impl Embedder for OnnxEmbedder {
    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let bundle = self.bundle.clone();
        let texts = texts.to_vec();
        let vectors =
            tokio::task::spawn_blocking(move || Self::embed_blocking(&bundle, &texts)).await??;
        Ok(vectors)
    }
}

/// NLI cross-encoder backed by an ONNX sequence-classification export.
pub struct OnnxEntailment {
    bundle: Arc<SessionBundle>,
    labels: NliLabelLayout,
}

impl OnnxEntailment {
    pub fn load(cfg: &ModelConfig) -> Result<Self, OnnxError> {
        let bundle = SessionBundle::load(
            &cfg.nli_model,
            &cfg.nli_tokenizer,
            cfg.max_length,
            cfg.num_threads,
        )?;
        Ok(Self {
            bundle: Arc::new(bundle),
            labels: cfg.nli_labels,
        })
    }

    fn entail_blocking(
        bundle: &SessionBundle,
        labels: NliLabelLayout,
        pairs: Vec<(String, String)>,
    ) -> Result<Vec<NliScores>, OnnxError> {
        if pairs.is_empty() {
            return Err(OnnxError::InvalidInput("empty input".into()));
        }
        debug!("scoring {} premise/hypothesis pairs", pairs.len());

        let batch_size = pairs.len();
        let encodings = bundle
            .tokenizer
            .encode_batch(pairs, true)
            .map_err(|e| OnnxError::Tokenization(e.to_string()))?;
        let (input_ids, attention_mask) = bundle.padded_inputs(&encodings)?;

        let outputs = bundle
            .session
            .run(
                ort::inputs! {
                    "input_ids" => input_ids,
                    "attention_mask" => attention_mask,
                }
                .map_err(|e| OnnxError::Inference(e.to_string()))?,
            )
            .map_err(|e| OnnxError::Inference(e.to_string()))?;

        let logits = outputs
            .get("logits")
            .ok_or_else(|| OnnxError::Inference("no logits output found".into()))?;
        let logits: ndarray::ArrayViewD<f32> = logits
            .try_extract_tensor()
            .map_err(|e| OnnxError::Inference(e.to_string()))?;

        let shape = logits.shape();
        if shape.len() != 2 || shape[0] != batch_size {
            return Err(OnnxError::Inference(format!(
                "unexpected logits shape: {shape:?}"
            )));
        }
        let num_labels = shape[1];
        let max_index = labels.contradiction.max(labels.neutral).max(labels.entailment);
        if max_index >= num_labels {
            return Err(OnnxError::Inference(format!(
                "NLI label layout indexes logit {max_index} but model has {num_labels} labels"
            )));
        }

        let mut result = Vec::with_capacity(batch_size);
        for i in 0..batch_size {
            let row: Vec<f32> = logits.slice(ndarray::s![i, ..]).iter().copied().collect();
            let probs = softmax(&row);
            result.push(NliScores {
                entailment: probs[labels.entailment],
                neutral: probs[labels.neutral],
                contradiction: probs[labels.contradiction],
            });
        }
        Ok(result)
    }
}

#[async_trait]
impl EntailmentModel for OnnxEntailment {
    async fn entail(&self, pairs: Vec<(String, String)>) -> Result<Vec<NliScores>> {
        let bundle = self.bundle.clone();
        let labels = self.labels;
        let scores =
            tokio::task::spawn_blocking(move || Self::entail_blocking(&bundle, labels, pairs))
                .await??;
        Ok(scores)
    }
}

/// Loads the production trio: ONNX embedder, ONNX NLI model, and the index
/// artifact from disk.
pub struct OnnxModelLoader {
    cfg: ModelConfig,
}

impl OnnxModelLoader {
    pub fn new(cfg: ModelConfig) -> Self {
        Self { cfg }
    }
}

#[async_trait]
impl ModelLoader for OnnxModelLoader {
    async fn load_embedder(&self) -> Result<Arc<dyn Embedder>> {
        let cfg = self.cfg.clone();
        let embedder = tokio::task::spawn_blocking(move || OnnxEmbedder::load(&cfg)).await??;
        Ok(Arc::new(embedder))
    }

    async fn load_entailment(&self) -> Result<Arc<dyn EntailmentModel>> {
        let cfg = self.cfg.clone();
        let model = tokio::task::spawn_blocking(move || OnnxEntailment::load(&cfg)).await??;
        Ok(Arc::new(model))
    }

    async fn load_index(&self) -> Result<Arc<EvidenceIndex>> {
        let path = self.cfg.index_path.clone();
        let index = tokio::task::spawn_blocking(move || EvidenceIndex::load(&path)).await??;
        Ok(Arc::new(index))
    }
}

/// Mean pooling over token embeddings under the attention mask.
fn mean_pool(tokens: ndarray::ArrayView2<f32>, attention_mask: &ArrayView1<i64>) -> Vec<f32> {
    let hidden_size = tokens.shape()[1];
    let mut sum = vec![0.0f32; hidden_size];
    let mut count = 0.0f32;

    for (i, mask) in attention_mask.iter().enumerate() {
        if *mask == 1 {
            for (j, val) in tokens.slice(ndarray::s![i, ..]).iter().enumerate() {
                sum[j] += val;
            }
            count += 1.0;
        }
    }
    if count > 0.0 {
        for val in &mut sum {
            *val /= count;
        }
    }
    sum
}

fn l2_normalize(v: &[f32]) -> Vec<f32> {
    let norm: f32 = v.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm > 0.0 {
        v.iter().map(|x| x / norm).collect()
    } else {
        v.to_vec()
    }
}

fn softmax(logits: &[f32]) -> Vec<f32> {
    let max = logits.iter().copied().fold(f32::NEG_INFINITY, f32::max);
    let exps: Vec<f32> = logits.iter().map(|x| (x - max).exp()).collect();
    let total: f32 = exps.iter().sum();
    exps.into_iter().map(|x| x / total).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn softmax_sums_to_one_and_orders_mass() {
        let probs = softmax(&[1.0, 2.0, 3.0]);
        let total: f32 = probs.iter().sum();
        assert!((total - 1.0).abs() < 1e-6);
        assert!(probs[2] > probs[1] && probs[1] > probs[0]);
    }

    #[test]
    fn l2_normalize_yields_unit_length() {
        let v = l2_normalize(&[3.0, 4.0]);
        let norm: f32 = v.iter().map(|x| x * x).sum::<f32>().sqrt();
        assert!((norm - 1.0).abs() < 1e-6);
        assert!((v[0] - 0.6).abs() < 1e-6);
    }

    #[test]
    fn l2_normalize_leaves_zero_vector_alone() {
        assert_eq!(l2_normalize(&[0.0, 0.0]), vec![0.0, 0.0]);
    }

    #[test]
    fn missing_model_file_is_reported() {
        let err = SessionBundle::load(
            Path::new("/nonexistent/model.onnx"),
            Path::new("/nonexistent/tokenizer.json"),
            128,
            0,
        )
        .unwrap_err();
        assert!(matches!(err, OnnxError::ModelLoad(_)));
    }
}

//! Lifecycle owner for the three model resources.
//!
//! The registry is an explicitly constructed object handed to the pipeline,
//! not a process-wide global. Its lifecycle is the enum Uninitialized →
//! Initializing → Ready; `initialize` is atomic (all three resources become
//! available together or none do) and serialized, so concurrent callers
//! never observe a half-loaded state.

use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use parking_lot::RwLock;
use tracing::{info, warn};

use crate::error::{Resource, VerifyError};
use crate::index::EvidenceIndex;
use crate::models::{Embedder, EntailmentModel};

/// Loads the three resources the registry owns. Production uses
/// [`crate::models::onnx::OnnxModelLoader`]; tests inject fakes.
#[async_trait]
pub trait ModelLoader: Send + Sync {
    async fn load_embedder(&self) -> Result<Arc<dyn Embedder>>;
    async fn load_entailment(&self) -> Result<Arc<dyn EntailmentModel>>;
    async fn load_index(&self) -> Result<Arc<EvidenceIndex>>;
}

/// The fully loaded resource set, shared read-only across requests.
#[derive(Clone)]
pub struct LoadedModels {
    pub embedder: Arc<dyn Embedder>,
    pub entailment: Arc<dyn EntailmentModel>,
    pub index: Arc<EvidenceIndex>,
}

enum State {
    Uninitialized,
    Initializing,
    Ready(LoadedModels),
}

pub struct ModelRegistry {
    state: RwLock<State>,
    // Serializes initialize(); readers only touch `state`.
    init_gate: tokio::sync::Mutex<()>,
}

impl ModelRegistry {
    pub fn new() -> Self {
        Self {
            state: RwLock::new(State::Uninitialized),
            init_gate: tokio::sync::Mutex::new(()),
        }
    }

    /// Loads all three resources. Idempotent: a second call after success
    /// returns `Ok` without reloading. On failure the registry returns to
    /// `Uninitialized` so a retry is possible, and the error names the
    /// resource that failed.
    pub async fn initialize(&self, loader: &dyn ModelLoader) -> Result<(), VerifyError> {
        let _gate = self.init_gate.lock().await;
        if matches!(&*self.state.read(), State::Ready(_)) {
            return Ok(());
        }
        *self.state.write() = State::Initializing;

        match Self::load_all(loader).await {
            Ok(models) => {
                info!(kb_size = models.index.len(), "model registry ready");
                *self.state.write() = State::Ready(models);
                Ok(())
            }
            Err(err) => {
                warn!(error = %err, "model registry initialization failed");
                *self.state.write() = State::Uninitialized;
                Err(err)
            }
        }
    }

    async fn load_all(loader: &dyn ModelLoader) -> Result<LoadedModels, VerifyError> {
        let embedder = loader
            .load_embedder()
            .await
            .map_err(|e| init_error(Resource::Embedder, e))?;
        let entailment = loader
            .load_entailment()
            .await
            .map_err(|e| init_error(Resource::EntailmentModel, e))?;
        let index = loader
            .load_index()
            .await
            .map_err(|e| init_error(Resource::EvidenceIndex, e))?;
        Ok(LoadedModels {
            embedder,
            entailment,
            index,
        })
    }

    pub fn is_ready(&self) -> bool {
        matches!(&*self.state.read(), State::Ready(_))
    }

    pub fn embedder(&self) -> Result<Arc<dyn Embedder>, VerifyError> {
        match &*self.state.read() {
            State::Ready(m) => Ok(m.embedder.clone()),
            _ => Err(VerifyError::NotReady),
        }
    }

    pub fn entailment(&self) -> Result<Arc<dyn EntailmentModel>, VerifyError> {
        match &*self.state.read() {
            State::Ready(m) => Ok(m.entailment.clone()),
            _ => Err(VerifyError::NotReady),
        }
    }

    pub fn index(&self) -> Result<Arc<EvidenceIndex>, VerifyError> {
        match &*self.state.read() {
            State::Ready(m) => Ok(m.index.clone()),
            _ => Err(VerifyError::NotReady),
        }
    }
}

impl Default for ModelRegistry {
    fn default() -> Self {
        Self::new()
    }
}

fn init_error(resource: Resource, err: anyhow::Error) -> VerifyError {
    VerifyError::Initialization {
        resource,
        message: err.to_string(),
    }
}

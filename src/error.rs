use std::fmt;

use thiserror::Error;

/// The model resource that failed to load.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resource {
    Embedder,
    EntailmentModel,
    EvidenceIndex,
}

impl fmt::Display for Resource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Resource::Embedder => "embedding model",
            Resource::EntailmentModel => "entailment model",
            Resource::EvidenceIndex => "evidence index",
        };
        f.write_str(name)
    }
}

/// Error taxonomy of the verification pipeline.
///
/// `Initialization` and `NotReady` are fatal to the current call;
/// extraction, retrieval, and scoring errors abort the whole `classify`
/// call rather than yield partial results.
#[derive(Debug, Error)]
pub enum VerifyError {
    #[error("failed to initialize {resource}: {message}")]
    Initialization { resource: Resource, message: String },

    #[error("models are not ready; initialize the registry first")]
    NotReady,

    #[error("claim extraction failed: {0}")]
    ClaimExtraction(String),

    #[error("evidence retrieval failed: {0}")]
    Retrieval(String),

    #[error("entailment scoring failed: {0}")]
    EntailmentScoring(String),

    #[error("invalid configuration: {0}")]
    Config(String),
}

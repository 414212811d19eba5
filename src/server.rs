//! HTTP surface over the pipeline.
//!
//! Routes: `POST /api/v1/classify` runs the pipeline (behind the response
//! cache) and `GET /api/v1/health` reports readiness. Error kinds map to
//! status codes here; the pipeline itself only selects the kind.

use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use tracing::{error, info};

use crate::cache::ResponseCache;
use crate::classify::Pipeline;
use crate::error::VerifyError;
use crate::types::{Label, OverallVerdict};

pub const MIN_TEXT_CHARS: usize = 10;
pub const MAX_TEXT_CHARS: usize = 5000;

#[derive(Clone)]
pub struct AppState {
    pub pipeline: Arc<Pipeline>,
    pub cache: Arc<ResponseCache>,
}

#[derive(Debug, Deserialize)]
pub struct ClassifyRequest {
    pub text: String,
}

/// Evidence snippet as exposed over the wire; the embedding vector stays
/// internal.
#[derive(Debug, Serialize)]
pub struct ProofEvidence {
    pub snippet: String,
    pub source: String,
    pub nli_score: f32,
    pub retrieval_score: f32,
}

#[derive(Debug, Serialize)]
pub struct ClaimAnalysis {
    pub claim: String,
    pub position: usize,
    pub classification: Label,
    pub confidence: f32,
    pub best_evidence: Option<ProofEvidence>,
}

#[derive(Debug, Serialize)]
pub struct ClassifyResponse {
    pub overall_classification: Label,
    pub confidence: f32,
    pub claims: Vec<ClaimAnalysis>,
}

impl From<OverallVerdict> for ClassifyResponse {
    fn from(verdict: OverallVerdict) -> Self {
        let claims = verdict
            .claim_verdicts
            .into_iter()
            .map(|v| ClaimAnalysis {
                claim: v.claim.text,
                position: v.claim.position,
                classification: v.label,
                confidence: v.confidence,
                best_evidence: v.best_evidence.map(|best| ProofEvidence {
                    snippet: best.evidence.snippet.text,
                    source: best.evidence.snippet.source_id,
                    nli_score: best.support_score,
                    retrieval_score: best.evidence.retrieval_score,
                }),
            })
            .collect();
        Self {
            overall_classification: verdict.label,
            confidence: verdict.confidence,
            claims,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub models_loaded: bool,
    pub kb_size: usize,
}

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: &'static str,
    pub message: String,
}

type ApiError = (StatusCode, Json<ErrorBody>);

fn error_response(err: VerifyError) -> ApiError {
    let (status, kind) = match &err {
        VerifyError::ClaimExtraction(_) => (StatusCode::BAD_REQUEST, "claim_extraction"),
        VerifyError::NotReady => (StatusCode::SERVICE_UNAVAILABLE, "not_ready"),
        VerifyError::Initialization { .. } => (StatusCode::SERVICE_UNAVAILABLE, "initialization"),
        VerifyError::Retrieval(_) => (StatusCode::INTERNAL_SERVER_ERROR, "retrieval"),
        VerifyError::EntailmentScoring(_) => {
            (StatusCode::INTERNAL_SERVER_ERROR, "entailment_scoring")
        }
        VerifyError::Config(_) => (StatusCode::INTERNAL_SERVER_ERROR, "config"),
    };
    (
        status,
        Json(ErrorBody {
            error: kind,
            message: err.to_string(),
        }),
    )
}

fn bad_request(message: String) -> ApiError {
    (
        StatusCode::BAD_REQUEST,
        Json(ErrorBody {
            error: "invalid_input",
            message,
        }),
    )
}

pub async fn classify_endpoint(
    State(state): State<AppState>,
    Json(req): Json<ClassifyRequest>,
) -> Result<Json<ClassifyResponse>, ApiError> {
    let chars = req.text.chars().count();
    if chars < MIN_TEXT_CHARS {
        return Err(bad_request(format!(
            "text must be at least {MIN_TEXT_CHARS} characters, got {chars}"
        )));
    }
    if chars > MAX_TEXT_CHARS {
        return Err(bad_request(format!(
            "text must be at most {MAX_TEXT_CHARS} characters, got {chars}"
        )));
    }

    if let Some(hit) = state.cache.get(&req.text) {
        return Ok(Json(hit.into()));
    }

    match state.pipeline.classify(&req.text).await {
        Ok(verdict) => {
            info!(label = ?verdict.label, claims = verdict.claim_verdicts.len(), "classified text");
            state.cache.insert(&req.text, verdict.clone());
            Ok(Json(verdict.into()))
        }
        Err(err) => {
            error!(error = %err, "classification failed");
            Err(error_response(err))
        }
    }
}

pub async fn health_endpoint(State(state): State<AppState>) -> Json<HealthResponse> {
    let registry = state.pipeline.registry();
    let models_loaded = registry.is_ready();
    let kb_size = registry.index().map(|i| i.len()).unwrap_or(0);
    Json(HealthResponse {
        status: if models_loaded { "healthy" } else { "not_ready" },
        models_loaded,
        kb_size,
    })
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/api/v1/classify", post(classify_endpoint))
        .route("/api/v1/health", get(health_endpoint))
        .with_state(state)
}

pub async fn run_server(state: AppState, addr: &str) -> anyhow::Result<()> {
    let app = router(state);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(addr, "listening");
    axum::serve(listener, app).await?;
    Ok(())
}

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::info;

use veracity::cache::ResponseCache;
use veracity::classify::Pipeline;
use veracity::config::{ModelConfig, VerifierConfig};
use veracity::index::{build_artifact, RawDocument};
use veracity::models::onnx::{OnnxEmbedder, OnnxModelLoader};
use veracity::registry::ModelRegistry;
use veracity::server::{run_server, AppState};

#[derive(Parser)]
#[command(name = "veracity", version, about = "Fact verification over a local evidence corpus")]
struct Cli {
    #[command(subcommand)]
    cmd: Cmd,

    /// ONNX embedding model
    #[arg(long, default_value = "models/embedding/model.onnx")]
    embedding_model: PathBuf,
    #[arg(long, default_value = "models/embedding/tokenizer.json")]
    embedding_tokenizer: PathBuf,
    /// ONNX NLI cross-encoder
    #[arg(long, default_value = "models/nli/model.onnx")]
    nli_model: PathBuf,
    #[arg(long, default_value = "models/nli/tokenizer.json")]
    nli_tokenizer: PathBuf,
    /// Pre-built evidence index artifact
    #[arg(long, default_value = "data/evidence_index.json")]
    index_path: PathBuf,
    #[arg(long, default_value_t = 256)]
    max_length: usize,

    #[arg(long, default_value_t = 0.85)]
    truth_threshold: f32,
    #[arg(long, default_value_t = 0.4)]
    falsehood_threshold: f32,
    #[arg(long, default_value_t = 6)]
    top_k_proofs: usize,
    #[arg(long, default_value_t = 8)]
    max_claims: usize,
}

#[derive(Subcommand)]
enum Cmd {
    /// Start the HTTP service
    Serve {
        #[arg(long, default_value = "0.0.0.0:8000")]
        addr: String,
        #[arg(long, default_value_t = 100)]
        cache_capacity: usize,
        #[arg(long, default_value_t = 300)]
        cache_ttl_secs: u64,
    },
    /// Classify one text and print the verdict as JSON
    Classify {
        #[arg(long)]
        text: String,
    },
    /// Embed a corpus file of {text, source_id} documents into an index artifact
    BuildIndex {
        #[arg(long)]
        input: PathBuf,
        #[arg(long)]
        output: PathBuf,
    },
}

impl Cli {
    fn model_config(&self) -> ModelConfig {
        ModelConfig {
            embedding_model: self.embedding_model.clone(),
            embedding_tokenizer: self.embedding_tokenizer.clone(),
            nli_model: self.nli_model.clone(),
            nli_tokenizer: self.nli_tokenizer.clone(),
            index_path: self.index_path.clone(),
            max_length: self.max_length,
            ..ModelConfig::default()
        }
    }

    fn verifier_config(&self) -> VerifierConfig {
        VerifierConfig {
            truth_threshold: self.truth_threshold,
            falsehood_threshold: self.falsehood_threshold,
            top_k_proofs: self.top_k_proofs,
            max_claims: self.max_claims,
            ..VerifierConfig::default()
        }
    }
}

async fn ready_pipeline(cli: &Cli) -> Result<Arc<Pipeline>> {
    let registry = Arc::new(ModelRegistry::new());
    let loader = OnnxModelLoader::new(cli.model_config());
    registry.initialize(&loader).await?;
    let pipeline = Pipeline::new(registry, cli.verifier_config())?;
    Ok(Arc::new(pipeline))
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    match &cli.cmd {
        Cmd::Serve {
            addr,
            cache_capacity,
            cache_ttl_secs,
        } => {
            let pipeline = ready_pipeline(&cli).await?;
            let state = AppState {
                pipeline,
                cache: Arc::new(ResponseCache::new(
                    *cache_capacity,
                    Duration::from_secs(*cache_ttl_secs),
                )),
            };
            run_server(state, addr).await?;
        }
        Cmd::Classify { text } => {
            let pipeline = ready_pipeline(&cli).await?;
            let verdict = pipeline.classify(text).await?;
            println!("{}", serde_json::to_string_pretty(&verdict)?);
        }
        Cmd::BuildIndex { input, output } => {
            let raw = std::fs::read_to_string(input)
                .with_context(|| format!("reading corpus file {}", input.display()))?;
            let docs: Vec<RawDocument> = serde_json::from_str(&raw)
                .with_context(|| format!("parsing corpus file {}", input.display()))?;
            info!(docs = docs.len(), "embedding corpus");

            let model_cfg = cli.model_config();
            let embedder =
                tokio::task::spawn_blocking(move || OnnxEmbedder::load(&model_cfg)).await??;
            let written = build_artifact(&embedder, docs, output).await?;
            println!("wrote {written} snippets to {}", output.display());
        }
    }
    Ok(())
}

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::config::EmbeddingConfig;

/// Maximum characters to send per text to the embedding API.
/// mxbai-embed-large has a 512-token context; Japanese research prose
/// tokenises densely (~1 token per 1-2 chars), so cap well under it.
const MAX_EMBED_CHARS: usize = 1_000;

/// Truncate `text` to at most `MAX_EMBED_CHARS`, splitting on a UTF-8 char boundary.
fn truncate_for_embedding(text: &str) -> &str {
    if text.len() <= MAX_EMBED_CHARS {
        return text;
    }
    // Find the last char boundary at or before the limit
    let mut end = MAX_EMBED_CHARS;
    while !text.is_char_boundary(end) {
        end -= 1;
    }
    &text[..end]
}

/// The seam between the engine and the embedding service.
#[allow(async_fn_in_trait)]
pub trait EmbeddingProvider {
    fn is_configured(&self) -> bool;

    /// Embed a single query text into a fixed-dimension vector.
    async fn embed(&self, text: &str) -> Result<Vec<f32>>;
}

/// HTTP embedding client for Ollama or OpenAI-compatible providers.
#[derive(Clone)]
pub struct HttpEmbeddingProvider {
    client: reqwest::Client,
    config: EmbeddingConfig,
}

impl HttpEmbeddingProvider {
    pub fn new(config: EmbeddingConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .connect_timeout(std::time::Duration::from_secs(10))
            .timeout(std::time::Duration::from_secs(config.timeout_secs))
            .build()?;
        Ok(Self { client, config })
    }
}

impl EmbeddingProvider for HttpEmbeddingProvider {
    fn is_configured(&self) -> bool {
        self.config.base_url.is_some()
    }

    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let truncated = truncate_for_embedding(text);
        let embedding = match self.config.provider.as_str() {
            "ollama" => embed_ollama(&self.client, &self.config, truncated).await?,
            "openai" => embed_openai(&self.client, &self.config, truncated).await?,
            other => anyhow::bail!("Unknown embedding provider: {other}"),
        };

        if embedding.len() != self.config.dim {
            anyhow::bail!(
                "Embedding dimension mismatch: expected {}, got {}",
                self.config.dim,
                embedding.len()
            );
        }
        Ok(embedding)
    }
}

// ─── Ollama ──────────────────────────────────────────────

#[derive(Serialize)]
struct OllamaEmbedRequest {
    model: String,
    input: Vec<String>,
    /// Ask Ollama to silently truncate inputs that exceed the model's context
    /// length instead of returning a 400 error.
    truncate: bool,
}

#[derive(Deserialize)]
struct OllamaEmbedResponse {
    embeddings: Vec<Vec<f32>>,
}

async fn embed_ollama(
    client: &reqwest::Client,
    config: &EmbeddingConfig,
    text: &str,
) -> Result<Vec<f32>> {
    let base_url = config
        .base_url
        .as_deref()
        .context("Embedding base_url not configured")?;
    let url = format!("{}/api/embed", base_url.trim_end_matches('/'));

    let req = OllamaEmbedRequest {
        model: config.model.clone(),
        input: vec![text.to_string()],
        truncate: true,
    };

    let resp = client
        .post(&url)
        .json(&req)
        .send()
        .await
        .context("Failed to call Ollama embed API")?;

    if !resp.status().is_success() {
        let status = resp.status();
        let body = resp.text().await.unwrap_or_default();
        anyhow::bail!("Ollama embed API returned {status}: {body}");
    }

    let body: OllamaEmbedResponse = resp
        .json()
        .await
        .context("Failed to parse Ollama embed response")?;

    body.embeddings
        .into_iter()
        .next()
        .context("No embedding returned")
}

// ─── OpenAI-compatible ───────────────────────────────────

#[derive(Serialize)]
struct OpenAiEmbedRequest {
    model: String,
    input: Vec<String>,
}

#[derive(Deserialize)]
struct OpenAiEmbedResponse {
    data: Vec<OpenAiEmbedData>,
}

#[derive(Deserialize)]
struct OpenAiEmbedData {
    embedding: Vec<f32>,
}

async fn embed_openai(
    client: &reqwest::Client,
    config: &EmbeddingConfig,
    text: &str,
) -> Result<Vec<f32>> {
    let base_url = config
        .base_url
        .as_deref()
        .context("Embedding base_url not configured")?;
    let url = format!("{}/v1/embeddings", base_url.trim_end_matches('/'));
    let api_key = config.api_key.as_deref().unwrap_or_default();

    let req = OpenAiEmbedRequest {
        model: config.model.clone(),
        input: vec![text.to_string()],
    };

    let resp = client
        .post(&url)
        .header("Authorization", format!("Bearer {api_key}"))
        .json(&req)
        .send()
        .await
        .context("Failed to call OpenAI embed API")?;

    if !resp.status().is_success() {
        let status = resp.status();
        let body = resp.text().await.unwrap_or_default();
        anyhow::bail!("OpenAI embed API returned {status}: {body}");
    }

    let body: OpenAiEmbedResponse = resp
        .json()
        .await
        .context("Failed to parse OpenAI embed response")?;

    body.data
        .into_iter()
        .next()
        .map(|d| d.embedding)
        .context("No embedding returned")
}

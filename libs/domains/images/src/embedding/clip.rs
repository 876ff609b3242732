use async_trait::async_trait;
use core_config::{ConfigError, FromEnv, env_optional, env_or_default, env_parse};
use reqwest::{Client, RequestBuilder};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, instrument};

use super::EmbeddingProvider;
use crate::error::{ImageError, ImageResult};

pub const DEFAULT_CLIP_MODEL: &str = "openai/clip-vit-base-patch32";
pub const DEFAULT_EMBEDDING_DIMENSION: usize = 512;

/// CLIP inference server configuration
#[derive(Debug, Clone)]
pub struct ClipConfig {
    pub base_url: String,
    pub api_key: Option<String>,
    pub model: String,
    pub dimension: usize,
    pub timeout: Duration,
}

impl ClipConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            api_key: None,
            model: DEFAULT_CLIP_MODEL.to_string(),
            dimension: DEFAULT_EMBEDDING_DIMENSION,
            timeout: Duration::from_secs(60),
        }
    }

    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn with_dimension(mut self, dimension: usize) -> Self {
        self.dimension = dimension;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

impl FromEnv for ClipConfig {
    fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            base_url: env_or_default("EMBEDDER_URL", "http://localhost:8001"),
            api_key: env_optional("EMBEDDER_API_KEY"),
            model: env_or_default("EMBEDDER_MODEL", DEFAULT_CLIP_MODEL),
            dimension: env_parse("EMBEDDING_DIMENSION", DEFAULT_EMBEDDING_DIMENSION)?,
            timeout: Duration::from_secs(env_parse("EMBEDDER_TIMEOUT_SECS", 60u64)?),
        })
    }
}

/// Embedding provider backed by a CLIP inference server over HTTP
pub struct ClipHttpProvider {
    client: Client,
    config: ClipConfig,
}

impl ClipHttpProvider {
    pub fn new(config: ClipConfig) -> ImageResult<Self> {
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| ImageError::Config(format!("failed to build embedder client: {}", e)))?;

        Ok(Self { client, config })
    }

    pub fn from_env() -> ImageResult<Self> {
        Self::new(ClipConfig::from_env()?)
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.config.base_url.trim_end_matches('/'), path)
    }

    fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        match &self.config.api_key {
            Some(key) => request.bearer_auth(key),
            None => request,
        }
    }

    async fn send(&self, request: RequestBuilder) -> ImageResult<Vec<f32>> {
        let response = self
            .authorize(request)
            .send()
            .await
            .map_err(|e| ImageError::EmbedderUnavailable(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            return Err(ImageError::EmbedderUnavailable(format!(
                "embedder error ({}): {}",
                status, error_text
            )));
        }

        let body: EmbeddingResponse = response
            .json()
            .await
            .map_err(|e| {
                ImageError::EmbedderUnavailable(format!("invalid embedder response: {}", e))
            })?;

        let embedding = body
            .data
            .into_iter()
            .min_by_key(|d| d.index)
            .map(|d| d.embedding)
            .ok_or_else(|| ImageError::EmbedderUnavailable("No embedding returned".to_string()))?;

        if embedding.len() != self.config.dimension {
            return Err(ImageError::EmbedderUnavailable(format!(
                "expected {} dimensions, got {}",
                self.config.dimension,
                embedding.len()
            )));
        }

        debug!(dimension = embedding.len(), "Embedding received");
        Ok(embedding)
    }
}

#[derive(Debug, Serialize)]
struct TextEmbeddingRequest<'a> {
    model: &'a str,
    input: Vec<&'a str>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingData>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingData {
    embedding: Vec<f32>,
    #[serde(default)]
    index: usize,
}

#[async_trait]
impl EmbeddingProvider for ClipHttpProvider {
    fn dimension(&self) -> usize {
        self.config.dimension
    }

    #[instrument(skip(self, bytes), fields(size = bytes.len()))]
    async fn embed_image(&self, bytes: &[u8]) -> ImageResult<Vec<f32>> {
        let request = self
            .client
            .post(self.endpoint("embed/image"))
            .query(&[("model", self.config.model.as_str())])
            .header(reqwest::header::CONTENT_TYPE, "application/octet-stream")
            .body(bytes.to_vec());

        self.send(request).await
    }

    #[instrument(skip(self))]
    async fn embed_text(&self, text: &str) -> ImageResult<Vec<f32>> {
        let request = self
            .client
            .post(self.endpoint("embed/text"))
            .json(&TextEmbeddingRequest {
                model: &self.config.model,
                input: vec![text],
            });

        self.send(request).await
    }
}

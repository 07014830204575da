use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use url::Url;

use azsearch_client::auth::{Authorizer, COGNITIVE_SERVICES_RESOURCE};
use azsearch_client::http;
use azsearch_core::config::EmbeddingSettings;
use azsearch_core::error::{Error, Result};

use crate::{Embedder, DEFAULT_DIMENSIONS};

#[derive(Serialize)]
struct EmbeddingRequest<'a> {
    input: &'a [String],
    #[serde(skip_serializing_if = "Option::is_none")]
    dimensions: Option<usize>,
}

#[derive(Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingItem>,
}

#[derive(Deserialize)]
struct EmbeddingItem {
    index: usize,
    embedding: Vec<f32>,
}

/// Embeddings from an Azure OpenAI deployment:
/// `POST {endpoint}/openai/deployments/{deployment}/embeddings?api-version=..`.
pub struct AzureOpenAiEmbedder {
    http: Client,
    url: Url,
    auth: Authorizer,
    /// Sent only when configured; `text-embedding-3-*` models accept it.
    requested_dimensions: Option<usize>,
    dim: usize,
    id: String,
}

impl AzureOpenAiEmbedder {
    pub fn new(settings: &EmbeddingSettings) -> Result<Self> {
        Self::with_http_client(settings, Client::new())
    }

    pub fn with_http_client(settings: &EmbeddingSettings, http: Client) -> Result<Self> {
        settings.validate()?;
        let mut url = settings.endpoint_url()?;
        url.path_segments_mut()
            .map_err(|()| Error::Config("embedding endpoint cannot be a base URL".into()))?
            .pop_if_empty()
            .extend(["openai", "deployments", settings.deployment(), "embeddings"]);
        url.query_pairs_mut().append_pair("api-version", settings.api_version());
        let dim = settings.dimensions.unwrap_or(DEFAULT_DIMENSIONS);
        let credential = settings.credential();
        let auth = Authorizer::new(credential, COGNITIVE_SERVICES_RESOURCE, http.clone());
        Ok(Self {
            http,
            url,
            auth,
            requested_dimensions: settings.dimensions,
            dim,
            id: format!("azure-openai:{}:d{dim}", settings.deployment()),
        })
    }

    async fn fetch(&self, texts: &[String]) -> Result<EmbeddingResponse> {
        let body = EmbeddingRequest { input: texts, dimensions: self.requested_dimensions };
        let request = self.auth.authorize(self.http.post(self.url.clone())).await?.json(&body);
        tracing::debug!(count = texts.len(), deployment = %self.id, "embedding request");
        let response = request.send().await.map_err(http::send_error)?;
        let response = http::check_status(response).await?;
        response.json().await.map_err(|e| Error::Embedding(format!("response parse failed: {e}")))
    }
}

#[async_trait]
impl Embedder for AzureOpenAiEmbedder {
    fn embedder_id(&self) -> &str {
        &self.id
    }

    fn dim(&self) -> usize {
        self.dim
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }
        let mut data = self.fetch(texts).await?.data;
        if data.len() != texts.len() {
            let message = format!("expected {} embeddings, got {}", texts.len(), data.len());
            return Err(Error::Embedding(message));
        }
        data.sort_by_key(|item| item.index);
        data.into_iter()
            .map(|item| {
                if item.embedding.len() == self.dim {
                    Ok(item.embedding)
                } else {
                    Err(Error::Embedding(format!(
                        "embedding {} has {} dimensions, expected {}",
                        item.index,
                        item.embedding.len(),
                        self.dim
                    )))
                }
            })
            .collect()
    }
}

//! azsearch-client
//!
//! HTTPS client for the search service REST surface: index management
//! (`index`), batch document indexing (`documents`) and queries (`search`).
//! Every call is a single awaited round trip; nothing is retried.

pub mod auth;
pub mod documents;
pub mod http;
pub mod index;
pub mod search;

pub use auth::Authorizer;
pub use documents::{BatchOutcome, IndexAction};
pub use index::IndexOutcome;
pub use search::Suggestion;

use reqwest::{Client, Method, RequestBuilder, Response};
use serde::Serialize;
use std::time::Duration;
use url::Url;

use azsearch_core::config::SearchSettings;
use azsearch_core::error::{Error, Result};

use crate::auth::SEARCH_RESOURCE;

pub struct SearchServiceClient {
    http: Client,
    endpoint: Url,
    api_version: String,
    auth: Authorizer,
}

impl SearchServiceClient {
    pub fn new(settings: &SearchSettings) -> Result<Self> {
        let mut builder = Client::builder();
        if let Some(secs) = settings.request_timeout_secs {
            builder = builder.timeout(Duration::from_secs(secs));
        }
        let http = builder
            .build()
            .map_err(|e| Error::Config(format!("failed to build HTTP client: {e}")))?;
        Self::with_http_client(settings, http)
    }

    pub fn with_http_client(settings: &SearchSettings, http: Client) -> Result<Self> {
        let endpoint = settings.endpoint_url()?;
        let auth = Authorizer::new(settings.credential(), SEARCH_RESOURCE, http.clone());
        Ok(Self { http, endpoint, api_version: settings.api_version().to_string(), auth })
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    /// `{endpoint}/{segments...}?api-version=..`, each segment percent-encoded.
    fn url(&self, segments: &[&str]) -> Result<Url> {
        let mut url = self.endpoint.clone();
        url.path_segments_mut()
            .map_err(|()| {
                Error::Config(format!("endpoint '{}' cannot be a base URL", self.endpoint))
            })?
            .pop_if_empty()
            .extend(segments);
        url.query_pairs_mut().append_pair("api-version", &self.api_version);
        Ok(url)
    }

    async fn request(&self, method: Method, url: Url) -> Result<RequestBuilder> {
        tracing::debug!(%method, path = url.path(), "search service request");
        self.auth.authorize(self.http.request(method, url)).await
    }

    async fn send_json<B: Serialize + ?Sized>(
        &self,
        method: Method,
        url: Url,
        body: &B,
    ) -> Result<Response> {
        let builder = self.request(method, url).await?.json(body);
        let response = builder.send().await.map_err(http::send_error)?;
        http::check_status(response).await
    }

    async fn send_empty(&self, method: Method, url: Url) -> Result<Response> {
        let response = self.request(method, url).await?.send().await.map_err(http::send_error)?;
        http::check_status(response).await
    }
}

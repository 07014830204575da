//! Request authorization for Azure endpoints: a key header, a static bearer
//! token, or a managed identity token fetched on first use and cached.

use reqwest::{Client, RequestBuilder};
use serde::Deserialize;
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use tokio::sync::Mutex;

use azsearch_core::config::Credential;
use azsearch_core::error::{Error, Result};

use crate::http;

pub const IMDS_TOKEN_ENDPOINT: &str = "http://169.254.169.254/metadata/identity/oauth2/token";
const IMDS_API_VERSION: &str = "2018-02-01";

/// Token audience of the search service.
pub const SEARCH_RESOURCE: &str = "https://search.azure.com";
/// Token audience of Azure OpenAI deployments.
pub const COGNITIVE_SERVICES_RESOURCE: &str = "https://cognitiveservices.azure.com";

/// Tokens are refreshed this long before they expire.
const EXPIRY_SKEW: Duration = Duration::from_secs(300);

#[derive(Clone)]
struct CachedToken {
    token: String,
    expires_at: SystemTime,
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
    /// Seconds since the epoch, sent as a string by the metadata endpoint.
    expires_on: Option<serde_json::Value>,
    expires_in: Option<serde_json::Value>,
}

pub struct Authorizer {
    credential: Credential,
    resource: &'static str,
    http: Client,
    cached: Mutex<Option<CachedToken>>,
}

impl Authorizer {
    /// `resource` is the audience requested from the managed identity endpoint.
    pub fn new(credential: Credential, resource: &'static str, http: Client) -> Self {
        Self { credential, resource, http, cached: Mutex::new(None) }
    }

    pub async fn authorize(&self, builder: RequestBuilder) -> Result<RequestBuilder> {
        Ok(match &self.credential {
            Credential::ApiKey(key) => builder.header("api-key", key),
            Credential::AccessToken(token) => builder.bearer_auth(token),
            Credential::ManagedIdentity { endpoint } => {
                let token = self.managed_identity_token(endpoint.as_deref()).await?;
                builder.bearer_auth(token)
            }
        })
    }

    async fn managed_identity_token(&self, endpoint: Option<&str>) -> Result<String> {
        let mut cached = self.cached.lock().await;
        if let Some(c) = cached.as_ref() {
            if SystemTime::now() + EXPIRY_SKEW < c.expires_at {
                return Ok(c.token.clone());
            }
        }
        let endpoint = endpoint.unwrap_or(IMDS_TOKEN_ENDPOINT);
        tracing::debug!(endpoint, resource = self.resource, "requesting managed identity token");
        let response = self
            .http
            .get(endpoint)
            .query(&[("api-version", IMDS_API_VERSION), ("resource", self.resource)])
            .header("Metadata", "true")
            .send()
            .await
            .map_err(|e| Error::Auth {
                status: 0,
                message: format!("managed identity endpoint unreachable: {e}"),
            })?;
        let response = http::check_status(response).await?;
        let body: TokenResponse = http::json_body(response).await?;
        let expires_at = expiry(&body);
        *cached = Some(CachedToken { token: body.access_token.clone(), expires_at });
        tracing::info!(resource = self.resource, "acquired managed identity token");
        Ok(body.access_token)
    }
}

fn seconds(v: Option<&serde_json::Value>) -> Option<u64> {
    match v? {
        serde_json::Value::Number(n) => n.as_u64(),
        serde_json::Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn expiry(body: &TokenResponse) -> SystemTime {
    if let Some(on) = seconds(body.expires_on.as_ref()) {
        return UNIX_EPOCH + Duration::from_secs(on);
    }
    let ttl = seconds(body.expires_in.as_ref()).unwrap_or(0);
    SystemTime::now() + Duration::from_secs(ttl)
}

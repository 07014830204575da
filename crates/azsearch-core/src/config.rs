//! Configuration loader and path helpers.
//!
//! Uses Figment to merge `azsearch.toml` + `azsearch.<env>.toml` + the Azure
//! environment variables + `AZSEARCH_*` overrides. Required values are checked
//! in [`Settings::load`], so a missing endpoint or index name fails before any
//! HTTP client exists.

use figment::{
    providers::{Env, Format, Toml},
    Figment,
};
use serde::Deserialize;
use std::env;
use std::path::PathBuf;
use url::Url;

use crate::error::{Error, Result};

pub const DEFAULT_SEARCH_API_VERSION: &str = "2024-07-01";
pub const DEFAULT_EMBEDDING_API_VERSION: &str = "2024-02-01";
pub const DEFAULT_EMBEDDING_MODEL: &str = "text-embedding-3-small";
pub const DEFAULT_DOCUMENTS_PATH: &str = "data/hotels.json";

/// Well-known variable names and the settings keys they populate.
const AZURE_ENV_KEYS: &[(&str, &str)] = &[
    ("AZURE_SEARCH_SERVICE_ENDPOINT", "search.endpoint"),
    ("AZURE_SEARCH_INDEX_NAME", "search.index_name"),
    ("AZURE_SEARCH_ADMIN_KEY", "search.api_key"),
    ("AZURE_SEARCH_ACCESS_TOKEN", "search.access_token"),
    ("AZURE_OPENAI_ENDPOINT", "embedding.endpoint"),
    ("AZURE_OPENAI_EMBEDDING_DEPLOYMENT", "embedding.deployment"),
    ("AZURE_OPENAI_EMBEDDING_MODEL", "embedding.model"),
    ("AZURE_OPENAI_API_KEY", "embedding.api_key"),
    ("AZURE_OPENAI_ACCESS_TOKEN", "embedding.access_token"),
    ("AZURE_OPENAI_EMBEDDING_DIMENSIONS", "embedding.dimensions"),
    ("AZSEARCH_USE_FAKE_EMBEDDINGS", "embedding.use_fake"),
];

/// Older names, merged underneath `AZURE_ENV_KEYS` so the primary name wins.
const AZURE_ENV_ALIASES: &[(&str, &str)] = &[
    ("AZURE_SEARCH_API_KEY", "search.api_key"),
    ("AZURE_OPENAI_EMBEDDING_DEPLOYMENT_NAME", "embedding.deployment"),
];

#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub search: SearchSettings,
    #[serde(default)]
    pub embedding: EmbeddingSettings,
    #[serde(default)]
    pub data: DataSettings,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SearchSettings {
    #[serde(default)]
    pub endpoint: String,
    #[serde(default)]
    pub index_name: String,
    pub api_key: Option<String>,
    pub access_token: Option<String>,
    /// Token endpoint used when neither a key nor a token is configured.
    pub identity_endpoint: Option<String>,
    pub api_version: Option<String>,
    pub request_timeout_secs: Option<u64>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct EmbeddingSettings {
    pub endpoint: Option<String>,
    pub deployment: Option<String>,
    pub model: Option<String>,
    pub api_key: Option<String>,
    pub access_token: Option<String>,
    pub identity_endpoint: Option<String>,
    pub api_version: Option<String>,
    pub dimensions: Option<usize>,
    #[serde(default, deserialize_with = "flag")]
    pub use_fake: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DataSettings {
    #[serde(default = "default_documents_path")]
    pub documents_path: String,
}

impl Default for DataSettings {
    fn default() -> Self {
        Self { documents_path: default_documents_path() }
    }
}

fn default_documents_path() -> String {
    DEFAULT_DOCUMENTS_PATH.to_string()
}

/// How requests to the search service or the embedding deployment are authorized.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Credential {
    /// Admin or query key sent in the `api-key` header.
    ApiKey(String),
    /// Pre-acquired Entra ID bearer token.
    AccessToken(String),
    /// Token fetched from the managed identity endpoint at first use.
    ManagedIdentity { endpoint: Option<String> },
}

impl Settings {
    pub fn load() -> Result<Self> {
        let env_name = env::var("RUST_ENV").unwrap_or_else(|_| "dev".to_string());

        let mut figment = Figment::new().merge(Toml::file("azsearch.toml"));
        match env_name.as_str() {
            "dev" | "development" => figment = figment.merge(Toml::file("azsearch.dev.toml")),
            "prod" | "production" => figment = figment.merge(Toml::file("azsearch.prod.toml")),
            "test" | "testing" => figment = figment.merge(Toml::file("azsearch.test.toml")),
            _ => {}
        }
        figment = figment
            .merge(mapped_env(AZURE_ENV_ALIASES))
            .merge(mapped_env(AZURE_ENV_KEYS))
            .merge(Env::prefixed("AZSEARCH_").split("__"));

        Self::from_figment(&figment)
    }

    pub fn from_figment(figment: &Figment) -> Result<Self> {
        let settings: Settings = figment
            .extract()
            .map_err(|e| Error::Config(e.to_string()))?;
        settings.search.validate()?;
        tracing::debug!(
            endpoint = %settings.search.endpoint,
            index = %settings.search.index_name,
            "configuration loaded"
        );
        Ok(settings)
    }

    /// Documents file path with `~` and `${VAR}` expanded.
    pub fn documents_path(&self) -> PathBuf {
        expand_path(&self.data.documents_path)
    }
}

impl SearchSettings {
    fn validate(&self) -> Result<()> {
        if self.endpoint.trim().is_empty() {
            return Err(Error::Config("AZURE_SEARCH_SERVICE_ENDPOINT is not set".into()));
        }
        if self.index_name.trim().is_empty() {
            return Err(Error::Config("AZURE_SEARCH_INDEX_NAME is not set".into()));
        }
        self.endpoint_url()?;
        Ok(())
    }

    pub fn endpoint_url(&self) -> Result<Url> {
        parse_endpoint("search endpoint", &self.endpoint)
    }

    pub fn api_version(&self) -> &str {
        self.api_version.as_deref().unwrap_or(DEFAULT_SEARCH_API_VERSION)
    }

    /// Key first, then static token, then managed identity.
    pub fn credential(&self) -> Credential {
        Credential::select(&self.api_key, &self.access_token, &self.identity_endpoint)
    }
}

impl EmbeddingSettings {
    /// Checks the values an HTTP embedder needs. The fake embedder needs none.
    pub fn validate(&self) -> Result<()> {
        if self.use_fake {
            return Ok(());
        }
        let endpoint = non_empty(self.endpoint.as_deref())
            .ok_or_else(|| Error::Config("AZURE_OPENAI_ENDPOINT is not set".into()))?;
        parse_endpoint("embedding endpoint", endpoint)?;
        if non_empty(self.deployment.as_deref()).is_none() {
            return Err(Error::Config("AZURE_OPENAI_EMBEDDING_DEPLOYMENT is not set".into()));
        }
        if self.dimensions == Some(0) {
            return Err(Error::Config("embedding dimensions must be positive".into()));
        }
        Ok(())
    }

    pub fn endpoint_url(&self) -> Result<Url> {
        let endpoint = self.endpoint.as_deref().unwrap_or_default();
        parse_endpoint("embedding endpoint", endpoint)
    }

    pub fn deployment(&self) -> &str {
        self.deployment.as_deref().unwrap_or_default()
    }

    pub fn model(&self) -> &str {
        self.model.as_deref().unwrap_or(DEFAULT_EMBEDDING_MODEL)
    }

    pub fn api_version(&self) -> &str {
        self.api_version.as_deref().unwrap_or(DEFAULT_EMBEDDING_API_VERSION)
    }

    /// Same precedence as the search credential.
    pub fn credential(&self) -> Credential {
        Credential::select(&self.api_key, &self.access_token, &self.identity_endpoint)
    }
}

impl Credential {
    fn select(
        api_key: &Option<String>,
        access_token: &Option<String>,
        identity_endpoint: &Option<String>,
    ) -> Self {
        if let Some(key) = non_empty(api_key.as_deref()) {
            return Credential::ApiKey(key.to_string());
        }
        if let Some(token) = non_empty(access_token.as_deref()) {
            return Credential::AccessToken(token.to_string());
        }
        Credential::ManagedIdentity { endpoint: identity_endpoint.clone() }
    }
}

fn mapped_env(table: &'static [(&'static str, &'static str)]) -> Env {
    Env::raw().filter_map(move |key| {
        table
            .iter()
            .find(|(name, _)| key.as_str().eq_ignore_ascii_case(name))
            .map(|(_, path)| (*path).into())
    })
}

fn parse_endpoint(what: &str, raw: &str) -> Result<Url> {
    let url = Url::parse(raw.trim()).map_err(|e| Error::Config(format!("{what} '{raw}': {e}")))?;
    match url.scheme() {
        "https" | "http" => Ok(url),
        other => Err(Error::Config(format!("{what} '{raw}': unsupported scheme '{other}'"))),
    }
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

/// Accepts `true`/`false`, `1`/`0` and their string forms for env-sourced flags.
fn flag<'de, D>(deserializer: D) -> std::result::Result<bool, D::Error>
where
    D: serde::Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Bool(bool),
        Int(i64),
        Str(String),
    }
    Ok(match Raw::deserialize(deserializer)? {
        Raw::Bool(b) => b,
        Raw::Int(i) => i != 0,
        Raw::Str(s) => {
            matches!(s.trim().to_ascii_lowercase().as_str(), "1" | "true" | "yes" | "on")
        }
    })
}

/// Expand a user-provided path string:
/// - Expands leading '~' to the user's home directory
/// - Expands ${VAR} and $VAR environment variables
/// - Returns a PathBuf without attempting to canonicalize
pub fn expand_path<S: AsRef<str>>(input: S) -> PathBuf {
    let s = input.as_ref();
    let expanded_env = shellexpand::env(s).unwrap_or(std::borrow::Cow::Borrowed(s));
    let expanded = shellexpand::tilde(&expanded_env);
    PathBuf::from(expanded.as_ref())
}

use reqwest::{Method, StatusCode};
use serde::Deserialize;

use azsearch_core::error::{Error, Result};
use azsearch_core::schema::IndexSchema;

use crate::{http, SearchServiceClient};

/// What a create-or-update call did on the service side.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndexOutcome {
    Created,
    Updated,
}

#[derive(Deserialize)]
struct NameList {
    value: Vec<NameEntry>,
}

#[derive(Deserialize)]
struct NameEntry {
    name: String,
}

impl SearchServiceClient {
    /// `PUT /indexes/{name}`. Re-submitting an unchanged schema sends the same
    /// body and leaves the remote definition as it was; a changed schema is
    /// applied or rejected by the service (e.g. an incompatible type change).
    pub async fn create_or_update_index(&self, schema: &IndexSchema) -> Result<IndexOutcome> {
        schema.validate()?;
        let url = self.url(&["indexes", &schema.name])?;
        let response = self
            .request(Method::PUT, url)
            .await?
            .header("Prefer", "return=representation")
            .json(schema)
            .send()
            .await
            .map_err(http::send_error)?;
        let response = http::check_status(response).await?;
        let outcome = if response.status() == StatusCode::CREATED {
            IndexOutcome::Created
        } else {
            IndexOutcome::Updated
        };
        tracing::info!(index = %schema.name, ?outcome, "index schema submitted");
        Ok(outcome)
    }

    pub async fn get_index(&self, name: &str) -> Result<IndexSchema> {
        let response = self.send_empty(Method::GET, self.url(&["indexes", name])?).await?;
        http::json_body(response).await
    }

    /// Returns `false` when the index did not exist.
    pub async fn delete_index(&self, name: &str) -> Result<bool> {
        match self.send_empty(Method::DELETE, self.url(&["indexes", name])?).await {
            Ok(_) => {
                tracing::info!(index = name, "index deleted");
                Ok(true)
            }
            Err(Error::NotFound(_)) => Ok(false),
            Err(e) => Err(e),
        }
    }

    pub async fn list_index_names(&self) -> Result<Vec<String>> {
        let mut url = self.url(&["indexes"])?;
        url.query_pairs_mut().append_pair("$select", "name");
        let response = self.send_empty(Method::GET, url).await?;
        let list: NameList = http::json_body(response).await?;
        Ok(list.value.into_iter().map(|e| e.name).collect())
    }

    /// `GET /indexes/{name}/docs/$count`, answered as plain text.
    pub async fn document_count(&self, name: &str) -> Result<u64> {
        let url = self.url(&["indexes", name, "docs", "$count"])?;
        let response = self.send_empty(Method::GET, url).await?;
        let text = response.text().await.map_err(|e| Error::Decode(e.to_string()))?;
        text.trim_start_matches('\u{feff}')
            .trim()
            .parse()
            .map_err(|e| Error::Decode(format!("document count '{text}': {e}")))
    }
}

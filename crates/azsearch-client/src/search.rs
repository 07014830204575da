use reqwest::Method;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use azsearch_core::error::Result;
use azsearch_core::query::SearchRequest;
use azsearch_core::results::{Document, SearchResults};

use crate::{http, SearchServiceClient};

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Suggestion {
    #[serde(rename = "@search.text")]
    pub text: String,
    #[serde(flatten)]
    pub document: Document,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct SuggestRequest<'a> {
    search: &'a str,
    suggester_name: &'a str,
    top: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    select: Option<String>,
}

#[derive(Deserialize)]
struct SuggestResponse {
    value: Vec<Suggestion>,
}

impl SearchServiceClient {
    /// `POST /indexes/{name}/docs/search`. Results come back in the service's
    /// order: text relevance, vector similarity, explicit `orderby`, or
    /// reranker score depending on the request.
    pub async fn search(&self, index: &str, request: &SearchRequest) -> Result<SearchResults> {
        request.validate()?;
        let url = self.url(&["indexes", index, "docs", "search"])?;
        let response = self.send_json(Method::POST, url, request).await?;
        let body: Value = http::json_body(response).await?;
        let results = SearchResults::from_body(body)?;
        tracing::debug!(index, hits = results.remaining(), "search completed");
        Ok(results)
    }

    /// Looks up one document by key.
    pub async fn get_document(&self, index: &str, key: &str) -> Result<Document> {
        let url = self.url(&["indexes", index, "docs", key])?;
        let response = self.send_empty(Method::GET, url).await?;
        http::json_body(response).await
    }

    /// Type-ahead suggestions from a named suggester.
    pub async fn suggest(
        &self,
        index: &str,
        suggester: &str,
        text: &str,
        top: usize,
        select: &[&str],
    ) -> Result<Vec<Suggestion>> {
        let body = SuggestRequest {
            search: text,
            suggester_name: suggester,
            top,
            select: (!select.is_empty()).then(|| select.join(",")),
        };
        let url = self.url(&["indexes", index, "docs", "suggest"])?;
        let response = self.send_json(Method::POST, url, &body).await?;
        let parsed: SuggestResponse = http::json_body(response).await?;
        Ok(parsed.value)
    }
}

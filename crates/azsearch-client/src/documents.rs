use reqwest::Method;
use serde::ser::{SerializeMap, Serializer};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use azsearch_core::error::{Error, Result};
use azsearch_core::results::Document;

use crate::{http, SearchServiceClient};

/// Per-record action key of a batch, also present in batch envelope files.
pub const ACTION_KEY: &str = "@search.action";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum IndexAction {
    Upload,
    Merge,
    MergeOrUpload,
    Delete,
}

/// Every document in the batch was accepted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchOutcome {
    pub succeeded: usize,
}

/// A record tagged with the batch action. An action already carried by the
/// record is dropped so the requested one is the only key sent.
struct ActionDocument<'a> {
    action: IndexAction,
    document: &'a Document,
}

impl Serialize for ActionDocument<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let fields = self.document.iter().filter(|(k, _)| k.as_str() != ACTION_KEY);
        let mut map = serializer.serialize_map(None)?;
        map.serialize_entry(ACTION_KEY, &self.action)?;
        for (k, v) in fields {
            map.serialize_entry(k, v)?;
        }
        map.end()
    }
}

#[derive(Serialize)]
struct Batch<'a> {
    value: Vec<ActionDocument<'a>>,
}

#[derive(Deserialize)]
struct BatchResponse {
    #[serde(default)]
    value: Vec<ItemResult>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ItemResult {
    key: String,
    status: bool,
    error_message: Option<String>,
    status_code: Option<u16>,
}

impl SearchServiceClient {
    /// Submits the whole collection as one batch with `upload` semantics.
    pub async fn upload_documents(&self, index: &str, docs: &[Document]) -> Result<BatchOutcome> {
        self.index_documents(index, IndexAction::Upload, docs).await
    }

    pub async fn merge_documents(&self, index: &str, docs: &[Document]) -> Result<BatchOutcome> {
        self.index_documents(index, IndexAction::Merge, docs).await
    }

    pub async fn merge_or_upload_documents(
        &self,
        index: &str,
        docs: &[Document],
    ) -> Result<BatchOutcome> {
        self.index_documents(index, IndexAction::MergeOrUpload, docs).await
    }

    /// Deletes by key; only the key field is sent for each document.
    pub async fn delete_documents(
        &self,
        index: &str,
        key_field: &str,
        keys: &[&str],
    ) -> Result<BatchOutcome> {
        let docs: Vec<Document> = keys
            .iter()
            .map(|k| {
                let mut d = Document::new();
                d.insert(key_field.to_string(), Value::String((*k).to_string()));
                d
            })
            .collect();
        self.index_documents(index, IndexAction::Delete, &docs).await
    }

    /// `POST /indexes/{name}/docs/index`. Any rejected document fails the
    /// call with `Error::PartialBatch`; there is no chunking and no retry.
    pub async fn index_documents(
        &self,
        index: &str,
        action: IndexAction,
        docs: &[Document],
    ) -> Result<BatchOutcome> {
        if docs.is_empty() {
            return Ok(BatchOutcome { succeeded: 0 });
        }
        let value = docs.iter().map(|document| ActionDocument { action, document }).collect();
        let url = self.url(&["indexes", index, "docs", "index"])?;
        let response = self.send_json(Method::POST, url, &Batch { value }).await?;
        let body: BatchResponse = http::json_body(response).await?;
        let outcome = batch_outcome(docs.len(), body)?;
        tracing::info!(index, ?action, count = outcome.succeeded, "document batch accepted");
        Ok(outcome)
    }
}

fn batch_outcome(total: usize, body: BatchResponse) -> Result<BatchOutcome> {
    let failed: Vec<String> = body
        .value
        .iter()
        .filter(|r| !r.status)
        .map(|r| match (&r.error_message, r.status_code) {
            (Some(m), Some(c)) => format!("{} [{c}: {m}]", r.key),
            (Some(m), None) => format!("{} [{m}]", r.key),
            _ => r.key.clone(),
        })
        .collect();
    if !failed.is_empty() {
        tracing::warn!(failed = failed.len(), total, "document batch rejected");
        return Err(Error::PartialBatch { total, failed });
    }
    if body.value.len() != total {
        let got = body.value.len();
        let message = format!("batch response has {got} results for {total} documents");
        return Err(Error::Decode(message));
    }
    Ok(BatchOutcome { succeeded: total })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn doc(value: Value) -> Document {
        serde_json::from_value(value).expect("doc")
    }

    fn batch_json(action: IndexAction, doc: &Document) -> Value {
        let batch = Batch { value: vec![ActionDocument { action, document: doc }] };
        serde_json::to_value(&batch).expect("serialize")
    }

    #[test]
    fn action_is_flattened_into_document() {
        let doc = doc(json!({"HotelId": "1", "Rating": 3.6}));
        assert_eq!(
            batch_json(IndexAction::MergeOrUpload, &doc),
            json!({"value": [{"@search.action": "mergeOrUpload", "HotelId": "1", "Rating": 3.6}]})
        );
    }

    #[test]
    fn requested_action_replaces_the_records_own() {
        let doc = doc(json!({"@search.action": "upload", "HotelId": "1"}));
        let text = serde_json::to_string(&Batch {
            value: vec![ActionDocument { action: IndexAction::Delete, document: &doc }],
        })
        .expect("serialize");
        assert_eq!(text.matches(ACTION_KEY).count(), 1, "{text}");
        assert_eq!(
            batch_json(IndexAction::Delete, &doc),
            json!({"value": [{"@search.action": "delete", "HotelId": "1"}]})
        );
    }

    #[test]
    fn any_failed_item_fails_the_batch() {
        let body: BatchResponse = serde_json::from_value(json!({"value": [
            {"key": "1", "status": true, "statusCode": 201},
            {
                "key": "2",
                "status": false,
                "errorMessage": "Document is malformed",
                "statusCode": 400
            }
        ]}))
        .expect("body");
        match batch_outcome(2, body) {
            Err(Error::PartialBatch { total, failed }) => {
                assert_eq!(total, 2);
                assert_eq!(failed, vec!["2 [400: Document is malformed]".to_string()]);
            }
            other => panic!("expected PartialBatch, got {other:?}"),
        }
    }
}

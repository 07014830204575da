//! Local document collections. Records are passed through untouched; the
//! service validates them against the index schema.

use serde::Deserialize;
use std::fs;
use std::path::Path;

use crate::error::{Error, Result};
use crate::results::Document;

#[derive(Deserialize)]
#[serde(untagged)]
enum DocumentFile {
    Array(Vec<Document>),
    Envelope { value: Vec<Document> },
}

/// Reads a JSON array of objects, or an object with a `value` array.
pub fn load_documents(path: &Path) -> Result<Vec<Document>> {
    let content = fs::read_to_string(path)
        .map_err(|e| Error::Io(std::io::Error::new(e.kind(), format!("{}: {e}", path.display()))))?;
    parse_documents(&content).map_err(|e| match e {
        Error::Decode(m) => Error::Decode(format!("{}: {m}", path.display())),
        other => other,
    })
}

pub fn parse_documents(content: &str) -> Result<Vec<Document>> {
    let parsed: DocumentFile = serde_json::from_str(content).map_err(|e| {
        Error::Decode(format!("expected an array of objects or {{\"value\": [...]}}: {e}"))
    })?;
    let docs = match parsed {
        DocumentFile::Array(docs) | DocumentFile::Envelope { value: docs } => docs,
    };
    tracing::debug!(count = docs.len(), "parsed documents");
    Ok(docs)
}

/// The key value of each document, in order, for reporting.
pub fn document_keys(docs: &[Document], key_field: &str) -> Vec<String> {
    docs.iter()
        .map(|d| match d.get(key_field) {
            Some(serde_json::Value::String(s)) => s.clone(),
            Some(other) => other.to_string(),
            None => String::from("<missing key>"),
        })
        .collect()
}

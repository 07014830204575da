//! Query results as returned by the search endpoint.
//!
//! `SearchResults` is a consuming iterator: hits stay as raw JSON until they
//! are pulled, and once drained the only way to see them again is to reissue
//! the query.

use serde::Deserialize;
use serde_json::{Map, Value};
use std::collections::HashMap;

use crate::error::{Error, Result};
use crate::geo::GeoPoint;

pub type Document = Map<String, Value>;

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Caption {
    pub text: Option<String>,
    pub highlights: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Answer {
    pub key: String,
    pub text: Option<String>,
    pub highlights: Option<String>,
    pub score: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct FacetValue {
    pub value: Option<Value>,
    pub count: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct SearchHit {
    #[serde(rename = "@search.score")]
    pub score: f64,
    #[serde(rename = "@search.rerankerScore", default)]
    pub reranker_score: Option<f64>,
    #[serde(rename = "@search.captions", default)]
    pub captions: Vec<Caption>,
    #[serde(rename = "@search.highlights", default)]
    pub highlights: HashMap<String, Vec<String>>,
    #[serde(flatten)]
    pub document: Document,
}

impl SearchHit {
    /// Field lookup that follows `/`-separated paths into nested objects.
    pub fn get(&self, path: &str) -> Option<&Value> {
        let mut parts = path.split('/');
        let first = self.document.get(parts.next()?)?;
        parts.try_fold(first, |v, p| v.get(p))
    }

    pub fn get_str(&self, path: &str) -> Option<&str> {
        self.get(path).and_then(Value::as_str)
    }

    pub fn geo_point(&self, path: &str) -> Option<GeoPoint> {
        self.get(path).and_then(|v| GeoPoint::deserialize(v).ok())
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct RawResponse {
    #[serde(rename = "@odata.count")]
    count: Option<u64>,
    #[serde(rename = "@search.coverage")]
    coverage: Option<f64>,
    #[serde(rename = "@search.answers", default)]
    answers: Vec<Answer>,
    #[serde(rename = "@search.facets", default)]
    facets: HashMap<String, Vec<FacetValue>>,
    #[serde(default)]
    value: Vec<Value>,
}

#[derive(Debug)]
pub struct SearchResults {
    count: Option<u64>,
    coverage: Option<f64>,
    answers: Vec<Answer>,
    facets: HashMap<String, Vec<FacetValue>>,
    pending: std::vec::IntoIter<Value>,
}

impl SearchResults {
    /// Parses a search response body. Hits are decoded as the iterator advances.
    pub fn from_body(body: Value) -> Result<Self> {
        let raw: RawResponse = serde_json::from_value(body)?;
        Ok(Self {
            count: raw.count,
            coverage: raw.coverage,
            answers: raw.answers,
            facets: raw.facets,
            pending: raw.value.into_iter(),
        })
    }

    /// Total matches, present when the request set `count`.
    pub fn count(&self) -> Option<u64> {
        self.count
    }

    pub fn coverage(&self) -> Option<f64> {
        self.coverage
    }

    pub fn answers(&self) -> &[Answer] {
        &self.answers
    }

    pub fn facets(&self) -> &HashMap<String, Vec<FacetValue>> {
        &self.facets
    }

    /// Hits not yet pulled.
    pub fn remaining(&self) -> usize {
        self.pending.len()
    }
}

impl Iterator for SearchResults {
    type Item = Result<SearchHit>;

    fn next(&mut self) -> Option<Self::Item> {
        let raw = self.pending.next()?;
        Some(serde_json::from_value(raw).map_err(|e| Error::Decode(format!("search hit: {e}"))))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.pending.size_hint()
    }
}

//! Query request value object. Built fresh for every query and serialized as
//! the body of `POST /indexes/{name}/docs/search`.

use serde::Serialize;

use crate::error::{Error, Result};
use crate::geo::GeoPoint;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum QueryType {
    Simple,
    Full,
    Semantic,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SearchMode {
    Any,
    All,
}

/// Sort expression for `$orderby`.
#[derive(Debug, Clone, PartialEq)]
pub struct OrderBy(String);

impl OrderBy {
    pub fn asc(field: &str) -> Self {
        OrderBy(format!("{field} asc"))
    }

    pub fn desc(field: &str) -> Self {
        OrderBy(format!("{field} desc"))
    }

    /// Nearest first.
    pub fn geo_distance(field: &str, point: GeoPoint) -> Self {
        OrderBy(format!("geo.distance({field}, {}) asc", point.to_odata()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// A vector sub-query. `Text` is embedded by the index's vectorizer; `Vector`
/// carries an embedding computed by the caller.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum VectorQuery {
    Text {
        text: String,
        #[serde(flatten)]
        options: VectorQueryOptions,
    },
    Vector {
        vector: Vec<f32>,
        #[serde(flatten)]
        options: VectorQueryOptions,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VectorQueryOptions {
    /// Comma-separated vector field names.
    pub fields: String,
    pub k: usize,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub exhaustive: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub weight: Option<f32>,
}

impl VectorQuery {
    pub fn text(text: impl Into<String>, fields: &[&str], k: usize) -> Self {
        VectorQuery::Text { text: text.into(), options: VectorQueryOptions::new(fields, k) }
    }

    pub fn vector(vector: Vec<f32>, fields: &[&str], k: usize) -> Self {
        VectorQuery::Vector { vector, options: VectorQueryOptions::new(fields, k) }
    }

    pub fn exhaustive(mut self) -> Self {
        self.options_mut().exhaustive = true;
        self
    }

    pub fn weight(mut self, weight: f32) -> Self {
        self.options_mut().weight = Some(weight);
        self
    }

    pub fn options(&self) -> &VectorQueryOptions {
        match self {
            VectorQuery::Text { options, .. } | VectorQuery::Vector { options, .. } => options,
        }
    }

    fn options_mut(&mut self) -> &mut VectorQueryOptions {
        match self {
            VectorQuery::Text { options, .. } | VectorQuery::Vector { options, .. } => options,
        }
    }
}

impl VectorQueryOptions {
    fn new(fields: &[&str], k: usize) -> Self {
        Self { fields: fields.join(","), k, exhaustive: false, weight: None }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Captions {
    Extractive { highlight: bool },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Answers {
    Extractive { count: u32 },
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub search: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none", serialize_with = "comma_list")]
    pub search_fields: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none", serialize_with = "comma_list")]
    pub select: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub top: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub skip: Option<usize>,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub count: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub filter: Option<String>,
    #[serde(
        rename = "orderby",
        skip_serializing_if = "Vec::is_empty",
        serialize_with = "order_list"
    )]
    pub order_by: Vec<OrderBy>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub query_type: Option<QueryType>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub search_mode: Option<SearchMode>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub semantic_configuration: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none", serialize_with = "captions")]
    pub captions: Option<Captions>,
    #[serde(skip_serializing_if = "Option::is_none", serialize_with = "answers")]
    pub answers: Option<Answers>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub facets: Vec<String>,
    #[serde(
        rename = "highlight",
        skip_serializing_if = "Option::is_none",
        serialize_with = "comma_list"
    )]
    pub highlight_fields: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub vector_queries: Vec<VectorQuery>,
}

impl SearchRequest {
    /// Full-text query. `"*"` matches everything.
    pub fn text(search: impl Into<String>) -> Self {
        Self { search: Some(search.into()), ..Self::default() }
    }

    /// Pure vector query with no text component.
    pub fn vector(query: VectorQuery) -> Self {
        Self { vector_queries: vec![query], ..Self::default() }
    }

    /// Text and vector scores fused by the service.
    pub fn hybrid(search: impl Into<String>, query: VectorQuery) -> Self {
        Self { search: Some(search.into()), vector_queries: vec![query], ..Self::default() }
    }

    pub fn select(mut self, fields: &[&str]) -> Self {
        self.select = Some(fields.iter().map(|f| (*f).to_string()).collect());
        self
    }

    pub fn search_fields(mut self, fields: &[&str]) -> Self {
        self.search_fields = Some(fields.iter().map(|f| (*f).to_string()).collect());
        self
    }

    pub fn top(mut self, top: usize) -> Self {
        self.top = Some(top);
        self
    }

    pub fn skip(mut self, skip: usize) -> Self {
        self.skip = Some(skip);
        self
    }

    pub fn include_count(mut self) -> Self {
        self.count = true;
        self
    }

    pub fn filter(mut self, filter: impl Into<String>) -> Self {
        self.filter = Some(filter.into());
        self
    }

    pub fn order_by(mut self, order: OrderBy) -> Self {
        self.order_by.push(order);
        self
    }

    pub fn query_type(mut self, query_type: QueryType) -> Self {
        self.query_type = Some(query_type);
        self
    }

    pub fn search_mode(mut self, mode: SearchMode) -> Self {
        self.search_mode = Some(mode);
        self
    }

    pub fn facet(mut self, facet: impl Into<String>) -> Self {
        self.facets.push(facet.into());
        self
    }

    pub fn highlight(mut self, fields: &[&str]) -> Self {
        self.highlight_fields = Some(fields.iter().map(|f| (*f).to_string()).collect());
        self
    }

    pub fn with_vector(mut self, query: VectorQuery) -> Self {
        self.vector_queries.push(query);
        self
    }

    /// Switches to semantic reranking with extractive captions and answers.
    pub fn semantic(mut self, configuration: impl Into<String>) -> Self {
        self.query_type = Some(QueryType::Semantic);
        self.semantic_configuration = Some(configuration.into());
        self.captions = Some(Captions::Extractive { highlight: true });
        self.answers = Some(Answers::Extractive { count: 1 });
        self
    }

    pub fn captions(mut self, captions: Captions) -> Self {
        self.captions = Some(captions);
        self
    }

    pub fn answers(mut self, answers: Answers) -> Self {
        self.answers = Some(answers);
        self
    }

    /// Rejects combinations the service would refuse or silently ignore.
    pub fn validate(&self) -> Result<()> {
        if self.search.is_none() && self.vector_queries.is_empty() {
            let message = "neither search text nor vector queries given";
            return Err(Error::InvalidRequest(message.into()));
        }
        if self.top == Some(0) {
            return Err(Error::InvalidRequest("top must be positive".into()));
        }
        let semantic = self.query_type == Some(QueryType::Semantic);
        if semantic && self.semantic_configuration.is_none() {
            let message = "semantic query without a semantic configuration";
            return Err(Error::InvalidRequest(message.into()));
        }
        if !semantic && (self.captions.is_some() || self.answers.is_some()) {
            let message = "captions and answers require the semantic query type";
            return Err(Error::InvalidRequest(message.into()));
        }
        for q in &self.vector_queries {
            let opts = q.options();
            if opts.k == 0 {
                return Err(Error::InvalidRequest("vector query k must be positive".into()));
            }
            if opts.fields.trim().is_empty() {
                return Err(Error::InvalidRequest("vector query has no target fields".into()));
            }
            match q {
                VectorQuery::Vector { vector, .. } if vector.is_empty() => {
                    return Err(Error::InvalidRequest("vector query has an empty vector".into()));
                }
                VectorQuery::Text { text, .. } if text.trim().is_empty() => {
                    return Err(Error::InvalidRequest("vector query has empty text".into()));
                }
                _ => {}
            }
        }
        Ok(())
    }
}

#[allow(clippy::ref_option)]
fn comma_list<S: serde::Serializer>(
    fields: &Option<Vec<String>>,
    s: S,
) -> std::result::Result<S::Ok, S::Error> {
    match fields {
        Some(f) => s.serialize_str(&f.join(",")),
        None => s.serialize_none(),
    }
}

#[allow(clippy::ptr_arg)]
fn order_list<S: serde::Serializer>(
    order: &Vec<OrderBy>,
    s: S,
) -> std::result::Result<S::Ok, S::Error> {
    let joined: Vec<&str> = order.iter().map(OrderBy::as_str).collect();
    s.serialize_str(&joined.join(","))
}

#[allow(clippy::ref_option)]
fn captions<S: serde::Serializer>(
    c: &Option<Captions>,
    s: S,
) -> std::result::Result<S::Ok, S::Error> {
    match c {
        Some(Captions::Extractive { highlight: true }) => {
            s.serialize_str("extractive|highlight-true")
        }
        Some(Captions::Extractive { highlight: false }) => {
            s.serialize_str("extractive|highlight-false")
        }
        None => s.serialize_none(),
    }
}

#[allow(clippy::ref_option)]
fn answers<S: serde::Serializer>(
    a: &Option<Answers>,
    s: S,
) -> std::result::Result<S::Ok, S::Error> {
    match a {
        Some(Answers::Extractive { count }) => {
            s.serialize_str(&format!("extractive|count-{count}"))
        }
        None => s.serialize_none(),
    }
}

//! Declarative index schema, serialized in the shape the index-management
//! endpoint accepts.
//!
//! Fields are built with chained capability flags:
//!
//! ```
//! use azsearch_core::schema::{FieldType, IndexSchema, SearchField};
//!
//! let schema = IndexSchema::new("hotels")
//!     .field(SearchField::simple("HotelId", FieldType::String).key().filterable())
//!     .field(SearchField::searchable("HotelName").sortable())
//!     .field(SearchField::complex("Address", vec![SearchField::searchable("City").facetable()]));
//! assert!(schema.validate().is_ok());
//! ```

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::HashSet;
use std::fmt;

use crate::error::{Error, Result};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldType {
    String,
    Int32,
    Int64,
    Double,
    Single,
    Boolean,
    DateTimeOffset,
    GeographyPoint,
    Complex,
    Collection(Box<FieldType>),
}

impl FieldType {
    pub fn collection(inner: FieldType) -> Self {
        FieldType::Collection(Box::new(inner))
    }

    pub fn is_complex(&self) -> bool {
        match self {
            FieldType::Complex => true,
            FieldType::Collection(inner) => inner.is_complex(),
            _ => false,
        }
    }

    fn parse(s: &str) -> Option<Self> {
        if let Some(inner) = s.strip_prefix("Collection(").and_then(|r| r.strip_suffix(')')) {
            return Self::parse(inner).map(Self::collection);
        }
        Some(match s {
            "Edm.String" => FieldType::String,
            "Edm.Int32" => FieldType::Int32,
            "Edm.Int64" => FieldType::Int64,
            "Edm.Double" => FieldType::Double,
            "Edm.Single" => FieldType::Single,
            "Edm.Boolean" => FieldType::Boolean,
            "Edm.DateTimeOffset" => FieldType::DateTimeOffset,
            "Edm.GeographyPoint" => FieldType::GeographyPoint,
            "Edm.ComplexType" => FieldType::Complex,
            _ => return None,
        })
    }
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldType::String => f.write_str("Edm.String"),
            FieldType::Int32 => f.write_str("Edm.Int32"),
            FieldType::Int64 => f.write_str("Edm.Int64"),
            FieldType::Double => f.write_str("Edm.Double"),
            FieldType::Single => f.write_str("Edm.Single"),
            FieldType::Boolean => f.write_str("Edm.Boolean"),
            FieldType::DateTimeOffset => f.write_str("Edm.DateTimeOffset"),
            FieldType::GeographyPoint => f.write_str("Edm.GeographyPoint"),
            FieldType::Complex => f.write_str("Edm.ComplexType"),
            FieldType::Collection(inner) => write!(f, "Collection({inner})"),
        }
    }
}

impl Serialize for FieldType {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for FieldType {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        FieldType::parse(&s)
            .ok_or_else(|| serde::de::Error::custom(format!("unknown field type {s}")))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchField {
    pub name: String,
    #[serde(rename = "type")]
    pub field_type: FieldType,
    #[serde(default, skip_serializing_if = "is_false")]
    pub key: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub searchable: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filterable: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sortable: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub facetable: Option<bool>,
    /// `false` hides the field from results.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub retrievable: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub analyzer: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dimensions: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vector_search_profile: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub fields: Vec<SearchField>,
}

fn is_false(b: &bool) -> bool {
    !*b
}

impl SearchField {
    /// A non-searchable field of any primitive type. Capabilities default off.
    pub fn simple(name: impl Into<String>, field_type: FieldType) -> Self {
        Self {
            name: name.into(),
            field_type,
            key: false,
            searchable: None,
            filterable: Some(false),
            sortable: Some(false),
            facetable: Some(false),
            retrievable: None,
            analyzer: None,
            dimensions: None,
            vector_search_profile: None,
            fields: Vec::new(),
        }
    }

    /// A full-text searchable `Edm.String` field.
    pub fn searchable(name: impl Into<String>) -> Self {
        let mut f = Self::simple(name, FieldType::String);
        f.searchable = Some(true);
        f
    }

    /// A full-text searchable `Collection(Edm.String)` field.
    pub fn searchable_collection(name: impl Into<String>) -> Self {
        let mut f = Self::simple(name, FieldType::collection(FieldType::String));
        f.searchable = Some(true);
        f
    }

    /// A single nested object.
    pub fn complex(name: impl Into<String>, fields: Vec<SearchField>) -> Self {
        Self::nested(name, FieldType::Complex, fields)
    }

    /// A repeated nested object.
    pub fn complex_collection(name: impl Into<String>, fields: Vec<SearchField>) -> Self {
        Self::nested(name, FieldType::collection(FieldType::Complex), fields)
    }

    fn nested(name: impl Into<String>, field_type: FieldType, fields: Vec<SearchField>) -> Self {
        let mut f = Self::simple(name, field_type);
        f.filterable = None;
        f.sortable = None;
        f.facetable = None;
        f.fields = fields;
        f
    }

    /// A `Collection(Edm.Single)` vector field bound to a vector search profile.
    pub fn vector(name: impl Into<String>, dimensions: u32, profile: impl Into<String>) -> Self {
        let mut f = Self::simple(name, FieldType::collection(FieldType::Single));
        f.searchable = Some(true);
        f.sortable = None;
        f.facetable = None;
        f.dimensions = Some(dimensions);
        f.vector_search_profile = Some(profile.into());
        f
    }

    pub fn key(mut self) -> Self {
        self.key = true;
        self.filterable = Some(true);
        self
    }

    pub fn filterable(mut self) -> Self {
        self.filterable = Some(true);
        self
    }

    pub fn sortable(mut self) -> Self {
        self.sortable = Some(true);
        self
    }

    pub fn facetable(mut self) -> Self {
        self.facetable = Some(true);
        self
    }

    pub fn hidden(mut self) -> Self {
        self.retrievable = Some(false);
        self
    }

    pub fn analyzer(mut self, analyzer: impl Into<String>) -> Self {
        self.analyzer = Some(analyzer.into());
        self
    }

    pub fn is_vector(&self) -> bool {
        self.dimensions.is_some()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HnswParameters {
    pub m: u32,
    pub ef_construction: u32,
    pub ef_search: u32,
    pub metric: VectorMetric,
}

impl Default for HnswParameters {
    fn default() -> Self {
        Self { m: 4, ef_construction: 400, ef_search: 500, metric: VectorMetric::Cosine }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum VectorMetric {
    Cosine,
    Euclidean,
    DotProduct,
    Hamming,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum VectorAlgorithm {
    #[serde(rename_all = "camelCase")]
    Hnsw { name: String, hnsw_parameters: HnswParameters },
    #[serde(rename_all = "camelCase")]
    ExhaustiveKnn { name: String },
}

impl VectorAlgorithm {
    pub fn hnsw(name: impl Into<String>) -> Self {
        VectorAlgorithm::Hnsw { name: name.into(), hnsw_parameters: HnswParameters::default() }
    }

    pub fn name(&self) -> &str {
        match self {
            VectorAlgorithm::Hnsw { name, .. } | VectorAlgorithm::ExhaustiveKnn { name } => name,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VectorProfile {
    pub name: String,
    pub algorithm: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vectorizer: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AzureOpenAiParameters {
    pub resource_uri: String,
    pub deployment_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
}

/// Remote text-to-vector strategy the service applies at query time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind")]
pub enum Vectorizer {
    #[serde(rename = "azureOpenAI", rename_all = "camelCase")]
    AzureOpenAi {
        name: String,
        #[serde(rename = "azureOpenAIParameters")]
        parameters: AzureOpenAiParameters,
    },
}

impl Vectorizer {
    pub fn name(&self) -> &str {
        match self {
            Vectorizer::AzureOpenAi { name, .. } => name,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VectorSearch {
    #[serde(default)]
    pub algorithms: Vec<VectorAlgorithm>,
    #[serde(default)]
    pub profiles: Vec<VectorProfile>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub vectorizers: Vec<Vectorizer>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SemanticField {
    pub field_name: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PrioritizedFields {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title_field: Option<SemanticField>,
    #[serde(default)]
    pub prioritized_content_fields: Vec<SemanticField>,
    #[serde(default)]
    pub prioritized_keywords_fields: Vec<SemanticField>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SemanticConfiguration {
    pub name: String,
    pub prioritized_fields: PrioritizedFields,
}

impl SemanticConfiguration {
    pub fn new(
        name: impl Into<String>,
        title: Option<&str>,
        content: &[&str],
        keywords: &[&str],
    ) -> Self {
        let to_fields = |names: &[&str]| {
            names.iter().map(|n| SemanticField { field_name: (*n).to_string() }).collect()
        };
        Self {
            name: name.into(),
            prioritized_fields: PrioritizedFields {
                title_field: title.map(|t| SemanticField { field_name: t.to_string() }),
                prioritized_content_fields: to_fields(content),
                prioritized_keywords_fields: to_fields(keywords),
            },
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SemanticSearch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_configuration: Option<String>,
    #[serde(default)]
    pub configurations: Vec<SemanticConfiguration>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Suggester {
    pub name: String,
    pub search_mode: String,
    pub source_fields: Vec<String>,
}

impl Suggester {
    pub fn new(name: impl Into<String>, source_fields: &[&str]) -> Self {
        Self {
            name: name.into(),
            search_mode: "analyzingInfixMatching".to_string(),
            source_fields: source_fields.iter().map(|s| (*s).to_string()).collect(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IndexSchema {
    pub name: String,
    pub fields: Vec<SearchField>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vector_search: Option<VectorSearch>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub semantic: Option<SemanticSearch>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub suggesters: Vec<Suggester>,
    /// Concurrency token returned by the service; never sent back on update.
    #[serde(rename = "@odata.etag", default, skip_serializing)]
    pub etag: Option<String>,
}

impl IndexSchema {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            fields: Vec::new(),
            vector_search: None,
            semantic: None,
            suggesters: Vec::new(),
            etag: None,
        }
    }

    pub fn field(mut self, field: SearchField) -> Self {
        self.fields.push(field);
        self
    }

    pub fn vector_search(mut self, vector_search: VectorSearch) -> Self {
        self.vector_search = Some(vector_search);
        self
    }

    pub fn semantic(mut self, semantic: SemanticSearch) -> Self {
        self.semantic = Some(semantic);
        self
    }

    pub fn suggester(mut self, suggester: Suggester) -> Self {
        self.suggesters.push(suggester);
        self
    }

    pub fn key_field(&self) -> Option<&SearchField> {
        self.fields.iter().find(|f| f.key)
    }

    /// Structural checks only. Type compatibility with an existing remote
    /// index is decided by the service.
    pub fn validate(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            return Err(Error::InvalidSchema("index name is empty".into()));
        }
        let keys: Vec<&SearchField> = self.fields.iter().filter(|f| f.key).collect();
        match keys.as_slice() {
            [key] if key.field_type == FieldType::String => {}
            [key] => {
                let message =
                    format!("key field '{}' must be Edm.String, not {}", key.name, key.field_type);
                return Err(Error::InvalidSchema(message));
            }
            [] => return Err(Error::InvalidSchema("no key field".into())),
            _ => {
                let message = format!("{} key fields, expected exactly one", keys.len());
                return Err(Error::InvalidSchema(message));
            }
        }
        check_level(&self.name, &self.fields)?;

        let profiles: HashSet<&str> = self
            .vector_search
            .iter()
            .flat_map(|vs| vs.profiles.iter().map(|p| p.name.as_str()))
            .collect();
        for field in self.fields.iter().filter(|f| f.is_vector()) {
            let profile = field.vector_search_profile.as_deref().unwrap_or_default();
            if !profiles.contains(profile) {
                let message =
                    format!("vector field '{}' references unknown profile '{profile}'", field.name);
                return Err(Error::InvalidSchema(message));
            }
        }
        if let Some(vs) = &self.vector_search {
            let algorithms: HashSet<&str> =
                vs.algorithms.iter().map(VectorAlgorithm::name).collect();
            let vectorizers: HashSet<&str> = vs.vectorizers.iter().map(Vectorizer::name).collect();
            for p in &vs.profiles {
                if !algorithms.contains(p.algorithm.as_str()) {
                    let message = format!(
                        "profile '{}' references unknown algorithm '{}'",
                        p.name, p.algorithm
                    );
                    return Err(Error::InvalidSchema(message));
                }
                if let Some(v) = p.vectorizer.as_deref().filter(|v| !vectorizers.contains(v)) {
                    let message =
                        format!("profile '{}' references unknown vectorizer '{v}'", p.name);
                    return Err(Error::InvalidSchema(message));
                }
            }
        }
        if let Some(semantic) = &self.semantic {
            let names: HashSet<&str> =
                semantic.configurations.iter().map(|c| c.name.as_str()).collect();
            let default = semantic.default_configuration.as_deref();
            if let Some(default) = default.filter(|d| !names.contains(d)) {
                let message = format!("unknown default semantic configuration '{default}'");
                return Err(Error::InvalidSchema(message));
            }
        }
        Ok(())
    }
}

fn check_level(parent: &str, fields: &[SearchField]) -> Result<()> {
    let mut seen = HashSet::new();
    for f in fields {
        if !seen.insert(f.name.as_str()) {
            return Err(Error::InvalidSchema(format!("duplicate field '{}' in '{parent}'", f.name)));
        }
        if f.field_type.is_complex() {
            if f.fields.is_empty() {
                let message = format!("complex field '{}' has no sub-fields", f.name);
                return Err(Error::InvalidSchema(message));
            }
            check_level(&f.name, &f.fields)?;
        } else if f.is_vector() && f.dimensions == Some(0) {
            let message = format!("vector field '{}' has zero dimensions", f.name);
            return Err(Error::InvalidSchema(message));
        }
    }
    Ok(())
}

//! azsearch-cli
//!
//! Shared pieces of the two demo binaries: the index definitions they submit,
//! logging setup, and console formatting of results.

use azsearch_core::config::EmbeddingSettings;
use azsearch_core::geo::GeoPoint;
use azsearch_core::results::{Answer, SearchHit};
use azsearch_core::schema::{
    AzureOpenAiParameters, FieldType, IndexSchema, SearchField, SemanticConfiguration,
    SemanticSearch, Suggester, VectorAlgorithm, VectorProfile, VectorSearch, Vectorizer,
};
use tracing_subscriber::EnvFilter;

pub const HOTELS_SEMANTIC_CONFIG: &str = "hotels-semantic";
pub const RAG_SEMANTIC_CONFIG: &str = "rag-semantic";
pub const RAG_VECTOR_FIELD: &str = "text_vector";
pub const RAG_VECTOR_PROFILE: &str = "rag-vector-profile";
const RAG_ALGORITHM: &str = "rag-hnsw";
const RAG_VECTORIZER: &str = "rag-aoai-vectorizer";

/// Logs go to stderr so result output stays readable. `RUST_LOG` overrides
/// the default `info` level.
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

/// The hotels sample index: nested address, repeated rooms, a geography
/// point for distance sorting and a suggester over tags and location names.
pub fn hotels_schema(index_name: &str, with_semantic: bool) -> IndexSchema {
    let address = SearchField::complex(
        "Address",
        vec![
            SearchField::searchable("StreetAddress"),
            SearchField::searchable("City").filterable().sortable().facetable(),
            SearchField::searchable("StateProvince").filterable().sortable().facetable(),
            SearchField::searchable("PostalCode").filterable().sortable().facetable(),
            SearchField::searchable("Country").filterable().sortable().facetable(),
        ],
    );
    let rooms = SearchField::complex_collection(
        "Rooms",
        vec![
            SearchField::searchable("Description").analyzer("en.lucene"),
            SearchField::searchable("Description_fr").analyzer("fr.lucene"),
            SearchField::searchable("Type").filterable().facetable(),
            SearchField::simple("BaseRate", FieldType::Double).filterable().facetable(),
            SearchField::searchable("BedOptions").filterable().facetable(),
            SearchField::simple("SleepsCount", FieldType::Int32).filterable().facetable(),
            SearchField::simple("SmokingAllowed", FieldType::Boolean).filterable().facetable(),
            SearchField::searchable_collection("Tags").filterable().facetable(),
        ],
    );

    let mut schema = IndexSchema::new(index_name)
        .field(SearchField::simple("HotelId", FieldType::String).key())
        .field(SearchField::searchable("HotelName").sortable())
        .field(SearchField::searchable("Description").analyzer("en.lucene"))
        .field(SearchField::searchable("Description_fr").analyzer("fr.lucene"))
        .field(SearchField::searchable("Category").filterable().sortable().facetable())
        .field(SearchField::searchable_collection("Tags").filterable().facetable())
        .field(filter_sort_facet("ParkingIncluded", FieldType::Boolean))
        .field(filter_sort_facet("LastRenovationDate", FieldType::DateTimeOffset))
        .field(filter_sort_facet("Rating", FieldType::Double))
        .field(address)
        .field(SearchField::simple("Location", FieldType::GeographyPoint).filterable().sortable())
        .field(rooms)
        .suggester(Suggester::new("sg", &["Tags", "Address/City", "Address/Country"]));

    if with_semantic {
        schema = schema.semantic(SemanticSearch {
            default_configuration: Some(HOTELS_SEMANTIC_CONFIG.to_string()),
            configurations: vec![SemanticConfiguration::new(
                HOTELS_SEMANTIC_CONFIG,
                Some("HotelName"),
                &["Description"],
                &["Category", "Tags"],
            )],
        });
    }
    schema
}

fn filter_sort_facet(name: &str, field_type: FieldType) -> SearchField {
    SearchField::simple(name, field_type).filterable().sortable().facetable()
}

/// The chunk index a document-chunking pipeline populates: one record per
/// chunk with its parent document id, title, text and embedding. When an
/// embedding deployment is configured the vector profile gets a vectorizer so
/// text vector queries are embedded by the service.
pub fn rag_schema(index_name: &str, embedding: &EmbeddingSettings, dimensions: u32) -> IndexSchema {
    let vectorizer = match (&embedding.endpoint, &embedding.deployment) {
        (Some(endpoint), Some(deployment))
            if !endpoint.trim().is_empty() && !deployment.trim().is_empty() =>
        {
            Some(Vectorizer::AzureOpenAi {
                name: RAG_VECTORIZER.to_string(),
                parameters: AzureOpenAiParameters {
                    resource_uri: endpoint.trim_end_matches('/').to_string(),
                    deployment_id: deployment.clone(),
                    model_name: Some(embedding.model().to_string()),
                    api_key: embedding.api_key.clone(),
                },
            })
        }
        _ => None,
    };

    IndexSchema::new(index_name)
        .field(SearchField::searchable("chunk_id").key().sortable().analyzer("keyword"))
        .field(SearchField::simple("parent_id", FieldType::String).filterable())
        .field(SearchField::searchable("chunk"))
        .field(SearchField::searchable("title"))
        .field(SearchField::vector(RAG_VECTOR_FIELD, dimensions, RAG_VECTOR_PROFILE))
        .vector_search(VectorSearch {
            algorithms: vec![VectorAlgorithm::hnsw(RAG_ALGORITHM)],
            profiles: vec![VectorProfile {
                name: RAG_VECTOR_PROFILE.to_string(),
                algorithm: RAG_ALGORITHM.to_string(),
                vectorizer: vectorizer.as_ref().map(|v| v.name().to_string()),
            }],
            vectorizers: vectorizer.into_iter().collect(),
        })
        .semantic(SemanticSearch {
            default_configuration: Some(RAG_SEMANTIC_CONFIG.to_string()),
            configurations: vec![SemanticConfiguration::new(
                RAG_SEMANTIC_CONFIG,
                Some("title"),
                &["chunk"],
                &[],
            )],
        })
}

/// First `max_chars` characters of `text` on one line, with an ellipsis when cut.
pub fn preview(text: &str, max_chars: usize) -> String {
    let flat: String = text.split_whitespace().collect::<Vec<_>>().join(" ");
    if flat.chars().count() <= max_chars {
        return flat;
    }
    let cut: String = flat.chars().take(max_chars).collect();
    format!("{}...", cut.trim_end())
}

/// `"12.34 km"` from `origin` to the point stored at `field`, if the hit has one.
pub fn distance_label(hit: &SearchHit, field: &str, origin: &GeoPoint) -> Option<String> {
    hit.geo_point(field).map(|p| format!("{:.2} km", origin.distance_km(&p)))
}

pub fn print_hotel(rank: usize, hit: &SearchHit) {
    println!(
        "{rank:>2}. [{}] {}  score={:.4}",
        hit.get_str("HotelId").unwrap_or("?"),
        hit.get_str("HotelName").unwrap_or("(unnamed)"),
        hit.score
    );
    if let Some(city) = hit.get_str("Address/City") {
        println!("     {city}");
    }
    if let Some(rating) = hit.get("Rating").and_then(serde_json::Value::as_f64) {
        println!("     rating {rating:.1}");
    }
}

pub fn print_chunk(rank: usize, hit: &SearchHit, preview_chars: usize) {
    let reranker = hit.reranker_score.map(|s| format!("  reranker={s:.4}")).unwrap_or_default();
    let title = hit.get_str("title").unwrap_or("(untitled)");
    println!("{rank:>2}. {title}  score={:.4}{reranker}", hit.score);
    if let Some(chunk) = hit.get_str("chunk") {
        println!("     {}", preview(chunk, preview_chars));
    }
    for caption in &hit.captions {
        if let Some(text) = highlighted_or_plain(&caption.highlights, &caption.text) {
            println!("     caption: {}", preview(text, preview_chars));
        }
    }
}

pub fn print_answers(answers: &[Answer]) {
    for answer in answers {
        let text = highlighted_or_plain(&answer.highlights, &answer.text).unwrap_or("");
        match answer.score {
            Some(score) => println!("answer [{}] ({score:.3}): {text}", answer.key),
            None => println!("answer [{}]: {text}", answer.key),
        }
    }
}

fn highlighted_or_plain<'a>(
    highlights: &'a Option<String>,
    text: &'a Option<String>,
) -> Option<&'a str> {
    highlights.as_deref().filter(|h| !h.is_empty()).or(text.as_deref())
}

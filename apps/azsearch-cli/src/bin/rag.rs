use anyhow::Context;
use clap::{Parser, ValueEnum};

use azsearch_cli::{
    init_tracing, print_answers, print_chunk, rag_schema, RAG_SEMANTIC_CONFIG, RAG_VECTOR_FIELD,
};
use azsearch_client::SearchServiceClient;
use azsearch_core::config::Settings;
use azsearch_core::query::{SearchRequest, VectorQuery};
use azsearch_embed::{embedder_from_settings, Embedder, DEFAULT_DIMENSIONS};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Mode {
    Vector,
    Hybrid,
    Semantic,
    All,
}

/// Queries a chunk index filled by a document-chunking pipeline.
#[derive(Parser, Debug)]
#[command(name = "azsearch-rag", version)]
struct Cli {
    query: String,

    #[arg(long, value_enum, default_value_t = Mode::All)]
    mode: Mode,

    /// Embed the query locally and send a raw vector instead of text
    #[arg(long)]
    local_embed: bool,

    #[arg(long, default_value_t = 5)]
    top: usize,

    /// Nearest neighbours requested per vector query
    #[arg(long, default_value_t = 50)]
    k: usize,

    /// Index name (defaults to AZURE_SEARCH_INDEX_NAME)
    #[arg(long)]
    index: Option<String>,

    #[arg(long, default_value = RAG_VECTOR_FIELD)]
    vector_field: String,

    #[arg(long, default_value = RAG_SEMANTIC_CONFIG)]
    semantic_config: String,

    /// Create or update the chunk index definition before querying
    #[arg(long)]
    define_index: bool,

    /// Characters of chunk text shown per hit
    #[arg(long, default_value_t = 160)]
    preview: usize,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();
    let cli = Cli::parse();

    let settings = Settings::load().context("loading configuration")?;
    let index = cli.index.clone().unwrap_or_else(|| settings.search.index_name.clone());
    let client = SearchServiceClient::new(&settings.search)?;

    if cli.define_index {
        let dims = settings.embedding.dimensions.unwrap_or(DEFAULT_DIMENSIONS);
        let dims = u32::try_from(dims).context("embedding dimensions out of range")?;
        let schema = rag_schema(&index, &settings.embedding, dims);
        let outcome = client.create_or_update_index(&schema).await?;
        println!("Index '{index}': {outcome:?}");
    }

    let vector_query = if cli.local_embed {
        let embedder = embedder_from_settings(&settings.embedding)?;
        tracing::info!(embedder = embedder.embedder_id(), "embedding query locally");
        let vector = embedder.embed_text(&cli.query).await?;
        VectorQuery::vector(vector, &[cli.vector_field.as_str()], cli.k)
    } else {
        VectorQuery::text(&cli.query, &[cli.vector_field.as_str()], cli.k)
    };

    let select = ["chunk_id", "parent_id", "title", "chunk"];
    let mut runs: Vec<(&str, SearchRequest)> = Vec::new();
    if matches!(cli.mode, Mode::Vector | Mode::All) {
        runs.push(("vector", SearchRequest::vector(vector_query.clone())));
    }
    if matches!(cli.mode, Mode::Hybrid | Mode::All) {
        runs.push(("hybrid", SearchRequest::hybrid(&cli.query, vector_query.clone())));
    }
    if matches!(cli.mode, Mode::Semantic | Mode::All) {
        runs.push((
            "hybrid + semantic reranking",
            SearchRequest::hybrid(&cli.query, vector_query.clone()).semantic(&cli.semantic_config),
        ));
    }

    for (label, request) in runs {
        println!("\n== {label}: \"{}\"", cli.query);
        let results = client.search(&index, &request.select(&select).top(cli.top)).await?;
        print_answers(results.answers());
        for (i, hit) in results.enumerate() {
            print_chunk(i + 1, &hit?, cli.preview);
        }
    }

    Ok(())
}

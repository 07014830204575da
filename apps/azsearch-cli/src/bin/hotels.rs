use std::path::PathBuf;
use std::time::Duration;

use anyhow::Context;
use clap::Parser;

use azsearch_cli::{
    distance_label, hotels_schema, init_tracing, print_answers, print_hotel, HOTELS_SEMANTIC_CONFIG,
};
use azsearch_client::{IndexOutcome, SearchServiceClient};
use azsearch_core::config::Settings;
use azsearch_core::documents::load_documents;
use azsearch_core::geo::GeoPoint;
use azsearch_core::query::{OrderBy, SearchRequest};
use azsearch_core::results::SearchResults;

/// Defines the hotels index, uploads the sample documents and runs a
/// full-text query and a distance-sorted query against it.
#[derive(Parser, Debug)]
#[command(name = "azsearch-hotels", version)]
struct Cli {
    /// JSON array of hotel documents (defaults to the configured documents path)
    #[arg(long)]
    documents: Option<PathBuf>,

    /// Only define the index and query it
    #[arg(long)]
    skip_upload: bool,

    /// Index name (defaults to AZURE_SEARCH_INDEX_NAME)
    #[arg(long)]
    index: Option<String>,

    /// Free-text query for the full-text step
    #[arg(long, default_value = "historic hotel walk to restaurants")]
    query: String,

    /// Latitude of the point to sort by distance from
    #[arg(long, default_value_t = 47.612839, allow_negative_numbers = true)]
    lat: f64,

    /// Longitude of the point to sort by distance from
    #[arg(long, default_value_t = -122.335114, allow_negative_numbers = true)]
    lon: f64,

    #[arg(long, default_value_t = 5)]
    top: usize,

    /// Add a semantic configuration and run a reranked query
    #[arg(long)]
    semantic: bool,

    /// Seconds to wait after upload so the documents become searchable
    #[arg(long, default_value_t = 2)]
    wait_secs: u64,

    /// Prefix for type-ahead suggestions from the `sg` suggester
    #[arg(long)]
    suggest: Option<String>,

    /// Fetch one hotel by key and print it
    #[arg(long)]
    lookup: Option<String>,

    /// Delete the index when done
    #[arg(long)]
    cleanup: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();
    let cli = Cli::parse();

    let settings = Settings::load().context("loading configuration")?;
    let index = cli.index.clone().unwrap_or_else(|| settings.search.index_name.clone());
    let client = SearchServiceClient::new(&settings.search)?;

    let schema = hotels_schema(&index, cli.semantic);
    match client.create_or_update_index(&schema).await? {
        IndexOutcome::Created => println!("Index '{index}' created"),
        IndexOutcome::Updated => println!("Index '{index}' updated"),
    }

    if cli.skip_upload {
        tracing::info!("upload skipped");
    } else {
        let path = cli.documents.clone().unwrap_or_else(|| settings.documents_path());
        let docs = load_documents(&path)?;
        let outcome = client.upload_documents(&index, &docs).await?;
        println!("Uploaded {} documents from {}", outcome.succeeded, path.display());
        if cli.wait_secs > 0 {
            tokio::time::sleep(Duration::from_secs(cli.wait_secs)).await;
        }
    }

    println!("\nFull-text: \"{}\"", cli.query);
    let request = SearchRequest::text(&cli.query)
        .select(&["HotelId", "HotelName", "Address/City", "Rating"])
        .include_count()
        .top(cli.top);
    let results = client.search(&index, &request).await?;
    if let Some(count) = SearchResults::count(&results) {
        println!("{count} matching documents");
    }
    for (i, hit) in results.enumerate() {
        print_hotel(i + 1, &hit?);
    }

    let origin = GeoPoint::new(cli.lat, cli.lon);
    println!("\nNearest to {origin}");
    let request = SearchRequest::text("*")
        .select(&["HotelId", "HotelName", "Address/City", "Rating", "Location"])
        .order_by(OrderBy::geo_distance("Location", origin))
        .top(cli.top);
    for (i, hit) in client.search(&index, &request).await?.enumerate() {
        let hit = hit?;
        print_hotel(i + 1, &hit);
        if let Some(distance) = distance_label(&hit, "Location", &origin) {
            println!("     {distance}");
        }
    }

    if cli.semantic {
        println!("\nSemantic: \"{}\"", cli.query);
        let request = SearchRequest::text(&cli.query)
            .select(&["HotelId", "HotelName", "Description", "Address/City", "Rating"])
            .semantic(HOTELS_SEMANTIC_CONFIG)
            .top(cli.top);
        let results = client.search(&index, &request).await?;
        print_answers(results.answers());
        for (i, hit) in results.enumerate() {
            let hit = hit?;
            print_hotel(i + 1, &hit);
            if let Some(score) = hit.reranker_score {
                println!("     reranker {score:.4}");
            }
        }
    }

    if let Some(prefix) = &cli.suggest {
        println!("\nSuggestions for \"{prefix}\"");
        for s in client.suggest(&index, "sg", prefix, cli.top, &["HotelId", "HotelName"]).await? {
            let name = s.document.get("HotelName").and_then(|v| v.as_str()).unwrap_or("?");
            println!("  {}  ({name})", s.text);
        }
    }

    if let Some(key) = &cli.lookup {
        let doc = client.get_document(&index, key).await?;
        println!("\nHotel {key}:\n{}", serde_json::to_string_pretty(&doc)?);
    }

    if cli.cleanup && client.delete_index(&index).await? {
        println!("\nIndex '{index}' deleted");
    }

    Ok(())
}

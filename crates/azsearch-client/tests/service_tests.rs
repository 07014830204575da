use mockito::{Matcher, Server};
use serde_json::{json, Value};
use tempfile::TempDir;

use azsearch_client::{IndexAction, IndexOutcome, SearchServiceClient};
use azsearch_core::config::{SearchSettings, DEFAULT_SEARCH_API_VERSION};
use azsearch_core::documents::load_documents;
use azsearch_core::error::Error;
use azsearch_core::geo::GeoPoint;
use azsearch_core::query::{OrderBy, SearchRequest, VectorQuery};
use azsearch_core::results::Document;
use azsearch_core::schema::{FieldType, IndexSchema, SearchField};

type TestResult = Result<(), Box<dyn std::error::Error>>;

fn settings(endpoint: String) -> SearchSettings {
    SearchSettings {
        endpoint,
        index_name: "hotels".into(),
        api_key: Some("test-key".into()),
        ..Default::default()
    }
}

fn api_version() -> Matcher {
    Matcher::UrlEncoded("api-version".into(), DEFAULT_SEARCH_API_VERSION.into())
}

fn hotel_schema() -> IndexSchema {
    IndexSchema::new("hotels")
        .field(SearchField::simple("HotelId", FieldType::String).key())
        .field(SearchField::searchable("HotelName").sortable())
        .field(SearchField::simple("Location", FieldType::GeographyPoint).filterable().sortable())
}

fn docs(value: Value) -> Vec<Document> {
    serde_json::from_value(value).expect("documents")
}

/// Batch response accepting every key with `status_code`.
fn accepted(keys: &[&str], status_code: u16) -> String {
    let value: Vec<Value> = keys
        .iter()
        .map(|k| json!({"key": k, "status": true, "statusCode": status_code}))
        .collect();
    json!({ "value": value }).to_string()
}

fn hotel_at(name: &str, lon: f64, lat: f64) -> Value {
    json!({
        "@search.score": 1.0,
        "HotelName": name,
        "Location": {"type": "Point", "coordinates": [lon, lat]}
    })
}

#[tokio::test]
async fn resubmitting_schema_sends_identical_body() -> TestResult {
    let mut server = Server::new_async().await;
    let schema = hotel_schema();
    let mock = server
        .mock("PUT", "/indexes/hotels")
        .match_query(api_version())
        .match_header("api-key", "test-key")
        .match_header("prefer", "return=representation")
        .match_body(Matcher::Json(serde_json::to_value(&schema)?))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(serde_json::to_string(&schema)?)
        .expect(2)
        .create_async()
        .await;

    let client = SearchServiceClient::new(&settings(server.url()))?;
    assert_eq!(client.create_or_update_index(&schema).await?, IndexOutcome::Updated);
    assert_eq!(client.create_or_update_index(&schema).await?, IndexOutcome::Updated);
    mock.assert_async().await;
    Ok(())
}

#[tokio::test]
async fn new_index_reports_created() -> TestResult {
    let mut server = Server::new_async().await;
    let _mock = server
        .mock("PUT", "/indexes/hotels")
        .match_query(api_version())
        .with_status(201)
        .with_body("{}")
        .create_async()
        .await;
    let client = SearchServiceClient::new(&settings(server.url()))?;
    assert_eq!(client.create_or_update_index(&hotel_schema()).await?, IndexOutcome::Created);
    Ok(())
}

#[tokio::test]
async fn invalid_schema_never_reaches_the_service() -> TestResult {
    let mut server = Server::new_async().await;
    let mock = server.mock("PUT", Matcher::Any).expect(0).create_async().await;
    let client = SearchServiceClient::new(&settings(server.url()))?;
    let keyless = IndexSchema::new("hotels").field(SearchField::searchable("HotelName"));
    let result = client.create_or_update_index(&keyless).await;
    assert!(matches!(result, Err(Error::InvalidSchema(_))));
    mock.assert_async().await;
    Ok(())
}

#[tokio::test]
async fn incompatible_change_surfaces_service_message() -> TestResult {
    let mut server = Server::new_async().await;
    let body = json!({"error": {
        "code": "OperationNotAllowed",
        "message": "Existing field 'HotelName' cannot be changed."
    }});
    let _mock = server
        .mock("PUT", "/indexes/hotels")
        .match_query(api_version())
        .with_status(400)
        .with_body(body.to_string())
        .create_async()
        .await;
    let client = SearchServiceClient::new(&settings(server.url()))?;
    match client.create_or_update_index(&hotel_schema()).await {
        Err(Error::Malformed { status, message }) => {
            assert_eq!(status, 400);
            assert!(message.contains("cannot be changed"));
        }
        other => panic!("expected Malformed, got {other:?}"),
    }
    Ok(())
}

#[tokio::test]
async fn upload_accepts_whole_batch() -> TestResult {
    let mut server = Server::new_async().await;
    let mock = server
        .mock("POST", "/indexes/hotels/docs/index")
        .match_query(api_version())
        .match_body(Matcher::Json(json!({"value": [
            {"@search.action": "upload", "HotelId": "1", "HotelName": "Stay-Kay City Hotel"},
            {"@search.action": "upload", "HotelId": "2", "HotelName": "Old Century Hotel"}
        ]})))
        .with_status(200)
        .with_body(accepted(&["1", "2"], 201))
        .create_async()
        .await;
    let client = SearchServiceClient::new(&settings(server.url()))?;
    let batch = docs(json!([
        {"HotelId": "1", "HotelName": "Stay-Kay City Hotel"},
        {"HotelId": "2", "HotelName": "Old Century Hotel"}
    ]));
    assert_eq!(client.upload_documents("hotels", &batch).await?.succeeded, 2);
    mock.assert_async().await;
    Ok(())
}

#[tokio::test]
async fn envelope_file_actions_are_replaced_by_the_requested_one() -> TestResult {
    let tmp = TempDir::new()?;
    let path = tmp.path().join("batch.json");
    let envelope = json!({"value": [
        {"@search.action": "upload", "HotelId": "1", "Rating": 4.1},
        {"@search.action": "mergeOrUpload", "HotelId": "2", "Rating": 3.6}
    ]});
    std::fs::write(&path, envelope.to_string())?;

    let mut server = Server::new_async().await;
    let mock = server
        .mock("POST", "/indexes/hotels/docs/index")
        .match_query(api_version())
        .match_body(Matcher::Json(json!({"value": [
            {"@search.action": "merge", "HotelId": "1", "Rating": 4.1},
            {"@search.action": "merge", "HotelId": "2", "Rating": 3.6}
        ]})))
        .with_status(200)
        .with_body(accepted(&["1", "2"], 200))
        .create_async()
        .await;

    let client = SearchServiceClient::new(&settings(server.url()))?;
    let batch = load_documents(&path)?;
    let outcome = client.index_documents("hotels", IndexAction::Merge, &batch).await?;
    assert_eq!(outcome.succeeded, 2);
    mock.assert_async().await;
    Ok(())
}

#[tokio::test]
async fn one_rejected_record_fails_the_batch() -> TestResult {
    let mut server = Server::new_async().await;
    let body = json!({"value": [
        {"key": "1", "status": true, "statusCode": 201},
        {"key": "2", "status": false, "errorMessage": "Invalid Rating", "statusCode": 400}
    ]});
    let _mock = server
        .mock("POST", "/indexes/hotels/docs/index")
        .match_query(api_version())
        .with_status(207)
        .with_body(body.to_string())
        .create_async()
        .await;
    let client = SearchServiceClient::new(&settings(server.url()))?;
    let batch = docs(json!([{"HotelId": "1"}, {"HotelId": "2", "Rating": "five"}]));
    match client.upload_documents("hotels", &batch).await {
        Err(Error::PartialBatch { total, failed }) => {
            assert_eq!(total, 2);
            assert_eq!(failed.len(), 1);
            assert!(failed[0].starts_with("2 "));
        }
        other => panic!("expected PartialBatch, got {other:?}"),
    }
    Ok(())
}

#[tokio::test]
async fn empty_batch_issues_no_request() -> TestResult {
    let mut server = Server::new_async().await;
    let mock = server.mock("POST", Matcher::Any).expect(0).create_async().await;
    let client = SearchServiceClient::new(&settings(server.url()))?;
    assert_eq!(client.upload_documents("hotels", &[]).await?.succeeded, 0);
    mock.assert_async().await;
    Ok(())
}

#[tokio::test]
async fn geo_sorted_results_are_nearest_first() -> TestResult {
    let origin = GeoPoint::new(47.612839, -122.335114);
    let mut server = Server::new_async().await;
    let body = json!({"value": [
        hotel_at("Seattle Downtown", -122.3379, 47.6097),
        hotel_at("Bellevue Lodge", -122.2015, 47.6101),
        hotel_at("Portland Inn", -122.6784, 45.5152)
    ]});
    let _mock = server
        .mock("POST", "/indexes/hotels/docs/search")
        .match_query(api_version())
        .match_body(Matcher::PartialJson(json!({
            "orderby": "geo.distance(Location, geography'POINT(-122.335114 47.612839)') asc",
            "top": 3
        })))
        .with_status(200)
        .with_body(body.to_string())
        .create_async()
        .await;

    let client = SearchServiceClient::new(&settings(server.url()))?;
    let request = SearchRequest::text("*")
        .select(&["HotelName", "Location"])
        .top(3)
        .order_by(OrderBy::geo_distance("Location", origin));
    let mut last = 0.0_f64;
    let mut seen = 0;
    for hit in client.search("hotels", &request).await? {
        let point = hit?.geo_point("Location").ok_or("missing location")?;
        let d = origin.distance_km(&point);
        assert!(d >= last, "distance {d} after {last}");
        last = d;
        seen += 1;
    }
    assert_eq!(seen, 3);
    Ok(())
}

#[tokio::test]
async fn repeated_vector_query_keeps_order() -> TestResult {
    let mut server = Server::new_async().await;
    let embedding = vec![0.5_f32, -0.25, 0.125];
    let body = json!({"value": [
        {"@search.score": 0.91, "chunk_id": "a"},
        {"@search.score": 0.87, "chunk_id": "b"}
    ]});
    let mock = server
        .mock("POST", "/indexes/hotels/docs/search")
        .match_query(api_version())
        .match_body(Matcher::PartialJson(json!({
            "vectorQueries": [{"kind": "vector", "vector": [0.5, -0.25, 0.125], "k": 2}]
        })))
        .with_status(200)
        .with_body(body.to_string())
        .expect(2)
        .create_async()
        .await;

    let client = SearchServiceClient::new(&settings(server.url()))?;
    let request = SearchRequest::vector(VectorQuery::vector(embedding, &["text_vector"], 2)).top(2);
    let mut runs = Vec::new();
    for _ in 0..2 {
        let ids: Vec<String> = client
            .search("hotels", &request)
            .await?
            .map(|h| h.map(|h| h.get_str("chunk_id").unwrap_or_default().to_string()))
            .collect::<Result<_, _>>()?;
        runs.push(ids);
    }
    assert_eq!(runs[0], vec!["a", "b"]);
    assert_eq!(runs[0], runs[1]);
    mock.assert_async().await;
    Ok(())
}

#[tokio::test]
async fn invalid_request_is_rejected_locally() -> TestResult {
    let mut server = Server::new_async().await;
    let mock = server.mock("POST", Matcher::Any).expect(0).create_async().await;
    let client = SearchServiceClient::new(&settings(server.url()))?;
    let request = SearchRequest::vector(VectorQuery::text("hello", &["text_vector"], 0));
    assert!(matches!(client.search("hotels", &request).await, Err(Error::InvalidRequest(_))));
    mock.assert_async().await;
    Ok(())
}

#[tokio::test]
async fn rejected_key_maps_to_auth_error() -> TestResult {
    let mut server = Server::new_async().await;
    let _mock = server
        .mock("POST", "/indexes/hotels/docs/search")
        .match_query(api_version())
        .with_status(403)
        .with_body("")
        .create_async()
        .await;
    let client = SearchServiceClient::new(&settings(server.url()))?;
    assert!(matches!(
        client.search("hotels", &SearchRequest::text("*")).await,
        Err(Error::Auth { status: 403, .. })
    ));
    Ok(())
}

#[tokio::test]
async fn managed_identity_token_is_fetched_once() -> TestResult {
    let mut server = Server::new_async().await;
    let token = server
        .mock("GET", "/token")
        .match_query(Matcher::AllOf(vec![
            Matcher::UrlEncoded("resource".into(), "https://search.azure.com".into()),
            Matcher::UrlEncoded("api-version".into(), "2018-02-01".into()),
        ]))
        .match_header("metadata", "true")
        .with_status(200)
        .with_body(r#"{"access_token":"mi-token","expires_in":"3599","token_type":"Bearer"}"#)
        .expect(1)
        .create_async()
        .await;
    let count = server
        .mock("GET", "/indexes/hotels/docs/$count")
        .match_query(api_version())
        .match_header("authorization", "Bearer mi-token")
        .with_status(200)
        .with_body("\u{feff}4")
        .expect(2)
        .create_async()
        .await;

    let settings = SearchSettings {
        endpoint: server.url(),
        index_name: "hotels".into(),
        identity_endpoint: Some(format!("{}/token", server.url())),
        ..Default::default()
    };
    let client = SearchServiceClient::new(&settings)?;
    assert_eq!(client.document_count("hotels").await?, 4);
    assert_eq!(client.document_count("hotels").await?, 4);
    token.assert_async().await;
    count.assert_async().await;
    Ok(())
}

#[tokio::test]
async fn delete_missing_index_is_not_an_error() -> TestResult {
    let mut server = Server::new_async().await;
    let _mock = server
        .mock("DELETE", "/indexes/hotels")
        .match_query(api_version())
        .with_status(404)
        .create_async()
        .await;
    let client = SearchServiceClient::new(&settings(server.url()))?;
    assert!(!client.delete_index("hotels").await?);
    Ok(())
}

#[tokio::test]
async fn lists_index_names() -> TestResult {
    let mut server = Server::new_async().await;
    let select = Matcher::UrlEncoded("$select".into(), "name".into());
    let _mock = server
        .mock("GET", "/indexes")
        .match_query(Matcher::AllOf(vec![api_version(), select]))
        .with_status(200)
        .with_body(r#"{"value":[{"name":"hotels"},{"name":"rag-chunks"}]}"#)
        .create_async()
        .await;
    let client = SearchServiceClient::new(&settings(server.url()))?;
    assert_eq!(client.list_index_names().await?, vec!["hotels", "rag-chunks"]);
    Ok(())
}

#[tokio::test]
async fn fetched_index_keeps_etag_but_never_sends_it() -> TestResult {
    let mut server = Server::new_async().await;
    let mut body = serde_json::to_value(hotel_schema())?;
    body["@odata.etag"] = json!("\"0x8DC1\"");
    let _mock = server
        .mock("GET", "/indexes/hotels")
        .match_query(api_version())
        .with_status(200)
        .with_body(body.to_string())
        .create_async()
        .await;
    let client = SearchServiceClient::new(&settings(server.url()))?;
    let fetched = client.get_index("hotels").await?;
    assert_eq!(fetched.etag.as_deref(), Some("\"0x8DC1\""));
    assert_eq!(fetched.key_field().map(|f| f.name.as_str()), Some("HotelId"));
    assert!(serde_json::to_value(&fetched)?.get("@odata.etag").is_none());
    Ok(())
}

#[tokio::test]
async fn delete_documents_sends_only_keys() -> TestResult {
    let mut server = Server::new_async().await;
    let mock = server
        .mock("POST", "/indexes/hotels/docs/index")
        .match_query(api_version())
        .match_body(Matcher::Json(json!({"value": [
            {"@search.action": "delete", "HotelId": "1"},
            {"@search.action": "delete", "HotelId": "2"}
        ]})))
        .with_status(200)
        .with_body(accepted(&["1", "2"], 200))
        .create_async()
        .await;
    let client = SearchServiceClient::new(&settings(server.url()))?;
    assert_eq!(client.delete_documents("hotels", "HotelId", &["1", "2"]).await?.succeeded, 2);
    mock.assert_async().await;
    Ok(())
}

#[tokio::test]
async fn lookup_and_suggest() -> TestResult {
    let mut server = Server::new_async().await;
    let _lookup = server
        .mock("GET", "/indexes/hotels/docs/3")
        .match_query(api_version())
        .with_status(200)
        .with_body(r#"{"HotelId":"3","HotelName":"Gastronomic Landscape Hotel"}"#)
        .create_async()
        .await;
    let suggestions = json!({"value": [
        {"@search.text": "Atlanta", "HotelId": "3", "HotelName": "Gastronomic Landscape Hotel"}
    ]});
    let _suggest = server
        .mock("POST", "/indexes/hotels/docs/suggest")
        .match_query(api_version())
        .match_body(Matcher::Json(json!({
            "search": "atl",
            "suggesterName": "sg",
            "top": 3,
            "select": "HotelId,HotelName"
        })))
        .with_status(200)
        .with_body(suggestions.to_string())
        .create_async()
        .await;

    let client = SearchServiceClient::new(&settings(server.url()))?;
    let doc = client.get_document("hotels", "3").await?;
    assert_eq!(doc["HotelName"], "Gastronomic Landscape Hotel");

    let suggestions = client.suggest("hotels", "sg", "atl", 3, &["HotelId", "HotelName"]).await?;
    assert_eq!(suggestions.len(), 1);
    assert_eq!(suggestions[0].text, "Atlanta");
    assert_eq!(suggestions[0].document["HotelId"], "3");
    Ok(())
}

#[tokio::test]
async fn missing_document_is_not_found() -> TestResult {
    let mut server = Server::new_async().await;
    let _mock = server
        .mock("GET", "/indexes/hotels/docs/42")
        .match_query(api_version())
        .with_status(404)
        .create_async()
        .await;
    let client = SearchServiceClient::new(&settings(server.url()))?;
    assert!(matches!(client.get_document("hotels", "42").await, Err(Error::NotFound(_))));
    Ok(())
}

//! Integration tests for the local and cloud inference providers.

use std::sync::Arc;

use livesent_pipeline::inference::{CloudProvider, LocalProvider};
use livesent_pipeline::InferenceProvider;
use wiremock::matchers::{body_partial_json, body_string_contains, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn local(server: &MockServer) -> LocalProvider {
    LocalProvider::with_urls(&server.uri(), &server.uri(), 5)
        .expect("provider construction should not fail")
}

fn cloud(gemini: &MockServer, local_server: &MockServer) -> CloudProvider {
    CloudProvider::with_base_url(
        "gemini-key",
        &gemini.uri(),
        "gemini-2.0-flash",
        "gemini-embedding-001",
        3,
        5,
        Arc::new(local(local_server)),
    )
    .expect("provider construction should not fail")
}

async fn mount_local_summarizer(server: &MockServer, summary: &str) {
    Mock::given(method("POST"))
        .and(path("/summarize"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(serde_json::json!([{ "summary_text": summary }])),
        )
        .mount(server)
        .await;
}

#[tokio::test]
async fn local_summarize_posts_text_with_length_cap() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/summarize"))
        .and(body_partial_json(serde_json::json!({
            "inputs": "Floods hit Delhi. Roads closed",
            "parameters": { "max_length": 128, "truncation": true }
        })))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(serde_json::json!([{ "summary_text": " Floods close roads. " }])),
        )
        .expect(1)
        .mount(&server)
        .await;

    let summary = local(&server)
        .summarize("  Floods hit Delhi.\nRoads closed ")
        .await
        .expect("summary");
    assert_eq!(summary, "Floods close roads.");
}

#[tokio::test]
async fn local_summarize_of_blank_text_skips_the_server() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(500))
        .expect(0)
        .mount(&server)
        .await;

    assert_eq!(local(&server).summarize("   ").await.unwrap(), "");
    assert!(local(&server).embed("\n").await.unwrap().is_empty());
}

#[tokio::test]
async fn local_summarize_batch_keeps_positions_of_blank_entries() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/summarize"))
        .and(body_partial_json(serde_json::json!({ "inputs": ["first", "third"] })))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([
            { "summary_text": "one" },
            { "summary_text": "three" }
        ])))
        .mount(&server)
        .await;

    let texts = vec!["first".to_string(), " ".to_string(), "third".to_string()];
    let summaries = local(&server).summarize_batch(&texts).await.unwrap();
    assert_eq!(summaries, ["one", "", "three"]);
}

#[tokio::test]
async fn local_embed_calls_tei() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/embed"))
        .and(body_partial_json(serde_json::json!({ "inputs": ["flood warning"] })))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([[0.1, 0.2, 0.3]])))
        .expect(1)
        .mount(&server)
        .await;

    let vector = local(&server).embed("flood warning").await.unwrap();
    assert_eq!(vector, vec![0.1, 0.2, 0.3]);
}

#[tokio::test]
async fn local_embed_failure_is_an_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/embed"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    assert!(local(&server).embed("text").await.is_err());
}

#[tokio::test]
async fn cloud_summarize_uses_gemini() {
    let gemini = MockServer::start().await;
    let local_server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1beta/models/gemini-2.0-flash:generateContent"))
        .and(header("x-goog-api-key", "gemini-key"))
        .and(body_partial_json(serde_json::json!({
            "generationConfig": { "maxOutputTokens": 256 }
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "candidates": [{
                "content": { "role": "model", "parts": [{ "text": "  Markets rallied.  " }] }
            }]
        })))
        .expect(1)
        .mount(&gemini)
        .await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(500))
        .expect(0)
        .mount(&local_server)
        .await;

    let summary = cloud(&gemini, &local_server)
        .summarize("Stocks up sharply")
        .await
        .unwrap();
    assert_eq!(summary, "Markets rallied.");
}

#[tokio::test]
async fn cloud_summarize_falls_back_to_local_on_failure() {
    let gemini = MockServer::start().await;
    let local_server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(429))
        .mount(&gemini)
        .await;
    mount_local_summarizer(&local_server, "Local summary.").await;

    let summary = cloud(&gemini, &local_server)
        .summarize("Stocks up sharply")
        .await
        .unwrap();
    assert_eq!(summary, "Local summary.");
}

#[tokio::test]
async fn cloud_summarize_falls_back_on_empty_candidate() {
    let gemini = MockServer::start().await;
    let local_server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({ "candidates": [] })))
        .mount(&gemini)
        .await;
    mount_local_summarizer(&local_server, "Local summary.").await;

    let summary = cloud(&gemini, &local_server)
        .summarize("Stocks up sharply")
        .await
        .unwrap();
    assert_eq!(summary, "Local summary.");
}

fn gemini_text(text: &str) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_json(serde_json::json!({
        "candidates": [{ "content": { "role": "model", "parts": [{ "text": text }] } }]
    }))
}

#[tokio::test]
async fn cloud_summarize_batch_falls_back_per_item() {
    let gemini = MockServer::start().await;
    let local_server = MockServer::start().await;
    let generate = "/v1beta/models/gemini-2.0-flash:generateContent";
    Mock::given(method("POST"))
        .and(path(generate))
        .and(body_string_contains("Harbour reopens"))
        .respond_with(gemini_text("Harbour is open again."))
        .expect(1)
        .mount(&gemini)
        .await;
    Mock::given(method("POST"))
        .and(path(generate))
        .and(body_string_contains("Bridge collapses"))
        .respond_with(ResponseTemplate::new(500))
        .expect(1)
        .mount(&gemini)
        .await;
    Mock::given(method("POST"))
        .and(path(generate))
        .and(body_string_contains("Festival opens"))
        .respond_with(gemini_text("Festival draws crowds."))
        .expect(1)
        .mount(&gemini)
        .await;
    Mock::given(method("POST"))
        .and(path("/summarize"))
        .and(body_partial_json(serde_json::json!({ "inputs": "Bridge collapses" })))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(serde_json::json!([{ "summary_text": "Local bridge summary." }])),
        )
        .expect(1)
        .mount(&local_server)
        .await;

    let texts = vec![
        "Harbour reopens".to_string(),
        "Bridge collapses".to_string(),
        "Festival opens".to_string(),
    ];
    let summaries = cloud(&gemini, &local_server)
        .summarize_batch(&texts)
        .await
        .unwrap();
    assert_eq!(
        summaries,
        [
            "Harbour is open again.",
            "Local bridge summary.",
            "Festival draws crowds."
        ]
    );
}

#[tokio::test]
async fn cloud_embed_failure_returns_empty_vector_without_fallback() {
    let gemini = MockServer::start().await;
    let local_server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1beta/models/gemini-embedding-001:embedContent"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&gemini)
        .await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&local_server)
        .await;

    let vector = cloud(&gemini, &local_server).embed("text").await.unwrap();
    assert!(vector.is_empty());
}

#[tokio::test]
async fn cloud_embed_requests_configured_dimension() {
    let gemini = MockServer::start().await;
    let local_server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1beta/models/gemini-embedding-001:embedContent"))
        .and(body_partial_json(serde_json::json!({
            "model": "models/gemini-embedding-001",
            "outputDimensionality": 3
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "embedding": { "values": [0.5, 0.25, 0.125] }
        })))
        .mount(&gemini)
        .await;

    let vector = cloud(&gemini, &local_server).embed("text").await.unwrap();
    assert_eq!(vector, vec![0.5, 0.25, 0.125]);
}

#[tokio::test]
async fn cloud_embed_batch_failure_yields_one_empty_vector_per_input() {
    let gemini = MockServer::start().await;
    let local_server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1beta/models/gemini-embedding-001:batchEmbedContents"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&gemini)
        .await;

    let texts = vec!["a".to_string(), "b".to_string()];
    let vectors = cloud(&gemini, &local_server).embed_batch(&texts).await.unwrap();
    assert_eq!(vectors, vec![Vec::<f32>::new(), Vec::new()]);
}

#[tokio::test]
async fn cloud_embed_batch_returns_vectors_in_order() {
    let gemini = MockServer::start().await;
    let local_server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1beta/models/gemini-embedding-001:batchEmbedContents"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "embeddings": [ { "values": [1.0, 0.0, 0.0] }, { "values": [0.0, 1.0, 0.0] } ]
        })))
        .mount(&gemini)
        .await;

    let texts = vec!["a".to_string(), "b".to_string()];
    let vectors = cloud(&gemini, &local_server).embed_batch(&texts).await.unwrap();
    assert_eq!(vectors, vec![vec![1.0, 0.0, 0.0], vec![0.0, 1.0, 0.0]]);
}

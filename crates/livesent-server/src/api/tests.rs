use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use axum::body::{to_bytes, Body};
use axum::http::Request;
use livesent_core::{Article, Emotion, EnrichedEvent, SimilarityResult};
use livesent_pipeline::{
    ClassifierBackend, EmotionClassifier, Enricher, EventStore, InferenceProvider, MemoryStore,
    NewsSource,
};
use tower::ServiceExt;

use super::*;

enum News {
    Articles(Vec<Article>),
    Empty,
    Down,
}

#[async_trait]
impl NewsSource for News {
    fn name(&self) -> &'static str {
        "fake"
    }

    async fn fetch_news(&self, _query: &str) -> Result<Vec<Article>, PipelineError> {
        match self {
            News::Articles(articles) => Ok(articles.clone()),
            News::Empty => Ok(Vec::new()),
            News::Down => Err(PipelineError::News("503 from news API".to_string())),
        }
    }
}

struct EchoProvider;

#[async_trait]
impl InferenceProvider for EchoProvider {
    fn name(&self) -> &'static str {
        "echo"
    }

    async fn summarize(&self, text: &str) -> Result<String, PipelineError> {
        Ok(text.to_string())
    }

    async fn summarize_batch(&self, texts: &[String]) -> Result<Vec<String>, PipelineError> {
        Ok(texts.to_vec())
    }

    async fn embed(&self, _text: &str) -> Result<Vec<f32>, PipelineError> {
        Ok(vec![1.0, 0.0, 0.0])
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, PipelineError> {
        Ok(vec![vec![1.0, 0.0, 0.0]; texts.len()])
    }
}

struct StrikeBackend;

#[async_trait]
impl ClassifierBackend for StrikeBackend {
    fn labels(&self) -> &[Emotion] {
        &Emotion::ALL
    }

    async fn logits(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, PipelineError> {
        Ok(texts
            .iter()
            .map(|t| {
                Emotion::ALL
                    .iter()
                    .map(|label| match label {
                        Emotion::Anger if t.contains("strike") => 4.0,
                        _ => 0.0,
                    })
                    .collect()
            })
            .collect())
    }
}

struct UnreachableStore;

#[async_trait]
impl EventStore for UnreachableStore {
    async fn insert(&self, _event: &EnrichedEvent) -> Result<bool, PipelineError> {
        Err(PipelineError::Qdrant("connection refused".to_string()))
    }

    async fn similarity_search(
        &self,
        _vector: &[f32],
        _location_filter: &str,
        _k: usize,
    ) -> Result<Vec<SimilarityResult>, PipelineError> {
        Err(PipelineError::Qdrant("connection refused".to_string()))
    }

    async fn health_check(&self) -> Result<(), PipelineError> {
        Err(PipelineError::Qdrant("connection refused".to_string()))
    }
}

fn strike_article() -> Article {
    Article {
        title: "Transport strike paralyses the city".to_string(),
        snippet: "Commuters stranded".to_string(),
        link: "https://news.example.com/strike".to_string(),
        source: Some("Daily Nation".to_string()),
        date: None,
    }
}

fn app_with(news: News, store: Arc<dyn EventStore>, rate_limit: RateLimitState) -> Router {
    let classifier = EmotionClassifier::new(Arc::new(StrikeBackend));
    let enricher = Enricher::new(Arc::new(EchoProvider), classifier, store.clone(), 2);
    let service = QueryService::new(Arc::new(news), enricher, store, 5);
    build_app(AppState { service }, rate_limit)
}

fn test_app(news: News) -> Router {
    app_with(
        news,
        Arc::new(MemoryStore::default()),
        RateLimitState::new(100, Duration::from_secs(60)),
    )
}

fn post_query(uri: &str, body: &serde_json::Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .expect("request")
}

async fn json_body(response: axum::response::Response) -> serde_json::Value {
    let body = to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("body bytes");
    serde_json::from_slice(&body).expect("json parse")
}

#[test]
fn api_error_codes_map_to_statuses() {
    let cases = [
        ("validation_error", StatusCode::BAD_REQUEST),
        ("not_found", StatusCode::NOT_FOUND),
        ("upstream_error", StatusCode::BAD_GATEWAY),
        ("rate_limited", StatusCode::TOO_MANY_REQUESTS),
        ("internal_error", StatusCode::INTERNAL_SERVER_ERROR),
    ];
    for (code, status) in cases {
        let response = ApiError::new("req-1", code, "message").into_response();
        assert_eq!(response.status(), status, "{code}");
    }
}

#[test]
fn store_failure_maps_to_internal_error() {
    let err = map_pipeline_error(
        "req-1".to_string(),
        &PipelineError::Qdrant("timeout".to_string()),
    );
    assert_eq!(err.error.code, "internal_error");
}

#[tokio::test]
async fn root_returns_welcome_message() {
    let response = test_app(News::Empty)
        .oneshot(Request::builder().uri("/").body(Body::empty()).expect("request"))
        .await
        .expect("response");

    assert_eq!(response.status(), StatusCode::OK);
    let json = json_body(response).await;
    assert!(json["data"]["message"]
        .as_str()
        .is_some_and(|m| m.contains("POST /query")));
}

#[tokio::test]
async fn health_reports_ok_for_reachable_store() {
    let response = test_app(News::Empty)
        .oneshot(
            Request::builder()
                .uri("/api/v1/health")
                .body(Body::empty())
                .expect("request"),
        )
        .await
        .expect("response");

    assert_eq!(response.status(), StatusCode::OK);
    let json = json_body(response).await;
    assert_eq!(json["data"]["store"], "ok");
}

#[tokio::test]
async fn health_reports_degraded_when_store_is_down() {
    let app = app_with(
        News::Empty,
        Arc::new(UnreachableStore),
        RateLimitState::new(100, Duration::from_secs(60)),
    );
    let response = app
        .oneshot(
            Request::builder()
                .uri("/api/v1/health")
                .body(Body::empty())
                .expect("request"),
        )
        .await
        .expect("response");

    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    let json = json_body(response).await;
    assert_eq!(json["data"]["status"], "degraded");
}

#[tokio::test]
async fn query_returns_aggregated_response() {
    let response = test_app(News::Articles(vec![strike_article()]))
        .oneshot(post_query(
            "/api/v1/query",
            &serde_json::json!({ "location": "nairobi, kenya" }),
        ))
        .await
        .expect("response");

    assert_eq!(response.status(), StatusCode::OK);
    let json = json_body(response).await;
    assert_eq!(json["data"]["location"], "Nairobi, Kenya");
    assert_eq!(json["data"]["dominant_mood"], "anger");
    assert_eq!(json["data"]["total_articles"], 1);
    assert_eq!(json["data"]["articles"][0]["source"], "https://news.example.com/strike");
    assert!(json["meta"]["request_id"].is_string());
}

#[tokio::test]
async fn legacy_query_path_is_served() {
    let response = test_app(News::Articles(vec![strike_article()]))
        .oneshot(post_query(
            "/query",
            &serde_json::json!({ "location": "Delhi", "days_ago": 2 }),
        ))
        .await
        .expect("response");

    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn query_without_news_is_not_found() {
    let response = test_app(News::Empty)
        .oneshot(post_query("/query", &serde_json::json!({ "location": "Atlantis" })))
        .await
        .expect("response");

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let json = json_body(response).await;
    assert_eq!(json["error"]["code"], "not_found");
}

#[tokio::test]
async fn news_failure_is_bad_gateway() {
    let response = test_app(News::Down)
        .oneshot(post_query("/query", &serde_json::json!({ "location": "Lagos" })))
        .await
        .expect("response");

    assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
    let json = json_body(response).await;
    assert_eq!(json["error"]["code"], "upstream_error");
}

#[tokio::test]
async fn out_of_range_days_ago_is_rejected() {
    let response = test_app(News::Articles(vec![strike_article()]))
        .oneshot(post_query(
            "/query",
            &serde_json::json!({ "location": "Lagos", "days_ago": 45 }),
        ))
        .await
        .expect("response");

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let json = json_body(response).await;
    assert_eq!(json["error"]["code"], "validation_error");
}

#[tokio::test]
async fn malformed_body_is_rejected_with_envelope() {
    let response = test_app(News::Empty)
        .oneshot(post_query("/query", &serde_json::json!({ "days_ago": 1 })))
        .await
        .expect("response");

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let json = json_body(response).await;
    assert_eq!(json["error"]["code"], "validation_error");
}

#[tokio::test]
async fn request_id_header_is_echoed() {
    let response = test_app(News::Empty)
        .oneshot(
            Request::builder()
                .uri("/")
                .header("x-request-id", "req-abc")
                .body(Body::empty())
                .expect("request"),
        )
        .await
        .expect("response");

    assert_eq!(
        response
            .headers()
            .get("x-request-id")
            .and_then(|v| v.to_str().ok()),
        Some("req-abc")
    );
    let json = json_body(response).await;
    assert_eq!(json["meta"]["request_id"], "req-abc");
}

#[tokio::test]
async fn query_routes_are_rate_limited() {
    let app = app_with(
        News::Empty,
        Arc::new(MemoryStore::default()),
        RateLimitState::new(1, Duration::from_secs(60)),
    );

    let first = app
        .clone()
        .oneshot(post_query("/query", &serde_json::json!({ "location": "Lagos" })))
        .await
        .expect("response");
    assert_eq!(first.status(), StatusCode::NOT_FOUND);

    let second = app
        .clone()
        .oneshot(post_query("/query", &serde_json::json!({ "location": "Lagos" })))
        .await
        .expect("response");
    assert_eq!(second.status(), StatusCode::TOO_MANY_REQUESTS);
    let retry_after = second
        .headers()
        .get("retry-after")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.parse::<u64>().ok())
        .expect("retry-after");
    assert!((1..=60).contains(&retry_after));

    let health = app
        .oneshot(
            Request::builder()
                .uri("/api/v1/health")
                .body(Body::empty())
                .expect("request"),
        )
        .await
        .expect("response");
    assert_eq!(health.status(), StatusCode::OK);
}

#[tokio::test]
async fn rate_limit_windows_are_per_client() {
    let app = app_with(
        News::Empty,
        Arc::new(MemoryStore::default()),
        RateLimitState::new(1, Duration::from_secs(60)),
    );
    let from = |client: &str| {
        let mut req = post_query("/query", &serde_json::json!({ "location": "Lagos" }));
        req.headers_mut().insert(
            "x-forwarded-for",
            client.parse().expect("header value"),
        );
        req
    };

    let first = app.clone().oneshot(from("203.0.113.7")).await.expect("response");
    assert_eq!(first.status(), StatusCode::NOT_FOUND);

    let other = app.clone().oneshot(from("198.51.100.4")).await.expect("response");
    assert_eq!(other.status(), StatusCode::NOT_FOUND);

    let repeat = app.oneshot(from("203.0.113.7")).await.expect("response");
    assert_eq!(repeat.status(), StatusCode::TOO_MANY_REQUESTS);
}

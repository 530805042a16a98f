use std::{
    collections::HashMap,
    net::SocketAddr,
    sync::Arc,
    time::{Duration, Instant},
};

use axum::{
    extract::{ConnectInfo, Request, State},
    http::{header::RETRY_AFTER, HeaderValue, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use tokio::sync::Mutex;
use uuid::Uuid;

/// Request ID stored as a request extension.
#[derive(Debug, Clone)]
pub struct RequestId(pub String);

/// Windows kept before expired clients are swept.
const SWEEP_THRESHOLD: usize = 1024;

#[derive(Debug, Clone)]
struct RateLimitWindow {
    started_at: Instant,
    count: usize,
}

/// Fixed-window limiter for the query routes, one window per client.
///
/// Each query fans out to the news source and several model calls, so the
/// budget is per caller rather than global.
#[derive(Debug, Clone)]
pub struct RateLimitState {
    max_requests: usize,
    window: Duration,
    clients: Arc<Mutex<HashMap<String, RateLimitWindow>>>,
}

impl RateLimitState {
    #[must_use]
    pub fn new(max_requests: usize, window: Duration) -> Self {
        Self {
            max_requests,
            window,
            clients: Arc::new(Mutex::new(HashMap::new())),
        }
    }
}

#[derive(Debug, Serialize)]
struct MiddlewareErrorBody {
    error: MiddlewareError,
}

#[derive(Debug, Serialize)]
struct MiddlewareError {
    code: &'static str,
    message: &'static str,
}

/// Extract the `x-request-id` header or generate a `UUIDv4`, then echo it on
/// the response.
pub async fn request_id(mut req: Request, next: Next) -> Response {
    let id = req
        .headers()
        .get("x-request-id")
        .and_then(|v| v.to_str().ok())
        .filter(|v| !v.trim().is_empty())
        .map_or_else(|| Uuid::new_v4().to_string(), String::from);

    req.extensions_mut().insert(RequestId(id.clone()));

    let mut res = next.run(req).await;

    if let Ok(val) = HeaderValue::from_str(&id) {
        res.headers_mut().insert("x-request-id", val);
    }

    res
}

/// Reject query requests beyond the per-client budget with 429 and a
/// `retry-after` header.
pub async fn enforce_rate_limit(
    State(rate_limit): State<RateLimitState>,
    req: Request,
    next: Next,
) -> Response {
    let client = client_key(&req);
    let mut clients = rate_limit.clients.lock().await;

    if clients.len() >= SWEEP_THRESHOLD {
        clients.retain(|_, w| w.started_at.elapsed() < rate_limit.window);
    }

    let window = clients
        .entry(client.clone())
        .or_insert_with(|| RateLimitWindow {
            started_at: Instant::now(),
            count: 0,
        });
    let elapsed = window.started_at.elapsed();
    if elapsed >= rate_limit.window {
        window.started_at = Instant::now();
        window.count = 0;
    }

    if window.count >= rate_limit.max_requests {
        let retry_after = retry_after_secs(rate_limit.window, elapsed);
        drop(clients);
        tracing::warn!(
            client = %client,
            path = %req.uri().path(),
            limit = rate_limit.max_requests,
            retry_after,
            "query rate limit exceeded"
        );
        let mut res = (
            StatusCode::TOO_MANY_REQUESTS,
            Json(MiddlewareErrorBody {
                error: MiddlewareError {
                    code: "rate_limited",
                    message: "too many location queries, retry later",
                },
            }),
        )
            .into_response();
        res.headers_mut()
            .insert(RETRY_AFTER, HeaderValue::from(retry_after));
        return res;
    }

    window.count += 1;
    drop(clients);

    next.run(req).await
}

/// First `x-forwarded-for` hop, else the peer address, else a shared bucket.
fn client_key(req: &Request) -> String {
    req.headers()
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(ToOwned::to_owned)
        .or_else(|| {
            req.extensions()
                .get::<ConnectInfo<SocketAddr>>()
                .map(|ConnectInfo(addr)| addr.ip().to_string())
        })
        .unwrap_or_else(|| "unknown".to_string())
}

/// Whole seconds until the current window closes, at least one.
fn retry_after_secs(window: Duration, elapsed: Duration) -> u64 {
    let remaining = window.saturating_sub(elapsed);
    let secs = remaining.as_secs() + u64::from(remaining.subsec_nanos() > 0);
    secs.max(1)
}

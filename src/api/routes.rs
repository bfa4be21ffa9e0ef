use std::sync::Arc;

use axum::{
    extract::State,
    http::header,
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use chrono::Utc;

use crate::alerts::AlertFeed;
use crate::api::health::HealthResponse;
use crate::api::latency::LatencyResponse;
use crate::config::REVALIDATE_SECS;
use crate::error::AppError;
use crate::types::AlertsResponse;

#[derive(Clone)]
pub struct ApiState {
    pub feed: Arc<AlertFeed>,
}

pub fn router(state: ApiState) -> Router {
    Router::new()
        .route("/api/alerts", get(get_alerts))
        .route("/health", get(get_health))
        .route("/stats/latency", get(get_stats_latency))
        .with_state(state)
}

/// Revalidation hint for whatever caches sit in front of the service.
fn cache_control() -> String {
    format!("public, s-maxage={REVALIDATE_SECS}, stale-while-revalidate={REVALIDATE_SECS}")
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

/// Always 200. Backend trouble shows up as an empty list, never as a status.
async fn get_alerts(State(state): State<ApiState>) -> impl IntoResponse {
    let alerts = state.feed.latest(Utc::now()).await;
    (
        [(header::CACHE_CONTROL, cache_control())],
        Json(AlertsResponse { alerts }),
    )
}

async fn get_health(State(state): State<ApiState>) -> Json<HealthResponse> {
    Json(state.feed.health().snapshot())
}

async fn get_stats_latency(
    State(state): State<ApiState>,
) -> Result<Json<LatencyResponse>, AppError> {
    Ok(Json(state.feed.latency().snapshot()?))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::alerts::tests::{alert_at, FakeSource, RecordingSource};
    use crate::api::health::HealthState;
    use crate::api::latency::LatencyStats;
    use crate::backend::AlertSource;
    use axum::body::{to_bytes, Body};
    use axum::http::{Request, StatusCode};
    use chrono::Duration;
    use serde_json::Value;
    use tower::util::ServiceExt;

    fn app(source: Option<Arc<dyn AlertSource>>) -> Router {
        let feed = AlertFeed::new(
            source,
            Arc::new(HealthState::new()),
            Arc::new(LatencyStats::new()),
        );
        router(ApiState {
            feed: Arc::new(feed),
        })
    }

    async fn get(app: Router, uri: &str) -> (StatusCode, axum::http::HeaderMap, Value) {
        let resp = app
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = resp.status();
        let headers = resp.headers().clone();
        let bytes = to_bytes(resp.into_body(), usize::MAX).await.unwrap();
        (status, headers, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn missing_backend_serves_empty_alerts() {
        let (status, headers, body) = get(app(None), "/api/alerts").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, serde_json::json!({ "alerts": [] }));
        assert_eq!(headers[header::CONTENT_TYPE], "application/json");
    }

    #[tokio::test]
    async fn backend_error_still_returns_ok_with_empty_alerts() {
        let source = Arc::new(RecordingSource::new(FakeSource::Fails));
        let (status, _, body) = get(app(Some(source)), "/api/alerts").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, serde_json::json!({ "alerts": [] }));
    }

    #[tokio::test]
    async fn recent_alerts_are_served_newest_first() {
        let now = Utc::now();
        let rows = vec![
            alert_at("older", now - Duration::minutes(30)),
            alert_at("newer", now - Duration::minutes(5)),
        ];
        let source = Arc::new(RecordingSource::new(FakeSource::Rows(rows)));

        let (status, _, body) = get(app(Some(source)), "/api/alerts").await;

        assert_eq!(status, StatusCode::OK);
        let alerts = body["alerts"].as_array().unwrap();
        assert_eq!(alerts.len(), 2);
        assert_eq!(alerts[0]["id"], "newer");
        assert_eq!(alerts[1]["id"], "older");
        assert_eq!(alerts[0]["market_data"]["yesPrice"], 0.4);
        assert_eq!(alerts[0]["urgency"], "HIGH");
    }

    #[tokio::test]
    async fn alerts_carry_sixty_second_revalidation_hint() {
        let (_, headers, _) = get(app(None), "/api/alerts").await;
        assert_eq!(
            headers[header::CACHE_CONTROL],
            "public, s-maxage=60, stale-while-revalidate=60"
        );
    }

    #[tokio::test]
    async fn health_reflects_failed_queries() {
        let source = Arc::new(RecordingSource::new(FakeSource::Fails));
        let app = app(Some(source));

        get(app.clone(), "/api/alerts").await;
        let (status, _, body) = get(app, "/health").await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["backend_configured"], true);
        assert_eq!(body["queries_total"], 1);
        assert_eq!(body["query_failures"], 1);
        assert!(body["last_success_at_ms"].is_null());
    }

    #[tokio::test]
    async fn latency_counts_backend_calls() {
        let source = Arc::new(RecordingSource::new(FakeSource::Rows(Vec::new())));
        let app = app(Some(source));

        get(app.clone(), "/api/alerts").await;
        get(app.clone(), "/api/alerts").await;
        let (_, _, body) = get(app, "/stats/latency").await;

        assert_eq!(body["sample_count"], 2);
        assert!(body["p99_ms"].is_number());
    }
}

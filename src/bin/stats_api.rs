//! Remote counter endpoint: accepts batched attempt/correct deltas from the
//! bot and forwards them as INCRBY pipelines to an Upstash-style KV REST API.

use std::net::SocketAddr;

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::post,
    Json, Router,
};
use dotenv::dotenv;
use log::{info, warn};
use tower_http::cors::{Any, CorsLayer};

use csat_quiz_bot::quiz::sync::{build_increment_ops, StatUpdate};

#[derive(Clone)]
struct KvConfig {
    url: String,
    token: String,
}

#[derive(Clone)]
struct AppState {
    kv: Option<KvConfig>,
    http: reqwest::Client,
}

#[derive(Debug)]
enum ApiError {
    BadRequest(String),
    NotConfigured,
    UpstreamFailed { detail: String },
    Internal(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, body) = match self {
            ApiError::BadRequest(msg) => (
                StatusCode::BAD_REQUEST,
                serde_json::json!({ "error": msg }),
            ),
            ApiError::NotConfigured => (
                StatusCode::SERVICE_UNAVAILABLE,
                serde_json::json!({
                    "error": "KV not configured. Set KV_REST_API_URL and KV_REST_API_TOKEN."
                }),
            ),
            ApiError::UpstreamFailed { detail } => (
                StatusCode::BAD_GATEWAY,
                serde_json::json!({ "error": "KV pipeline failed", "detail": detail }),
            ),
            ApiError::Internal(msg) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                serde_json::json!({ "error": msg }),
            ),
        };
        (status, Json(body)).into_response()
    }
}

/// Pulls the update list out of the request body. Records are read
/// leniently: a missing delta counts as zero, a record without an id is
/// dropped later when the operations are built.
fn parse_updates(body: &serde_json::Value) -> Result<Vec<StatUpdate>, ApiError> {
    let updates = body
        .get("updates")
        .and_then(|v| v.as_array())
        .ok_or_else(|| ApiError::BadRequest("updates array required".to_string()))?;
    if updates.is_empty() {
        return Err(ApiError::BadRequest("updates array required".to_string()));
    }
    Ok(updates
        .iter()
        .map(|u| StatUpdate {
            id: u
                .get("id")
                .and_then(|v| v.as_str())
                .unwrap_or_default()
                .to_string(),
            attempts_delta: u.get("attemptsDelta").and_then(|v| v.as_i64()).unwrap_or(0),
            correct_delta: u.get("correctDelta").and_then(|v| v.as_i64()).unwrap_or(0),
        })
        .collect())
}

async fn apply_stats(
    State(state): State<AppState>,
    Json(body): Json<serde_json::Value>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let kv = state.kv.as_ref().ok_or(ApiError::NotConfigured)?;

    let updates = parse_updates(&body)?;
    let ops = build_increment_ops(&updates);
    if ops.is_empty() {
        return Err(ApiError::BadRequest(
            "no valid increments in updates".to_string(),
        ));
    }

    let pipeline: Vec<serde_json::Value> = ops
        .iter()
        .map(|op| serde_json::json!(["INCRBY", op.key, op.by]))
        .collect();

    let response = state
        .http
        .post(format!("{}/pipeline", kv.url))
        .bearer_auth(&kv.token)
        .json(&pipeline)
        .send()
        .await
        .map_err(|e| {
            warn!("KV request failed: {}", e);
            ApiError::Internal("KV request failed".to_string())
        })?;

    if !response.status().is_success() {
        let detail = response.text().await.unwrap_or_default();
        return Err(ApiError::UpstreamFailed { detail });
    }

    let results: serde_json::Value = response
        .json()
        .await
        .map_err(|_| ApiError::Internal("KV request failed".to_string()))?;
    Ok(Json(serde_json::json!({ "ok": true, "results": results })))
}

fn router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);
    Router::new()
        .route("/api/stats", post(apply_stats))
        .layer(cors)
        .with_state(state)
}

#[tokio::main]
async fn main() {
    dotenv().ok();
    pretty_env_logger::init();

    let kv = match (
        std::env::var("KV_REST_API_URL"),
        std::env::var("KV_REST_API_TOKEN"),
    ) {
        (Ok(url), Ok(token)) => Some(KvConfig { url, token }),
        _ => {
            warn!("KV_REST_API_URL/KV_REST_API_TOKEN not set, requests will get 503");
            None
        }
    };

    let state = AppState {
        kv,
        http: reqwest::Client::new(),
    };

    let port: u16 = std::env::var("PORT")
        .unwrap_or_else(|_| "3000".to_string())
        .parse()
        .expect("PORT must be a number");
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    info!("stats-api listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .expect("Failed to bind");
    axum::serve(listener, router(state))
        .await
        .expect("Server error");
}

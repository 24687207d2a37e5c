// REST endpoints exposed to callers

use axum::{
    Router,
    extract::{State, rejection::JsonRejection},
    response::Json,
    routing::{get, post},
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tower::ServiceBuilder;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::config::SharedConfig;
use crate::descriptor::ConnectionDescriptor;
use crate::error::RelayResult;
use crate::panel::Retention;
use crate::relay;


pub type AppState = SharedConfig;

/// Inbound body for both provisioning endpoints.
#[derive(Debug, Deserialize)]
pub struct AddClientPayload {
    pub email: String,
}

/// Successful provisioning response.
#[derive(Debug, Serialize)]
pub struct AddClientResponse {
    pub vless: ConnectionDescriptor,
}

pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(liveness))
        .route("/proxy/add-client", post(add_client))
        .route("/proxy/add-test-client", post(add_test_client))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(CorsLayer::permissive()),
        )
        .with_state(state)
}

async fn liveness() -> Json<Value> {
    Json(serde_json::json!({
        "status": "ok",
        "service": env!("CARGO_PKG_NAME"),
        "timestamp": chrono::Utc::now().to_rfc3339()
    }))
}

async fn add_client(
    State(state): State<AppState>,
    payload: Result<Json<AddClientPayload>, JsonRejection>,
) -> RelayResult<Json<AddClientResponse>> {
    let Json(payload) = payload?;
    provision(state, payload, Retention::Standard).await
}

async fn add_test_client(
    State(state): State<AppState>,
    payload: Result<Json<AddClientPayload>, JsonRejection>,
) -> RelayResult<Json<AddClientResponse>> {
    let Json(payload) = payload?;
    provision(state, payload, Retention::Test).await
}

async fn provision(
    state: AppState,
    payload: AddClientPayload,
    retention: Retention,
) -> RelayResult<Json<AddClientResponse>> {
    let vless = relay::add_client(state, &payload.email, retention).await?;
    Ok(Json(AddClientResponse { vless }))
}

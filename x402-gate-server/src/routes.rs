//! HTTP surface: a health check and one gated resource.

use std::convert::Infallible;

use axum::{
    Json, Router,
    extract::{RawQuery, State},
    response::{IntoResponse, Response},
    routing::get,
};
use http::{HeaderMap, HeaderName, Method, header::CONTENT_TYPE};
use serde_json::{Value, json};
use tower_http::{
    cors::{AllowOrigin, CorsLayer},
    trace::TraceLayer,
};
use x402_gate::gate::{GateRequest, PROOF_HEADER, PaymentGate};
use x402_gate_core::ledger::MemoryLedger;

use crate::config::CorsOrigins;

/// Build the application router around `gate`.
pub fn app(gate: PaymentGate<MemoryLedger>, cors: &CorsOrigins) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/api/protected", get(protected))
        .with_state(gate)
        .layer(cors_layer(cors))
        .layer(TraceLayer::new_for_http())
}

fn cors_layer(origins: &CorsOrigins) -> CorsLayer {
    let allow_origin = match origins {
        CorsOrigins::Any => AllowOrigin::any(),
        CorsOrigins::List(list) => AllowOrigin::list(list.iter().cloned()),
    };

    CorsLayer::new()
        .allow_origin(allow_origin)
        .allow_methods([Method::GET, Method::OPTIONS])
        .allow_headers([HeaderName::from_static(PROOF_HEADER), CONTENT_TYPE])
}

async fn health() -> Json<Value> {
    Json(json!({ "ok": true }))
}

async fn protected(
    State(gate): State<PaymentGate<MemoryLedger>>,
    RawQuery(query): RawQuery,
    headers: HeaderMap,
) -> Response {
    let request = GateRequest::from_parts(&headers, query.as_deref());

    gate.handle(request, |grant| async move {
        Ok::<_, Infallible>(json!({
            "message": format!("Welcome, {}. This resource is unlocked.", grant.who),
            "paidOn": grant.chain,
        }))
    })
    .await
    .into_response()
}

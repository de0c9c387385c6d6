use axum::{Router, routing::get};
use std::sync::Arc;
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::trace::TraceLayer;

pub mod config;
pub mod error;
pub mod handlers;
pub mod record;
pub mod sheet;
pub mod types;
pub mod upsert;

pub use handlers::AppState;
pub use record::Variant;

pub fn build_router(state: AppState) -> Router {
    let variant = state.variant;
    let sheet: Arc<str> = Arc::from(state.sheet_name.as_str());
    Router::new()
        .route("/", get(handlers::status).post(handlers::submit))
        .route("/healthz", get(handlers::healthz))
        .with_state(Arc::new(state))
        .layer(
            TraceLayer::new_for_http().make_span_with(move |req: &axum::http::Request<_>| {
                let request_id = req
                    .headers()
                    .get("x-request-id")
                    .and_then(|v| v.to_str().ok())
                    .unwrap_or("-");
                tracing::info_span!(
                    "battery_logger",
                    %request_id,
                    %variant,
                    sheet = %sheet,
                    method = %req.method(),
                    path = %req.uri().path(),
                )
            }),
        )
        .layer(PropagateRequestIdLayer::x_request_id())
        .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
}

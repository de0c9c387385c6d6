use axum::{
    Json,
    body::Bytes,
    extract::{Query, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
};
use chrono::Utc;
use std::sync::Arc;

use crate::error::{StoreError, SubmitError};
use crate::record::Variant;
use crate::sheet::Workbook;
use crate::types::{Action, BatterySummary, OnlineResp, StatusQuery, SubmitResp};
use crate::upsert;

pub struct AppState {
    pub workbook: Arc<dyn Workbook>,
    pub sheet_name: String,
    pub variant: Variant,
}

fn request_id(headers: &HeaderMap) -> &str {
    headers
        .get("x-request-id")
        .and_then(|v| v.to_str().ok())
        .unwrap_or("-")
}

async fn write_record(state: &AppState, body: &[u8]) -> Result<(String, Action), SubmitError> {
    let record = state.variant.parse_record(body)?;
    let sheet = state
        .workbook
        .sheet(&state.sheet_name)
        .await?
        .ok_or_else(|| StoreError::SheetNotFound(state.sheet_name.clone()))?;
    let action = upsert::upsert(sheet.as_ref(), state.variant.layout(), &record, Utc::now()).await?;
    Ok((record.key, action))
}

// --- Submit ---

/// Always answers 200; failures travel in the envelope.
pub async fn submit(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    body: Bytes,
) -> Json<SubmitResp> {
    let request_id = request_id(&headers);
    match write_record(&state, &body).await {
        Ok((key, action)) => {
            tracing::info!(%request_id, battery = %key, ?action, "record logged");
            Json(SubmitResp::logged(action))
        }
        Err(e) => {
            tracing::warn!(%request_id, kind = e.kind(), error = %e, "record not logged");
            Json(SubmitResp::failed(e.to_string()))
        }
    }
}

// --- Status ---

pub async fn status(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Query(pairs): Query<Vec<(String, String)>>,
) -> Response {
    let request_id = request_id(&headers);
    let query = StatusQuery::from_pairs(&pairs);
    match query.action.as_deref() {
        Some("clear") => match clear_sheet(&state).await {
            Ok(removed) => {
                tracing::info!(%request_id, removed, sheet = %state.sheet_name, "sheet cleared");
                "Sheet cleared".into_response()
            }
            Err(e) => {
                tracing::error!(%request_id, error = %e, "sheet clear failed");
                (StatusCode::INTERNAL_SERVER_ERROR, format!("clear failed: {e}")).into_response()
            }
        },
        Some("list") => match list_batteries(&state).await {
            Ok(list) => Json(list).into_response(),
            Err(e) => {
                tracing::error!(%request_id, error = %e, "sheet read failed");
                (StatusCode::INTERNAL_SERVER_ERROR, format!("list failed: {e}")).into_response()
            }
        },
        _ => match state.variant {
            Variant::Usage => Json(OnlineResp {
                status: "online",
                message: "Battery Logger API is running",
            })
            .into_response(),
            Variant::Tag => "Battery tracker ready".into_response(),
        },
    }
}

async fn clear_sheet(state: &AppState) -> Result<usize, StoreError> {
    match state.workbook.sheet(&state.sheet_name).await? {
        Some(sheet) => upsert::clear(sheet.as_ref()).await,
        None => Ok(0),
    }
}

async fn list_batteries(state: &AppState) -> Result<Vec<BatterySummary>, StoreError> {
    match state.workbook.sheet(&state.sheet_name).await? {
        Some(sheet) => upsert::summarize(sheet.as_ref(), state.variant.layout()).await,
        None => Ok(Vec::new()),
    }
}

pub async fn healthz() -> Json<serde_json::Value> {
    Json(serde_json::json!({"status": "ok"}))
}

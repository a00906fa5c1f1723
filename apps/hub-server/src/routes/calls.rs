//! Call-log and scheduled-call endpoints. The signaling hub reports call
//! outcomes; the caller-side client persists them here.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::{delete, get, post};
use axum::{Json, Router};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use agrihub_common::id::{prefix, prefixed_ulid};

use crate::error::ApiError;
use crate::models::call_log::{CallKind, CallLog, CallLogStatus, ScheduleStatus, ScheduledCall};
use crate::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/community/calls", post(create_call_log))
        .route("/api/community/calls/{user_id}", get(list_call_logs))
        .route("/api/community/scheduled-calls", post(create_scheduled_call))
        .route(
            "/api/community/scheduled-calls/{id}",
            get(list_scheduled_calls).delete(cancel_scheduled_call),
        )
}

// ---------------------------------------------------------------------------
// POST /api/community/calls
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateCallLogRequest {
    pub caller_name: String,
    #[serde(default)]
    pub caller_id: Option<String>,
    pub receiver_name: String,
    #[serde(default)]
    pub receiver_id: Option<String>,
    pub call_type: CallKind,
    #[serde(default)]
    pub duration: i64,
    pub status: CallLogStatus,
}

#[utoipa::path(
    post,
    path = "/api/community/calls",
    request_body = CreateCallLogRequest,
    responses((status = 201, body = CallLog)),
    tag = "Calls"
)]
pub async fn create_call_log(
    State(state): State<AppState>,
    Json(body): Json<CreateCallLogRequest>,
) -> Result<(StatusCode, Json<CallLog>), ApiError> {
    let log = CallLog {
        id: prefixed_ulid(prefix::CALL_LOG),
        caller_name: body.caller_name,
        caller_id: body.caller_id,
        receiver_name: body.receiver_name,
        receiver_id: body.receiver_id,
        call_type: body.call_type,
        duration: body.duration.max(0),
        status: body.status,
        created_at: Utc::now(),
    };
    state.store.insert_call_log(log.clone()).await?;
    Ok((StatusCode::CREATED, Json(log)))
}

// ---------------------------------------------------------------------------
// GET /api/community/calls/{user_id}
// ---------------------------------------------------------------------------

#[utoipa::path(
    get,
    path = "/api/community/calls/{user_id}",
    params(("user_id" = String, Path, description = "Logical user id")),
    responses((status = 200, body = Vec<CallLog>)),
    tag = "Calls"
)]
pub async fn list_call_logs(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> Result<Json<Vec<CallLog>>, ApiError> {
    Ok(Json(state.store.list_call_logs(&user_id).await?))
}

// ---------------------------------------------------------------------------
// POST /api/community/scheduled-calls
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateScheduledCallRequest {
    pub scheduler_name: String,
    #[serde(default)]
    pub scheduler_id: Option<String>,
    pub target_name: String,
    #[serde(default)]
    pub target_id: Option<String>,
    pub call_type: CallKind,
    pub scheduled_time: DateTime<Utc>,
    #[serde(default)]
    pub note: Option<String>,
}

#[utoipa::path(
    post,
    path = "/api/community/scheduled-calls",
    request_body = CreateScheduledCallRequest,
    responses(
        (status = 201, body = ScheduledCall),
        (status = 400, body = crate::error::ApiErrorBody),
    ),
    tag = "Calls"
)]
pub async fn create_scheduled_call(
    State(state): State<AppState>,
    Json(body): Json<CreateScheduledCallRequest>,
) -> Result<(StatusCode, Json<ScheduledCall>), ApiError> {
    if body.scheduled_time <= Utc::now() {
        return Err(ApiError::bad_request("Scheduled time must be in the future"));
    }

    let call = ScheduledCall {
        id: prefixed_ulid(prefix::SCHEDULED_CALL),
        scheduler_name: body.scheduler_name,
        scheduler_id: body.scheduler_id,
        target_name: body.target_name,
        target_id: body.target_id,
        call_type: body.call_type,
        scheduled_time: body.scheduled_time,
        note: body.note,
        status: ScheduleStatus::Scheduled,
        created_at: Utc::now(),
    };
    state.store.insert_scheduled_call(call.clone()).await?;
    Ok((StatusCode::CREATED, Json(call)))
}

// ---------------------------------------------------------------------------
// GET /api/community/scheduled-calls/{user_id}
// ---------------------------------------------------------------------------

#[utoipa::path(
    get,
    path = "/api/community/scheduled-calls/{id}",
    params(("id" = String, Path, description = "Logical user id")),
    responses((status = 200, body = Vec<ScheduledCall>)),
    tag = "Calls"
)]
pub async fn list_scheduled_calls(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> Result<Json<Vec<ScheduledCall>>, ApiError> {
    Ok(Json(state.store.list_scheduled_calls(&user_id).await?))
}

// ---------------------------------------------------------------------------
// DELETE /api/community/scheduled-calls/{id}
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize, ToSchema)]
pub struct CancelResponse {
    pub success: bool,
}

#[utoipa::path(
    delete,
    path = "/api/community/scheduled-calls/{id}",
    params(("id" = String, Path, description = "Scheduled call id")),
    responses(
        (status = 200, body = CancelResponse),
        (status = 404, body = crate::error::ApiErrorBody),
    ),
    tag = "Calls"
)]
pub async fn cancel_scheduled_call(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<CancelResponse>, ApiError> {
    if !state.store.cancel_scheduled_call(&id).await? {
        return Err(ApiError::not_found("Scheduled call not found"));
    }
    Ok(Json(CancelResponse { success: true }))
}

//! Labour marketplace endpoints, including the race-guarded apply flow.

use std::net::SocketAddr;

use axum::extract::{ConnectInfo, Path, State};
use axum::http::StatusCode;
use axum::routing::post;
use axum::{Json, Router};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use agrihub_common::id::{prefix, prefixed_ulid};

use crate::counters::labour::ApplyError;
use crate::error::{ApiError, FieldError};
use crate::gateway::events::LabourAppliedPayload;
use crate::models::labour::{LabourPost, LabourStatus};
use crate::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route(
            "/api/labour/posts",
            post(create_labour_post).get(list_labour_posts),
        )
        .route("/api/labour/posts/{id}/apply", post(apply_to_post))
}

// ---------------------------------------------------------------------------
// POST /api/labour/posts
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateLabourPostRequest {
    pub farmer_name: Option<String>,
    #[serde(default)]
    pub farmer_id: Option<String>,
    pub work_type: Option<String>,
    pub location: Option<String>,
    pub duration: Option<String>,
    pub offered_wage: Option<i64>,
    pub labour_count: Option<u32>,
    #[serde(default)]
    pub notes: Option<String>,
}

#[utoipa::path(
    post,
    path = "/api/labour/posts",
    request_body = CreateLabourPostRequest,
    responses(
        (status = 201, body = LabourPost),
        (status = 400, body = crate::error::ApiErrorBody),
    ),
    tag = "Labour"
)]
pub async fn create_labour_post(
    State(state): State<AppState>,
    Json(body): Json<CreateLabourPostRequest>,
) -> Result<(StatusCode, Json<LabourPost>), ApiError> {
    let mut errors = Vec::new();
    let work_type = body.work_type.as_deref().map(str::trim).unwrap_or("");
    if work_type.is_empty() {
        errors.push(FieldError {
            field: "workType".to_string(),
            message: "Work type is required".to_string(),
        });
    }
    let location = body.location.as_deref().map(str::trim).unwrap_or("");
    if location.is_empty() {
        errors.push(FieldError {
            field: "location".to_string(),
            message: "Location is required".to_string(),
        });
    }
    let offered_wage = body.offered_wage.unwrap_or(0);
    if offered_wage <= 0 {
        errors.push(FieldError {
            field: "offeredWage".to_string(),
            message: "Offered wage must be positive".to_string(),
        });
    }
    if !errors.is_empty() {
        return Err(ApiError::validation(errors));
    }

    let labour_count = body.labour_count.unwrap_or(1);
    let post = LabourPost {
        id: prefixed_ulid(prefix::LABOUR),
        farmer_name: body.farmer_name.unwrap_or_else(|| "Guest".to_string()),
        farmer_id: body.farmer_id,
        work_type: work_type.to_string(),
        location: location.to_string(),
        duration: body
            .duration
            .unwrap_or_else(|| "Not specified".to_string()),
        offered_wage,
        labour_count,
        notes: body.notes,
        status: if labour_count == 0 {
            LabourStatus::Filled
        } else {
            LabourStatus::Active
        },
        created_at: Utc::now(),
    };

    state.labour.open(&post.id, labour_count);
    state.store.insert_labour_post(post.clone()).await?;

    Ok((StatusCode::CREATED, Json(post)))
}

// ---------------------------------------------------------------------------
// GET /api/labour/posts
// ---------------------------------------------------------------------------

#[utoipa::path(
    get,
    path = "/api/labour/posts",
    responses((status = 200, body = Vec<LabourPost>)),
    tag = "Labour"
)]
pub async fn list_labour_posts(
    State(state): State<AppState>,
) -> Result<Json<Vec<LabourPost>>, ApiError> {
    Ok(Json(state.store.list_labour_posts().await?))
}

// ---------------------------------------------------------------------------
// POST /api/labour/posts/{id}/apply
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ApplyRequest {
    /// Stable applicant identity; falls back to the peer address when absent.
    #[serde(default)]
    pub applicant_id: Option<String>,
    #[serde(default)]
    pub applicant_name: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ApplyResponse {
    pub success: bool,
    pub remaining_count: u32,
    pub status: LabourStatus,
}

#[utoipa::path(
    post,
    path = "/api/labour/posts/{id}/apply",
    request_body = ApplyRequest,
    params(("id" = String, Path, description = "Labour post id")),
    responses(
        (status = 200, body = ApplyResponse),
        (status = 400, body = crate::error::ApiErrorBody),
        (status = 404, body = crate::error::ApiErrorBody),
        (status = 409, body = crate::error::ApiErrorBody),
    ),
    tag = "Labour"
)]
pub async fn apply_to_post(
    State(state): State<AppState>,
    Path(id): Path<String>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    Json(body): Json<ApplyRequest>,
) -> Result<Json<ApplyResponse>, ApiError> {
    let applicant_id = body.applicant_id.unwrap_or_else(|| addr.ip().to_string());
    let applicant_name = body
        .applicant_name
        .unwrap_or_else(|| "A worker".to_string());

    // The serialized slot decrement happens first; everything after it is
    // notification and durable catch-up.
    let outcome = state
        .labour
        .apply(&id, &applicant_id)
        .map_err(|err| match err {
            ApplyError::UnknownPost => ApiError::not_found("Job post not found"),
            ApplyError::AlreadyApplied => ApiError::already_applied(),
            ApplyError::JobFilled => ApiError::job_filled(),
        })?;

    if let Err(err) = state
        .store
        .record_application(&id, &applicant_id, outcome.remaining, outcome.filled)
        .await
    {
        tracing::error!(?err, post_id = %id, "application persistence failed");
    }

    // Everyone in the hub sees the application live, the posting farmer
    // included.
    match state.store.get_labour_post(&id).await {
        Ok(Some(post)) => state.relay.labour_applied(LabourAppliedPayload {
            post_id: id.clone(),
            farmer_id: post.farmer_id,
            farmer_name: post.farmer_name,
            work_type: post.work_type,
            applicant_name,
            remaining_count: outcome.remaining,
            timestamp: Utc::now(),
        }),
        Ok(None) => {}
        Err(err) => tracing::error!(?err, post_id = %id, "labour post lookup failed"),
    }

    Ok(Json(ApplyResponse {
        success: true,
        remaining_count: outcome.remaining,
        status: if outcome.filled {
            LabourStatus::Filled
        } else {
            LabourStatus::Active
        },
    }))
}

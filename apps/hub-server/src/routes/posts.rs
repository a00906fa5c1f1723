//! Community feed endpoints: post CRUD and the guarded vote update.

use std::net::SocketAddr;

use axum::extract::{ConnectInfo, Path, State};
use axum::http::StatusCode;
use axum::routing::post;
use axum::{Json, Router};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use agrihub_common::id::{prefix, prefixed_ulid};

use crate::counters::votes::VoteError;
use crate::error::ApiError;
use crate::models::post::CommunityPost;
use crate::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/community/posts", post(create_post).get(list_posts))
        .route("/api/community/posts/{id}/vote", post(vote_post))
}

// ---------------------------------------------------------------------------
// POST /api/community/posts
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreatePostRequest {
    #[serde(default)]
    pub author_id: Option<String>,
    pub author_name: Option<String>,
    #[serde(default)]
    pub author_avatar: Option<String>,
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default)]
    pub image: Option<String>,
}

#[utoipa::path(
    post,
    path = "/api/community/posts",
    request_body = CreatePostRequest,
    responses(
        (status = 201, body = CommunityPost),
        (status = 400, body = crate::error::ApiErrorBody),
    ),
    tag = "Community"
)]
pub async fn create_post(
    State(state): State<AppState>,
    Json(body): Json<CreatePostRequest>,
) -> Result<(StatusCode, Json<CommunityPost>), ApiError> {
    let content = body.content.unwrap_or_default();
    if content.trim().is_empty() && body.image.is_none() {
        return Err(ApiError::bad_request("Content or image is required"));
    }

    let post = CommunityPost {
        id: prefixed_ulid(prefix::POST),
        author_id: body.author_id,
        author_name: body.author_name.unwrap_or_else(|| "Guest".to_string()),
        author_avatar: body.author_avatar,
        content,
        image: body.image,
        votes: 0,
        comments: 0,
        created_at: Utc::now(),
    };

    // Vote tracking starts before the durable write so a vote racing the
    // creation response can never observe a missing tally.
    state.votes.open(&post.id);
    state.store.insert_post(post.clone()).await?;

    Ok((StatusCode::CREATED, Json(post)))
}

// ---------------------------------------------------------------------------
// GET /api/community/posts
// ---------------------------------------------------------------------------

#[utoipa::path(
    get,
    path = "/api/community/posts",
    responses((status = 200, body = Vec<CommunityPost>)),
    tag = "Community"
)]
pub async fn list_posts(State(state): State<AppState>) -> Result<Json<Vec<CommunityPost>>, ApiError> {
    Ok(Json(state.store.list_posts().await?))
}

// ---------------------------------------------------------------------------
// POST /api/community/posts/{id}/vote
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct VoteRequest {
    /// +1 upvote, -1 downvote, 0 removes the voter's vote.
    pub vote: i32,
    /// Stable voter identity; falls back to the peer address when absent.
    #[serde(default)]
    pub voter_id: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct VoteResponse {
    pub votes: i64,
    pub user_vote: i32,
}

#[utoipa::path(
    post,
    path = "/api/community/posts/{id}/vote",
    request_body = VoteRequest,
    params(("id" = String, Path, description = "Post id")),
    responses(
        (status = 200, body = VoteResponse),
        (status = 400, body = crate::error::ApiErrorBody),
        (status = 404, body = crate::error::ApiErrorBody),
    ),
    tag = "Community"
)]
pub async fn vote_post(
    State(state): State<AppState>,
    Path(id): Path<String>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    Json(body): Json<VoteRequest>,
) -> Result<Json<VoteResponse>, ApiError> {
    let voter_id = body.voter_id.unwrap_or_else(|| addr.ip().to_string());

    // The serialized in-memory tally is authoritative; the durable copy
    // follows and its failure is logged, not surfaced.
    let outcome = state
        .votes
        .update(&id, &voter_id, body.vote)
        .map_err(|err| match err {
            VoteError::UnknownPost => ApiError::not_found("Post not found"),
            VoteError::InvalidChoice(_) => ApiError::bad_request("vote must be -1, 0, or 1"),
        })?;

    if let Err(err) = state
        .store
        .record_vote(&id, &voter_id, body.vote, outcome.total)
        .await
    {
        tracing::error!(?err, post_id = %id, "vote persistence failed");
    }

    Ok(Json(VoteResponse {
        votes: outcome.total,
        user_vote: outcome.choice,
    }))
}

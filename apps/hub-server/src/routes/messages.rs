//! Chat history read endpoint. Writes happen through the relay, best-effort.

use axum::extract::State;
use axum::routing::get;
use axum::{Json, Router};

use crate::error::ApiError;
use crate::models::message::CommunityMessage;
use crate::AppState;

pub fn router() -> Router<AppState> {
    Router::new().route("/api/community/messages", get(list_messages))
}

#[utoipa::path(
    get,
    path = "/api/community/messages",
    responses((status = 200, body = Vec<CommunityMessage>)),
    tag = "Community"
)]
pub async fn list_messages(
    State(state): State<AppState>,
) -> Result<Json<Vec<CommunityMessage>>, ApiError> {
    Ok(Json(state.store.list_messages().await?))
}

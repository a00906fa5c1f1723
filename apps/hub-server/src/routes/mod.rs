pub mod calls;
pub mod health;
pub mod labour;
pub mod messages;
pub mod posts;

use axum::Router;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .merge(health::router())
        .merge(crate::gateway::server::router())
        .merge(posts::router())
        .merge(messages::router())
        .merge(labour::router())
        .merge(calls::router())
        .merge(SwaggerUi::new("/docs").url("/api-docs/openapi.json", ApiDoc::openapi()))
}

#[derive(OpenApi)]
#[openapi(
    paths(
        // Health
        health::health,
        // Community feed
        posts::create_post,
        posts::list_posts,
        posts::vote_post,
        messages::list_messages,
        // Labour marketplace
        labour::create_labour_post,
        labour::list_labour_posts,
        labour::apply_to_post,
        // Calls
        calls::create_call_log,
        calls::list_call_logs,
        calls::create_scheduled_call,
        calls::list_scheduled_calls,
        calls::cancel_scheduled_call,
    ),
    components(
        schemas(
            // Error types
            crate::error::ApiErrorBody,
            crate::error::ApiErrorDetail,
            crate::error::FieldError,
            // Models
            crate::models::post::CommunityPost,
            crate::models::message::CommunityMessage,
            crate::models::labour::LabourPost,
            crate::models::labour::LabourStatus,
            crate::models::call_log::CallLog,
            crate::models::call_log::CallKind,
            crate::models::call_log::CallLogStatus,
            crate::models::call_log::ScheduledCall,
            crate::models::call_log::ScheduleStatus,
            // Route request/response types
            health::HealthResponse,
            posts::CreatePostRequest,
            posts::VoteRequest,
            posts::VoteResponse,
            labour::CreateLabourPostRequest,
            labour::ApplyRequest,
            labour::ApplyResponse,
            calls::CreateCallLogRequest,
            calls::CreateScheduledCallRequest,
            calls::CancelResponse,
        )
    ),
    tags(
        (name = "Health", description = "Health check"),
        (name = "Community", description = "Community feed and chat history"),
        (name = "Labour", description = "Labour marketplace"),
        (name = "Calls", description = "Call logs and scheduled calls"),
    )
)]
pub struct ApiDoc;

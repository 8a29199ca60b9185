use axum::{
    Extension, Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use serde::Deserialize;
use uuid::Uuid;

use gather_types::api::{Claims, ConversationResponse, MessageResponse, PostMessageRequest};

use crate::AppState;
use crate::error::{ApiError, invalid};

#[derive(Debug, Deserialize)]
pub struct MessageQuery {
    #[serde(default = "default_limit")]
    pub limit: u32,
}

fn default_limit() -> u32 {
    50
}

/// First call snapshots the group's current members into a new
/// conversation; afterwards it only returns the existing one.
pub async fn ensure_conversation(
    State(state): State<AppState>,
    Path(group_id): Path<Uuid>,
    Extension(_claims): Extension<Claims>,
) -> Result<impl IntoResponse, ApiError> {
    let conversation = state.governance.ensure_conversation(group_id).await?;
    Ok(Json(ConversationResponse::from_conversation(&conversation)))
}

pub async fn post_message(
    State(state): State<AppState>,
    Path(group_id): Path<Uuid>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<PostMessageRequest>,
) -> Result<impl IntoResponse, ApiError> {
    if req.body.trim().is_empty() {
        return Err(invalid("message body must not be empty"));
    }
    if req.body.len() > 4000 {
        return Err(invalid("message body is too long"));
    }

    let message = state
        .governance
        .post_group_message(group_id, claims.sub, req.body)
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(MessageResponse::from_message(&message)),
    ))
}

pub async fn get_messages(
    State(state): State<AppState>,
    Path(group_id): Path<Uuid>,
    Query(query): Query<MessageQuery>,
    Extension(_claims): Extension<Claims>,
) -> Result<impl IntoResponse, ApiError> {
    let messages = state
        .governance
        .group_messages(group_id, query.limit)
        .await?;

    let messages: Vec<MessageResponse> = messages.iter().map(MessageResponse::from_message).collect();
    Ok(Json(messages))
}

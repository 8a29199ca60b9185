use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use uuid::Uuid;

use gather_types::api::{Claims, CreateGroupRequest, GroupResponse, UpdateGroupRequest};

use crate::AppState;
use crate::error::{ApiError, invalid};

pub async fn create_group(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<CreateGroupRequest>,
) -> Result<impl IntoResponse, ApiError> {
    // Validate input
    if req.name.trim().is_empty() || req.name.len() > 64 {
        return Err(invalid("group name must be between 1 and 64 characters"));
    }
    if req.description.len() > 1024 {
        return Err(invalid("group description is too long"));
    }

    let group = state
        .governance
        .create_group(claims.sub, req.name, req.description, req.visibility)
        .await?;

    Ok((StatusCode::CREATED, Json(GroupResponse::from_group(&group))))
}

pub async fn get_group(
    State(state): State<AppState>,
    Path(group_id): Path<Uuid>,
    Extension(_claims): Extension<Claims>,
) -> Result<impl IntoResponse, ApiError> {
    let group = state.governance.group(group_id).await?;
    Ok(Json(GroupResponse::from_group(&group)))
}

pub async fn list_groups(
    State(state): State<AppState>,
    Extension(_claims): Extension<Claims>,
) -> Result<impl IntoResponse, ApiError> {
    let summaries = state.governance.list_groups().await?;
    Ok(Json(summaries))
}

pub async fn update_group(
    State(state): State<AppState>,
    Path(group_id): Path<Uuid>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<UpdateGroupRequest>,
) -> Result<impl IntoResponse, ApiError> {
    if let Some(name) = &req.name {
        if name.trim().is_empty() || name.len() > 64 {
            return Err(invalid("group name must be between 1 and 64 characters"));
        }
    }
    if let Some(description) = &req.description {
        if description.len() > 1024 {
            return Err(invalid("group description is too long"));
        }
    }

    let group = state
        .governance
        .update_group(group_id, claims.sub, req.name, req.description)
        .await?;
    Ok(Json(GroupResponse::from_group(&group)))
}

pub async fn delete_group(
    State(state): State<AppState>,
    Path(group_id): Path<Uuid>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, ApiError> {
    state.governance.delete_group(group_id, claims.sub).await?;
    Ok(StatusCode::NO_CONTENT)
}

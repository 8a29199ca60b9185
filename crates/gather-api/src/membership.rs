//! One handler per governance operation. Each builds the engine
//! operation with the actor taken from the verified claims, runs it
//! through the service, and returns the outcome plus the fresh view.

use axum::{
    Extension, Json,
    extract::{Path, Query, State},
};
use uuid::Uuid;

use gather_governance::{Operation, Transition};
use gather_types::api::{
    AddModeratorRequest, Claims, GroupResponse, InviteRequest, OperationResponse,
    RemoveMemberQuery, RespondInviteRequest,
};

use crate::AppState;
use crate::error::ApiError;

fn operation_response(transition: Transition) -> Json<OperationResponse> {
    Json(OperationResponse {
        outcome: transition.outcome,
        group: GroupResponse::from_group(&transition.group),
    })
}

pub async fn request_join(
    State(state): State<AppState>,
    Path(group_id): Path<Uuid>,
    Extension(claims): Extension<Claims>,
) -> Result<Json<OperationResponse>, ApiError> {
    let transition = state
        .governance
        .execute(group_id, Operation::RequestJoin { actor: claims.sub })
        .await?;
    Ok(operation_response(transition))
}

pub async fn approve_join(
    State(state): State<AppState>,
    Path((group_id, user_id)): Path<(Uuid, Uuid)>,
    Extension(claims): Extension<Claims>,
) -> Result<Json<OperationResponse>, ApiError> {
    let transition = state
        .governance
        .execute(
            group_id,
            Operation::ApproveJoin {
                actor: claims.sub,
                requester: user_id,
            },
        )
        .await?;
    Ok(operation_response(transition))
}

pub async fn decline_join(
    State(state): State<AppState>,
    Path((group_id, user_id)): Path<(Uuid, Uuid)>,
    Extension(claims): Extension<Claims>,
) -> Result<Json<OperationResponse>, ApiError> {
    let transition = state
        .governance
        .execute(
            group_id,
            Operation::DeclineJoin {
                actor: claims.sub,
                requester: user_id,
            },
        )
        .await?;
    Ok(operation_response(transition))
}

pub async fn invite(
    State(state): State<AppState>,
    Path(group_id): Path<Uuid>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<InviteRequest>,
) -> Result<Json<OperationResponse>, ApiError> {
    let transition = state
        .governance
        .execute(
            group_id,
            Operation::Invite {
                actor: claims.sub,
                target: req.user_id,
            },
        )
        .await?;
    Ok(operation_response(transition))
}

pub async fn respond_invite(
    State(state): State<AppState>,
    Path(group_id): Path<Uuid>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<RespondInviteRequest>,
) -> Result<Json<OperationResponse>, ApiError> {
    let transition = state
        .governance
        .execute(
            group_id,
            Operation::RespondInvite {
                actor: claims.sub,
                accept: req.accept,
            },
        )
        .await?;
    Ok(operation_response(transition))
}

pub async fn add_moderator(
    State(state): State<AppState>,
    Path(group_id): Path<Uuid>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<AddModeratorRequest>,
) -> Result<Json<OperationResponse>, ApiError> {
    let transition = state
        .governance
        .execute(
            group_id,
            Operation::AddModerator {
                actor: claims.sub,
                target: req.user_id,
            },
        )
        .await?;
    Ok(operation_response(transition))
}

pub async fn remove_moderator(
    State(state): State<AppState>,
    Path((group_id, user_id)): Path<(Uuid, Uuid)>,
    Extension(claims): Extension<Claims>,
) -> Result<Json<OperationResponse>, ApiError> {
    let transition = state
        .governance
        .execute(
            group_id,
            Operation::RemoveModerator {
                actor: claims.sub,
                target: user_id,
            },
        )
        .await?;
    Ok(operation_response(transition))
}

/// Leave (when the path user is the caller) or owner-removal. When the
/// departing user is the owner, `new_owner` selects the successor.
pub async fn remove_member(
    State(state): State<AppState>,
    Path((group_id, user_id)): Path<(Uuid, Uuid)>,
    Query(query): Query<RemoveMemberQuery>,
    Extension(claims): Extension<Claims>,
) -> Result<Json<OperationResponse>, ApiError> {
    let transition = state
        .governance
        .execute(
            group_id,
            Operation::RemoveMember {
                actor: claims.sub,
                target: user_id,
                new_owner: query.new_owner,
            },
        )
        .await?;
    Ok(operation_response(transition))
}

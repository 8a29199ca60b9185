use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::{Conversation, ConversationMessage, Group, Invite, Outcome, Role, Visibility};

// -- JWT Claims --

/// JWT claims shared by the REST middleware and any other entry point
/// that authenticates callers. Canonical definition lives here in
/// gather-types to eliminate duplication. Tokens are issued by the
/// surrounding identity system; this subsystem only verifies them.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: Uuid,
    pub username: String,
    pub exp: usize,
}

// -- Groups --

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CreateGroupRequest {
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub visibility: Visibility,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct UpdateGroupRequest {
    pub name: Option<String>,
    pub description: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct GroupMemberView {
    pub user_id: Uuid,
    pub role: Role,
}

#[derive(Debug, Clone, Serialize)]
pub struct InviteView {
    pub to: Uuid,
    pub from: Uuid,
    pub created_at: chrono::DateTime<chrono::Utc>,
}

/// Role-annotated read view of a group, built fresh from the aggregate
/// after every operation.
#[derive(Debug, Clone, Serialize)]
pub struct GroupResponse {
    pub id: Uuid,
    pub name: String,
    pub description: String,
    pub visibility: Visibility,
    pub owner_id: Uuid,
    pub members: Vec<GroupMemberView>,
    pub join_requests: Vec<Uuid>,
    pub invites: Vec<InviteView>,
    pub created_at: chrono::DateTime<chrono::Utc>,
}

impl GroupResponse {
    pub fn from_group(group: &Group) -> Self {
        Self {
            id: group.id,
            name: group.name.clone(),
            description: group.description.clone(),
            visibility: group.visibility,
            owner_id: group.owner,
            members: group
                .members
                .iter()
                .map(|&user_id| GroupMemberView {
                    user_id,
                    role: group.role_of(user_id),
                })
                .collect(),
            join_requests: group.join_requests.clone(),
            invites: group.invites.iter().map(InviteView::from_invite).collect(),
            created_at: group.created_at,
        }
    }
}

impl InviteView {
    fn from_invite(invite: &Invite) -> Self {
        Self {
            to: invite.to,
            from: invite.from,
            created_at: invite.created_at,
        }
    }
}

/// One row of the group listing; full member lists stay behind the
/// per-group fetch.
#[derive(Debug, Clone, Serialize)]
pub struct GroupSummary {
    pub id: Uuid,
    pub name: String,
    pub description: String,
    pub visibility: Visibility,
    pub member_count: usize,
}

// -- Membership operations --

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct InviteRequest {
    pub user_id: Uuid,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RespondInviteRequest {
    pub accept: bool,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AddModeratorRequest {
    pub user_id: Uuid,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RemoveMemberQuery {
    /// Successor when the departing member is the owner. Must name a
    /// current moderator; ignored for ordinary members.
    pub new_owner: Option<Uuid>,
}

/// What a governance operation returns: what happened, plus the fresh
/// group view.
#[derive(Debug, Serialize)]
pub struct OperationResponse {
    pub outcome: Outcome,
    pub group: GroupResponse,
}

// -- Conversations --

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PostMessageRequest {
    pub body: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct ConversationResponse {
    pub id: Uuid,
    pub group_id: Uuid,
    pub members: Vec<Uuid>,
    pub created_at: chrono::DateTime<chrono::Utc>,
}

impl ConversationResponse {
    pub fn from_conversation(conversation: &Conversation) -> Self {
        Self {
            id: conversation.id,
            group_id: conversation.group_id,
            members: conversation.members.clone(),
            created_at: conversation.created_at,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct MessageResponse {
    pub id: Uuid,
    pub conversation_id: Uuid,
    pub author_id: Uuid,
    pub body: String,
    pub created_at: chrono::DateTime<chrono::Utc>,
}

impl MessageResponse {
    pub fn from_message(message: &ConversationMessage) -> Self {
        Self {
            id: message.id,
            conversation_id: message.conversation_id,
            author_id: message.author_id,
            body: message.body.clone(),
            created_at: message.created_at,
        }
    }
}

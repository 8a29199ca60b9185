use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Visibility {
    /// Join requests resolve to membership immediately.
    Public,
    /// Join requests wait for owner approval.
    Private,
}

/// A pending invitation. At most one per invited user, matched on `to`
/// only — a second invite to the same user is dropped no matter who
/// sends it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Invite {
    pub to: Uuid,
    pub from: Uuid,
    pub created_at: DateTime<Utc>,
}

/// The group aggregate. Mutated only through the membership engine;
/// one writer per id under the governance service's lock table.
///
/// The member, moderator and request lists keep insertion order.
/// Ownership transfer picks the first valid successor in moderator-list
/// order, so that order is part of the model, not a storage accident.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Group {
    pub id: Uuid,
    pub name: String,
    pub description: String,
    pub visibility: Visibility,
    pub owner: Uuid,
    pub members: Vec<Uuid>,
    pub moderators: Vec<Uuid>,
    pub join_requests: Vec<Uuid>,
    pub invites: Vec<Invite>,
    pub created_at: DateTime<Utc>,
}

impl Group {
    /// A fresh group: the owner is the sole member, everything else empty.
    pub fn new(
        id: Uuid,
        name: String,
        description: String,
        visibility: Visibility,
        owner: Uuid,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            name,
            description,
            visibility,
            owner,
            members: vec![owner],
            moderators: Vec::new(),
            join_requests: Vec::new(),
            invites: Vec::new(),
            created_at,
        }
    }

    pub fn is_member(&self, user: Uuid) -> bool {
        self.members.contains(&user)
    }

    pub fn is_moderator(&self, user: Uuid) -> bool {
        self.moderators.contains(&user)
    }

    pub fn has_requested(&self, user: Uuid) -> bool {
        self.join_requests.contains(&user)
    }

    pub fn invite_for(&self, user: Uuid) -> Option<&Invite> {
        self.invites.iter().find(|i| i.to == user)
    }

    /// The user's role, computed on demand from the underlying sets.
    /// Never stored — there is no second copy to drift out of sync.
    pub fn role_of(&self, user: Uuid) -> Role {
        if user == self.owner {
            Role::Owner
        } else if self.is_moderator(user) {
            Role::Moderator
        } else if self.is_member(user) {
            Role::Member
        } else if self.has_requested(user) {
            Role::Requester
        } else if self.invite_for(user).is_some() {
            Role::Invitee
        } else {
            Role::NonMember
        }
    }

    /// Structural invariants. Every engine transition must map a valid
    /// group to a valid group; the test suites assert this after each
    /// operation.
    pub fn validate(&self) -> Result<(), String> {
        if !self.is_member(self.owner) {
            return Err("owner is not a member".into());
        }
        if self.is_moderator(self.owner) {
            return Err("owner is listed as a moderator".into());
        }
        for moderator in &self.moderators {
            if !self.is_member(*moderator) {
                return Err(format!("moderator {moderator} is not a member"));
            }
        }
        for requester in &self.join_requests {
            if self.is_member(*requester) {
                return Err(format!("member {requester} has a pending join request"));
            }
        }
        for (i, invite) in self.invites.iter().enumerate() {
            if self.invites[..i].iter().any(|prev| prev.to == invite.to) {
                return Err(format!("duplicate invite for {}", invite.to));
            }
        }
        if has_duplicates(&self.members) {
            return Err("duplicate member entries".into());
        }
        if has_duplicates(&self.moderators) {
            return Err("duplicate moderator entries".into());
        }
        if has_duplicates(&self.join_requests) {
            return Err("duplicate join request entries".into());
        }
        Ok(())
    }
}

fn has_duplicates(ids: &[Uuid]) -> bool {
    ids.iter()
        .enumerate()
        .any(|(i, id)| ids[..i].contains(id))
}

/// Closed role model. A user holds exactly one role per group at a time,
/// with owner > moderator > member > requester > invitee precedence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Owner,
    Moderator,
    Member,
    Requester,
    Invitee,
    NonMember,
}

/// What a governance operation did, carried back to the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "data", rename_all = "snake_case")]
pub enum Outcome {
    AlreadyMember,
    Joined,
    RequestPending,
    Approved,
    Declined,
    Invited,
    InviteAccepted,
    InviteDeclined,
    ModeratorAdded,
    ModeratorRemoved,
    Removed,
    OwnershipTransferred { new_owner: Uuid },
}

/// Snapshot of group membership taken when the group chat is first
/// touched. The member list is an independent copy from that moment on:
/// later joins and leaves on the group do not propagate here.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Conversation {
    pub id: Uuid,
    pub group_id: Uuid,
    pub members: Vec<Uuid>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConversationMessage {
    pub id: Uuid,
    pub conversation_id: Uuid,
    pub author_id: Uuid,
    pub body: String,
    pub created_at: DateTime<Utc>,
}

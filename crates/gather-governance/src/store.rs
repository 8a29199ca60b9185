//! The storage trait the governance service drives.

use anyhow::Result;
use async_trait::async_trait;
use uuid::Uuid;

use gather_types::api::GroupSummary;
use gather_types::models::{Conversation, ConversationMessage, Group};

/// Durable keyed storage for group aggregates and their derived
/// conversations.
///
/// `save_group` must write the whole aggregate atomically — the record
/// plus all of its member/moderator/request/invite entries land
/// together or not at all — and must preserve list order on reload.
/// The service serializes calls per group id, so implementations never
/// see two concurrent writes for the same group.
#[async_trait]
pub trait GroupStore: Send + Sync {
    // ── Groups ──────────────────────────────────────────────────────

    /// Persist a newly created group.
    async fn create_group(&self, group: &Group) -> Result<()>;

    /// Load a group by id. `None` when the id resolves to nothing.
    async fn load_group(&self, id: Uuid) -> Result<Option<Group>>;

    /// Replace the stored aggregate with `group`, atomically.
    async fn save_group(&self, group: &Group) -> Result<()>;

    /// Delete a group and everything hanging off it.
    async fn delete_group(&self, id: Uuid) -> Result<()>;

    /// Summaries of all groups, for the listing surface.
    async fn list_groups(&self) -> Result<Vec<GroupSummary>>;

    // ── Conversations ───────────────────────────────────────────────

    /// The group's conversation snapshot, if one was ever created.
    async fn conversation_for_group(&self, group_id: Uuid) -> Result<Option<Conversation>>;

    /// Persist a conversation snapshot. Called at most once per group.
    async fn create_conversation(&self, conversation: &Conversation) -> Result<()>;

    /// Append one message to a conversation.
    async fn append_message(&self, message: &ConversationMessage) -> Result<()>;

    /// Most recent messages first, capped at `limit`.
    async fn messages(&self, conversation_id: Uuid, limit: u32)
    -> Result<Vec<ConversationMessage>>;
}

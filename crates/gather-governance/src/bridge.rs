//! Group chat bridge: the only code path from governance into the
//! messaging world. It reads the group record, never mutates it, and
//! performs at most one write — the conversation snapshot.

use chrono::Utc;
use tracing::info;
use uuid::Uuid;

use gather_types::models::{Conversation, ConversationMessage};

use crate::error::GovernanceError;
use crate::service::Governance;

impl Governance {
    /// Lazily create the group's conversation, snapshotting the member
    /// list as of this moment. Repeated calls are pure reads. Runs
    /// under the group's lock so two racing first calls cannot both
    /// create.
    ///
    /// The snapshot does not resubscribe to later membership changes:
    /// chat membership is fixed at creation time.
    pub async fn ensure_conversation(
        &self,
        group_id: Uuid,
    ) -> Result<Conversation, GovernanceError> {
        let lock = self.locks.entry(group_id);
        let _guard = lock.lock().await;

        if let Some(existing) = self
            .store
            .conversation_for_group(group_id)
            .await
            .map_err(GovernanceError::StoreUnavailable)?
        {
            return Ok(existing);
        }

        let group = self.load(group_id).await?;
        let conversation = Conversation {
            id: Uuid::new_v4(),
            group_id,
            members: group.members.clone(),
            created_at: Utc::now(),
        };
        self.store
            .create_conversation(&conversation)
            .await
            .map_err(GovernanceError::StoreUnavailable)?;
        info!(
            group_id = %group_id,
            conversation_id = %conversation.id,
            member_count = conversation.members.len(),
            "group conversation created"
        );
        Ok(conversation)
    }

    /// Post into the group chat. Authorized against the conversation's
    /// snapshot member set, not the live group membership.
    pub async fn post_group_message(
        &self,
        group_id: Uuid,
        author: Uuid,
        body: String,
    ) -> Result<ConversationMessage, GovernanceError> {
        let conversation = self.ensure_conversation(group_id).await?;
        if !conversation.members.contains(&author) {
            return Err(GovernanceError::Unauthorized(
                "not a member of this conversation",
            ));
        }

        let message = ConversationMessage {
            id: Uuid::new_v4(),
            conversation_id: conversation.id,
            author_id: author,
            body,
            created_at: Utc::now(),
        };
        self.store
            .append_message(&message)
            .await
            .map_err(GovernanceError::StoreUnavailable)?;
        Ok(message)
    }

    /// Most recent messages first, capped at 200 like the rest of the
    /// listing surfaces.
    pub async fn group_messages(
        &self,
        group_id: Uuid,
        limit: u32,
    ) -> Result<Vec<ConversationMessage>, GovernanceError> {
        let conversation = self.ensure_conversation(group_id).await?;
        self.store
            .messages(conversation.id, limit.min(200))
            .await
            .map_err(GovernanceError::StoreUnavailable)
    }
}

use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use tokio::task;
use uuid::Uuid;

use gather_governance::store::GroupStore;
use gather_types::api::GroupSummary;
use gather_types::models::{Conversation, ConversationMessage, Group};

use crate::Database;

/// `GroupStore` over SQLite. Each call clones the shared [`Database`]
/// handle and runs the blocking rusqlite work on the blocking pool, so
/// the async governance service never stalls the runtime.
#[derive(Clone)]
pub struct SqliteStore {
    db: Arc<Database>,
}

impl SqliteStore {
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }
}

#[async_trait]
impl GroupStore for SqliteStore {
    async fn create_group(&self, group: &Group) -> Result<()> {
        let db = self.db.clone();
        let group = group.clone();
        task::spawn_blocking(move || db.insert_group(&group)).await?
    }

    async fn load_group(&self, id: Uuid) -> Result<Option<Group>> {
        let db = self.db.clone();
        task::spawn_blocking(move || db.fetch_group(&id.to_string())).await?
    }

    async fn save_group(&self, group: &Group) -> Result<()> {
        let db = self.db.clone();
        let group = group.clone();
        task::spawn_blocking(move || db.replace_group(&group)).await?
    }

    async fn delete_group(&self, id: Uuid) -> Result<()> {
        let db = self.db.clone();
        task::spawn_blocking(move || db.remove_group(&id.to_string())).await?
    }

    async fn list_groups(&self) -> Result<Vec<GroupSummary>> {
        let db = self.db.clone();
        task::spawn_blocking(move || db.fetch_summaries()).await?
    }

    async fn conversation_for_group(&self, group_id: Uuid) -> Result<Option<Conversation>> {
        let db = self.db.clone();
        task::spawn_blocking(move || db.fetch_conversation(&group_id.to_string())).await?
    }

    async fn create_conversation(&self, conversation: &Conversation) -> Result<()> {
        let db = self.db.clone();
        let conversation = conversation.clone();
        task::spawn_blocking(move || db.insert_conversation(&conversation)).await?
    }

    async fn append_message(&self, message: &ConversationMessage) -> Result<()> {
        let db = self.db.clone();
        let message = message.clone();
        task::spawn_blocking(move || db.insert_message(&message)).await?
    }

    async fn messages(
        &self,
        conversation_id: Uuid,
        limit: u32,
    ) -> Result<Vec<ConversationMessage>> {
        let db = self.db.clone();
        task::spawn_blocking(move || db.fetch_messages(&conversation_id.to_string(), limit)).await?
    }
}

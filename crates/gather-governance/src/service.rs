//! Orchestrates the membership engine against the store: load one
//! group, apply one transition, persist it — observably atomic per
//! group id.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use chrono::Utc;
use tracing::{debug, info};
use uuid::Uuid;

use gather_types::api::GroupSummary;
use gather_types::models::{Group, Visibility};

use crate::engine::{self, Operation, Transition};
use crate::error::GovernanceError;
use crate::store::GroupStore;

/// Per-group-id lock table. Two concurrent calls on the same group id
/// never interleave their read-modify-write cycles; different ids
/// proceed in parallel. Entries are dropped once nobody holds them.
#[derive(Clone, Default)]
pub(crate) struct LockTable {
    inner: Arc<Mutex<HashMap<Uuid, Arc<tokio::sync::Mutex<()>>>>>,
}

impl LockTable {
    pub(crate) fn entry(&self, id: Uuid) -> Arc<tokio::sync::Mutex<()>> {
        let mut map = match self.inner.lock() {
            Ok(guard) => guard,
            // The entries carry no data; poisoning only loses reuse.
            Err(poisoned) => poisoned.into_inner(),
        };
        map.retain(|_, lock| Arc::strong_count(lock) > 1);
        map.entry(id).or_default().clone()
    }
}

/// The governance service. Cheap to clone; all clones share the store
/// and the lock table.
#[derive(Clone)]
pub struct Governance {
    pub(crate) store: Arc<dyn GroupStore>,
    pub(crate) locks: LockTable,
}

impl Governance {
    pub fn new(store: Arc<dyn GroupStore>) -> Self {
        Self {
            store,
            locks: LockTable::default(),
        }
    }

    /// Create a group with the caller as owner and sole member.
    pub async fn create_group(
        &self,
        owner: Uuid,
        name: String,
        description: String,
        visibility: Visibility,
    ) -> Result<Group, GovernanceError> {
        let group = Group::new(
            Uuid::new_v4(),
            name,
            description,
            visibility,
            owner,
            Utc::now(),
        );
        self.store
            .create_group(&group)
            .await
            .map_err(GovernanceError::StoreUnavailable)?;
        info!(group_id = %group.id, owner = %owner, "group created");
        Ok(group)
    }

    pub async fn group(&self, id: Uuid) -> Result<Group, GovernanceError> {
        self.load(id).await
    }

    pub async fn list_groups(&self) -> Result<Vec<GroupSummary>, GovernanceError> {
        self.store
            .list_groups()
            .await
            .map_err(GovernanceError::StoreUnavailable)
    }

    /// Owner-only edit of the display fields. Goes through the same
    /// per-group lock as governance transitions: name changes must not
    /// race a membership write on the same aggregate.
    pub async fn update_group(
        &self,
        id: Uuid,
        actor: Uuid,
        name: Option<String>,
        description: Option<String>,
    ) -> Result<Group, GovernanceError> {
        let lock = self.locks.entry(id);
        let _guard = lock.lock().await;

        let mut group = self.load(id).await?;
        if actor != group.owner {
            return Err(GovernanceError::Unauthorized(
                "only the owner can edit the group",
            ));
        }
        if let Some(name) = name {
            group.name = name;
        }
        if let Some(description) = description {
            group.description = description;
        }
        self.store
            .save_group(&group)
            .await
            .map_err(GovernanceError::StoreUnavailable)?;
        Ok(group)
    }

    /// Owner-only delete. No cascading governance rules beyond removing
    /// the record (and whatever hangs off it in storage).
    pub async fn delete_group(&self, id: Uuid, actor: Uuid) -> Result<(), GovernanceError> {
        let lock = self.locks.entry(id);
        let _guard = lock.lock().await;

        let group = self.load(id).await?;
        if actor != group.owner {
            return Err(GovernanceError::Unauthorized(
                "only the owner can delete the group",
            ));
        }
        self.store
            .delete_group(id)
            .await
            .map_err(GovernanceError::StoreUnavailable)?;
        info!(group_id = %id, "group deleted");
        Ok(())
    }

    /// Apply one membership transition atomically against concurrent
    /// callers on the same group. The store write happens inside the
    /// per-group guard; a store failure surfaces as `StoreUnavailable`
    /// with nothing partially applied.
    pub async fn execute(
        &self,
        group_id: Uuid,
        op: Operation,
    ) -> Result<Transition, GovernanceError> {
        let lock = self.locks.entry(group_id);
        let _guard = lock.lock().await;

        let group = self.load(group_id).await?;
        let transition = engine::apply(&group, &op, Utc::now())?;
        self.store
            .save_group(&transition.group)
            .await
            .map_err(GovernanceError::StoreUnavailable)?;
        debug!(group_id = %group_id, outcome = ?transition.outcome, "governance transition applied");
        Ok(transition)
    }

    pub(crate) async fn load(&self, id: Uuid) -> Result<Group, GovernanceError> {
        self.store
            .load_group(id)
            .await
            .map_err(GovernanceError::StoreUnavailable)?
            .ok_or(GovernanceError::NotFound)
    }
}

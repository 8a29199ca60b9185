/// Database row types — these map directly to SQLite rows.
/// Distinct from the gather-types aggregates to keep the DB layer
/// independent.

pub struct GroupRow {
    pub id: String,
    pub name: String,
    pub description: String,
    pub visibility: String,
    pub owner_id: String,
    pub created_at: String,
}

pub struct InviteRow {
    pub to_user: String,
    pub from_user: String,
    pub created_at: String,
}

pub struct ConversationRow {
    pub id: String,
    pub group_id: String,
    pub created_at: String,
}

pub struct MessageRow {
    pub id: String,
    pub conversation_id: String,
    pub author_id: String,
    pub body: String,
    pub created_at: String,
}

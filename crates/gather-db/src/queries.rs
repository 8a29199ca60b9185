use anyhow::{Result, anyhow, bail};
use chrono::{DateTime, Utc};
use rusqlite::{Connection, Transaction, params};
use uuid::Uuid;

use gather_types::api::GroupSummary;
use gather_types::models::{Conversation, ConversationMessage, Group, Invite, Visibility};

use crate::Database;
use crate::models::{ConversationRow, GroupRow, InviteRow, MessageRow};

impl Database {
    // -- Groups --

    pub fn insert_group(&self, group: &Group) -> Result<()> {
        self.with_conn_mut(|conn| {
            let tx = conn.transaction()?;
            tx.execute(
                "INSERT INTO groups (id, name, description, visibility, owner_id, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                params![
                    group.id.to_string(),
                    group.name,
                    group.description,
                    visibility_str(group.visibility),
                    group.owner.to_string(),
                    group.created_at.to_rfc3339(),
                ],
            )?;
            insert_lists(&tx, group)?;
            tx.commit()?;
            Ok(())
        })
    }

    pub fn fetch_group(&self, id: &str) -> Result<Option<Group>> {
        self.with_conn(|conn| {
            let Some(row) = query_group_row(conn, id)? else {
                return Ok(None);
            };
            Ok(Some(assemble_group(conn, row)?))
        })
    }

    /// Replace the stored aggregate wholesale: update the record row,
    /// drop the list rows and reinsert them in aggregate order. One
    /// transaction — the caller sees the whole save or none of it.
    pub fn replace_group(&self, group: &Group) -> Result<()> {
        self.with_conn_mut(|conn| {
            let tx = conn.transaction()?;
            let updated = tx.execute(
                "UPDATE groups SET name = ?2, description = ?3, visibility = ?4, owner_id = ?5
                 WHERE id = ?1",
                params![
                    group.id.to_string(),
                    group.name,
                    group.description,
                    visibility_str(group.visibility),
                    group.owner.to_string(),
                ],
            )?;
            if updated == 0 {
                bail!("group {} vanished during save", group.id);
            }
            delete_lists(&tx, &group.id.to_string())?;
            insert_lists(&tx, group)?;
            tx.commit()?;
            Ok(())
        })
    }

    pub fn remove_group(&self, id: &str) -> Result<()> {
        self.with_conn(|conn| {
            // Child rows (lists, conversation, messages) cascade.
            conn.execute("DELETE FROM groups WHERE id = ?1", [id])?;
            Ok(())
        })
    }

    pub fn fetch_summaries(&self) -> Result<Vec<GroupSummary>> {
        self.with_conn(|conn| {
            // JOIN for the member count in a single query (no N+1)
            let mut stmt = conn.prepare(
                "SELECT g.id, g.name, g.description, g.visibility, COUNT(m.user_id)
                 FROM groups g
                 LEFT JOIN group_members m ON m.group_id = g.id
                 GROUP BY g.id
                 ORDER BY g.created_at, g.rowid",
            )?;

            let rows = stmt
                .query_map([], |row| {
                    Ok((
                        row.get::<_, String>(0)?,
                        row.get::<_, String>(1)?,
                        row.get::<_, String>(2)?,
                        row.get::<_, String>(3)?,
                        row.get::<_, i64>(4)?,
                    ))
                })?
                .collect::<std::result::Result<Vec<_>, _>>()?;

            rows.into_iter()
                .map(|(id, name, description, visibility, count)| {
                    Ok(GroupSummary {
                        id: parse_id(&id)?,
                        name,
                        description,
                        visibility: parse_visibility(&visibility)?,
                        member_count: count as usize,
                    })
                })
                .collect()
        })
    }

    // -- Conversations --

    pub fn fetch_conversation(&self, group_id: &str) -> Result<Option<Conversation>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT id, group_id, created_at FROM conversations WHERE group_id = ?1",
            )?;
            let row = stmt
                .query_row([group_id], |row| {
                    Ok(ConversationRow {
                        id: row.get(0)?,
                        group_id: row.get(1)?,
                        created_at: row.get(2)?,
                    })
                })
                .optional()?;

            let Some(row) = row else {
                return Ok(None);
            };

            let mut stmt = conn.prepare(
                "SELECT user_id FROM conversation_members
                 WHERE conversation_id = ?1 ORDER BY rowid",
            )?;
            let members = stmt
                .query_map([&row.id], |row| row.get::<_, String>(0))?
                .collect::<std::result::Result<Vec<_>, _>>()?
                .iter()
                .map(|raw| parse_id(raw))
                .collect::<Result<Vec<_>>>()?;

            Ok(Some(Conversation {
                id: parse_id(&row.id)?,
                group_id: parse_id(&row.group_id)?,
                members,
                created_at: parse_timestamp(&row.created_at)?,
            }))
        })
    }

    pub fn insert_conversation(&self, conversation: &Conversation) -> Result<()> {
        self.with_conn_mut(|conn| {
            let tx = conn.transaction()?;
            tx.execute(
                "INSERT INTO conversations (id, group_id, created_at) VALUES (?1, ?2, ?3)",
                params![
                    conversation.id.to_string(),
                    conversation.group_id.to_string(),
                    conversation.created_at.to_rfc3339(),
                ],
            )?;
            for member in &conversation.members {
                tx.execute(
                    "INSERT INTO conversation_members (conversation_id, user_id) VALUES (?1, ?2)",
                    params![conversation.id.to_string(), member.to_string()],
                )?;
            }
            tx.commit()?;
            Ok(())
        })
    }

    pub fn insert_message(&self, message: &ConversationMessage) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO conversation_messages (id, conversation_id, author_id, body, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                params![
                    message.id.to_string(),
                    message.conversation_id.to_string(),
                    message.author_id.to_string(),
                    message.body,
                    message.created_at.to_rfc3339(),
                ],
            )?;
            Ok(())
        })
    }

    pub fn fetch_messages(&self, conversation_id: &str, limit: u32) -> Result<Vec<ConversationMessage>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT id, conversation_id, author_id, body, created_at
                 FROM conversation_messages
                 WHERE conversation_id = ?1
                 ORDER BY created_at DESC, rowid DESC
                 LIMIT ?2",
            )?;

            let rows = stmt
                .query_map(params![conversation_id, limit], |row| {
                    Ok(MessageRow {
                        id: row.get(0)?,
                        conversation_id: row.get(1)?,
                        author_id: row.get(2)?,
                        body: row.get(3)?,
                        created_at: row.get(4)?,
                    })
                })?
                .collect::<std::result::Result<Vec<_>, _>>()?;

            rows.into_iter()
                .map(|row| {
                    Ok(ConversationMessage {
                        id: parse_id(&row.id)?,
                        conversation_id: parse_id(&row.conversation_id)?,
                        author_id: parse_id(&row.author_id)?,
                        body: row.body,
                        created_at: parse_timestamp(&row.created_at)?,
                    })
                })
                .collect()
        })
    }
}

fn query_group_row(conn: &Connection, id: &str) -> Result<Option<GroupRow>> {
    let mut stmt = conn.prepare(
        "SELECT id, name, description, visibility, owner_id, created_at
         FROM groups WHERE id = ?1",
    )?;

    let row = stmt
        .query_row([id], |row| {
            Ok(GroupRow {
                id: row.get(0)?,
                name: row.get(1)?,
                description: row.get(2)?,
                visibility: row.get(3)?,
                owner_id: row.get(4)?,
                created_at: row.get(5)?,
            })
        })
        .optional()?;

    Ok(row)
}

fn assemble_group(conn: &Connection, row: GroupRow) -> Result<Group> {
    let members = query_user_list(conn, "group_members", &row.id)?;
    let moderators = query_user_list(conn, "group_moderators", &row.id)?;
    let join_requests = query_user_list(conn, "group_join_requests", &row.id)?;
    let invites = query_invites(conn, &row.id)?;

    Ok(Group {
        id: parse_id(&row.id)?,
        name: row.name,
        description: row.description,
        visibility: parse_visibility(&row.visibility)?,
        owner: parse_id(&row.owner_id)?,
        members,
        moderators,
        join_requests,
        invites,
        created_at: parse_timestamp(&row.created_at)?,
    })
}

fn query_user_list(conn: &Connection, table: &str, group_id: &str) -> Result<Vec<Uuid>> {
    let sql = format!(
        "SELECT user_id FROM {} WHERE group_id = ?1 ORDER BY rowid",
        table
    );
    let mut stmt = conn.prepare(&sql)?;
    let raw = stmt
        .query_map([group_id], |row| row.get::<_, String>(0))?
        .collect::<std::result::Result<Vec<_>, _>>()?;

    raw.iter().map(|id| parse_id(id)).collect()
}

fn query_invites(conn: &Connection, group_id: &str) -> Result<Vec<Invite>> {
    let mut stmt = conn.prepare(
        "SELECT to_user, from_user, created_at FROM group_invites
         WHERE group_id = ?1 ORDER BY rowid",
    )?;
    let rows = stmt
        .query_map([group_id], |row| {
            Ok(InviteRow {
                to_user: row.get(0)?,
                from_user: row.get(1)?,
                created_at: row.get(2)?,
            })
        })?
        .collect::<std::result::Result<Vec<_>, _>>()?;

    rows.into_iter()
        .map(|row| {
            Ok(Invite {
                to: parse_id(&row.to_user)?,
                from: parse_id(&row.from_user)?,
                created_at: parse_timestamp(&row.created_at)?,
            })
        })
        .collect()
}

fn insert_lists(tx: &Transaction, group: &Group) -> Result<()> {
    let group_id = group.id.to_string();
    for member in &group.members {
        tx.execute(
            "INSERT INTO group_members (group_id, user_id) VALUES (?1, ?2)",
            params![group_id, member.to_string()],
        )?;
    }
    for moderator in &group.moderators {
        tx.execute(
            "INSERT INTO group_moderators (group_id, user_id) VALUES (?1, ?2)",
            params![group_id, moderator.to_string()],
        )?;
    }
    for requester in &group.join_requests {
        tx.execute(
            "INSERT INTO group_join_requests (group_id, user_id) VALUES (?1, ?2)",
            params![group_id, requester.to_string()],
        )?;
    }
    for invite in &group.invites {
        tx.execute(
            "INSERT INTO group_invites (group_id, to_user, from_user, created_at)
             VALUES (?1, ?2, ?3, ?4)",
            params![
                group_id,
                invite.to.to_string(),
                invite.from.to_string(),
                invite.created_at.to_rfc3339(),
            ],
        )?;
    }
    Ok(())
}

fn delete_lists(tx: &Transaction, group_id: &str) -> Result<()> {
    for table in [
        "group_members",
        "group_moderators",
        "group_join_requests",
        "group_invites",
    ] {
        let sql = format!("DELETE FROM {} WHERE group_id = ?1", table);
        tx.execute(&sql, [group_id])?;
    }
    Ok(())
}

fn visibility_str(visibility: Visibility) -> &'static str {
    match visibility {
        Visibility::Public => "public",
        Visibility::Private => "private",
    }
}

fn parse_visibility(raw: &str) -> Result<Visibility> {
    match raw {
        "public" => Ok(Visibility::Public),
        "private" => Ok(Visibility::Private),
        other => Err(anyhow!("corrupt visibility '{}'", other)),
    }
}

fn parse_id(raw: &str) -> Result<Uuid> {
    raw.parse()
        .map_err(|e| anyhow!("corrupt id '{}': {}", raw, e))
}

fn parse_timestamp(raw: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|t| t.with_timezone(&Utc))
        .map_err(|e| anyhow!("corrupt timestamp '{}': {}", raw, e))
}

/// Extension trait for optional query results
trait OptionalExt<T> {
    fn optional(self) -> Result<Option<T>>;
}

impl<T> OptionalExt<T> for std::result::Result<T, rusqlite::Error> {
    fn optional(self) -> Result<Option<T>> {
        match self {
            Ok(val) => Ok(Some(val)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}

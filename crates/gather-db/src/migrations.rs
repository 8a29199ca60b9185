use anyhow::Result;
use rusqlite::Connection;
use tracing::info;

pub fn run(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS groups (
            id          TEXT PRIMARY KEY,
            name        TEXT NOT NULL,
            description TEXT NOT NULL DEFAULT '',
            visibility  TEXT NOT NULL CHECK (visibility IN ('public', 'private')),
            owner_id    TEXT NOT NULL,
            created_at  TEXT NOT NULL
        );

        -- The list tables rely on rowid for ordering: rows are inserted
        -- in aggregate list order and read back ORDER BY rowid, so the
        -- moderator-list order that drives ownership transfer survives
        -- the round trip.

        CREATE TABLE IF NOT EXISTS group_members (
            group_id    TEXT NOT NULL REFERENCES groups(id) ON DELETE CASCADE,
            user_id     TEXT NOT NULL,
            PRIMARY KEY (group_id, user_id)
        );

        CREATE TABLE IF NOT EXISTS group_moderators (
            group_id    TEXT NOT NULL REFERENCES groups(id) ON DELETE CASCADE,
            user_id     TEXT NOT NULL,
            PRIMARY KEY (group_id, user_id)
        );

        CREATE TABLE IF NOT EXISTS group_join_requests (
            group_id    TEXT NOT NULL REFERENCES groups(id) ON DELETE CASCADE,
            user_id     TEXT NOT NULL,
            PRIMARY KEY (group_id, user_id)
        );

        CREATE TABLE IF NOT EXISTS group_invites (
            group_id    TEXT NOT NULL REFERENCES groups(id) ON DELETE CASCADE,
            to_user     TEXT NOT NULL,
            from_user   TEXT NOT NULL,
            created_at  TEXT NOT NULL,
            PRIMARY KEY (group_id, to_user)
        );

        CREATE TABLE IF NOT EXISTS conversations (
            id          TEXT PRIMARY KEY,
            group_id    TEXT NOT NULL UNIQUE REFERENCES groups(id) ON DELETE CASCADE,
            created_at  TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS conversation_members (
            conversation_id TEXT NOT NULL REFERENCES conversations(id) ON DELETE CASCADE,
            user_id         TEXT NOT NULL,
            PRIMARY KEY (conversation_id, user_id)
        );

        CREATE TABLE IF NOT EXISTS conversation_messages (
            id              TEXT PRIMARY KEY,
            conversation_id TEXT NOT NULL REFERENCES conversations(id) ON DELETE CASCADE,
            author_id       TEXT NOT NULL,
            body            TEXT NOT NULL,
            created_at      TEXT NOT NULL
        );

        CREATE INDEX IF NOT EXISTS idx_messages_conversation
            ON conversation_messages(conversation_id, created_at);
        ",
    )?;

    info!("Database migrations complete");
    Ok(())
}

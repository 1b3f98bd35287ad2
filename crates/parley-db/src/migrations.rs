use anyhow::Result;
use rusqlite::Connection;
use tracing::info;

pub fn run(conn: &Connection) -> Result<()> {
    conn.execute_batch("CREATE TABLE IF NOT EXISTS schema_version (version INTEGER NOT NULL);")?;

    let version: i64 =
        conn.query_row("SELECT COALESCE(MAX(version), 0) FROM schema_version", [], |r| r.get(0))?;

    if version < 1 {
        info!("Running migration v1 (users, posts, comments, likes)");
        conn.execute_batch(
            "
            CREATE TABLE users (
                id          TEXT PRIMARY KEY,
                username    TEXT NOT NULL,
                created_at  TEXT NOT NULL
            );

            CREATE TABLE posts (
                id          TEXT PRIMARY KEY,
                author_id   TEXT NOT NULL REFERENCES users(id),
                kind        TEXT NOT NULL CHECK (kind IN ('post', 'event')),
                title       TEXT NOT NULL,
                body        TEXT NOT NULL DEFAULT '',
                created_at  TEXT NOT NULL
            );

            CREATE INDEX idx_posts_author ON posts(author_id, created_at);

            -- parent_id has no ON DELETE action: a row with replies cannot be removed.
            CREATE TABLE comments (
                id                TEXT PRIMARY KEY,
                commentable_type  TEXT NOT NULL,
                commentable_id    TEXT NOT NULL,
                commenter_id      TEXT NOT NULL REFERENCES users(id),
                parent_id         TEXT REFERENCES comments(id),
                thread_root_id    TEXT,
                text              TEXT NOT NULL,
                approved          INTEGER NOT NULL DEFAULT 1,
                created_at        TEXT NOT NULL,
                updated_at        TEXT NOT NULL,
                deleted_at        TEXT
            );

            CREATE INDEX idx_comments_commentable
                ON comments(commentable_type, commentable_id, created_at);
            CREATE INDEX idx_comments_parent ON comments(parent_id);
            CREATE INDEX idx_comments_commenter ON comments(commenter_id, created_at);

            CREATE TABLE likes (
                likeable_type  TEXT NOT NULL,
                likeable_id    TEXT NOT NULL,
                user_id        TEXT NOT NULL REFERENCES users(id),
                created_at     TEXT NOT NULL,
                PRIMARY KEY (likeable_type, likeable_id, user_id)
            );

            INSERT INTO schema_version (version) VALUES (1);
            ",
        )?;
    }

    info!("Database migrations complete");
    Ok(())
}

use rusqlite::Connection;
use tracing::info;

use crate::Result;

pub fn run(conn: &Connection) -> Result<()> {
    conn.execute_batch("CREATE TABLE IF NOT EXISTS schema_version (version INTEGER NOT NULL);")?;

    let version: i64 = conn.query_row(
        "SELECT COALESCE(MAX(version), 0) FROM schema_version",
        [],
        |r| r.get(0),
    )?;

    if version < 1 {
        info!("Running migration v1 (initial schema)");
        conn.execute_batch(
            "
            CREATE TABLE roles (
                id          INTEGER PRIMARY KEY AUTOINCREMENT,
                name        TEXT NOT NULL UNIQUE,
                is_default  INTEGER NOT NULL DEFAULT 0,
                permissions INTEGER NOT NULL DEFAULT 0
            );

            -- at most one default role
            CREATE UNIQUE INDEX idx_roles_single_default
                ON roles(is_default) WHERE is_default = 1;

            CREATE TABLE users (
                id            TEXT PRIMARY KEY,
                email         TEXT NOT NULL UNIQUE COLLATE NOCASE,
                username      TEXT NOT NULL UNIQUE,
                password_hash TEXT NOT NULL,
                confirmed     INTEGER NOT NULL DEFAULT 0,
                role_id       INTEGER REFERENCES roles(id) ON DELETE SET NULL,
                name          TEXT,
                location      TEXT,
                about_me      TEXT,
                member_since  TEXT NOT NULL,
                last_seen     TEXT NOT NULL
            );

            CREATE TABLE follows (
                follower_id TEXT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
                followed_id TEXT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
                created_at  TEXT NOT NULL,
                PRIMARY KEY (follower_id, followed_id)
            );

            CREATE INDEX idx_follows_followed ON follows(followed_id);

            CREATE TABLE posts (
                id        TEXT PRIMARY KEY,
                body      TEXT NOT NULL,
                timestamp TEXT NOT NULL,
                author_id TEXT NOT NULL REFERENCES users(id) ON DELETE CASCADE
            );

            CREATE INDEX idx_posts_author ON posts(author_id, timestamp);
            CREATE INDEX idx_posts_timestamp ON posts(timestamp);

            CREATE TABLE comments (
                id         TEXT PRIMARY KEY,
                body       TEXT NOT NULL,
                created_at TEXT NOT NULL,
                disabled   INTEGER NOT NULL DEFAULT 0,
                author_id  TEXT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
                post_id    TEXT NOT NULL REFERENCES posts(id) ON DELETE CASCADE
            );

            CREATE INDEX idx_comments_post ON comments(post_id, created_at);

            INSERT INTO schema_version (version) VALUES (1);
            ",
        )?;
    }

    info!("Database migrations complete");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn migrations_are_rerunnable() {
        let conn = Connection::open_in_memory().unwrap();
        run(&conn).unwrap();
        run(&conn).unwrap();
        let versions: i64 = conn
            .query_row("SELECT COUNT(*) FROM schema_version", [], |r| r.get(0))
            .unwrap();
        assert_eq!(versions, 1);
    }
}

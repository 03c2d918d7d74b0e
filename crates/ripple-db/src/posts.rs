use ripple_types::models::Post;
use ripple_types::pagination::{PageRequest, Paginated};
use rusqlite::Connection;
use tracing::info;
use uuid::Uuid;

use crate::error::OptionalExt;
use crate::models::{POST_COLUMNS, PostRow, now_ts};
use crate::paginate::paginate;
use crate::{Database, DbError, Result};

impl Database {
    pub fn create_post(&self, author: Uuid, body: &str) -> Result<Post> {
        let id = Uuid::new_v4().to_string();
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO posts (id, body, timestamp, author_id) VALUES (?1, ?2, ?3, ?4)",
                rusqlite::params![id, body, now_ts(), author.to_string()],
            )?;
            info!("User {} published post {}", author, id);
            query_post(conn, &id)?.ok_or(DbError::NotFound("post"))
        })
    }

    pub fn get_post(&self, id: Uuid) -> Result<Option<Post>> {
        self.with_conn(|conn| query_post(conn, &id.to_string()))
    }

    pub fn edit_post(&self, id: Uuid, body: &str) -> Result<Post> {
        let id = id.to_string();
        self.with_conn(|conn| {
            let updated = conn.execute(
                "UPDATE posts SET body = ?1 WHERE id = ?2",
                rusqlite::params![body, id],
            )?;
            if updated == 0 {
                return Err(DbError::NotFound("post"));
            }
            query_post(conn, &id)?.ok_or(DbError::NotFound("post"))
        })
    }

    /// Every post, newest first.
    pub fn all_posts(&self, request: PageRequest) -> Result<Paginated<Post>> {
        self.with_conn(|conn| {
            let page = paginate(
                conn,
                "SELECT COUNT(*) FROM posts",
                &format!(
                    "SELECT {POST_COLUMNS} FROM posts p LEFT JOIN users u ON p.author_id = u.id
                     ORDER BY p.timestamp DESC, p.rowid DESC"
                ),
                &[],
                request,
                PostRow::from_row,
            )?;
            Ok(page.map(Post::from))
        })
    }

    /// Posts written by `author`, newest first.
    pub fn posts_by_author(&self, author: Uuid, request: PageRequest) -> Result<Paginated<Post>> {
        let author = author.to_string();
        self.with_conn(|conn| {
            let page = paginate(
                conn,
                "SELECT COUNT(*) FROM posts WHERE author_id = ?1",
                &format!(
                    "SELECT {POST_COLUMNS} FROM posts p LEFT JOIN users u ON p.author_id = u.id
                     WHERE p.author_id = ?1
                     ORDER BY p.timestamp DESC, p.rowid DESC"
                ),
                &[&author],
                request,
                PostRow::from_row,
            )?;
            Ok(page.map(Post::from))
        })
    }
}

fn query_post(conn: &Connection, id: &str) -> Result<Option<Post>> {
    let row = conn
        .query_row(
            &format!(
                "SELECT {POST_COLUMNS} FROM posts p
                 LEFT JOIN users u ON p.author_id = u.id WHERE p.id = ?1"
            ),
            [id],
            PostRow::from_row,
        )
        .optional()?;
    Ok(row.map(Post::from))
}

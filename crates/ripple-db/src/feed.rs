//! Relationship-derived views: the follow-based feed and the comment
//! threads under posts, filtered by what the viewer may see.

use ripple_types::models::{Actor, Comment, Post};
use ripple_types::pagination::{PageRequest, Paginated};
use rusqlite::Connection;
use tracing::info;
use uuid::Uuid;

use crate::error::OptionalExt;
use crate::models::{COMMENT_COLUMNS, CommentRow, POST_COLUMNS, PostRow, now_ts};
use crate::paginate::paginate;
use crate::{Database, DbError, Result};

/// Extra predicate hiding disabled comments from non-administrators.
fn visibility(viewer: &Actor) -> &'static str {
    if viewer.is_administrator() {
        ""
    } else {
        " AND c.disabled = 0"
    }
}

impl Database {
    /// Posts by everyone `user` follows, itself included through the
    /// self-follow edge, newest first. Recomputed on every call.
    pub fn feed(&self, user: Uuid, request: PageRequest) -> Result<Paginated<Post>> {
        let id = user.to_string();
        self.with_conn(|conn| {
            let page = paginate(
                conn,
                "SELECT COUNT(*) FROM posts p
                 JOIN follows f ON f.followed_id = p.author_id
                 WHERE f.follower_id = ?1",
                &format!(
                    "SELECT {POST_COLUMNS} FROM posts p
                     JOIN follows f ON f.followed_id = p.author_id
                     LEFT JOIN users u ON p.author_id = u.id
                     WHERE f.follower_id = ?1
                     ORDER BY p.timestamp DESC, p.rowid DESC"
                ),
                &[&id],
                request,
                PostRow::from_row,
            )?;
            Ok(page.map(Post::from))
        })
    }

    /// Comments under `post`, oldest first. A `Page::Last` request counts
    /// the visible comments first and then reads the final page.
    pub fn comments_for(
        &self,
        post: Uuid,
        viewer: &Actor,
        request: PageRequest,
    ) -> Result<Paginated<Comment>> {
        let post = post.to_string();
        let filter = visibility(viewer);
        self.with_conn(|conn| {
            let page = paginate(
                conn,
                &format!("SELECT COUNT(*) FROM comments c WHERE c.post_id = ?1{filter}"),
                &format!(
                    "SELECT {COMMENT_COLUMNS} FROM comments c
                     LEFT JOIN users u ON c.author_id = u.id
                     WHERE c.post_id = ?1{filter}
                     ORDER BY c.created_at ASC, c.rowid ASC"
                ),
                &[&post],
                request,
                CommentRow::from_row,
            )?;
            Ok(page.map(Comment::from))
        })
    }

    /// Every comment on the site, newest first, same visibility rule.
    pub fn all_comments(&self, viewer: &Actor, request: PageRequest) -> Result<Paginated<Comment>> {
        let filter = visibility(viewer);
        self.with_conn(|conn| {
            let page = paginate(
                conn,
                &format!("SELECT COUNT(*) FROM comments c WHERE 1 = 1{filter}"),
                &format!(
                    "SELECT {COMMENT_COLUMNS} FROM comments c
                     LEFT JOIN users u ON c.author_id = u.id
                     WHERE 1 = 1{filter}
                     ORDER BY c.created_at DESC, c.rowid DESC"
                ),
                &[],
                request,
                CommentRow::from_row,
            )?;
            Ok(page.map(Comment::from))
        })
    }

    pub fn create_comment(&self, post: Uuid, author: Uuid, body: &str) -> Result<Comment> {
        let id = Uuid::new_v4().to_string();
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO comments (id, body, created_at, author_id, post_id)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                rusqlite::params![id, body, now_ts(), author.to_string(), post.to_string()],
            )?;
            info!("User {} commented on post {}", author, post);
            query_comment(conn, &id)?.ok_or(DbError::NotFound("comment"))
        })
    }

    /// Unfiltered lookup; callers decide whether the viewer may see it.
    pub fn get_comment(&self, id: Uuid) -> Result<Option<Comment>> {
        self.with_conn(|conn| query_comment(conn, &id.to_string()))
    }

    pub fn delete_comment(&self, id: Uuid) -> Result<()> {
        self.with_conn(|conn| {
            let deleted = conn.execute("DELETE FROM comments WHERE id = ?1", [id.to_string()])?;
            if deleted == 0 {
                return Err(DbError::NotFound("comment"));
            }
            Ok(())
        })
    }

    /// Moderation toggle. Either state can be reached from the other at any
    /// time.
    pub fn set_comment_disabled(&self, id: Uuid, disabled: bool) -> Result<Comment> {
        let id = id.to_string();
        self.with_conn(|conn| {
            let updated = conn.execute(
                "UPDATE comments SET disabled = ?1 WHERE id = ?2",
                rusqlite::params![disabled, id],
            )?;
            if updated == 0 {
                return Err(DbError::NotFound("comment"));
            }
            info!("Comment {} {}", id, if disabled { "disabled" } else { "enabled" });
            query_comment(conn, &id)?.ok_or(DbError::NotFound("comment"))
        })
    }
}

fn query_comment(conn: &Connection, id: &str) -> Result<Option<Comment>> {
    let row = conn
        .query_row(
            &format!(
                "SELECT {COMMENT_COLUMNS} FROM comments c
                 LEFT JOIN users u ON c.author_id = u.id WHERE c.id = ?1"
            ),
            [id],
            CommentRow::from_row,
        )
        .optional()?;
    Ok(row.map(Comment::from))
}

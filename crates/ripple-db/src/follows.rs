use ripple_types::models::FollowEntry;
use ripple_types::pagination::{PageRequest, Paginated};
use tracing::{debug, info};
use uuid::Uuid;

use crate::error::OptionalExt;
use crate::models::{FollowRow, now_ts};
use crate::paginate::paginate;
use crate::{Database, Result};

impl Database {
    /// Create the edge `follower -> followed` unless it already exists.
    /// Returns whether a new edge was written.
    pub fn follow(&self, follower: Uuid, followed: Uuid) -> Result<bool> {
        self.with_conn(|conn| {
            let inserted = conn.execute(
                "INSERT OR IGNORE INTO follows (follower_id, followed_id, created_at)
                 VALUES (?1, ?2, ?3)",
                rusqlite::params![follower.to_string(), followed.to_string(), now_ts()],
            )?;
            if inserted > 0 {
                info!("{} now follows {}", follower, followed);
            }
            Ok(inserted > 0)
        })
    }

    /// Remove the edge if present. The self-follow edge is never removed;
    /// the feed depends on it.
    pub fn unfollow(&self, follower: Uuid, followed: Uuid) -> Result<bool> {
        if follower == followed {
            debug!("Ignoring unfollow of self by {}", follower);
            return Ok(false);
        }
        self.with_conn(|conn| {
            let removed = conn.execute(
                "DELETE FROM follows WHERE follower_id = ?1 AND followed_id = ?2",
                [follower.to_string(), followed.to_string()],
            )?;
            if removed > 0 {
                info!("{} unfollowed {}", follower, followed);
            }
            Ok(removed > 0)
        })
    }

    /// Does `a` follow `b`?
    pub fn is_following(&self, a: Uuid, b: Uuid) -> Result<bool> {
        self.with_conn(|conn| {
            let found: Option<i64> = conn
                .query_row(
                    "SELECT 1 FROM follows WHERE follower_id = ?1 AND followed_id = ?2",
                    [a.to_string(), b.to_string()],
                    |r| r.get(0),
                )
                .optional()?;
            Ok(found.is_some())
        })
    }

    /// Is `a` followed by `b`?
    pub fn is_followed_by(&self, a: Uuid, b: Uuid) -> Result<bool> {
        self.is_following(b, a)
    }

    /// Users following `user`, newest edge first, self excluded.
    pub fn followers(&self, user: Uuid, request: PageRequest) -> Result<Paginated<FollowEntry>> {
        let id = user.to_string();
        self.with_conn(|conn| {
            let page = paginate(
                conn,
                "SELECT COUNT(*) FROM follows WHERE followed_id = ?1 AND follower_id != ?1",
                "SELECT u.id, u.username, f.created_at
                 FROM follows f JOIN users u ON u.id = f.follower_id
                 WHERE f.followed_id = ?1 AND f.follower_id != ?1
                 ORDER BY f.created_at DESC, f.rowid DESC",
                &[&id],
                request,
                FollowRow::from_row,
            )?;
            Ok(page.map(FollowEntry::from))
        })
    }

    /// Users `user` follows, newest edge first, self excluded.
    pub fn following(&self, user: Uuid, request: PageRequest) -> Result<Paginated<FollowEntry>> {
        let id = user.to_string();
        self.with_conn(|conn| {
            let page = paginate(
                conn,
                "SELECT COUNT(*) FROM follows WHERE follower_id = ?1 AND followed_id != ?1",
                "SELECT u.id, u.username, f.created_at
                 FROM follows f JOIN users u ON u.id = f.followed_id
                 WHERE f.follower_id = ?1 AND f.followed_id != ?1
                 ORDER BY f.created_at DESC, f.rowid DESC",
                &[&id],
                request,
                FollowRow::from_row,
            )?;
            Ok(page.map(FollowEntry::from))
        })
    }

    /// (followers, following) counts with the self-edge excluded.
    pub fn follow_counts(&self, user: Uuid) -> Result<(u64, u64)> {
        let id = user.to_string();
        self.with_conn(|conn| {
            let (followers, following): (i64, i64) = conn.query_row(
                "SELECT
                    (SELECT COUNT(*) FROM follows WHERE followed_id = ?1 AND follower_id != ?1),
                    (SELECT COUNT(*) FROM follows WHERE follower_id = ?1 AND followed_id != ?1)",
                [&id],
                |r| Ok((r.get(0)?, r.get(1)?)),
            )?;
            Ok((
                u64::try_from(followers).unwrap_or(0),
                u64::try_from(following).unwrap_or(0),
            ))
        })
    }
}

//! Database row types. These map directly to SQLite rows and are converted
//! into the `ripple-types` models at the edge of each query.

use chrono::{DateTime, SecondsFormat, Utc};
use ripple_types::models::{Comment, FollowEntry, Post, Role, User};
use ripple_types::permissions::Permission;
use rusqlite::Row;
use tracing::warn;
use uuid::Uuid;

pub struct RoleRow {
    pub id: i64,
    pub name: String,
    pub is_default: bool,
    pub permissions: u32,
}

pub struct UserRow {
    pub id: String,
    pub email: String,
    pub username: String,
    pub confirmed: bool,
    pub name: Option<String>,
    pub location: Option<String>,
    pub about_me: Option<String>,
    pub member_since: String,
    pub last_seen: String,
    pub role: Option<RoleRow>,
}

pub struct PostRow {
    pub id: String,
    pub body: String,
    pub timestamp: String,
    pub author_id: String,
    pub author_username: String,
}

pub struct CommentRow {
    pub id: String,
    pub body: String,
    pub created_at: String,
    pub disabled: bool,
    pub author_id: String,
    pub author_username: String,
    pub post_id: String,
}

pub struct FollowRow {
    pub user_id: String,
    pub username: String,
    pub created_at: String,
}

pub(crate) const ROLE_COLUMNS: &str = "id, name, is_default, permissions";

/// Select list for `users u LEFT JOIN roles r ON u.role_id = r.id`.
pub(crate) const USER_COLUMNS: &str = "u.id, u.email, u.username, u.confirmed, u.name, u.location, \
     u.about_me, u.member_since, u.last_seen, r.id, r.name, r.is_default, r.permissions";

pub(crate) const POST_COLUMNS: &str = "p.id, p.body, p.timestamp, p.author_id, u.username";

pub(crate) const COMMENT_COLUMNS: &str =
    "c.id, c.body, c.created_at, c.disabled, c.author_id, u.username, c.post_id";

impl RoleRow {
    pub(crate) fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            name: row.get(1)?,
            is_default: row.get(2)?,
            permissions: row.get(3)?,
        })
    }
}

impl UserRow {
    pub(crate) fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        let role_id: Option<i64> = row.get(9)?;
        let role = match role_id {
            Some(id) => Some(RoleRow {
                id,
                name: row.get(10)?,
                is_default: row.get(11)?,
                permissions: row.get(12)?,
            }),
            None => None,
        };

        Ok(Self {
            id: row.get(0)?,
            email: row.get(1)?,
            username: row.get(2)?,
            confirmed: row.get(3)?,
            name: row.get(4)?,
            location: row.get(5)?,
            about_me: row.get(6)?,
            member_since: row.get(7)?,
            last_seen: row.get(8)?,
            role,
        })
    }
}

impl PostRow {
    pub(crate) fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            body: row.get(1)?,
            timestamp: row.get(2)?,
            author_id: row.get(3)?,
            author_username: row
                .get::<_, Option<String>>(4)?
                .unwrap_or_else(|| "unknown".to_string()),
        })
    }
}

impl CommentRow {
    pub(crate) fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            body: row.get(1)?,
            created_at: row.get(2)?,
            disabled: row.get(3)?,
            author_id: row.get(4)?,
            author_username: row
                .get::<_, Option<String>>(5)?
                .unwrap_or_else(|| "unknown".to_string()),
            post_id: row.get(6)?,
        })
    }
}

impl FollowRow {
    pub(crate) fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            user_id: row.get(0)?,
            username: row.get(1)?,
            created_at: row.get(2)?,
        })
    }
}

impl From<RoleRow> for Role {
    fn from(row: RoleRow) -> Self {
        Role {
            id: row.id,
            name: row.name,
            is_default: row.is_default,
            permissions: Permission::from(row.permissions),
        }
    }
}

impl From<UserRow> for User {
    fn from(row: UserRow) -> Self {
        User {
            id: parse_uuid(&row.id, "user id"),
            member_since: parse_ts(&row.member_since),
            last_seen: parse_ts(&row.last_seen),
            email: row.email,
            username: row.username,
            confirmed: row.confirmed,
            role: row.role.map(Role::from),
            name: row.name,
            location: row.location,
            about_me: row.about_me,
        }
    }
}

impl From<PostRow> for Post {
    fn from(row: PostRow) -> Self {
        Post {
            id: parse_uuid(&row.id, "post id"),
            timestamp: parse_ts(&row.timestamp),
            author_id: parse_uuid(&row.author_id, "post author_id"),
            body: row.body,
            author_username: row.author_username,
        }
    }
}

impl From<CommentRow> for Comment {
    fn from(row: CommentRow) -> Self {
        Comment {
            id: parse_uuid(&row.id, "comment id"),
            created_at: parse_ts(&row.created_at),
            author_id: parse_uuid(&row.author_id, "comment author_id"),
            post_id: parse_uuid(&row.post_id, "comment post_id"),
            body: row.body,
            disabled: row.disabled,
            author_username: row.author_username,
        }
    }
}

impl From<FollowRow> for FollowEntry {
    fn from(row: FollowRow) -> Self {
        FollowEntry {
            user_id: parse_uuid(&row.user_id, "follow user_id"),
            since: parse_ts(&row.created_at),
            username: row.username,
        }
    }
}

/// Current time in the stored format. Microsecond RFC 3339 in UTC sorts
/// lexically in chronological order.
pub(crate) fn now_ts() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Micros, true)
}

pub(crate) fn parse_ts(raw: &str) -> DateTime<Utc> {
    raw.parse::<DateTime<Utc>>()
        .or_else(|_| {
            // SQLite's datetime('now') has no timezone
            chrono::NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S").map(|ndt| ndt.and_utc())
        })
        .unwrap_or_else(|e| {
            warn!("Corrupt timestamp '{}': {}", raw, e);
            DateTime::default()
        })
}

fn parse_uuid(raw: &str, what: &str) -> Uuid {
    raw.parse().unwrap_or_else(|e| {
        warn!("Corrupt {} '{}': {}", what, raw, e);
        Uuid::default()
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stored_timestamps_round_trip_and_sort() {
        let a = now_ts();
        std::thread::sleep(std::time::Duration::from_millis(2));
        let b = now_ts();
        assert!(a < b);
        assert!(parse_ts(&a) < parse_ts(&b));
    }

    #[test]
    fn sqlite_datetime_format_is_accepted() {
        let ts = parse_ts("2024-05-01 12:30:00");
        assert_eq!(ts.to_rfc3339(), "2024-05-01T12:30:00+00:00");
    }
}

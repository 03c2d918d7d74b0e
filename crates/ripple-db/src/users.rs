use ripple_auth::{TokenService, password};
use ripple_types::models::User;
use ripple_types::permissions::ADMINISTRATOR_ROLE;
use rusqlite::Connection;
use tracing::{info, warn};
use uuid::Uuid;

use crate::error::OptionalExt;
use crate::models::{USER_COLUMNS, UserRow, now_ts};
use crate::roles::query_role;
use crate::{Database, DbError, Result};

/// Administrator edit of any account. `None` leaves the field untouched.
#[derive(Debug, Default, Clone)]
pub struct AccountChanges {
    pub email: Option<String>,
    pub username: Option<String>,
    pub confirmed: Option<bool>,
    pub role: Option<String>,
    pub name: Option<String>,
    pub location: Option<String>,
    pub about_me: Option<String>,
}

/// Free-text profile fields. Each value replaces the stored one; `None`
/// clears it.
#[derive(Debug, Default, Clone)]
pub struct ProfileChanges {
    pub name: Option<String>,
    pub location: Option<String>,
    pub about_me: Option<String>,
}

impl Database {
    // -- Lifecycle --

    /// Register a user with the default role, or the administrator role when
    /// `email` matches `admin_email`. The user row and its self-follow edge
    /// are written in one transaction.
    pub fn create_user(
        &self,
        email: &str,
        username: &str,
        plaintext_password: &str,
        admin_email: Option<&str>,
    ) -> Result<User> {
        let password_hash = password::hash_password(plaintext_password)?;
        let id = Uuid::new_v4().to_string();
        let is_admin = admin_email.is_some_and(|admin| admin.eq_ignore_ascii_case(email));

        self.with_conn_mut(|conn| {
            let tx = conn.transaction()?;

            let role = if is_admin {
                query_role(&tx, "name = ?1", &ADMINISTRATOR_ROLE)?
            } else {
                query_role(&tx, "is_default = ?1", &true)?
            };
            if role.is_none() {
                warn!("No role available for new user {}; roles not seeded?", username);
            }

            let now = now_ts();
            tx.execute(
                "INSERT INTO users
                 (id, email, username, password_hash, role_id, member_since, last_seen)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?6)",
                rusqlite::params![id, email, username, password_hash, role.map(|r| r.id), now],
            )?;
            tx.execute(
                "INSERT INTO follows (follower_id, followed_id, created_at) VALUES (?1, ?1, ?2)",
                rusqlite::params![id, now],
            )?;

            let user = query_user(&tx, "u.id = ?1", &id)?.ok_or(DbError::NotFound("user"))?;
            tx.commit()?;

            info!("Created user {} ({})", user.username, user.id);
            Ok(user)
        })
    }

    pub fn delete_user(&self, id: Uuid) -> Result<()> {
        self.with_conn(|conn| {
            // posts, comments and follow edges go with it via ON DELETE CASCADE
            let deleted = conn.execute("DELETE FROM users WHERE id = ?1", [id.to_string()])?;
            if deleted == 0 {
                return Err(DbError::NotFound("user"));
            }
            info!("Deleted user {}", id);
            Ok(())
        })
    }

    /// Record activity for an authenticated user.
    pub fn ping(&self, id: Uuid) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                "UPDATE users SET last_seen = ?1 WHERE id = ?2",
                rusqlite::params![now_ts(), id.to_string()],
            )?;
            Ok(())
        })
    }

    /// Consume a confirmation token for `user_id`. Returns false, changing
    /// nothing, if the token is invalid, expired or was issued for another
    /// user. Already-confirmed users succeed without a write.
    pub fn confirm(&self, tokens: &TokenService, token: &str, user_id: Uuid) -> Result<bool> {
        match tokens.confirmation_subject(token) {
            Some(subject) if subject == user_id => {}
            _ => {
                warn!("Rejected confirmation token for user {}", user_id);
                return Ok(false);
            }
        }

        self.with_conn(|conn| {
            let updated = conn.execute(
                "UPDATE users SET confirmed = 1 WHERE id = ?1 AND confirmed = 0",
                [user_id.to_string()],
            )?;
            if updated == 1 {
                info!("User {} confirmed", user_id);
                return Ok(true);
            }
            // nothing updated: either already confirmed or gone
            let exists: Option<i64> = conn
                .query_row("SELECT 1 FROM users WHERE id = ?1", [user_id.to_string()], |r| r.get(0))
                .optional()?;
            exists.map(|_| true).ok_or(DbError::NotFound("user"))
        })
    }

    // -- Passwords --

    pub fn set_password(&self, id: Uuid, plaintext: &str) -> Result<()> {
        let hash = password::hash_password(plaintext)?;
        self.with_conn(|conn| {
            let updated = conn.execute(
                "UPDATE users SET password_hash = ?1 WHERE id = ?2",
                rusqlite::params![hash, id.to_string()],
            )?;
            if updated == 0 {
                return Err(DbError::NotFound("user"));
            }
            Ok(())
        })
    }

    pub fn verify_password(&self, id: Uuid, plaintext: &str) -> Result<bool> {
        let hash: String = self
            .with_conn(|conn| {
                conn.query_row(
                    "SELECT password_hash FROM users WHERE id = ?1",
                    [id.to_string()],
                    |r| r.get(0),
                )
                .optional()
            })?
            .ok_or(DbError::NotFound("user"))?;
        // hash comparison runs outside the connection lock
        Ok(password::verify_password(&hash, plaintext))
    }

    /// Email + password login. `None` covers both unknown email and wrong
    /// password.
    pub fn authenticate(&self, email: &str, plaintext: &str) -> Result<Option<User>> {
        let Some(user) = self.get_user_by_email(email)? else {
            return Ok(None);
        };
        if self.verify_password(user.id, plaintext)? {
            Ok(Some(user))
        } else {
            Ok(None)
        }
    }

    // -- Lookups --

    pub fn get_user_by_id(&self, id: Uuid) -> Result<Option<User>> {
        self.with_conn(|conn| query_user(conn, "u.id = ?1", &id.to_string()))
    }

    pub fn get_user_by_email(&self, email: &str) -> Result<Option<User>> {
        self.with_conn(|conn| query_user(conn, "u.email = ?1", &email))
    }

    pub fn get_user_by_username(&self, username: &str) -> Result<Option<User>> {
        self.with_conn(|conn| query_user(conn, "u.username = ?1", &username))
    }

    // -- Profile & administration --

    pub fn update_profile(&self, id: Uuid, changes: &ProfileChanges) -> Result<User> {
        self.with_conn(|conn| {
            let updated = conn.execute(
                "UPDATE users SET name = ?1, location = ?2, about_me = ?3 WHERE id = ?4",
                rusqlite::params![changes.name, changes.location, changes.about_me, id.to_string()],
            )?;
            if updated == 0 {
                return Err(DbError::NotFound("user"));
            }
            query_user(conn, "u.id = ?1", &id.to_string())?.ok_or(DbError::NotFound("user"))
        })
    }

    pub fn assign_role(&self, id: Uuid, role_name: &str) -> Result<User> {
        self.update_account(
            id,
            &AccountChanges {
                role: Some(role_name.to_string()),
                ..Default::default()
            },
        )
    }

    /// Apply administrator edits atomically. Unknown role names are
    /// NotFound; duplicate email/username are Conflict.
    pub fn update_account(&self, id: Uuid, changes: &AccountChanges) -> Result<User> {
        let id = id.to_string();
        self.with_conn_mut(|conn| {
            let tx = conn.transaction()?;
            if query_user(&tx, "u.id = ?1", &id)?.is_none() {
                return Err(DbError::NotFound("user"));
            }

            if let Some(email) = &changes.email {
                tx.execute("UPDATE users SET email = ?1 WHERE id = ?2", [email, &id])?;
            }
            if let Some(username) = &changes.username {
                tx.execute("UPDATE users SET username = ?1 WHERE id = ?2", [username, &id])?;
            }
            if let Some(confirmed) = changes.confirmed {
                tx.execute(
                    "UPDATE users SET confirmed = ?1 WHERE id = ?2",
                    rusqlite::params![confirmed, id],
                )?;
            }
            if let Some(role_name) = &changes.role {
                let role = query_role(&tx, "name = ?1", role_name)?
                    .ok_or(DbError::NotFound("role"))?;
                tx.execute(
                    "UPDATE users SET role_id = ?1 WHERE id = ?2",
                    rusqlite::params![role.id, id],
                )?;
            }
            if let Some(name) = &changes.name {
                tx.execute("UPDATE users SET name = ?1 WHERE id = ?2", [name, &id])?;
            }
            if let Some(location) = &changes.location {
                tx.execute("UPDATE users SET location = ?1 WHERE id = ?2", [location, &id])?;
            }
            if let Some(about_me) = &changes.about_me {
                tx.execute("UPDATE users SET about_me = ?1 WHERE id = ?2", [about_me, &id])?;
            }

            let user = query_user(&tx, "u.id = ?1", &id)?.ok_or(DbError::NotFound("user"))?;
            tx.commit()?;
            Ok(user)
        })
    }

    /// Give every user lacking one its self-follow edge. Returns how many
    /// edges were added.
    pub fn backfill_self_follows(&self) -> Result<usize> {
        self.with_conn(|conn| {
            let added = conn.execute(
                "INSERT OR IGNORE INTO follows (follower_id, followed_id, created_at)
                 SELECT id, id, ?1 FROM users",
                [now_ts()],
            )?;
            Ok(added)
        })
    }
}

pub(crate) fn query_user(
    conn: &Connection,
    predicate: &str,
    value: &dyn rusqlite::types::ToSql,
) -> Result<Option<User>> {
    let row = conn
        .query_row(
            &format!(
                "SELECT {USER_COLUMNS} FROM users u
                 LEFT JOIN roles r ON u.role_id = r.id WHERE {predicate}"
            ),
            [value],
            UserRow::from_row,
        )
        .optional()?;
    Ok(row.map(User::from))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing;
    use ripple_types::permissions::{MODERATOR_ROLE, Permission, USER_ROLE};

    #[test]
    fn new_user_follows_itself() {
        let db = testing::db();
        let u = testing::user(&db, "alice");
        assert!(db.is_following(u.id, u.id).unwrap());
    }

    #[test]
    fn new_user_gets_default_role_and_is_unconfirmed() {
        let db = testing::db();
        let u = testing::user(&db, "alice");
        assert_eq!(u.role.as_ref().map(|r| r.name.as_str()), Some(USER_ROLE));
        assert!(!u.confirmed);
        assert!(u.can(Permission::Comment));
        assert!(!u.can(Permission::ModerateComments));
    }

    #[test]
    fn admin_email_gets_administrator_role() {
        let db = testing::db();
        let u = db
            .create_user("Boss@Example.com", "boss", "cat", Some("boss@example.com"))
            .unwrap();
        assert!(u.is_administrator());
    }

    #[test]
    fn duplicate_email_or_username_is_conflict() {
        let db = testing::db();
        testing::user(&db, "alice");
        let by_email = db.create_user("alice@example.com", "other", "cat", None).unwrap_err();
        assert!(matches!(by_email, DbError::Conflict(_)));
        let by_name = db.create_user("other@example.com", "alice", "cat", None).unwrap_err();
        assert!(matches!(by_name, DbError::Conflict(_)));
    }

    #[test]
    fn failed_self_follow_rolls_back_the_user_row() {
        let db = testing::db();
        db.with_conn(|conn| {
            conn.execute_batch(
                "CREATE TRIGGER refuse_follows BEFORE INSERT ON follows
                 BEGIN SELECT RAISE(ABORT, 'follows refused'); END;",
            )?;
            Ok(())
        })
        .unwrap();

        assert!(db.create_user("alice@example.com", "alice", "cat", None).is_err());
        let users: i64 = db
            .with_conn(|conn| Ok(conn.query_row("SELECT COUNT(*) FROM users", [], |r| r.get(0))?))
            .unwrap();
        assert_eq!(users, 0);
        assert!(db.get_user_by_username("alice").unwrap().is_none());
    }

    #[test]
    fn failed_creation_leaves_no_self_follow_behind() {
        let db = testing::db();
        testing::user(&db, "alice");
        let _ = db.create_user("alice@example.com", "other", "cat", None);
        let edges: i64 = db
            .with_conn(|conn| Ok(conn.query_row("SELECT COUNT(*) FROM follows", [], |r| r.get(0))?))
            .unwrap();
        assert_eq!(edges, 1);
    }

    #[test]
    fn password_verification() {
        let db = testing::db();
        let u = testing::user(&db, "alice");
        assert!(db.verify_password(u.id, "cat").unwrap());
        assert!(!db.verify_password(u.id, "dog").unwrap());

        db.set_password(u.id, "dog").unwrap();
        assert!(db.verify_password(u.id, "dog").unwrap());
        assert!(!db.verify_password(u.id, "cat").unwrap());
    }

    #[test]
    fn authenticate_by_email() {
        let db = testing::db();
        let u = testing::user(&db, "alice");
        let found = db.authenticate("alice@example.com", "cat").unwrap().unwrap();
        assert_eq!(found.id, u.id);
        assert!(db.authenticate("alice@example.com", "dog").unwrap().is_none());
        assert!(db.authenticate("nobody@example.com", "cat").unwrap().is_none());
    }

    #[test]
    fn confirmation_round_trip() {
        let db = testing::db();
        let tokens = TokenService::new("secret").unwrap();
        let u = testing::user(&db, "alice");
        let token = tokens.generate_confirmation_token(u.id).unwrap();

        assert!(db.confirm(&tokens, &token, u.id).unwrap());
        assert!(db.get_user_by_id(u.id).unwrap().unwrap().confirmed);
        // second use is a no-op success
        assert!(db.confirm(&tokens, &token, u.id).unwrap());
    }

    #[test]
    fn confirmation_token_is_bound_to_its_user() {
        let db = testing::db();
        let tokens = TokenService::new("secret").unwrap();
        let u1 = testing::user(&db, "alice");
        let u2 = testing::user(&db, "bob");
        let token = tokens.generate_confirmation_token(u1.id).unwrap();

        assert!(!db.confirm(&tokens, &token, u2.id).unwrap());
        assert!(!db.get_user_by_id(u2.id).unwrap().unwrap().confirmed);
        assert!(!db.confirm(&tokens, "garbage", u1.id).unwrap());
    }

    #[test]
    fn ping_moves_last_seen_forward() {
        let db = testing::db();
        let u = testing::user(&db, "alice");
        std::thread::sleep(std::time::Duration::from_millis(2));
        db.ping(u.id).unwrap();
        let after = db.get_user_by_id(u.id).unwrap().unwrap();
        assert!(after.last_seen > u.last_seen);
        assert_eq!(after.member_since, u.member_since);
    }

    #[test]
    fn assign_role_changes_permissions() {
        let db = testing::db();
        let u = testing::user(&db, "alice");
        let u = db.assign_role(u.id, MODERATOR_ROLE).unwrap();
        assert!(u.can(Permission::ModerateComments));
        assert!(matches!(db.assign_role(u.id, "Nope"), Err(DbError::NotFound("role"))));
    }

    #[test]
    fn update_account_is_atomic() {
        let db = testing::db();
        let alice = testing::user(&db, "alice");
        testing::user(&db, "bob");

        let err = db
            .update_account(
                alice.id,
                &AccountChanges {
                    email: Some("new@example.com".into()),
                    username: Some("bob".into()),
                    ..Default::default()
                },
            )
            .unwrap_err();
        assert!(matches!(err, DbError::Conflict(_)));
        let unchanged = db.get_user_by_id(alice.id).unwrap().unwrap();
        assert_eq!(unchanged.email, "alice@example.com");
    }

    #[test]
    fn account_edit_covers_profile_fields_in_one_transaction() {
        let db = testing::db();
        let alice = testing::user(&db, "alice");
        db.update_profile(
            alice.id,
            &ProfileChanges {
                name: Some("Alice".into()),
                location: Some("Lisbon".into()),
                about_me: None,
            },
        )
        .unwrap();

        let edited = db
            .update_account(
                alice.id,
                &AccountChanges {
                    location: Some("Porto".into()),
                    about_me: Some("hi".into()),
                    ..Default::default()
                },
            )
            .unwrap();
        assert_eq!(edited.name.as_deref(), Some("Alice"));
        assert_eq!(edited.location.as_deref(), Some("Porto"));
        assert_eq!(edited.about_me.as_deref(), Some("hi"));

        // a bad role aborts the profile part too
        let err = db
            .update_account(
                alice.id,
                &AccountChanges {
                    name: Some("Mallory".into()),
                    role: Some("Emperor".into()),
                    ..Default::default()
                },
            )
            .unwrap_err();
        assert!(matches!(err, DbError::NotFound("role")));
        let unchanged = db.get_user_by_id(alice.id).unwrap().unwrap();
        assert_eq!(unchanged.name.as_deref(), Some("Alice"));
    }

    #[test]
    fn profile_update() {
        let db = testing::db();
        let u = testing::user(&db, "alice");
        let u = db
            .update_profile(
                u.id,
                &ProfileChanges {
                    name: Some("Alice".into()),
                    location: Some("Paris".into()),
                    about_me: None,
                },
            )
            .unwrap();
        assert_eq!(u.name.as_deref(), Some("Alice"));
        assert_eq!(u.location.as_deref(), Some("Paris"));
        assert!(u.about_me.is_none());
    }

    #[test]
    fn backfill_restores_missing_self_follows() {
        let db = testing::db();
        let u = testing::user(&db, "alice");
        db.with_conn(|conn| {
            conn.execute("DELETE FROM follows", [])?;
            Ok(())
        })
        .unwrap();
        assert!(!db.is_following(u.id, u.id).unwrap());

        assert_eq!(db.backfill_self_follows().unwrap(), 1);
        assert!(db.is_following(u.id, u.id).unwrap());
        assert_eq!(db.backfill_self_follows().unwrap(), 0);
    }

    #[test]
    fn deleting_missing_user_is_not_found() {
        let db = testing::db();
        assert!(matches!(db.delete_user(Uuid::new_v4()), Err(DbError::NotFound("user"))));
    }
}

use ripple_types::models::Role;
use ripple_types::permissions::role_seeds;
use rusqlite::Connection;
use tracing::info;

use crate::error::OptionalExt;
use crate::models::{ROLE_COLUMNS, RoleRow};
use crate::{Database, Result};

impl Database {
    /// Upsert the fixed role table: create missing roles, overwrite the
    /// permissions and default flag of existing ones.
    pub fn insert_roles(&self) -> Result<()> {
        self.with_conn_mut(|conn| {
            let tx = conn.transaction()?;
            // clear the flag first so the single-default index never trips
            // while roles are rewritten
            tx.execute("UPDATE roles SET is_default = 0", [])?;
            for seed in role_seeds() {
                tx.execute(
                    "INSERT INTO roles (name, is_default, permissions) VALUES (?1, ?2, ?3)
                     ON CONFLICT(name) DO UPDATE SET
                        is_default = excluded.is_default,
                        permissions = excluded.permissions",
                    rusqlite::params![seed.name, seed.is_default, seed.permissions.bits()],
                )?;
            }
            tx.commit()?;
            info!("Roles seeded");
            Ok(())
        })
    }

    pub fn get_role_by_name(&self, name: &str) -> Result<Option<Role>> {
        self.with_conn(|conn| query_role(conn, "name = ?1", &name))
    }

    pub fn default_role(&self) -> Result<Option<Role>> {
        self.with_conn(|conn| query_role(conn, "is_default = ?1", &true))
    }

    pub fn list_roles(&self) -> Result<Vec<Role>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(&format!("SELECT {ROLE_COLUMNS} FROM roles ORDER BY id"))?;
            let rows = stmt
                .query_map([], RoleRow::from_row)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows.into_iter().map(Role::from).collect())
        })
    }
}

pub(crate) fn query_role(
    conn: &Connection,
    predicate: &str,
    value: &dyn rusqlite::types::ToSql,
) -> Result<Option<Role>> {
    let row = conn
        .query_row(
            &format!("SELECT {ROLE_COLUMNS} FROM roles WHERE {predicate}"),
            [value],
            RoleRow::from_row,
        )
        .optional()?;
    Ok(row.map(Role::from))
}

#[cfg(test)]
mod tests {
    use crate::Database;
    use ripple_types::permissions::{ADMINISTRATOR_ROLE, MODERATOR_ROLE, Permission, USER_ROLE};

    #[test]
    fn seeding_is_idempotent() {
        let db = Database::open_in_memory().unwrap();
        db.insert_roles().unwrap();
        db.insert_roles().unwrap();

        let roles = db.list_roles().unwrap();
        assert_eq!(roles.len(), 3);
        assert_eq!(roles.iter().filter(|r| r.is_default).count(), 1);
    }

    #[test]
    fn seeding_overwrites_drifted_permissions() {
        let db = Database::open_in_memory().unwrap();
        db.insert_roles().unwrap();
        db.with_conn(|conn| {
            conn.execute(
                "UPDATE roles SET permissions = 1, is_default = 0 WHERE name = ?1",
                [USER_ROLE],
            )?;
            conn.execute("UPDATE roles SET is_default = 1 WHERE name = ?1", [MODERATOR_ROLE])?;
            Ok(())
        })
        .unwrap();

        db.insert_roles().unwrap();

        let user = db.get_role_by_name(USER_ROLE).unwrap().unwrap();
        assert_eq!(user.permissions.bits(), 0x07);
        assert!(user.is_default);
        let default = db.default_role().unwrap().unwrap();
        assert_eq!(default.name, USER_ROLE);
    }

    #[test]
    fn administrator_role_carries_administer() {
        let db = Database::open_in_memory().unwrap();
        db.insert_roles().unwrap();
        let admin = db.get_role_by_name(ADMINISTRATOR_ROLE).unwrap().unwrap();
        assert!(admin.permissions.grants(Permission::Administer));
        assert!(admin.permissions.grants(Permission::ModerateComments));
    }

    #[test]
    fn second_default_role_is_rejected_by_storage() {
        let db = Database::open_in_memory().unwrap();
        db.insert_roles().unwrap();
        let err = db
            .with_conn(|conn| {
                conn.execute("UPDATE roles SET is_default = 1 WHERE name = ?1", [MODERATOR_ROLE])?;
                Ok(())
            })
            .unwrap_err();
        assert!(matches!(err, crate::DbError::Conflict(_)));
    }
}

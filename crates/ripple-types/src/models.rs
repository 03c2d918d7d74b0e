use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::permissions::Permission;

#[derive(Debug, Clone, PartialEq)]
pub struct Role {
    pub id: i64,
    pub name: String,
    pub is_default: bool,
    pub permissions: Permission,
}

/// A registered account. The password hash never leaves the store, so it
/// has no field here.
#[derive(Debug, Clone)]
pub struct User {
    pub id: Uuid,
    pub email: String,
    pub username: String,
    pub confirmed: bool,
    pub role: Option<Role>,
    pub name: Option<String>,
    pub location: Option<String>,
    pub about_me: Option<String>,
    pub member_since: DateTime<Utc>,
    pub last_seen: DateTime<Utc>,
}

impl User {
    /// Users without a role hold no permissions at all.
    pub fn can(&self, permission: Permission) -> bool {
        self.role
            .as_ref()
            .is_some_and(|role| role.permissions.grants(permission))
    }

    pub fn is_administrator(&self) -> bool {
        self.can(Permission::Administer)
    }
}

/// The identity a request acts as, resolved by the web layer.
#[derive(Debug, Clone)]
pub enum Actor {
    Anonymous,
    Authenticated {
        user: User,
        /// Set when the credential was a bearer token rather than a password.
        via_token: bool,
    },
}

impl Actor {
    pub fn user(&self) -> Option<&User> {
        match self {
            Self::Anonymous => None,
            Self::Authenticated { user, .. } => Some(user),
        }
    }

    pub fn user_id(&self) -> Option<Uuid> {
        self.user().map(|u| u.id)
    }

    pub fn can(&self, permission: Permission) -> bool {
        self.user().is_some_and(|u| u.can(permission))
    }

    pub fn is_administrator(&self) -> bool {
        self.can(Permission::Administer)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Post {
    pub id: Uuid,
    pub body: String,
    pub timestamp: DateTime<Utc>,
    pub author_id: Uuid,
    pub author_username: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Comment {
    pub id: Uuid,
    pub body: String,
    pub created_at: DateTime<Utc>,
    pub disabled: bool,
    pub author_id: Uuid,
    pub author_username: String,
    pub post_id: Uuid,
}

/// One side of a follow edge as shown in follower/following listings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FollowEntry {
    pub user_id: Uuid,
    pub username: String,
    pub since: DateTime<Utc>,
}

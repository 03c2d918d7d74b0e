use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::{Comment, Post, User};

// -- Auth --

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RegisterRequest {
    pub email: String,
    pub username: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct RegisterResponse {
    pub user_id: Uuid,
    pub confirmed: bool,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct TokenResponse {
    pub token: String,
    pub expiration: u64,
}

#[derive(Debug, Serialize)]
pub struct ConfirmResponse {
    pub confirmed: bool,
}

// -- Users --

#[derive(Debug, Serialize)]
pub struct UserProfile {
    pub id: Uuid,
    pub username: String,
    pub role: Option<String>,
    pub confirmed: bool,
    pub name: Option<String>,
    pub location: Option<String>,
    pub about_me: Option<String>,
    pub member_since: DateTime<Utc>,
    pub last_seen: DateTime<Utc>,
    pub followers_count: u64,
    pub following_count: u64,
    /// Whether the requesting actor follows this user. Always false for
    /// anonymous actors and for one's own profile.
    pub followed_by_you: bool,
}

impl UserProfile {
    pub fn new(
        user: &User,
        followers_count: u64,
        following_count: u64,
        followed_by_you: bool,
    ) -> Self {
        Self {
            id: user.id,
            username: user.username.clone(),
            role: user.role.as_ref().map(|r| r.name.clone()),
            confirmed: user.confirmed,
            name: user.name.clone(),
            location: user.location.clone(),
            about_me: user.about_me.clone(),
            member_since: user.member_since,
            last_seen: user.last_seen,
            followers_count,
            following_count,
            followed_by_you,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct EditProfileRequest {
    pub name: Option<String>,
    pub location: Option<String>,
    pub about_me: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AdminEditProfileRequest {
    pub email: Option<String>,
    pub username: Option<String>,
    pub confirmed: Option<bool>,
    pub role: Option<String>,
    pub name: Option<String>,
    pub location: Option<String>,
    pub about_me: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct FollowResponse {
    pub following: bool,
}

// -- Posts --

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PostBodyRequest {
    pub body: String,
}

#[derive(Debug, Serialize)]
pub struct PostDetail {
    #[serde(flatten)]
    pub post: Post,
    pub comments: Vec<Comment>,
    pub comments_count: u64,
    pub comment_pages: u32,
}

// -- Comments --

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CommentBodyRequest {
    pub body: String,
}

#[derive(Debug, Serialize)]
pub struct ModerationResponse {
    pub id: Uuid,
    pub disabled: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn requests_reject_unknown_fields() {
        let ok: Result<PostBodyRequest, _> = serde_json::from_str(r#"{"body": "hi"}"#);
        assert!(ok.is_ok());
        let extra: Result<PostBodyRequest, _> =
            serde_json::from_str(r#"{"body": "hi", "author_id": "x"}"#);
        assert!(extra.is_err());
    }

    #[test]
    fn post_detail_flattens_the_post() {
        let detail = PostDetail {
            post: Post {
                id: Uuid::new_v4(),
                body: "hello".into(),
                timestamp: Utc::now(),
                author_id: Uuid::new_v4(),
                author_username: "alice".into(),
            },
            comments: vec![],
            comments_count: 0,
            comment_pages: 0,
        };
        let json = serde_json::to_value(&detail).unwrap();
        assert_eq!(json["body"], "hello");
        assert_eq!(json["author_username"], "alice");
        assert!(json["comments"].as_array().unwrap().is_empty());
    }
}

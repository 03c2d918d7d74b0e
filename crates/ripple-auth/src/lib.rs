//! Credentials for Ripple: Argon2id password hashing and stateless signed
//! tokens for email confirmation and bearer authentication.

pub mod password;
pub mod tokens;

pub use tokens::{TokenKind, TokenService};

#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("password hashing failed: {0}")]
    Hash(String),

    #[error("token signing failed: {0}")]
    Sign(String),

    #[error("invalid signing secret")]
    Key,
}

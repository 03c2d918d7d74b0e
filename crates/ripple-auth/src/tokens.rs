use chrono::{DateTime, Duration, Utc};
use hmac::{Hmac, Mac};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize, de::DeserializeOwned};
use sha2::Sha256;
use tracing::debug;
use uuid::Uuid;

use crate::AuthError;

pub const DEFAULT_CONFIRMATION_TTL_SECS: u64 = 3600;
pub const DEFAULT_AUTH_TTL_SECS: u64 = 216_000;

/// Token namespaces. Each kind signs with its own derived key and carries its
/// namespace as the audience, so one kind never verifies as another.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    Confirmation,
    Auth,
}

impl TokenKind {
    pub fn namespace(self) -> &'static str {
        match self {
            Self::Confirmation => "confirm",
            Self::Auth => "auth",
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct Envelope<P> {
    #[serde(flatten)]
    payload: P,
    aud: String,
    iat: i64,
    exp: i64,
}

#[derive(Debug, Serialize, Deserialize)]
struct ConfirmPayload {
    confirm: Uuid,
}

#[derive(Debug, Serialize, Deserialize)]
struct AuthPayload {
    id: Uuid,
}

#[derive(Clone)]
struct NamespaceKeys {
    encoding: EncodingKey,
    decoding: DecodingKey,
}

impl NamespaceKeys {
    fn derive(secret: &[u8], kind: TokenKind) -> Result<Self, AuthError> {
        let mut mac = Hmac::<Sha256>::new_from_slice(secret).map_err(|_| AuthError::Key)?;
        mac.update(kind.namespace().as_bytes());
        let key = mac.finalize().into_bytes();
        Ok(Self {
            encoding: EncodingKey::from_secret(&key),
            decoding: DecodingKey::from_secret(&key),
        })
    }
}

/// Stateless signed, expiring tokens. Nothing is stored server side, so there
/// is no revocation: a token stays valid until `exp`.
#[derive(Clone)]
pub struct TokenService {
    confirmation: NamespaceKeys,
    auth: NamespaceKeys,
    confirmation_ttl: Duration,
    auth_ttl: Duration,
}

impl TokenService {
    pub fn new(secret: &str) -> Result<Self, AuthError> {
        Self::with_ttls(secret, DEFAULT_CONFIRMATION_TTL_SECS, DEFAULT_AUTH_TTL_SECS)
    }

    pub fn with_ttls(
        secret: &str,
        confirmation_ttl_secs: u64,
        auth_ttl_secs: u64,
    ) -> Result<Self, AuthError> {
        if secret.is_empty() {
            return Err(AuthError::Key);
        }
        Ok(Self {
            confirmation: NamespaceKeys::derive(secret.as_bytes(), TokenKind::Confirmation)?,
            auth: NamespaceKeys::derive(secret.as_bytes(), TokenKind::Auth)?,
            confirmation_ttl: seconds(confirmation_ttl_secs),
            auth_ttl: seconds(auth_ttl_secs),
        })
    }

    pub fn auth_ttl_secs(&self) -> u64 {
        u64::try_from(self.auth_ttl.num_seconds()).unwrap_or(0)
    }

    pub fn generate_confirmation_token(&self, user_id: Uuid) -> Result<String, AuthError> {
        self.sign(
            TokenKind::Confirmation,
            ConfirmPayload { confirm: user_id },
            Utc::now(),
            self.confirmation_ttl,
        )
    }

    /// The user id a confirmation token was issued for, if the token is
    /// genuine and unexpired.
    pub fn confirmation_subject(&self, token: &str) -> Option<Uuid> {
        self.verify::<ConfirmPayload>(TokenKind::Confirmation, token)
            .map(|p| p.confirm)
    }

    pub fn generate_auth_token(&self, user_id: Uuid) -> Result<String, AuthError> {
        self.sign(TokenKind::Auth, AuthPayload { id: user_id }, Utc::now(), self.auth_ttl)
    }

    pub fn verify_auth_token(&self, token: &str) -> Option<Uuid> {
        self.verify::<AuthPayload>(TokenKind::Auth, token).map(|p| p.id)
    }

    fn keys(&self, kind: TokenKind) -> &NamespaceKeys {
        match kind {
            TokenKind::Confirmation => &self.confirmation,
            TokenKind::Auth => &self.auth,
        }
    }

    pub fn sign<P: Serialize>(
        &self,
        kind: TokenKind,
        payload: P,
        issued_at: DateTime<Utc>,
        ttl: Duration,
    ) -> Result<String, AuthError> {
        let envelope = Envelope {
            payload,
            aud: kind.namespace().to_string(),
            iat: issued_at.timestamp(),
            exp: (issued_at + ttl).timestamp(),
        };
        encode(&Header::new(Algorithm::HS256), &envelope, &self.keys(kind).encoding)
            .map_err(|e| AuthError::Sign(e.to_string()))
    }

    /// Every failure (bad encoding, bad signature, wrong namespace, expiry)
    /// collapses into `None`.
    pub fn verify<P: DeserializeOwned>(&self, kind: TokenKind, token: &str) -> Option<P> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;
        validation.set_audience(&[kind.namespace()]);
        validation.set_required_spec_claims(&["exp", "aud"]);

        match decode::<Envelope<P>>(token, &self.keys(kind).decoding, &validation) {
            Ok(data) => Some(data.claims.payload),
            Err(e) => {
                debug!("Rejected {} token: {}", kind.namespace(), e);
                None
            }
        }
    }
}

/// Lifetimes are capped at ten years.
const MAX_TTL_SECS: u64 = 10 * 365 * 24 * 3600;

fn seconds(secs: u64) -> Duration {
    Duration::seconds(secs.min(MAX_TTL_SECS) as i64)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn service() -> TokenService {
        TokenService::new("test-secret").unwrap()
    }

    #[test]
    fn confirmation_token_round_trip() {
        let tokens = service();
        let user = Uuid::new_v4();
        let token = tokens.generate_confirmation_token(user).unwrap();
        assert_eq!(tokens.confirmation_subject(&token), Some(user));
    }

    #[test]
    fn auth_token_round_trip() {
        let tokens = service();
        let user = Uuid::new_v4();
        let token = tokens.generate_auth_token(user).unwrap();
        assert_eq!(tokens.verify_auth_token(&token), Some(user));
    }

    #[test]
    fn token_kinds_are_not_interchangeable() {
        let tokens = service();
        let user = Uuid::new_v4();
        let confirm = tokens.generate_confirmation_token(user).unwrap();
        let auth = tokens.generate_auth_token(user).unwrap();
        assert_eq!(tokens.verify_auth_token(&confirm), None);
        assert_eq!(tokens.confirmation_subject(&auth), None);
    }

    #[test]
    fn flipping_any_byte_invalidates_auth_token() {
        let tokens = service();
        let token = tokens.generate_auth_token(Uuid::new_v4()).unwrap();
        let bytes = token.as_bytes();
        for i in 0..bytes.len() {
            let mut tampered = bytes.to_vec();
            tampered[i] ^= 0x01;
            let tampered = String::from_utf8_lossy(&tampered).into_owned();
            assert_eq!(tokens.verify_auth_token(&tampered), None, "byte {i} flipped");
        }
    }

    #[test]
    fn expired_token_is_rejected() {
        let tokens = service();
        let user = Uuid::new_v4();
        let issued = Utc::now() - Duration::seconds(7200);
        let token = tokens
            .sign(TokenKind::Auth, AuthPayload { id: user }, issued, Duration::seconds(3600))
            .unwrap();
        assert_eq!(tokens.verify_auth_token(&token), None);
    }

    #[test]
    fn other_secret_is_rejected() {
        let a = TokenService::new("secret-a").unwrap();
        let b = TokenService::new("secret-b").unwrap();
        let token = a.generate_auth_token(Uuid::new_v4()).unwrap();
        assert_eq!(b.verify_auth_token(&token), None);
    }

    #[test]
    fn garbage_is_rejected() {
        let tokens = service();
        assert_eq!(tokens.verify_auth_token(""), None);
        assert_eq!(tokens.verify_auth_token("a.b.c"), None);
    }

    #[test]
    fn empty_secret_is_refused() {
        assert!(TokenService::new("").is_err());
    }

    #[test]
    fn default_auth_ttl_is_sixty_hours() {
        assert_eq!(service().auth_ttl_secs(), 216_000);
    }
}

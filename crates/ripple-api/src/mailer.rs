use ripple_types::models::User;
use tracing::info;

/// Outbound account mail. Delivery is someone else's job; the server only
/// hands over the token.
pub trait Mailer: Send + Sync {
    fn send_confirmation(&self, user: &User, token: &str);
}

/// Writes confirmation tokens to the log instead of sending mail.
pub struct LogMailer;

impl Mailer for LogMailer {
    fn send_confirmation(&self, user: &User, token: &str) {
        info!(
            "Confirmation for {} <{}>: GET /auth/confirm/{}",
            user.username, user.email, token
        );
    }
}

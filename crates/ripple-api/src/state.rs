use std::sync::Arc;

use ripple_auth::TokenService;
use ripple_db::Database;
use ripple_types::pagination::{PageQuery, PageRequest};
use tracing::error;

use crate::error::ApiError;
use crate::mailer::Mailer;

pub type AppState = Arc<AppStateInner>;

pub struct AppStateInner {
    pub db: Database,
    pub tokens: TokenService,
    pub mailer: Arc<dyn Mailer>,
    pub settings: Settings,
}

/// Request-independent knobs the handlers read.
#[derive(Debug, Clone)]
pub struct Settings {
    /// Registrations with this email get the Administrator role.
    pub admin_email: Option<String>,
    pub posts_per_page: u32,
    pub followers_per_page: u32,
    pub comments_per_page: u32,
    pub max_comment_len: usize,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            admin_email: None,
            posts_per_page: 20,
            followers_per_page: 50,
            comments_per_page: 30,
            max_comment_len: 500,
        }
    }
}

impl Settings {
    pub fn posts_page(&self, query: &PageQuery) -> PageRequest {
        PageRequest::new(query.page(), self.posts_per_page)
    }

    pub fn followers_page(&self, query: &PageQuery) -> PageRequest {
        PageRequest::new(query.page(), self.followers_per_page)
    }

    pub fn comments_page(&self, query: &PageQuery) -> PageRequest {
        PageRequest::new(query.page(), self.comments_per_page)
    }
}

/// Run blocking DB work off the async runtime.
pub async fn run_db<F, T>(state: &AppState, f: F) -> Result<T, ApiError>
where
    F: FnOnce(&Database) -> ripple_db::Result<T> + Send + 'static,
    T: Send + 'static,
{
    let state = state.clone();
    tokio::task::spawn_blocking(move || f(&state.db))
        .await
        .map_err(|e| {
            error!("spawn_blocking join error: {}", e);
            ApiError::Internal
        })?
        .map_err(ApiError::from)
}

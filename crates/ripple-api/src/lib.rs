pub mod auth;
pub mod comments;
pub mod error;
pub mod extract;
pub mod mailer;
pub mod middleware;
pub mod posts;
pub mod routes;
pub mod state;
pub mod users;

pub use routes::router;
pub use state::{AppState, AppStateInner, Settings};

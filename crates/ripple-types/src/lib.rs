pub mod api;
pub mod models;
pub mod pagination;
pub mod permissions;

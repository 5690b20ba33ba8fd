pub mod auth;
pub mod cache;
pub mod comments;
pub mod error;
pub mod follows;
pub mod forms;
pub mod listings;
pub mod media;
pub mod middleware;
pub mod pagination;
pub mod posts;
pub mod routes;
pub mod state;
pub mod views;

pub use routes::router;
pub use state::{AppState, AppStateInner, CacheTtl};

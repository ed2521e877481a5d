pub mod dto;
pub mod fields;
pub mod filter;
pub mod handlers;
pub mod query;
pub mod repo;
pub mod repo_types;
pub mod service;
pub mod store;

use crate::state::AppState;
use axum::Router;

pub fn router() -> Router<AppState> {
    Router::new()
        .merge(handlers::account_routes())
        .merge(handlers::user_routes())
}

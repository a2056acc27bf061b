use axum::{Router, http::Method, routing::get};
use tower_http::cors::{Any, CorsLayer};

pub mod auth;
pub mod bookmarks;
pub mod config;
pub mod db;
pub mod error;
pub mod handler;
pub mod identity;
pub mod import;
pub mod interactions;
pub mod lang;
pub mod metadata;
pub mod model;
pub mod views;

#[cfg(test)]
pub(crate) mod testing;

use handler::{AppState, get_metadata, healthcheck, localize};

pub fn router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers(Any);

    Router::new()
        .route("/", get(healthcheck))
        .route("/metadata", get(get_metadata))
        .nest("/auth", auth::routes())
        .merge(bookmarks::routes())
        .merge(interactions::routes())
        .fallback(localize)
        .layer(cors)
        .with_state(state)
}

use axum::{
    Router,
    routing::{get, post},
};

use super::handler;
use crate::handler::AppState;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/interactions", get(handler::get_interactions))
        .route("/bookmarks/:id/like", post(handler::toggle_like))
        .route("/bookmarks/:id/favorite", post(handler::toggle_favorite))
}

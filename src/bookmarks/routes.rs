use axum::{
    Router,
    routing::{get, post, put},
};

use super::handler;
use crate::handler::AppState;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/bookmarks", get(handler::list_bookmarks))
        .route("/bookmarks", post(handler::create_bookmark))
        .route("/bookmarks/stats", get(handler::get_stats))
        .route("/bookmarks/:id", put(handler::update_bookmark).delete(handler::delete_bookmark))
        .route("/bookmarks/:id/pin", post(handler::toggle_pin))
        .route("/tags/popular", get(handler::get_popular_tags))
        .route("/import", post(handler::import_bookmarks))
}

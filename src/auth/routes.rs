use axum::{
    Router,
    routing::{get, post},
};

use super::handler;
use crate::handler::AppState;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/signup", post(handler::sign_up))
        .route("/signin", post(handler::sign_in))
        .route("/signout", post(handler::sign_out))
        .route("/session", get(handler::current_session))
}

use axum::{
    Json,
    extract::State,
    response::{IntoResponse, Response},
};
use serde::Serialize;

use super::{Auth, Credentials, User};
use crate::handler::{AppState, created, success};
use crate::identity::Caller;
use crate::lang::Language;

/// Who the request is acting as.
#[derive(Debug, Serialize)]
pub struct Identity {
    pub user: Option<User>,
    pub is_admin: bool,
    pub anonymous_id: Option<String>,
    pub language: Language,
}

#[derive(Debug, Serialize)]
pub struct SignedOut {
    pub signed_out: bool,
}

pub async fn sign_up(State(state): State<AppState>, Json(payload): Json<Credentials>) -> Response {
    let auth = Auth::new(state.db.connection(), state.session_ttl_hours);

    match auth.sign_up(payload).await {
        Ok(session) => created(session),
        Err(e) => e.into_response(),
    }
}

pub async fn sign_in(State(state): State<AppState>, Json(payload): Json<Credentials>) -> Response {
    let auth = Auth::new(state.db.connection(), state.session_ttl_hours);

    match auth.sign_in(payload).await {
        Ok(session) => success(session),
        Err(e) => e.into_response(),
    }
}

pub async fn sign_out(State(state): State<AppState>, caller: Caller) -> Response {
    let session = match caller.require_user() {
        Ok(session) => session,
        Err(e) => return e.into_response(),
    };
    let auth = Auth::new(state.db.connection(), state.session_ttl_hours);

    match auth.sign_out(&session.token).await {
        Ok(signed_out) => {
            tracing::info!(user_id = %session.user.id, "user signed out");
            success(SignedOut { signed_out })
        }
        Err(e) => {
            tracing::error!("Failed to sign out: {}", e);
            crate::error::AppError::from(e).into_response()
        }
    }
}

pub async fn current_session(caller: Caller) -> Response {
    let is_admin = caller.is_admin();
    success(Identity {
        user: caller.session.map(|s| s.user),
        is_admin,
        anonymous_id: caller.anonymous_id,
        language: caller.language,
    })
}

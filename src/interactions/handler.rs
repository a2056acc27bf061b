use axum::{
    extract::{Path, State},
    response::{IntoResponse, Response},
};
use serde::Serialize;

use super::{InteractionBoard, Toggled};
use crate::handler::{AppState, success};
use crate::identity::Caller;

#[derive(Debug, Serialize)]
pub struct LikeResponse {
    #[serde(flatten)]
    pub toggled: Toggled,
    /// Echoed back for anonymous callers so the client keeps sending it.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub anonymous_id: Option<String>,
}

pub async fn get_interactions(State(state): State<AppState>, caller: Caller) -> Response {
    match InteractionBoard::load(&state.db, &caller).await {
        Ok(board) => success(board),
        Err(e) => {
            tracing::error!("Failed to load interactions: {}", e);
            e.into_response()
        }
    }
}

pub async fn toggle_like(State(state): State<AppState>, mut caller: Caller, Path(id): Path<String>) -> Response {
    let mut board = match InteractionBoard::load(&state.db, &caller).await {
        Ok(board) => board,
        Err(e) => return e.into_response(),
    };

    match board.toggle_like(&state.db, &mut caller, &id).await {
        Ok(toggled) => {
            let anonymous_id = match caller.session {
                Some(_) => None,
                None => caller.anonymous_id,
            };
            success(LikeResponse { toggled, anonymous_id })
        }
        Err(e) => e.into_response(),
    }
}

pub async fn toggle_favorite(State(state): State<AppState>, caller: Caller, Path(id): Path<String>) -> Response {
    let mut board = match InteractionBoard::load(&state.db, &caller).await {
        Ok(board) => board,
        Err(e) => return e.into_response(),
    };

    match board.toggle_favorite(&state.db, &caller, &id).await {
        Ok(toggled) => success(toggled),
        Err(e) => e.into_response(),
    }
}

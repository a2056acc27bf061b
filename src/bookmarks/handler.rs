use axum::{
    Json,
    extract::{Path, Query, State},
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};

use super::{BookmarkBoard, Bookmarks, Scope, Snapshot, ViewKind};
use crate::error::AppError;
use crate::handler::{AppState, created, success};
use crate::identity::Caller;
use crate::import;
use crate::interactions::InteractionBoard;
use crate::model::BookmarkInput;
use crate::views;

/// `lang` is read by the [`Caller`] extractor.
#[derive(Debug, Deserialize)]
pub struct ListParams {
    pub tag: Option<String>,
    pub q: Option<String>,
    pub view: Option<ViewKind>,
}

/// Result of a mutation together with the refreshed board.
#[derive(Debug, Serialize)]
pub struct Mutation<T> {
    pub result: T,
    #[serde(flatten)]
    pub snapshot: Snapshot,
}

fn scope_for(caller: &Caller, tag: Option<String>) -> Scope {
    match tag.map(|t| t.trim().to_string()).filter(|t| !t.is_empty()) {
        Some(tag) => Scope::tag(caller.language, tag),
        None => Scope::language(caller.language),
    }
}

pub async fn list_bookmarks(
    State(state): State<AppState>,
    caller: Caller,
    Query(params): Query<ListParams>,
) -> Result<Response, AppError> {
    let scope = scope_for(&caller, params.tag);
    let board = BookmarkBoard::load(&state.db, &caller, scope).await?;
    let interactions = InteractionBoard::load(&state.db, &caller).await?;

    let view = params.view.unwrap_or_else(|| ViewKind::default_for(&caller));
    let listing = board.listing(view, &interactions, params.q.as_deref().unwrap_or(""));

    tracing::info!(?view, count = listing.bookmarks.len(), "listed bookmarks");
    Ok(success(listing))
}

pub async fn create_bookmark(
    State(state): State<AppState>,
    caller: Caller,
    Json(payload): Json<BookmarkInput>,
) -> Result<Response, AppError> {
    let mut board = BookmarkBoard::load(&state.db, &caller, Scope::language(caller.language)).await?;
    let bookmark = board.add(payload).await?;

    Ok(created(Mutation {
        result: bookmark,
        snapshot: board.snapshot(),
    }))
}

pub async fn update_bookmark(
    State(state): State<AppState>,
    caller: Caller,
    Path(id): Path<String>,
    Json(payload): Json<BookmarkInput>,
) -> Result<Response, AppError> {
    let mut board = BookmarkBoard::load(&state.db, &caller, Scope::language(caller.language)).await?;
    let bookmark = board.update(&id, payload).await?;

    Ok(success(Mutation {
        result: bookmark,
        snapshot: board.snapshot(),
    }))
}

pub async fn delete_bookmark(
    State(state): State<AppState>,
    caller: Caller,
    Path(id): Path<String>,
) -> Result<Response, AppError> {
    let mut board = BookmarkBoard::load(&state.db, &caller, Scope::language(caller.language)).await?;
    board.delete(&id).await?;

    Ok(success(board.snapshot()))
}

pub async fn toggle_pin(State(state): State<AppState>, caller: Caller, Path(id): Path<String>) -> Result<Response, AppError> {
    let mut board = BookmarkBoard::load(&state.db, &caller, Scope::language(caller.language)).await?;
    let pinned = board.toggle_pin(&id).await?;

    Ok(success(Mutation {
        result: pinned,
        snapshot: board.snapshot(),
    }))
}

pub async fn get_stats(State(state): State<AppState>, caller: Caller) -> Response {
    match Bookmarks::new(&state.db).language_stats(caller.user_id()).await {
        Ok(stats) => success(stats),
        Err(e) => {
            tracing::error!("Failed to get language stats: {}", e);
            AppError::from(e).into_response()
        }
    }
}

pub async fn get_popular_tags(State(state): State<AppState>, caller: Caller) -> Response {
    match BookmarkBoard::load(&state.db, &caller, Scope::language(caller.language)).await {
        Ok(board) => success(views::popular_tags(board.list(), caller.language)),
        Err(e) => e.into_response(),
    }
}

/// Takes the raw Chrome export as the request body.
pub async fn import_bookmarks(State(state): State<AppState>, caller: Caller, body: String) -> Result<Response, AppError> {
    caller.require_user()?;
    let inputs = import::parse_chrome(&body)?;

    let mut board = BookmarkBoard::load(&state.db, &caller, Scope::language(caller.language)).await?;
    let report = board.import(inputs).await?;

    tracing::info!(imported = report.imported, failed = report.failed, "bookmark import finished");
    Ok(success(report))
}

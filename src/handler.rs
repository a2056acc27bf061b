use std::sync::Arc;

use axum::{
    Json,
    extract::{Query, State},
    http::{StatusCode, Uri, header},
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};

use tracing::info;

use crate::db::Database;
use crate::error::{AppError, ErrorResponse};
use crate::lang;
use crate::metadata::MetadataClient;

#[derive(Clone)]
pub struct AppState {
    pub db: Arc<Database>,
    pub metadata: Arc<MetadataClient>,
    pub session_ttl_hours: i64,
}

#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub data: T,
}

pub fn success<T: Serialize>(data: T) -> Response {
    (StatusCode::OK, Json(ApiResponse { data })).into_response()
}

pub fn created<T: Serialize>(data: T) -> Response {
    (StatusCode::CREATED, Json(ApiResponse { data })).into_response()
}

#[derive(Debug, Deserialize)]
pub struct MetadataParams {
    pub url: Option<String>,
}

pub async fn healthcheck() -> impl IntoResponse {
    info!("got healthcheck request");
    success("ok")
}

pub async fn get_metadata(State(state): State<AppState>, Query(params): Query<MetadataParams>) -> Response {
    let url = params.url.unwrap_or_default();

    match state.metadata.fetch(&url).await {
        Ok(metadata) => {
            info!(url = %url, "fetched metadata");
            success(metadata)
        }
        Err(e) => {
            tracing::warn!(url = %url, error = %e, "failed to fetch metadata");
            e.into_response()
        }
    }
}

/// Unknown paths under a two-letter prefix that is not a supported language
/// are sent to the fallback language; everything else is a 404.
pub async fn localize(uri: Uri) -> Response {
    if let Some(target) = lang::redirect_for(uri.path()) {
        let target = match uri.query() {
            Some(query) => format!("{}?{}", target, query),
            None => target,
        };
        info!(from = %uri.path(), to = %target, "redirecting unsupported language prefix");
        return (StatusCode::PERMANENT_REDIRECT, [(header::LOCATION, target)]).into_response();
    }

    (
        StatusCode::NOT_FOUND,
        Json(ErrorResponse {
            error: AppError::NotFound.to_string(),
        }),
    )
        .into_response()
}

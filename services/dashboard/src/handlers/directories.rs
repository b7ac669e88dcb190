//! Directory validation for reading data in place.

use std::path::PathBuf;
use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, Extension},
    Json,
};
use serde::Deserialize;

use crate::handlers::error::ApiResult;
use crate::state::AppState;
use crate::store::DirectoryListing;

#[derive(Debug, Deserialize)]
pub struct ValidateDirectoryRequest {
    pub path: PathBuf,
}

/// POST /api/directories/validate
pub async fn validate_directory_handler(
    Extension(state): Extension<Arc<AppState>>,
    request: Result<Json<ValidateDirectoryRequest>, JsonRejection>,
) -> ApiResult<Json<DirectoryListing>> {
    let Json(request) = request?;
    let listing = state.store.validate_directory(&request.path).await?;
    Ok(Json(listing))
}

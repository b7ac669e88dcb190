//! Upload, list and delete handlers for data files and scripts.

use std::sync::Arc;

use axum::{
    extract::{Extension, Multipart, Path},
    Json,
};
use metrics::counter;
use monitor_common::{FileKind, MonitorError};
use serde::Serialize;

use crate::handlers::error::{ApiError, ApiResult};
use crate::state::AppState;
use crate::store::StoredFile;

/// Multipart field carrying the uploaded file.
const FILE_FIELD: &str = "file";

#[derive(Debug, Serialize)]
pub struct UploadResponse {
    pub success: bool,
    pub message: String,
    pub file: StoredFile,
}

#[derive(Debug, Serialize)]
pub struct DeleteResponse {
    pub success: bool,
    pub message: String,
}

#[derive(Debug, Serialize)]
pub struct FileListResponse {
    pub kind: FileKind,
    pub files: Vec<StoredFile>,
}

/// GET /api/data
pub async fn list_data_handler(
    Extension(state): Extension<Arc<AppState>>,
) -> ApiResult<Json<FileListResponse>> {
    list(&state, FileKind::Data).await
}

/// POST /api/data
pub async fn upload_data_handler(
    Extension(state): Extension<Arc<AppState>>,
    multipart: Multipart,
) -> ApiResult<Json<UploadResponse>> {
    upload(&state, FileKind::Data, multipart).await
}

/// DELETE /api/data/:name
pub async fn delete_data_handler(
    Extension(state): Extension<Arc<AppState>>,
    Path(name): Path<String>,
) -> ApiResult<Json<DeleteResponse>> {
    delete(&state, FileKind::Data, &name).await
}

/// GET /api/scripts
pub async fn list_scripts_handler(
    Extension(state): Extension<Arc<AppState>>,
) -> ApiResult<Json<FileListResponse>> {
    list(&state, FileKind::Script).await
}

/// POST /api/scripts
pub async fn upload_script_handler(
    Extension(state): Extension<Arc<AppState>>,
    multipart: Multipart,
) -> ApiResult<Json<UploadResponse>> {
    upload(&state, FileKind::Script, multipart).await
}

/// DELETE /api/scripts/:name
pub async fn delete_script_handler(
    Extension(state): Extension<Arc<AppState>>,
    Path(name): Path<String>,
) -> ApiResult<Json<DeleteResponse>> {
    delete(&state, FileKind::Script, &name).await
}

async fn list(state: &AppState, kind: FileKind) -> ApiResult<Json<FileListResponse>> {
    let files = state.store.list(kind).await?;
    Ok(Json(FileListResponse { kind, files }))
}

async fn upload(
    state: &AppState,
    kind: FileKind,
    mut multipart: Multipart,
) -> ApiResult<Json<UploadResponse>> {
    let limit = state.store.max_upload_bytes();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::from_multipart(e, limit))?
    {
        if field.name() != Some(FILE_FIELD) {
            continue;
        }
        let name = field
            .file_name()
            .map(str::to_string)
            .ok_or_else(|| MonitorError::MissingField("file name".to_string()))?;
        let bytes = field
            .bytes()
            .await
            .map_err(|e| ApiError::from_multipart(e, limit))?;

        let file = state.store.save(kind, &name, &bytes).await?;
        counter!("dashboard_uploads_total", "kind" => kind.as_str()).increment(1);

        return Ok(Json(UploadResponse {
            success: true,
            message: format!("Uploaded {}: {}", kind.label().to_lowercase(), file.name),
            file,
        }));
    }

    Err(MonitorError::MissingField(FILE_FIELD.to_string()).into())
}

async fn delete(state: &AppState, kind: FileKind, name: &str) -> ApiResult<Json<DeleteResponse>> {
    state.store.delete(kind, name).await?;
    counter!("dashboard_deletes_total", "kind" => kind.as_str()).increment(1);

    Ok(Json(DeleteResponse {
        success: true,
        message: format!("Deleted {}: {}", kind.label().to_lowercase(), name),
    }))
}

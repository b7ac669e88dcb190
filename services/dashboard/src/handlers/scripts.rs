//! Script execution handler.

use std::path::{Path as FsPath, PathBuf};
use std::sync::Arc;

use axum::{
    extract::{Extension, Path},
    Json,
};
use bytes::Bytes;
use monitor_common::{validate_file_name, FileKind, MonitorError, MonitorResult};
use serde::{Deserialize, Serialize};
use tracing::{error, info};
use uuid::Uuid;

use crate::handlers::error::ApiResult;
use crate::runner::{RunInputs, RunOutcome, RunStatus};
use crate::state::AppState;

/// Optional body for `POST /api/scripts/:name/run`.
#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RunRequest {
    /// Data file names; every available file when empty
    pub data_files: Vec<String>,
    /// Read data from this directory instead of the upload area
    pub data_dir: Option<String>,
    pub ctd_file: Option<String>,
    pub site_file: Option<String>,
    /// Extra command line arguments for the script
    pub args: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct RunResponse {
    pub id: String,
    pub script: String,
    pub success: bool,
    pub message: String,
    #[serde(flatten)]
    pub outcome: RunOutcome,
}

/// POST /api/scripts/:name/run
///
/// A script that fails or times out still yields 200 with `success: false`;
/// errors are reserved for runs that could not be started.
pub async fn run_script_handler(
    Extension(state): Extension<Arc<AppState>>,
    Path(name): Path<String>,
    body: Bytes,
) -> ApiResult<Json<RunResponse>> {
    let script = state.store.resolve(FileKind::Script, &name).await?;
    let request = parse_request(&body)?;
    let inputs = build_inputs(&state, request).await?;

    let id = Uuid::new_v4().to_string();
    info!(
        id = %id,
        script = %name,
        data_files = inputs.data_files.len(),
        "Received run request"
    );
    state.tracker.start(&id, &name).await;

    let outcome = match state.runner.run(&script, &inputs).await {
        Ok(outcome) => outcome,
        Err(e) => {
            error!(id = %id, script = %name, error = %e, "Script could not be run");
            state.tracker.fail(&id, &e.to_string()).await;
            return Err(e.into());
        }
    };
    state.tracker.complete(&id, &outcome).await;

    Ok(Json(RunResponse {
        id,
        script: name,
        success: outcome.success(),
        message: run_message(&outcome, state.config.runner.timeout_secs),
        outcome,
    }))
}

fn parse_request(body: &[u8]) -> MonitorResult<RunRequest> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(RunRequest::default());
    }
    serde_json::from_slice(body).map_err(|e| MonitorError::InvalidRequest(e.to_string()))
}

fn run_message(outcome: &RunOutcome, timeout_secs: u64) -> String {
    match outcome.status {
        RunStatus::Succeeded => "Script executed successfully!".to_string(),
        RunStatus::Failed => match outcome.exit_code {
            Some(code) => format!("Error running script: exited with status {}", code),
            None => "Error running script: terminated by a signal".to_string(),
        },
        RunStatus::TimedOut => format!("Script timed out after {} seconds", timeout_secs),
    }
}

/// Resolve the request's file names to absolute paths.
async fn build_inputs(state: &AppState, request: RunRequest) -> MonitorResult<RunInputs> {
    let (data_dir, available): (PathBuf, Vec<String>) = match &request.data_dir {
        Some(dir) => {
            let listing = state.store.validate_directory(FsPath::new(dir)).await?;
            let names = listing.files.into_iter().map(|f| f.name).collect();
            (listing.path, names)
        }
        None => {
            let names = state
                .store
                .list(FileKind::Data)
                .await?
                .into_iter()
                .map(|f| f.name)
                .collect();
            (state.store.dir(FileKind::Data), names)
        }
    };

    let resolver = InputResolver {
        dir: &data_dir,
        available: &available,
    };

    let data_files = if request.data_files.is_empty() {
        available.iter().map(|name| data_dir.join(name)).collect()
    } else {
        request
            .data_files
            .iter()
            .map(|name| resolver.resolve(name))
            .collect::<MonitorResult<Vec<_>>>()?
    };
    let ctd_file = request
        .ctd_file
        .as_deref()
        .map(|name| resolver.resolve(name))
        .transpose()?;
    let site_file = request
        .site_file
        .as_deref()
        .map(|name| resolver.resolve(name))
        .transpose()?;

    Ok(RunInputs {
        data_dir,
        data_files,
        ctd_file,
        site_file,
        args: request.args,
    })
}

struct InputResolver<'a> {
    dir: &'a FsPath,
    /// Names in listing order
    available: &'a [String],
}

impl InputResolver<'_> {
    fn resolve(&self, name: &str) -> MonitorResult<PathBuf> {
        let not_found = || MonitorError::NotFound(format!("Data file {} not found.", name));
        let name = validate_file_name(name).map_err(|_| not_found())?;
        if self.available.iter().any(|n| n == name) {
            Ok(self.dir.join(name))
        } else {
            Err(not_found())
        }
    }
}

//! Runs uploaded scripts as child processes.
//!
//! The script is started as `<interpreter> <script> [args...]` from the
//! storage root. Data locations are handed over through environment
//! variables:
//!
//! | Variable     | Value                                               |
//! |--------------|-----------------------------------------------------|
//! | `DATA_DIR`   | directory holding the data files                    |
//! | `DATA_FILES` | selected data files, joined with the path separator |
//! | `DATA_FILE`  | first selected data file                            |
//! | `CTD_FILE`   | CTD cast input, when given                          |
//! | `SITE_FILE`  | site metadata input, when given                     |
//!
//! Variables without a value are removed from the child's environment so
//! a stale value inherited from the server never leaks into a run.

use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use metrics::{counter, histogram};
use monitor_common::{MonitorError, MonitorResult};
use serde::Serialize;
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::process::Command;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::config::RunnerConfig;

/// How long to keep reading output after the script has exited.
///
/// A background child of the script can hold the pipes open indefinitely.
const OUTPUT_GRACE: Duration = Duration::from_secs(2);

const READ_CHUNK: usize = 8192;

/// Inputs for a single run.
#[derive(Debug, Clone, Default)]
pub struct RunInputs {
    pub data_dir: PathBuf,
    pub data_files: Vec<PathBuf>,
    pub ctd_file: Option<PathBuf>,
    pub site_file: Option<PathBuf>,
    pub args: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    Succeeded,
    Failed,
    TimedOut,
}

impl RunStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RunStatus::Succeeded => "succeeded",
            RunStatus::Failed => "failed",
            RunStatus::TimedOut => "timed_out",
        }
    }
}

/// Result of a finished run.
#[derive(Debug, Clone, Serialize)]
pub struct RunOutcome {
    pub status: RunStatus,
    /// Absent when the process was ended by a signal
    pub exit_code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
    pub stdout_truncated: bool,
    pub stderr_truncated: bool,
    pub duration_ms: u64,
}

impl RunOutcome {
    pub fn success(&self) -> bool {
        self.status == RunStatus::Succeeded
    }
}

/// Executes scripts with a fixed interpreter and limits.
#[derive(Debug, Clone)]
pub struct ScriptRunner {
    interpreter: String,
    timeout: Option<Duration>,
    max_output_bytes: usize,
    working_dir: PathBuf,
}

impl ScriptRunner {
    pub fn new(config: &RunnerConfig, working_dir: impl Into<PathBuf>) -> Self {
        let timeout = (config.timeout_secs > 0).then(|| Duration::from_secs(config.timeout_secs));
        Self::with_settings(
            config.interpreter.clone(),
            timeout,
            config.max_output_bytes,
            working_dir,
        )
    }

    pub fn with_settings(
        interpreter: impl Into<String>,
        timeout: Option<Duration>,
        max_output_bytes: usize,
        working_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            interpreter: interpreter.into(),
            timeout,
            max_output_bytes,
            working_dir: working_dir.into(),
        }
    }

    pub fn interpreter(&self) -> &str {
        &self.interpreter
    }

    /// Run `script` to completion (or until the timeout) and capture its output.
    pub async fn run(&self, script: &Path, inputs: &RunInputs) -> MonitorResult<RunOutcome> {
        let mut command = self.command(script, inputs)?;

        let started = Instant::now();
        let mut child = command.spawn().map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                MonitorError::InterpreterNotFound(self.interpreter.clone())
            } else {
                MonitorError::ExecutionFailed(e.to_string())
            }
        })?;

        info!(
            script = %script.display(),
            interpreter = %self.interpreter,
            pid = ?child.id(),
            "Started script"
        );

        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| MonitorError::ExecutionFailed("stdout was not captured".to_string()))?;
        let stderr = child
            .stderr
            .take()
            .ok_or_else(|| MonitorError::ExecutionFailed("stderr was not captured".to_string()))?;

        let stdout_buf = Arc::new(Mutex::new(Captured::default()));
        let stderr_buf = Arc::new(Mutex::new(Captured::default()));
        let stdout_task = spawn_reader(stdout, Arc::clone(&stdout_buf), self.max_output_bytes);
        let stderr_task = spawn_reader(stderr, Arc::clone(&stderr_buf), self.max_output_bytes);

        let exit = match self.timeout {
            Some(limit) => {
                let waited = tokio::time::timeout(limit, child.wait()).await;
                match waited {
                    Ok(result) => Some(result.map_err(|e| MonitorError::ExecutionFailed(e.to_string()))?),
                    Err(_) => {
                        warn!(
                            script = %script.display(),
                            timeout_secs = limit.as_secs(),
                            "Script timed out, killing"
                        );
                        if let Err(e) = child.kill().await {
                            warn!(error = %e, "Failed to kill timed out script");
                        }
                        None
                    }
                }
            }
            None => Some(
                child
                    .wait()
                    .await
                    .map_err(|e| MonitorError::ExecutionFailed(e.to_string()))?,
            ),
        };

        finish_reader(stdout_task).await;
        finish_reader(stderr_task).await;
        let duration = started.elapsed();

        let (status, exit_code) = match exit {
            Some(exit) if exit.success() => (RunStatus::Succeeded, exit.code()),
            Some(exit) => (RunStatus::Failed, exit.code()),
            None => (RunStatus::TimedOut, None),
        };

        let stdout = take_captured(&stdout_buf);
        let stderr = take_captured(&stderr_buf);
        let outcome = RunOutcome {
            status,
            exit_code,
            stdout: stdout.text(),
            stderr: stderr.text(),
            stdout_truncated: stdout.truncated,
            stderr_truncated: stderr.truncated,
            duration_ms: duration.as_millis() as u64,
        };

        counter!("dashboard_script_runs_total", "status" => status.as_str()).increment(1);
        histogram!("dashboard_script_duration_seconds").record(duration.as_secs_f64());

        info!(
            script = %script.display(),
            status = status.as_str(),
            exit_code = ?exit_code,
            duration_ms = outcome.duration_ms,
            "Script finished"
        );
        Ok(outcome)
    }

    fn command(&self, script: &Path, inputs: &RunInputs) -> MonitorResult<Command> {
        let mut command = Command::new(&self.interpreter);
        command
            .arg(script)
            .args(&inputs.args)
            .current_dir(&self.working_dir)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let data_files = std::env::join_paths(&inputs.data_files).map_err(|e| {
            MonitorError::InvalidRequest(format!("data file path cannot be passed on: {}", e))
        })?;
        command
            .env("DATA_DIR", &inputs.data_dir)
            .env("DATA_FILES", data_files);

        set_or_remove(&mut command, "DATA_FILE", inputs.data_files.first());
        set_or_remove(&mut command, "CTD_FILE", inputs.ctd_file.as_ref());
        set_or_remove(&mut command, "SITE_FILE", inputs.site_file.as_ref());

        debug!(
            data_dir = %inputs.data_dir.display(),
            data_files = inputs.data_files.len(),
            args = ?inputs.args,
            "Prepared script command"
        );
        Ok(command)
    }
}

fn set_or_remove(command: &mut Command, key: &str, value: Option<&PathBuf>) {
    match value {
        Some(path) => command.env(key, path),
        None => command.env_remove(key),
    };
}

#[derive(Debug, Default)]
struct Captured {
    bytes: Vec<u8>,
    truncated: bool,
}

impl Captured {
    fn text(&self) -> String {
        String::from_utf8_lossy(&self.bytes).into_owned()
    }
}

fn spawn_reader<R>(reader: R, buf: Arc<Mutex<Captured>>, cap: usize) -> JoinHandle<()>
where
    R: AsyncRead + Unpin + Send + 'static,
{
    tokio::spawn(async move {
        if let Err(e) = read_capped(reader, &buf, cap).await {
            warn!(error = %e, "Failed reading script output");
        }
    })
}

/// Read until EOF, keeping at most `cap` bytes. Excess output is drained so
/// the child never blocks on a full pipe.
async fn read_capped<R: AsyncRead + Unpin>(
    mut reader: R,
    buf: &Mutex<Captured>,
    cap: usize,
) -> std::io::Result<()> {
    let mut chunk = [0u8; READ_CHUNK];
    loop {
        let n = reader.read(&mut chunk).await?;
        if n == 0 {
            return Ok(());
        }
        let mut captured = buf.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        let room = cap.saturating_sub(captured.bytes.len());
        if n > room {
            captured.bytes.extend_from_slice(&chunk[..room]);
            captured.truncated = true;
        } else {
            captured.bytes.extend_from_slice(&chunk[..n]);
        }
    }
}

async fn finish_reader(mut task: JoinHandle<()>) {
    if tokio::time::timeout(OUTPUT_GRACE, &mut task).await.is_err() {
        warn!("Script output still open after exit, abandoning reader");
        task.abort();
    }
}

fn take_captured(buf: &Mutex<Captured>) -> Captured {
    let mut captured = buf.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
    std::mem::take(&mut *captured)
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_utils::fixtures::{ECHO_ENV_SCRIPT, FAILING_SCRIPT};
    use test_utils::{temp_test_dir, write_fixture};

    fn sh_runner(dir: &Path, timeout: Option<Duration>, cap: usize) -> ScriptRunner {
        ScriptRunner::with_settings("sh", timeout, cap, dir)
    }

    #[tokio::test]
    async fn test_environment_is_passed() {
        let tmp = temp_test_dir();
        let script = write_fixture(tmp.path(), "echo_env.sh", ECHO_ENV_SCRIPT);
        let cast = tmp.path().join("cast.csv");

        let inputs = RunInputs {
            data_dir: tmp.path().to_path_buf(),
            data_files: vec![cast.clone()],
            ctd_file: Some(cast.clone()),
            site_file: None,
            args: vec!["--station".to_string(), "STN-01".to_string()],
        };
        let outcome = sh_runner(tmp.path(), Some(Duration::from_secs(10)), 4096)
            .run(&script, &inputs)
            .await
            .unwrap();

        assert!(outcome.success());
        assert_eq!(outcome.exit_code, Some(0));
        assert!(outcome
            .stdout
            .contains(&format!("DATA_DIR={}", tmp.path().display())));
        assert!(outcome.stdout.contains(&format!("DATA_FILE={}", cast.display())));
        assert!(outcome.stdout.contains(&format!("CTD_FILE={}", cast.display())));
        assert!(outcome.stdout.contains("SITE_FILE=\n"));
        assert!(outcome.stdout.contains("ARGS=--station STN-01"));
        assert!(outcome.stderr.is_empty());
    }

    #[tokio::test]
    async fn test_failure_captures_stderr() {
        let tmp = temp_test_dir();
        let script = write_fixture(tmp.path(), "fail.sh", FAILING_SCRIPT);

        let outcome = sh_runner(tmp.path(), None, 4096)
            .run(&script, &RunInputs::default())
            .await
            .unwrap();

        assert_eq!(outcome.status, RunStatus::Failed);
        assert_eq!(outcome.exit_code, Some(3));
        assert_eq!(outcome.stdout, "partial output\n");
        assert!(outcome.stderr.contains("column 'Depth' missing"));
    }

    #[tokio::test]
    async fn test_output_truncated() {
        let tmp = temp_test_dir();
        let script = write_fixture(
            tmp.path(),
            "noisy.sh",
            "i=0\nwhile [ $i -lt 200 ]; do echo 0123456789; i=$((i+1)); done\n",
        );

        let outcome = sh_runner(tmp.path(), Some(Duration::from_secs(10)), 100)
            .run(&script, &RunInputs::default())
            .await
            .unwrap();

        assert!(outcome.success());
        assert_eq!(outcome.stdout.len(), 100);
        assert!(outcome.stdout_truncated);
        assert!(!outcome.stderr_truncated);
    }

    #[tokio::test]
    async fn test_timeout_kills_script() {
        let tmp = temp_test_dir();
        let script = write_fixture(tmp.path(), "slow.sh", "echo started\nexec sleep 5\n");

        let outcome = sh_runner(tmp.path(), Some(Duration::from_millis(300)), 4096)
            .run(&script, &RunInputs::default())
            .await
            .unwrap();

        assert_eq!(outcome.status, RunStatus::TimedOut);
        assert_eq!(outcome.exit_code, None);
        assert!(outcome.duration_ms < 5000);
        assert_eq!(outcome.stdout, "started\n");
    }

    #[tokio::test]
    async fn test_missing_interpreter() {
        let tmp = temp_test_dir();
        let script = write_fixture(tmp.path(), "analysis.py", "print('hi')\n");
        let runner = ScriptRunner::with_settings(
            "definitely-not-an-interpreter",
            None,
            1024,
            tmp.path(),
        );

        let err = runner.run(&script, &RunInputs::default()).await.unwrap_err();
        assert!(matches!(err, MonitorError::InterpreterNotFound(ref name) if name == "definitely-not-an-interpreter"));
    }

    #[test]
    fn test_zero_timeout_disables_limit() {
        let config = RunnerConfig {
            timeout_secs: 0,
            ..RunnerConfig::default()
        };
        let runner = ScriptRunner::new(&config, "/tmp");
        assert!(runner.timeout.is_none());
        assert_eq!(runner.interpreter(), "python3");
    }
}

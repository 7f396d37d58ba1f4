//! The sync pipeline: fetch, pull, copy, reload.
//!
//! Stages run strictly in order and the pipeline halts at the first stage
//! that fails; later stages are reported as skipped. Nothing is rolled back.
//! Runs are serialized, so overlapping pushes never touch the working copy
//! at the same time.

use std::ffi::OsString;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Instant, SystemTime, UNIX_EPOCH};

use serde::Serialize;
use thiserror::Error;
use tokio::sync::{Mutex, RwLock};
use tracing::{error, info};

use super::runner::{CommandRunner, StageCommand};
use crate::Config;

/// systemd unit reloaded once the destination is up to date.
pub const WEB_SERVER_UNIT: &str = "apache2.service";

/// A named step of the sync pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Stage {
    Fetch,
    Pull,
    Copy,
    Reload,
}

impl Stage {
    /// All stages in execution order.
    pub const ALL: [Stage; 4] = [Stage::Fetch, Stage::Pull, Stage::Copy, Stage::Reload];

    pub fn name(&self) -> &'static str {
        match self {
            Stage::Fetch => "fetch",
            Stage::Pull => "pull",
            Stage::Copy => "copy",
            Stage::Reload => "reload",
        }
    }
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Why a stage failed.
#[derive(Debug, Error)]
pub enum SyncError {
    #[error("{stage}: failed to list {}: {source}", .path.display())]
    ListSource {
        stage: Stage,
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("{stage}: failed to spawn `{command}`: {source}")]
    Spawn {
        stage: Stage,
        command: String,
        #[source]
        source: io::Error,
    },

    #[error("{stage}: `{command}` exited with {}: {stderr}", exit_code_label(.code))]
    Exit {
        stage: Stage,
        command: String,
        code: Option<i32>,
        stderr: String,
    },
}

fn exit_code_label(code: &Option<i32>) -> String {
    match code {
        Some(code) => format!("status {}", code),
        None => "a signal".to_string(),
    }
}

/// Status of one stage within a run.
///
/// Error detail (command lines, paths, stderr) only goes to the
/// `sync_stage_failed` log event, never into the report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StageStatus {
    Succeeded,
    Failed,
    Skipped,
}

/// Report for one stage within a run.
#[derive(Debug, Clone, Serialize)]
pub struct StageReport {
    pub stage: Stage,
    pub status: StageStatus,
    pub duration_ms: u64,
}

/// Overall outcome of a run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "result", rename_all = "snake_case")]
pub enum SyncOutcome {
    Succeeded,
    Failed { stage: Stage },
}

/// Outcome of one complete pipeline run.
#[derive(Debug, Clone, Serialize)]
pub struct SyncReport {
    pub outcome: SyncOutcome,
    pub stages: Vec<StageReport>,
    /// Unix epoch seconds
    pub started_at: u64,
    /// Unix epoch seconds
    pub finished_at: u64,
}

impl SyncReport {
    pub fn succeeded(&self) -> bool {
        self.outcome == SyncOutcome::Succeeded
    }
}

/// Runs the sync pipeline against the configured source and destination.
///
/// Cheap to clone; clones share the run lock and the last report.
#[derive(Clone)]
pub struct Synchronizer {
    inner: Arc<SynchronizerInner>,
}

struct SynchronizerInner {
    config: Arc<Config>,
    runner: Arc<dyn CommandRunner>,
    run_lock: Mutex<()>,
    running: AtomicBool,
    last_report: RwLock<Option<SyncReport>>,
}

impl Synchronizer {
    pub fn new(config: Arc<Config>, runner: Arc<dyn CommandRunner>) -> Self {
        Self {
            inner: Arc::new(SynchronizerInner {
                config,
                runner,
                run_lock: Mutex::new(()),
                running: AtomicBool::new(false),
                last_report: RwLock::new(None),
            }),
        }
    }

    /// Whether a run currently holds the pipeline.
    pub fn is_running(&self) -> bool {
        self.inner.running.load(Ordering::SeqCst)
    }

    /// The report of the most recently finished run, if any.
    pub async fn last_report(&self) -> Option<SyncReport> {
        self.inner.last_report.read().await.clone()
    }

    /// Run every stage in order, waiting for any run already in progress.
    ///
    /// Dropping the returned future mid-run abandons the remaining stages;
    /// callers that may be cancelled should run it on its own task.
    pub async fn run(&self) -> SyncReport {
        let _guard = self.inner.run_lock.lock().await;
        let _running = RunningFlag::set(&self.inner.running);

        let config = &self.inner.config;
        info!(
            source = %config.source.display(),
            destination = %config.destination.display(),
            "sync_started"
        );

        let started_at = unix_now();
        let mut stages = Vec::with_capacity(Stage::ALL.len());
        let mut failure: Option<(Stage, SyncError)> = None;

        for stage in Stage::ALL {
            if failure.is_some() {
                stages.push(StageReport {
                    stage,
                    status: StageStatus::Skipped,
                    duration_ms: 0,
                });
                continue;
            }

            let start = Instant::now();
            let result = self.run_stage(stage).await;
            let duration_ms = start.elapsed().as_millis() as u64;

            let status = match result {
                Ok(()) => {
                    info!(stage = %stage, duration_ms = duration_ms, "sync_stage_succeeded");
                    StageStatus::Succeeded
                }
                Err(e) => {
                    error!(stage = %stage, duration_ms = duration_ms, error = %e, "sync_stage_failed");
                    failure = Some((stage, e));
                    StageStatus::Failed
                }
            };
            stages.push(StageReport {
                stage,
                status,
                duration_ms,
            });
        }

        let outcome = match failure {
            None => {
                info!("sync_completed");
                SyncOutcome::Succeeded
            }
            Some((stage, e)) => {
                error!(stage = %stage, error = %e, "sync_failed");
                SyncOutcome::Failed { stage }
            }
        };

        let report = SyncReport {
            outcome,
            stages,
            started_at,
            finished_at: unix_now(),
        };

        *self.inner.last_report.write().await = Some(report.clone());

        report
    }

    async fn run_stage(&self, stage: Stage) -> Result<(), SyncError> {
        let config = &self.inner.config;
        let command = match stage {
            Stage::Fetch => git_command(&config.source, &["fetch", "--all"]),
            Stage::Pull => git_command(&config.source, &["pull"]),
            Stage::Copy => {
                let entries = visible_entries(&config.source).await.map_err(|source| {
                    SyncError::ListSource {
                        stage,
                        path: config.source.clone(),
                        source,
                    }
                })?;
                if entries.is_empty() {
                    info!(source = %config.source.display(), "sync_copy_nothing_to_copy");
                    return Ok(());
                }
                copy_command(entries, &config.destination)
            }
            Stage::Reload => StageCommand::new("systemctl", ["reload", WEB_SERVER_UNIT]),
        };

        info!(stage = %stage, command = %command, "sync_stage_running");

        let output = self
            .inner
            .runner
            .run(&command)
            .await
            .map_err(|source| SyncError::Spawn {
                stage,
                command: command.to_string(),
                source,
            })?;

        if !output.success {
            return Err(SyncError::Exit {
                stage,
                command: command.to_string(),
                code: output.code,
                stderr: output.stderr,
            });
        }
        Ok(())
    }
}

/// Holds the `running` flag up for as long as it lives, even if the run
/// future is dropped part way.
struct RunningFlag<'a>(&'a AtomicBool);

impl<'a> RunningFlag<'a> {
    fn set(flag: &'a AtomicBool) -> Self {
        flag.store(true, Ordering::SeqCst);
        Self(flag)
    }
}

impl Drop for RunningFlag<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

fn git_command(source: &Path, args: &[&str]) -> StageCommand {
    let mut full: Vec<OsString> = vec!["-C".into(), source.into()];
    full.extend(args.iter().map(OsString::from));
    StageCommand::new("git", full)
}

fn copy_command(entries: Vec<PathBuf>, destination: &Path) -> StageCommand {
    let mut args: Vec<OsString> = vec!["-r".into()];
    args.extend(entries.into_iter().map(OsString::from));
    args.push(destination.into());
    StageCommand::new("cp", args)
}

/// Top-level entries of `dir` that a shell `dir/*` glob would match,
/// sorted by name. Dot-entries such as `.git` are left out.
async fn visible_entries(dir: &Path) -> io::Result<Vec<PathBuf>> {
    let mut entries = Vec::new();
    let mut read_dir = tokio::fs::read_dir(dir).await?;
    while let Some(entry) = read_dir.next_entry().await? {
        if entry.file_name().to_string_lossy().starts_with('.') {
            continue;
        }
        entries.push(entry.path());
    }
    entries.sort();
    Ok(entries)
}

fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}

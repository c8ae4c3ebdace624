// ABOUTME: Orchestrates build, stage-copy, config-patch, and status refresh per environment.
// ABOUTME: Enforces promotion order and the one-active-operation-per-project invariant.

use std::path::PathBuf;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

use super::copy::copy_tree;
use super::descriptor::rewrite_descriptor_version;
use super::error::DeployError;
use super::status::StatusTracker;
use crate::eventlog::EventLog;
use crate::patch::patch_directory;
use crate::process::run_command;
use crate::settings::{ConfigSetting, EnvironmentPaths, SharedProject};
use crate::types::{Environment, version_folder_name};

/// Serializes mutating operations against one project. Pipelines created for
/// the same project should share one guard so at most one operation is in
/// flight per project; unrelated projects never contend.
pub type OperationGuard = Arc<tokio::sync::Mutex<()>>;

/// Outcome of a deploy attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeployOutcome {
    Deployed,
    /// The target environment has no base path configured; nothing was done.
    Skipped,
}

/// One pipeline per (project, operation). Borrows the shared project handle
/// for the duration of the operation and never retains it past it.
pub struct Pipeline {
    project: SharedProject,
    paths: EnvironmentPaths,
    tracker: StatusTracker,
    guard: OperationGuard,
    log: EventLog,
    cancel: CancellationToken,
}

/// Point-in-time copy of the project fields an operation needs, taken under
/// the project lock once so stages work from a consistent view.
struct Snapshot {
    name: String,
    folder: String,
    source_path: PathBuf,
    build_command: String,
    project_file_path: Option<PathBuf>,
    config_settings: Vec<ConfigSetting>,
}

impl Pipeline {
    pub fn new(
        project: SharedProject,
        paths: EnvironmentPaths,
        log: EventLog,
        cancel: CancellationToken,
    ) -> Self {
        let tracker = StatusTracker::new(paths.clone());
        Pipeline {
            project,
            paths,
            tracker,
            guard: Arc::new(tokio::sync::Mutex::new(())),
            log,
            cancel,
        }
    }

    /// Share an operation guard with other pipelines for the same project.
    pub fn with_guard(mut self, guard: OperationGuard) -> Self {
        self.guard = guard;
        self
    }

    pub fn operation_guard(&self) -> OperationGuard {
        Arc::clone(&self.guard)
    }

    /// Update the project version and run the configured build command.
    ///
    /// The version is written into the external build descriptor on a
    /// best-effort basis, then updated in memory; the build command (when
    /// configured) runs in the project's source directory with a hard
    /// timeout. Build never touches any environment directory.
    pub async fn build(&self, new_version: &str) -> Result<(), DeployError> {
        let _op = self.guard.lock().await;
        self.checkpoint()?;

        let snapshot = self.snapshot();
        self.log.info(format!(
            "{}: starting build for version {new_version}",
            snapshot.name
        ));

        if let Some(descriptor) = snapshot.project_file_path.clone() {
            let version = new_version.to_string();
            let result =
                run_blocking(move || Ok(rewrite_descriptor_version(&descriptor, &version))).await?;
            match result {
                Ok(true) => self.log.debug(format!(
                    "{}: wrote version {new_version} into build descriptor",
                    snapshot.name
                )),
                Ok(false) => self.log.warning(format!(
                    "{}: could not write version into build descriptor, proceeding with in-memory version",
                    snapshot.name
                )),
                Err(e) => self.log.warning(format!(
                    "{}: build descriptor update failed ({e}), proceeding with in-memory version",
                    snapshot.name
                )),
            }
        }

        self.project.lock().current_version = new_version.to_string();

        if snapshot.build_command.trim().is_empty() {
            self.log
                .info(format!("{}: no build command, skipping build step", snapshot.name));
            self.tracker.update_all(&self.project);
            return Ok(());
        }

        self.checkpoint()?;
        match run_command(&snapshot.build_command, &snapshot.source_path, &self.cancel).await {
            Ok(output) => {
                self.log
                    .info(format!("{}: build completed successfully", snapshot.name));
                self.log
                    .debug(format!("{}: build output: {}", snapshot.name, output.stdout));
            }
            Err(e) => {
                self.log
                    .error(format!("{}: build failed: {e}", snapshot.name));
                return Err(e.into());
            }
        }

        // The version changed, so the derived flags must be recomputed.
        self.tracker.update_all(&self.project);
        Ok(())
    }

    /// Stage the version folder into `env` and patch its configuration.
    ///
    /// Development is staged from the project's source path; test and
    /// production are seeded from their predecessor's version folder, never
    /// from source. An unconfigured target environment is a no-op.
    pub async fn deploy_to(&self, env: Environment) -> Result<DeployOutcome, DeployError> {
        let _op = self.guard.lock().await;
        self.checkpoint()?;

        let snapshot = self.snapshot();
        let Some(base) = self.paths.base(env) else {
            self.log.info(format!(
                "{}: {env} base path not configured, skipping deployment",
                snapshot.name
            ));
            return Ok(DeployOutcome::Skipped);
        };
        let target = base.join(&snapshot.folder);

        let source = match env.predecessor() {
            None => {
                if !snapshot.source_path.is_dir() {
                    let err = DeployError::Validation(format!(
                        "{}: cannot deploy to {env}: source path does not exist: {}",
                        snapshot.name,
                        snapshot.source_path.display()
                    ));
                    self.log.error(err.to_string());
                    return Err(err);
                }
                snapshot.source_path.clone()
            }
            Some(pred) => {
                let pred_dir = self.paths.base(pred).map(|b| b.join(&snapshot.folder));
                match pred_dir {
                    Some(dir) if dir.is_dir() => dir,
                    _ => {
                        let err = DeployError::Validation(format!(
                            "{}: cannot deploy to {env}: version folder {} is not deployed to {pred} (promotion must go in order)",
                            snapshot.name, snapshot.folder
                        ));
                        self.log.error(err.to_string());
                        return Err(err);
                    }
                }
            }
        };

        self.log.info(format!(
            "{}: staging {} into {env}",
            snapshot.name, snapshot.folder
        ));
        {
            let target = target.clone();
            run_blocking(move || copy_tree(&source, &target))
                .await
                .inspect_err(|e| {
                    self.log.error(format!(
                        "{}: copy into {env} failed: {e}",
                        snapshot.name
                    ));
                })?;
        }

        self.checkpoint()?;
        self.log.debug(format!(
            "{}: patching configuration for {env}",
            snapshot.name
        ));
        {
            let target = target.clone();
            let settings = snapshot.config_settings.clone();
            run_blocking(move || {
                patch_directory(&target, &settings, env).map_err(DeployError::from)
            })
            .await
            .inspect_err(|e| {
                self.log.error(format!(
                    "{}: config patch for {env} failed: {e}",
                    snapshot.name
                ));
            })?;
        }

        self.tracker.check_deployed(&self.project, env);
        self.log.info(format!(
            "{}: deployed {} to {env}",
            snapshot.name, snapshot.folder
        ));
        Ok(DeployOutcome::Deployed)
    }

    /// Delete the version folder from `env` if present.
    ///
    /// Returns whether anything was actually removed; an absent folder or an
    /// unconfigured environment is not an error.
    pub async fn remove_from(&self, env: Environment) -> Result<bool, DeployError> {
        let _op = self.guard.lock().await;
        self.remove_from_inner(env).await
    }

    async fn remove_from_inner(&self, env: Environment) -> Result<bool, DeployError> {
        self.checkpoint()?;

        let snapshot = self.snapshot();
        let Some(base) = self.paths.base(env) else {
            return Ok(false);
        };
        let dir = base.join(&snapshot.folder);

        let removed = if dir.is_dir() {
            let target = dir.clone();
            run_blocking(move || {
                std::fs::remove_dir_all(&target).map_err(|source| DeployError::Io {
                    path: target.clone(),
                    source,
                })
            })
            .await
            .inspect_err(|e| {
                self.log.error(format!(
                    "{}: removal from {env} failed: {e}",
                    snapshot.name
                ));
            })?;
            true
        } else {
            false
        };

        self.tracker.check_deployed(&self.project, env);
        if removed {
            self.log
                .info(format!("{}: removed {} from {env}", snapshot.name, snapshot.folder));
        }
        Ok(removed)
    }

    /// Remove the version folder from every environment, production first.
    ///
    /// Each environment is attempted independently and per-environment
    /// errors are collected. Partial cleanup counts as progress: the call
    /// returns `true` when any environment was cleaned even if others
    /// failed, and raises an aggregated error only when none succeeded.
    pub async fn remove_from_all(&self) -> Result<bool, DeployError> {
        let _op = self.guard.lock().await;

        let mut errors = Vec::new();
        let mut any_removed = false;
        for env in [
            Environment::Production,
            Environment::Test,
            Environment::Development,
        ] {
            match self.remove_from_inner(env).await {
                Ok(removed) => any_removed |= removed,
                // Cancellation is a stop request, not a per-environment failure.
                Err(DeployError::Cancelled) => return Err(DeployError::Cancelled),
                Err(e) => errors.push(e),
            }
        }

        if !errors.is_empty() {
            if any_removed {
                let name = self.project.lock().name.clone();
                self.log.warning(format!(
                    "{name}: some environments were cleaned up, but errors occurred: {}",
                    DeployError::Aggregate(errors)
                ));
                return Ok(true);
            }
            return Err(DeployError::Aggregate(errors));
        }
        Ok(any_removed)
    }

    /// Refresh all three deployed flags from disk.
    pub async fn update_status(&self) -> Result<(), DeployError> {
        self.checkpoint()?;
        let project = self.project.clone();
        let tracker = self.tracker.clone();
        run_blocking(move || {
            tracker.update_all(&project);
            Ok(())
        })
        .await
    }

    fn checkpoint(&self) -> Result<(), DeployError> {
        if self.cancel.is_cancelled() {
            return Err(DeployError::Cancelled);
        }
        Ok(())
    }

    fn snapshot(&self) -> Snapshot {
        let project = self.project.lock();
        Snapshot {
            name: project.name.clone(),
            folder: version_folder_name(&project.name, &project.current_version),
            source_path: project.source_path.clone(),
            build_command: project.build_command.clone(),
            project_file_path: project.project_file_path.clone(),
            config_settings: project.config_settings.clone(),
        }
    }
}

/// Dispatch blocking filesystem work onto the shared worker pool.
async fn run_blocking<T>(
    task: impl FnOnce() -> Result<T, DeployError> + Send + 'static,
) -> Result<T, DeployError>
where
    T: Send + 'static,
{
    tokio::task::spawn_blocking(task)
        .await
        .map_err(|e| DeployError::Validation(format!("background task failed: {e}")))?
}

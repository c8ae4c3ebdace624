// ABOUTME: Recomputes deployed-to flags from actual version folder presence.
// ABOUTME: Check-and-assign runs under the per-project lock; disk is authoritative.

use super::DeployError;
use crate::settings::{EnvironmentPaths, SharedProject};
use crate::types::{Environment, version_folder_name};

/// Authoritative deployment status checks for one set of environment paths.
#[derive(Debug, Clone)]
pub struct StatusTracker {
    paths: EnvironmentPaths,
}

impl StatusTracker {
    pub fn new(paths: EnvironmentPaths) -> Self {
        Self { paths }
    }

    /// Recompute whether the project's current version folder exists under
    /// the environment's base path, and assign the result to the project's
    /// flag. The lock is held for the whole check-and-assign so concurrent
    /// readers never observe a torn update. An unconfigured environment is
    /// simply not deployed.
    pub fn check_deployed(&self, project: &SharedProject, env: Environment) -> bool {
        let mut project = project.lock();
        let exists = match self.paths.base(env) {
            None => false,
            Some(base) => {
                let folder = version_folder_name(&project.name, &project.current_version);
                base.join(folder).is_dir()
            }
        };
        project.set_deployed(env, exists);
        exists
    }

    /// Refresh all three environment flags in promotion order.
    pub fn update_all(&self, project: &SharedProject) {
        for env in Environment::ALL {
            self.check_deployed(project, env);
        }
    }
}

/// Refresh statuses for many projects at once.
///
/// Fans out one blocking task per project over the shared worker pool and
/// joins all of them. Per-project failures are collected; the operation as a
/// whole fails only when zero projects could be refreshed.
pub async fn update_all_projects(
    paths: &EnvironmentPaths,
    projects: &[SharedProject],
) -> Result<(), DeployError> {
    let mut tasks = Vec::with_capacity(projects.len());
    for project in projects {
        let tracker = StatusTracker::new(paths.clone());
        let project = project.clone();
        tasks.push(tokio::task::spawn_blocking(move || {
            tracker.update_all(&project)
        }));
    }

    let results = futures::future::join_all(tasks).await;
    let mut errors = Vec::new();
    let mut succeeded = 0usize;
    for result in results {
        match result {
            Ok(()) => succeeded += 1,
            Err(e) => errors.push(DeployError::Validation(format!(
                "status refresh task failed: {e}"
            ))),
        }
    }

    if succeeded == 0 && !errors.is_empty() {
        return Err(DeployError::Aggregate(errors));
    }
    if !errors.is_empty() {
        tracing::warn!(
            failed = errors.len(),
            "some project status refreshes failed"
        );
    }
    Ok(())
}

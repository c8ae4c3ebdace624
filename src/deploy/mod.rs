// ABOUTME: Deployment promotion subsystem: staging, status, and removal per environment.
// ABOUTME: Exports the pipeline, status tracker, tree copy, and error taxonomy.

mod copy;
mod descriptor;
mod error;
mod pipeline;
mod status;

pub use copy::copy_tree;
pub use descriptor::rewrite_descriptor_version;
pub use error::DeployError;
pub use pipeline::{DeployOutcome, OperationGuard, Pipeline};
pub use status::{StatusTracker, update_all_projects};

// ABOUTME: Entry point for the stagecoach CLI application.
// ABOUTME: Parses arguments and dispatches to appropriate command handlers.

mod cli;

use clap::Parser;
use cli::{Bump, Cli, Commands};
use stagecoach::deploy::{DeployOutcome, Pipeline, update_all_projects};
use stagecoach::error::{Error, Result};
use stagecoach::eventlog::{self, EventLog, EventLogWorker};
use stagecoach::settings::{Project, SETTINGS_FILENAME, Settings, SharedProject};
use stagecoach::types::{Environment, Version, is_valid_version};
use std::path::{Path, PathBuf};
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    // Initialize tracing subscriber based on verbose flag
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("warn")
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .init();

    let result = run(cli).await;

    if let Err(e) = result {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<()> {
    let path = cli
        .config
        .clone()
        .unwrap_or_else(|| PathBuf::from(SETTINGS_FILENAME));

    match cli.command {
        Commands::Init { force } => init(&path, force),
        Commands::Status { project } => status(&path, project.as_deref()).await,
        Commands::Build { project, set, bump } => build(&path, &project, set, bump).await,
        Commands::Deploy {
            project,
            environment,
        } => deploy(&path, &project, environment).await,
        Commands::Remove {
            project,
            environment,
            all,
        } => remove(&path, &project, environment, all).await,
    }
}

fn init(path: &Path, force: bool) -> Result<()> {
    if path.exists() && !force {
        return Err(Error::AlreadyExists(path.to_path_buf()));
    }

    let mut settings = Settings::default();
    settings.log_file = "stagecoach.log".to_string();
    let mut project = Project::new("my-app");
    project.source_path = PathBuf::from("./build");
    settings.projects.push(project);
    settings.save(path)?;

    println!("Wrote {}", path.display());
    Ok(())
}

/// Per-command application context: loaded settings, event log, and the
/// shutdown signal wired to Ctrl-C.
struct Context {
    settings: Settings,
    settings_path: PathBuf,
    log: EventLog,
    worker: EventLogWorker,
    cancel: CancellationToken,
}

impl Context {
    fn open(path: &Path) -> Result<Self> {
        let settings = Settings::load(path)?;

        let log_path = match settings.log_file.trim() {
            "" => None,
            file => Some(PathBuf::from(file)),
        };
        let (log, worker) = eventlog::spawn(log_path);

        let cancel = CancellationToken::new();
        let token = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                token.cancel();
            }
        });

        Ok(Context {
            settings,
            settings_path: path.to_path_buf(),
            log,
            worker,
            cancel,
        })
    }

    fn project_index(&self, name: &str) -> Result<usize> {
        self.settings
            .project_index(name)
            .ok_or_else(|| Error::UnknownProject(name.to_string()))
    }

    fn pipeline_for(&self, index: usize) -> (Pipeline, SharedProject) {
        let shared = self.settings.projects[index].clone().into_shared();
        let pipeline = Pipeline::new(
            shared.clone(),
            self.settings.environment_paths(),
            self.log.clone(),
            self.cancel.clone(),
        );
        (pipeline, shared)
    }

    fn store(&mut self, index: usize, shared: &SharedProject) {
        self.settings.projects[index] = shared.lock().clone();
    }

    /// Persist settings and drain the event log.
    async fn finish(self) -> Result<()> {
        let Context {
            settings,
            settings_path,
            log,
            worker,
            ..
        } = self;
        settings.save(&settings_path)?;
        drop(log);
        worker.shutdown().await;
        Ok(())
    }
}

async fn status(path: &Path, project: Option<&str>) -> Result<()> {
    let mut ctx = Context::open(path)?;

    let indices: Vec<usize> = match project {
        Some(name) => vec![ctx.project_index(name)?],
        None => (0..ctx.settings.projects.len()).collect(),
    };

    let shared: Vec<SharedProject> = indices
        .iter()
        .map(|&i| ctx.settings.projects[i].clone().into_shared())
        .collect();

    let paths = ctx.settings.environment_paths();
    let refresh = update_all_projects(&paths, &shared).await;

    for (&index, handle) in indices.iter().zip(&shared) {
        ctx.store(index, handle);
        let p = ctx.settings.projects[index].clone();
        println!("{} {}", p.name, p.current_version);
        println!("  development: {}", mark(p.deployed_to_development));
        println!("  test:        {}", mark(p.deployed_to_test));
        println!("  production:  {}", mark(p.deployed_to_production));
    }

    ctx.finish().await?;
    refresh.map_err(Error::from)
}

fn mark(deployed: bool) -> &'static str {
    if deployed { "deployed" } else { "-" }
}

async fn build(path: &Path, name: &str, set: Option<String>, bump: Option<Bump>) -> Result<()> {
    let mut ctx = Context::open(path)?;
    let index = ctx.project_index(name)?;

    let current = ctx.settings.projects[index].current_version.clone();
    let new_version = match set {
        Some(v) => {
            if !is_valid_version(&v) {
                return Err(Error::InvalidVersion(v));
            }
            v
        }
        None => {
            let version = Version::parse_lenient(&current);
            let bumped = match bump.unwrap_or(Bump::Patch) {
                Bump::Major => version.increment_major(),
                Bump::Minor => version.increment_minor(),
                Bump::Patch => version.increment_patch(),
            };
            bumped.to_string()
        }
    };

    println!("Building {name} {current} -> {new_version}");
    let (pipeline, shared) = ctx.pipeline_for(index);
    let outcome = pipeline.build(&new_version).await;
    drop(pipeline);
    ctx.store(index, &shared);
    if outcome.is_ok() {
        println!("✓ Build complete");
    }

    ctx.finish().await?;
    outcome.map_err(Error::from)
}

async fn deploy(path: &Path, name: &str, environment: Environment) -> Result<()> {
    let mut ctx = Context::open(path)?;
    let index = ctx.project_index(name)?;

    println!("Deploying {name} to {environment}...");
    let (pipeline, shared) = ctx.pipeline_for(index);
    let outcome = pipeline.deploy_to(environment).await;
    drop(pipeline);
    ctx.store(index, &shared);

    match &outcome {
        Ok(DeployOutcome::Deployed) => println!("✓ Deployed to {environment}"),
        Ok(DeployOutcome::Skipped) => {
            println!("{environment} is not configured, nothing to do");
        }
        Err(_) => {}
    }

    ctx.finish().await?;
    outcome.map(|_| ()).map_err(Error::from)
}

async fn remove(
    path: &Path,
    name: &str,
    environment: Option<Environment>,
    all: bool,
) -> Result<()> {
    let mut ctx = Context::open(path)?;
    let index = ctx.project_index(name)?;

    let (pipeline, shared) = ctx.pipeline_for(index);
    let outcome = if all {
        pipeline.remove_from_all().await
    } else {
        // clap guarantees an environment when --all is absent
        let env = environment.expect("environment argument is required without --all");
        pipeline.remove_from(env).await
    };
    drop(pipeline);
    ctx.store(index, &shared);

    match &outcome {
        Ok(true) => println!("✓ Removed"),
        Ok(false) => println!("Nothing to remove"),
        Err(_) => {}
    }

    ctx.finish().await?;
    outcome.map(|_| ()).map_err(Error::from)
}

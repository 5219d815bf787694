//! Workflow Orchestration
//!
//! ワークフローのオーケストレーション

use anyhow::{Context, Result};
use log::info;
use std::fs;
use std::future::Future;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::adapter::apps::BuiltinRegistry;
use crate::adapter::auth::log_credentials_status;
use crate::adapter::config::Config;
use crate::adapter::http::HttpServer;
use crate::adapter::package_index::{ConfiguredIndex, OfflineIndex};
use crate::adapter::repositories::{DirectoryImageStore, FileContextRepository};
use crate::application::dto::build_request::BuildRequest;
use crate::application::use_cases::build_image::{BuildImageUseCase, BuildSummary};
use crate::application::use_cases::launch_service::{LaunchPlan, LaunchServiceUseCase};
use crate::domain::errors::{BuildError, StartupError};
use crate::domain::services::descriptor_renderer::DescriptorRenderer;

use super::cli::{BuildArgs, ServeArgs};

pub const EXIT_FAILURE: u8 = 1;
pub const EXIT_STARTUP_FAILURE: u8 = 2;

/// Maps an error to the process exit code
pub fn exit_code_for(error: &anyhow::Error) -> u8 {
    if error.chain().any(|cause| cause.is::<StartupError>()) {
        EXIT_STARTUP_FAILURE
    } else {
        EXIT_FAILURE
    }
}

/// Returns true when the failure happened while building the image
pub fn is_build_failure(error: &anyhow::Error) -> bool {
    error.chain().any(|cause| cause.is::<BuildError>())
}

/// Renders the build descriptor for the configured recipe
pub fn render_descriptor(config: &Config) -> Result<String> {
    let recipe = config.to_recipe()?;
    Ok(DescriptorRenderer::render(&recipe))
}

/// Canonicalizes the deepest existing ancestor of `path` and appends the rest
fn resolve_path(path: &Path) -> Option<PathBuf> {
    let absolute = std::path::absolute(path).ok()?;
    let mut existing = absolute.as_path();
    let mut rest = Vec::new();
    loop {
        if let Ok(canonical) = fs::canonicalize(existing) {
            return Some(rest.iter().rev().fold(canonical, |p, part| p.join(part)));
        }
        rest.push(existing.file_name()?.to_os_string());
        existing = existing.parent()?;
    }
}

/// Returns the output directory relative to the context when it lies inside it
fn output_within_context(context: &Path, output: &Path) -> Option<String> {
    let context = fs::canonicalize(context).ok()?;
    let output = resolve_path(output)?;
    let parts: Vec<String> = output
        .strip_prefix(&context)
        .ok()?
        .components()
        .map(|c| c.as_os_str().to_string_lossy().to_string())
        .collect();
    if parts.is_empty() {
        None
    } else {
        Some(parts.join("/"))
    }
}

/// Image Build Workflow
pub struct BuildWorkflow {
    config: Config,
}

impl BuildWorkflow {
    pub fn new(config: Config) -> Self {
        Self { config }
    }

    fn package_index(&self, args: &BuildArgs) -> Result<ConfiguredIndex> {
        match &args.offline_index {
            Some(path) => Ok(ConfiguredIndex::Offline(OfflineIndex::load(
                PathBuf::from(path).as_path(),
            )?)),
            None => ConfiguredIndex::from_config(&self.config.package_index),
        }
    }

    /// Execute the build workflow
    pub async fn execute(&self, args: &BuildArgs) -> Result<BuildSummary> {
        info!("Starting image build...");
        info!("Dry run: {}", args.dry_run);

        let recipe = self.config.to_recipe()?;
        println!("✓ Using recipe:");
        println!("  Base image: {}", recipe.base_image);
        println!("  Working dir: {}", recipe.working_dir);
        println!("  Entrypoint: {}", recipe.entrypoint);
        println!(
            "  Port: {} (timeout {}s)",
            recipe.exposed_port,
            recipe.request_timeout.as_secs()
        );

        let index = self.package_index(args)?;
        let context_dir = PathBuf::from(shellexpand::tilde(&args.context).as_ref());
        let store = DirectoryImageStore::new(&args.output);
        let output_in_context = output_within_context(&context_dir, store.output_dir());
        let use_case = BuildImageUseCase::new(
            Arc::new(FileContextRepository::new()),
            Arc::new(index),
            Arc::new(store),
        );

        let request = BuildRequest::new(context_dir, recipe)
            .dry_run(args.dry_run)
            .output_in_context(output_in_context);
        let summary = use_case.execute(&request).await?;

        println!("✓ Resolved {} packages", summary.packages.len());
        for package in &summary.packages {
            println!("    - {}", package.pin_spec());
        }
        println!("✓ Collected {} files", summary.file_count);

        match &summary.image_path {
            Some(path) => println!("✓ Image {} written to {}", summary.build_id, path.display()),
            None => {
                println!("✓ Dry-run mode (no image written)");
                println!("{}", summary.descriptor);
            }
        }

        Ok(summary)
    }
}

/// Service Launch Workflow
pub struct ServeWorkflow {
    config: Config,
}

impl ServeWorkflow {
    /// Command line flags win over the file and the environment
    pub fn new(mut config: Config, args: &ServeArgs) -> Self {
        if let Some(bind) = &args.bind {
            config.service.bind = bind.clone();
        }
        if let Some(timeout) = args.timeout {
            config.service.request_timeout_secs = timeout;
        }
        if let Some(entrypoint) = &args.entrypoint {
            config.service.entrypoint = entrypoint.clone();
        }
        if let Some(app_root) = &args.app_root {
            config.service.app_root = Some(app_root.clone());
        }
        if let Some(url) = &args.upstream_url {
            config.service.upstream_url = Some(url.clone());
        }
        if let Some(workers) = args.workers {
            config.service.workers = Some(workers);
        }
        if args.skip_module_check {
            config.service.verify_module_source = false;
        }
        Self { config }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn workers(&self) -> Option<usize> {
        self.config.service.workers
    }

    /// Exports the runtime environment and resolves the application
    ///
    /// Runs before the async runtime starts so that environment changes
    /// happen on a single thread.
    pub fn prepare(&self) -> Result<LaunchPlan> {
        let request = self.config.to_launch_request()?;

        let registry = BuiltinRegistry::with_defaults(self.config.service.upstream_url.clone())
            .context("Failed to initialize built-in applications")?;
        let plan = LaunchServiceUseCase::new(Arc::new(registry)).execute(&request)?;

        // Keys and values were checked by the use case
        for (key, value) in plan.env.iter() {
            std::env::set_var(key, value);
        }
        println!(
            "✓ Exported {} environment variables",
            plan.env.iter().count()
        );
        log_credentials_status(plan.env.credentials_path());

        println!("✓ Resolved application {}", plan.entrypoint);
        Ok(plan)
    }

    /// Binds and serves until `shutdown` resolves
    pub async fn run<F>(plan: LaunchPlan, shutdown: F) -> Result<()>
    where
        F: Future<Output = ()>,
    {
        let server = HttpServer::bind(plan.bind, plan.application, plan.request_timeout).await?;
        println!(
            "✓ Serving {} on {} (timeout {}s)",
            plan.entrypoint,
            plan.bind,
            plan.request_timeout.as_secs()
        );

        server.run(shutdown).await?;
        println!("✓ Shutdown complete");
        Ok(())
    }
}

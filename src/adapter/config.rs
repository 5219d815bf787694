//! Configuration
//!
//! JSON設定ファイルの読み込みと、環境変数による上書き

use anyhow::{Context, Result};
use log::warn;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use crate::application::dto::launch_request::LaunchRequest;
use crate::domain::entities::context_manifest::ContextManifest;
use crate::domain::entities::dependency_manifest::DEFAULT_MANIFEST;
use crate::domain::entities::entrypoint::{EntrypointRef, DEFAULT_ENTRYPOINT};
use crate::domain::entities::image_recipe::{
    ImageRecipe, ProcessManager, DEFAULT_BASE_IMAGE, DEFAULT_PORT, DEFAULT_TIMEOUT_SECS,
    DEFAULT_WORKING_DIR,
};
use crate::domain::entities::runtime_env::RuntimeEnvironment;
use crate::domain::errors::StartupError;

pub const ENV_BIND: &str = "FINCHAT_BIND";
pub const ENV_TIMEOUT_SECS: &str = "FINCHAT_TIMEOUT_SECS";
pub const ENV_ENTRYPOINT: &str = "FINCHAT_ENTRYPOINT";
pub const ENV_UPSTREAM_URL: &str = "FINCHAT_UPSTREAM_URL";

pub const DEFAULT_PYPI_URL: &str = "https://pypi.org/pypi";

fn default_base_image() -> String {
    DEFAULT_BASE_IMAGE.to_string()
}

fn default_system_packages() -> Vec<String> {
    vec!["gcc".to_string()]
}

fn default_manifest() -> String {
    DEFAULT_MANIFEST.to_string()
}

fn default_working_dir() -> String {
    DEFAULT_WORKING_DIR.to_string()
}

fn default_bind() -> String {
    format!("0.0.0.0:{}", DEFAULT_PORT)
}

fn default_timeout_secs() -> u64 {
    DEFAULT_TIMEOUT_SECS
}

fn default_entrypoint() -> String {
    DEFAULT_ENTRYPOINT.to_string()
}

fn default_true() -> bool {
    true
}

fn default_pypi_url() -> String {
    DEFAULT_PYPI_URL.to_string()
}

/// Image build settings
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ImageSection {
    #[serde(default = "default_base_image")]
    pub base_image: String,
    #[serde(default = "default_system_packages")]
    pub system_packages: Vec<String>,
    #[serde(default = "default_manifest")]
    pub dependency_manifest: String,
    #[serde(default = "default_working_dir")]
    pub working_dir: String,
    /// Extra variables merged on top of the built-in runtime environment
    #[serde(default)]
    pub env: BTreeMap<String, String>,
    #[serde(default)]
    pub context: ContextManifest,
    #[serde(default)]
    pub process_manager: ProcessManager,
}

impl Default for ImageSection {
    fn default() -> Self {
        Self {
            base_image: default_base_image(),
            system_packages: default_system_packages(),
            dependency_manifest: default_manifest(),
            working_dir: default_working_dir(),
            env: BTreeMap::new(),
            context: ContextManifest::default(),
            process_manager: ProcessManager::default(),
        }
    }
}

/// Process manager settings
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServiceSection {
    #[serde(default = "default_bind")]
    pub bind: String,
    #[serde(default = "default_timeout_secs")]
    pub request_timeout_secs: u64,
    #[serde(default = "default_entrypoint")]
    pub entrypoint: String,
    /// Runtime worker threads (defaults to the number of CPUs)
    #[serde(default)]
    pub workers: Option<usize>,
    /// Base URL of the external application that receives forwarded requests
    #[serde(default)]
    pub upstream_url: Option<String>,
    /// Application source tree; defaults to the image working directory
    #[serde(default)]
    pub app_root: Option<String>,
    #[serde(default = "default_true")]
    pub verify_module_source: bool,
}

impl Default for ServiceSection {
    fn default() -> Self {
        Self {
            bind: default_bind(),
            request_timeout_secs: default_timeout_secs(),
            entrypoint: default_entrypoint(),
            workers: None,
            upstream_url: None,
            app_root: None,
            verify_module_source: true,
        }
    }
}

/// Where build-time dependency resolution looks packages up
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PackageIndexSection {
    /// PyPI-compatible JSON API
    Pypi {
        #[serde(default = "default_pypi_url")]
        url: String,
    },
    /// Local JSON catalog: `{ "name": ["1.0", ...] }`
    Offline { catalog: String },
}

impl Default for PackageIndexSection {
    fn default() -> Self {
        PackageIndexSection::Pypi {
            url: default_pypi_url(),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub image: ImageSection,
    #[serde(default)]
    pub service: ServiceSection,
    #[serde(default)]
    pub package_index: PackageIndexSection,
}

impl Config {
    pub fn load(path: &str) -> Result<Self> {
        let expanded = shellexpand::tilde(path);
        let content = fs::read_to_string(expanded.as_ref())
            .with_context(|| format!("Failed to read config file: {}", expanded))?;
        let config: Config = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", expanded))?;
        Ok(config)
    }

    /// Loads the file when given, otherwise starts from defaults
    pub fn load_or_default(path: Option<&str>) -> Result<Self> {
        match path {
            Some(path) => Self::load(path),
            None => Ok(Self::default()),
        }
    }

    /// Applies `FINCHAT_*` overrides using the given variable lookup
    pub fn apply_env_overrides<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(bind) = lookup(ENV_BIND) {
            self.service.bind = bind;
        }
        if let Some(timeout) = lookup(ENV_TIMEOUT_SECS) {
            self.service.request_timeout_secs = timeout
                .trim()
                .parse()
                .with_context(|| format!("{} must be a number of seconds", ENV_TIMEOUT_SECS))?;
        }
        if let Some(entrypoint) = lookup(ENV_ENTRYPOINT) {
            self.service.entrypoint = entrypoint;
        }
        if let Some(url) = lookup(ENV_UPSTREAM_URL) {
            self.service.upstream_url = if url.trim().is_empty() { None } else { Some(url) };
        }
        Ok(())
    }

    /// Applies overrides from the process environment
    pub fn apply_process_env(&mut self) -> Result<()> {
        self.apply_env_overrides(|key| std::env::var(key).ok())
    }

    pub fn bind_addr(&self) -> Result<SocketAddr> {
        self.service
            .bind
            .parse()
            .with_context(|| format!("Invalid bind address: {}", self.service.bind))
    }

    pub fn runtime_env(&self) -> RuntimeEnvironment {
        for key in self.image.env.keys() {
            if RuntimeEnvironment::is_contract_var(key) {
                warn!("Ignoring image.env override of {}", key);
            }
        }
        RuntimeEnvironment::with_overrides(self.image.env.clone())
    }

    /// Builds the image recipe; the exposed port follows the service bind port
    pub fn to_recipe(&self) -> Result<ImageRecipe> {
        let entrypoint = EntrypointRef::parse(&self.service.entrypoint)
            .context("Invalid entrypoint in configuration")?;

        Ok(ImageRecipe {
            base_image: self.image.base_image.clone(),
            system_packages: self.image.system_packages.clone(),
            dependency_manifest: self.image.dependency_manifest.clone(),
            working_dir: self.image.working_dir.clone(),
            env: self.runtime_env(),
            exposed_port: self.bind_addr()?.port(),
            request_timeout: Duration::from_secs(self.service.request_timeout_secs),
            entrypoint,
            process_manager: self.image.process_manager,
            context: self.image.context.clone(),
        })
    }

    pub fn to_launch_request(&self) -> Result<LaunchRequest> {
        let app_root = self
            .service
            .app_root
            .as_deref()
            .unwrap_or(&self.image.working_dir);

        // The serve path reports a bad address as a startup failure
        let bind = self
            .service
            .bind
            .parse()
            .map_err(|source| StartupError::InvalidBind {
                addr: self.service.bind.clone(),
                source,
            })?;

        Ok(LaunchRequest {
            bind,
            request_timeout: Duration::from_secs(self.service.request_timeout_secs),
            entrypoint: self.service.entrypoint.clone(),
            app_root: PathBuf::from(shellexpand::tilde(app_root).as_ref()),
            verify_module_source: self.service.verify_module_source,
            env: self.runtime_env(),
        })
    }
}

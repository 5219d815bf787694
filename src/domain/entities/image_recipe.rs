//! # ImageRecipe Entity
//!
//! ランタイムイメージの宣言的なビルドレシピ

use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::context_manifest::ContextManifest;
use super::entrypoint::EntrypointRef;
use super::runtime_env::RuntimeEnvironment;
use crate::domain::errors::BuildError;

/// 公開ポート
pub const DEFAULT_PORT: u16 = 8085;
/// リクエストタイムアウト（秒）
pub const DEFAULT_TIMEOUT_SECS: u64 = 300;
/// ベースイメージ
pub const DEFAULT_BASE_IMAGE: &str = "python:3.10-slim";
/// イメージ内の作業ディレクトリ
pub const DEFAULT_WORKING_DIR: &str = "/app";
/// ネイティブのプロセスマネージャとして起動するバイナリ名
pub const NATIVE_LAUNCHER: &str = "finchat-bootstrap";
/// 出力イメージ内で作業ディレクトリの中身を置くディレクトリ
pub const ROOTFS_DIR: &str = "rootfs";

/// コンテナ起動時のプロセスマネージャ
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ProcessManager {
    /// このツール自身の `serve` サブコマンド
    #[default]
    Native,
    /// gunicorn（Pythonのみのイメージ向け）
    Gunicorn,
}

/// バインドアドレス・タイムアウト・エントリポイントの3つ組
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LaunchTriple {
    pub bind: SocketAddr,
    pub timeout: Duration,
    pub entrypoint: EntrypointRef,
}

impl LaunchTriple {
    /// プロセスマネージャの起動コマンドを組み立てる
    pub fn command(&self, manager: ProcessManager) -> Vec<String> {
        let bind = self.bind.to_string();
        let timeout = self.timeout.as_secs().to_string();
        let entrypoint = self.entrypoint.to_string();

        match manager {
            ProcessManager::Native => vec![
                NATIVE_LAUNCHER.to_string(),
                "serve".to_string(),
                "--bind".to_string(),
                bind,
                "--timeout".to_string(),
                timeout,
                "--entrypoint".to_string(),
                entrypoint,
            ],
            ProcessManager::Gunicorn => vec![
                "gunicorn".to_string(),
                "--bind".to_string(),
                bind,
                "--timeout".to_string(),
                timeout,
                entrypoint,
            ],
        }
    }
}

/// イメージのビルドレシピ
#[derive(Debug, Clone)]
pub struct ImageRecipe {
    pub base_image: String,
    /// OSレベルのパッケージ（ネイティブコンパイラなど）
    pub system_packages: Vec<String>,
    /// 依存関係マニフェストのファイル名（コンテキストからの相対パス）
    pub dependency_manifest: String,
    pub working_dir: String,
    pub env: RuntimeEnvironment,
    pub exposed_port: u16,
    pub request_timeout: Duration,
    pub entrypoint: EntrypointRef,
    pub process_manager: ProcessManager,
    pub context: ContextManifest,
}

impl Default for ImageRecipe {
    fn default() -> Self {
        Self {
            base_image: DEFAULT_BASE_IMAGE.to_string(),
            system_packages: vec!["gcc".to_string()],
            dependency_manifest: super::dependency_manifest::DEFAULT_MANIFEST.to_string(),
            working_dir: DEFAULT_WORKING_DIR.to_string(),
            env: RuntimeEnvironment::new(),
            exposed_port: DEFAULT_PORT,
            request_timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            entrypoint: EntrypointRef::default(),
            process_manager: ProcessManager::default(),
            context: ContextManifest::default(),
        }
    }
}

/// Debianのパッケージ名として有効か
pub fn is_valid_system_package(name: &str) -> bool {
    let mut chars = name.chars();
    let first_ok = matches!(chars.next(), Some(c) if c.is_ascii_lowercase() || c.is_ascii_digit());
    first_ok
        && name.len() >= 2
        && chars.all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || matches!(c, '+' | '-' | '.'))
}

impl ImageRecipe {
    /// コンテナ内で全インターフェースにバインドする3つ組
    pub fn launch_triple(&self) -> LaunchTriple {
        LaunchTriple {
            bind: SocketAddr::new(IpAddr::V4(Ipv4Addr::UNSPECIFIED), self.exposed_port),
            timeout: self.request_timeout,
            entrypoint: self.entrypoint.clone(),
        }
    }

    /// コンテナ起動コマンド
    pub fn command(&self) -> Vec<String> {
        self.launch_triple().command(self.process_manager)
    }

    /// 出力イメージのルートから見た作業ディレクトリ（例: `rootfs/app`）
    pub fn rootfs_workdir(&self) -> String {
        match self.working_dir.trim_matches('/') {
            "" => ROOTFS_DIR.to_string(),
            dir => format!("{}/{}", ROOTFS_DIR, dir),
        }
    }

    /// コンテキストルートからの依存関係マニフェストのパス（`/` 区切り）
    pub fn manifest_path(&self) -> String {
        let path = self.dependency_manifest.trim().replace('\\', "/");
        path.trim_start_matches("./").trim_start_matches('/').to_string()
    }

    /// `8085/tcp` 形式の公開ポート
    pub fn exposed_port_spec(&self) -> String {
        format!("{}/tcp", self.exposed_port)
    }

    /// レシピを検証する
    ///
    /// # Errors
    ///
    /// 必須項目の欠落や不正な値がある場合に `BuildError::InvalidRecipe` を返す
    pub fn validate(&self) -> Result<(), BuildError> {
        let invalid = |msg: String| Err(BuildError::InvalidRecipe(msg));

        if self.base_image.trim().is_empty() {
            return invalid("base image is empty".to_string());
        }
        if let Some(bad) = self
            .system_packages
            .iter()
            .find(|p| !is_valid_system_package(p))
        {
            return invalid(format!("invalid system package name '{}'", bad));
        }
        if self.dependency_manifest.trim().is_empty() {
            return invalid("dependency manifest name is empty".to_string());
        }
        if !self.working_dir.starts_with('/') {
            return invalid(format!(
                "working directory '{}' must be absolute",
                self.working_dir
            ));
        }
        if self.exposed_port == 0 {
            return invalid("exposed port must be non-zero".to_string());
        }
        if self.request_timeout.is_zero() {
            return invalid("request timeout must be greater than zero".to_string());
        }
        if let Err(reason) = self.env.check_exportable() {
            return invalid(format!("environment: {}", reason));
        }

        Ok(())
    }
}

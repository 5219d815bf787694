//! # Launch Request DTO
//!
//! サービス起動の入力

use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use crate::domain::entities::image_recipe::{DEFAULT_PORT, DEFAULT_TIMEOUT_SECS, DEFAULT_WORKING_DIR};
use crate::domain::entities::runtime_env::RuntimeEnvironment;

/// 起動リクエスト
#[derive(Debug, Clone)]
pub struct LaunchRequest {
    /// バインドアドレス
    pub bind: SocketAddr,
    /// リクエストごとのタイムアウト
    pub request_timeout: Duration,
    /// 未検証のエントリポイント文字列（`module:attribute`）
    pub entrypoint: String,
    /// アプリケーションのソースツリー（イメージ内の作業ディレクトリ）
    pub app_root: PathBuf,
    /// モジュールのソースが存在するか検証するか
    pub verify_module_source: bool,
    /// プロセスへエクスポートする環境変数
    pub env: RuntimeEnvironment,
}

impl Default for LaunchRequest {
    fn default() -> Self {
        Self {
            bind: SocketAddr::from(([0, 0, 0, 0], DEFAULT_PORT)),
            request_timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            entrypoint: crate::domain::entities::entrypoint::DEFAULT_ENTRYPOINT.to_string(),
            app_root: PathBuf::from(DEFAULT_WORKING_DIR),
            verify_module_source: true,
            env: RuntimeEnvironment::new(),
        }
    }
}

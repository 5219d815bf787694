//! # Launch Service Use Case
//!
//! サービス起動ユースケース
//!
//! アプリケーションオブジェクトを解決できない場合はリトライせずに失敗する

use log::{info, warn};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use crate::application::dto::launch_request::LaunchRequest;
use crate::domain::entities::entrypoint::EntrypointRef;
use crate::domain::entities::runtime_env::RuntimeEnvironment;
use crate::domain::errors::StartupError;
use crate::domain::repositories::application::{Application, ApplicationRegistry};

/// 起動計画
///
/// サーバーがバインドしてリクエストを受け付けるのに必要なすべて
pub struct LaunchPlan {
    pub bind: SocketAddr,
    pub request_timeout: Duration,
    pub entrypoint: EntrypointRef,
    pub application: Arc<dyn Application>,
    pub env: RuntimeEnvironment,
}

/// サービス起動ユースケース
pub struct LaunchServiceUseCase<R: ApplicationRegistry> {
    registry: Arc<R>,
}

impl<R: ApplicationRegistry> LaunchServiceUseCase<R> {
    /// 新しいユースケースを作成
    ///
    /// # Arguments
    ///
    /// * `registry` - アプリケーションレジストリ
    pub fn new(registry: Arc<R>) -> Self {
        Self { registry }
    }

    /// エントリポイントを解決して起動計画を作成する
    ///
    /// # Arguments
    ///
    /// * `request` - 起動リクエスト
    ///
    /// # Errors
    ///
    /// 環境変数がエクスポートできない、エントリポイントが不正、
    /// モジュールのソースが無い、アプリケーションが未登録の場合に `StartupError` を返す
    pub fn execute(&self, request: &LaunchRequest) -> Result<LaunchPlan, StartupError> {
        if request.request_timeout.is_zero() {
            return Err(StartupError::InvalidTimeout);
        }

        request
            .env
            .check_exportable()
            .map_err(StartupError::InvalidEnvironment)?;

        let entrypoint = EntrypointRef::parse(&request.entrypoint)?;

        if request.verify_module_source {
            let found = entrypoint
                .module_source_candidates()
                .iter()
                .any(|candidate| request.app_root.join(candidate).is_file());
            if !found {
                return Err(StartupError::ModuleNotFound {
                    module: entrypoint.module().to_string(),
                    app_root: request.app_root.clone(),
                });
            }
        }

        let Some(application) = self.registry.resolve(&entrypoint) else {
            let available: Vec<String> = self
                .registry
                .entrypoints()
                .iter()
                .map(|e| e.to_string())
                .collect();
            warn!("Registered applications: {}", available.join(", "));
            return Err(StartupError::ApplicationNotFound(entrypoint.to_string()));
        };

        info!("Resolved application object {}", entrypoint);

        Ok(LaunchPlan {
            bind: request.bind,
            request_timeout: request.request_timeout,
            entrypoint,
            application,
            env: request.env.clone(),
        })
    }
}

//! # Application Traits
//!
//! リクエストを処理するアプリケーションオブジェクトと、その名前解決

use anyhow::Result;
use async_trait::async_trait;
use std::sync::Arc;

use crate::domain::entities::entrypoint::EntrypointRef;
use crate::domain::entities::http_message::{AppRequest, AppResponse};

/// アプリケーションオブジェクト
///
/// プロセスマネージャから転送されたリクエストを処理する
#[async_trait]
pub trait Application: Send + Sync {
    /// リクエストを処理する
    ///
    /// # Errors
    ///
    /// 処理に失敗した場合にエラーを返す（サーバーは500に変換する）
    async fn handle(&self, request: AppRequest) -> Result<AppResponse>;
}

/// アプリケーションレジストリ
///
/// エントリポイント参照からアプリケーションオブジェクトを解決する
pub trait ApplicationRegistry: Send + Sync {
    /// 参照を解決する。登録されていない場合は `None`
    fn resolve(&self, entrypoint: &EntrypointRef) -> Option<Arc<dyn Application>>;

    /// 登録済みのエントリポイント
    fn entrypoints(&self) -> Vec<EntrypointRef>;
}

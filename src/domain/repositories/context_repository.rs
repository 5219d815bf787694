//! # Context Repository Trait
//!
//! ビルドコンテキストの読み取りを抽象化

use anyhow::Result;
use async_trait::async_trait;
use std::path::{Path, PathBuf};

use crate::domain::entities::context_manifest::ContextFilter;

/// イメージへコピーするコンテキスト内のファイル
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContextFile {
    /// コンテキストルートからの相対パス（`/` 区切り）
    pub relative_path: String,
    /// ホスト上の実パス
    pub source: PathBuf,
    /// バイト数
    pub size: u64,
}

/// コンテキストリポジトリ
#[async_trait]
pub trait ContextRepository: Send + Sync {
    /// 依存関係マニフェストを読み込む
    ///
    /// # Arguments
    ///
    /// * `context_root` - ビルドコンテキストのルート
    /// * `manifest_name` - ルートからの相対パス
    ///
    /// # Returns
    ///
    /// ファイルの内容。存在しない場合は `None`
    async fn read_manifest(&self, context_root: &Path, manifest_name: &str)
        -> Result<Option<String>>;

    /// フィルタを通過したファイルを収集する
    ///
    /// # Arguments
    ///
    /// * `context_root` - ビルドコンテキストのルート
    /// * `filter` - include / exclude フィルタ
    ///
    /// # Returns
    ///
    /// 相対パス順に並んだファイルのリスト
    async fn collect_files(
        &self,
        context_root: &Path,
        filter: &ContextFilter,
    ) -> Result<Vec<ContextFile>>;
}

//! # Image Store Trait
//!
//! ビルド済みイメージの永続化を抽象化

use anyhow::Result;
use async_trait::async_trait;
use std::path::PathBuf;

use super::context_repository::ContextFile;
use crate::domain::entities::image_config::ImageConfig;

/// コミット対象のイメージ
#[derive(Debug, Clone)]
pub struct ImageBuild {
    /// イメージ設定（`image.json`）
    pub config: ImageConfig,
    /// ビルド記述子（Dockerfile相当）
    pub descriptor: String,
    /// 作業ディレクトリへコピーするファイル
    pub files: Vec<ContextFile>,
}

/// イメージストア
#[async_trait]
pub trait ImageStore: Send + Sync {
    /// イメージをアトミックにコミットする
    ///
    /// すべての書き込みが成功した場合のみイメージが見えるようになり、
    /// 失敗時には部分的なイメージを残さない
    ///
    /// # Returns
    ///
    /// コミットされたイメージの場所
    async fn commit(&self, build: &ImageBuild) -> Result<PathBuf>;
}

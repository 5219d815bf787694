//! File Context Repository Implementation
//!
//! ContextRepositoryのファイルシステム実装

use anyhow::{Context, Result};
use async_trait::async_trait;
use log::{debug, info, warn};
use std::fs;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

use crate::domain::entities::context_manifest::ContextFilter;
use crate::domain::errors::BuildError;
use crate::domain::repositories::context_repository::{ContextFile, ContextRepository};

/// ファイルシステムベースのコンテキストリポジトリ
pub struct FileContextRepository;

fn relative_path(root: &Path, path: &Path) -> Option<String> {
    let relative = path.strip_prefix(root).ok()?;
    let parts: Vec<String> = relative
        .components()
        .map(|c| c.as_os_str().to_string_lossy().to_string())
        .collect();
    if parts.is_empty() {
        None
    } else {
        Some(parts.join("/"))
    }
}

impl FileContextRepository {
    /// 新しいリポジトリを作成
    pub fn new() -> Self {
        Self
    }

    fn ensure_context(root: &Path) -> Result<()> {
        if !root.is_dir() {
            return Err(BuildError::ContextMissing(root.to_path_buf()).into());
        }
        Ok(())
    }

    /// マニフェストを読み込む（内部実装）
    fn read_manifest_internal(root: &Path, manifest_name: &str) -> Result<Option<String>> {
        Self::ensure_context(root)?;

        let path = root.join(manifest_name);
        if !path.is_file() {
            warn!("Dependency manifest not found: {}", path.display());
            return Ok(None);
        }

        let content = fs::read_to_string(&path)
            .with_context(|| format!("Failed to read dependency manifest: {}", path.display()))?;
        Ok(Some(content))
    }

    /// ファイルを収集する（内部実装）
    ///
    /// 除外されたディレクトリは降りずに枝刈りする。シンボリックリンクは辿らない
    fn collect_files_internal(root: &Path, filter: &ContextFilter) -> Result<Vec<ContextFile>> {
        Self::ensure_context(root)?;

        let mut files = Vec::new();
        let walker = WalkDir::new(root)
            .follow_links(false)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(|entry| match relative_path(root, entry.path()) {
                Some(rel) => !filter.is_excluded(&rel),
                None => true,
            });

        for entry in walker {
            let entry = entry.with_context(|| {
                format!("Failed to read build context under {}", root.display())
            })?;
            let Some(rel) = relative_path(root, entry.path()) else {
                continue;
            };

            let file_type = entry.file_type();
            if file_type.is_symlink() {
                warn!("Skipping symlink in build context: {}", rel);
                continue;
            }
            if !file_type.is_file() {
                continue;
            }
            if !filter.admits(&rel) {
                debug!("Not included: {}", rel);
                continue;
            }

            let size = entry
                .metadata()
                .with_context(|| format!("Failed to stat {}", entry.path().display()))?
                .len();

            files.push(ContextFile {
                relative_path: rel,
                source: entry.path().to_path_buf(),
                size,
            });
        }

        files.sort_by(|a, b| a.relative_path.cmp(&b.relative_path));

        info!(
            "Found {} files to copy from {}",
            files.len(),
            root.display()
        );

        Ok(files)
    }
}

#[async_trait]
impl ContextRepository for FileContextRepository {
    async fn read_manifest(
        &self,
        context_root: &Path,
        manifest_name: &str,
    ) -> Result<Option<String>> {
        let root = PathBuf::from(shellexpand::tilde(&context_root.to_string_lossy()).as_ref());
        let manifest_name = manifest_name.to_string();
        tokio::task::spawn_blocking(move || Self::read_manifest_internal(&root, &manifest_name))
            .await
            .map_err(|e| anyhow::anyhow!("Failed to spawn blocking task: {}", e))?
    }

    async fn collect_files(
        &self,
        context_root: &Path,
        filter: &ContextFilter,
    ) -> Result<Vec<ContextFile>> {
        let root = PathBuf::from(shellexpand::tilde(&context_root.to_string_lossy()).as_ref());
        let filter = filter.clone();
        tokio::task::spawn_blocking(move || Self::collect_files_internal(&root, &filter))
            .await
            .map_err(|e| anyhow::anyhow!("Failed to spawn blocking task: {}", e))?
    }
}

impl Default for FileContextRepository {
    fn default() -> Self {
        Self::new()
    }
}

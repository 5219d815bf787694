//! Directory Image Store Implementation
//!
//! ImageStoreのディレクトリ実装。ステージングディレクトリに書き出してから
//! rename で差し替える

use anyhow::{Context, Result};
use async_trait::async_trait;
use log::{debug, info, warn};
use std::fs;
use std::path::{Path, PathBuf};

use crate::domain::entities::image_recipe::ROOTFS_DIR;
use crate::domain::repositories::image_store::{ImageBuild, ImageStore};

pub const DESCRIPTOR_FILE: &str = "Dockerfile";
pub const CONFIG_FILE: &str = "image.json";

/// 出力ディレクトリへイメージを書き出すストア
pub struct DirectoryImageStore {
    output_dir: PathBuf,
}

impl DirectoryImageStore {
    /// 新しいストアを作成
    ///
    /// # Arguments
    ///
    /// * `output_dir` - イメージの出力先（チルダ展開される）
    pub fn new(output_dir: impl AsRef<Path>) -> Self {
        let expanded = shellexpand::tilde(&output_dir.as_ref().to_string_lossy()).to_string();
        Self {
            output_dir: PathBuf::from(expanded),
        }
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    /// Sibling of the output directory named `.<name>.<kind>-<uuid>`
    fn sibling_dir(&self, kind: &str) -> Result<PathBuf> {
        let name = self
            .output_dir
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .with_context(|| format!("Invalid output directory: {}", self.output_dir.display()))?;
        let parent = match self.output_dir.parent() {
            Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
            _ => PathBuf::from("."),
        };
        Ok(parent.join(format!(".{}.{}-{}", name, kind, uuid::Uuid::new_v4())))
    }

    fn write_image(staging: &Path, build: &ImageBuild) -> Result<()> {
        fs::create_dir_all(staging)
            .with_context(|| format!("Failed to create {}", staging.display()))?;

        fs::write(staging.join(DESCRIPTOR_FILE), &build.descriptor)
            .context("Failed to write build descriptor")?;

        let config_json = serde_json::to_string_pretty(&build.config)
            .context("Failed to serialize image config")?;
        fs::write(staging.join(CONFIG_FILE), config_json).context("Failed to write image config")?;

        let workdir = staging
            .join(ROOTFS_DIR)
            .join(build.config.working_dir.trim_start_matches('/'));
        fs::create_dir_all(&workdir)
            .with_context(|| format!("Failed to create {}", workdir.display()))?;

        for file in &build.files {
            let target = file
                .relative_path
                .split('/')
                .fold(workdir.clone(), |path, part| path.join(part));
            if let Some(parent) = target.parent() {
                fs::create_dir_all(parent)
                    .with_context(|| format!("Failed to create {}", parent.display()))?;
            }
            fs::copy(&file.source, &target).with_context(|| {
                format!(
                    "Failed to copy {} into image",
                    file.source.display()
                )
            })?;
            debug!("Copied {}", file.relative_path);
        }

        Ok(())
    }

    /// ステージングを出力先へ差し替える
    fn swap_into_place(&self, staging: &Path) -> Result<()> {
        if !self.output_dir.exists() {
            return fs::rename(staging, &self.output_dir).with_context(|| {
                format!("Failed to move image into {}", self.output_dir.display())
            });
        }

        let retired = self.sibling_dir("old")?;
        fs::rename(&self.output_dir, &retired).with_context(|| {
            format!("Failed to retire previous image at {}", self.output_dir.display())
        })?;

        if let Err(e) = fs::rename(staging, &self.output_dir) {
            // 旧イメージを戻す
            let _ = fs::rename(&retired, &self.output_dir);
            return Err(e).with_context(|| {
                format!("Failed to move image into {}", self.output_dir.display())
            });
        }

        if let Err(e) = fs::remove_dir_all(&retired) {
            warn!("Failed to remove previous image {}: {}", retired.display(), e);
        }
        Ok(())
    }

    fn commit_internal(&self, build: &ImageBuild) -> Result<PathBuf> {
        let staging = self.sibling_dir("partial")?;
        if let Some(parent) = staging.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }

        let result = Self::write_image(&staging, build).and_then(|_| self.swap_into_place(&staging));
        if let Err(e) = result {
            if staging.exists() {
                if let Err(cleanup) = fs::remove_dir_all(&staging) {
                    warn!(
                        "Failed to clean up staging directory {}: {}",
                        staging.display(),
                        cleanup
                    );
                }
            }
            return Err(e);
        }

        info!(
            "Committed image {} to {}",
            build.config.build_id,
            self.output_dir.display()
        );
        Ok(self.output_dir.clone())
    }
}

#[async_trait]
impl ImageStore for DirectoryImageStore {
    async fn commit(&self, build: &ImageBuild) -> Result<PathBuf> {
        let store = DirectoryImageStore {
            output_dir: self.output_dir.clone(),
        };
        let build = build.clone();
        tokio::task::spawn_blocking(move || store.commit_internal(&build))
            .await
            .map_err(|e| anyhow::anyhow!("Failed to spawn blocking task: {}", e))?
    }
}

//! # Build Image Use Case
//!
//! イメージビルドユースケース

use anyhow::{Context, Result};
use chrono::Utc;
use log::{info, warn};
use std::path::PathBuf;
use std::sync::Arc;

use crate::application::dto::build_request::BuildRequest;
use crate::domain::entities::dependency_manifest::{DependencyManifest, Requirement};
use crate::domain::entities::image_config::{ImageConfig, ResolvedPackage};
use crate::domain::errors::{BuildError, UnresolvedDependency};
use crate::domain::repositories::context_repository::{ContextFile, ContextRepository};
use crate::domain::repositories::image_store::{ImageBuild, ImageStore};
use crate::domain::repositories::package_index::PackageIndex;
use crate::domain::services::descriptor_renderer::DescriptorRenderer;
use crate::domain::services::version_selection::VersionSelectionService;

/// ビルド結果のサマリー
#[derive(Debug, Clone)]
pub struct BuildSummary {
    /// ビルドID
    pub build_id: String,
    /// コミットされたイメージの場所（ドライランでは `None`）
    pub image_path: Option<PathBuf>,
    /// 解決済みパッケージ
    pub packages: Vec<ResolvedPackage>,
    /// イメージに含まれるファイル数
    pub file_count: usize,
    /// ビルド記述子
    pub descriptor: String,
    /// イメージ設定
    pub config: ImageConfig,
}

/// イメージビルドユースケース
///
/// マニフェストの検証、依存関係の解決、コンテキストの収集を行い、
/// すべて成功した場合のみイメージをコミットする
pub struct BuildImageUseCase<C: ContextRepository, P: PackageIndex, S: ImageStore> {
    context_repository: Arc<C>,
    package_index: Arc<P>,
    image_store: Arc<S>,
}

impl<C: ContextRepository, P: PackageIndex, S: ImageStore> BuildImageUseCase<C, P, S> {
    /// 新しいユースケースを作成
    ///
    /// # Arguments
    ///
    /// * `context_repository` - コンテキストリポジトリ
    /// * `package_index` - パッケージインデックス
    /// * `image_store` - イメージストア
    pub fn new(context_repository: Arc<C>, package_index: Arc<P>, image_store: Arc<S>) -> Self {
        Self {
            context_repository,
            package_index,
            image_store,
        }
    }

    /// イメージをビルドする
    ///
    /// # Arguments
    ///
    /// * `request` - ビルドリクエスト
    ///
    /// # Returns
    ///
    /// ビルド結果のサマリー
    ///
    /// # Errors
    ///
    /// レシピが不正、マニフェストが存在しない、依存関係が解決できない、
    /// エントリポイントのモジュールがコンテキストに無い場合に `BuildError` を返す
    pub async fn execute(&self, request: &BuildRequest) -> Result<BuildSummary> {
        let recipe = &request.recipe;
        recipe.validate()?;

        let content = self
            .context_repository
            .read_manifest(&request.context_dir, &recipe.dependency_manifest)
            .await?
            .ok_or_else(|| {
                BuildError::ManifestMissing(request.context_dir.join(&recipe.dependency_manifest))
            })?;

        let manifest = DependencyManifest::parse(&content).map_err(BuildError::from)?;
        info!(
            "Parsed {} requirements from {}",
            manifest.len(),
            recipe.dependency_manifest
        );
        for option in &manifest.options {
            warn!("Ignoring manifest option line: {}", option);
        }

        let packages = self.resolve_all(&manifest).await?;

        let mut filter = recipe
            .context
            .compile()
            .context("Failed to compile build context patterns")?;
        if let Some(output) = &request.output_in_context {
            info!("Excluding output directory {} from build context", output);
            filter = filter
                .exclude_output(output)
                .context("Failed to exclude output directory from build context")?;
        }
        let files = self
            .context_repository
            .collect_files(&request.context_dir, &filter)
            .await?;
        info!("Collected {} files from build context", files.len());

        let manifest_path = recipe.manifest_path();
        if !files.iter().any(|f| f.relative_path == manifest_path) {
            return Err(BuildError::ManifestExcluded(manifest_path).into());
        }

        if request.verify_entrypoint_source {
            check_entrypoint_source(request, &files)?;
        }

        let descriptor = DescriptorRenderer::render(recipe);
        let config = ImageConfig {
            build_id: uuid::Uuid::new_v4().to_string(),
            created: Utc::now(),
            build_host: hostname::get()
                .unwrap_or_else(|_| "unknown".into())
                .to_string_lossy()
                .to_string(),
            base_image: recipe.base_image.clone(),
            system_packages: recipe.system_packages.clone(),
            packages: packages.iter().map(|p| p.pin_spec()).collect(),
            env: recipe.env.to_key_value_list(),
            working_dir: recipe.working_dir.clone(),
            exposed_ports: vec![recipe.exposed_port_spec()],
            cmd: recipe.command(),
            request_timeout_secs: recipe.request_timeout.as_secs(),
            entrypoint: recipe.entrypoint.to_string(),
            file_count: files.len(),
        };

        let file_count = files.len();
        let build = ImageBuild {
            config: config.clone(),
            descriptor: descriptor.clone(),
            files,
        };

        let image_path = if request.dry_run {
            info!("Dry run: skipping image commit");
            None
        } else {
            Some(self.image_store.commit(&build).await?)
        };

        Ok(BuildSummary {
            build_id: config.build_id.clone(),
            image_path,
            packages,
            file_count,
            descriptor,
            config,
        })
    }

    /// すべての要求を解決する
    ///
    /// 解決できなかった要求はマニフェスト順にまとめて報告する
    async fn resolve_all(&self, manifest: &DependencyManifest) -> Result<Vec<ResolvedPackage>> {
        let mut resolved = Vec::with_capacity(manifest.len());
        let mut unresolved = Vec::new();

        for requirement in &manifest.requirements {
            match self.resolve_one(requirement).await? {
                Ok(package) => resolved.push(package),
                Err(reason) => {
                    warn!("Cannot resolve {}: {}", requirement, reason);
                    unresolved.push(UnresolvedDependency {
                        requirement: requirement.raw.clone(),
                        reason,
                    });
                }
            }
        }

        if !unresolved.is_empty() {
            return Err(BuildError::UnresolvedDependencies(unresolved).into());
        }

        Ok(resolved)
    }

    /// 1つの要求を解決する
    ///
    /// 外側の `Result` はインデックスとの通信エラー、内側は解決の可否
    async fn resolve_one(
        &self,
        requirement: &Requirement,
    ) -> Result<std::result::Result<ResolvedPackage, String>> {
        if let Some(url) = &requirement.url {
            return Ok(Ok(ResolvedPackage::direct(&requirement.name, url)));
        }

        let releases = self
            .package_index
            .releases(&requirement.name)
            .await
            .with_context(|| format!("Failed to query package index for {}", requirement.name))?;

        let Some(releases) = releases else {
            return Ok(Err("not found in package index".to_string()));
        };

        match VersionSelectionService::select(requirement, &releases) {
            Some(version) => Ok(Ok(ResolvedPackage::pinned(
                &requirement.name,
                version.as_str(),
            ))),
            None => Ok(Err(format!(
                "no version satisfies '{}'",
                requirement
                    .specifiers
                    .iter()
                    .map(|s| s.to_string())
                    .collect::<Vec<_>>()
                    .join(",")
            ))),
        }
    }
}

fn check_entrypoint_source(request: &BuildRequest, files: &[ContextFile]) -> Result<(), BuildError> {
    let entrypoint = &request.recipe.entrypoint;
    let candidates: Vec<String> = entrypoint
        .module_source_candidates()
        .iter()
        .map(|p| p.to_string_lossy().replace('\\', "/"))
        .collect();

    if files
        .iter()
        .any(|f| candidates.iter().any(|c| *c == f.relative_path))
    {
        return Ok(());
    }

    Err(BuildError::EntrypointSourceMissing {
        module: entrypoint.module().to_string(),
        expected: candidates.join(" or "),
    })
}

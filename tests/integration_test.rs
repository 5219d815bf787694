//! Integration tests for the image build
//!
//! fixtures/context をビルドコンテキストとして、オフラインカタログで依存関係を解決する

use finchat_bootstrap::adapter::config::Config;
use finchat_bootstrap::domain::entities::image_config::ImageConfig;
use finchat_bootstrap::domain::errors::BuildError;
use finchat_bootstrap::driver::cli::BuildArgs;
use finchat_bootstrap::driver::workflow::{exit_code_for, BuildWorkflow, EXIT_FAILURE};
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// Get the path to test fixtures
fn fixtures_path() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
}

fn build_args(context: &Path, output: &Path) -> BuildArgs {
    BuildArgs {
        context: context.to_string_lossy().to_string(),
        output: output.to_string_lossy().to_string(),
        offline_index: Some(
            fixtures_path()
                .join("package_index.json")
                .to_string_lossy()
                .to_string(),
        ),
        dry_run: false,
    }
}

/// fixtures/context を一時ディレクトリへ複製する
fn copy_context(dest: &Path) {
    let src = fixtures_path().join("context");
    for entry in walkdir::WalkDir::new(&src) {
        let entry = entry.unwrap();
        let rel = entry.path().strip_prefix(&src).unwrap();
        let target = dest.join(rel);
        if entry.file_type().is_dir() {
            fs::create_dir_all(&target).unwrap();
        } else {
            fs::copy(entry.path(), &target).unwrap();
        }
    }
}

#[test]
fn test_fixture_context_exists() {
    let context = fixtures_path().join("context");
    assert!(context.join("Flask_Server.py").is_file());
    assert!(context.join("requirements.txt").is_file());
    assert!(fixtures_path().join("package_index.json").is_file());
}

#[tokio::test]
async fn test_build_writes_image() {
    let temp_dir = TempDir::new().unwrap();
    let output = temp_dir.path().join("image");
    let args = build_args(&fixtures_path().join("context"), &output);

    let summary = BuildWorkflow::new(Config::default())
        .execute(&args)
        .await
        .unwrap();

    assert_eq!(summary.image_path.as_deref(), Some(output.as_path()));
    assert_eq!(summary.file_count, 4);

    let descriptor = fs::read_to_string(output.join("Dockerfile")).unwrap();
    assert!(descriptor.starts_with("FROM python:3.10-slim\n"));
    assert!(descriptor.contains("ENV PYTHONUNBUFFERED=1\n"));
    assert!(descriptor.contains("ENV GOOGLE_APPLICATION_CREDENTIALS=/app/credentials.json\n"));
    assert!(descriptor.contains("EXPOSE 8085\n"));
    let copies: Vec<&str> = descriptor
        .lines()
        .filter(|l| l.starts_with("COPY"))
        .collect();
    assert_eq!(
        copies,
        vec![
            "COPY rootfs/app/requirements.txt requirements.txt",
            "COPY rootfs/app/ /app/",
        ]
    );

    let config: ImageConfig =
        serde_json::from_str(&fs::read_to_string(output.join("image.json")).unwrap()).unwrap();
    assert_eq!(config.env_value("PYTHONUNBUFFERED"), Some("1"));
    assert_eq!(
        config.env_value("GOOGLE_APPLICATION_CREDENTIALS"),
        Some("/app/credentials.json")
    );
    assert_eq!(config.exposed_ports, vec!["8085/tcp".to_string()]);
    assert_eq!(config.request_timeout_secs, 300);
    assert_eq!(config.entrypoint, "Flask_Server:app");
    assert_eq!(
        config.packages,
        vec![
            "flask==3.0.0",
            "flask-cors==4.0.0",
            "gunicorn==21.2.0",
            "openai==1.3.7",
            "google-cloud-bigquery==3.13.0",
            "yfinance==0.2.31",
        ]
    );

    let workdir = output.join("rootfs/app");
    assert!(workdir.join("Flask_Server.py").is_file());
    assert!(workdir.join("requirements.txt").is_file());
    assert!(workdir.join("Server/ticker_data.py").is_file());
    // 資格情報はランタイムにマウントされる
    assert!(!workdir.join("credentials.json").exists());
}

#[tokio::test]
async fn test_dry_run_writes_nothing() {
    let temp_dir = TempDir::new().unwrap();
    let output = temp_dir.path().join("image");
    let mut args = build_args(&fixtures_path().join("context"), &output);
    args.dry_run = true;

    let summary = BuildWorkflow::new(Config::default())
        .execute(&args)
        .await
        .unwrap();

    assert!(summary.image_path.is_none());
    assert!(summary.descriptor.contains("Flask_Server:app"));
    assert!(!output.exists());
}

#[tokio::test]
async fn test_missing_manifest_fails_build() {
    let temp_dir = TempDir::new().unwrap();
    let context = temp_dir.path().join("context");
    copy_context(&context);
    fs::remove_file(context.join("requirements.txt")).unwrap();
    let output = temp_dir.path().join("image");

    let err = BuildWorkflow::new(Config::default())
        .execute(&build_args(&context, &output))
        .await
        .unwrap_err();

    assert!(matches!(
        err.downcast_ref::<BuildError>(),
        Some(BuildError::ManifestMissing(_))
    ));
    assert_eq!(exit_code_for(&err), EXIT_FAILURE);
    assert!(!output.exists());
}

#[tokio::test]
async fn test_unresolvable_dependency_fails_build() {
    let temp_dir = TempDir::new().unwrap();
    let context = temp_dir.path().join("context");
    copy_context(&context);
    fs::write(
        context.join("requirements.txt"),
        "flask>=2.3\nfinchat-private-sdk==1.0\nopenai>=5\n",
    )
    .unwrap();
    let output = temp_dir.path().join("image");

    let err = BuildWorkflow::new(Config::default())
        .execute(&build_args(&context, &output))
        .await
        .unwrap_err();

    match err.downcast_ref::<BuildError>() {
        Some(BuildError::UnresolvedDependencies(unresolved)) => {
            let names: Vec<&str> = unresolved.iter().map(|u| u.requirement.as_str()).collect();
            assert_eq!(names, vec!["finchat-private-sdk==1.0", "openai>=5"]);
        }
        other => panic!("unexpected error: {:?}", other),
    }
    assert!(!output.exists());
}

#[tokio::test]
async fn test_entrypoint_module_must_be_in_context() {
    let temp_dir = TempDir::new().unwrap();
    let context = temp_dir.path().join("context");
    copy_context(&context);
    fs::remove_file(context.join("Flask_Server.py")).unwrap();
    let output = temp_dir.path().join("image");

    let err = BuildWorkflow::new(Config::default())
        .execute(&build_args(&context, &output))
        .await
        .unwrap_err();

    assert!(matches!(
        err.downcast_ref::<BuildError>(),
        Some(BuildError::EntrypointSourceMissing { .. })
    ));
    assert!(!output.exists());
}

#[tokio::test]
async fn test_context_manifest_from_config() {
    let temp_dir = TempDir::new().unwrap();
    let config_path = temp_dir.path().join("config.json");
    fs::write(
        &config_path,
        r#"{
  "image": {
    "context": { "include": ["*.py", "requirements.txt"], "exclude": ["Server"] }
  }
}"#,
    )
    .unwrap();
    let config = Config::load(config_path.to_str().unwrap()).unwrap();
    let output = temp_dir.path().join("image");

    let summary = BuildWorkflow::new(config)
        .execute(&build_args(&fixtures_path().join("context"), &output))
        .await
        .unwrap();

    assert_eq!(summary.file_count, 2);
    assert!(output.join("rootfs/app/Flask_Server.py").is_file());
    assert!(!output.join("rootfs/app/Server").exists());
}

#[tokio::test]
async fn test_rebuild_replaces_image() {
    let temp_dir = TempDir::new().unwrap();
    let output = temp_dir.path().join("image");
    let args = build_args(&fixtures_path().join("context"), &output);
    let workflow = BuildWorkflow::new(Config::default());

    let first = workflow.execute(&args).await.unwrap();
    let second = workflow.execute(&args).await.unwrap();

    let config: ImageConfig =
        serde_json::from_str(&fs::read_to_string(output.join("image.json")).unwrap()).unwrap();
    assert_ne!(first.build_id, second.build_id);
    assert_eq!(config.build_id, second.build_id);
}

#[tokio::test]
async fn test_rebuild_with_output_inside_context() {
    let temp_dir = TempDir::new().unwrap();
    let context = temp_dir.path().join("context");
    copy_context(&context);
    let output = context.join("build").join("image");
    let args = build_args(&context, &output);
    let workflow = BuildWorkflow::new(Config::default());

    let first = workflow.execute(&args).await.unwrap();
    let second = workflow.execute(&args).await.unwrap();

    assert_eq!(first.file_count, 4);
    assert_eq!(second.file_count, 4);
    assert!(output.join("rootfs/app/Flask_Server.py").is_file());
    assert!(!output.join("rootfs/app/build").exists());
}

#[tokio::test]
async fn test_manifest_excluded_by_context_fails_build() {
    let temp_dir = TempDir::new().unwrap();
    let config_path = temp_dir.path().join("config.json");
    fs::write(
        &config_path,
        r#"{ "image": { "context": { "include": ["*.py"] } } }"#,
    )
    .unwrap();
    let config = Config::load(config_path.to_str().unwrap()).unwrap();
    let output = temp_dir.path().join("image");

    let err = BuildWorkflow::new(config)
        .execute(&build_args(&fixtures_path().join("context"), &output))
        .await
        .unwrap_err();

    assert!(matches!(
        err.downcast_ref::<BuildError>(),
        Some(BuildError::ManifestExcluded(_))
    ));
    assert!(!output.exists());
}

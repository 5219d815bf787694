//! # Domain Errors
//!
//! ビルド時・起動時の致命的エラーの分類

use std::path::PathBuf;
use thiserror::Error;

/// エントリポイント参照の解析エラー
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EntrypointError {
    #[error("entrypoint is empty")]
    Empty,

    #[error("entrypoint '{0}' must have the form module:attribute")]
    MissingSeparator(String),

    #[error("entrypoint '{0}' contains more than one ':'")]
    TooManySeparators(String),

    #[error("invalid module path '{0}'")]
    InvalidModule(String),

    #[error("invalid attribute name '{0}'")]
    InvalidAttribute(String),
}

/// 依存関係マニフェストの解析エラー
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ManifestError {
    #[error("line {line}: cannot parse requirement '{content}'")]
    InvalidLine { line: usize, content: String },

    #[error("line {line}: invalid version specifier '{specifier}'")]
    InvalidSpecifier { line: usize, specifier: String },
}

/// 解決できなかった依存関係
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnresolvedDependency {
    /// マニフェストに書かれた要求（原文）
    pub requirement: String,
    /// 解決できなかった理由
    pub reason: String,
}

impl std::fmt::Display for UnresolvedDependency {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({})", self.requirement, self.reason)
    }
}

fn join_unresolved(items: &[UnresolvedDependency]) -> String {
    items
        .iter()
        .map(|u| u.to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

/// ビルド時エラー
///
/// いずれもイメージのビルドを中断し、部分的なイメージは残らない
#[derive(Error, Debug)]
pub enum BuildError {
    #[error("invalid image recipe: {0}")]
    InvalidRecipe(String),

    #[error("dependency manifest not found: {}", .0.display())]
    ManifestMissing(PathBuf),

    #[error("dependency manifest is invalid: {0}")]
    ManifestInvalid(#[from] ManifestError),

    #[error("unresolvable dependencies: {}", join_unresolved(.0))]
    UnresolvedDependencies(Vec<UnresolvedDependency>),

    #[error("dependency manifest '{0}' is excluded by the context manifest")]
    ManifestExcluded(String),

    #[error("entrypoint module '{module}' not found in build context (expected {expected})")]
    EntrypointSourceMissing { module: String, expected: String },

    #[error("build context not found: {}", .0.display())]
    ContextMissing(PathBuf),
}

/// 起動時エラー
///
/// プロセスは即座に非ゼロで終了する（リトライなし）
#[derive(Error, Debug)]
pub enum StartupError {
    #[error(transparent)]
    InvalidEntrypoint(#[from] EntrypointError),

    #[error("entrypoint module '{module}' not found under {}", .app_root.display())]
    ModuleNotFound { module: String, app_root: PathBuf },

    #[error("application object '{0}' is not registered")]
    ApplicationNotFound(String),

    #[error("request timeout must be greater than zero")]
    InvalidTimeout,

    #[error("invalid bind address '{addr}': {source}")]
    InvalidBind {
        addr: String,
        #[source]
        source: std::net::AddrParseError,
    },

    #[error("invalid runtime environment: {0}")]
    InvalidEnvironment(String),

    #[error("failed to bind {addr}: {source}")]
    Bind {
        addr: String,
        #[source]
        source: std::io::Error,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unresolved_dependencies_message_lists_all() {
        let err = BuildError::UnresolvedDependencies(vec![
            UnresolvedDependency {
                requirement: "flask==99.0".to_string(),
                reason: "no matching version".to_string(),
            },
            UnresolvedDependency {
                requirement: "not-a-package".to_string(),
                reason: "not found in index".to_string(),
            },
        ]);

        let message = err.to_string();
        assert!(message.contains("flask==99.0 (no matching version)"));
        assert!(message.contains("not-a-package (not found in index)"));
    }

    #[test]
    fn test_manifest_missing_message() {
        let err = BuildError::ManifestMissing(PathBuf::from("/ctx/requirements.txt"));
        assert_eq!(
            err.to_string(),
            "dependency manifest not found: /ctx/requirements.txt"
        );
    }
}

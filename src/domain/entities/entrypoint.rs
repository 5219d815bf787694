//! # EntrypointRef Value Object
//!
//! `module:attribute` 形式のアプリケーション参照

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use crate::domain::errors::EntrypointError;

/// デフォルトのエントリポイント
pub const DEFAULT_ENTRYPOINT: &str = "Flask_Server:app";

/// エントリポイント参照
///
/// モジュールパスとエクスポートされたオブジェクト名の組。
/// 文字列から生成する時点で検証されるため、保持している値は常に有効
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct EntrypointRef {
    module: String,
    attribute: String,
}

fn is_identifier(s: &str) -> bool {
    let mut chars = s.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

impl EntrypointRef {
    /// 文字列を解析してエントリポイント参照を作成します。
    ///
    /// # 例
    ///
    /// ```
    /// use finchat_bootstrap::domain::entities::entrypoint::EntrypointRef;
    ///
    /// let ep = EntrypointRef::parse("Flask_Server:app").unwrap();
    /// assert_eq!(ep.module(), "Flask_Server");
    /// assert_eq!(ep.attribute(), "app");
    ///
    /// assert!(EntrypointRef::parse("Flask_Server").is_err());
    /// assert!(EntrypointRef::parse("1module:app").is_err());
    /// ```
    pub fn parse(value: &str) -> Result<Self, EntrypointError> {
        let value = value.trim();
        if value.is_empty() {
            return Err(EntrypointError::Empty);
        }

        let mut parts = value.split(':');
        let module = parts.next().unwrap_or_default();
        let attribute = parts
            .next()
            .ok_or_else(|| EntrypointError::MissingSeparator(value.to_string()))?;
        if parts.next().is_some() {
            return Err(EntrypointError::TooManySeparators(value.to_string()));
        }

        if module.is_empty() || !module.split('.').all(is_identifier) {
            return Err(EntrypointError::InvalidModule(module.to_string()));
        }
        if !is_identifier(attribute) {
            return Err(EntrypointError::InvalidAttribute(attribute.to_string()));
        }

        Ok(Self {
            module: module.to_string(),
            attribute: attribute.to_string(),
        })
    }

    /// モジュールパス（ドット区切り）
    pub fn module(&self) -> &str {
        &self.module
    }

    /// エクスポートされたオブジェクト名
    pub fn attribute(&self) -> &str {
        &self.attribute
    }

    /// モジュールのソースとして認められる相対パスの候補
    ///
    /// `a.b` なら `a/b.py` と `a/b/__init__.py`
    pub fn module_source_candidates(&self) -> [PathBuf; 2] {
        let base: PathBuf = self.module.split('.').collect();
        [base.with_extension("py"), base.join("__init__.py")]
    }
}

impl fmt::Display for EntrypointRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.module, self.attribute)
    }
}

impl FromStr for EntrypointRef {
    type Err = EntrypointError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl Default for EntrypointRef {
    fn default() -> Self {
        Self {
            module: "Flask_Server".to_string(),
            attribute: "app".to_string(),
        }
    }
}

impl Serialize for EntrypointRef {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for EntrypointRef {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Self::parse(&raw).map_err(serde::de::Error::custom)
    }
}

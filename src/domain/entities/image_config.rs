//! # ImageConfig Entity
//!
//! ビルド済みイメージを記述する設定ドキュメント（`image.json`）

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// 解決済みパッケージ
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct ResolvedPackage {
    /// 正規化済みパッケージ名
    pub name: String,
    /// 選択されたバージョン（直接参照の場合は `None`）
    pub version: Option<String>,
    /// 直接参照URL
    pub url: Option<String>,
}

impl ResolvedPackage {
    /// インデックスから解決したパッケージ
    pub fn pinned(name: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            version: Some(version.into()),
            url: None,
        }
    }

    /// 直接参照のパッケージ
    pub fn direct(name: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            version: None,
            url: Some(url.into()),
        }
    }

    /// `name==version` または `name @ url`
    pub fn pin_spec(&self) -> String {
        match (&self.version, &self.url) {
            (Some(v), _) => format!("{}=={}", self.name, v),
            (None, Some(u)) => format!("{} @ {}", self.name, u),
            (None, None) => self.name.clone(),
        }
    }
}

/// イメージ設定
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct ImageConfig {
    pub build_id: String,
    pub created: DateTime<Utc>,
    pub build_host: String,
    pub base_image: String,
    pub system_packages: Vec<String>,
    pub packages: Vec<String>,
    pub env: Vec<String>,
    pub working_dir: String,
    pub exposed_ports: Vec<String>,
    pub cmd: Vec<String>,
    pub request_timeout_secs: u64,
    pub entrypoint: String,
    pub file_count: usize,
}

impl ImageConfig {
    /// 環境変数の値を取得
    pub fn env_value(&self, key: &str) -> Option<&str> {
        self.env.iter().find_map(|kv| {
            kv.split_once('=')
                .filter(|(k, _)| *k == key)
                .map(|(_, v)| v)
        })
    }
}

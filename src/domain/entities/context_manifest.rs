//! # ContextManifest Entity
//!
//! ビルドコンテキストの include / exclude マニフェスト
//!
//! イメージへコピーするファイルを明示的に絞り込む。
//! パターンは `/` 区切りの相対パスに対するglob:
//!
//! - `*` はセグメント内の任意の文字列、`?` は任意の1文字
//! - `**` はセグメントをまたぐ任意の文字列
//! - `/` を含まないパターンは任意の深さでマッチする
//! - ディレクトリにマッチしたパターンはその配下すべてにマッチする

use regex::Regex;
use serde::{Deserialize, Serialize};

/// デフォルトで除外するパターン
///
/// 資格情報はランタイムにマウントする前提のため、イメージには含めない
pub const DEFAULT_EXCLUDES: &[&str] = &[
    ".git",
    ".env",
    "credentials.json",
    "__pycache__",
    "*.pyc",
    ".venv",
    "target",
    "*.key",
    "*.pem",
];

fn default_include() -> Vec<String> {
    vec!["**".to_string()]
}

fn default_exclude() -> Vec<String> {
    DEFAULT_EXCLUDES.iter().map(|s| s.to_string()).collect()
}

/// コンテキストマニフェスト（設定値）
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct ContextManifest {
    #[serde(default = "default_include")]
    pub include: Vec<String>,
    #[serde(default = "default_exclude")]
    pub exclude: Vec<String>,
}

impl Default for ContextManifest {
    fn default() -> Self {
        Self {
            include: default_include(),
            exclude: default_exclude(),
        }
    }
}

impl ContextManifest {
    /// パターンをコンパイルしてフィルタを作成
    pub fn compile(&self) -> Result<ContextFilter, regex::Error> {
        let include = self
            .include
            .iter()
            .filter_map(|p| glob_to_regex(p))
            .map(|r| Regex::new(&r))
            .collect::<Result<Vec<_>, _>>()?;
        let exclude = self
            .exclude
            .iter()
            .filter_map(|p| glob_to_regex(p))
            .map(|r| Regex::new(&r))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(ContextFilter { include, exclude })
    }
}

/// globパターンを正規表現に変換する
///
/// 空のパターンは `None`
fn glob_to_regex(pattern: &str) -> Option<String> {
    let pattern = pattern.trim();
    let pattern = pattern.strip_prefix("./").unwrap_or(pattern);
    let anchored = pattern.starts_with('/');
    let pattern = pattern.trim_matches('/');
    if pattern.is_empty() {
        return None;
    }

    let mut regex = String::from("^");
    if !anchored && !pattern.contains('/') {
        regex.push_str("(?:.*/)?");
    }

    let chars: Vec<char> = pattern.chars().collect();
    let mut i = 0;
    while i < chars.len() {
        match chars[i] {
            '*' if chars.get(i + 1) == Some(&'*') => {
                if chars.get(i + 2) == Some(&'/') {
                    regex.push_str("(?:.*/)?");
                    i += 3;
                } else {
                    regex.push_str(".*");
                    i += 2;
                }
            }
            '*' => {
                regex.push_str("[^/]*");
                i += 1;
            }
            '?' => {
                regex.push_str("[^/]");
                i += 1;
            }
            c => {
                regex.push_str(&regex::escape(&c.to_string()));
                i += 1;
            }
        }
    }

    regex.push_str("(?:/.*)?$");
    Some(regex)
}

/// コンパイル済みのコンテキストフィルタ
#[derive(Debug, Clone)]
pub struct ContextFilter {
    include: Vec<Regex>,
    exclude: Vec<Regex>,
}

impl ContextFilter {
    /// 相対パスがイメージに含まれるか
    ///
    /// include のいずれかにマッチし、exclude のどれにもマッチしない場合のみ `true`
    pub fn admits(&self, relative_path: &str) -> bool {
        let path = normalize(relative_path);
        self.include.iter().any(|r| r.is_match(&path)) && !self.is_excluded(&path)
    }

    /// コンテキスト内に置かれた出力ディレクトリを除外する
    ///
    /// 出力そのものに加え、同じ親に作られる `.<name>.*` の作業用ディレクトリも除外する
    pub fn exclude_output(mut self, relative_output: &str) -> Result<Self, regex::Error> {
        let output = normalize(relative_output);
        let output = output.trim_end_matches('/');
        if output.is_empty() {
            return Ok(self);
        }

        let (parent, name) = match output.rsplit_once('/') {
            Some((parent, name)) => (format!("{}/", regex::escape(parent)), name),
            None => (String::new(), output),
        };
        self.exclude
            .push(Regex::new(&format!("^{}(?:/.*)?$", regex::escape(output)))?);
        self.exclude.push(Regex::new(&format!(
            r"^{}\.{}\.[^/]*(?:/.*)?$",
            parent,
            regex::escape(name)
        ))?);
        Ok(self)
    }

    /// 相対パスが除外対象か（ディレクトリの枝刈りに使用）
    pub fn is_excluded(&self, relative_path: &str) -> bool {
        let path = normalize(relative_path);
        self.exclude.iter().any(|r| r.is_match(&path))
    }
}

fn normalize(path: &str) -> String {
    let path = path.replace('\\', "/");
    path.trim_start_matches("./").trim_start_matches('/').to_string()
}

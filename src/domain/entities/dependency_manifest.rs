//! # DependencyManifest Entity
//!
//! 言語レベルの依存関係マニフェスト（requirements形式）

use std::fmt;

use super::version::VersionSpecifier;
use crate::domain::errors::ManifestError;

/// デフォルトのマニフェストファイル名
pub const DEFAULT_MANIFEST: &str = "requirements.txt";

/// パッケージ名を正規化する
///
/// 小文字化し、`-` `_` `.` の連続を `-` 1文字にまとめる
pub fn normalize_name(name: &str) -> String {
    let mut normalized = String::with_capacity(name.len());
    let mut in_separator = false;
    for c in name.trim().chars() {
        if matches!(c, '-' | '_' | '.') {
            in_separator = true;
            continue;
        }
        if in_separator && !normalized.is_empty() {
            normalized.push('-');
        }
        in_separator = false;
        normalized.push(c.to_ascii_lowercase());
    }
    normalized
}

fn is_name_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.')
}

/// マニフェストの1要求
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Requirement {
    /// 正規化済みパッケージ名
    pub name: String,
    /// extras（例: `requests[security]`）
    pub extras: Vec<String>,
    /// バージョン指定子
    pub specifiers: Vec<VersionSpecifier>,
    /// 環境マーカー（記録のみ、評価はしない）
    pub marker: Option<String>,
    /// 直接参照URL（`name @ url`）
    pub url: Option<String>,
    /// 元の行（コメント除去後）
    pub raw: String,
    /// 1始まりの行番号
    pub line: usize,
}

impl Requirement {
    /// 1行を解析する
    pub fn parse(text: &str, line: usize) -> Result<Self, ManifestError> {
        let raw = text.trim().to_string();
        let invalid = || ManifestError::InvalidLine {
            line,
            content: raw.clone(),
        };

        let (body, marker) = match raw.split_once(';') {
            Some((body, marker)) => (body.trim(), Some(marker.trim().to_string())),
            None => (raw.as_str(), None),
        };

        let name_len = body.find(|c: char| !is_name_char(c)).unwrap_or(body.len());
        let name = &body[..name_len];
        if name.is_empty() || !name.starts_with(|c: char| c.is_ascii_alphanumeric()) {
            return Err(invalid());
        }

        let mut rest = body[name_len..].trim_start();

        let mut extras = Vec::new();
        if let Some(after) = rest.strip_prefix('[') {
            let (inside, tail) = after.split_once(']').ok_or_else(invalid)?;
            for extra in inside.split(',') {
                let extra = extra.trim();
                if extra.is_empty() || !extra.chars().all(is_name_char) {
                    return Err(invalid());
                }
                extras.push(normalize_name(extra));
            }
            rest = tail.trim_start();
        }

        if let Some(url) = rest.strip_prefix('@') {
            let url = url.trim();
            if url.is_empty() {
                return Err(invalid());
            }
            return Ok(Self {
                name: normalize_name(name),
                extras,
                specifiers: Vec::new(),
                marker,
                url: Some(url.to_string()),
                raw,
                line,
            });
        }

        // `name (>=1.0)` 形式の括弧を許容
        let rest = rest
            .strip_prefix('(')
            .and_then(|r| r.strip_suffix(')'))
            .unwrap_or(rest)
            .trim();

        let mut specifiers = Vec::new();
        if !rest.is_empty() {
            for part in rest.split(',') {
                let specifier = VersionSpecifier::parse(part).ok_or_else(|| {
                    ManifestError::InvalidSpecifier {
                        line,
                        specifier: part.trim().to_string(),
                    }
                })?;
                specifiers.push(specifier);
            }
        }

        Ok(Self {
            name: normalize_name(name),
            extras,
            specifiers,
            marker,
            url: None,
            raw,
            line,
        })
    }
}

impl fmt::Display for Requirement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

/// 依存関係マニフェスト
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DependencyManifest {
    /// 記述順の要求
    pub requirements: Vec<Requirement>,
    /// `-` で始まるオプション行（解釈しない）
    pub options: Vec<String>,
}

fn strip_comment(line: &str) -> &str {
    if line.trim_start().starts_with('#') {
        return "";
    }
    // 空白の直後の `#` 以降がコメント（URLフラグメントは残す）
    let bytes = line.as_bytes();
    for (i, b) in bytes.iter().enumerate() {
        if *b == b'#' && i > 0 && bytes[i - 1].is_ascii_whitespace() {
            return &line[..i];
        }
    }
    line
}

impl DependencyManifest {
    /// マニフェスト全体を解析します。
    ///
    /// # 例
    ///
    /// ```
    /// use finchat_bootstrap::domain::entities::dependency_manifest::DependencyManifest;
    ///
    /// let manifest = DependencyManifest::parse(
    ///     "# server\nFlask==3.0.0\ngunicorn>=21  # process manager\n\n--no-cache-dir\n",
    /// )
    /// .unwrap();
    ///
    /// assert_eq!(manifest.requirements.len(), 2);
    /// assert_eq!(manifest.requirements[0].name, "flask");
    /// assert_eq!(manifest.options, vec!["--no-cache-dir".to_string()]);
    /// ```
    pub fn parse(content: &str) -> Result<Self, ManifestError> {
        let mut manifest = DependencyManifest::default();
        let mut pending = String::new();
        let mut pending_line = 0;

        for (index, line) in content.lines().enumerate() {
            let line_no = index + 1;
            let stripped = strip_comment(line);

            if pending.is_empty() {
                pending_line = line_no;
            }

            // 行末の `\` は次の行と結合
            if let Some(continued) = stripped.trim_end().strip_suffix('\\') {
                pending.push_str(continued);
                pending.push(' ');
                continue;
            }
            pending.push_str(stripped);

            let logical = pending.trim().to_string();
            pending.clear();

            if logical.is_empty() {
                continue;
            }
            if logical.starts_with('-') {
                manifest.options.push(logical);
                continue;
            }

            manifest
                .requirements
                .push(Requirement::parse(&logical, pending_line)?);
        }

        let trailing = pending.trim();
        if !trailing.is_empty() {
            if trailing.starts_with('-') {
                manifest.options.push(trailing.to_string());
            } else {
                manifest
                    .requirements
                    .push(Requirement::parse(trailing, pending_line)?);
            }
        }

        Ok(manifest)
    }

    /// 要求の数
    pub fn len(&self) -> usize {
        self.requirements.len()
    }

    /// 要求が空かどうか
    pub fn is_empty(&self) -> bool {
        self.requirements.is_empty()
    }
}

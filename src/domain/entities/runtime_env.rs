//! # RuntimeEnvironment Value Object
//!
//! イメージのビルド時に設定され、コンテナの生存期間中は一定の環境変数

use std::collections::BTreeMap;

/// 出力バッファリングを無効化する変数
pub const UNBUFFERED_VAR: &str = "PYTHONUNBUFFERED";
/// 資格情報ファイルのパスを示す変数
pub const CREDENTIALS_VAR: &str = "GOOGLE_APPLICATION_CREDENTIALS";
/// 資格情報ファイルのデフォルトパス（ランタイムにマウントされる）
pub const DEFAULT_CREDENTIALS_PATH: &str = "/app/credentials.json";

/// ランタイム環境変数
///
/// 既定の2変数は常に存在し値も固定。ユーザー指定の値はその他の変数としてマージされる。
/// キー順で保持するため、レンダリング結果は決定的
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuntimeEnvironment {
    vars: BTreeMap<String, String>,
}

impl RuntimeEnvironment {
    /// 既定値のみの環境を作成
    pub fn new() -> Self {
        let mut vars = BTreeMap::new();
        vars.insert(UNBUFFERED_VAR.to_string(), "1".to_string());
        vars.insert(
            CREDENTIALS_VAR.to_string(),
            DEFAULT_CREDENTIALS_PATH.to_string(),
        );
        Self { vars }
    }

    /// 既定値にユーザー指定の変数をマージした環境を作成
    ///
    /// 既定の2変数への指定は無視される
    pub fn with_overrides<I, K, V>(overrides: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let mut env = Self::new();
        for (key, value) in overrides {
            let key = key.into();
            if Self::is_contract_var(&key) {
                continue;
            }
            env.vars.insert(key, value.into());
        }
        env
    }

    /// 値が固定された既定の変数か
    pub fn is_contract_var(key: &str) -> bool {
        key == UNBUFFERED_VAR || key == CREDENTIALS_VAR
    }

    /// 変数の値を取得
    pub fn get(&self, key: &str) -> Option<&str> {
        self.vars.get(key).map(String::as_str)
    }

    /// 資格情報ファイルのパス
    pub fn credentials_path(&self) -> &str {
        self.get(CREDENTIALS_VAR).unwrap_or(DEFAULT_CREDENTIALS_PATH)
    }

    /// キー順のイテレータ
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.vars.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// `KEY=VALUE` 形式のリスト
    pub fn to_key_value_list(&self) -> Vec<String> {
        self.iter().map(|(k, v)| format!("{}={}", k, v)).collect()
    }

    /// 変数名として有効か（英数字と `_`、先頭は数字以外）
    pub fn is_valid_key(key: &str) -> bool {
        !key.is_empty()
            && !key.starts_with(|c: char| c.is_ascii_digit())
            && key.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
    }

    /// 無効な変数名の一覧
    pub fn invalid_keys(&self) -> Vec<&str> {
        self.vars
            .keys()
            .filter(|k| !Self::is_valid_key(k))
            .map(String::as_str)
            .collect()
    }

    /// NUL文字を含む値を持つ変数名の一覧
    pub fn keys_with_invalid_values(&self) -> Vec<&str> {
        self.vars
            .iter()
            .filter(|(_, v)| v.contains('\0'))
            .map(|(k, _)| k.as_str())
            .collect()
    }

    /// プロセス環境へエクスポートできるか検証する
    ///
    /// 問題がある場合はその説明を返す
    pub fn check_exportable(&self) -> Result<(), String> {
        let bad_keys = self.invalid_keys();
        if !bad_keys.is_empty() {
            return Err(format!(
                "invalid variable names: {}",
                bad_keys
                    .iter()
                    .map(|k| format!("{:?}", k))
                    .collect::<Vec<_>>()
                    .join(", ")
            ));
        }
        let bad_values = self.keys_with_invalid_values();
        if !bad_values.is_empty() {
            return Err(format!(
                "values contain NUL: {}",
                bad_values.join(", ")
            ));
        }
        Ok(())
    }
}

impl Default for RuntimeEnvironment {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_always_present() {
        let env = RuntimeEnvironment::new();
        assert_eq!(env.get(UNBUFFERED_VAR), Some("1"));
        assert_eq!(env.get(CREDENTIALS_VAR), Some("/app/credentials.json"));
        assert_eq!(env.credentials_path(), "/app/credentials.json");
    }

    #[test]
    fn test_overrides_merge_on_top() {
        let env = RuntimeEnvironment::with_overrides([("FINE_TUNED_MODEL", "ft:gpt-4o-mini:finchat")]);
        assert_eq!(env.get("FINE_TUNED_MODEL"), Some("ft:gpt-4o-mini:finchat"));
        assert_eq!(env.get(UNBUFFERED_VAR), Some("1"));
    }

    #[test]
    fn test_contract_variables_cannot_be_overridden() {
        let env = RuntimeEnvironment::with_overrides([
            (CREDENTIALS_VAR, "/secrets/gcp.json"),
            (UNBUFFERED_VAR, "0"),
        ]);
        assert_eq!(env.credentials_path(), "/app/credentials.json");
        assert_eq!(env.get(UNBUFFERED_VAR), Some("1"));
        assert_eq!(env, RuntimeEnvironment::new());
    }

    #[test]
    fn test_check_exportable() {
        assert!(RuntimeEnvironment::new().check_exportable().is_ok());

        let err = RuntimeEnvironment::with_overrides([("A=B", "x"), ("", "y")])
            .check_exportable()
            .unwrap_err();
        assert!(err.contains("\"A=B\""));
        assert!(err.contains("\"\""));

        let err = RuntimeEnvironment::with_overrides([("MODEL", "gpt\0mini")])
            .check_exportable()
            .unwrap_err();
        assert_eq!(err, "values contain NUL: MODEL");
    }

    #[test]
    fn test_key_value_list_is_sorted() {
        let env = RuntimeEnvironment::with_overrides([("A_FIRST", "x")]);
        assert_eq!(
            env.to_key_value_list(),
            vec![
                "A_FIRST=x".to_string(),
                "GOOGLE_APPLICATION_CREDENTIALS=/app/credentials.json".to_string(),
                "PYTHONUNBUFFERED=1".to_string(),
            ]
        );
    }

    #[test]
    fn test_invalid_keys() {
        let env = RuntimeEnvironment::with_overrides([("1BAD", "x"), ("GOOD_KEY", "y"), ("bad-key", "z")]);
        assert_eq!(env.invalid_keys(), vec!["1BAD", "bad-key"]);
    }
}

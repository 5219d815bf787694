//! # HTTP Message Entities
//!
//! プロセスマネージャとアプリケーションの間でやり取りするリクエスト/レスポンス
//!
//! サーバー実装（hyper）に依存しない表現

use serde::Serialize;

/// アプリケーションへ渡すリクエスト
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppRequest {
    pub method: String,
    pub path: String,
    pub query: Option<String>,
    pub headers: Vec<(String, String)>,
    pub body: Vec<u8>,
}

impl AppRequest {
    /// ボディなしのリクエストを作成
    pub fn new(method: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            method: method.into(),
            path: path.into(),
            query: None,
            headers: Vec::new(),
            body: Vec::new(),
        }
    }

    /// ボディを設定
    pub fn with_body(mut self, body: impl Into<Vec<u8>>) -> Self {
        self.body = body.into();
        self
    }

    /// ヘッダーを追加
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    /// クエリ文字列を含むパス
    pub fn path_and_query(&self) -> String {
        match &self.query {
            Some(q) if !q.is_empty() => format!("{}?{}", self.path, q),
            _ => self.path.clone(),
        }
    }

    /// ヘッダー値を取得（名前は大文字小文字を区別しない）
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

/// アプリケーションが返すレスポンス
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppResponse {
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub body: Vec<u8>,
}

impl AppResponse {
    /// 任意のステータスとボディでレスポンスを作成
    pub fn new(status: u16, body: impl Into<Vec<u8>>) -> Self {
        Self {
            status,
            headers: Vec::new(),
            body: body.into(),
        }
    }

    /// JSONレスポンスを作成
    pub fn json<T: Serialize>(status: u16, value: &T) -> Self {
        let body = serde_json::to_vec(value).unwrap_or_else(|_| b"{}".to_vec());
        Self {
            status,
            headers: vec![("content-type".to_string(), "application/json".to_string())],
            body,
        }
    }

    /// `{"error": message}` 形式のエラーレスポンス
    pub fn error(status: u16, message: &str) -> Self {
        Self::json(status, &serde_json::json!({ "error": message }))
    }

    /// ヘッダー値を取得（名前は大文字小文字を区別しない）
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_path_and_query() {
        let mut req = AppRequest::new("GET", "/predict");
        assert_eq!(req.path_and_query(), "/predict");
        req.query = Some("debug=1".to_string());
        assert_eq!(req.path_and_query(), "/predict?debug=1");
    }

    #[test]
    fn test_header_lookup_is_case_insensitive() {
        let req = AppRequest::new("POST", "/predict").with_header("Content-Type", "application/json");
        assert_eq!(req.header("content-type"), Some("application/json"));
        assert_eq!(req.header("accept"), None);
    }

    #[test]
    fn test_error_response() {
        let resp = AppResponse::error(504, "request timed out");
        assert_eq!(resp.status, 504);
        assert_eq!(resp.header("Content-Type"), Some("application/json"));
        let body: serde_json::Value = serde_json::from_slice(&resp.body).unwrap();
        assert_eq!(body["error"], "request timed out");
    }
}

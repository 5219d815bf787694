//! GCP Credentials
//!
//! ランタイムにマウントされる資格情報ファイルの確認

use log::{info, warn};
use std::fs;
use std::path::Path;

/// Expands tilde in path and returns the full path
pub fn expand_key_path(key_path: &str) -> String {
    shellexpand::tilde(key_path).to_string()
}

/// State of the credentials artifact referenced by the environment
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CredentialStatus {
    /// File exists and is a JSON document with a `type` field
    Present { kind: String },
    /// Nothing mounted at the path
    Missing,
    /// File exists but cannot be read or parsed
    Unreadable(String),
}

/// Inspects the credentials file without failing startup
pub fn inspect_credentials(key_path: &str) -> CredentialStatus {
    let expanded = expand_key_path(key_path);
    let path = Path::new(&expanded);

    if !path.exists() {
        return CredentialStatus::Missing;
    }

    let content = match fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) => return CredentialStatus::Unreadable(e.to_string()),
    };

    match serde_json::from_str::<serde_json::Value>(&content) {
        Ok(value) => match value.get("type").and_then(|t| t.as_str()) {
            Some(kind) => CredentialStatus::Present {
                kind: kind.to_string(),
            },
            None => CredentialStatus::Unreadable("missing \"type\" field".to_string()),
        },
        Err(e) => CredentialStatus::Unreadable(e.to_string()),
    }
}

/// Logs the credentials status; the variable stays set either way
pub fn log_credentials_status(key_path: &str) -> CredentialStatus {
    let status = inspect_credentials(key_path);
    match &status {
        CredentialStatus::Present { kind } => {
            info!("Credentials found at {} ({})", key_path, kind)
        }
        CredentialStatus::Missing => warn!(
            "No credentials mounted at {}; services that need them will fail",
            key_path
        ),
        CredentialStatus::Unreadable(reason) => {
            warn!("Credentials at {} are unusable: {}", key_path, reason)
        }
    }
    status
}

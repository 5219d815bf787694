//! Authentication Module
//!
//! 資格情報ファイル関連の機能

pub mod credentials;

pub use credentials::{inspect_credentials, log_credentials_status, CredentialStatus};

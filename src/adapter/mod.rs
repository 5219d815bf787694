//! Adapter Layer
//!
//! 外部システム（ファイルシステム, パッケージインデックス, HTTP）との統合

pub mod apps;
pub mod auth;
pub mod config;
pub mod http;
pub mod package_index;
pub mod repositories;

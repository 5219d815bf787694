//! # Use Cases
//!
//! アプリケーションのビジネスフロー（ユースケース）
//!
//! ## ユースケース
//!
//! - **BuildImageUseCase**: 依存関係を解決し、フィルタ済みのコンテキストでイメージをビルド
//! - **LaunchServiceUseCase**: エントリポイントを解決して起動計画を作成

pub mod build_image;
pub mod launch_service;

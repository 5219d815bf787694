//! # Domain Layer
//!
//! このモジュールはビジネスの核心的なルールとエンティティを定義します。
//!
//! ## 特徴
//!
//! - 外部システムに依存しない（ファイルシステムやネットワークを直接扱わない）
//! - フレームワークに依存しない（HTTPサーバーの型を持ち込まない）
//! - 純粋なビジネスロジック
//!
//! ## 構成要素
//!
//! - **entities**: ビジネスエンティティ（EntrypointRef, ImageRecipeなど）
//! - **errors**: ビルド時・起動時の致命的エラー
//! - **repositories**: Repository trait（インターフェース定義のみ）
//! - **services**: Domain Service（ビジネスルール）

pub mod entities;
pub mod errors;
pub mod repositories;
pub mod services;

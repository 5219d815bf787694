//! # FinChat Bootstrap
//!
//! FinChat サービスのコンテナイメージをビルドし、プロセスマネージャとして起動するツール
//!
//! このプロジェクトはクリーンアーキテクチャを採用しており、以下の4層で構成されています：
//!
//! - **Domain層**: イメージレシピ、エントリポイント、依存関係マニフェスト（外部依存なし）
//! - **Application層**: イメージビルドとサービス起動のユースケース
//! - **Adapter層**: 外部システムとの統合（ファイルシステム, パッケージインデックス, HTTP）
//! - **Driver層**: CLI、依存性注入
//!
//! ## コンテナ契約
//!
//! - ポート `8085`、リクエストタイムアウト `300` 秒
//! - エントリポイント `Flask_Server:app`
//! - `PYTHONUNBUFFERED=1` と `GOOGLE_APPLICATION_CREDENTIALS=/app/credentials.json`

// coverage_nightly cfg が設定されている場合のみ coverage_attribute を有効化
// カバレッジ計測時にネットワーク依存コードを除外するために使用
#![cfg_attr(coverage_nightly, feature(coverage_attribute))]

// Domain層（純粋なビジネスロジック）
pub mod domain;

// Application層（ユースケース）
pub mod application;

// Adapter層（Infrastructure）
pub mod adapter;

// Driver層（Presentation）
pub mod driver;

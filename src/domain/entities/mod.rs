//! # Domain Entities
//!
//! ビジネスエンティティとバリューオブジェクトを定義するモジュール
//!
//! ## エンティティ
//!
//! - **EntrypointRef**: `module:attribute` 形式のアプリケーション参照
//! - **DependencyManifest**: 言語レベルの依存関係マニフェスト
//! - **Version**: パッケージバージョンと指定子
//! - **ContextManifest**: ビルドコンテキストの include / exclude
//! - **RuntimeEnvironment**: イメージに焼き込む環境変数
//! - **ImageRecipe**: イメージのビルドレシピ
//! - **ImageConfig**: ビルド済みイメージの設定ドキュメント
//! - **AppRequest / AppResponse**: アプリケーションとの入出力

pub mod context_manifest;
pub mod dependency_manifest;
pub mod entrypoint;
pub mod http_message;
pub mod image_config;
pub mod image_recipe;
pub mod runtime_env;
pub mod version;

//! # Build Request DTO
//!
//! イメージビルドの入力

use std::path::PathBuf;

use crate::domain::entities::image_recipe::ImageRecipe;

/// ビルドリクエスト
#[derive(Debug, Clone)]
pub struct BuildRequest {
    /// ビルドコンテキストのルート
    pub context_dir: PathBuf,
    /// ビルドレシピ
    pub recipe: ImageRecipe,
    /// エントリポイントのモジュールがコンテキストに含まれるか検証するか
    pub verify_entrypoint_source: bool,
    /// ドライラン（イメージをコミットしない）
    pub dry_run: bool,
    /// コンテキスト内に置かれた出力ディレクトリ（コンテキストルートからの相対パス）
    pub output_in_context: Option<String>,
}

impl BuildRequest {
    /// 新しいビルドリクエストを作成します。
    ///
    /// エントリポイントの検証は有効、ドライランは無効で作成される
    ///
    /// # 例
    ///
    /// ```
    /// use finchat_bootstrap::application::dto::build_request::BuildRequest;
    /// use finchat_bootstrap::domain::entities::image_recipe::ImageRecipe;
    ///
    /// let request = BuildRequest::new("./context".into(), ImageRecipe::default());
    /// assert!(request.verify_entrypoint_source);
    /// assert!(!request.dry_run);
    /// assert!(request.output_in_context.is_none());
    /// ```
    pub fn new(context_dir: PathBuf, recipe: ImageRecipe) -> Self {
        Self {
            context_dir,
            recipe,
            verify_entrypoint_source: true,
            dry_run: false,
            output_in_context: None,
        }
    }

    /// ドライランを設定
    pub fn dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    /// コンテキストから除外する出力ディレクトリを設定
    pub fn output_in_context(mut self, relative_output: Option<String>) -> Self {
        self.output_in_context = relative_output;
        self
    }
}

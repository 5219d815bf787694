//! # Descriptor Renderer Service
//!
//! レシピからビルド記述子（Dockerfile相当）を生成する

use crate::domain::entities::image_recipe::ImageRecipe;

/// ビルド記述子のレンダラー
pub struct DescriptorRenderer;

fn render_env_value(value: &str) -> String {
    let needs_quotes = value.is_empty()
        || value
            .chars()
            .any(|c| c.is_whitespace() || matches!(c, '"' | '\'' | '\\' | '$'));
    if needs_quotes {
        serde_json::to_string(value).unwrap_or_else(|_| format!("\"{}\"", value))
    } else {
        value.to_string()
    }
}

impl DescriptorRenderer {
    /// レシピを記述子テキストに変換する
    ///
    /// 出力は決定的（環境変数はキー順）
    ///
    /// # Arguments
    ///
    /// * `recipe` - イメージのビルドレシピ
    pub fn render(recipe: &ImageRecipe) -> String {
        let mut lines = Vec::new();

        lines.push(format!("FROM {}", recipe.base_image));
        lines.push(String::new());

        for (key, value) in recipe.env.iter() {
            lines.push(format!("ENV {}={}", key, render_env_value(value)));
        }
        lines.push(String::new());

        if !recipe.system_packages.is_empty() {
            lines.push(format!(
                "RUN apt-get update && apt-get install -y --no-install-recommends {} && rm -rf /var/lib/apt/lists/*",
                recipe.system_packages.join(" ")
            ));
            lines.push(String::new());
        }

        lines.push(format!("WORKDIR {}", recipe.working_dir));
        lines.push(String::new());

        // コピー元は出力イメージ内の rootfs。コンテキストマニフェストを通過したファイルだけが置かれる
        let rootfs = recipe.rootfs_workdir();
        let manifest = recipe.manifest_path();
        lines.push(format!("COPY {}/{} {}", rootfs, manifest, manifest));
        lines.push(format!("RUN pip install --no-cache-dir -r {}", manifest));
        lines.push(String::new());

        lines.push(format!(
            "COPY {}/ {}/",
            rootfs,
            recipe.working_dir.trim_end_matches('/')
        ));
        lines.push(String::new());

        lines.push(format!("EXPOSE {}", recipe.exposed_port));
        lines.push(String::new());

        let cmd = serde_json::to_string(&recipe.command()).unwrap_or_else(|_| "[]".to_string());
        lines.push(format!("CMD {}", cmd));

        let mut descriptor = lines.join("\n");
        descriptor.push('\n');
        descriptor
    }
}

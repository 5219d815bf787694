//! # Package Index Trait
//!
//! 言語レベルのパッケージインデックスへの問い合わせを抽象化

use anyhow::Result;
use async_trait::async_trait;

#[cfg(test)]
use mockall::automock;

/// パッケージインデックス
#[cfg_attr(test, automock)]
#[async_trait]
pub trait PackageIndex: Send + Sync {
    /// パッケージの公開済みバージョン一覧を取得する
    ///
    /// # Arguments
    ///
    /// * `name` - 正規化済みパッケージ名
    ///
    /// # Returns
    ///
    /// バージョン文字列のリスト。パッケージが存在しない場合は `None`
    ///
    /// # Errors
    ///
    /// インデックスとの通信に失敗した場合にエラーを返す
    async fn releases(&self, name: &str) -> Result<Option<Vec<String>>>;
}

//! Package Index Adapters
//!
//! PyPI互換インデックスとオフラインカタログ

pub mod offline;
pub mod pypi;
pub mod retry;

pub use offline::OfflineIndex;
pub use pypi::PypiIndex;

use anyhow::Result;
use async_trait::async_trait;
use std::path::Path;

use crate::adapter::config::PackageIndexSection;
use crate::domain::repositories::package_index::PackageIndex;

/// Index selected by configuration
pub enum ConfiguredIndex {
    Pypi(PypiIndex),
    Offline(OfflineIndex),
}

impl ConfiguredIndex {
    pub fn from_config(section: &PackageIndexSection) -> Result<Self> {
        match section {
            PackageIndexSection::Pypi { url } => Ok(Self::Pypi(PypiIndex::new(url)?)),
            PackageIndexSection::Offline { catalog } => {
                Ok(Self::Offline(OfflineIndex::load(Path::new(catalog))?))
            }
        }
    }
}

#[async_trait]
impl PackageIndex for ConfiguredIndex {
    async fn releases(&self, name: &str) -> Result<Option<Vec<String>>> {
        match self {
            Self::Pypi(index) => index.releases(name).await,
            Self::Offline(index) => index.releases(name).await,
        }
    }
}

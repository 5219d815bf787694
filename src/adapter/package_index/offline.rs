//! Offline Package Catalog
//!
//! ネットワークを使わずにJSONカタログからバージョンを引く

use anyhow::{Context, Result};
use async_trait::async_trait;
use log::info;
use std::collections::HashMap;
use std::fs;
use std::path::Path;

use crate::domain::entities::dependency_manifest::normalize_name;
use crate::domain::repositories::package_index::PackageIndex;

/// Catalog of `{ "name": ["version", ...] }` keyed by normalized name
#[derive(Debug, Clone, Default)]
pub struct OfflineIndex {
    packages: HashMap<String, Vec<String>>,
}

impl OfflineIndex {
    pub fn from_entries<I, N, V>(entries: I) -> Self
    where
        I: IntoIterator<Item = (N, Vec<V>)>,
        N: AsRef<str>,
        V: Into<String>,
    {
        let mut packages: HashMap<String, Vec<String>> = HashMap::new();
        for (name, versions) in entries {
            packages
                .entry(normalize_name(name.as_ref()))
                .or_default()
                .extend(versions.into_iter().map(Into::into));
        }
        Self { packages }
    }

    pub fn parse(content: &str) -> Result<Self> {
        let raw: HashMap<String, Vec<String>> =
            serde_json::from_str(content).context("Failed to parse package catalog")?;
        Ok(Self::from_entries(raw))
    }

    pub fn load(path: &Path) -> Result<Self> {
        let expanded = shellexpand::tilde(&path.to_string_lossy()).to_string();
        let content = fs::read_to_string(&expanded)
            .with_context(|| format!("Failed to read package catalog: {}", expanded))?;
        let index = Self::parse(&content)
            .with_context(|| format!("Invalid package catalog: {}", expanded))?;
        info!("Loaded {} packages from {}", index.len(), expanded);
        Ok(index)
    }

    pub fn len(&self) -> usize {
        self.packages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.packages.is_empty()
    }
}

#[async_trait]
impl PackageIndex for OfflineIndex {
    async fn releases(&self, name: &str) -> Result<Option<Vec<String>>> {
        Ok(self.packages.get(&normalize_name(name)).cloned())
    }
}

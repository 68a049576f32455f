//! Map name lookup: local file or verified mirror URL

use reqwest::redirect::Policy;
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use crate::catalog::{CatalogCache, CatalogResult, DownloadEntry};
use crate::pool::{specialty_for, RandomSource, SettingsStore};
use crate::resolver::FileResolver;

/// Where a map can be fetched from
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "location", rename_all = "lowercase")]
pub enum Located {
    Local(PathBuf),
    Remote(String),
}

/// Resolves device-side map names against the catalog
pub struct MapLocator {
    catalog: Arc<CatalogCache>,
    resolver: FileResolver,
    settings: Arc<SettingsStore>,
    random: Arc<dyn RandomSource>,
    client: reqwest::Client,
    scheme: String,
}

impl MapLocator {
    pub fn new(
        catalog: Arc<CatalogCache>,
        resolver: FileResolver,
        settings: Arc<SettingsStore>,
        random: Arc<dyn RandomSource>,
        check_timeout: Duration,
    ) -> reqwest::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(check_timeout)
            .redirect(Policy::none())
            .build()?;

        Ok(Self {
            catalog,
            resolver,
            settings,
            random,
            client,
            scheme: "https".to_string(),
        })
    }

    /// Scheme used for mirror URLs
    pub fn with_scheme(mut self, scheme: impl Into<String>) -> Self {
        self.scheme = scheme.into();
        self
    }

    /// Locate a map by the name a device knows it under
    pub async fn locate(&self, name: &str) -> CatalogResult<Option<Located>> {
        let wanted = download_name(name);
        let zipped = format!("{wanted}.zip");
        let snapshot = self.catalog.get(false).await?;

        for entry in snapshot
            .catalog
            .iter()
            .filter(|e| e.name == wanted || e.name == zipped)
        {
            for dir in entry.category.rule().dirs {
                if let Ok(file) = self.resolver.resolve_in(Path::new(dir), &wanted).await {
                    return Ok(Some(Located::Local(file.path)));
                }
            }

            if let Some(url) = self.mirror_url(entry) {
                tracing::info!(entry = %entry.name, url = %url, "Checking mirror");
                return Ok(self.is_reachable(&url).await.then_some(Located::Remote(url)));
            }
        }

        Ok(None)
    }

    fn mirror_url(&self, entry: &DownloadEntry) -> Option<String> {
        let specialty = specialty_for(entry.category);
        let pools = self.settings.snapshot();
        let host = pools.pool.sample(specialty, self.random.as_ref())?;

        let param = specialty
            .request_param()
            .map(|p| format!("&{p}=yes"))
            .unwrap_or_default();
        Some(format!(
            "{}://{}/download?file={}{}",
            self.scheme, host, entry.name, param
        ))
    }

    async fn is_reachable(&self, url: &str) -> bool {
        match self.client.head(url).send().await {
            Ok(resp) => {
                let status = resp.status();
                status.is_success() || status.is_redirection()
            }
            Err(e) => {
                tracing::warn!(url = %url, error = %e, "Mirror check failed");
                false
            }
        }
    }
}

/// Catalog name for a device-side name
///
/// `Germany_europe.obf` becomes `Germany_europe_2.obf`; other names get
/// spaces replaced by `_`. Folder prefixes are dropped.
pub fn download_name(name: &str) -> String {
    let name = name.rsplit('/').next().unwrap_or(name);
    if name.ends_with("obf") {
        if let Some(dot) = name.find('.') {
            return format!("{}_2{}", &name[..dot], &name[dot..]);
        }
    }
    name.replace(' ', "_")
}

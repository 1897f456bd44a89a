//! Read-only façade over the four metadata namespaces.

use std::collections::BTreeMap;
use std::sync::Arc;

use edge_kv::{collect_keys, enumerate_keys, KvNamespace, ListOptions};
use futures::TryStreamExt;
use serde_json::Value;

use crate::ApiError;

/// Typed reads over the package, version, SRI and aggregated namespaces.
///
/// Version and SRI keys are composite: `package/version` and
/// `package/version/file`. Absent entries come back as `None`; empty
/// listings come back empty. Neither is an error.
#[derive(Clone)]
pub struct MetadataStore {
    packages: Arc<dyn KvNamespace>,
    versions: Arc<dyn KvNamespace>,
    sris: Arc<dyn KvNamespace>,
    aggregated: Arc<dyn KvNamespace>,
    page_size: Option<u32>,
}

impl MetadataStore {
    pub fn new(
        packages: Arc<dyn KvNamespace>,
        versions: Arc<dyn KvNamespace>,
        sris: Arc<dyn KvNamespace>,
        aggregated: Arc<dyn KvNamespace>,
    ) -> Self {
        Self {
            packages,
            versions,
            sris,
            aggregated,
            page_size: None,
        }
    }

    /// Page-size hint forwarded to every listing.
    pub fn with_page_size(mut self, page_size: Option<u32>) -> Self {
        self.page_size = page_size;
        self
    }

    fn list_options(&self, prefix: Option<String>) -> ListOptions {
        ListOptions {
            prefix,
            limit: self.page_size,
            cursor: None,
        }
    }

    /// Raw package document.
    pub async fn get_package(&self, package: &str) -> Result<Option<Vec<u8>>, ApiError> {
        Ok(self.packages.get(package).await?)
    }

    /// Every package name.
    pub async fn list_packages(&self) -> Result<Vec<String>, ApiError> {
        let keys = collect_keys(self.packages.as_ref(), self.list_options(None)).await?;
        Ok(keys.into_iter().map(|k| k.name).collect())
    }

    /// Version names of a package, without the `package/` prefix.
    pub async fn list_versions(&self, package: &str) -> Result<Vec<String>, ApiError> {
        let prefix = format!("{}/", package);
        let keys = collect_keys(self.versions.as_ref(), self.list_options(Some(prefix.clone()))).await?;
        Ok(keys
            .into_iter()
            .map(|k| match k.name.strip_prefix(&prefix) {
                Some(version) => version.to_string(),
                None => k.name,
            })
            .collect())
    }

    /// Raw version document.
    pub async fn get_version(&self, package: &str, version: &str) -> Result<Option<Vec<u8>>, ApiError> {
        Ok(self.versions.get(&version_key(package, version)).await?)
    }

    /// File key to SRI hash for a package, or one version of it.
    ///
    /// The listing prefix is `package/` plus the version when given, with no
    /// trailing separator, so version `1.0` also covers keys under `1.0.1/`.
    /// The `sri` field is passed through as stored. A record whose metadata
    /// has no `sri` field is skipped; a record with no metadata is an error.
    pub async fn list_sris(
        &self,
        package: &str,
        version: Option<&str>,
    ) -> Result<BTreeMap<String, Value>, ApiError> {
        let prefix = format!("{}/{}", package, version.unwrap_or(""));
        let mut keys = enumerate_keys(self.sris.as_ref(), self.list_options(Some(prefix)));

        let mut sris = BTreeMap::new();
        while let Some(record) = keys.try_next().await? {
            let Some(mut metadata) = record.metadata else {
                return Err(ApiError::InvalidMetadata {
                    key: record.name,
                    reason: "no metadata".to_string(),
                });
            };
            if let Some(sri) = metadata.get_mut("sri").map(Value::take) {
                sris.insert(record.name, sri);
            }
        }
        Ok(sris)
    }

    /// Gzip-compressed aggregated document.
    pub async fn get_aggregated(&self, package: &str) -> Result<Option<Vec<u8>>, ApiError> {
        Ok(self.aggregated.get(package).await?)
    }
}

/// Composite key of a version record.
pub fn version_key(package: &str, version: &str) -> String {
    format!("{}/{}", package, version)
}

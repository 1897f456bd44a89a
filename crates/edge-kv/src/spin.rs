//! Spin key-value store backend.

use async_trait::async_trait;
use spin_sdk::key_value::Store;

use crate::namespace::{paginate, DEFAULT_PAGE_SIZE};
use crate::{KeyRecord, KvError, KvNamespace, ListOptions, ListPage};

/// Namespace backed by a Spin key-value store label.
///
/// Spin stores have neither prefix listing, cursors nor per-key metadata.
/// Listing sorts the full key set and slices pages from it; when
/// `value_metadata` is set, each listed key's value is parsed as JSON and
/// exposed as its metadata.
pub struct SpinNamespace {
    label: String,
    value_metadata: bool,
}

impl SpinNamespace {
    /// Open a store by label.
    ///
    /// The store is opened once here to surface a missing binding early and
    /// reopened per call, since component handles are cheap.
    pub fn open(label: impl Into<String>) -> Result<Self, KvError> {
        let label = label.into();
        Store::open(&label).map_err(|e| KvError::Open {
            name: label.clone(),
            reason: e.to_string(),
        })?;
        Ok(Self {
            label,
            value_metadata: false,
        })
    }

    /// Expose each key's JSON value as its listing metadata.
    pub fn with_value_metadata(mut self) -> Self {
        self.value_metadata = true;
        self
    }

    fn store(&self, operation: &'static str) -> Result<Store, KvError> {
        Store::open(&self.label).map_err(|e| KvError::store(&self.label, operation, e))
    }
}

#[async_trait]
impl KvNamespace for SpinNamespace {
    fn name(&self) -> &str {
        &self.label
    }

    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, KvError> {
        self.store("get")?
            .get(key)
            .map_err(|e| KvError::store(&self.label, "get", e))
    }

    async fn list(&self, options: &ListOptions) -> Result<ListPage, KvError> {
        let store = self.store("list")?;
        let mut all = store
            .get_keys()
            .map_err(|e| KvError::store(&self.label, "list", e))?;
        all.sort_unstable();

        let (names, cursor) = paginate(all.iter().map(String::as_str), options, DEFAULT_PAGE_SIZE)?;

        let mut keys = Vec::with_capacity(names.len());
        for name in names {
            let mut record = KeyRecord::new(name);
            if self.value_metadata {
                if let Some(bytes) = store
                    .get(name)
                    .map_err(|e| KvError::store(&self.label, "get", e))?
                {
                    let metadata = serde_json::from_slice(&bytes).map_err(|e| KvError::Malformed {
                        key: name.to_string(),
                        reason: e.to_string(),
                    })?;
                    record = record.with_metadata(metadata);
                }
            }
            keys.push(record);
        }

        Ok(match cursor {
            Some(cursor) => ListPage::partial(keys, cursor),
            None => ListPage::complete(keys),
        })
    }
}

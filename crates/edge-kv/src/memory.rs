//! In-memory namespace for development and tests.

use std::collections::BTreeMap;
use std::sync::RwLock;

use async_trait::async_trait;

use crate::namespace::{paginate, DEFAULT_PAGE_SIZE};
use crate::{KeyRecord, KvError, KvNamespace, ListOptions, ListPage};

#[derive(Debug, Clone)]
struct Entry {
    value: Vec<u8>,
    metadata: Option<serde_json::Value>,
}

/// Namespace held in a sorted map.
///
/// Listing behaves like a remote store: keys come back in lexicographic
/// order, at most `page_size` per call, with an opaque cursor between pages.
#[derive(Debug)]
pub struct InMemoryNamespace {
    name: String,
    entries: RwLock<BTreeMap<String, Entry>>,
    page_size: u32,
}

impl InMemoryNamespace {
    /// Create an empty namespace.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            entries: RwLock::new(BTreeMap::new()),
            page_size: DEFAULT_PAGE_SIZE,
        }
    }

    /// Set the maximum number of keys returned per page.
    pub fn with_page_size(mut self, page_size: u32) -> Self {
        self.page_size = page_size.max(1);
        self
    }

    /// Insert or replace a value.
    pub fn put(&self, key: impl Into<String>, value: impl Into<Vec<u8>>) {
        self.insert(key.into(), value.into(), None);
    }

    /// Insert or replace a value together with key metadata.
    pub fn put_with_metadata(
        &self,
        key: impl Into<String>,
        value: impl Into<Vec<u8>>,
        metadata: serde_json::Value,
    ) {
        self.insert(key.into(), value.into(), Some(metadata));
    }

    /// Number of stored keys.
    pub fn len(&self) -> usize {
        self.entries.read().map(|e| e.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn insert(&self, key: String, value: Vec<u8>, metadata: Option<serde_json::Value>) {
        if let Ok(mut entries) = self.entries.write() {
            entries.insert(key, Entry { value, metadata });
        }
    }

    fn poisoned(&self, operation: &'static str) -> KvError {
        KvError::store(&self.name, operation, "lock poisoned")
    }
}

#[async_trait]
impl KvNamespace for InMemoryNamespace {
    fn name(&self) -> &str {
        &self.name
    }

    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, KvError> {
        let entries = self.entries.read().map_err(|_| self.poisoned("get"))?;
        Ok(entries.get(key).map(|e| e.value.clone()))
    }

    async fn list(&self, options: &ListOptions) -> Result<ListPage, KvError> {
        let entries = self.entries.read().map_err(|_| self.poisoned("list"))?;

        let (names, cursor) = paginate(entries.keys().map(String::as_str), options, self.page_size)?;
        let keys = names
            .into_iter()
            .map(|name| KeyRecord {
                name: name.to_string(),
                metadata: entries.get(name).and_then(|e| e.metadata.clone()),
            })
            .collect();

        Ok(match cursor {
            Some(cursor) => ListPage::partial(keys, cursor),
            None => ListPage::complete(keys),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_get_and_missing() {
        let ns = InMemoryNamespace::new("packages");
        ns.put("jquery", r#"{"name":"jquery"}"#);

        assert_eq!(
            ns.get("jquery").await.unwrap().as_deref(),
            Some(br#"{"name":"jquery"}"#.as_slice())
        );
        assert!(ns.get("lodash").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_binary_values_round_trip() {
        let ns = InMemoryNamespace::new("aggregated");
        ns.put("jquery", vec![0x1f, 0x8b, 0xff, 0xfe]);
        assert_eq!(ns.get("jquery").await.unwrap(), Some(vec![0x1f, 0x8b, 0xff, 0xfe]));
    }

    #[tokio::test]
    async fn test_list_pages_in_key_order() {
        let ns = InMemoryNamespace::new("packages").with_page_size(2);
        for name in ["c", "a", "b"] {
            ns.put(name, "{}");
        }

        let first = ns.list(&ListOptions::new()).await.unwrap();
        assert_eq!(
            first.keys.iter().map(|k| k.name.as_str()).collect::<Vec<_>>(),
            vec!["a", "b"]
        );
        assert!(!first.list_complete);

        let next = ListOptions::new().with_cursor(first.cursor.unwrap());
        let second = ns.list(&next).await.unwrap();
        assert_eq!(second.keys.len(), 1);
        assert_eq!(second.keys[0].name, "c");
        assert!(second.list_complete);
        assert!(second.cursor.is_none());
    }

    #[tokio::test]
    async fn test_limit_below_page_size() {
        let ns = InMemoryNamespace::new("packages");
        for i in 0..10 {
            ns.put(format!("p{}", i), "{}");
        }
        let page = ns.list(&ListOptions::new().with_limit(4)).await.unwrap();
        assert_eq!(page.keys.len(), 4);
        assert!(!page.list_complete);
    }

    #[tokio::test]
    async fn test_list_carries_metadata() {
        let ns = InMemoryNamespace::new("sris");
        ns.put_with_metadata(
            "jquery/3.7.1/jquery.min.js",
            "",
            serde_json::json!({ "sri": "sha512-xyz" }),
        );
        let page = ns.list(&ListOptions::new()).await.unwrap();
        assert_eq!(
            page.keys[0].metadata,
            Some(serde_json::json!({ "sri": "sha512-xyz" }))
        );
    }

    #[test]
    fn test_put_replaces() {
        let ns = InMemoryNamespace::new("packages");
        ns.put("a", "{}");
        ns.put("a", "[]");
        assert_eq!(ns.len(), 1);
        assert!(!ns.is_empty());
    }
}

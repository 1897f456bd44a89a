//! Namespace trait and listing types.

use async_trait::async_trait;
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use serde::{Deserialize, Serialize};

use crate::KvError;

/// Default and maximum number of keys returned by a single list call.
pub const DEFAULT_PAGE_SIZE: u32 = 1000;

/// A key returned by a listing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KeyRecord {
    /// Full key name.
    pub name: String,
    /// Metadata attached to the key, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<serde_json::Value>,
}

impl KeyRecord {
    /// A key without metadata.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            metadata: None,
        }
    }

    /// Attach metadata.
    pub fn with_metadata(mut self, metadata: serde_json::Value) -> Self {
        self.metadata = Some(metadata);
        self
    }
}

/// Options for a single list call.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListOptions {
    /// Only return keys starting with this prefix.
    pub prefix: Option<String>,
    /// Page-size hint; backends cap it at their own maximum.
    pub limit: Option<u32>,
    /// Cursor returned by the previous page.
    pub cursor: Option<String>,
}

impl ListOptions {
    /// List every key.
    pub fn new() -> Self {
        Self::default()
    }

    /// Restrict to keys starting with `prefix`.
    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = Some(prefix.into());
        self
    }

    /// Set a page-size hint.
    pub fn with_limit(mut self, limit: u32) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Continue from a cursor.
    pub fn with_cursor(mut self, cursor: impl Into<String>) -> Self {
        self.cursor = Some(cursor.into());
        self
    }

    /// Effective page size for a backend with the given maximum.
    pub fn page_size(&self, max: u32) -> usize {
        self.limit.unwrap_or(max).clamp(1, max) as usize
    }
}

/// One page of a listing.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ListPage {
    /// Keys in this page, in key order.
    pub keys: Vec<KeyRecord>,
    /// True when no further pages exist.
    pub list_complete: bool,
    /// Cursor for the next page when `list_complete` is false.
    pub cursor: Option<String>,
}

impl ListPage {
    /// A final page.
    pub fn complete(keys: Vec<KeyRecord>) -> Self {
        Self {
            keys,
            list_complete: true,
            cursor: None,
        }
    }

    /// A page followed by more.
    pub fn partial(keys: Vec<KeyRecord>, cursor: impl Into<String>) -> Self {
        Self {
            keys,
            list_complete: false,
            cursor: Some(cursor.into()),
        }
    }
}

/// Read-only access to a key-value namespace.
#[async_trait]
pub trait KvNamespace: Send + Sync {
    /// Namespace name, used in errors and logs.
    fn name(&self) -> &str;

    /// Fetch the raw value for a key.
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, KvError>;

    /// Fetch one page of keys.
    async fn list(&self, options: &ListOptions) -> Result<ListPage, KvError>;
}

/// Encode the last key of a page as an opaque cursor.
pub fn encode_cursor(last_key: &str) -> String {
    URL_SAFE_NO_PAD.encode(last_key.as_bytes())
}

/// Decode a cursor produced by [`encode_cursor`].
pub fn decode_cursor(cursor: &str) -> Result<String, KvError> {
    let bytes = URL_SAFE_NO_PAD
        .decode(cursor)
        .map_err(|e| KvError::InvalidCursor(e.to_string()))?;
    String::from_utf8(bytes).map_err(|e| KvError::InvalidCursor(e.to_string()))
}

/// Slice one page out of an ordered key sequence.
///
/// Backends without native pagination list their keys in sorted order and
/// hand them here. Keys not matching the prefix, and keys at or before the
/// cursor, are skipped.
pub fn paginate<'a, I>(
    sorted_keys: I,
    options: &ListOptions,
    max: u32,
) -> Result<(Vec<&'a str>, Option<String>), KvError>
where
    I: IntoIterator<Item = &'a str>,
{
    let after = options.cursor.as_deref().map(decode_cursor).transpose()?;
    let prefix = options.prefix.as_deref().unwrap_or("");
    let page_size = options.page_size(max);

    let mut matching = sorted_keys
        .into_iter()
        .filter(|k| k.starts_with(prefix))
        .filter(|k| after.as_deref().map_or(true, |after| *k > after));

    let page: Vec<&str> = matching.by_ref().take(page_size).collect();
    let next = match (matching.next(), page.last()) {
        (Some(_), Some(last)) => Some(encode_cursor(last)),
        _ => None,
    };
    Ok((page, next))
}

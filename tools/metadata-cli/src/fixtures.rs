//! Fixture data for local requests.
//!
//! A fixture file is TOML with one table per namespace:
//!
//! ```toml
//! [packages.jquery]
//! name = "jquery"
//! version = "3.7.1"
//!
//! [versions."jquery/3.7.1"]
//! version = "3.7.1"
//!
//! [sris]
//! "jquery/3.7.1/jquery.min.js" = "sha512-..."
//!
//! [aggregated.jquery]
//! name = "jquery"
//! versions = ["3.7.1"]
//! ```
//!
//! Documents are stored as compact JSON. Aggregated documents are
//! gzip-compressed on load, as they are in production.

use std::collections::BTreeMap;
use std::io::Write;
use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use edge_kv::InMemoryNamespace;
use flate2::write::GzEncoder;
use flate2::Compression;
use metadata_api::MetadataStore;
use serde::Deserialize;
use serde_json::{json, Value};

/// Parsed fixture file.
#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Fixtures {
    /// Package name -> package document.
    pub packages: BTreeMap<String, Value>,
    /// `package/version` -> version document.
    pub versions: BTreeMap<String, Value>,
    /// `package/version/file` -> SRI hash.
    pub sris: BTreeMap<String, String>,
    /// Package name -> aggregated document (uncompressed).
    pub aggregated: BTreeMap<String, Value>,
}

impl Fixtures {
    /// Parse a TOML fixture document.
    pub fn from_toml_str(content: &str) -> Result<Self> {
        toml::from_str(content).context("Failed to parse fixtures")
    }

    /// Load a fixture file.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read fixtures: {}", path.display()))?;
        Self::from_toml_str(&content)
            .with_context(|| format!("Invalid fixture file: {}", path.display()))
    }

    /// Total number of records across all namespaces.
    pub fn len(&self) -> usize {
        self.packages.len() + self.versions.len() + self.sris.len() + self.aggregated.len()
    }

    /// Populate in-memory namespaces and wrap them in a store.
    pub fn into_store(self, page_size: Option<u32>) -> Result<MetadataStore> {
        let packages = InMemoryNamespace::new("packages");
        for (name, doc) in &self.packages {
            packages.put(name.as_str(), serde_json::to_vec(doc)?);
        }

        let versions = InMemoryNamespace::new("versions");
        for (key, doc) in &self.versions {
            versions.put(key.as_str(), serde_json::to_vec(doc)?);
        }

        let sris = InMemoryNamespace::new("sris");
        for (key, sri) in self.sris {
            sris.put_with_metadata(key, Vec::new(), json!({ "sri": sri }));
        }

        let aggregated = InMemoryNamespace::new("aggregated");
        for (name, doc) in &self.aggregated {
            let compressed = gzip(&serde_json::to_vec(doc)?)
                .with_context(|| format!("Failed to compress aggregated document: {}", name))?;
            aggregated.put(name.as_str(), compressed);
        }

        Ok(MetadataStore::new(
            Arc::new(packages),
            Arc::new(versions),
            Arc::new(sris),
            Arc::new(aggregated),
        )
        .with_page_size(page_size))
    }
}

fn gzip(data: &[u8]) -> std::io::Result<Vec<u8>> {
    let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(data)?;
    encoder.finish()
}

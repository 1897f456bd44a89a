//! Package metadata API as a Spin HTTP component.
//!
//! Wires the Spin key-value stores and Spin variables into a
//! [`RequestHandler`]. Cache writes are queued on a [`DeferredTasks`] and
//! drained after the response has been handed back to the host.
//!
//! Variables (all optional): `environment`, `packages_store`,
//! `versions_store`, `sris_store`, `aggregated_store`,
//! `response_cache_store`, `list_page_size`, `failure_dsn`,
//! `debug_cache_headers`.

use std::sync::Arc;

use edge_cache::{BackgroundTasks, ResponseCache, ResponseStore};
use edge_core::ServiceConfig;
use edge_kv::KvNamespace;
use edge_observability::{LogFormat, LogReporter};
use metadata_api::{LogSettings, MetadataStore, RequestHandler};

#[cfg(target_arch = "wasm32")]
mod component;

/// Header the Spin runtime sets to the full request URL.
pub const FULL_URL_HEADER: &str = "spin-full-url";

/// Origin assumed when the runtime does not report the full URL.
const FALLBACK_ORIGIN: &str = "http://localhost";

/// Opened stores the handler reads from and caches into.
pub struct Bindings {
    pub packages: Arc<dyn KvNamespace>,
    pub versions: Arc<dyn KvNamespace>,
    pub sris: Arc<dyn KvNamespace>,
    pub aggregated: Arc<dyn KvNamespace>,
    pub responses: Arc<dyn ResponseStore>,
}

/// Absolute request URL used as the cache key identity.
pub fn request_url(full_url: Option<&str>, path_with_query: &str) -> String {
    match full_url {
        Some(url) if !url.is_empty() => url.to_string(),
        _ => format!("{}{}", FALLBACK_ORIGIN, path_with_query),
    }
}

/// Assemble the request handler for one invocation.
pub fn build_handler(
    config: ServiceConfig,
    bindings: Bindings,
    tasks: Arc<dyn BackgroundTasks>,
    format: LogFormat,
) -> RequestHandler {
    let log = LogSettings {
        format,
        ..LogSettings::default()
    };
    let store = MetadataStore::new(
        bindings.packages,
        bindings.versions,
        bindings.sris,
        bindings.aggregated,
    )
    .with_page_size(config.list_page_size);
    let cache = ResponseCache::new(bindings.responses, tasks).on_store_error(log.store_error_hook());
    let reporter = LogReporter::new()
        .with_dsn(config.failure_dsn.clone())
        .with_format(format);

    RequestHandler::new(store, cache, Arc::new(reporter), config).with_log_settings(log)
}

#[cfg(test)]
mod tests {
    use edge_cache::{DeferredTasks, InMemoryResponseStore};
    use edge_core::{Environment, Method, RequestContext, StatusCode};
    use edge_kv::InMemoryNamespace;

    use super::*;

    fn bindings(packages: Arc<InMemoryNamespace>) -> Bindings {
        let empty = || Arc::new(InMemoryNamespace::new("empty"));
        Bindings {
            packages,
            versions: empty(),
            sris: empty(),
            aggregated: empty(),
            responses: Arc::new(InMemoryResponseStore::new()),
        }
    }

    // === URL Tests ===

    #[test]
    fn test_request_url_prefers_full_url() {
        assert_eq!(
            request_url(Some("https://api.example.com/packages?x=1"), "/packages?x=1"),
            "https://api.example.com/packages?x=1"
        );
        assert_eq!(request_url(None, "/packages"), "http://localhost/packages");
        assert_eq!(request_url(Some(""), "/extensions"), "http://localhost/extensions");
    }

    // === Wiring Tests ===

    #[tokio::test]
    async fn test_handler_defers_cache_writes() {
        let packages = Arc::new(InMemoryNamespace::new("packages"));
        packages.put("jquery", "{}");
        let tasks = Arc::new(DeferredTasks::new());
        let config = ServiceConfig::from_lookup(|name| match name {
            "environment" => Some("staging".to_string()),
            "list_page_size" => Some("500".to_string()),
            _ => None,
        })
        .unwrap();
        assert_eq!(config.environment, Environment::Staging);

        let handler = build_handler(config, bindings(packages), tasks.clone(), LogFormat::Json);
        let ctx = RequestContext::new(Method::Get, request_url(None, "/packages/jquery")).unwrap();
        let resp = handler.handle(&ctx).await;

        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(tasks.pending(), 1);
        tasks.drain().await;
        assert_eq!(tasks.pending(), 0);
    }
}

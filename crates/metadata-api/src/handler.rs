//! Request orchestration.
//!
//! A request moves through a fixed sequence of phases:
//!
//! ```text
//! received -> path decoded -> special cases -> cache lookup
//!     -> hit:  respond
//!     -> miss: route matched -> store call -> response built
//!              -> cache store scheduled -> respond
//! ```
//!
//! Any error ends the request with a 500, reported once to the failure
//! sink. Paths that are never cached (`/favicon.ico`, `/extensions` and
//! unknown paths) are answered right after the special-case check and never
//! touch the cache.

use std::sync::Arc;

use edge_cache::{
    header_names, should_include_debug_headers, CacheError, CacheExplainHeaders, CacheKey,
    CacheStatus, ResponseCache, StoreErrorHook,
};
use edge_core::{RequestContext, RequestId, RequestLifecycle, RequestPhase, Response, ServiceConfig};
use edge_observability::{
    FailureEvent, FailureReporter, LogCapture, LogFormat, LogLevel, RequestMetrics,
    StructuredLogger,
};

use crate::extensions::ALLOWED_EXTENSIONS;
use crate::response::{self, FAILURE_MESSAGE, FAVICON_MESSAGE, NOT_FOUND_MESSAGE};
use crate::store::version_key;
use crate::uri::decode_uri;
use crate::{ApiError, Endpoint, MetadataStore, Route, Router};

/// Service name attached to every log line.
pub const SERVICE_NAME: &str = "metadata-api";

/// What the request turned out to be, for logs and failure reports.
#[derive(Debug, Default)]
struct Outcome {
    endpoint: Option<Endpoint>,
    cache_status: Option<CacheStatus>,
    key: Option<CacheKey>,
}

/// Log settings shared by the handler and its background hooks.
#[derive(Debug, Clone, Default)]
pub struct LogSettings {
    pub format: LogFormat,
    pub min_level: Option<LogLevel>,
    pub capture: Option<LogCapture>,
}

impl LogSettings {
    fn logger(&self, request_id: RequestId) -> StructuredLogger {
        let mut logger = StructuredLogger::new(request_id)
            .with_service(SERVICE_NAME)
            .with_format(self.format);
        if let Some(level) = self.min_level {
            logger = logger.with_min_level(level);
        }
        if let Some(capture) = &self.capture {
            logger = logger.with_capture(capture.clone());
        }
        logger
    }

    /// Hook that logs failed background cache writes and drops them.
    pub fn store_error_hook(&self) -> StoreErrorHook {
        let settings = self.clone();
        Arc::new(move |key: &CacheKey, err: &CacheError| {
            settings
                .logger(RequestId::generate())
                .warn_builder("cache write failed")
                .field("key", key.as_str())
                .field("error", err.to_string())
                .emit();
        })
    }
}

/// Serves metadata requests against injected stores, cache and failure sink.
pub struct RequestHandler {
    store: MetadataStore,
    cache: ResponseCache,
    reporter: Arc<dyn FailureReporter>,
    config: ServiceConfig,
    router: Router,
    log: LogSettings,
}

impl RequestHandler {
    pub fn new(
        store: MetadataStore,
        cache: ResponseCache,
        reporter: Arc<dyn FailureReporter>,
        config: ServiceConfig,
    ) -> Self {
        Self {
            store,
            cache,
            reporter,
            config,
            router: Router::new(),
            log: LogSettings::default(),
        }
    }

    /// Set how request logs are written.
    pub fn with_log_settings(mut self, log: LogSettings) -> Self {
        self.log = log;
        self
    }

    pub fn router(&self) -> &Router {
        &self.router
    }

    pub fn config(&self) -> &ServiceConfig {
        &self.config
    }

    /// Serve one request. Never fails: errors become a 500.
    pub async fn handle(&self, ctx: &RequestContext) -> Response {
        let mut logger = self.log.logger(ctx.request_id.clone());
        let mut lifecycle = RequestLifecycle::start();
        let mut outcome = Outcome::default();

        logger
            .debug_builder("request received")
            .field("method", ctx.method.as_str())
            .field("path", ctx.path.clone())
            .emit();

        let mut response = match self.serve(ctx, &mut lifecycle, &mut outcome, &mut logger).await {
            Ok(response) => response,
            Err(err) => self.fail(ctx, &mut lifecycle, &outcome, err, &logger),
        };

        let cache_status = outcome.cache_status.unwrap_or(CacheStatus::Bypass);
        if self.config.debug_cache_headers && should_include_debug_headers(ctx) {
            let mut explain = CacheExplainHeaders::new().with_status(cache_status);
            if let Some(key) = &outcome.key {
                explain = explain.with_key(key);
            }
            for (name, value) in explain.to_headers() {
                response.set_header(name, value);
            }
        }
        response.set_header(header_names::X_REQUEST_ID, ctx.request_id.as_str());

        if !lifecycle.current().is_terminal() {
            let _ = lifecycle.advance(RequestPhase::Responded);
        }
        RequestMetrics::from_lifecycle(
            ctx.request_id.as_str(),
            outcome.endpoint.map(|e| e.name().to_string()),
            response.status().as_u16(),
            cache_status,
            &lifecycle,
        )
        .log(&logger);

        response
    }

    async fn serve(
        &self,
        ctx: &RequestContext,
        lifecycle: &mut RequestLifecycle,
        outcome: &mut Outcome,
        logger: &mut StructuredLogger,
    ) -> Result<Response, ApiError> {
        let path = decode_uri(&ctx.path)?;
        lifecycle.advance(RequestPhase::PathDecoded)?;

        let route = self.router.resolve(&path);
        let endpoint = route.endpoint();
        outcome.endpoint = Some(endpoint);
        logger.set_route(endpoint.name());
        lifecycle.advance(RequestPhase::SpecialCaseChecked)?;

        if !endpoint.is_cached() {
            if endpoint == Endpoint::Forbidden {
                logger.info_builder("forbidden path").field("path", path).emit();
            }
            let (response, _) = self.dispatch(&route).await?;
            return Ok(response);
        }

        let key = CacheKey::for_request(ctx.method, &ctx.url);
        outcome.key = Some(key.clone());
        lifecycle.advance(RequestPhase::CacheLookup)?;
        if let Some(cached) = self.cache.lookup(&key).await? {
            lifecycle.advance(RequestPhase::CacheHit)?;
            outcome.cache_status = Some(CacheStatus::Hit);
            logger.debug_builder("cache hit").field("key", key.as_str()).emit();
            return Ok(cached);
        }
        outcome.cache_status = Some(CacheStatus::Miss);
        logger.debug_builder("cache miss").field("key", key.as_str()).emit();

        lifecycle.advance(RequestPhase::RouteMatched)?;
        logger.debug("route selected");

        lifecycle.advance(RequestPhase::StoreCall)?;
        let (response, found) = self.dispatch(&route).await?;
        lifecycle.advance(RequestPhase::ResponseBuilt)?;

        let response = self.cache.store(&key, response, &endpoint.cache_policy(found));
        lifecycle.advance(RequestPhase::CacheStoreScheduled)?;
        Ok(response)
    }

    /// Build the response for a route; the flag says whether the entity
    /// was found.
    async fn dispatch(&self, route: &Route) -> Result<(Response, bool), ApiError> {
        Ok(match route {
            Route::Favicon => (response::not_found(FAVICON_MESSAGE), false),
            Route::Extensions => (response::json(ALLOWED_EXTENSIONS)?, true),
            Route::Forbidden => (response::forbidden(), false),
            Route::Packages => (response::json(&self.store.list_packages().await?)?, true),
            Route::Package { package } => match self.store.get_package(package).await? {
                Some(doc) => (response::json_document(doc), true),
                None => (response::not_found(NOT_FOUND_MESSAGE), false),
            },
            Route::PackageSris { package, version } => {
                let sris = self.store.list_sris(package, version.as_deref()).await?;
                (response::json(&sris)?, true)
            }
            Route::Aggregated { package } => match self.store.get_aggregated(package).await? {
                Some(gzip) => (response::gzip_json(gzip), true),
                None => (response::not_found(NOT_FOUND_MESSAGE), false),
            },
            Route::Versions { package } => {
                (response::json(&self.store.list_versions(package).await?)?, true)
            }
            Route::Version { package, version } => {
                match self.store.get_version(package, version).await? {
                    Some(doc) => (response::json_document(doc), true),
                    None => (response::version_not_found(&version_key(package, version)), false),
                }
            }
        })
    }

    fn fail(
        &self,
        ctx: &RequestContext,
        lifecycle: &mut RequestLifecycle,
        outcome: &Outcome,
        err: ApiError,
        logger: &StructuredLogger,
    ) -> Response {
        let _ = lifecycle.advance(RequestPhase::Failed(err.to_string()));

        let err = anyhow::Error::new(err);
        let message = err.to_string();
        let detail = format!("{:?}", err);

        logger
            .error_builder("request failed")
            .field("error", message.clone())
            .field("detail", detail.clone())
            .emit();

        self.reporter.report(&FailureEvent {
            request_id: ctx.request_id.to_string(),
            environment: self.config.environment,
            route: outcome.endpoint.map(|e| e.name().to_string()),
            path: ctx.path.clone(),
            message,
            detail: detail.clone(),
        });

        if self.config.environment.is_production() {
            response::failure(FAILURE_MESSAGE)
        } else {
            response::failure(detail)
        }
    }
}

//! Spin HTTP entry point.

use std::sync::Arc;

use anyhow::Context;
use edge_cache::{DeferredTasks, SpinResponseStore};
use edge_core::{Method, RequestContext, RequestId, Response, ServiceConfig, StatusCode, StoreBindings};
use edge_kv::SpinNamespace;
use edge_observability::{LogFormat, StructuredLogger};
use futures::SinkExt;
use metadata_api::{FAILURE_MESSAGE, SERVICE_NAME};
use spin_sdk::http::{Fields, IncomingRequest, Method as SpinMethod, OutgoingResponse, ResponseOutparam};
use spin_sdk::http_component;
use spin_sdk::variables;

use crate::{build_handler, request_url, Bindings, FULL_URL_HEADER};

#[http_component]
async fn handle_metadata(req: IncomingRequest, response_out: ResponseOutparam) {
    let logger = StructuredLogger::new(RequestId::generate()).with_service(SERVICE_NAME);
    let tasks = Arc::new(DeferredTasks::new());

    let response = match serve(&req, tasks.clone()).await {
        Ok(response) => response,
        Err(err) => {
            logger
                .error_builder("component setup failed")
                .field("error", format!("{:#}", err))
                .emit();
            Response::text(StatusCode::INTERNAL_SERVER_ERROR, FAILURE_MESSAGE)
        }
    };

    send(response, response_out, &logger).await;
    tasks.drain().await;
}

async fn serve(req: &IncomingRequest, tasks: Arc<DeferredTasks>) -> anyhow::Result<Response> {
    let config = ServiceConfig::from_lookup(|name| variables::get(name).ok())
        .context("invalid service configuration")?;
    let bindings = open_bindings(&config.stores)?;
    let ctx = request_context(req)?;

    let handler = build_handler(config, bindings, tasks, LogFormat::Json);
    Ok(handler.handle(&ctx).await)
}

fn open_bindings(stores: &StoreBindings) -> anyhow::Result<Bindings> {
    let open = |label: &str| {
        SpinNamespace::open(label).with_context(|| format!("failed to open store {}", label))
    };
    Ok(Bindings {
        packages: Arc::new(open(&stores.packages)?),
        versions: Arc::new(open(&stores.versions)?),
        sris: Arc::new(open(&stores.sris)?.with_value_metadata()),
        aggregated: Arc::new(open(&stores.aggregated)?),
        responses: Arc::new(
            SpinResponseStore::open(stores.response_cache.clone())
                .context("failed to open response cache")?,
        ),
    })
}

fn request_context(req: &IncomingRequest) -> anyhow::Result<RequestContext> {
    let method = Method::from_name(method_name(&req.method())).unwrap_or(Method::Get);
    let headers = req.headers().entries();
    let full_url = headers
        .iter()
        .find(|(name, _)| name.eq_ignore_ascii_case(FULL_URL_HEADER))
        .map(|(_, value)| String::from_utf8_lossy(value).into_owned());
    let url = request_url(full_url.as_deref(), &req.path_with_query().unwrap_or_default());

    let mut ctx = RequestContext::new(method, url).context("invalid request url")?;
    for (name, value) in headers {
        ctx = ctx.with_header(name, String::from_utf8_lossy(&value));
    }
    Ok(ctx)
}

fn method_name(method: &SpinMethod) -> &str {
    match method {
        SpinMethod::Get => "GET",
        SpinMethod::Head => "HEAD",
        SpinMethod::Post => "POST",
        SpinMethod::Put => "PUT",
        SpinMethod::Delete => "DELETE",
        SpinMethod::Connect => "CONNECT",
        SpinMethod::Options => "OPTIONS",
        SpinMethod::Trace => "TRACE",
        SpinMethod::Patch => "PATCH",
        SpinMethod::Other(other) => other,
    }
}

async fn send(response: Response, response_out: ResponseOutparam, logger: &StructuredLogger) {
    let (status, headers, body) = response.into_parts();
    let header_list: Vec<(String, Vec<u8>)> = headers
        .into_iter()
        .map(|(name, value)| (name.to_ascii_lowercase(), value.into_bytes()))
        .collect();
    let fields = Fields::from_list(&header_list).unwrap_or_else(|_| Fields::new());

    let outgoing = OutgoingResponse::new(fields);
    if outgoing.set_status_code(status.as_u16()).is_err() {
        logger
            .warn_builder("invalid status code")
            .field_u64("status", u64::from(status.as_u16()))
            .emit();
    }

    let mut sink = outgoing.take_body();
    response_out.set(outgoing);
    if let Err(e) = sink.send(body).await {
        logger
            .error_builder("failed to write response body")
            .field("error", format!("{:?}", e))
            .emit();
    }
}

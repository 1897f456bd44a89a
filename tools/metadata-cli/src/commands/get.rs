//! Local request execution.

use std::io::Read;
use std::sync::Arc;

use anyhow::{bail, Context as _, Result};
use edge_cache::{DeferredTasks, InMemoryResponseStore, ResponseCache};
use edge_core::{Method, RequestContext, Response};
use edge_observability::{LogFormat, LogLevel, LogReporter};
use flate2::read::GzDecoder;
use metadata_api::{LogSettings, RequestHandler};
use serde::Serialize;

use super::GetArgs;
use crate::context::Context;
use crate::fixtures::Fixtures;
use crate::output::{format_bytes, status_badge};

/// Origin used for request URLs and cache keys.
const LOCAL_ORIGIN: &str = "http://localhost";

#[derive(Serialize)]
struct Reply {
    attempt: usize,
    status: u16,
    headers: Vec<(String, String)>,
    body: String,
}

/// Run the get command.
pub async fn run(args: GetArgs, ctx: &Context) -> Result<()> {
    if args.repeat == 0 {
        bail!("--repeat must be at least 1");
    }

    let fixtures = match &args.fixtures {
        Some(path) => Fixtures::load(&ctx.resolve_path(path))?,
        None => Fixtures::default(),
    };
    ctx.output
        .debug(&format!("Loaded {} fixture records", fixtures.len()));

    let mut config = ctx.config.clone();
    if args.debug_cache {
        config.debug_cache_headers = true;
    }
    let store = fixtures.into_store(config.list_page_size)?;

    let log = LogSettings {
        format: LogFormat::Tracing,
        min_level: ctx.output.is_verbose().then_some(LogLevel::Debug),
        capture: None,
    };
    let tasks = Arc::new(DeferredTasks::new());
    let cache = ResponseCache::new(Arc::new(InMemoryResponseStore::new()), tasks.clone())
        .on_store_error(log.store_error_hook());
    let reporter = LogReporter::new()
        .with_dsn(config.failure_dsn.clone())
        .with_format(LogFormat::Tracing);
    let handler = RequestHandler::new(store, cache, Arc::new(reporter), config).with_log_settings(log);

    let url = request_url(&args.path);
    let mut replies = Vec::with_capacity(args.repeat);
    for attempt in 1..=args.repeat {
        let mut request = RequestContext::new(Method::Get, url.as_str())
            .with_context(|| format!("Invalid path: {}", args.path))?;
        if args.debug_cache {
            request = request.with_header("X-Debug-Cache", "1");
        }

        let response = handler.handle(&request).await;
        tasks.drain().await;

        let reply = Reply {
            attempt,
            status: response.status().as_u16(),
            headers: response.headers().to_vec(),
            body: render_body(&response, args.inflate)?,
        };
        if !ctx.output.is_json() {
            print_reply(ctx, &reply, &response, args.headers);
        }
        replies.push(reply);
    }

    if ctx.output.is_json() {
        ctx.output.json(&replies);
    }

    Ok(())
}

fn request_url(path: &str) -> String {
    if path.starts_with('/') {
        format!("{}{}", LOCAL_ORIGIN, path)
    } else {
        format!("{}/{}", LOCAL_ORIGIN, path)
    }
}

fn print_reply(ctx: &Context, reply: &Reply, response: &Response, show_headers: bool) {
    ctx.output.header(&format!(
        "#{} {} ({})",
        reply.attempt,
        status_badge(reply.status),
        format_bytes(response.body().len() as u64)
    ));
    if show_headers {
        for (name, value) in &reply.headers {
            ctx.output.kv(name, value);
        }
    }
    ctx.output.raw(&reply.body);
}

/// Body as printable text, gunzipped first when asked.
fn render_body(response: &Response, inflate: bool) -> Result<String> {
    let gzipped = response
        .header("content-encoding")
        .is_some_and(|encoding| encoding.eq_ignore_ascii_case("gzip"));

    if gzipped && inflate {
        let mut text = String::new();
        GzDecoder::new(response.body())
            .read_to_string(&mut text)
            .context("Failed to inflate gzip body")?;
        return Ok(text);
    }
    if gzipped {
        return Ok(format!(
            "<{} of gzip data, use --inflate to decode>",
            format_bytes(response.body().len() as u64)
        ));
    }
    Ok(String::from_utf8_lossy(response.body()).into_owned())
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use edge_core::StatusCode;
    use flate2::write::GzEncoder;
    use flate2::Compression;

    use super::*;

    fn gzip_response(text: &str) -> Response {
        let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(text.as_bytes()).unwrap();
        Response::new(StatusCode::OK)
            .with_header("Content-Encoding", "gzip")
            .with_body(encoder.finish().unwrap())
    }

    #[test]
    fn test_request_url() {
        assert_eq!(request_url("/packages"), "http://localhost/packages");
        assert_eq!(request_url("extensions"), "http://localhost/extensions");
    }

    #[test]
    fn test_render_plain_body() {
        let resp = Response::text(StatusCode::FORBIDDEN, "invalid request");
        assert_eq!(render_body(&resp, true).unwrap(), "invalid request");
    }

    #[test]
    fn test_render_gzip_body() {
        let resp = gzip_response(r#"{"name":"jquery"}"#);
        assert_eq!(render_body(&resp, true).unwrap(), r#"{"name":"jquery"}"#);
        assert!(render_body(&resp, false).unwrap().contains("--inflate"));
    }

    #[test]
    fn test_render_corrupt_gzip() {
        let resp = Response::new(StatusCode::OK)
            .with_header("Content-Encoding", "gzip")
            .with_body(vec![1, 2, 3]);
        assert!(render_body(&resp, true).is_err());
    }
}

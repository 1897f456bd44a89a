//! Route table listing.

use anyhow::Result;
use metadata_api::Router;
use serde::Serialize;

use crate::context::Context;
use crate::output::format_ttl;

#[derive(Serialize)]
struct RouteRow {
    pattern: &'static str,
    endpoint: &'static str,
    cached: bool,
    ttl_found_secs: u64,
    ttl_missing_secs: u64,
}

/// Run the routes command.
pub async fn run(ctx: &Context) -> Result<()> {
    let rows: Vec<RouteRow> = Router::new()
        .routes()
        .iter()
        .map(|spec| RouteRow {
            pattern: spec.pattern,
            endpoint: spec.endpoint.name(),
            cached: spec.endpoint.is_cached(),
            ttl_found_secs: spec.endpoint.cache_policy(true).ttl_secs(),
            ttl_missing_secs: spec.endpoint.cache_policy(false).ttl_secs(),
        })
        .collect();

    if ctx.output.is_json() {
        ctx.output.json(&rows);
        return Ok(());
    }

    ctx.output.header("Routes (in match order)");
    let widths = [40, 12, 8, 8];
    ctx.output
        .table_row(&["PATTERN", "ENDPOINT", "FOUND", "MISSING"], &widths);
    for row in &rows {
        let found = format_ttl(row.ttl_found_secs);
        let missing = format_ttl(row.ttl_missing_secs);
        ctx.output
            .table_row(&[row.pattern, row.endpoint, &found, &missing], &widths);
    }
    ctx.output.info("Any other path is answered with 403 and never cached.");

    Ok(())
}

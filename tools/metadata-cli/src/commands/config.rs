//! Configuration commands.

use anyhow::{Context as _, Result};

use super::{ConfigArgs, ConfigCommand};
use crate::context::Context;

/// Run the config command.
pub async fn run(args: ConfigArgs, ctx: &Context) -> Result<()> {
    match args.command {
        ConfigCommand::Show => show_config(ctx).await,
        ConfigCommand::Validate => validate_config(ctx).await,
    }
}

async fn show_config(ctx: &Context) -> Result<()> {
    if ctx.output.is_json() {
        ctx.output.json(&ctx.config);
        return Ok(());
    }

    ctx.output.header("Current Configuration");
    ctx.output.kv("source", &ctx.source.to_string());
    ctx.output.raw("");

    let rendered = toml::to_string_pretty(&ctx.config).context("Failed to render config")?;
    ctx.output.raw(rendered.trim_end());

    Ok(())
}

async fn validate_config(ctx: &Context) -> Result<()> {
    ctx.config
        .validate()
        .with_context(|| format!("Invalid configuration in {}", ctx.source))?;

    if ctx.output.is_json() {
        ctx.output.json(&serde_json::json!({
            "valid": true,
            "source": ctx.source.to_string(),
        }));
    } else {
        ctx.output
            .success(&format!("Configuration is valid ({})", ctx.source));
    }

    Ok(())
}

//! Configuration management commands.

use std::fs;

use anyhow::{bail, Result};
use dialoguer::Confirm;

use super::{ConfigArgs, ConfigCommand};
use crate::config::{generate_default_config, CONFIG_FILE_NAMES};
use crate::context::Context;

/// Run the config command.
pub fn run(args: ConfigArgs, ctx: &Context) -> Result<()> {
    match args.command {
        ConfigCommand::Show => show_config(ctx),
        ConfigCommand::Init { force } => init_config(force, ctx),
        ConfigCommand::Validate => validate_config(ctx),
    }
}

fn show_config(ctx: &Context) -> Result<()> {
    if ctx.output.is_json() {
        ctx.output.json(&ctx.config);
        return Ok(());
    }

    ctx.output.header("Current Configuration");
    match ctx.config_path {
        Some(ref path) => ctx.output.kv("file", &path.display().to_string()),
        None => ctx.output.kv("file", "(defaults)"),
    }

    let pricing = &ctx.config.pricing;
    ctx.output.info("");
    ctx.output.info("[pricing]");
    ctx.output.kv("currency", pricing.currency.code());
    ctx.output.kv(
        "tax_rate_bps",
        &format!("{} ({}%)", pricing.tax_rate_bps, pricing.tax_rate_bps as f64 / 100.0),
    );
    ctx.output.kv("flat_shipping_fee", &pricing.money(pricing.flat_shipping_fee).display());
    ctx.output.kv(
        "free_shipping_threshold",
        &pricing.money(pricing.free_shipping_threshold).display(),
    );
    ctx.output.kv("loyalty_point_value", &pricing.money(pricing.loyalty_point_value).display());
    ctx.output.kv("loyalty_earn_divisor", &pricing.loyalty_earn_divisor.to_string());
    ctx.output.kv("max_quantity_per_item", &pricing.max_quantity_per_item.to_string());
    ctx.output.kv("return_window_days", &pricing.return_window_days.to_string());
    ctx.output.kv("cart_ttl_days", &pricing.cart_ttl_days.to_string());

    ctx.output.info("");
    ctx.output.info("[output]");
    ctx.output.kv("color", &ctx.config.output.color.to_string());
    ctx.output.kv("pretty_json", &ctx.config.output.pretty_json.to_string());

    Ok(())
}

fn init_config(force: bool, ctx: &Context) -> Result<()> {
    let config_path = ctx.cwd.join(CONFIG_FILE_NAMES[0]);

    if config_path.exists() && !force {
        if ctx.output.is_json() {
            bail!(
                "Config file already exists: {}. Use --force to overwrite.",
                config_path.display()
            );
        }

        let overwrite = Confirm::new()
            .with_prompt(format!("{} exists. Overwrite?", config_path.display()))
            .default(false)
            .interact()?;

        if !overwrite {
            ctx.output.info("Config file left unchanged");
            return Ok(());
        }
    }

    fs::write(&config_path, generate_default_config())?;

    ctx.output.success(&format!("Created: {}", config_path.display()));

    Ok(())
}

fn validate_config(ctx: &Context) -> Result<()> {
    ctx.output.header("Validating configuration");

    let pricing = &ctx.config.pricing;
    let mut errors: Vec<String> = Vec::new();
    let mut warnings: Vec<String> = Vec::new();

    if let Err(e) = pricing.validate() {
        errors.push(e.to_string());
    }

    if pricing.tax_rate_bps == 0 {
        warnings.push("pricing.tax_rate_bps is 0, orders carry no tax".to_string());
    }
    if pricing.free_shipping_threshold == 0 {
        warnings.push("pricing.free_shipping_threshold is 0, shipping is always free".to_string());
    }
    if pricing.loyalty_point_value == 0 {
        warnings.push("pricing.loyalty_point_value is 0, redeemed points are worth nothing".to_string());
    }
    if pricing.return_window_days == 0 {
        warnings.push("pricing.return_window_days is 0, returns close on delivery".to_string());
    }

    if errors.is_empty() && warnings.is_empty() {
        ctx.output.success("Configuration is valid");
        return Ok(());
    }

    for error in &errors {
        ctx.output.error(&format!("Error: {}", error));
    }

    for warning in &warnings {
        ctx.output.warn(&format!("Warning: {}", warning));
    }

    if !errors.is_empty() {
        bail!("Configuration has {} error(s)", errors.len());
    }

    ctx.output.success("Configuration is valid (with warnings)");

    Ok(())
}

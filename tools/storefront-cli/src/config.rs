//! CLI configuration.

use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use storefront_commerce::PricingPolicy;

/// File names searched for, in order, from the working directory upward.
pub const CONFIG_FILE_NAMES: [&str; 3] = ["storefront.toml", ".storefront.toml", "storefront.json"];

/// CLI configuration file.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StorefrontConfig {
    /// Store pricing policy. Missing keys take their defaults.
    #[serde(default)]
    pub pricing: PricingPolicy,

    /// Terminal output settings.
    #[serde(default)]
    pub output: OutputConfig,
}

impl StorefrontConfig {
    /// Load config from a file.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        if is_json(path) {
            serde_json::from_str(&content)
                .with_context(|| format!("Failed to parse JSON config: {}", path.display()))
        } else {
            toml::from_str(&content)
                .with_context(|| format!("Failed to parse TOML config: {}", path.display()))
        }
    }

    /// Save config to a file.
    pub fn save(&self, path: &Path) -> Result<()> {
        let content = if is_json(path) {
            serde_json::to_string_pretty(self)?
        } else {
            toml::to_string_pretty(self)?
        };

        std::fs::write(path, content)
            .with_context(|| format!("Failed to write config file: {}", path.display()))
    }
}

/// Terminal output settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutputConfig {
    /// Colored output (default: true).
    #[serde(default = "default_true")]
    pub color: bool,

    /// Pretty-print JSON output (default: true).
    #[serde(default = "default_true")]
    pub pretty_json: bool,
}

fn default_true() -> bool {
    true
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            color: true,
            pretty_json: true,
        }
    }
}

fn is_json(path: &Path) -> bool {
    path.extension().and_then(|e| e.to_str()) == Some("json")
}

/// Generate a default storefront.toml config file.
pub fn generate_default_config() -> String {
    let defaults = PricingPolicy::default();
    format!(
        r#"# Storefront configuration

[pricing]
currency = "{currency}"
# 1000 bps = 10%
tax_rate_bps = {tax}
flat_shipping_fee = {shipping}
free_shipping_threshold = {threshold}
loyalty_point_value = {point_value}
loyalty_earn_divisor = {earn_divisor}
max_quantity_per_item = {max_quantity}
return_window_days = {return_days}
cart_ttl_days = {ttl_days}

[output]
color = true
pretty_json = true
"#,
        currency = defaults.currency.code(),
        tax = defaults.tax_rate_bps,
        shipping = defaults.flat_shipping_fee,
        threshold = defaults.free_shipping_threshold,
        point_value = defaults.loyalty_point_value,
        earn_divisor = defaults.loyalty_earn_divisor,
        max_quantity = defaults.max_quantity_per_item,
        return_days = defaults.return_window_days,
        ttl_days = defaults.cart_ttl_days,
    )
}

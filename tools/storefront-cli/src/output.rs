//! Terminal output for the CLI.
//!
//! Human-readable lines go to stdout and diagnostics to stderr. In
//! `--json` mode only the JSON document reaches stdout.

use console::{style, StyledObject, Term};
use serde::Serialize;
use storefront_commerce::order::OrderStatus;

use crate::config::OutputConfig;

#[derive(Clone)]
pub struct Output {
    verbose: bool,
    json: bool,
    pretty_json: bool,
    stdout: Term,
    stderr: Term,
}

impl Output {
    pub fn new(verbose: bool, json: bool, config: &OutputConfig) -> Self {
        if !config.color {
            console::set_colors_enabled(false);
            console::set_colors_enabled_stderr(false);
        }
        Self {
            verbose,
            json,
            pretty_json: config.pretty_json,
            stdout: Term::stdout(),
            stderr: Term::stderr(),
        }
    }

    /// Whether human-readable output is suppressed.
    pub fn is_json(&self) -> bool {
        self.json
    }

    fn line(&self, text: String) {
        if !self.json {
            let _ = self.stdout.write_line(&text);
        }
    }

    fn diagnostic(&self, marker: StyledObject<&str>, text: String) {
        if !self.json {
            let _ = self.stderr.write_line(&format!("{} {}", marker, text));
        }
    }

    pub fn info(&self, msg: &str) {
        self.line(format!("{} {}", style("ℹ").blue(), msg));
    }

    pub fn success(&self, msg: &str) {
        self.line(format!("{} {}", style("✓").green(), msg));
    }

    pub fn warn(&self, msg: &str) {
        self.diagnostic(style("⚠").yellow(), msg.to_string());
    }

    /// Errors are reported in both modes; `--json` wraps them in an object.
    pub fn error(&self, msg: &str) {
        let text = if self.json {
            serde_json::json!({ "error": msg }).to_string()
        } else {
            format!("{} {}", style("✗").red(), style(msg).red())
        };
        let _ = self.stderr.write_line(&text);
    }

    /// Only shown with `--verbose`.
    pub fn debug(&self, msg: &str) {
        if self.verbose {
            self.diagnostic(style("→").dim(), style(msg).dim().to_string());
        }
    }

    pub fn header(&self, msg: &str) {
        self.line(format!("\n{}", style(msg).bold().underlined()));
    }

    pub fn kv(&self, key: &str, value: &str) {
        self.line(format!("  {}: {}", style(key).dim(), value));
    }

    pub fn list_item(&self, item: &str) {
        self.line(format!("  {} {}", style("•").dim(), item));
    }

    /// Left-aligned columns padded to `widths`.
    pub fn table_row(&self, cols: &[&str], widths: &[usize]) {
        let cells: Vec<String> = cols
            .iter()
            .zip(widths)
            .map(|(col, width)| format!("{:width$}", col, width = width))
            .collect();
        self.line(format!("  {}", cells.join("  ")));
    }

    /// Print a document to stdout, whatever the mode.
    pub fn json<T: Serialize>(&self, value: &T) {
        let rendered = if self.pretty_json {
            serde_json::to_string_pretty(value)
        } else {
            serde_json::to_string(value)
        };
        if let Ok(json) = rendered {
            let _ = self.stdout.write_line(&json);
        }
    }
}

/// Colored label for an order status.
pub fn status_badge(status: OrderStatus) -> String {
    let label = status.display_name();
    match status {
        OrderStatus::Delivered => style(label).green().to_string(),
        OrderStatus::Pending | OrderStatus::Confirmed | OrderStatus::Processing => {
            style(label).yellow().to_string()
        }
        OrderStatus::Shipped => style(label).cyan().to_string(),
        OrderStatus::Cancelled => style(label).red().to_string(),
        OrderStatus::Returned => style(label).dim().to_string(),
    }
}

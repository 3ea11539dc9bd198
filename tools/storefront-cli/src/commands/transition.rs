//! Move a stored order to a new status.

use anyhow::{anyhow, Context as _, Result};
use dialoguer::Confirm;
use storefront_commerce::order::{Order, OrderStatus};

use super::checkout::print_order;
use super::TransitionArgs;
use crate::context::Context;
use crate::output::status_badge;
use crate::scenario;

/// Run the transition command.
pub fn run(args: TransitionArgs, ctx: &Context) -> Result<()> {
    let path = ctx.resolve_path(&args.order);
    let mut order: Order = scenario::load(&path)?;
    let status: OrderStatus = args.status.parse().map_err(|e: String| anyhow!(e))?;

    let previous = order.status();
    let changed = order.transition_status(status, args.note.clone(), args.actor.clone());

    if changed {
        ctx.output.success(&format!(
            "Order {}: {} -> {}",
            order.order_number(),
            status_badge(previous),
            status_badge(status)
        ));
    } else {
        ctx.output.info(&format!(
            "Order {} is already {}",
            order.order_number(),
            status_badge(status)
        ));
    }

    let return_window = ctx.config.pricing.return_window_days;
    if ctx.output.is_json() {
        ctx.output.json(&serde_json::json!({
            "changed": changed,
            "can_be_cancelled": order.can_be_cancelled(),
            "can_be_returned": order.can_be_returned(return_window),
            "order": &order,
        }));
    } else {
        print_order(&ctx.output, &order);
        ctx.output.kv("can be cancelled", &order.can_be_cancelled().to_string());
        ctx.output.kv(
            "can be returned",
            &order.can_be_returned(return_window).to_string(),
        );
    }

    if !args.write || !changed {
        return Ok(());
    }

    if !args.yes && !ctx.output.is_json() {
        let confirmed = Confirm::new()
            .with_prompt(format!("Write updated order to {}?", path.display()))
            .default(false)
            .interact()?;

        if !confirmed {
            ctx.output.info("Order file left unchanged");
            return Ok(());
        }
    }

    let json = serde_json::to_string_pretty(&order)?;
    std::fs::write(&path, json)
        .with_context(|| format!("Failed to write order: {}", path.display()))?;
    ctx.output.success(&format!("Updated {}", path.display()));

    Ok(())
}

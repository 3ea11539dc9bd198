//! Run a checkout scenario against an in-memory storefront.

use std::sync::Arc;

use anyhow::{Context as _, Result};
use storefront_cache::Cache;
use storefront_commerce::identity::OrderCustomer;
use storefront_commerce::notify::LogNotifier;
use storefront_commerce::order::Order;
use storefront_commerce::Storefront;

use super::CheckoutArgs;
use crate::context::Context;
use crate::output::{status_badge, Output};
use crate::scenario::{self, CheckoutScenario};

/// Run the checkout command.
pub fn run(args: CheckoutArgs, ctx: &Context) -> Result<()> {
    let path = ctx.resolve_path(&args.scenario);
    let scenario: CheckoutScenario = scenario::load(&path)?;
    let policy = ctx.config.pricing.clone();

    let catalog = scenario.catalog(&policy);
    let storefront = Storefront::new(policy.clone(), Cache::in_memory(), Arc::new(catalog))
        .with_notifier(Arc::new(LogNotifier));

    for definition in &scenario.discounts {
        let code = storefront.discounts().create(definition.to_code(&policy)?)?;
        ctx.output.debug(&format!("Seeded discount code {}", code.code));
    }

    let identity = &scenario.identity;
    if scenario.loyalty_balance > 0 {
        if let Some(user) = identity.user_id() {
            storefront.loyalty().credit(user, scenario.loyalty_balance)?;
        } else {
            ctx.output
                .warn("loyalty_balance ignored: guest carts cannot hold points");
        }
    }

    for line in &scenario.lines {
        let variant = line.variant_id();
        storefront
            .add_item(identity, &line.product_id(), variant.as_ref(), line.quantity)
            .with_context(|| format!("Failed to add {} to the cart", line.product_id))?;
    }
    if let Some(ref code) = scenario.discount_code {
        let amount = storefront.apply_discount(identity, code)?;
        ctx.output
            .debug(&format!("Discount {} previews at {}", code, amount.display()));
    }
    if scenario.loyalty_points > 0 {
        storefront.use_loyalty_points(identity, scenario.loyalty_points)?;
    }

    let mut order = storefront.checkout(identity, scenario.request.clone())?;
    for step in &scenario.transitions {
        order = storefront.transition_order(
            order.order_number(),
            step.status,
            step.note.clone(),
            step.actor.clone(),
        )?;
    }

    if let Some(ref out) = args.out {
        let out_path = ctx.resolve_path(out);
        let json = serde_json::to_string_pretty(&order)?;
        std::fs::write(&out_path, json)
            .with_context(|| format!("Failed to write order: {}", out_path.display()))?;
        ctx.output
            .success(&format!("Order written to {}", out_path.display()));
    }

    if ctx.output.is_json() {
        ctx.output.json(&order);
        return Ok(());
    }

    print_order(&ctx.output, &order);
    if let Some(user) = identity.user_id() {
        ctx.output.kv(
            "loyalty balance",
            &storefront.loyalty().balance(user)?.to_string(),
        );
    }
    Ok(())
}

/// Print an order's lines, totals and status history.
pub fn print_order(output: &Output, order: &Order) {
    output.header(&format!("Order {}", order.order_number()));
    output.kv("status", &status_badge(order.status()));
    let payment = format!(
        "{} ({})",
        order.payment_method().as_str(),
        order.payment_status().as_str()
    );
    output.kv("payment", &payment);
    let customer = match order.customer() {
        OrderCustomer::Registered { user_id } => format!("user {}", user_id),
        OrderCustomer::Guest { contact } => format!("guest {} <{}>", contact.name, contact.email),
    };
    output.kv("customer", &customer);
    output.kv("ship to", &order.shipping_address().one_line());
    if let Some(tracking) = order.tracking_number() {
        output.kv("tracking", tracking);
    }

    output.header("Items");
    let widths = [24, 12, 6, 16];
    output.table_row(&["PRODUCT", "VARIANT", "QTY", "LINE TOTAL"], &widths);
    for item in order.items() {
        output.table_row(
            &[
                item.product_name.as_str(),
                item.variant_name.as_deref().unwrap_or("-"),
                item.quantity.to_string().as_str(),
                item.line_total.display().as_str(),
            ],
            &widths,
        );
    }

    output.header("Totals");
    output.kv("subtotal", &order.subtotal().display());
    output.kv("tax", &order.tax().display());
    output.kv("shipping", &order.shipping().display());
    if let Some(code) = order.discount_code() {
        output.kv(&format!("discount ({})", code), &format!("-{}", order.discount().display()));
    }
    if order.loyalty_points_used() > 0 {
        output.kv(
            &format!("loyalty ({} pts)", order.loyalty_points_used()),
            &format!("-{}", order.loyalty_discount().display()),
        );
    }
    output.kv("total", &order.total().display());
    output.kv("points earned", &order.loyalty_points_earned().to_string());

    output.header("History");
    for entry in order.status_history() {
        let mut line = format!(
            "{} {}",
            entry.timestamp.format("%Y-%m-%d %H:%M:%S"),
            entry.status.display_name()
        );
        if let Some(ref note) = entry.note {
            line.push_str(&format!(": {}", note));
        }
        if let Some(ref actor) = entry.actor {
            line.push_str(&format!(" ({})", actor));
        }
        output.list_item(&line);
    }
}

//! Price a cart scenario.

use anyhow::Result;
use storefront_commerce::cart::{CartEngine, CartSummary};
use storefront_commerce::identity::CartIdentity;
use storefront_commerce::ids::SessionId;
use storefront_commerce::money::Money;

use super::QuoteArgs;
use crate::context::Context;
use crate::output::Output;
use crate::scenario::{self, QuoteScenario};

/// Run the quote command.
pub fn run(args: QuoteArgs, ctx: &Context) -> Result<()> {
    let path = ctx.resolve_path(&args.cart);
    let quote: QuoteScenario = scenario::load(&path)?;
    let policy = &ctx.config.pricing;
    let engine = CartEngine::new(policy.clone());

    let identity = quote
        .identity
        .clone()
        .unwrap_or_else(|| CartIdentity::Guest(SessionId::generate()));
    let mut cart = engine.new_cart(identity);

    for line in &quote.lines {
        engine.add_item(
            &mut cart,
            line.product_id(),
            line.variant_id(),
            line.quantity,
            policy.money(line.unit_price),
        )?;
    }
    if let Some(ref discount) = quote.discount {
        let amount = engine.apply_discount(&mut cart, discount.to_attachment(policy)?)?;
        ctx.output
            .debug(&format!("Discount {} applied: {}", discount.code, amount.display()));
    }
    if quote.loyalty_points > 0 {
        engine.use_loyalty_points(&mut cart, quote.loyalty_points)?;
    }

    let summary = cart.summary();
    if ctx.output.is_json() {
        ctx.output.json(&summary);
        return Ok(());
    }

    ctx.output.header("Cart");
    let widths = [16, 10, 6, 16];
    ctx.output.table_row(&["PRODUCT", "VARIANT", "QTY", "LINE TOTAL"], &widths);
    for item in cart.items() {
        let line_total = item
            .line_total()
            .map(|m| m.display())
            .unwrap_or_else(|| "overflow".to_string());
        ctx.output.table_row(
            &[
                item.product_id.as_str(),
                item.variant_id.as_ref().map(|v| v.as_str()).unwrap_or("-"),
                item.quantity.to_string().as_str(),
                line_total.as_str(),
            ],
            &widths,
        );
    }

    print_summary(&ctx.output, &summary);
    Ok(())
}

/// Print the totals block shared by `quote` and `checkout`.
pub fn print_summary(output: &Output, summary: &CartSummary) {
    output.header("Totals");
    output.kv("items", &summary.item_count.to_string());
    output.kv("subtotal", &summary.subtotal.display());
    output.kv("tax", &summary.tax.display());
    output.kv("shipping", &summary.shipping.display());
    if let Some(ref code) = summary.discount_code {
        output.kv(&format!("discount ({})", code), &negated(&summary.discount));
    }
    if summary.loyalty_points_used > 0 {
        output.kv(
            &format!("loyalty ({} pts)", summary.loyalty_points_used),
            &negated(&summary.loyalty_discount),
        );
    }
    output.kv("total", &summary.total.display());
}

fn negated(amount: &Money) -> String {
    format!("-{}", amount.display())
}

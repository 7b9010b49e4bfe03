use chrono::NaiveDate;
use rust_decimal::Decimal;
use tarifa_core::domain::quote::QuoteSnapshot;

use crate::{format_date, format_money};

const RULE: &str = "--------------------------------";

/// Plain-text quote for pasting into a chat message. `None` when the quote has no lines.
pub fn quote_summary(snapshot: &QuoteSnapshot, company: &str, date: NaiveDate) -> Option<String> {
    if snapshot.is_empty() {
        return None;
    }

    let mut lines = vec![
        format!("📑 *PRESUPUESTO - {}*", company.trim().to_uppercase()),
        format!("📅 Fecha: {}", format_date(date)),
        RULE.to_string(),
        String::new(),
    ];

    for view in &snapshot.lines {
        let net_marker = if view.computation.is_net_applied { " (Precio Neto)" } else { "" };
        lines.push(format!("🔹 *{}*", view.line.description));
        lines.push(format!("   Ref: {}", view.line.reference));
        lines.push(format!(
            "   Cant: {} x {} €{net_marker}",
            view.line.quantity,
            format_money(view.computation.unit_price)
        ));
        lines.push(format!("   *Subtotal: {} €*", format_money(view.computation.line_total)));
        lines.push(String::new());
    }

    let totals = snapshot.totals;
    lines.push(RULE.to_string());
    lines.push(format!("Subtotal:      {} €", format_money(totals.subtotal)));
    if totals.shipping_cost > Decimal::ZERO {
        lines.push(format!("Portes:        {} €", format_money(totals.shipping_cost)));
    } else {
        lines.push("Portes:        GRATIS".to_string());
    }
    lines.push(String::new());
    lines.push(format!("💰 *TOTAL: {} €*", format_money(totals.total)));
    lines.push("*(Precios sin IVA)*".to_string());
    lines.push(RULE.to_string());

    Some(lines.join("\n"))
}

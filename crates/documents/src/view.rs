use rust_decimal::Decimal;
use serde::Serialize;
use tarifa_core::domain::quote::{LineView, NetStatus, QuoteSnapshot, ShippingPolicy};

use crate::format_money;

pub const EMPTY_MESSAGE: &str = "No hay productos en el presupuesto.";

/// Display model for the running quote list.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct QuoteListView {
    pub count: usize,
    pub items: Vec<QuoteListItem>,
    pub totals: Option<TotalsView>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct QuoteListItem {
    pub index: usize,
    pub reference: String,
    pub description: String,
    pub quantity: u32,
    /// Standard price shown struck through next to the net price.
    pub struck_price: Option<Decimal>,
    pub unit_price: Decimal,
    pub line_total: Decimal,
    pub note: Option<LineNote>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "text", rename_all = "snake_case")]
pub enum LineNote {
    NetApplied(String),
    NetPending(String),
    Info(String),
}

impl LineNote {
    pub fn text(&self) -> &str {
        match self {
            Self::NetApplied(text) | Self::NetPending(text) | Self::Info(text) => text,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct TotalsView {
    pub subtotal: Decimal,
    pub shipping: ShippingView,
    pub total: Decimal,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ShippingView {
    Charged { amount: Decimal, notice: String },
    Free,
}

impl QuoteListView {
    pub fn from_snapshot(snapshot: &QuoteSnapshot) -> Self {
        let items: Vec<QuoteListItem> = snapshot.lines.iter().map(list_item).collect();
        let totals = (!items.is_empty()).then(|| TotalsView {
            subtotal: snapshot.totals.subtotal,
            shipping: shipping_view(snapshot.totals.shipping_cost, &snapshot.shipping),
            total: snapshot.totals.total,
        });

        Self { count: items.len(), items, totals }
    }

    /// Terminal rendering of the list, one block per line followed by the totals.
    pub fn to_text(&self) -> String {
        let Some(totals) = &self.totals else {
            return format!("{EMPTY_MESSAGE}\nTotal: 0.00 €");
        };

        let mut lines = Vec::new();
        for item in &self.items {
            let price = match item.struck_price {
                Some(standard) => {
                    format!("~{}€~ {}€", format_money(standard), format_money(item.unit_price))
                }
                None => format!("{}€", format_money(item.unit_price)),
            };
            lines.push(format!("[{}] {}", item.index, item.description));
            lines.push(format!("    Ref: {}", item.reference));
            if let Some(note) = &item.note {
                lines.push(format!("    {}", note.text()));
            }
            lines.push(format!(
                "    {} x {} = {} €",
                item.quantity,
                price,
                format_money(item.line_total)
            ));
        }

        lines.push(format!("Subtotal: {} €", format_money(totals.subtotal)));
        match &totals.shipping {
            ShippingView::Charged { amount, notice } => {
                lines.push(format!("+ Portes: {} €", format_money(*amount)));
                lines.push(notice.clone());
            }
            ShippingView::Free => lines.push("Portes: GRATIS".to_string()),
        }
        lines.push(format!("TOTAL: {} €", format_money(totals.total)));
        lines.push("(Precios sin IVA)".to_string());
        lines.join("\n")
    }
}

fn list_item(view: &LineView) -> QuoteListItem {
    let line = &view.line;
    let (struck_price, note) = match &view.net_status {
        NetStatus::Applied { min_qty, net_price } => (
            Some(line.standard_unit_price),
            Some(LineNote::NetApplied(format!(
                "Neto: {}€ (>{} uds)",
                format_money(*net_price),
                min_qty
            ))),
        ),
        NetStatus::Pending { min_qty, net_price } => (
            None,
            Some(LineNote::NetPending(format!(
                "Pide {} para neto a {}€",
                min_qty,
                format_money(*net_price)
            ))),
        ),
        NetStatus::Informational { text } => (None, Some(LineNote::Info(text.clone()))),
        NetStatus::None => (None, None),
    };

    QuoteListItem {
        index: view.index,
        reference: line.reference.to_string(),
        description: line.description.clone(),
        quantity: line.quantity,
        struck_price,
        unit_price: view.computation.unit_price,
        line_total: view.computation.line_total,
        note,
    }
}

fn shipping_view(cost: Decimal, policy: &ShippingPolicy) -> ShippingView {
    if cost > Decimal::ZERO {
        ShippingView::Charged {
            amount: cost,
            notice: format!(
                "(Portes gratis a partir de {}€)",
                policy.free_shipping_threshold.normalize()
            ),
        }
    } else {
        ShippingView::Free
    }
}

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::Serialize;
use tarifa_core::domain::quote::QuoteSnapshot;

use crate::format_date;

pub const QUOTE_FOOTER: &str =
    "Presupuesto válido salvo error tipográfico. Condiciones según tarifa vigente.";

/// Template context for the printable quote.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct QuoteDocument {
    pub company_name: String,
    pub date: String,
    pub lines: Vec<QuoteDocumentLine>,
    pub subtotal: Decimal,
    pub shipping_cost: Decimal,
    pub free_shipping: bool,
    pub total: Decimal,
    pub footer: &'static str,
    #[serde(skip)]
    file_stem: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct QuoteDocumentLine {
    pub reference: String,
    pub description: String,
    /// Printed under the description when the net price replaced the standard one.
    pub net_note: Option<String>,
    pub quantity: u32,
    pub unit_price: Decimal,
    pub line_total: Decimal,
}

impl QuoteDocument {
    /// `None` for an empty quote; there is nothing to print.
    pub fn from_snapshot(snapshot: &QuoteSnapshot, company: &str, date: NaiveDate) -> Option<Self> {
        if snapshot.is_empty() {
            return None;
        }

        let lines = snapshot
            .lines
            .iter()
            .map(|view| QuoteDocumentLine {
                reference: view.line.reference.to_string(),
                description: view.line.description.clone(),
                net_note: view.computation.is_net_applied.then(|| {
                    format!("(Precio Neto aplicado por volumen > {})", view.line.min_qty_for_net)
                }),
                quantity: view.line.quantity,
                unit_price: view.computation.unit_price,
                line_total: view.computation.line_total,
            })
            .collect();

        let compact_company: String = company.split_whitespace().collect();
        let file_stem = format!("Presupuesto_{}_{}", compact_company, date.format("%d-%m-%Y"));

        Some(Self {
            company_name: company.to_string(),
            date: format_date(date),
            lines,
            subtotal: snapshot.totals.subtotal,
            shipping_cost: snapshot.totals.shipping_cost,
            free_shipping: snapshot.totals.shipping_cost <= Decimal::ZERO,
            total: snapshot.totals.total,
            footer: QUOTE_FOOTER,
            file_stem,
        })
    }

    pub fn file_stem(&self) -> &str {
        &self.file_stem
    }
}

//! Presentation of quotes, tariff sheets and client onboarding forms.
//!
//! Everything here reads engine snapshots or form data and produces text, display models or
//! documents; nothing in this crate mutates a quote.

pub mod client;
pub mod pdf;
pub mod quote_document;
pub mod summary;
pub mod tariff_sheet;
pub mod view;

use chrono::NaiveDate;
use rust_decimal::{Decimal, RoundingStrategy};

pub use client::{ClientFormError, ClientRegistration, Iban, SepaMandate, SepaPaymentType};
pub use pdf::{DocumentError, DocumentKind, DocumentRenderer, RenderedDocument};
pub use quote_document::QuoteDocument;
pub use summary::quote_summary;
pub use tariff_sheet::TariffSheetDocument;
pub use view::QuoteListView;

/// Two-decimal amount, halves rounded away from zero.
pub fn format_money(amount: Decimal) -> String {
    format!("{:.2}", amount.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero))
}

/// Day/month/year, as printed on every document.
pub fn format_date(date: NaiveDate) -> String {
    date.format("%d/%m/%Y").to_string()
}

//! Best-effort extraction of volume (net) price terms from merchandiser free text.
//!
//! Condition strings such as `"Neto a partir de 120 uds: 5,50€"` follow no fixed grammar.
//! Patterns are tried in a fixed precedence and the first hit wins; ambiguous text (a price
//! written before a quantity, stray codes) can misfire and that is accepted. Nothing here
//! fails: unparseable text yields zero, which downstream reads as "no net pricing".

use std::str::FromStr;
use std::sync::OnceLock;

use regex::Regex;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::domain::product::normalize_decimal;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NetCondition {
    pub min_qty: u32,
    pub net_price: Decimal,
}

impl NetCondition {
    pub fn parse(text: &str) -> Self {
        Self { min_qty: extract_min_qty(text), net_price: extract_net_price(text) }
    }

    /// Both a threshold and a price were found, so the net price can be applied by quantity.
    pub fn is_actionable(&self) -> bool {
        self.min_qty > 0 && self.net_price > Decimal::ZERO
    }
}

/// Minimum quantity that unlocks the net price, or 0 when none can be read.
pub fn extract_min_qty(text: &str) -> u32 {
    if text.trim().is_empty() {
        return 0;
    }

    first_integer(unit_quantity_re(), text)
        .or_else(|| first_integer(threshold_phrase_re(), text))
        .or_else(|| standalone_integer(text))
        .unwrap_or(0)
}

/// Net unit price mentioned in the text, or 0 when none can be read.
pub fn extract_net_price(text: &str) -> Decimal {
    if text.trim().is_empty() {
        return Decimal::ZERO;
    }

    first_decimal(currency_amount_re(), text)
        .or_else(|| ungrouped_decimal(text))
        .or_else(|| first_decimal(neto_amount_re(), text))
        .unwrap_or(Decimal::ZERO)
}

fn first_integer(re: &Regex, text: &str) -> Option<u32> {
    re.captures_iter(text)
        .filter_map(|captures| captures.get(1))
        .find_map(|number| number.as_str().replace('.', "").parse::<u32>().ok())
}

fn first_decimal(re: &Regex, text: &str) -> Option<Decimal> {
    re.captures_iter(text)
        .filter_map(|captures| captures.get(1))
        .find_map(|number| Decimal::from_str(&normalize_decimal(number.as_str())).ok())
}

/// First run of 2+ digits that is not part of a decimal or grouped number.
fn standalone_integer(text: &str) -> Option<u32> {
    number_token_re()
        .find_iter(text)
        .map(|token| token.as_str())
        .filter(|token| token.len() >= 2 && token.bytes().all(|byte| byte.is_ascii_digit()))
        .find_map(|token| token.parse::<u32>().ok())
}

/// First number with a decimal separator, skipping thousand-grouped integers such as `1.000`
/// that the quantity rules already read as whole units.
fn ungrouped_decimal(text: &str) -> Option<Decimal> {
    number_token_re()
        .find_iter(text)
        .map(|token| token.as_str())
        .filter(|token| token.contains(['.', ',']) && !grouped_integer_re().is_match(token))
        .find_map(|token| Decimal::from_str(&normalize_decimal(token)).ok())
}

fn unit_quantity_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(
            r"(?i)(\d{1,3}(?:\.\d{3})+|\d+)\s*(?:(?:unidades|unidad|uds|ud|piezas|pieza|pzas|pza|cajas|caja|cj|estuches|estuche|blisters|blister|packs|pack|palets|palet|pallets|pallet)\b|u\.)",
        )
        .expect("valid unit quantity regex")
    })
}

fn threshold_phrase_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(
            r"(?i)\b(?:a\s+partir\s+de|desde|m[íi]n(?:imo|ima)?\.?)\s*:?\s*(?:de\s+)?(\d{1,3}(?:\.\d{3})+|\d+)",
        )
        .expect("valid threshold phrase regex")
    })
}

fn number_token_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\d+(?:[.,]\d+)*").expect("valid number token regex"))
}

fn currency_amount_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?i)(\d{1,3}(?:\.\d{3})+,\d+|\d+(?:[.,]\d+)?)\s*(?:€|eur(?:os?)?\b)")
            .expect("valid currency amount regex")
    })
}

fn grouped_integer_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^\d{1,3}(?:\.\d{3})+$").expect("valid grouped integer regex"))
}

fn neto_amount_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?i)\bneto\s*:?\s*(\d+(?:[.,]\d+)?)").expect("valid neto amount regex")
    })
}

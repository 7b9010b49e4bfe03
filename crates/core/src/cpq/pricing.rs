use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::cpq::net_condition::NetCondition;
use crate::cpq::tariff::Tariff;
use crate::domain::product::{Product, Reference};

pub const NOT_APPLICABLE: &str = "No aplica";

/// Prices shown for one product under one tariff.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriceQuote {
    pub reference: Reference,
    /// `None` when the tariff is unknown (rendered as "N/A").
    pub discount_pct: Option<Decimal>,
    pub base_price: Decimal,
    pub final_unit_price: Decimal,
    pub net_condition_text: String,
    pub min_qty_for_net: u32,
    pub net_unit_price: Decimal,
}

impl PriceQuote {
    pub fn not_applicable(reference: Reference) -> Self {
        Self {
            reference,
            discount_pct: None,
            base_price: Decimal::ZERO,
            final_unit_price: Decimal::ZERO,
            net_condition_text: NOT_APPLICABLE.to_string(),
            min_qty_for_net: 0,
            net_unit_price: Decimal::ZERO,
        }
    }

    pub fn discount_label(&self) -> String {
        match self.discount_pct {
            Some(pct) => format!("{}%", pct.normalize()),
            None => "N/A".to_string(),
        }
    }

    pub fn has_net_condition(&self) -> bool {
        self.net_condition_text != NOT_APPLICABLE
    }
}

pub trait PriceResolver: Send + Sync {
    fn resolve(&self, product: &Product) -> PriceQuote;
}

/// Resolver bound to a tariff identifier as typed by the user or taken from a file name.
#[derive(Clone, Debug)]
pub struct TariffPriceResolver {
    tariff: Option<Tariff>,
}

impl TariffPriceResolver {
    pub fn new(tariff: Tariff) -> Self {
        Self { tariff: Some(tariff) }
    }

    pub fn for_identifier(identifier: &str) -> Self {
        Self { tariff: Tariff::identify(identifier) }
    }

    pub fn tariff(&self) -> Option<Tariff> {
        self.tariff
    }
}

impl PriceResolver for TariffPriceResolver {
    fn resolve(&self, product: &Product) -> PriceQuote {
        match self.tariff {
            Some(tariff) => tariff.price(product),
            None => PriceQuote::not_applicable(product.reference.clone()),
        }
    }
}

pub fn resolve_price(product: &Product, tariff_identifier: &str) -> PriceQuote {
    TariffPriceResolver::for_identifier(tariff_identifier).resolve(product)
}

impl Tariff {
    pub fn price(self, product: &Product) -> PriceQuote {
        let rule = self.rule();
        let final_unit_price = product.price_field(rule.price_field);
        let base_price = if final_unit_price > Decimal::ZERO {
            final_unit_price / rule.divisor
        } else {
            Decimal::ZERO
        };

        let net_condition_text = net_condition_text(self, product);
        let condition = if net_condition_text == NOT_APPLICABLE {
            NetCondition::default()
        } else {
            NetCondition::parse(&net_condition_text)
        };

        PriceQuote {
            reference: product.reference.clone(),
            discount_pct: Some(rule.discount_pct),
            base_price,
            final_unit_price,
            net_condition_text,
            min_qty_for_net: condition.min_qty,
            net_unit_price: condition.net_price,
        }
    }

    /// The product carries net terms under this tariff.
    pub fn is_net_product(self, product: &Product) -> bool {
        self.rule().net.map(|net| product.flag(net.flag)).unwrap_or(false)
    }
}

fn net_condition_text(tariff: Tariff, product: &Product) -> String {
    match tariff.rule().net {
        Some(net) if product.flag(net.flag) => product
            .text(net.condition)
            .map(str::trim)
            .filter(|text| !text.is_empty())
            .unwrap_or(NOT_APPLICABLE)
            .to_string(),
        _ => NOT_APPLICABLE.to_string(),
    }
}

/// One row of a printed tariff sheet.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TariffSheetRow {
    pub reference: Reference,
    pub description: String,
    pub base_price: Decimal,
    pub discount_label: String,
    /// `None` for net products, whose price depends on the ordered quantity.
    pub final_price: Option<Decimal>,
    pub quantity_condition: Option<String>,
}

pub fn tariff_sheet_rows(products: &[Product], tariff: Tariff) -> Vec<TariffSheetRow> {
    let net_label = tariff.rule().net.map(|net| net.label);

    products
        .iter()
        .map(|product| {
            let quote = tariff.price(product);
            match net_label {
                Some(label) if tariff.is_net_product(product) => TariffSheetRow {
                    reference: product.reference.clone(),
                    description: product.description.clone(),
                    base_price: quote.base_price,
                    discount_label: label.to_string(),
                    final_price: None,
                    quantity_condition: Some(quote.net_condition_text),
                },
                _ => TariffSheetRow {
                    reference: product.reference.clone(),
                    description: product.description.clone(),
                    base_price: quote.base_price,
                    discount_label: quote.discount_label(),
                    final_price: Some(quote.final_unit_price),
                    quantity_condition: None,
                },
            }
        })
        .collect()
}

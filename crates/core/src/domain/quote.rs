use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::cpq::pricing::{PriceQuote, NOT_APPLICABLE};
use crate::domain::product::{Product, Reference};

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuoteLine {
    pub reference: Reference,
    pub description: String,
    pub standard_unit_price: Decimal,
    pub quantity: u32,
    pub net_condition_text: String,
    pub min_qty_for_net: u32,
    pub net_unit_price: Decimal,
}

impl QuoteLine {
    pub fn has_net_terms(&self) -> bool {
        self.min_qty_for_net > 0 && self.net_unit_price > Decimal::ZERO
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LineRequest {
    pub reference: String,
    pub description: String,
    pub standard_price: Decimal,
    pub quantity: i64,
    pub net_condition_text: String,
    pub min_qty_for_net: i64,
    pub net_unit_price: Decimal,
}

impl LineRequest {
    pub fn new(
        reference: impl Into<String>,
        description: impl Into<String>,
        standard_price: Decimal,
        quantity: i64,
    ) -> Self {
        Self {
            reference: reference.into(),
            description: description.into(),
            standard_price,
            quantity,
            net_condition_text: NOT_APPLICABLE.to_string(),
            min_qty_for_net: 0,
            net_unit_price: Decimal::ZERO,
        }
    }

    pub fn with_net_terms(
        mut self,
        text: impl Into<String>,
        min_qty_for_net: i64,
        net_unit_price: Decimal,
    ) -> Self {
        self.net_condition_text = text.into();
        self.min_qty_for_net = min_qty_for_net;
        self.net_unit_price = net_unit_price;
        self
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineComputation {
    pub unit_price: Decimal,
    pub line_total: Decimal,
    pub is_net_applied: bool,
}

/// The net unit price replaces the standard one once the line reaches its threshold. Totals
/// saturate at `Decimal::MAX`.
pub fn compute_line_total(line: &QuoteLine) -> LineComputation {
    let is_net_applied = line.has_net_terms() && line.quantity >= line.min_qty_for_net;
    let unit_price =
        if is_net_applied { line.net_unit_price } else { line.standard_unit_price };

    LineComputation {
        unit_price,
        line_total: unit_price.checked_mul(Decimal::from(line.quantity)).unwrap_or(Decimal::MAX),
        is_net_applied,
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShippingPolicy {
    pub flat_cost: Decimal,
    pub free_shipping_threshold: Decimal,
}

impl Default for ShippingPolicy {
    fn default() -> Self {
        Self { flat_cost: Decimal::new(1200, 2), free_shipping_threshold: Decimal::new(40000, 2) }
    }
}

impl ShippingPolicy {
    pub fn cost_for(&self, subtotal: Decimal) -> Decimal {
        if subtotal > Decimal::ZERO && subtotal < self.free_shipping_threshold {
            self.flat_cost
        } else {
            Decimal::ZERO
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuoteTotals {
    pub subtotal: Decimal,
    pub shipping_cost: Decimal,
    pub total: Decimal,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum NetStatus {
    Applied { min_qty: u32, net_price: Decimal },
    Pending { min_qty: u32, net_price: Decimal },
    Informational { text: String },
    None,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineView {
    pub index: usize,
    pub line: QuoteLine,
    pub computation: LineComputation,
    pub net_status: NetStatus,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuoteSnapshot {
    pub lines: Vec<LineView>,
    pub totals: QuoteTotals,
    pub shipping: ShippingPolicy,
}

impl QuoteSnapshot {
    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }
}

#[derive(Clone, Debug, Default)]
pub struct QuoteEngine {
    lines: Vec<QuoteLine>,
    shipping: ShippingPolicy,
}

impl QuoteEngine {
    pub fn new(shipping: ShippingPolicy) -> Self {
        Self { lines: Vec::new(), shipping }
    }

    /// Merging into an existing reference sums quantities; the latest net terms win.
    pub fn add_line(&mut self, request: LineRequest) -> &QuoteLine {
        let reference = Reference::new(request.reference);
        let quantity = coerce::clamp_quantity(request.quantity);
        let min_qty_for_net = coerce::clamp_min_qty(request.min_qty_for_net);
        let standard_unit_price = coerce::clamp_amount(request.standard_price);
        let net_unit_price = coerce::clamp_amount(request.net_unit_price);

        let position = self.lines.iter().position(|line| line.reference == reference);
        let index = match position {
            Some(index) => {
                let line = &mut self.lines[index];
                line.quantity = line.quantity.saturating_add(quantity);
                line.net_condition_text = request.net_condition_text;
                line.min_qty_for_net = min_qty_for_net;
                line.net_unit_price = net_unit_price;
                index
            }
            None => {
                self.lines.push(QuoteLine {
                    reference,
                    description: request.description,
                    standard_unit_price,
                    quantity,
                    net_condition_text: request.net_condition_text,
                    min_qty_for_net,
                    net_unit_price,
                });
                self.lines.len() - 1
            }
        };

        &self.lines[index]
    }

    pub fn add_priced(
        &mut self,
        product: &Product,
        price: &PriceQuote,
        quantity: i64,
    ) -> &QuoteLine {
        let request = LineRequest::new(
            product.reference.as_str(),
            product.description.as_str(),
            price.final_unit_price,
            quantity,
        )
        .with_net_terms(
            price.net_condition_text.as_str(),
            i64::from(price.min_qty_for_net),
            price.net_unit_price,
        );
        self.add_line(request)
    }

    /// Removes the line at `index`; an out-of-range index leaves the quote untouched.
    pub fn remove_line(&mut self, index: usize) -> Option<QuoteLine> {
        (index < self.lines.len()).then(|| self.lines.remove(index))
    }

    pub fn clear(&mut self) {
        self.lines.clear();
    }

    pub fn lines(&self) -> &[QuoteLine] {
        &self.lines
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    pub fn shipping_policy(&self) -> ShippingPolicy {
        self.shipping
    }

    pub fn totals(&self) -> QuoteTotals {
        let subtotal = self.lines.iter().fold(Decimal::ZERO, |sum, line| {
            sum.checked_add(compute_line_total(line).line_total).unwrap_or(Decimal::MAX)
        });
        let shipping_cost = self.shipping.cost_for(subtotal);
        let total = subtotal.checked_add(shipping_cost).unwrap_or(Decimal::MAX);

        QuoteTotals { subtotal, shipping_cost, total }
    }

    pub fn snapshot(&self) -> QuoteSnapshot {
        let lines = self
            .lines
            .iter()
            .enumerate()
            .map(|(index, line)| {
                let computation = compute_line_total(line);
                LineView {
                    index,
                    line: line.clone(),
                    computation,
                    net_status: net_status(line, &computation),
                }
            })
            .collect();

        QuoteSnapshot { lines, totals: self.totals(), shipping: self.shipping }
    }
}

fn net_status(line: &QuoteLine, computation: &LineComputation) -> NetStatus {
    if line.has_net_terms() {
        let (min_qty, net_price) = (line.min_qty_for_net, line.net_unit_price);
        return if computation.is_net_applied {
            NetStatus::Applied { min_qty, net_price }
        } else {
            NetStatus::Pending { min_qty, net_price }
        };
    }

    let text = line.net_condition_text.trim();
    if text.is_empty() || text == NOT_APPLICABLE {
        NetStatus::None
    } else {
        NetStatus::Informational { text: text.to_string() }
    }
}

pub mod coerce {
    use std::str::FromStr;

    use rust_decimal::Decimal;

    /// Leading integer of `raw`; anything unreadable or below 1 becomes 1.
    pub fn quantity(raw: &str) -> u32 {
        clamp_quantity(leading_integer(raw).unwrap_or(1))
    }

    /// Leading integer of `raw`; anything unreadable or negative becomes 0.
    pub fn min_qty(raw: &str) -> u32 {
        clamp_min_qty(leading_integer(raw).unwrap_or(0))
    }

    /// Leading decimal of `raw` (comma or dot separator); unreadable or negative becomes 0.
    pub fn amount(raw: &str) -> Decimal {
        clamp_amount(leading_decimal(raw).unwrap_or(Decimal::ZERO))
    }

    pub(crate) fn clamp_quantity(value: i64) -> u32 {
        if value < 1 {
            1
        } else {
            u32::try_from(value).unwrap_or(u32::MAX)
        }
    }

    pub(crate) fn clamp_min_qty(value: i64) -> u32 {
        u32::try_from(value.max(0)).unwrap_or(u32::MAX)
    }

    pub(crate) fn clamp_amount(value: Decimal) -> Decimal {
        value.max(Decimal::ZERO)
    }

    fn leading_integer(raw: &str) -> Option<i64> {
        let trimmed = raw.trim_start();
        let (sign, digits) = split_sign(trimmed);
        let end = digits.find(|ch: char| !ch.is_ascii_digit()).unwrap_or(digits.len());
        if end == 0 {
            return None;
        }
        digits[..end].parse::<i64>().ok().map(|value| sign * value)
    }

    fn leading_decimal(raw: &str) -> Option<Decimal> {
        let trimmed = raw.trim_start();
        let (sign, rest) = split_sign(trimmed);
        let mut seen_separator = false;
        let end = rest
            .char_indices()
            .find(|(_, ch)| {
                if ch.is_ascii_digit() {
                    return false;
                }
                if (*ch == '.' || *ch == ',') && !seen_separator {
                    seen_separator = true;
                    return false;
                }
                true
            })
            .map(|(index, _)| index)
            .unwrap_or(rest.len());

        let number = rest[..end].trim_end_matches(['.', ',']).replace(',', ".");
        if number.is_empty() {
            return None;
        }
        Decimal::from_str(&number).ok().map(|value| value * Decimal::from(sign))
    }

    fn split_sign(value: &str) -> (i64, &str) {
        match value.strip_prefix('-') {
            Some(rest) => (-1, rest),
            None => (1, value.strip_prefix('+').unwrap_or(value)),
        }
    }
}

#[cfg(test)]
mod tests {
    use rust_decimal::Decimal;
    use serde_json::json;

    use crate::cpq::tariff::Tariff;
    use crate::domain::product::Product;

    use super::{
        coerce, compute_line_total, LineRequest, NetStatus, QuoteEngine, QuoteLine,
        ShippingPolicy,
    };

    fn money(cents: i64) -> Decimal {
        Decimal::new(cents, 2)
    }

    fn tornillo(quantity: i64) -> LineRequest {
        LineRequest::new("A1", "Tornillo", money(1000), quantity).with_net_terms(
            "Neto a partir de 100 uds: 8,00€",
            100,
            money(800),
        )
    }

    fn line(quantity: u32, min_qty_for_net: u32, net_unit_price: Decimal) -> QuoteLine {
        QuoteLine {
            reference: crate::domain::product::Reference::new("X"),
            description: "X".to_string(),
            standard_unit_price: money(250),
            quantity,
            net_condition_text: String::new(),
            min_qty_for_net,
            net_unit_price,
        }
    }

    #[test]
    fn net_threshold_not_reached_keeps_standard_price() {
        let mut engine = QuoteEngine::default();
        engine.add_line(tornillo(50));

        let snapshot = engine.snapshot();
        let computation = snapshot.lines[0].computation;
        assert_eq!(computation.unit_price, money(1000));
        assert_eq!(computation.line_total, money(50_000));
        assert!(!computation.is_net_applied);
        assert_eq!(snapshot.totals.subtotal, money(50_000));
        assert_eq!(snapshot.totals.shipping_cost, Decimal::ZERO);
        assert_eq!(snapshot.totals.total, money(50_000));
        assert_eq!(
            snapshot.lines[0].net_status,
            NetStatus::Pending { min_qty: 100, net_price: money(800) }
        );
    }

    #[test]
    fn net_threshold_reached_switches_to_net_price() {
        let mut engine = QuoteEngine::default();
        engine.add_line(tornillo(150));

        let computation = compute_line_total(&engine.lines()[0]);
        assert_eq!(computation.unit_price, money(800));
        assert_eq!(computation.line_total, money(120_000));
        assert!(computation.is_net_applied);
        assert!(matches!(engine.snapshot().lines[0].net_status, NetStatus::Applied { .. }));
    }

    #[test]
    fn net_applies_exactly_at_threshold() {
        for quantity in [1_u32, 2, 3, 4, 5, 6] {
            let computation = compute_line_total(&line(quantity, 4, money(200)));
            assert_eq!(computation.is_net_applied, quantity >= 4, "quantity {quantity}");
        }
    }

    #[test]
    fn without_threshold_line_total_is_standard_price_times_quantity() {
        for quantity in [1_u32, 7, 99, 1000] {
            let computation = compute_line_total(&line(quantity, 0, money(100)));
            assert!(!computation.is_net_applied);
            assert_eq!(computation.line_total, money(250) * Decimal::from(quantity));
        }
    }

    #[test]
    fn threshold_without_net_price_never_applies() {
        let computation = compute_line_total(&line(500, 10, Decimal::ZERO));
        assert!(!computation.is_net_applied);
        assert_eq!(computation.unit_price, money(250));
    }

    #[test]
    fn adding_same_reference_merges_quantities_and_refreshes_net_terms() {
        let mut engine = QuoteEngine::default();
        engine.add_line(tornillo(30));
        let merged = engine
            .add_line(tornillo(80).with_net_terms("Neto desde 200 uds a 7,50€", 200, money(750)))
            .clone();

        assert_eq!(engine.len(), 1);
        assert_eq!(merged.quantity, 110);
        assert_eq!(merged.min_qty_for_net, 200);
        assert_eq!(merged.net_unit_price, money(750));
        assert_eq!(merged.net_condition_text, "Neto desde 200 uds a 7,50€");
        assert_eq!(merged.standard_unit_price, money(1000));
    }

    #[test]
    fn lines_keep_insertion_order() {
        let mut engine = QuoteEngine::default();
        engine.add_line(LineRequest::new("B", "Broca", money(100), 1));
        engine.add_line(LineRequest::new("A", "Alicate", money(100), 1));
        engine.add_line(LineRequest::new("B", "Broca", money(100), 1));

        let references: Vec<_> =
            engine.lines().iter().map(|line| line.reference.as_str()).collect();
        assert_eq!(references, ["B", "A"]);
    }

    #[test]
    fn invalid_inputs_are_coerced_to_safe_defaults() {
        let mut engine = QuoteEngine::default();
        let request =
            LineRequest::new("C", "Cinta", money(-500), 0).with_net_terms("raro", -3, money(-100));
        let added = engine.add_line(request).clone();

        assert_eq!(added.quantity, 1);
        assert_eq!(added.standard_unit_price, Decimal::ZERO);
        assert_eq!(added.min_qty_for_net, 0);
        assert_eq!(added.net_unit_price, Decimal::ZERO);
    }

    #[test]
    fn shipping_charged_only_between_zero_and_threshold() {
        let policy = ShippingPolicy::default();

        assert_eq!(policy.cost_for(Decimal::ZERO), Decimal::ZERO);
        assert_eq!(policy.cost_for(money(1)), money(1200));
        assert_eq!(policy.cost_for(money(39_999)), money(1200));
        assert_eq!(policy.cost_for(money(40_000)), Decimal::ZERO);
        assert_eq!(policy.cost_for(money(90_000)), Decimal::ZERO);
    }

    #[test]
    fn small_quote_pays_shipping() {
        let mut engine = QuoteEngine::default();
        engine.add_line(LineRequest::new("D", "Llave", money(30_000), 1));

        let totals = engine.totals();
        assert_eq!(totals.subtotal, money(30_000));
        assert_eq!(totals.shipping_cost, money(1200));
        assert_eq!(totals.total, money(31_200));
    }

    #[test]
    fn quote_at_threshold_ships_free() {
        let mut engine = QuoteEngine::default();
        engine.add_line(LineRequest::new("D", "Llave", money(20_000), 2));
        assert_eq!(engine.totals().shipping_cost, Decimal::ZERO);
        assert_eq!(engine.totals().total, money(40_000));
    }

    #[test]
    fn empty_quote_has_zero_totals() {
        let engine = QuoteEngine::default();
        let totals = engine.totals();

        assert_eq!(totals.subtotal, Decimal::ZERO);
        assert_eq!(totals.shipping_cost, Decimal::ZERO);
        assert_eq!(totals.total, Decimal::ZERO);
    }

    #[test]
    fn totals_are_stable_without_mutation() {
        let mut engine = QuoteEngine::default();
        engine.add_line(tornillo(120));
        engine.add_line(LineRequest::new("E", "Escuadra", money(1999), 3));

        assert_eq!(engine.totals(), engine.totals());
        assert_eq!(engine.snapshot(), engine.snapshot());
    }

    #[test]
    fn removing_out_of_range_is_a_no_op() {
        let mut engine = QuoteEngine::default();
        assert_eq!(engine.remove_line(0), None);
        assert!(engine.is_empty());

        engine.add_line(tornillo(1));
        assert_eq!(engine.remove_line(3), None);
        assert_eq!(engine.len(), 1);
    }

    #[test]
    fn remove_and_clear_drop_lines() {
        let mut engine = QuoteEngine::default();
        engine.add_line(LineRequest::new("A", "Alicate", money(100), 1));
        engine.add_line(LineRequest::new("B", "Broca", money(100), 1));

        let removed = engine.remove_line(0).expect("line 0 exists");
        assert_eq!(removed.reference.as_str(), "A");
        assert_eq!(engine.snapshot().lines[0].index, 0);

        engine.clear();
        assert!(engine.is_empty());
        assert_eq!(engine.totals().total, Decimal::ZERO);
    }

    #[test]
    fn custom_shipping_policy_is_honoured() {
        let mut engine = QuoteEngine::new(ShippingPolicy {
            flat_cost: money(950),
            free_shipping_threshold: money(10_000),
        });
        engine.add_line(LineRequest::new("A", "Alicate", money(5_000), 1));
        assert_eq!(engine.totals().shipping_cost, money(950));

        engine.add_line(LineRequest::new("A", "Alicate", money(5_000), 1));
        assert_eq!(engine.totals().shipping_cost, Decimal::ZERO);
    }

    #[test]
    fn informational_net_text_without_numbers() {
        let mut engine = QuoteEngine::default();
        engine.add_line(LineRequest::new("F", "Flexo", money(100), 1).with_net_terms(
            "Consultar neto",
            0,
            Decimal::ZERO,
        ));
        engine.add_line(LineRequest::new("G", "Gato", money(100), 1));

        let snapshot = engine.snapshot();
        assert_eq!(
            snapshot.lines[0].net_status,
            NetStatus::Informational { text: "Consultar neto".to_string() }
        );
        assert_eq!(snapshot.lines[1].net_status, NetStatus::None);
    }

    #[test]
    fn add_priced_carries_resolved_net_terms() {
        let product = Product::new("A1", "Tornillo")
            .with_attribute("PRECIO_ESTANDAR", json!(10))
            .with_attribute("NETOS", json!(true))
            .with_attribute("CONDICIONES_NETO", json!("Neto a partir de 100 uds: 8€"));
        let price = Tariff::General.price(&product);

        let mut engine = QuoteEngine::default();
        let added = engine.add_priced(&product, &price, 150).clone();

        assert_eq!(added.standard_unit_price, money(1000));
        assert_eq!(added.min_qty_for_net, 100);
        assert!(compute_line_total(&added).is_net_applied);
    }

    #[test]
    fn oversized_lines_saturate_instead_of_overflowing() {
        let huge_price = Decimal::from(10_u64.pow(19)) * Decimal::from(10);
        let mut engine = QuoteEngine::default();
        engine.add_line(LineRequest::new(
            "A",
            "Andamio",
            huge_price,
            i64::from(coerce::quantity("99999999999")),
        ));
        engine.add_line(LineRequest::new("B", "Broca", huge_price, i64::from(u32::MAX)));

        let snapshot = engine.snapshot();
        assert_eq!(snapshot.lines[0].computation.line_total, Decimal::MAX);
        assert_eq!(snapshot.totals.subtotal, Decimal::MAX);
        assert_eq!(snapshot.totals.shipping_cost, Decimal::ZERO);
        assert_eq!(snapshot.totals.total, Decimal::MAX);
    }

    #[test]
    fn coerce_reads_loose_form_values() {
        assert_eq!(coerce::quantity("12"), 12);
        assert_eq!(coerce::quantity(" 7 cajas"), 7);
        assert_eq!(coerce::quantity("2.9"), 2);
        assert_eq!(coerce::quantity("abc"), 1);
        assert_eq!(coerce::quantity("0"), 1);
        assert_eq!(coerce::quantity("-4"), 1);
        assert_eq!(coerce::min_qty("120"), 120);
        assert_eq!(coerce::min_qty(""), 0);
        assert_eq!(coerce::min_qty("-2"), 0);
        assert_eq!(coerce::amount("5,50"), money(550));
        assert_eq!(coerce::amount("12.5€"), money(1250));
        assert_eq!(coerce::amount("n/a"), Decimal::ZERO);
        assert_eq!(coerce::amount("-3"), Decimal::ZERO);
    }
}

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use rust_decimal::prelude::FromPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

#[derive(Clone, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Reference(pub String);

impl Reference {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into().trim().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Reference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// One record of a tariff data file.
///
/// Only the reference and description are fixed columns; price, net flag and net condition
/// columns differ per tariff and are kept as raw attributes read through the typed accessors.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Product {
    #[serde(rename = "Referencia", default, deserialize_with = "reference_from_value")]
    pub reference: Reference,
    #[serde(rename = "Descripcion", default, deserialize_with = "text_from_value")]
    pub description: String,
    #[serde(flatten)]
    pub attributes: BTreeMap<String, Value>,
}

impl Product {
    pub fn new(reference: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            reference: Reference::new(reference),
            description: description.into(),
            attributes: BTreeMap::new(),
        }
    }

    pub fn with_attribute(mut self, name: &str, value: Value) -> Self {
        self.attributes.insert(name.to_string(), value);
        self
    }

    /// Numeric price column; missing, null or unparseable values read as zero.
    pub fn price_field(&self, name: &str) -> Decimal {
        self.attributes
            .get(name)
            .and_then(decimal_from_value)
            .filter(|value| *value > Decimal::ZERO)
            .unwrap_or(Decimal::ZERO)
    }

    pub fn flag(&self, name: &str) -> bool {
        self.attributes.get(name).map(is_truthy).unwrap_or(false)
    }

    pub fn text(&self, name: &str) -> Option<&str> {
        match self.attributes.get(name) {
            Some(Value::String(text)) => Some(text.as_str()),
            _ => None,
        }
    }

    pub fn matches(&self, lowercase_query: &str) -> bool {
        self.description.to_lowercase().contains(lowercase_query)
            || self.reference.as_str().to_lowercase().contains(lowercase_query)
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StockState {
    Available,
    Unavailable,
    MadeToOrderFast,
    MadeToOrderSlow,
    #[default]
    Unknown,
}

impl StockState {
    pub fn from_code(code: &str) -> Self {
        match code.trim().to_ascii_lowercase().as_str() {
            "si" | "sí" => Self::Available,
            "no" => Self::Unavailable,
            "fab" => Self::MadeToOrderFast,
            "fab2" => Self::MadeToOrderSlow,
            _ => Self::Unknown,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Available => "En stock",
            Self::Unavailable => "Sin stock",
            Self::MadeToOrderFast => "Fabricación corta",
            Self::MadeToOrderSlow => "Fabricación larga",
            Self::Unknown => "Consultar",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct StockEntry {
    #[serde(rename = "Artículo", alias = "Articulo", deserialize_with = "reference_from_value")]
    pub reference: Reference,
    #[serde(rename = "Estado", default, deserialize_with = "stock_state_from_value")]
    pub state: StockState,
    #[serde(rename = "Stock", default, deserialize_with = "quantity_from_value")]
    pub quantity: i64,
}

/// Reads a decimal from a JSON number or a numeric string (`"5,50"`, `"12.00 €"`).
pub(crate) fn decimal_from_value(value: &Value) -> Option<Decimal> {
    match value {
        Value::Number(number) => Decimal::from_str(&number.to_string())
            .ok()
            .or_else(|| number.as_f64().and_then(Decimal::from_f64)),
        Value::String(text) => decimal_from_text(text),
        _ => None,
    }
}

pub(crate) fn decimal_from_text(text: &str) -> Option<Decimal> {
    let cleaned = text.trim().trim_end_matches('€').trim();
    if cleaned.is_empty() {
        return None;
    }

    Decimal::from_str(&normalize_decimal(cleaned)).ok()
}

/// `1.250,50` and `5,50` become `1250.50` and `5.50`; dot-only numbers pass through.
pub(crate) fn normalize_decimal(raw: &str) -> String {
    if raw.contains(',') {
        raw.replace('.', "").replace(',', ".")
    } else {
        raw.to_string()
    }
}

fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Bool(flag) => *flag,
        Value::Number(number) => number.as_f64().map(|n| n != 0.0).unwrap_or(false),
        Value::String(text) => {
            let text = text.trim().to_ascii_lowercase();
            !(text.is_empty() || text == "0" || text == "no" || text == "false")
        }
        Value::Array(_) | Value::Object(_) => true,
        Value::Null => false,
    }
}

fn reference_from_value<'de, D>(deserializer: D) -> Result<Reference, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(Reference::new(scalar_text(&value)))
}

fn text_from_value<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(scalar_text(&value))
}

fn stock_state_from_value<'de, D>(deserializer: D) -> Result<StockState, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(StockState::from_code(&scalar_text(&value)))
}

fn quantity_from_value<'de, D>(deserializer: D) -> Result<i64, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    let quantity = match &value {
        Value::Number(number) => {
            number.as_i64().or_else(|| number.as_f64().map(|n| n.trunc() as i64))
        }
        Value::String(text) => text.trim().parse::<i64>().ok(),
        _ => None,
    };
    Ok(quantity.unwrap_or(0))
}

fn scalar_text(value: &Value) -> String {
    match value {
        Value::String(text) => text.trim().to_string(),
        Value::Number(number) => number.to_string(),
        Value::Bool(flag) => flag.to_string(),
        Value::Null | Value::Array(_) | Value::Object(_) => String::new(),
    }
}

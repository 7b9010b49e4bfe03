use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use thiserror::Error;

use crate::cpq::pricing::{PriceQuote, PriceResolver, TariffPriceResolver};
use crate::cpq::tariff::Tariff;
use crate::domain::product::{Product, Reference, StockEntry, StockState};
use crate::errors::ApplicationError;

pub const MIN_QUERY_CHARS: usize = 2;

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("could not read data file `{path}`: {source}")]
    ReadFile { path: PathBuf, source: std::io::Error },
    #[error("could not parse data file `{path}`: {source}")]
    ParseFile { path: PathBuf, source: serde_json::Error },
    #[error("invalid data document: {0}")]
    InvalidDocument(String),
}

impl From<CatalogError> for ApplicationError {
    fn from(value: CatalogError) -> Self {
        Self::Data(value.to_string())
    }
}

#[derive(Clone, Debug, Default)]
pub struct Catalog {
    products: Vec<Product>,
    stock: HashMap<Reference, StockEntry>,
}

#[derive(Clone, Copy, Debug)]
pub struct SearchHit<'a> {
    pub product: &'a Product,
    pub stock: Option<&'a StockEntry>,
}

#[derive(Clone, Debug, Serialize)]
pub struct PricedHit {
    pub product: Product,
    pub stock: Option<StockEntry>,
    pub price: PriceQuote,
}

impl Catalog {
    pub fn new(products: Vec<Product>, stock: Vec<StockEntry>) -> Self {
        let stock = stock.into_iter().map(|entry| (entry.reference.clone(), entry)).collect();
        Self { products, stock }
    }

    pub fn products(&self) -> &[Product] {
        &self.products
    }

    pub fn is_empty(&self) -> bool {
        self.products.is_empty()
    }

    pub fn find(&self, reference: &Reference) -> Option<&Product> {
        self.products.iter().find(|product| &product.reference == reference)
    }

    pub fn stock_for(&self, reference: &Reference) -> Option<&StockEntry> {
        self.stock.get(reference)
    }

    /// Products marked unavailable in stock are dropped; unknown stock is kept.
    pub fn search(&self, query: &str) -> Vec<SearchHit<'_>> {
        let query = query.trim().to_lowercase();
        if query.chars().count() < MIN_QUERY_CHARS {
            return Vec::new();
        }

        self.products
            .iter()
            .filter(|product| product.matches(&query))
            .map(|product| SearchHit { product, stock: self.stock.get(&product.reference) })
            .filter(|hit| {
                hit.stock.map(|entry| entry.state != StockState::Unavailable).unwrap_or(true)
            })
            .collect()
    }
}

/// Identifies one catalog load; only the most recently issued ticket may install data.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct LoadTicket {
    generation: u64,
}

#[derive(Debug)]
pub struct CatalogSession {
    tariff: Tariff,
    catalog: Catalog,
    generation: u64,
    loaded_generation: Option<u64>,
}

impl CatalogSession {
    pub fn new(tariff: Tariff) -> Self {
        Self { tariff, catalog: Catalog::default(), generation: 0, loaded_generation: None }
    }

    pub fn begin_load(&mut self, tariff: Tariff) -> LoadTicket {
        self.generation += 1;
        self.tariff = tariff;
        self.catalog = Catalog::default();
        LoadTicket { generation: self.generation }
    }

    /// Returns false when a newer load was started meanwhile.
    pub fn finish_load(
        &mut self,
        ticket: LoadTicket,
        products: Vec<Product>,
        stock: Vec<StockEntry>,
    ) -> bool {
        if ticket.generation != self.generation {
            return false;
        }

        self.catalog = Catalog::new(products, stock);
        self.loaded_generation = Some(ticket.generation);
        true
    }

    pub fn is_loaded(&self) -> bool {
        self.loaded_generation == Some(self.generation)
    }

    pub fn tariff(&self) -> Tariff {
        self.tariff
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    pub fn resolver(&self) -> TariffPriceResolver {
        TariffPriceResolver::new(self.tariff)
    }

    pub fn search_priced(&self, query: &str) -> Vec<PricedHit> {
        let resolver = self.resolver();
        self.catalog
            .search(query)
            .into_iter()
            .map(|hit| PricedHit {
                product: hit.product.clone(),
                stock: hit.stock.cloned(),
                price: resolver.resolve(hit.product),
            })
            .collect()
    }

    pub fn load_from_dir(
        &mut self,
        tariff: Tariff,
        data_dir: &Path,
        stock_file: Option<&str>,
    ) -> Result<(), CatalogError> {
        let ticket = self.begin_load(tariff);
        let products = load_tariff_file(&data_dir.join(tariff.file_name()))?;
        let stock = match stock_file {
            Some(name) if data_dir.join(name).exists() => load_stock_file(&data_dir.join(name))?,
            _ => Vec::new(),
        };
        self.finish_load(ticket, products, stock);
        Ok(())
    }
}

pub fn load_tariff_file(path: &Path) -> Result<Vec<Product>, CatalogError> {
    let raw = read_file(path)?;
    parse_tariff_document(&raw).map_err(|error| with_path(error, path))
}

pub fn load_stock_file(path: &Path) -> Result<Vec<StockEntry>, CatalogError> {
    let raw = read_file(path)?;
    parse_stock_document(&raw).map_err(|error| with_path(error, path))
}

// Records live under the sheet-name key of the top-level object.
pub fn parse_tariff_document(raw: &str) -> Result<Vec<Product>, CatalogError> {
    parse_sheet(raw)
}

pub fn parse_stock_document(raw: &str) -> Result<Vec<StockEntry>, CatalogError> {
    parse_sheet(raw)
}

fn parse_sheet<T: DeserializeOwned>(raw: &str) -> Result<Vec<T>, CatalogError> {
    let document: Value = serde_json::from_str(raw)
        .map_err(|source| CatalogError::ParseFile { path: PathBuf::new(), source })?;

    let rows = match document {
        Value::Object(sheets) => sheets
            .into_iter()
            .map(|(_, rows)| rows)
            .find(Value::is_array)
            .ok_or_else(|| {
                CatalogError::InvalidDocument("no top-level key holds a record array".to_string())
            })?,
        rows @ Value::Array(_) => rows,
        _ => {
            return Err(CatalogError::InvalidDocument(
                "expected an object with one record array".to_string(),
            ))
        }
    };

    serde_json::from_value(rows)
        .map_err(|source| CatalogError::ParseFile { path: PathBuf::new(), source })
}

fn read_file(path: &Path) -> Result<String, CatalogError> {
    fs::read_to_string(path)
        .map_err(|source| CatalogError::ReadFile { path: path.to_path_buf(), source })
}

fn with_path(error: CatalogError, path: &Path) -> CatalogError {
    match error {
        CatalogError::ParseFile { source, .. } => {
            CatalogError::ParseFile { path: path.to_path_buf(), source }
        }
        CatalogError::InvalidDocument(message) => {
            CatalogError::InvalidDocument(format!("{}: {message}", path.display()))
        }
        other => other,
    }
}

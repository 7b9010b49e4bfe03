pub mod config;
pub mod cpq;
pub mod domain;
pub mod errors;

pub use config::{AppConfig, ConfigError, ConfigOverrides, LoadOptions, LogFormat};
pub use cpq::catalog::{Catalog, CatalogError, CatalogSession, LoadTicket, PricedHit, SearchHit};
pub use cpq::net_condition::NetCondition;
pub use cpq::pricing::{
    resolve_price, tariff_sheet_rows, PriceQuote, PriceResolver, TariffPriceResolver,
    TariffSheetRow, NOT_APPLICABLE,
};
pub use cpq::tariff::{Tariff, TariffRule};
pub use domain::product::{Product, Reference, StockEntry, StockState};
pub use domain::quote::{
    LineRequest, LineView, NetStatus, QuoteEngine, QuoteLine, QuoteSnapshot, QuoteTotals,
    ShippingPolicy,
};
pub use errors::{ApplicationError, DomainError};

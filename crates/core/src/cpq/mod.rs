pub mod catalog;
pub mod net_condition;
pub mod pricing;
pub mod tariff;

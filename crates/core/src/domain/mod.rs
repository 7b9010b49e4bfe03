pub mod product;
pub mod quote;

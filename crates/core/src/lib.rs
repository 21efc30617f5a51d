pub mod catalog;
pub mod config;
pub mod domain;
pub mod errors;

pub use catalog::{best_match, CatalogError, CatalogLookup};
pub use domain::cart::{Cart, CartLine};
pub use domain::product::Product;
pub use errors::{ApplicationError, DomainError, InterfaceError};

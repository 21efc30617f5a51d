use async_trait::async_trait;
use thiserror::Error;

use pizzabot_core::catalog::{CatalogError, CatalogLookup};
use pizzabot_core::domain::product::Product;

pub mod memory;
pub mod product;

pub use memory::InMemoryProductRepository;
pub use product::SqlProductRepository;

#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("decode error: {0}")]
    Decode(String),
}

impl From<RepositoryError> for CatalogError {
    fn from(error: RepositoryError) -> Self {
        CatalogError::Unavailable(error.to_string())
    }
}

/// Write side of the menu store, used by seeding and operator tooling.
#[async_trait]
pub trait ProductRepository: CatalogLookup {
    /// Inserts the product or replaces the description and price of an existing name.
    async fn save(&self, product: Product) -> Result<(), RepositoryError>;
    async fn count(&self) -> Result<u64, RepositoryError>;
}

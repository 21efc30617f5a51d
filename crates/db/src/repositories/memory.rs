use tokio::sync::RwLock;

use pizzabot_core::catalog::{best_match, CatalogError, CatalogLookup};
use pizzabot_core::domain::product::Product;

use super::{ProductRepository, RepositoryError};

/// Menu kept in insertion order; used by tests and catalog-less demos.
#[derive(Default)]
pub struct InMemoryProductRepository {
    products: RwLock<Vec<Product>>,
}

impl InMemoryProductRepository {
    pub fn new(products: Vec<Product>) -> Self {
        Self { products: RwLock::new(products) }
    }
}

#[async_trait::async_trait]
impl CatalogLookup for InMemoryProductRepository {
    async fn find_by_name(&self, query: &str) -> Result<Option<Product>, CatalogError> {
        let products = self.products.read().await;
        Ok(best_match(products.iter(), query).cloned())
    }

    async fn list_all(&self) -> Result<Vec<Product>, CatalogError> {
        Ok(self.products.read().await.clone())
    }
}

#[async_trait::async_trait]
impl ProductRepository for InMemoryProductRepository {
    async fn save(&self, product: Product) -> Result<(), RepositoryError> {
        let mut products = self.products.write().await;
        match products.iter_mut().find(|existing| existing.name == product.name) {
            Some(existing) => *existing = product,
            None => products.push(product),
        }
        Ok(())
    }

    async fn count(&self) -> Result<u64, RepositoryError> {
        Ok(self.products.read().await.len() as u64)
    }
}

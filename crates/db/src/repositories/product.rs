use std::str::FromStr;

use chrono::Utc;
use rust_decimal::Decimal;

use pizzabot_core::catalog::{best_match, normalize_name, CatalogError, CatalogLookup};
use pizzabot_core::domain::product::Product;

use super::{ProductRepository, RepositoryError};
use crate::DbPool;

type ProductRow = (String, String, String);

pub struct SqlProductRepository {
    pool: DbPool,
}

impl SqlProductRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    async fn all(&self) -> Result<Vec<Product>, RepositoryError> {
        let rows = sqlx::query_as::<_, ProductRow>(
            "SELECT name, ingredients, price FROM pizzas ORDER BY id",
        )
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(decode_row).collect()
    }
}

fn decode_row((name, ingredients, price): ProductRow) -> Result<Product, RepositoryError> {
    let price = Decimal::from_str(&price)
        .map_err(|error| RepositoryError::Decode(format!("price for `{name}`: {error}")))?;
    Ok(Product { name, description: ingredients, price })
}

#[async_trait::async_trait]
impl CatalogLookup for SqlProductRepository {
    async fn find_by_name(&self, query: &str) -> Result<Option<Product>, CatalogError> {
        if normalize_name(query).is_empty() {
            return Ok(None);
        }
        // SQLite's lower() only folds ASCII, so matching happens in Rust over the whole menu.
        let products = self.all().await?;
        Ok(best_match(&products, query).cloned())
    }

    async fn list_all(&self) -> Result<Vec<Product>, CatalogError> {
        Ok(self.all().await?)
    }
}

#[async_trait::async_trait]
impl ProductRepository for SqlProductRepository {
    async fn save(&self, product: Product) -> Result<(), RepositoryError> {
        sqlx::query(
            "INSERT INTO pizzas (name, ingredients, price, created_at) VALUES (?1, ?2, ?3, ?4) \
             ON CONFLICT(name) DO UPDATE SET ingredients = excluded.ingredients, price = excluded.price",
        )
        .bind(&product.name)
        .bind(&product.description)
        .bind(product.price.to_string())
        .bind(Utc::now().to_rfc3339())
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn count(&self) -> Result<u64, RepositoryError> {
        let (count,): (i64,) =
            sqlx::query_as("SELECT COUNT(*) FROM pizzas").fetch_one(&self.pool).await?;
        Ok(u64::try_from(count).unwrap_or_default())
    }
}

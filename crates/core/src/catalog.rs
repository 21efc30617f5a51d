//! Read-only access to the menu.
//!
//! Name resolution is case-insensitive substring matching. When several products
//! match, [`best_match`] picks one deterministically:
//! 1. an exact (case-insensitive) name match,
//! 2. otherwise the shortest matching name,
//! 3. ties broken by case-folded name, ascending.
//!
//! Every store applies this same policy so results do not depend on storage order.

use async_trait::async_trait;
use thiserror::Error;

use crate::domain::product::Product;

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum CatalogError {
    #[error("catalog unavailable: {0}")]
    Unavailable(String),
}

#[async_trait]
pub trait CatalogLookup: Send + Sync {
    async fn find_by_name(&self, query: &str) -> Result<Option<Product>, CatalogError>;
    /// Full menu in the store's natural order.
    async fn list_all(&self) -> Result<Vec<Product>, CatalogError>;
}

pub fn normalize_name(value: &str) -> String {
    value.trim().to_lowercase()
}

pub fn matches_query(product: &Product, query: &str) -> bool {
    let needle = normalize_name(query);
    !needle.is_empty() && normalize_name(&product.name).contains(&needle)
}

pub fn best_match<'a, I>(candidates: I, query: &str) -> Option<&'a Product>
where
    I: IntoIterator<Item = &'a Product>,
{
    let needle = normalize_name(query);
    if needle.is_empty() {
        return None;
    }

    candidates
        .into_iter()
        .filter(|product| normalize_name(&product.name).contains(&needle))
        .min_by_key(|product| {
            let folded = normalize_name(&product.name);
            (folded != needle, folded.chars().count(), folded)
        })
}

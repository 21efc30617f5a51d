use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// A menu entry. `description` holds the ingredient list shown to customers.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Product {
    pub name: String,
    pub description: String,
    #[serde(with = "rust_decimal::serde::float")]
    pub price: Decimal,
}

impl Product {
    pub fn new(name: impl Into<String>, description: impl Into<String>, price: Decimal) -> Self {
        Self { name: name.into(), description: description.into(), price }
    }
}
